use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::error::{PlatformError, PlatformResult};
use crate::modules::store::{Patch, Record, RecordId, Update};

const PREVIEW_CHARS: usize = 200;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
}

impl Flashcard {
    pub fn new(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlashcardDeck {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub module_id: RecordId,
    pub title: String,
    pub cards: Vec<Flashcard>,
    #[serde(default)]
    pub note_id: Option<RecordId>,
    pub created_at: u64,
    pub last_updated: u64,
}

impl Record for FlashcardDeck {
    const COLLECTION: &'static str = "flashcard_decks";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Quiz {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub module_id: RecordId,
    pub title: String,
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub note_id: Option<RecordId>,
    pub created_at: u64,
    pub last_updated: u64,
}

impl Record for Quiz {
    const COLLECTION: &'static str = "quizzes";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// A short clip of a longer video; times are in seconds
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VideoChapter {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub module_id: RecordId,
    pub title: String,
    pub video_url: String,
    pub start_time: u32,
    pub end_time: u32,
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub note_id: Option<RecordId>,
    pub created_at: u64,
    pub last_updated: u64,
}

impl Record for VideoChapter {
    const COLLECTION: &'static str = "video_chapters";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

impl VideoChapter {
    pub fn duration(&self) -> u32 {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// Input for a new video chapter
#[derive(Debug, Clone)]
pub struct NewVideoChapter {
    pub title: String,
    pub video_url: String,
    pub start_time: u32,
    pub end_time: u32,
    pub transcript: String,
}

/// Raw study notes uploaded by a user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Note {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub user_id: RecordId,
    pub title: String,
    pub topic: String,
    pub content: String,
    pub created_at: u64,
    pub last_updated: u64,
}

impl Record for Note {
    const COLLECTION: &'static str = "notes";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Note listing entry with a truncated preview instead of the full text
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NoteSummary {
    pub id: RecordId,
    pub title: String,
    pub topic: String,
    pub content_preview: String,
    pub created_at: u64,
}

impl From<&Note> for NoteSummary {
    fn from(note: &Note) -> Self {
        let content_preview = if note.content.chars().count() > PREVIEW_CHARS {
            let cut: String = note.content.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", cut)
        } else {
            note.content.clone()
        };
        Self {
            id: note.id.clone(),
            title: note.title.clone(),
            topic: note.topic.clone(),
            content_preview,
            created_at: note.created_at,
        }
    }
}

/// Everything stored under one module
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct ModuleContent {
    pub flashcard_decks: Vec<FlashcardDeck>,
    pub quizzes: Vec<Quiz>,
    pub video_chapters: Vec<VideoChapter>,
}

pub fn validate_cards(cards: &[Flashcard]) -> PlatformResult<()> {
    if cards
        .iter()
        .any(|card| card.front.trim().is_empty() || card.back.trim().is_empty())
    {
        return Err(PlatformError::validation(
            "All cards must have 'front' and 'back' fields",
        ));
    }
    Ok(())
}

pub fn validate_questions(questions: &[QuizQuestion]) -> PlatformResult<()> {
    for question in questions {
        if question.question.trim().is_empty() || question.options.is_empty() {
            return Err(PlatformError::validation(
                "All questions must have 'question', 'options', and 'correct_answer' fields",
            ));
        }
        if !question.options.contains(&question.correct_answer) {
            return Err(PlatformError::validation(format!(
                "The correct answer of '{}' is not one of its options",
                question.question
            )));
        }
    }
    Ok(())
}

pub fn validate_clip(video_url: &str, start_time: u32, end_time: u32) -> PlatformResult<()> {
    if video_url.trim().is_empty() {
        return Err(PlatformError::validation("A video URL is required"));
    }
    if end_time <= start_time {
        return Err(PlatformError::validation(
            "A chapter must end after it starts",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct DeckUpdate {
    pub title: Option<String>,
    pub cards: Option<Vec<Flashcard>>,
}

impl DeckUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.cards.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct QuizUpdate {
    pub title: Option<String>,
    pub questions: Option<Vec<QuizQuestion>>,
}

impl QuizUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.questions.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChapterUpdate {
    pub title: Option<String>,
    pub video_url: Option<String>,
    pub start_time: Option<u32>,
    pub end_time: Option<u32>,
    pub transcript: Option<String>,
}

impl ChapterUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.video_url.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.transcript.is_none()
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    // Card and question structs only hold strings, so this cannot fail
    serde_json::to_value(value).unwrap_or(Value::Null)
}

pub struct DeckPatch(Update);

impl DeckPatch {
    pub fn changes(changes: DeckUpdate, at: u64) -> Self {
        let mut update = Update::new();
        if let Some(title) = changes.title {
            update = update.set("title", title);
        }
        if let Some(cards) = changes.cards {
            update = update.set("cards", to_value(&cards));
        }
        DeckPatch(update.set("last_updated", at))
    }
}

impl Patch for DeckPatch {
    type Target = FlashcardDeck;

    fn into_update(self) -> Update {
        self.0
    }
}

pub struct QuizPatch(Update);

impl QuizPatch {
    pub fn changes(changes: QuizUpdate, at: u64) -> Self {
        let mut update = Update::new();
        if let Some(title) = changes.title {
            update = update.set("title", title);
        }
        if let Some(questions) = changes.questions {
            update = update.set("questions", to_value(&questions));
        }
        QuizPatch(update.set("last_updated", at))
    }
}

impl Patch for QuizPatch {
    type Target = Quiz;

    fn into_update(self) -> Update {
        self.0
    }
}

pub struct ChapterPatch(Update);

impl ChapterPatch {
    pub fn changes(changes: ChapterUpdate, at: u64) -> Self {
        let mut update = Update::new();
        if let Some(title) = changes.title {
            update = update.set("title", title);
        }
        if let Some(url) = changes.video_url {
            update = update.set("video_url", url);
        }
        if let Some(start) = changes.start_time {
            update = update.set("start_time", start);
        }
        if let Some(end) = changes.end_time {
            update = update.set("end_time", end);
        }
        if let Some(transcript) = changes.transcript {
            update = update.set("transcript", transcript);
        }
        ChapterPatch(update.set("last_updated", at))
    }
}

impl Patch for ChapterPatch {
    type Target = VideoChapter;

    fn into_update(self) -> Update {
        self.0
    }
}
