use itertools::Itertools;
use std::sync::Arc;

use super::generator::{ChapterSuggestion, ContentGenerator};
use super::model::{
    validate_cards, validate_clip, validate_questions, ChapterPatch, ChapterUpdate, DeckPatch,
    DeckUpdate, Flashcard, FlashcardDeck, ModuleContent, NewVideoChapter, Note, NoteSummary, Quiz,
    QuizPatch, QuizQuestion, QuizUpdate, VideoChapter,
};
use crate::modules::courses::model::{CoursePatch, ModulePatch};
use crate::modules::error::{EntityKind, PlatformError, PlatformResult};
use crate::modules::ownership::{ModuleOwnership, OwnershipResolver};
use crate::modules::store::{Database, Filter, RecordId};
use crate::modules::utils::logging::log_data_operation;
use crate::modules::utils::time::Clock;

const NOTHING_TO_UPDATE: &str = "No valid fields to update";

fn require(value: &str, message: &str) -> PlatformResult<()> {
    if value.trim().is_empty() {
        return Err(PlatformError::validation(message));
    }
    Ok(())
}

/// Flashcard decks, quizzes, video chapters and the notes they come from
#[derive(Clone)]
pub struct ContentManager {
    db: Database,
    clock: Arc<dyn Clock>,
    resolver: OwnershipResolver,
    generator: Arc<dyn ContentGenerator>,
}

impl ContentManager {
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        resolver: OwnershipResolver,
        generator: Arc<dyn ContentGenerator>,
    ) -> Self {
        Self {
            db,
            clock,
            resolver,
            generator,
        }
    }

    /// Stamp `last_updated` on a module and its course after a content change
    fn touch(&self, module_id: &RecordId, course_id: &RecordId) -> PlatformResult<()> {
        let now = self.clock.now();
        self.db.modules.update(module_id, ModulePatch::touched(now))?;
        self.db.courses.update(course_id, CoursePatch::touched(now))?;
        Ok(())
    }

    fn logged(&self, operation: &str, acting_user_id: &RecordId, resource: String) {
        log_data_operation(operation, acting_user_id.as_str(), &resource, true, None);
    }

    // Flashcard decks

    pub fn create_flashcard_deck(
        &self,
        module_id: &RecordId,
        acting_user_id: &RecordId,
        title: &str,
        cards: Vec<Flashcard>,
    ) -> PlatformResult<FlashcardDeck> {
        require(title, "Title is required")?;
        validate_cards(&cards)?;
        let chain = self.resolver.authorize_module(module_id, acting_user_id)?;
        self.insert_deck(&chain, title.to_string(), cards, None, acting_user_id)
    }

    fn insert_deck(
        &self,
        chain: &ModuleOwnership,
        title: String,
        cards: Vec<Flashcard>,
        note_id: Option<RecordId>,
        acting_user_id: &RecordId,
    ) -> PlatformResult<FlashcardDeck> {
        let now = self.clock.now();
        let deck = FlashcardDeck {
            id: RecordId::generate(),
            module_id: chain.module.id.clone(),
            title,
            cards,
            note_id,
            created_at: now,
            last_updated: now,
        };
        self.db.flashcard_decks.insert(&deck)?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("create_flashcard_deck", acting_user_id, format!("deck:{}", deck.id));
        Ok(deck)
    }

    pub fn get_flashcard_deck(&self, deck_id: &RecordId) -> PlatformResult<FlashcardDeck> {
        self.db
            .flashcard_decks
            .find_by_id(deck_id)?
            .ok_or(PlatformError::NotFound(EntityKind::FlashcardDeck))
    }

    pub fn update_flashcard_deck(
        &self,
        deck_id: &RecordId,
        acting_user_id: &RecordId,
        changes: DeckUpdate,
    ) -> PlatformResult<()> {
        if changes.is_empty() {
            return Err(PlatformError::validation(NOTHING_TO_UPDATE));
        }
        if let Some(title) = &changes.title {
            require(title, "Title is required")?;
        }
        if let Some(cards) = &changes.cards {
            validate_cards(cards)?;
        }
        let chain = self.resolver.authorize_deck(deck_id, acting_user_id)?;

        self.db
            .flashcard_decks
            .update(&chain.content.id, DeckPatch::changes(changes, self.clock.now()))?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("update_flashcard_deck", acting_user_id, format!("deck:{}", deck_id));
        Ok(())
    }

    pub fn delete_flashcard_deck(
        &self,
        deck_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<()> {
        let chain = self.resolver.authorize_deck(deck_id, acting_user_id)?;
        self.db.flashcard_decks.delete_by_id(&chain.content.id)?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("delete_flashcard_deck", acting_user_id, format!("deck:{}", deck_id));
        Ok(())
    }

    // Quizzes

    pub fn create_quiz(
        &self,
        module_id: &RecordId,
        acting_user_id: &RecordId,
        title: &str,
        questions: Vec<QuizQuestion>,
    ) -> PlatformResult<Quiz> {
        require(title, "Title is required")?;
        validate_questions(&questions)?;
        let chain = self.resolver.authorize_module(module_id, acting_user_id)?;
        self.insert_quiz(&chain, title.to_string(), questions, None, acting_user_id)
    }

    fn insert_quiz(
        &self,
        chain: &ModuleOwnership,
        title: String,
        questions: Vec<QuizQuestion>,
        note_id: Option<RecordId>,
        acting_user_id: &RecordId,
    ) -> PlatformResult<Quiz> {
        let now = self.clock.now();
        let quiz = Quiz {
            id: RecordId::generate(),
            module_id: chain.module.id.clone(),
            title,
            questions,
            note_id,
            created_at: now,
            last_updated: now,
        };
        self.db.quizzes.insert(&quiz)?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("create_quiz", acting_user_id, format!("quiz:{}", quiz.id));
        Ok(quiz)
    }

    pub fn get_quiz(&self, quiz_id: &RecordId) -> PlatformResult<Quiz> {
        self.db
            .quizzes
            .find_by_id(quiz_id)?
            .ok_or(PlatformError::NotFound(EntityKind::Quiz))
    }

    pub fn update_quiz(
        &self,
        quiz_id: &RecordId,
        acting_user_id: &RecordId,
        changes: QuizUpdate,
    ) -> PlatformResult<()> {
        if changes.is_empty() {
            return Err(PlatformError::validation(NOTHING_TO_UPDATE));
        }
        if let Some(title) = &changes.title {
            require(title, "Title is required")?;
        }
        if let Some(questions) = &changes.questions {
            validate_questions(questions)?;
        }
        let chain = self.resolver.authorize_quiz(quiz_id, acting_user_id)?;

        self.db
            .quizzes
            .update(&chain.content.id, QuizPatch::changes(changes, self.clock.now()))?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("update_quiz", acting_user_id, format!("quiz:{}", quiz_id));
        Ok(())
    }

    pub fn delete_quiz(&self, quiz_id: &RecordId, acting_user_id: &RecordId) -> PlatformResult<()> {
        let chain = self.resolver.authorize_quiz(quiz_id, acting_user_id)?;
        self.db.quizzes.delete_by_id(&chain.content.id)?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("delete_quiz", acting_user_id, format!("quiz:{}", quiz_id));
        Ok(())
    }

    // Video chapters

    pub fn create_video_chapter(
        &self,
        module_id: &RecordId,
        acting_user_id: &RecordId,
        chapter: NewVideoChapter,
    ) -> PlatformResult<VideoChapter> {
        require(&chapter.title, "Title is required")?;
        validate_clip(&chapter.video_url, chapter.start_time, chapter.end_time)?;
        let chain = self.resolver.authorize_module(module_id, acting_user_id)?;

        let now = self.clock.now();
        let chapter = VideoChapter {
            id: RecordId::generate(),
            module_id: chain.module.id.clone(),
            title: chapter.title,
            video_url: chapter.video_url,
            start_time: chapter.start_time,
            end_time: chapter.end_time,
            transcript: chapter.transcript,
            note_id: None,
            created_at: now,
            last_updated: now,
        };
        self.db.video_chapters.insert(&chapter)?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("create_video_chapter", acting_user_id, format!("chapter:{}", chapter.id));
        Ok(chapter)
    }

    pub fn get_video_chapter(&self, chapter_id: &RecordId) -> PlatformResult<VideoChapter> {
        self.db
            .video_chapters
            .find_by_id(chapter_id)?
            .ok_or(PlatformError::NotFound(EntityKind::VideoChapter))
    }

    /// Partial update; the resulting clip must still end after it starts
    pub fn update_video_chapter(
        &self,
        chapter_id: &RecordId,
        acting_user_id: &RecordId,
        changes: ChapterUpdate,
    ) -> PlatformResult<()> {
        if changes.is_empty() {
            return Err(PlatformError::validation(NOTHING_TO_UPDATE));
        }
        if let Some(title) = &changes.title {
            require(title, "Title is required")?;
        }
        let chain = self.resolver.authorize_chapter(chapter_id, acting_user_id)?;
        let current = &chain.content;
        validate_clip(
            changes.video_url.as_deref().unwrap_or(&current.video_url),
            changes.start_time.unwrap_or(current.start_time),
            changes.end_time.unwrap_or(current.end_time),
        )?;

        self.db
            .video_chapters
            .update(&current.id, ChapterPatch::changes(changes, self.clock.now()))?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("update_video_chapter", acting_user_id, format!("chapter:{}", chapter_id));
        Ok(())
    }

    pub fn delete_video_chapter(
        &self,
        chapter_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<()> {
        let chain = self.resolver.authorize_chapter(chapter_id, acting_user_id)?;
        self.db.video_chapters.delete_by_id(&chain.content.id)?;
        self.touch(&chain.module.id, &chain.course.id)?;
        self.logged("delete_video_chapter", acting_user_id, format!("chapter:{}", chapter_id));
        Ok(())
    }

    pub fn get_module_content(&self, module_id: &RecordId) -> PlatformResult<ModuleContent> {
        if self.db.modules.find_by_id(module_id)?.is_none() {
            return Err(PlatformError::NotFound(EntityKind::Module));
        }
        let contained = Filter::eq("module_id", module_id);
        Ok(ModuleContent {
            flashcard_decks: self.db.flashcard_decks.find(&contained)?,
            quizzes: self.db.quizzes.find(&contained)?,
            video_chapters: self
                .db
                .video_chapters
                .find(&contained)?
                .into_iter()
                .sorted_by_key(|chapter| chapter.start_time)
                .collect(),
        })
    }

    // Notes

    pub fn save_note(
        &self,
        user_id: &RecordId,
        title: &str,
        topic: &str,
        content: &str,
    ) -> PlatformResult<Note> {
        require(title, "Title is required")?;
        require(content, "Note content is required")?;
        if self.db.users.find_by_id(user_id)?.is_none() {
            return Err(PlatformError::NotFound(EntityKind::User));
        }

        let now = self.clock.now();
        let note = Note {
            id: RecordId::generate(),
            user_id: user_id.clone(),
            title: title.to_string(),
            topic: topic.to_string(),
            content: content.to_string(),
            created_at: now,
            last_updated: now,
        };
        self.db.notes.insert(&note)?;
        self.logged("save_note", user_id, format!("note:{}", note.id));
        Ok(note)
    }

    /// The user's notes, newest first, with a short preview of each
    pub fn list_notes(&self, user_id: &RecordId) -> PlatformResult<Vec<NoteSummary>> {
        let notes = self.db.notes.find(&Filter::eq("user_id", user_id))?;
        Ok(notes
            .iter()
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
            .map(NoteSummary::from)
            .collect())
    }

    /// Someone else's note reads as missing
    pub fn get_note(&self, note_id: &RecordId, acting_user_id: &RecordId) -> PlatformResult<Note> {
        self.db
            .notes
            .find_by_id(note_id)?
            .filter(|note| &note.user_id == acting_user_id)
            .ok_or(PlatformError::NotFound(EntityKind::Note))
    }

    pub fn delete_note(&self, note_id: &RecordId, acting_user_id: &RecordId) -> PlatformResult<()> {
        let note = self.resolver.authorize_note(note_id, acting_user_id)?;
        self.db.notes.delete_by_id(&note.id)?;
        self.logged("delete_note", acting_user_id, format!("note:{}", note.id));
        Ok(())
    }

    // Generation

    /// Both the target module and the source note must belong to the caller
    fn generation_sources(
        &self,
        module_id: &RecordId,
        note_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<(ModuleOwnership, Note)> {
        let chain = self.resolver.authorize_module(module_id, acting_user_id)?;
        let note = self.resolver.authorize_note(note_id, acting_user_id)?;
        Ok((chain, note))
    }

    pub fn generate_flashcards_from_note(
        &self,
        module_id: &RecordId,
        note_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<FlashcardDeck> {
        let (chain, note) = self.generation_sources(module_id, note_id, acting_user_id)?;
        let cards = self.generator.flashcards(&note)?;
        validate_cards(&cards)?;
        let title = format!("{} Flashcards", note.title);
        self.insert_deck(&chain, title, cards, Some(note.id), acting_user_id)
    }

    pub fn generate_quiz_from_note(
        &self,
        module_id: &RecordId,
        note_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<Quiz> {
        let (chain, note) = self.generation_sources(module_id, note_id, acting_user_id)?;
        let questions = self.generator.quiz_questions(&note)?;
        validate_questions(&questions)?;
        let title = format!("{} Quiz", note.title);
        self.insert_quiz(&chain, title, questions, Some(note.id), acting_user_id)
    }

    /// Chapter ideas for a note; nothing is stored
    pub fn suggest_video_chapters_from_note(
        &self,
        note_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<Vec<ChapterSuggestion>> {
        let note = self.resolver.authorize_note(note_id, acting_user_id)?;
        self.generator.video_chapters(&note)
    }
}
