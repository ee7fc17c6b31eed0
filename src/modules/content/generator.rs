use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use super::model::{Flashcard, Note, QuizQuestion};
use crate::modules::error::{PlatformError, PlatformResult};

const MIN_CARDS: usize = 4;
const MIN_QUESTIONS: usize = 3;
const MAX_OPTIONS: usize = 4;

lazy_static! {
    // "term: definition", optionally as a list item
    static ref DEFINITION_LINE: Regex =
        Regex::new(r"^\s*(?:[-*]\s+)?([^:]{1,60}?)\s*:\s+(\S.*?)\s*$").expect("definition pattern is valid");
    static ref HEADING_LINE: Regex =
        Regex::new(r"^\s*#{1,3}\s+(\S.*?)\s*$").expect("heading pattern is valid");
}

/// A proposed video chapter; not stored until the user creates it
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChapterSuggestion {
    pub title: String,
    pub description: String,
}

/// Turns a note into study material
pub trait ContentGenerator: Send + Sync {
    fn flashcards(&self, note: &Note) -> PlatformResult<Vec<Flashcard>>;

    fn quiz_questions(&self, note: &Note) -> PlatformResult<Vec<QuizQuestion>>;

    fn video_chapters(&self, note: &Note) -> PlatformResult<Vec<ChapterSuggestion>>;
}

/// Offline generator working from the structure of the note itself.
/// `term: definition` lines become cards and questions, headings become
/// chapters. Short notes are padded with title and topic templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlineGenerator;

fn definitions(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| DEFINITION_LINE.captures(line))
        .map(|caps| (caps[1].to_string(), caps[2].to_string()))
        .collect()
}

fn headings(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| HEADING_LINE.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

fn check_note(note: &Note) -> PlatformResult<()> {
    if note.content.trim().is_empty() {
        return Err(PlatformError::Generation(format!(
            "note '{}' has no content",
            note.title
        )));
    }
    Ok(())
}

fn template_cards(note: &Note) -> Vec<Flashcard> {
    vec![
        Flashcard::new(
            format!("What is {}?", note.title),
            format!("A subject that covers topics related to {}", note.topic),
        ),
        Flashcard::new(
            format!("Why is {} important?", note.title),
            format!(
                "It provides fundamental knowledge about {} that is essential for further studies",
                note.topic
            ),
        ),
        Flashcard::new(
            format!("Main components of {}", note.title),
            format!("Various concepts and principles related to {}", note.topic),
        ),
        Flashcard::new(
            format!("Applications of {}", note.title),
            format!(
                "The concepts from {} can be applied in various areas of {}",
                note.title, note.topic
            ),
        ),
    ]
}

fn template_questions(note: &Note) -> Vec<QuizQuestion> {
    let main_topic = format!("{} fundamentals", note.title);
    let basics = format!("Basic principles of {}", note.topic);
    vec![
        QuizQuestion {
            question: format!("What is the main topic of {}?", note.title),
            options: vec![
                main_topic.clone(),
                format!("Introduction to {}", note.topic),
                format!("Advanced {}", note.topic),
                "None of the above".to_string(),
            ],
            correct_answer: main_topic,
            explanation: None,
        },
        QuizQuestion {
            question: format!("Which of the following is most likely covered in {}?", note.title),
            options: vec![
                basics.clone(),
                format!("Advanced applications of {}", note.topic),
                format!("Historical development of {}", note.topic),
                format!("Future trends in {}", note.topic),
            ],
            correct_answer: basics,
            explanation: None,
        },
        QuizQuestion {
            question: "What would be the best approach to study this material?".to_string(),
            options: vec![
                "Memorize key terms and definitions".to_string(),
                "Practice with example problems".to_string(),
                "Create concept maps connecting ideas".to_string(),
                "All of the above".to_string(),
            ],
            correct_answer: "All of the above".to_string(),
            explanation: None,
        },
    ]
}

/// One question per definition; the other definitions are the distractors
fn definition_questions(pairs: &[(String, String)]) -> Vec<QuizQuestion> {
    if pairs.len() < 2 {
        return Vec::new();
    }
    pairs
        .iter()
        .enumerate()
        .map(|(index, (term, definition))| {
            let mut options: Vec<String> = pairs
                .iter()
                .cycle()
                .skip(index + 1)
                .take(pairs.len() - 1)
                .map(|(_, other)| other.clone())
                .filter(|other| other != definition)
                .take(MAX_OPTIONS - 1)
                .collect();
            options.dedup();
            // Spread the right answer over the positions
            let position = index % (options.len() + 1);
            options.insert(position, definition.clone());

            QuizQuestion {
                question: format!("Which statement best describes {}?", term),
                options,
                correct_answer: definition.clone(),
                explanation: Some(format!("{}: {}", term, definition)),
            }
        })
        .collect()
}

impl ContentGenerator for OutlineGenerator {
    fn flashcards(&self, note: &Note) -> PlatformResult<Vec<Flashcard>> {
        check_note(note)?;
        let mut cards: Vec<Flashcard> = definitions(&note.content)
            .into_iter()
            .map(|(term, definition)| Flashcard::new(format!("What is {}?", term), definition))
            .collect();
        if cards.len() < MIN_CARDS {
            cards.extend(template_cards(note));
        }
        Ok(cards)
    }

    fn quiz_questions(&self, note: &Note) -> PlatformResult<Vec<QuizQuestion>> {
        check_note(note)?;
        let mut questions = definition_questions(&definitions(&note.content));
        if questions.len() < MIN_QUESTIONS {
            questions.extend(template_questions(note));
        }
        Ok(questions)
    }

    fn video_chapters(&self, note: &Note) -> PlatformResult<Vec<ChapterSuggestion>> {
        check_note(note)?;
        let sections = headings(&note.content);
        if !sections.is_empty() {
            return Ok(sections
                .into_iter()
                .map(|heading| ChapterSuggestion {
                    description: format!("Explains {} as covered in {}", heading, note.title),
                    title: heading,
                })
                .collect());
        }

        let title = &note.title;
        let chapter = |name: String, description: String| ChapterSuggestion {
            title: name,
            description,
        };
        Ok(vec![
            chapter(
                format!("Introduction to {}", title),
                format!("An overview of {} and its importance in {}", title, note.topic),
            ),
            chapter(
                format!("Core Concepts of {}", title),
                format!("Detailed explanation of the fundamental principles in {}", title),
            ),
            chapter(
                "Examples and Applications".to_string(),
                format!("Practical examples showing how concepts from {} are applied", title),
            ),
            chapter(
                "Common Challenges and Solutions".to_string(),
                format!("Addressing common difficulties students face when learning {}", title),
            ),
            chapter(
                "Summary and Next Steps".to_string(),
                format!("Recap of key points from {} and guidance on further learning", title),
            ),
        ])
    }
}
