pub mod generator;
mod manager;
pub mod model;

pub use generator::{ChapterSuggestion, ContentGenerator, OutlineGenerator};
pub use manager::ContentManager;
pub use model::{
    ChapterUpdate, DeckUpdate, Flashcard, FlashcardDeck, ModuleContent, NewVideoChapter, Note,
    NoteSummary, Quiz, QuizQuestion, QuizUpdate, VideoChapter,
};
