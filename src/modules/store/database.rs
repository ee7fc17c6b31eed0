use std::sync::Arc;

use super::collection::Collection;
use super::document::{DocumentStore, StoreResult};
use crate::modules::content::model::{FlashcardDeck, Note, Quiz, VideoChapter};
use crate::modules::courses::model::{Course, Module};
use crate::modules::users::model::User;

/// Typed handles to every collection of the platform, sharing one backend
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    pub users: Collection<User>,
    pub courses: Collection<Course>,
    pub modules: Collection<Module>,
    pub flashcard_decks: Collection<FlashcardDeck>,
    pub quizzes: Collection<Quiz>,
    pub video_chapters: Collection<VideoChapter>,
    pub notes: Collection<Note>,
}

impl Database {
    /// Wrap a backend and declare the unique indexes on usernames and emails
    pub fn open(store: Arc<dyn DocumentStore>) -> StoreResult<Self> {
        let database = Self {
            users: Collection::new(Arc::clone(&store)),
            courses: Collection::new(Arc::clone(&store)),
            modules: Collection::new(Arc::clone(&store)),
            flashcard_decks: Collection::new(Arc::clone(&store)),
            quizzes: Collection::new(Arc::clone(&store)),
            video_chapters: Collection::new(Arc::clone(&store)),
            notes: Collection::new(Arc::clone(&store)),
            store,
        };
        database.users.create_unique_index("username")?;
        database.users.create_unique_index("email")?;
        Ok(database)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}
