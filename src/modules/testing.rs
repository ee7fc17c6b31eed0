//! Shared fixtures for unit tests

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::modules::auth::{Pbkdf2Hasher, TokenGenerator};
use crate::modules::config::PlatformConfig;
use crate::modules::content::{Flashcard, NewVideoChapter, OutlineGenerator, QuizQuestion};
use crate::modules::platform::{Collaborators, Platform};
use crate::modules::store::{
    DocumentStore, Filter, MemoryStore, RecordId, StoreError, StoreResult, Update,
};
use crate::modules::utils::time::ManualClock;

pub(crate) const STRONG_PASSWORD: &str = "LongEnough1!";

const START: u64 = 1_700_000_000;

/// Predictable tokens: `token-1`, `token-2`, ...
#[derive(Default)]
pub(crate) struct SequentialTokens {
    issued: AtomicU64,
}

impl TokenGenerator for SequentialTokens {
    fn new_opaque_token(&self) -> String {
        format!("token-{}", self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Memory store whose deletes can be made to fail for one collection
pub(crate) struct FailingStore {
    inner: Arc<MemoryStore>,
    failing: Mutex<Option<String>>,
}

impl FailingStore {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStore::new()),
            failing: Mutex::new(None),
        }
    }

    pub(crate) fn fail_deletes_in(&self, collection: &str) {
        *self.failing.lock() = Some(collection.to_string());
    }

    fn check(&self, collection: &str) -> StoreResult<()> {
        match self.failing.lock().as_deref() {
            Some(failing) if failing == collection => {
                Err(StoreError::Backend(format!("injected failure in {}", collection)))
            }
            _ => Ok(()),
        }
    }
}

impl DocumentStore for FailingStore {
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Value>> {
        self.inner.find_one(collection, filter)
    }

    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Value>> {
        self.inner.find(collection, filter)
    }

    fn insert_one(&self, collection: &str, document: Value) -> StoreResult<RecordId> {
        self.inner.insert_one(collection, document)
    }

    fn update_one(&self, collection: &str, filter: &Filter, update: &Update) -> StoreResult<u64> {
        self.inner.update_one(collection, filter, update)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.check(collection)?;
        self.inner.delete_one(collection, filter)
    }

    fn delete_many(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.check(collection)?;
        self.inner.delete_many(collection, filter)
    }

    fn create_unique_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        self.inner.create_unique_index(collection, field)
    }
}

pub(crate) struct TestPlatform {
    pub platform: Platform,
    pub clock: Arc<ManualClock>,
    /// The memory store under the platform, for counting documents
    pub store: Arc<MemoryStore>,
}

fn build(backend: Arc<dyn DocumentStore>, store: Arc<MemoryStore>, config: PlatformConfig) -> TestPlatform {
    let clock = Arc::new(ManualClock::new(START));
    let collaborators = Collaborators {
        hasher: Arc::new(Pbkdf2Hasher::new(10)),
        tokens: Arc::new(SequentialTokens::default()),
        clock: clock.clone(),
        generator: Arc::new(OutlineGenerator),
    };
    let platform = Platform::with_collaborators(backend, &config, collaborators)
        .expect("test platform builds");
    TestPlatform {
        platform,
        clock,
        store,
    }
}

pub(crate) fn test_platform() -> TestPlatform {
    test_platform_with(|_| {})
}

pub(crate) fn test_platform_with<F>(configure: F) -> TestPlatform
where
    F: FnOnce(&mut PlatformConfig),
{
    let mut config = PlatformConfig::default();
    configure(&mut config);
    let store = Arc::new(MemoryStore::new());
    build(store.clone(), store, config)
}

pub(crate) fn test_platform_on(failing: Arc<FailingStore>) -> TestPlatform {
    let store = Arc::clone(&failing.inner);
    build(failing, store, PlatformConfig::default())
}

impl TestPlatform {
    /// Register `<username>@example.com` with [`STRONG_PASSWORD`]
    pub fn register(&self, username: &str) -> RecordId {
        self.platform
            .accounts
            .register(
                username,
                &format!("{}@example.com", username),
                STRONG_PASSWORD,
                username,
                "User",
            )
            .expect("registration succeeds")
            .user_id
    }

    pub fn make_admin(&self, username: &str) -> RecordId {
        self.platform
            .admin
            .bootstrap_admin(
                username,
                &format!("{}@example.com", username),
                STRONG_PASSWORD,
                username,
                "Admin",
            )
            .expect("bootstrap succeeds")
            .user_id()
            .clone()
    }

    pub fn course_with_module(&self, owner: &RecordId) -> (RecordId, RecordId) {
        let course = self
            .platform
            .courses
            .create_course(owner, "Biology", "Living things")
            .expect("course created");
        let module = self.module(owner, &course.id);
        (course.id, module)
    }

    pub fn module(&self, owner: &RecordId, course: &RecordId) -> RecordId {
        self.platform
            .courses
            .create_module(course, owner, "Cells", "")
            .expect("module created")
            .id
    }

    pub fn deck(&self, owner: &RecordId, module: &RecordId) -> RecordId {
        self.platform
            .content
            .create_flashcard_deck(module, owner, "Terms", vec![Flashcard::new("Cell", "Unit of life")])
            .expect("deck created")
            .id
    }

    pub fn quiz(&self, owner: &RecordId, module: &RecordId) -> RecordId {
        let question = QuizQuestion {
            question: "Smallest unit of life?".to_string(),
            options: vec!["Atom".to_string(), "Cell".to_string()],
            correct_answer: "Cell".to_string(),
            explanation: None,
        };
        self.platform
            .content
            .create_quiz(module, owner, "Check", vec![question])
            .expect("quiz created")
            .id
    }

    pub fn chapter(&self, owner: &RecordId, module: &RecordId) -> RecordId {
        let chapter = NewVideoChapter {
            title: "Intro".to_string(),
            video_url: "https://video.example/cells".to_string(),
            start_time: 0,
            end_time: 120,
            transcript: String::new(),
        };
        self.platform
            .content
            .create_video_chapter(module, owner, chapter)
            .expect("chapter created")
            .id
    }

    pub fn note(&self, owner: &RecordId) -> RecordId {
        self.platform
            .content
            .save_note(owner, "Cells", "Biology", "Cell: the unit of life")
            .expect("note saved")
            .id
    }
}
