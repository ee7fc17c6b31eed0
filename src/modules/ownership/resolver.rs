use crate::modules::config::AccessPolicy;
use crate::modules::content::model::{FlashcardDeck, Note, Quiz, VideoChapter};
use crate::modules::courses::model::{Course, Module};
use crate::modules::error::{EntityKind, PlatformError, PlatformResult};
use crate::modules::store::{Database, RecordId};

/// A module with the course it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleOwnership {
    pub module: Module,
    pub course: Course,
    pub owner_id: RecordId,
}

/// A content item with its module and course
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOwnership<T> {
    pub content: T,
    pub module: Module,
    pub course: Course,
    pub owner_id: RecordId,
}

/// Check that `acting_user_id` owns the entity. Administrators get no
/// exemption here; admin operations check the flag themselves.
pub fn authorize(
    kind: EntityKind,
    owner_id: &RecordId,
    acting_user_id: &RecordId,
) -> PlatformResult<()> {
    if owner_id == acting_user_id {
        Ok(())
    } else {
        Err(PlatformError::PermissionDenied(kind))
    }
}

/// Walks content -> module -> course -> user to find who owns what
#[derive(Clone)]
pub struct OwnershipResolver {
    db: Database,
    policy: AccessPolicy,
}

impl OwnershipResolver {
    pub fn new(db: Database, policy: AccessPolicy) -> Self {
        Self { db, policy }
    }

    pub fn resolve_course_owner(&self, course_id: &RecordId) -> PlatformResult<Course> {
        self.db
            .courses
            .find_by_id(course_id)?
            .ok_or(PlatformError::NotFound(EntityKind::Course))
    }

    /// A module whose course is gone is reported as a missing course
    pub fn resolve_module_owner(&self, module_id: &RecordId) -> PlatformResult<ModuleOwnership> {
        let module = self
            .db
            .modules
            .find_by_id(module_id)?
            .ok_or(PlatformError::NotFound(EntityKind::Module))?;
        let course = self.resolve_course_owner(&module.course_id)?;
        Ok(ModuleOwnership {
            owner_id: course.user_id.clone(),
            module,
            course,
        })
    }

    fn resolve_content<T>(
        &self,
        content: Option<T>,
        kind: EntityKind,
        module_id: impl FnOnce(&T) -> &RecordId,
    ) -> PlatformResult<ContentOwnership<T>> {
        let content = content.ok_or(PlatformError::NotFound(kind))?;
        let chain = self.resolve_module_owner(module_id(&content))?;
        Ok(ContentOwnership {
            content,
            module: chain.module,
            course: chain.course,
            owner_id: chain.owner_id,
        })
    }

    pub fn resolve_deck_owner(
        &self,
        deck_id: &RecordId,
    ) -> PlatformResult<ContentOwnership<FlashcardDeck>> {
        let deck = self.db.flashcard_decks.find_by_id(deck_id)?;
        self.resolve_content(deck, EntityKind::FlashcardDeck, |d| &d.module_id)
    }

    pub fn resolve_quiz_owner(&self, quiz_id: &RecordId) -> PlatformResult<ContentOwnership<Quiz>> {
        let quiz = self.db.quizzes.find_by_id(quiz_id)?;
        self.resolve_content(quiz, EntityKind::Quiz, |q| &q.module_id)
    }

    pub fn resolve_chapter_owner(
        &self,
        chapter_id: &RecordId,
    ) -> PlatformResult<ContentOwnership<VideoChapter>> {
        let chapter = self.db.video_chapters.find_by_id(chapter_id)?;
        self.resolve_content(chapter, EntityKind::VideoChapter, |c| &c.module_id)
    }

    fn check(
        &self,
        kind: EntityKind,
        owner_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<()> {
        authorize(kind, owner_id, acting_user_id).map_err(|e| match e {
            PlatformError::PermissionDenied(kind) if self.policy.conceal_foreign_entities => {
                PlatformError::NotFound(kind)
            }
            other => other,
        })
    }

    pub fn authorize_course(
        &self,
        course_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<Course> {
        let course = self.resolve_course_owner(course_id)?;
        self.check(EntityKind::Course, &course.user_id, acting_user_id)?;
        Ok(course)
    }

    pub fn authorize_module(
        &self,
        module_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<ModuleOwnership> {
        let chain = self.resolve_module_owner(module_id)?;
        self.check(EntityKind::Module, &chain.owner_id, acting_user_id)?;
        Ok(chain)
    }

    pub fn authorize_deck(
        &self,
        deck_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<ContentOwnership<FlashcardDeck>> {
        let chain = self.resolve_deck_owner(deck_id)?;
        self.check(EntityKind::FlashcardDeck, &chain.owner_id, acting_user_id)?;
        Ok(chain)
    }

    pub fn authorize_quiz(
        &self,
        quiz_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<ContentOwnership<Quiz>> {
        let chain = self.resolve_quiz_owner(quiz_id)?;
        self.check(EntityKind::Quiz, &chain.owner_id, acting_user_id)?;
        Ok(chain)
    }

    pub fn authorize_chapter(
        &self,
        chapter_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<ContentOwnership<VideoChapter>> {
        let chain = self.resolve_chapter_owner(chapter_id)?;
        self.check(EntityKind::VideoChapter, &chain.owner_id, acting_user_id)?;
        Ok(chain)
    }

    /// Notes belong to a user directly, outside the course tree
    pub fn authorize_note(&self, note_id: &RecordId, acting_user_id: &RecordId) -> PlatformResult<Note> {
        let note = self
            .db
            .notes
            .find_by_id(note_id)?
            .ok_or(PlatformError::NotFound(EntityKind::Note))?;
        self.check(EntityKind::Note, &note.user_id, acting_user_id)?;
        Ok(note)
    }
}
