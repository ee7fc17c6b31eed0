use serde::Serialize;
use std::fmt;

use crate::modules::courses::model::{Course, Module};
use crate::modules::error::{PlatformError, PlatformResult};
use crate::modules::ownership::OwnershipResolver;
use crate::modules::store::{Database, Filter, RecordId};
use crate::modules::users::model::User;
use crate::modules::utils::logging::log_data_operation;

/// Number of documents removed by a cascade, per collection
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub courses: u64,
    pub modules: u64,
    pub flashcard_decks: u64,
    pub quizzes: u64,
    pub video_chapters: u64,
    pub notes: u64,
}

impl DeletionReport {
    pub fn merge(&mut self, other: DeletionReport) {
        self.courses += other.courses;
        self.modules += other.modules;
        self.flashcard_decks += other.flashcard_decks;
        self.quizzes += other.quizzes;
        self.video_chapters += other.video_chapters;
        self.notes += other.notes;
    }

    pub fn total(&self) -> u64 {
        self.courses
            + self.modules
            + self.flashcard_decks
            + self.quizzes
            + self.video_chapters
            + self.notes
    }
}

impl fmt::Display for DeletionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "courses: {}, modules: {}, flashcard decks: {}, quizzes: {}, video chapters: {}, notes: {}",
            self.courses,
            self.modules,
            self.flashcard_decks,
            self.quizzes,
            self.video_chapters,
            self.notes
        )
    }
}

/// Removes a parent together with everything it contains.
///
/// Deletion is best-effort cleanup: children go first and the first failing
/// step stops the cascade. Nothing is rolled back, so documents removed before
/// the failure stay removed.
#[derive(Clone)]
pub struct CascadeDeleter {
    db: Database,
    resolver: OwnershipResolver,
}

impl CascadeDeleter {
    pub fn new(db: Database, resolver: OwnershipResolver) -> Self {
        Self { db, resolver }
    }

    pub fn delete_course(
        &self,
        course_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<DeletionReport> {
        let course = self.resolver.authorize_course(course_id, acting_user_id)?;
        let resource = format!("course:{}", course.id);
        logged("delete_course", acting_user_id, &resource, || {
            self.purge_course(&course)
        })
    }

    pub fn delete_module(
        &self,
        module_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<DeletionReport> {
        let chain = self.resolver.authorize_module(module_id, acting_user_id)?;
        let resource = format!("module:{}", chain.module.id);
        logged("delete_module", acting_user_id, &resource, || {
            self.purge_module(&chain.module)
        })
    }

    /// Delete everything a user owns, then the user document itself
    pub fn purge_user(&self, user: &User) -> PlatformResult<DeletionReport> {
        let resource = format!("user:{}", user.id);
        logged("purge_user", &user.id, &resource, || {
            let mut report = DeletionReport::default();
            for course in self.db.courses.find(&Filter::eq("user_id", &user.id))? {
                report.merge(self.purge_course(&course)?);
            }
            report.notes = self.db.notes.delete_many(&Filter::eq("user_id", &user.id))?;
            self.db.users.delete_by_id(&user.id)?;
            Ok(report)
        })
    }

    fn purge_course(&self, course: &Course) -> PlatformResult<DeletionReport> {
        let mut report = DeletionReport::default();
        for module in self.db.modules.find(&Filter::eq("course_id", &course.id))? {
            report.merge(self.purge_module(&module)?);
        }
        if self.db.courses.delete_by_id(&course.id)? {
            report.courses += 1;
        }
        Ok(report)
    }

    fn purge_module(&self, module: &Module) -> PlatformResult<DeletionReport> {
        let contained = Filter::eq("module_id", &module.id);
        let mut report = DeletionReport {
            flashcard_decks: self.db.flashcard_decks.delete_many(&contained)?,
            quizzes: self.db.quizzes.delete_many(&contained)?,
            video_chapters: self.db.video_chapters.delete_many(&contained)?,
            ..DeletionReport::default()
        };
        if self.db.modules.delete_by_id(&module.id)? {
            report.modules += 1;
        }
        Ok(report)
    }
}

fn logged<F>(operation: &str, user: &RecordId, resource: &str, run: F) -> PlatformResult<DeletionReport>
where
    F: FnOnce() -> PlatformResult<DeletionReport>,
{
    let outcome = run();
    match &outcome {
        Ok(report) => {
            let details = report.to_string();
            log_data_operation(operation, user.as_str(), resource, true, Some(&details));
        }
        Err(PlatformError::Storage(e)) => {
            let details = format!("stopped part way: {}", e);
            log_data_operation(operation, user.as_str(), resource, false, Some(&details));
        }
        Err(e) => {
            let details = e.to_string();
            log_data_operation(operation, user.as_str(), resource, false, Some(&details));
        }
    }
    outcome
}
