use itertools::Itertools;
use std::sync::Arc;

use super::model::{Course, CoursePatch, DetailsUpdate, Module, ModulePatch};
use crate::modules::cascade::{CascadeDeleter, DeletionReport};
use crate::modules::error::{EntityKind, PlatformError, PlatformResult};
use crate::modules::ownership::OwnershipResolver;
use crate::modules::store::{Database, Filter, RecordId};
use crate::modules::utils::logging::log_data_operation;
use crate::modules::utils::time::Clock;

fn check_title(title: &str) -> PlatformResult<()> {
    if title.trim().is_empty() {
        return Err(PlatformError::validation("Title is required"));
    }
    Ok(())
}

fn check_details(changes: &DetailsUpdate) -> PlatformResult<()> {
    if changes.is_empty() {
        return Err(PlatformError::validation("No valid fields to update"));
    }
    match &changes.title {
        Some(title) => check_title(title),
        None => Ok(()),
    }
}

/// Course and module CRUD for their owners
#[derive(Clone)]
pub struct CourseManager {
    db: Database,
    clock: Arc<dyn Clock>,
    resolver: OwnershipResolver,
    cascade: CascadeDeleter,
}

impl CourseManager {
    pub fn new(
        db: Database,
        clock: Arc<dyn Clock>,
        resolver: OwnershipResolver,
        cascade: CascadeDeleter,
    ) -> Self {
        Self {
            db,
            clock,
            resolver,
            cascade,
        }
    }

    fn touch_course(&self, course_id: &RecordId) -> PlatformResult<()> {
        self.db
            .courses
            .update(course_id, CoursePatch::touched(self.clock.now()))?;
        Ok(())
    }

    pub fn create_course(
        &self,
        user_id: &RecordId,
        title: &str,
        description: &str,
    ) -> PlatformResult<Course> {
        check_title(title)?;
        if self.db.users.find_by_id(user_id)?.is_none() {
            return Err(PlatformError::NotFound(EntityKind::User));
        }

        let now = self.clock.now();
        let course = Course {
            id: RecordId::generate(),
            user_id: user_id.clone(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: now,
            last_updated: now,
        };
        self.db.courses.insert(&course)?;
        log_data_operation(
            "create_course",
            user_id.as_str(),
            &format!("course:{}", course.id),
            true,
            None,
        );
        Ok(course)
    }

    /// Courses owned by `user_id`, most recently updated first
    pub fn list_user_courses(&self, user_id: &RecordId) -> PlatformResult<Vec<Course>> {
        let courses = self.db.courses.find(&Filter::eq("user_id", user_id))?;
        Ok(courses
            .into_iter()
            .sorted_by(|a, b| b.last_updated.cmp(&a.last_updated))
            .collect())
    }

    pub fn get_course(&self, course_id: &RecordId) -> PlatformResult<Course> {
        self.resolver.resolve_course_owner(course_id)
    }

    pub fn update_course(
        &self,
        course_id: &RecordId,
        acting_user_id: &RecordId,
        changes: DetailsUpdate,
    ) -> PlatformResult<()> {
        check_details(&changes)?;
        let course = self.resolver.authorize_course(course_id, acting_user_id)?;

        self.db
            .courses
            .update(&course.id, CoursePatch::details(changes, self.clock.now()))?;
        log_data_operation(
            "update_course",
            acting_user_id.as_str(),
            &format!("course:{}", course.id),
            true,
            None,
        );
        Ok(())
    }

    /// Delete a course with its modules and their content
    pub fn delete_course(
        &self,
        course_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<DeletionReport> {
        self.cascade.delete_course(course_id, acting_user_id)
    }

    pub fn create_module(
        &self,
        course_id: &RecordId,
        acting_user_id: &RecordId,
        title: &str,
        description: &str,
    ) -> PlatformResult<Module> {
        check_title(title)?;
        let course = self.resolver.authorize_course(course_id, acting_user_id)?;

        let now = self.clock.now();
        let module = Module {
            id: RecordId::generate(),
            course_id: course.id.clone(),
            title: title.to_string(),
            description: description.to_string(),
            created_at: now,
            last_updated: now,
        };
        self.db.modules.insert(&module)?;
        self.touch_course(&course.id)?;
        log_data_operation(
            "create_module",
            acting_user_id.as_str(),
            &format!("module:{}", module.id),
            true,
            None,
        );
        Ok(module)
    }

    /// Modules of a course in creation order
    pub fn list_course_modules(&self, course_id: &RecordId) -> PlatformResult<Vec<Module>> {
        let modules = self.db.modules.find(&Filter::eq("course_id", course_id))?;
        Ok(modules
            .into_iter()
            .sorted_by_key(|module| module.created_at)
            .collect())
    }

    pub fn get_module(&self, module_id: &RecordId) -> PlatformResult<Module> {
        self.db
            .modules
            .find_by_id(module_id)?
            .ok_or(PlatformError::NotFound(EntityKind::Module))
    }

    pub fn update_module(
        &self,
        module_id: &RecordId,
        acting_user_id: &RecordId,
        changes: DetailsUpdate,
    ) -> PlatformResult<()> {
        check_details(&changes)?;
        let chain = self.resolver.authorize_module(module_id, acting_user_id)?;

        self.db
            .modules
            .update(&chain.module.id, ModulePatch::details(changes, self.clock.now()))?;
        self.touch_course(&chain.course.id)?;
        log_data_operation(
            "update_module",
            acting_user_id.as_str(),
            &format!("module:{}", chain.module.id),
            true,
            None,
        );
        Ok(())
    }

    /// Delete a module with its content; the parent course is touched
    pub fn delete_module(
        &self,
        module_id: &RecordId,
        acting_user_id: &RecordId,
    ) -> PlatformResult<DeletionReport> {
        let chain = self.resolver.authorize_module(module_id, acting_user_id)?;
        let report = self.cascade.delete_module(&chain.module.id, acting_user_id)?;
        self.touch_course(&chain.course.id)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::test_platform;

    #[test]
    fn test_create_course_requires_user_and_title() {
        let t = test_platform();
        let ada = t.register("ada");
        let courses = &t.platform.courses;

        assert!(matches!(
            courses.create_course(&RecordId::from("missing"), "Biology", ""),
            Err(PlatformError::NotFound(EntityKind::User))
        ));
        assert!(matches!(
            courses.create_course(&ada, "   ", ""),
            Err(PlatformError::Validation(_))
        ));

        let course = courses.create_course(&ada, "Biology", "Cells").unwrap();
        assert_eq!(course.user_id, ada);
        assert_eq!(courses.get_course(&course.id).unwrap(), course);
    }

    #[test]
    fn test_list_user_courses_only_returns_own() {
        let t = test_platform();
        let ada = t.register("ada");
        let bob = t.register("bob");
        let courses = &t.platform.courses;

        let first = courses.create_course(&ada, "Biology", "").unwrap();
        t.clock.advance(10);
        let second = courses.create_course(&ada, "Chemistry", "").unwrap();
        courses.create_course(&bob, "Physics", "").unwrap();

        let listed = courses.list_user_courses(&ada).unwrap();
        assert_eq!(
            listed.iter().map(|c| &c.id).collect::<Vec<_>>(),
            vec![&second.id, &first.id]
        );
    }

    #[test]
    fn test_update_course() {
        let t = test_platform();
        let ada = t.register("ada");
        let bob = t.register("bob");
        let courses = &t.platform.courses;
        let course = courses.create_course(&ada, "Biology", "").unwrap();

        assert!(matches!(
            courses.update_course(&course.id, &ada, DetailsUpdate::default()),
            Err(PlatformError::Validation(ref m)) if m == "No valid fields to update"
        ));
        assert!(matches!(
            courses.update_course(&course.id, &bob, DetailsUpdate::title("Mine now")),
            Err(PlatformError::PermissionDenied(EntityKind::Course))
        ));
        assert!(matches!(
            courses.update_course(&RecordId::from("missing"), &ada, DetailsUpdate::title("X")),
            Err(PlatformError::NotFound(EntityKind::Course))
        ));

        t.clock.advance(60);
        courses
            .update_course(&course.id, &ada, DetailsUpdate::title("Cell Biology"))
            .unwrap();
        let updated = courses.get_course(&course.id).unwrap();
        assert_eq!(updated.title, "Cell Biology");
        assert_eq!(updated.last_updated, t.clock.now());
    }

    #[test]
    fn test_module_lifecycle_touches_course() {
        let t = test_platform();
        let ada = t.register("ada");
        let bob = t.register("bob");
        let courses = &t.platform.courses;
        let course = courses.create_course(&ada, "Biology", "").unwrap();

        assert!(matches!(
            courses.create_module(&course.id, &bob, "Cells", ""),
            Err(PlatformError::PermissionDenied(EntityKind::Course))
        ));

        t.clock.advance(10);
        let module = courses.create_module(&course.id, &ada, "Cells", "").unwrap();
        assert_eq!(courses.get_course(&course.id).unwrap().last_updated, t.clock.now());

        t.clock.advance(10);
        courses
            .update_module(&module.id, &ada, DetailsUpdate::title("Cell walls"))
            .unwrap();
        assert_eq!(courses.get_module(&module.id).unwrap().title, "Cell walls");
        assert_eq!(courses.get_course(&course.id).unwrap().last_updated, t.clock.now());

        assert!(matches!(
            courses.update_module(&module.id, &bob, DetailsUpdate::title("Mine now")),
            Err(PlatformError::PermissionDenied(EntityKind::Module))
        ));
        assert_eq!(courses.get_module(&module.id).unwrap().title, "Cell walls");

        assert!(matches!(
            courses.delete_module(&module.id, &bob),
            Err(PlatformError::PermissionDenied(EntityKind::Module))
        ));
        t.clock.advance(10);
        let report = courses.delete_module(&module.id, &ada).unwrap();
        assert_eq!(report.modules, 1);
        assert!(courses.list_course_modules(&course.id).unwrap().is_empty());
        assert_eq!(courses.get_course(&course.id).unwrap().last_updated, t.clock.now());
    }

    #[test]
    fn test_list_course_modules_in_creation_order() {
        let t = test_platform();
        let ada = t.register("ada");
        let courses = &t.platform.courses;
        let course = courses.create_course(&ada, "Biology", "").unwrap();

        let first = courses.create_module(&course.id, &ada, "One", "").unwrap();
        t.clock.advance(1);
        let second = courses.create_module(&course.id, &ada, "Two", "").unwrap();

        let listed = courses.list_course_modules(&course.id).unwrap();
        assert_eq!(listed, vec![first, second]);
    }

    #[test]
    fn test_delete_course_cascades() {
        let t = test_platform();
        let ada = t.register("ada");
        let (course, module) = t.course_with_module(&ada);
        t.deck(&ada, &module);

        let report = t.platform.courses.delete_course(&course, &ada).unwrap();
        assert_eq!(report.courses, 1);
        assert_eq!(report.flashcard_decks, 1);
        assert!(matches!(
            t.platform.courses.get_course(&course),
            Err(PlatformError::NotFound(EntityKind::Course))
        ));
    }
}
