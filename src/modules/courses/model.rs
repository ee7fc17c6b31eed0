use serde::{Deserialize, Serialize};

use crate::modules::store::{Patch, Record, RecordId, Update};

/// A course, owned by exactly one user
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub user_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: u64,
    pub last_updated: u64,
}

impl Record for Course {
    const COLLECTION: &'static str = "courses";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// A module inside a course
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Module {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub course_id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub created_at: u64,
    pub last_updated: u64,
}

impl Record for Module {
    const COLLECTION: &'static str = "modules";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

/// Editable course or module details
#[derive(Debug, Clone, Default)]
pub struct DetailsUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl DetailsUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

fn details_update(changes: DetailsUpdate, at: u64) -> Update {
    let mut update = Update::new();
    if let Some(title) = changes.title {
        update = update.set("title", title);
    }
    if let Some(description) = changes.description {
        update = update.set("description", description);
    }
    update.set("last_updated", at)
}

pub struct CoursePatch(Update);

impl CoursePatch {
    pub fn details(changes: DetailsUpdate, at: u64) -> Self {
        CoursePatch(details_update(changes, at))
    }

    pub fn touched(at: u64) -> Self {
        CoursePatch(Update::new().set("last_updated", at))
    }
}

impl Patch for CoursePatch {
    type Target = Course;

    fn into_update(self) -> Update {
        self.0
    }
}

pub struct ModulePatch(Update);

impl ModulePatch {
    pub fn details(changes: DetailsUpdate, at: u64) -> Self {
        ModulePatch(details_update(changes, at))
    }

    pub fn touched(at: u64) -> Self {
        ModulePatch(Update::new().set("last_updated", at))
    }
}

impl Patch for ModulePatch {
    type Target = Module;

    fn into_update(self) -> Update {
        self.0
    }
}
