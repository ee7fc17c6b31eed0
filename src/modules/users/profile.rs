use serde::Serialize;
use std::sync::Arc;

use super::model::{
    Preferences, PreferencesUpdate, Profile, ProfileUpdate, StudyIncrement, StudyStats, User,
    UserPatch,
};
use crate::modules::error::{EntityKind, PlatformError, PlatformResult};
use crate::modules::store::{Database, RecordId};
use crate::modules::utils::time::Clock;

const NOTHING_TO_UPDATE: &str = "No valid fields to update";

/// Everything a user may see about their own account
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_verified: bool,
    pub created_at: u64,
    pub last_login: Option<u64>,
    pub profile: Profile,
    pub preferences: Preferences,
    pub study_stats: StudyStats,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_verified: user.is_verified,
            created_at: user.created_at,
            last_login: user.last_login,
            profile: user.profile,
            preferences: user.preferences,
            study_stats: user.study_stats,
        }
    }
}

/// Profile, preferences and study statistics
#[derive(Clone)]
pub struct ProfileManager {
    db: Database,
    clock: Arc<dyn Clock>,
}

impl ProfileManager {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    fn find_user(&self, user_id: &RecordId) -> PlatformResult<User> {
        self.db
            .users
            .find_by_id(user_id)?
            .ok_or(PlatformError::NotFound(EntityKind::User))
    }

    fn apply(&self, user_id: &RecordId, patch: UserPatch) -> PlatformResult<()> {
        if self.db.users.update(user_id, patch)? {
            Ok(())
        } else {
            Err(PlatformError::NotFound(EntityKind::User))
        }
    }

    pub fn get_profile(&self, user_id: &RecordId) -> PlatformResult<ProfileView> {
        self.find_user(user_id).map(ProfileView::from)
    }

    pub fn update_profile(&self, user_id: &RecordId, changes: ProfileUpdate) -> PlatformResult<()> {
        if changes.is_empty() {
            return Err(PlatformError::validation(NOTHING_TO_UPDATE));
        }
        self.apply(user_id, UserPatch::profile(changes))
    }

    pub fn update_preferences(
        &self,
        user_id: &RecordId,
        changes: PreferencesUpdate,
    ) -> PlatformResult<()> {
        if changes.is_empty() {
            return Err(PlatformError::validation(NOTHING_TO_UPDATE));
        }
        self.apply(user_id, UserPatch::preferences(changes)?)
    }

    pub fn get_study_statistics(&self, user_id: &RecordId) -> PlatformResult<StudyStats> {
        Ok(self.find_user(user_id)?.study_stats)
    }

    /// Add to the study counters and stamp the last activity time. The
    /// counters are incremented in the store, so concurrent sessions add up.
    pub fn record_study_activity(
        &self,
        user_id: &RecordId,
        increment: StudyIncrement,
    ) -> PlatformResult<()> {
        if increment.is_empty() {
            return Err(PlatformError::validation(NOTHING_TO_UPDATE));
        }
        self.apply(user_id, UserPatch::study_activity(increment, self.clock.now()))
    }

    pub fn track_study_time(&self, user_id: &RecordId, minutes: u64) -> PlatformResult<()> {
        self.record_study_activity(
            user_id,
            StudyIncrement {
                study_minutes: minutes,
                ..StudyIncrement::default()
            },
        )
    }

    pub fn track_quiz_completion(&self, user_id: &RecordId) -> PlatformResult<()> {
        self.record_study_activity(
            user_id,
            StudyIncrement {
                quizzes_completed: 1,
                ..StudyIncrement::default()
            },
        )
    }

    pub fn track_flashcard_review(&self, user_id: &RecordId, cards: u64) -> PlatformResult<()> {
        self.record_study_activity(
            user_id,
            StudyIncrement {
                flashcards_reviewed: cards,
                ..StudyIncrement::default()
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::testing::test_platform;
    use crate::modules::users::model::Theme;

    #[test]
    fn test_profile_view_has_no_secrets() {
        let t = test_platform();
        let ada = t.register("ada");
        let view = t.platform.profiles.get_profile(&ada).unwrap();
        assert_eq!(view.username, "ada");
        assert_eq!(view.preferences, Preferences::default());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("security").is_none());
    }

    #[test]
    fn test_update_profile() {
        let t = test_platform();
        let ada = t.register("ada");
        let profiles = &t.platform.profiles;

        assert!(matches!(
            profiles.update_profile(&ada, ProfileUpdate::default()),
            Err(PlatformError::Validation(ref m)) if m == NOTHING_TO_UPDATE
        ));

        profiles
            .update_profile(
                &ada,
                ProfileUpdate {
                    first_name: Some("Augusta".to_string()),
                    subjects: Some(vec!["Maths".to_string(), "Poetry".to_string()]),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();

        let view = profiles.get_profile(&ada).unwrap();
        assert_eq!(view.first_name, "Augusta");
        assert_eq!(view.last_name, "User");
        assert_eq!(view.profile.subjects, vec!["Maths", "Poetry"]);
        assert_eq!(view.profile.bio, None);
    }

    #[test]
    fn test_update_preferences() {
        let t = test_platform();
        let ada = t.register("ada");
        let profiles = &t.platform.profiles;

        assert!(profiles
            .update_preferences(&ada, PreferencesUpdate::default())
            .is_err());
        profiles
            .update_preferences(
                &ada,
                PreferencesUpdate {
                    theme: Some(Theme::Dark),
                    study_reminder: Some(true),
                    ..PreferencesUpdate::default()
                },
            )
            .unwrap();

        let preferences = profiles.get_profile(&ada).unwrap().preferences;
        assert_eq!(preferences.theme, Theme::Dark);
        assert!(preferences.study_reminder);
        assert_eq!(preferences.language, "en");
    }

    #[test]
    fn test_study_tracking_accumulates() {
        let t = test_platform();
        let ada = t.register("ada");
        let profiles = &t.platform.profiles;

        profiles.track_study_time(&ada, 25).unwrap();
        profiles.track_study_time(&ada, 20).unwrap();
        profiles.track_quiz_completion(&ada).unwrap();
        t.clock.advance(30);
        profiles.track_flashcard_review(&ada, 12).unwrap();

        let stats = profiles.get_study_statistics(&ada).unwrap();
        assert_eq!(stats.total_study_time, 45);
        assert_eq!(stats.quizzes_completed, 1);
        assert_eq!(stats.flashcards_reviewed, 12);
        assert_eq!(stats.last_activity, Some(t.clock.now()));
    }

    #[test]
    fn test_empty_increment_and_unknown_user() {
        let t = test_platform();
        let ada = t.register("ada");
        let profiles = &t.platform.profiles;

        assert!(matches!(
            profiles.track_study_time(&ada, 0),
            Err(PlatformError::Validation(_))
        ));
        assert!(matches!(
            profiles.track_quiz_completion(&RecordId::from("missing")),
            Err(PlatformError::NotFound(EntityKind::User))
        ));
    }
}
