use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::modules::store::{Patch, Record, RecordId, StoreResult, Update};

/// Derived account state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    UnverifiedActive,
    VerifiedActive,
    Inactive,
    Locked,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Profile {
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub education_level: Option<String>,
    pub subjects: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
    pub notification_email: bool,
    pub study_reminder: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: "en".to_string(),
            notification_email: true,
            study_reminder: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct StudyStats {
    /// Minutes spent studying
    pub total_study_time: u64,
    pub quizzes_completed: u64,
    pub flashcards_reviewed: u64,
    pub last_activity: Option<u64>,
}

/// Password-reset and lockout bookkeeping
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SecurityState {
    pub password_reset_token: Option<String>,
    pub password_reset_expiry: Option<u64>,
    pub failed_login_attempts: u32,
    pub last_password_change: u64,
}

/// Persisted user account
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub is_verified: bool,
    pub verification_token: Option<String>,
    pub verification_token_expiry: Option<u64>,
    pub created_at: u64,
    pub last_login: Option<u64>,
    #[serde(default)]
    pub deactivated_at: Option<u64>,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub study_stats: StudyStats,
    #[serde(default)]
    pub security: SecurityState,
}

impl Record for User {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &RecordId {
        &self.id
    }
}

impl User {
    pub fn account_state(&self, max_failed_logins: u32) -> AccountState {
        if !self.is_active {
            AccountState::Inactive
        } else if self.security.failed_login_attempts >= max_failed_logins {
            AccountState::Locked
        } else if self.is_verified {
            AccountState::VerifiedActive
        } else {
            AccountState::UnverifiedActive
        }
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary::from(self)
    }
}

/// Sanitized view of a user: no hash, no tokens, no security block
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserSummary {
    pub id: RecordId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: u64,
    pub last_login: Option<u64>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            is_admin: user.is_admin,
            is_active: user.is_active,
            is_verified: user.is_verified,
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

/// Editable profile fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar: Option<String>,
    pub bio: Option<String>,
    pub education_level: Option<String>,
    pub subjects: Option<Vec<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.first_name.is_none()
            && self.last_name.is_none()
            && self.avatar.is_none()
            && self.bio.is_none()
            && self.education_level.is_none()
            && self.subjects.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreferencesUpdate {
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub notification_email: Option<bool>,
    pub study_reminder: Option<bool>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.language.is_none()
            && self.notification_email.is_none()
            && self.study_reminder.is_none()
    }
}

/// Amounts added to the study counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StudyIncrement {
    pub study_minutes: u64,
    pub quizzes_completed: u64,
    pub flashcards_reviewed: u64,
}

impl StudyIncrement {
    pub fn is_empty(&self) -> bool {
        self.study_minutes == 0 && self.quizzes_completed == 0 && self.flashcards_reviewed == 0
    }
}

/// Typed partial update of a [`User`]
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    update: Update,
}

impl UserPatch {
    fn from_update(update: Update) -> Self {
        Self { update }
    }

    pub fn login_succeeded(at: u64) -> Self {
        Self::from_update(
            Update::new()
                .set("last_login", at)
                .set("security.failed_login_attempts", 0u32)
                .set("study_stats.last_activity", at),
        )
    }

    /// Atomic `+1` on the failed-login counter
    pub fn login_failed() -> Self {
        Self::from_update(Update::new().inc("security.failed_login_attempts", 1))
    }

    pub fn email_verified() -> Self {
        Self::from_update(
            Update::new()
                .set("is_verified", true)
                .set("verification_token", Value::Null)
                .set("verification_token_expiry", Value::Null),
        )
    }

    pub fn password_changed(password_hash: String, at: u64) -> Self {
        Self::from_update(
            Update::new()
                .set("password_hash", password_hash)
                .set("security.last_password_change", at),
        )
    }

    /// New password from a reset token: also clears the token and the lockout counter
    pub fn password_reset(password_hash: String, at: u64) -> Self {
        Self::password_changed(password_hash, at)
            .with(Self::reset_token_cleared())
            .with(Self::failed_logins_cleared())
    }

    pub fn reset_token_issued(token: String, expiry: u64) -> Self {
        Self::from_update(
            Update::new()
                .set("security.password_reset_token", token)
                .set("security.password_reset_expiry", expiry),
        )
    }

    pub fn reset_token_cleared() -> Self {
        Self::from_update(
            Update::new()
                .set("security.password_reset_token", Value::Null)
                .set("security.password_reset_expiry", Value::Null),
        )
    }

    pub fn failed_logins_cleared() -> Self {
        Self::from_update(Update::new().set("security.failed_login_attempts", 0u32))
    }

    pub fn deactivated(at: u64) -> Self {
        Self::from_update(
            Update::new()
                .set("is_active", false)
                .set("deactivated_at", at),
        )
    }

    pub fn reactivated() -> Self {
        Self::from_update(
            Update::new()
                .set("is_active", true)
                .set("deactivated_at", Value::Null),
        )
    }

    pub fn promoted_to_admin() -> Self {
        Self::from_update(Update::new().set("is_admin", true))
    }

    pub fn profile(changes: ProfileUpdate) -> Self {
        let mut update = Update::new();
        if let Some(first_name) = changes.first_name {
            update = update.set("first_name", first_name);
        }
        if let Some(last_name) = changes.last_name {
            update = update.set("last_name", last_name);
        }
        if let Some(avatar) = changes.avatar {
            update = update.set("profile.avatar", avatar);
        }
        if let Some(bio) = changes.bio {
            update = update.set("profile.bio", bio);
        }
        if let Some(level) = changes.education_level {
            update = update.set("profile.education_level", level);
        }
        if let Some(subjects) = changes.subjects {
            update = update.set("profile.subjects", subjects);
        }
        Self::from_update(update)
    }

    pub fn preferences(changes: PreferencesUpdate) -> StoreResult<Self> {
        let mut update = Update::new();
        if let Some(theme) = changes.theme {
            update = update.set("preferences.theme", serde_json::to_value(theme)?);
        }
        if let Some(language) = changes.language {
            update = update.set("preferences.language", language);
        }
        if let Some(flag) = changes.notification_email {
            update = update.set("preferences.notification_email", flag);
        }
        if let Some(flag) = changes.study_reminder {
            update = update.set("preferences.study_reminder", flag);
        }
        Ok(Self::from_update(update))
    }

    pub fn study_activity(increment: StudyIncrement, at: u64) -> Self {
        Self::from_update(
            Update::new()
                .inc("study_stats.total_study_time", increment.study_minutes as i64)
                .inc("study_stats.quizzes_completed", increment.quizzes_completed as i64)
                .inc("study_stats.flashcards_reviewed", increment.flashcards_reviewed as i64)
                .set("study_stats.last_activity", at),
        )
    }

    /// Combine two patches; later operations win on the same field
    pub fn with(self, other: UserPatch) -> Self {
        Self::from_update(self.update.merge(other.update))
    }
}

impl Patch for UserPatch {
    type Target = User;

    fn into_update(self) -> Update {
        self.update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::store::UpdateOp;

    fn sample_user() -> User {
        User {
            id: RecordId::from("u1"),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            is_admin: false,
            is_active: true,
            is_verified: false,
            verification_token: Some("tok".to_string()),
            verification_token_expiry: Some(100),
            created_at: 1,
            last_login: None,
            deactivated_at: None,
            profile: Profile::default(),
            preferences: Preferences::default(),
            study_stats: StudyStats::default(),
            security: SecurityState::default(),
        }
    }

    #[test]
    fn test_account_state() {
        let mut user = sample_user();
        assert_eq!(user.account_state(5), AccountState::UnverifiedActive);

        user.is_verified = true;
        assert_eq!(user.account_state(5), AccountState::VerifiedActive);

        user.security.failed_login_attempts = 5;
        assert_eq!(user.account_state(5), AccountState::Locked);

        // Deactivation takes precedence over lockout
        user.is_active = false;
        assert_eq!(user.account_state(5), AccountState::Inactive);
    }

    #[test]
    fn test_summary_is_sanitized() {
        let user = sample_user();
        let json = serde_json::to_value(user.summary()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("verification_token").is_none());
        assert!(json.get("security").is_none());
        assert_eq!(json["username"], "ada");
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let json = serde_json::json!({
            "_id": "u2",
            "username": "bob",
            "email": "bob@example.com",
            "password_hash": "h",
            "first_name": "Bob",
            "last_name": "B",
            "is_admin": false,
            "is_active": true,
            "is_verified": true,
            "verification_token": null,
            "verification_token_expiry": null,
            "created_at": 5,
            "last_login": null
        });
        let user: User = serde_json::from_value(json).unwrap();
        assert_eq!(user.preferences.language, "en");
        assert_eq!(user.preferences.theme, Theme::Light);
        assert_eq!(user.security.failed_login_attempts, 0);
    }

    #[test]
    fn test_profile_patch_only_touches_given_fields() {
        let patch = UserPatch::profile(ProfileUpdate {
            bio: Some("Maths".to_string()),
            ..Default::default()
        });
        let update = patch.into_update();
        assert_eq!(
            update.ops(),
            &[UpdateOp::Set("profile.bio".to_string(), Value::from("Maths"))]
        );
    }

    #[test]
    fn test_preferences_patch_stores_theme_as_serialized() {
        let update = UserPatch::preferences(PreferencesUpdate {
            theme: Some(Theme::Dark),
            ..Default::default()
        })
        .unwrap()
        .into_update();
        assert_eq!(
            update.ops(),
            &[UpdateOp::Set(
                "preferences.theme".to_string(),
                serde_json::to_value(Theme::Dark).unwrap()
            )]
        );

        let mut doc = serde_json::to_value(sample_user()).unwrap();
        update.apply(&mut doc).unwrap();
        let user: User = serde_json::from_value(doc).unwrap();
        assert_eq!(user.preferences.theme, Theme::Dark);
    }

    #[test]
    fn test_password_reset_patch_clears_token_and_counter() {
        let mut doc = serde_json::to_value(sample_user()).unwrap();
        doc["security"]["password_reset_token"] = Value::from("reset");
        doc["security"]["failed_login_attempts"] = Value::from(7);

        UserPatch::password_reset("new-hash".to_string(), 42)
            .into_update()
            .apply(&mut doc)
            .unwrap();

        let user: User = serde_json::from_value(doc).unwrap();
        assert_eq!(user.password_hash, "new-hash");
        assert_eq!(user.security.password_reset_token, None);
        assert_eq!(user.security.failed_login_attempts, 0);
        assert_eq!(user.security.last_password_change, 42);
    }
}
