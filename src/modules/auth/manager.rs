use log::info;
use std::sync::Arc;

use super::hashing::PasswordHasher;
use super::password::{validate_email, validate_password};
use super::tokens::TokenGenerator;
use crate::modules::cascade::{CascadeDeleter, DeletionReport};
use crate::modules::config::AccountPolicy;
use crate::modules::error::{EntityKind, PlatformError, PlatformResult};
use crate::modules::store::{Database, Filter, RecordId};
use crate::modules::users::model::{
    AccountState, Preferences, Profile, SecurityState, StudyStats, User, UserPatch, UserSummary,
};
use crate::modules::utils::logging::log_auth_event;
use crate::modules::utils::time::Clock;

/// Result of a successful registration. The verification token is handed
/// back so the caller can deliver it out of band.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub user_id: RecordId,
    pub verification_token: String,
}

/// Who is asking for an account to be deleted
#[derive(Debug, Clone)]
pub enum DeletionAuthority {
    /// The account holder, confirming with their password
    SelfService { password: String },
    /// An administrator acting on someone else's account
    Admin { acting_admin_id: RecordId },
}

/// Registration, login and the rest of the account lifecycle
#[derive(Clone)]
pub struct AccountManager {
    pub(super) db: Database,
    pub(super) hasher: Arc<dyn PasswordHasher>,
    pub(super) tokens: Arc<dyn TokenGenerator>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) policy: AccountPolicy,
    cascade: CascadeDeleter,
}

impl AccountManager {
    pub fn new(
        db: Database,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenGenerator>,
        clock: Arc<dyn Clock>,
        policy: AccountPolicy,
        cascade: CascadeDeleter,
    ) -> Self {
        Self {
            db,
            hasher,
            tokens,
            clock,
            policy,
            cascade,
        }
    }

    pub fn policy(&self) -> &AccountPolicy {
        &self.policy
    }

    pub(crate) fn find_user(&self, user_id: &RecordId) -> PlatformResult<User> {
        self.db
            .users
            .find_by_id(user_id)?
            .ok_or(PlatformError::NotFound(EntityKind::User))
    }

    /// Load the acting user and check their admin flag
    pub(crate) fn require_admin(&self, acting_user_id: &RecordId) -> PlatformResult<User> {
        match self.db.users.find_by_id(acting_user_id)? {
            Some(user) if user.is_admin => Ok(user),
            _ => Err(PlatformError::AdminRequired),
        }
    }

    pub(crate) fn check_password(&self, user: &User, password: &str) -> PlatformResult<()> {
        if self.hasher.verify(password, &user.password_hash) {
            Ok(())
        } else {
            Err(PlatformError::WrongPassword)
        }
    }

    pub fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> PlatformResult<Registration> {
        if [username, email, password, first_name, last_name]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(PlatformError::validation("All fields are required"));
        }
        if !validate_email(email) {
            return Err(PlatformError::validation("Invalid email format"));
        }
        validate_password(password)?;

        if self.db.users.find_one(&Filter::eq("username", username))?.is_some() {
            log_auth_event("register", username, false, Some("username taken"));
            return Err(PlatformError::Conflict("Username already taken".to_string()));
        }
        if self.db.users.find_one(&Filter::eq("email", email))?.is_some() {
            log_auth_event("register", username, false, Some("email taken"));
            return Err(PlatformError::Conflict(
                "Email already registered".to_string(),
            ));
        }

        let now = self.clock.now();
        let verification_token = self.tokens.new_opaque_token();
        let user = User {
            id: RecordId::generate(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: self.hasher.hash(password),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_admin: false,
            is_active: true,
            is_verified: false,
            verification_token: Some(verification_token.clone()),
            verification_token_expiry: Some(now + self.policy.token_ttl_secs),
            created_at: now,
            last_login: None,
            deactivated_at: None,
            profile: Profile::default(),
            preferences: Preferences::default(),
            study_stats: StudyStats::default(),
            security: SecurityState {
                last_password_change: now,
                ..SecurityState::default()
            },
        };

        let user_id = self.db.users.insert(&user)?;
        log_auth_event("register", username, true, None);
        Ok(Registration {
            user_id,
            verification_token,
        })
    }

    /// Authenticate by username or email
    pub fn login(&self, identifier: &str, password: &str) -> PlatformResult<UserSummary> {
        let lookup = Filter::or(vec![
            Filter::eq("username", identifier),
            Filter::eq("email", identifier),
        ]);
        let mut user = match self.db.users.find_one(&lookup)? {
            Some(user) => user,
            None => {
                log_auth_event("login", identifier, false, Some("unknown user"));
                return Err(PlatformError::NotFound(EntityKind::User));
            }
        };

        let refusal = match user.account_state(self.policy.max_failed_logins) {
            AccountState::Inactive => Some(PlatformError::AccountDisabled),
            AccountState::Locked => Some(PlatformError::AccountLocked),
            AccountState::UnverifiedActive if self.policy.require_verified_login => {
                Some(PlatformError::EmailNotVerified)
            }
            _ => None,
        };
        if let Some(error) = refusal {
            log_auth_event("login", identifier, false, Some(&error.to_string()));
            return Err(error);
        }

        if !self.hasher.verify(password, &user.password_hash) {
            self.db.users.update(&user.id, UserPatch::login_failed())?;
            log_auth_event("login", identifier, false, Some("invalid password"));
            return Err(PlatformError::InvalidPassword);
        }

        let now = self.clock.now();
        self.db.users.update(&user.id, UserPatch::login_succeeded(now))?;
        user.last_login = Some(now);
        user.security.failed_login_attempts = 0;

        log_auth_event("login", identifier, true, None);
        Ok(user.summary())
    }

    pub fn change_password(
        &self,
        user_id: &RecordId,
        current_password: &str,
        new_password: &str,
    ) -> PlatformResult<()> {
        let user = self.find_user(user_id)?;
        if let Err(e) = self.check_password(&user, current_password) {
            log_auth_event("change_password", &user.username, false, Some("wrong password"));
            return Err(e);
        }
        validate_password(new_password)?;

        let patch = UserPatch::password_changed(self.hasher.hash(new_password), self.clock.now());
        self.db.users.update(&user.id, patch)?;
        log_auth_event("change_password", &user.username, true, None);
        Ok(())
    }

    /// Self-service deactivation; the account stays in place and can be
    /// reactivated by an administrator
    pub fn deactivate(&self, user_id: &RecordId, password: &str) -> PlatformResult<()> {
        let user = self.find_user(user_id)?;
        if let Err(e) = self.check_password(&user, password) {
            log_auth_event("deactivate", &user.username, false, Some("wrong password"));
            return Err(e);
        }

        self.db
            .users
            .update(&user.id, UserPatch::deactivated(self.clock.now()))?;
        log_auth_event("deactivate", &user.username, true, None);
        Ok(())
    }

    pub fn reactivate(&self, acting_admin_id: &RecordId, user_id: &RecordId) -> PlatformResult<()> {
        let admin = self.require_admin(acting_admin_id)?;
        let user = self.find_user(user_id)?;

        self.db.users.update(&user.id, UserPatch::reactivated())?;
        let details = format!("reactivated by {}", admin.username);
        log_auth_event("reactivate", &user.username, true, Some(&details));
        Ok(())
    }

    /// Remove an account together with everything it owns
    pub fn delete_account(
        &self,
        user_id: &RecordId,
        authority: DeletionAuthority,
    ) -> PlatformResult<DeletionReport> {
        let user = self.find_user(user_id)?;
        match &authority {
            DeletionAuthority::SelfService { password } => {
                if let Err(e) = self.check_password(&user, password) {
                    log_auth_event("delete_account", &user.username, false, Some("wrong password"));
                    return Err(e);
                }
            }
            DeletionAuthority::Admin { acting_admin_id } => {
                self.require_admin(acting_admin_id)?;
            }
        }

        let report = self.cascade.purge_user(&user)?;
        info!("Deleted account {} ({})", user.id, report);
        log_auth_event("delete_account", &user.username, true, None);
        Ok(report)
    }

    pub fn get_user(&self, user_id: &RecordId) -> PlatformResult<UserSummary> {
        Ok(self.find_user(user_id)?.summary())
    }

    /// Look an account up by username or email without authenticating, so
    /// operations that check the password themselves leave the lockout
    /// counter alone
    pub fn find_by_identifier(&self, identifier: &str) -> PlatformResult<UserSummary> {
        let lookup = Filter::or(vec![
            Filter::eq("username", identifier),
            Filter::eq("email", identifier),
        ]);
        self.db
            .users
            .find_one(&lookup)?
            .map(|user| user.summary())
            .ok_or(PlatformError::NotFound(EntityKind::User))
    }
}
