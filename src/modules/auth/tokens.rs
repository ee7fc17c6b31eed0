use rand::distributions::Alphanumeric;
use rand::Rng;

use super::manager::AccountManager;
use super::password::validate_password;
use crate::modules::error::{PlatformError, PlatformResult};
use crate::modules::store::{Filter, RecordId};
use crate::modules::users::model::UserPatch;
use crate::modules::utils::logging::log_auth_event;

/// Message returned for every reset request, whether or not the email exists
pub const RESET_REQUESTED_MESSAGE: &str =
    "If your email is registered, you will receive a password reset link";

/// Source of unguessable one-time tokens
pub trait TokenGenerator: Send + Sync {
    fn new_opaque_token(&self) -> String;
}

/// Alphanumeric tokens from the thread-local CSPRNG
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
    length: usize,
}

impl RandomTokenGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(16),
        }
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self::new(32)
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn new_opaque_token(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.length)
            .map(char::from)
            .collect()
    }
}

/// Outcome of a reset request. `token` is only set when a reset was
/// actually issued and is meant for in-process delivery, never for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ResetInfo {
    pub message: String,
    pub token: Option<String>,
}

impl AccountManager {
    /// Issue a password reset token for an active account. Any earlier
    /// token is overwritten.
    pub fn request_password_reset(&self, email: &str) -> PlatformResult<ResetInfo> {
        let user = self.db.users.find_one(&Filter::eq("email", email))?;

        let token = match user {
            Some(user) if user.is_active => {
                let token = self.tokens.new_opaque_token();
                let expiry = self.clock.now() + self.policy.token_ttl_secs;
                self.db
                    .users
                    .update(&user.id, UserPatch::reset_token_issued(token.clone(), expiry))?;
                log_auth_event("password_reset_request", &user.username, true, None);
                Some(token)
            }
            _ => {
                log_auth_event("password_reset_request", email, false, Some("no active account"));
                None
            }
        };

        Ok(ResetInfo {
            message: RESET_REQUESTED_MESSAGE.to_string(),
            token,
        })
    }

    /// Set a new password from a reset token. Also clears the lockout counter.
    pub fn reset_password(&self, token: &str, new_password: &str) -> PlatformResult<()> {
        if token.is_empty() {
            return Err(PlatformError::InvalidToken);
        }
        let user = self
            .db
            .users
            .find_one(&Filter::eq("security.password_reset_token", token))?
            .ok_or(PlatformError::InvalidToken)?;

        match user.security.password_reset_expiry {
            Some(expiry) if self.clock.now() <= expiry => {}
            _ => {
                log_auth_event("password_reset", &user.username, false, Some("token expired"));
                return Err(PlatformError::TokenExpired);
            }
        }
        validate_password(new_password)?;

        let patch = UserPatch::password_reset(self.hasher.hash(new_password), self.clock.now());
        self.db.users.update(&user.id, patch)?;
        log_auth_event("password_reset", &user.username, true, None);
        Ok(())
    }

    /// Withdraw a pending reset, e.g. when the holder did not request it
    pub fn cancel_password_reset(
        &self,
        user_id: &RecordId,
        current_password: &str,
    ) -> PlatformResult<()> {
        let user = self.find_user(user_id)?;
        if !self.hasher.verify(current_password, &user.password_hash) {
            return Err(PlatformError::WrongPassword);
        }
        if user.security.password_reset_token.is_none() {
            return Err(PlatformError::validation(
                "No active password reset to cancel",
            ));
        }

        self.db.users.update(&user.id, UserPatch::reset_token_cleared())?;
        log_auth_event("password_reset_cancel", &user.username, true, None);
        Ok(())
    }
}
