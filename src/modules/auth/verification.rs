use super::manager::AccountManager;
use crate::modules::error::{PlatformError, PlatformResult};
use crate::modules::store::Filter;
use crate::modules::users::model::UserPatch;
use crate::modules::utils::logging::log_auth_event;

impl AccountManager {
    /// Consume an email verification token. Tokens are single use: the
    /// token and its expiry are cleared once the address is verified.
    pub fn verify_email(&self, token: &str) -> PlatformResult<()> {
        if token.is_empty() {
            return Err(PlatformError::InvalidToken);
        }
        let user = self
            .db
            .users
            .find_one(&Filter::eq("verification_token", token))?
            .ok_or(PlatformError::InvalidToken)?;

        if let Some(expiry) = user.verification_token_expiry {
            if self.clock.now() > expiry {
                log_auth_event("verify_email", &user.username, false, Some("token expired"));
                return Err(PlatformError::TokenExpired);
            }
        }

        self.db.users.update(&user.id, UserPatch::email_verified())?;
        log_auth_event("verify_email", &user.username, true, None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::modules::error::PlatformError;
    use crate::modules::testing::{test_platform, STRONG_PASSWORD};

    #[test]
    fn test_verification_is_single_use() {
        let t = test_platform();
        let registration = t
            .platform
            .accounts
            .register("ada", "ada@example.com", STRONG_PASSWORD, "Ada", "L")
            .unwrap();

        t.platform
            .accounts
            .verify_email(&registration.verification_token)
            .unwrap();
        let user = t.platform.accounts.get_user(&registration.user_id).unwrap();
        assert!(user.is_verified);

        assert!(matches!(
            t.platform
                .accounts
                .verify_email(&registration.verification_token),
            Err(PlatformError::InvalidToken)
        ));
    }

    #[test]
    fn test_unknown_and_empty_tokens() {
        let t = test_platform();
        t.register("ada");
        assert!(matches!(
            t.platform.accounts.verify_email("no-such-token"),
            Err(PlatformError::InvalidToken)
        ));
        assert!(matches!(
            t.platform.accounts.verify_email(""),
            Err(PlatformError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_verification_token() {
        let t = test_platform();
        let registration = t
            .platform
            .accounts
            .register("ada", "ada@example.com", STRONG_PASSWORD, "Ada", "L")
            .unwrap();

        t.clock.advance(86_401);
        assert!(matches!(
            t.platform
                .accounts
                .verify_email(&registration.verification_token),
            Err(PlatformError::TokenExpired)
        ));
    }

    #[test]
    fn test_token_valid_until_expiry() {
        let t = test_platform();
        let registration = t
            .platform
            .accounts
            .register("ada", "ada@example.com", STRONG_PASSWORD, "Ada", "L")
            .unwrap();

        // Still valid at the exact expiry second
        t.clock.advance(86_400);
        assert!(t
            .platform
            .accounts
            .verify_email(&registration.verification_token)
            .is_ok());
    }
}
