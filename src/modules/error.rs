use std::fmt;

use crate::modules::auth::password::PasswordError;
use crate::modules::store::StoreError;

/// Kinds of entity an error can refer to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Course,
    Module,
    FlashcardDeck,
    Quiz,
    VideoChapter,
    Note,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Course => "course",
            EntityKind::Module => "module",
            EntityKind::FlashcardDeck => "flashcard deck",
            EntityKind::Quiz => "quiz",
            EntityKind::VideoChapter => "video chapter",
            EntityKind::Note => "note",
        };
        f.write_str(name)
    }
}

/// Coarse error classes a presentation layer maps to user-facing responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Permission,
    Conflict,
    ExpiredToken,
    InvalidToken,
    Authentication,
    External,
    Storage,
}

/// Error type shared by every manager of the platform
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    WeakPassword(#[from] PasswordError),
    #[error("{0} not found")]
    NotFound(EntityKind),
    #[error("you don't have permission to modify this {0}")]
    PermissionDenied(EntityKind),
    #[error("admin privileges required")]
    AdminRequired,
    #[error("{0}")]
    Conflict(String),
    #[error("invalid or unknown token")]
    InvalidToken,
    #[error("token has expired, please request a new one")]
    TokenExpired,
    #[error("account is disabled")]
    AccountDisabled,
    #[error("account temporarily locked due to too many failed login attempts")]
    AccountLocked,
    #[error("email address has not been verified")]
    EmailNotVerified,
    #[error("invalid password")]
    InvalidPassword,
    #[error("current password is incorrect")]
    WrongPassword,
    #[error("content generation failed: {0}")]
    Generation(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

impl PlatformError {
    pub fn validation(message: impl Into<String>) -> Self {
        PlatformError::Validation(message.into())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PlatformError::Validation(_) | PlatformError::WeakPassword(_) => {
                ErrorCategory::Validation
            }
            PlatformError::NotFound(_) => ErrorCategory::NotFound,
            PlatformError::PermissionDenied(_) | PlatformError::AdminRequired => {
                ErrorCategory::Permission
            }
            PlatformError::Conflict(_) => ErrorCategory::Conflict,
            PlatformError::TokenExpired => ErrorCategory::ExpiredToken,
            PlatformError::InvalidToken => ErrorCategory::InvalidToken,
            PlatformError::AccountDisabled
            | PlatformError::AccountLocked
            | PlatformError::EmailNotVerified
            | PlatformError::InvalidPassword
            | PlatformError::WrongPassword => ErrorCategory::Authentication,
            PlatformError::Generation(_) => ErrorCategory::External,
            PlatformError::Storage(_) => ErrorCategory::Storage,
        }
    }
}

pub type PlatformResult<T> = Result<T, PlatformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            PlatformError::validation("All fields are required").category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            PlatformError::from(PasswordError::TooShort).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            PlatformError::NotFound(EntityKind::Module).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            PlatformError::PermissionDenied(EntityKind::Course).category(),
            ErrorCategory::Permission
        );
        assert_eq!(PlatformError::TokenExpired.category(), ErrorCategory::ExpiredToken);
        assert_eq!(PlatformError::InvalidToken.category(), ErrorCategory::InvalidToken);
        assert_eq!(
            PlatformError::from(StoreError::Backend("down".into())).category(),
            ErrorCategory::Storage
        );
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            PlatformError::NotFound(EntityKind::FlashcardDeck).to_string(),
            "flashcard deck not found"
        );
        assert_eq!(
            PlatformError::PermissionDenied(EntityKind::Module).to_string(),
            "you don't have permission to modify this module"
        );
        assert_eq!(
            PlatformError::from(PasswordError::NoDigit).to_string(),
            "Password must contain at least one digit"
        );
    }
}
