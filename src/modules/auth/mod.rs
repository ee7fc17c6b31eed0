pub mod hashing;
pub mod manager;
pub mod password;
pub mod tokens;
mod verification;

// Re-export the main types and functions
pub use hashing::{PasswordHasher, Pbkdf2Hasher};
pub use manager::{AccountManager, DeletionAuthority, Registration};
pub use password::{validate_email, validate_password, PasswordError};
pub use tokens::{RandomTokenGenerator, ResetInfo, TokenGenerator, RESET_REQUESTED_MESSAGE};
