// First, declare the modules folder itself
mod modules;

// Re-export everything from modules for easier access
pub use modules::{
    admin, auth, cascade, config, content, courses, error, ownership, platform, store, users,
    utils,
};

// Re-export commonly used types
pub use modules::auth::{AccountManager, DeletionAuthority};
pub use modules::cascade::DeletionReport;
pub use modules::config::PlatformConfig;
pub use modules::error::{EntityKind, PlatformError, PlatformResult};
pub use modules::platform::{Collaborators, Platform};
pub use modules::store::{DocumentStore, MemoryStore, RecordId};

// Constants
pub const CONFIG_FILE: &str = "axiom_config.json";
pub const CONFIG_FILE_ENV: &str = "AXIOM_CONFIG";

// Type aliases
pub type HmacSha256 = hmac::Hmac<sha2::Sha256>;
