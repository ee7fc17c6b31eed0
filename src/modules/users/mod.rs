pub mod model;
mod profile;

pub use model::{
    AccountState, Preferences, PreferencesUpdate, Profile, ProfileUpdate, StudyIncrement,
    StudyStats, Theme, User, UserSummary,
};
pub use profile::{ProfileManager, ProfileView};
