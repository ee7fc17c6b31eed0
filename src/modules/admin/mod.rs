mod accounts;
mod setup;

pub use accounts::AdminManager;
pub use setup::BootstrapOutcome;
