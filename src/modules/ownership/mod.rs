mod resolver;

pub use resolver::{authorize, ContentOwnership, ModuleOwnership, OwnershipResolver};
