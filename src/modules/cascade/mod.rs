mod deletion;

pub use deletion::{CascadeDeleter, DeletionReport};
