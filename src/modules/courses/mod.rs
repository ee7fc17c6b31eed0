mod manager;
pub mod model;

pub use manager::CourseManager;
pub use model::{Course, DetailsUpdate, Module};
