//! Data models for the local mirror

mod assignment;
mod course;
mod id;
mod resource;

pub use assignment::{Assignment, AssignmentField};
pub use course::{Course, CourseField};
pub use id::LocalId;
pub use resource::{Resource, ResourceField, DEFAULT_SECTION, UNKNOWN_FILENAME};
