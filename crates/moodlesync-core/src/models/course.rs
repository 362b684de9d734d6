//! Course model

use serde::{Deserialize, Serialize};

use super::LocalId;

/// A mirrored Moodle course, keyed by `moodle_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Local identifier
    pub id: LocalId,
    /// Remote course id (natural key)
    pub moodle_id: i64,
    pub fullname: String,
    /// Fixed at creation
    pub shortname: String,
    /// Fixed at creation
    pub category_id: Option<i64>,
    /// Completion percentage reported by Moodle
    pub progress: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

/// Course columns that reconciliation may overwrite on an existing row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CourseField {
    Fullname,
    Progress,
}

impl CourseField {
    pub const fn column(self) -> &'static str {
        match self {
            Self::Fullname => "fullname",
            Self::Progress => "progress",
        }
    }
}
