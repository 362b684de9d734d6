//! Course file resource model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LocalId;

/// Section label used when the enclosing content section has no name
pub const DEFAULT_SECTION: &str = "General";

/// Filename used when Moodle does not report one
pub const UNKNOWN_FILENAME: &str = "unknown";

/// A mirrored course file, keyed by `file_url`.
///
/// `moodle_id` is kept for reference only: Moodle repeats it (or reports 0)
/// across distinct files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Local identifier
    pub id: LocalId,
    pub moodle_id: i64,
    /// Remote id of the owning course
    pub course_id: i64,
    /// Display name of the course section the file lives in
    pub section: String,
    pub filename: String,
    /// Natural key
    pub file_url: String,
    pub mimetype: String,
    pub filesize: i64,
    pub time_created: Option<DateTime<Utc>>,
    pub is_new: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

/// Resource columns that reconciliation may overwrite on an existing row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceField {
    Section,
}

impl ResourceField {
    pub const fn column(self) -> &'static str {
        match self {
            Self::Section => "section",
        }
    }
}
