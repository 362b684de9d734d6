//! Assignment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LocalId;

/// A mirrored Moodle assignment, keyed by `moodle_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Local identifier
    pub id: LocalId,
    /// Remote assignment id (natural key)
    pub moodle_id: i64,
    /// Remote id of the owning course, fixed at creation
    pub course_id: i64,
    /// Course-module id, used to build links into Moodle
    pub cmid: Option<i64>,
    pub name: String,
    pub description: String,
    pub due_date: Option<DateTime<Utc>>,
    pub submitted: bool,
    /// Display grade, e.g. `"85 %"`
    pub grade: Option<String>,
    /// Set on creation; only cleared by consumers of the mirror
    pub is_new: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

/// Assignment columns that reconciliation may overwrite on an existing row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssignmentField {
    Name,
    Description,
    DueDate,
    Cmid,
    Submitted,
    Grade,
}

impl AssignmentField {
    pub const fn column(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::DueDate => "due_date",
            Self::Cmid => "cmid",
            Self::Submitted => "submitted",
            Self::Grade => "grade",
        }
    }
}
