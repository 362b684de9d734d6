//! Decoded Moodle web service payloads.
//!
//! Every field Moodle may omit is optional here; defaults are applied by the
//! sync engine when the local row is built.

use std::fmt;

use serde::Deserialize;

/// Application-level error returned by Moodle in place of data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteError {
    #[serde(default)]
    pub exception: Option<String>,
    #[serde(default)]
    pub errorcode: String,
    #[serde(default)]
    pub message: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.message.trim(), self.errorcode.trim()) {
            ("", "") => write!(f, "unknown remote error"),
            ("", code) => write!(f, "{code}"),
            (message, "") => write!(f, "{message}"),
            (message, code) => write!(f, "{message} ({code})"),
        }
    }
}

/// A Moodle response: either the requested data or an error envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteReply<T> {
    Error(RemoteError),
    Data(T),
}

/// Entry of `core_enrol_get_users_courses`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RemoteCourse {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub fullname: Option<String>,
    #[serde(default)]
    pub shortname: Option<String>,
    #[serde(default)]
    pub category: Option<i64>,
    /// Completion percentage; Moodle sends `null` when tracking is off
    #[serde(default)]
    pub progress: Option<f64>,
}

/// Body of `mod_assign_get_assignments`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssignmentsResponse {
    #[serde(default)]
    pub courses: Vec<RemoteAssignmentCourse>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteAssignmentCourse {
    pub id: i64,
    #[serde(default)]
    pub assignments: Vec<RemoteAssignment>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteAssignment {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub cmid: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub intro: Option<String>,
    /// Epoch seconds, `0` when unset
    #[serde(default)]
    pub duedate: Option<i64>,
}

/// Body of `mod_assign_get_submission_status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionStatus {
    #[serde(default)]
    pub lastattempt: Option<LastAttempt>,
    #[serde(default)]
    pub feedback: Option<Feedback>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LastAttempt {
    #[serde(default)]
    pub submission: Option<SubmissionState>,
    #[serde(default)]
    pub teamsubmission: Option<SubmissionState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionState {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub gradefordisplay: Option<String>,
}

/// Section of `core_course_get_contents`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteSection {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub modules: Vec<RemoteModule>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteModule {
    #[serde(default)]
    pub contents: Vec<RemoteContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteContent {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub fileurl: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub filesize: Option<i64>,
    /// Epoch seconds
    #[serde(default)]
    pub timecreated: Option<i64>,
}

impl RemoteContent {
    pub fn is_file(&self) -> bool {
        self.kind.as_deref() == Some("file")
    }
}
