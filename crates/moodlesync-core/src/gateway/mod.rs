//! Remote gateway to the Moodle web service API.

mod moodle;
mod payload;

use serde::de::DeserializeOwned;
use thiserror::Error;

pub use moodle::MoodleClient;
pub use payload::{
    AssignmentsResponse, Feedback, LastAttempt, RemoteAssignment, RemoteAssignmentCourse,
    RemoteContent, RemoteCourse, RemoteError, RemoteModule, RemoteReply, RemoteSection,
    SubmissionState, SubmissionStatus,
};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Invalid gateway configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Moodle returned an error: {0}")]
    Remote(RemoteError),
    #[error("Moodle HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Moodle responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected Moodle payload: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Remote operations consumed by the sync engine.
///
/// Course, assignment and content calls surface an error envelope as
/// `GatewayError::Remote`. The status call hands it back as data so the
/// caller decides how severe it is.
#[allow(async_fn_in_trait)]
pub trait RemoteGateway {
    /// Courses the configured user is enrolled in.
    async fn list_enrolled_courses(&self) -> GatewayResult<Vec<RemoteCourse>>;

    /// Assignments grouped by course for the given course ids.
    async fn list_assignments(&self, course_ids: &[i64]) -> GatewayResult<AssignmentsResponse>;

    /// Submission status of a single assignment.
    async fn get_assignment_status(
        &self,
        assignment_id: i64,
    ) -> GatewayResult<RemoteReply<SubmissionStatus>>;

    /// Section/module/content tree of a course.
    async fn get_course_contents(&self, course_id: i64) -> GatewayResult<Vec<RemoteSection>>;
}

impl<T> RemoteReply<T> {
    /// Treat an error envelope as a failure.
    pub fn into_data(self) -> GatewayResult<T> {
        match self {
            Self::Data(data) => Ok(data),
            Self::Error(error) => Err(GatewayError::Remote(error)),
        }
    }
}

/// Decode a Moodle response body.
///
/// Moodle answers failures with HTTP 200 and an object carrying `exception`
/// or `errorcode`; that shape is checked before the expected data shape.
pub fn decode_reply<T: DeserializeOwned>(body: &str) -> GatewayResult<RemoteReply<T>> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    if value.get("exception").is_some() || value.get("errorcode").is_some() {
        return Ok(RemoteReply::Error(serde_json::from_value(value)?));
    }
    Ok(RemoteReply::Data(serde_json::from_value(value)?))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn decode_reply_recognises_error_envelope() {
        let body = r#"{
            "exception": "moodle_exception",
            "errorcode": "invalidtoken",
            "message": "Invalid token - token not found"
        }"#;

        let reply = decode_reply::<Vec<RemoteCourse>>(body).unwrap();
        let RemoteReply::Error(error) = reply else {
            panic!("expected an error envelope");
        };
        assert_eq!(error.errorcode, "invalidtoken");
        assert_eq!(
            error.to_string(),
            "Invalid token - token not found (invalidtoken)"
        );
    }

    #[test]
    fn decode_reply_reads_course_list() {
        let body = r#"[
            {"id": 10, "fullname": "Algebra", "shortname": "ALG", "category": 3, "progress": 42.6},
            {"id": 11, "fullname": "Physics", "progress": null}
        ]"#;

        let courses = decode_reply::<Vec<RemoteCourse>>(body)
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].id, Some(10));
        assert_eq!(courses[0].category, Some(3));
        assert_eq!(courses[1].progress, None);
        assert_eq!(courses[1].shortname, None);
    }

    #[test]
    fn decode_reply_reads_submission_status() {
        let body = r#"{
            "lastattempt": {
                "submission": {"status": "submitted"},
                "teamsubmission": null
            },
            "feedback": {"gradefordisplay": "85&nbsp;%"},
            "warnings": []
        }"#;

        let status = decode_reply::<SubmissionStatus>(body)
            .unwrap()
            .into_data()
            .unwrap();
        let attempt = status.lastattempt.unwrap();
        assert_eq!(
            attempt.submission.unwrap().status.as_deref(),
            Some("submitted")
        );
        assert!(attempt.teamsubmission.is_none());
        assert_eq!(
            status.feedback.unwrap().gradefordisplay.as_deref(),
            Some("85&nbsp;%")
        );
    }

    #[test]
    fn decode_reply_reads_course_contents() {
        let body = r#"[
            {"name": "Week 1", "modules": [
                {"contents": [
                    {"type": "file", "fileurl": "https://x/f1", "filename": "f1.pdf", "filesize": 12, "timecreated": 1700000000},
                    {"type": "url", "fileurl": "https://example.com"}
                ]},
                {"name": "forum"}
            ]},
            {"name": "Empty"}
        ]"#;

        let sections = decode_reply::<Vec<RemoteSection>>(body)
            .unwrap()
            .into_data()
            .unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].modules.len(), 2);
        assert!(sections[0].modules[0].contents[0].is_file());
        assert!(!sections[0].modules[0].contents[1].is_file());
        assert!(sections[0].modules[1].contents.is_empty());
        assert!(sections[1].modules.is_empty());
    }

    #[test]
    fn decode_reply_rejects_unexpected_shape() {
        let result = decode_reply::<Vec<RemoteCourse>>(r#"{"courses": []}"#);
        assert!(matches!(result, Err(GatewayError::Decode(_))));
    }

    #[test]
    fn into_data_turns_envelope_into_remote_error() {
        let reply: RemoteReply<Vec<RemoteCourse>> = RemoteReply::Error(RemoteError {
            exception: None,
            errorcode: "nopermissions".to_string(),
            message: String::new(),
        });
        let error = reply.into_data().unwrap_err();
        assert!(matches!(error, GatewayError::Remote(_)));
        assert!(error.to_string().contains("nopermissions"));
    }
}
