//! Bounded fan-out of per-assignment submission status requests.

use std::collections::{HashMap, HashSet};

use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::gateway::{GatewayError, RemoteError, RemoteGateway, RemoteReply, SubmissionStatus};
use crate::util::normalize_text_option;

/// Maximum number of status requests in flight at once.
pub const STATUS_FETCH_CONCURRENCY: usize = 5;

const SUBMITTED_STATES: [&str; 2] = ["submitted", "graded"];

/// Submission state of one assignment as mirrored locally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentStatus {
    pub submitted: bool,
    pub grade: Option<String>,
}

impl AssignmentStatus {
    pub fn from_remote(status: &SubmissionStatus) -> Self {
        let submitted = status.lastattempt.as_ref().is_some_and(|attempt| {
            [&attempt.submission, &attempt.teamsubmission]
                .into_iter()
                .flatten()
                .filter_map(|state| state.status.as_deref())
                .any(|state| SUBMITTED_STATES.contains(&state))
        });
        let grade = status
            .feedback
            .as_ref()
            .and_then(|feedback| normalize_grade(feedback.gradefordisplay.as_deref()));

        Self { submitted, grade }
    }
}

/// Why a status could not be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusFailure {
    /// Moodle answered with an error envelope
    Remote(RemoteError),
    /// Transport, HTTP status or decode failure
    Transport(String),
}

impl std::fmt::Display for StatusFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(error) => write!(f, "remote error: {error}"),
            Self::Transport(message) => write!(f, "transport failure: {message}"),
        }
    }
}

/// Result of one status request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    Fetched(AssignmentStatus),
    Unknown(StatusFailure),
}

impl StatusOutcome {
    /// Effective status; unknown resolves to not submitted and ungraded.
    pub fn status(&self) -> AssignmentStatus {
        match self {
            Self::Fetched(status) => status.clone(),
            Self::Unknown(_) => AssignmentStatus::default(),
        }
    }

    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

/// Outcomes keyed by Moodle assignment id.
pub type StatusMap = HashMap<i64, StatusOutcome>;

/// Normalize Moodle's display grade: `&nbsp;` markup becomes a plain space.
pub fn normalize_grade(raw: Option<&str>) -> Option<String> {
    raw.map(|grade| grade.replace("&nbsp;", " ").replace('\u{a0}', " "))
        .and_then(|grade| normalize_text_option(Some(grade)))
}

pub struct StatusEnricher<'g, G> {
    gateway: &'g G,
    limit: usize,
}

impl<'g, G: RemoteGateway> StatusEnricher<'g, G> {
    pub const fn new(gateway: &'g G) -> Self {
        Self {
            gateway,
            limit: STATUS_FETCH_CONCURRENCY,
        }
    }

    /// Fetch the status of every distinct id.
    ///
    /// Every id gets an entry. All dispatched requests are awaited before
    /// this returns, whatever their outcome.
    pub async fn enrich(&self, assignment_ids: &[i64]) -> StatusMap {
        let mut seen = HashSet::new();
        let ids = assignment_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect::<Vec<_>>();

        tracing::debug!(
            "Fetching submission status for {} assignment(s), {} at a time",
            ids.len(),
            self.limit
        );

        let semaphore = Semaphore::new(self.limit);
        let requests = ids.iter().map(|&id| {
            let semaphore = &semaphore;
            async move {
                let outcome = match semaphore.acquire().await {
                    Ok(_permit) => self.fetch_one(id).await,
                    Err(_) => StatusOutcome::Unknown(StatusFailure::Transport(
                        "status request limiter closed".to_string(),
                    )),
                };
                (id, outcome)
            }
        });

        let outcomes = join_all(requests).await.into_iter().collect::<StatusMap>();

        let unknown = outcomes
            .values()
            .filter(|outcome| outcome.is_unknown())
            .count();
        if unknown > 0 {
            tracing::warn!(
                "Submission status unknown for {unknown} of {} assignment(s)",
                outcomes.len()
            );
        }
        outcomes
    }

    async fn fetch_one(&self, id: i64) -> StatusOutcome {
        let outcome = match self.gateway.get_assignment_status(id).await {
            Ok(RemoteReply::Data(status)) => {
                StatusOutcome::Fetched(AssignmentStatus::from_remote(&status))
            }
            Ok(RemoteReply::Error(error)) => StatusOutcome::Unknown(StatusFailure::Remote(error)),
            Err(GatewayError::Remote(error)) => {
                StatusOutcome::Unknown(StatusFailure::Remote(error))
            }
            Err(error) => StatusOutcome::Unknown(StatusFailure::Transport(error.to_string())),
        };

        if let StatusOutcome::Unknown(failure) = &outcome {
            tracing::warn!("Could not fetch status of assignment {id}: {failure}");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::gateway::{Feedback, LastAttempt, SubmissionState};
    use crate::sync::testing::{FakeGateway, Scripted};

    fn status(
        submission: Option<&str>,
        team: Option<&str>,
        grade: Option<&str>,
    ) -> SubmissionStatus {
        let state = |value: Option<&str>| {
            value.map(|value| SubmissionState {
                status: Some(value.to_string()),
            })
        };
        SubmissionStatus {
            lastattempt: Some(LastAttempt {
                submission: state(submission),
                teamsubmission: state(team),
            }),
            feedback: Some(Feedback {
                gradefordisplay: grade.map(str::to_string),
            }),
        }
    }

    #[test]
    fn test_normalize_grade() {
        assert_eq!(normalize_grade(Some("85&nbsp;%")), Some("85 %".to_string()));
        assert_eq!(normalize_grade(Some("  A-\u{a0}")), Some("A-".to_string()));
        assert_eq!(normalize_grade(Some("&nbsp;")), None);
        assert_eq!(normalize_grade(Some("")), None);
        assert_eq!(normalize_grade(None), None);
    }

    #[test]
    fn test_status_from_remote() {
        let graded_team = AssignmentStatus::from_remote(&status(Some("new"), Some("graded"), None));
        assert!(graded_team.submitted);

        let submitted = AssignmentStatus::from_remote(&status(Some("submitted"), None, Some("7")));
        assert_eq!(
            submitted,
            AssignmentStatus {
                submitted: true,
                grade: Some("7".to_string()),
            }
        );

        let draft = AssignmentStatus::from_remote(&status(Some("draft"), Some("new"), None));
        assert!(!draft.submitted);

        let empty = AssignmentStatus::from_remote(&SubmissionStatus::default());
        assert_eq!(empty, AssignmentStatus::default());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fan_out_is_bounded_and_complete() {
        let gateway = FakeGateway::default().with_status_delay(Duration::from_millis(20));
        for id in 1..=23 {
            let reply = match id % 4 {
                0 => Scripted::Transport,
                1 => Scripted::Envelope(RemoteError {
                    exception: None,
                    errorcode: "nopermission".to_string(),
                    message: String::new(),
                }),
                _ => Scripted::Data(status(Some("submitted"), None, Some("9"))),
            };
            gateway.script_status(id, reply);
        }

        let ids = (1..=23).collect::<Vec<_>>();
        let outcomes = StatusEnricher::new(&gateway).enrich(&ids).await;

        assert_eq!(outcomes.len(), 23);
        assert!(gateway.max_in_flight() <= STATUS_FETCH_CONCURRENCY);
        assert!(gateway.max_in_flight() > 1);
        assert_eq!(gateway.status_calls(), 23);

        assert!(outcomes[&4].is_unknown());
        assert!(matches!(
            outcomes[&5],
            StatusOutcome::Unknown(StatusFailure::Remote(_))
        ));
        assert_eq!(outcomes[&4].status(), AssignmentStatus::default());
        assert!(outcomes[&2].status().submitted);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unscripted_status_resolves_to_default() {
        let gateway = FakeGateway::default();
        let outcomes = StatusEnricher::new(&gateway).enrich(&[42]).await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[&42].status(), AssignmentStatus::default());
        assert!(outcomes[&42].is_unknown());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_ids_fetched_once() {
        let gateway = FakeGateway::default();
        gateway.script_status(7, Scripted::Data(status(Some("submitted"), None, None)));

        let outcomes = StatusEnricher::new(&gateway).enrich(&[7, 7, 7]).await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(gateway.status_calls(), 1);
    }
}
