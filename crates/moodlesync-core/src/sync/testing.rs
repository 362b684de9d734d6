//! Scripted collaborators for sync tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::db::{ChangeSet, CommitSummary, MirrorRepository};
use crate::error::{Error, Result};
use crate::gateway::{
    AssignmentsResponse, GatewayError, GatewayResult, RemoteCourse, RemoteError, RemoteGateway,
    RemoteReply, RemoteSection, SubmissionStatus,
};
use crate::models::{Assignment, Course, Resource};

/// Canned answer for one remote call.
#[derive(Debug, Clone)]
pub enum Scripted<T> {
    Data(T),
    Envelope(RemoteError),
    Transport,
}

impl<T: Clone> Scripted<T> {
    fn reply(&self) -> GatewayResult<RemoteReply<T>> {
        match self {
            Self::Data(data) => Ok(RemoteReply::Data(data.clone())),
            Self::Envelope(error) => Ok(RemoteReply::Error(error.clone())),
            Self::Transport => Err(GatewayError::Status {
                status: 503,
                body: "service unavailable".to_string(),
            }),
        }
    }

    fn data(&self) -> GatewayResult<T> {
        self.reply()?.into_data()
    }
}

pub fn envelope(errorcode: &str) -> RemoteError {
    RemoteError {
        exception: Some("moodle_exception".to_string()),
        errorcode: errorcode.to_string(),
        message: format!("{errorcode} raised"),
    }
}

/// In-memory `RemoteGateway` recording every call it receives.
///
/// Unscripted status requests fail with a transport error; unscripted course
/// contents are empty.
#[derive(Debug)]
pub struct FakeGateway {
    courses: Scripted<Vec<RemoteCourse>>,
    assignments: Scripted<AssignmentsResponse>,
    contents: HashMap<i64, Scripted<Vec<RemoteSection>>>,
    statuses: Mutex<HashMap<i64, Scripted<SubmissionStatus>>>,
    status_delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    status_calls: AtomicUsize,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self {
            courses: Scripted::Data(Vec::new()),
            assignments: Scripted::Data(AssignmentsResponse::default()),
            contents: HashMap::new(),
            statuses: Mutex::new(HashMap::new()),
            status_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeGateway {
    pub fn with_courses(mut self, courses: Scripted<Vec<RemoteCourse>>) -> Self {
        self.courses = courses;
        self
    }

    pub fn with_assignments(mut self, assignments: Scripted<AssignmentsResponse>) -> Self {
        self.assignments = assignments;
        self
    }

    pub fn with_contents(mut self, course_id: i64, contents: Scripted<Vec<RemoteSection>>) -> Self {
        self.contents.insert(course_id, contents);
        self
    }

    pub const fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn script_status(&self, assignment_id: i64, reply: Scripted<SubmissionStatus>) {
        self.statuses.lock().unwrap().insert(assignment_id, reply);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RemoteGateway for FakeGateway {
    async fn list_enrolled_courses(&self) -> GatewayResult<Vec<RemoteCourse>> {
        self.record("courses".to_string());
        self.courses.data()
    }

    async fn list_assignments(&self, course_ids: &[i64]) -> GatewayResult<AssignmentsResponse> {
        self.record(format!("assignments:{course_ids:?}"));
        self.assignments.data()
    }

    async fn get_assignment_status(
        &self,
        assignment_id: i64,
    ) -> GatewayResult<RemoteReply<SubmissionStatus>> {
        self.record(format!("status:{assignment_id}"));
        self.status_calls.fetch_add(1, Ordering::SeqCst);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self.statuses.lock().unwrap().get(&assignment_id).cloned();
        scripted.unwrap_or(Scripted::Transport).reply()
    }

    async fn get_course_contents(&self, course_id: i64) -> GatewayResult<Vec<RemoteSection>> {
        self.record(format!("contents:{course_id}"));
        self.contents
            .get(&course_id)
            .map_or_else(|| Ok(Vec::new()), Scripted::data)
    }
}

/// Repository whose lookups delegate to `inner` but whose commit always fails.
pub struct FailingCommit<R> {
    pub inner: R,
}

impl<R: MirrorRepository> MirrorRepository for FailingCommit<R> {
    async fn find_course_by_remote_id(&self, moodle_id: i64) -> Result<Option<Course>> {
        self.inner.find_course_by_remote_id(moodle_id).await
    }

    async fn find_assignment_by_remote_id(&self, moodle_id: i64) -> Result<Option<Assignment>> {
        self.inner.find_assignment_by_remote_id(moodle_id).await
    }

    async fn find_resource_by_file_url(&self, file_url: &str) -> Result<Option<Resource>> {
        self.inner.find_resource_by_file_url(file_url).await
    }

    async fn commit(&self, _changes: &ChangeSet) -> Result<CommitSummary> {
        Err(Error::Database("disk I/O error".to_string()))
    }
}
