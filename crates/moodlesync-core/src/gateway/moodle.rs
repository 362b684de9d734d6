//! Moodle REST client (`webservice/rest/server.php`).

use std::fmt;

use serde::de::DeserializeOwned;

use super::{
    decode_reply, AssignmentsResponse, GatewayError, GatewayResult, RemoteCourse, RemoteGateway,
    RemoteReply, RemoteSection, SubmissionStatus,
};
use crate::config::MoodleConfig;
use crate::util::compact_text;

#[derive(Clone)]
pub struct MoodleClient {
    endpoint: String,
    token: String,
    user_id: i64,
    client: reqwest::Client,
}

impl fmt::Debug for MoodleClient {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MoodleClient")
            .field("endpoint", &self.endpoint)
            .field("token", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

impl MoodleClient {
    pub fn new(config: &MoodleConfig) -> GatewayResult<Self> {
        if config.token.trim().is_empty() {
            return Err(GatewayError::InvalidConfiguration(
                "web service token must not be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            endpoint: config.rest_endpoint(),
            token: config.token.clone(),
            user_id: config.user_id,
            client,
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        function: &str,
        params: &[(String, String)],
    ) -> GatewayResult<RemoteReply<T>> {
        tracing::debug!("Calling Moodle function {function}");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("wstoken", self.token.as_str()),
                ("wsfunction", function),
                ("moodlewsrestformat", "json"),
            ])
            .query(params)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status,
                body: compact_text(&body),
            });
        }

        let body = response.text().await?;
        decode_reply(&body)
    }
}

impl RemoteGateway for MoodleClient {
    async fn list_enrolled_courses(&self) -> GatewayResult<Vec<RemoteCourse>> {
        let params = [("userid".to_string(), self.user_id.to_string())];
        self.call("core_enrol_get_users_courses", &params)
            .await?
            .into_data()
    }

    async fn list_assignments(&self, course_ids: &[i64]) -> GatewayResult<AssignmentsResponse> {
        self.call("mod_assign_get_assignments", &course_id_params(course_ids))
            .await?
            .into_data()
    }

    async fn get_assignment_status(
        &self,
        assignment_id: i64,
    ) -> GatewayResult<RemoteReply<SubmissionStatus>> {
        let params = [("assignid".to_string(), assignment_id.to_string())];
        self.call("mod_assign_get_submission_status", &params).await
    }

    async fn get_course_contents(&self, course_id: i64) -> GatewayResult<Vec<RemoteSection>> {
        let params = [("courseid".to_string(), course_id.to_string())];
        self.call("core_course_get_contents", &params)
            .await?
            .into_data()
    }
}

/// Moodle expects array parameters as `courseids[0]=..&courseids[1]=..`.
fn course_id_params(course_ids: &[i64]) -> Vec<(String, String)> {
    course_ids
        .iter()
        .enumerate()
        .map(|(index, id)| (format!("courseids[{index}]"), id.to_string()))
        .collect()
}
