//! Sync run orchestration.

use std::collections::HashSet;

use chrono::Utc;

use super::enrich::{StatusEnricher, StatusOutcome};
use super::reconcile::{
    reconcile, AssignmentVariant, CourseFile, CourseVariant, EnrichedAssignment, ResourceVariant,
};
use super::{ReconcileStats, SyncError, SyncPhase, SyncReport};
use crate::db::{ChangeSet, MirrorRepository};
use crate::gateway::{
    AssignmentsResponse, RemoteAssignment, RemoteContent, RemoteCourse, RemoteGateway,
    RemoteSection,
};
use crate::models::DEFAULT_SECTION;
use crate::util::{normalize_text_option, unix_millis_now};

/// Runs sync passes against one gateway and one repository.
///
/// Callers must not run two passes against the same store concurrently.
pub struct SyncEngine<G, R> {
    gateway: G,
    repository: R,
}

impl<G: RemoteGateway, R: MirrorRepository> SyncEngine<G, R> {
    pub const fn new(gateway: G, repository: R) -> Self {
        Self {
            gateway,
            repository,
        }
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Run one full pass: courses, assignments, resources, then a single commit.
    ///
    /// Nothing is written unless every gating phase succeeds.
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();
        let now = unix_millis_now();
        let mut changes = ChangeSet::new();

        tracing::info!("Starting Moodle sync");

        let courses = self
            .gateway
            .list_enrolled_courses()
            .await
            .map_err(|e| SyncError::new(SyncPhase::FetchCourses, e))?;
        tracing::info!("Fetched {} enrolled course(s)", courses.len());

        let course_stats =
            reconcile::<CourseVariant, _>(&self.repository, &mut changes, &courses, now)
                .await
                .map_err(|e| SyncError::new(SyncPhase::ReconcileCourses, e))?;

        let course_ids = distinct_course_ids(&courses);

        let response = if course_ids.is_empty() {
            AssignmentsResponse::default()
        } else {
            self.gateway
                .list_assignments(&course_ids)
                .await
                .map_err(|e| SyncError::new(SyncPhase::FetchAssignments, e))?
        };
        let batch = flatten_assignments(response, &course_ids);
        tracing::info!("Fetched {} assignment(s)", batch.len());

        let ids = batch
            .iter()
            .filter_map(|(_, assignment)| assignment.id)
            .collect::<Vec<_>>();
        let statuses = StatusEnricher::new(&self.gateway).enrich(&ids).await;
        let status_unknown = statuses
            .values()
            .filter(|outcome| outcome.is_unknown())
            .count();

        let enriched = batch
            .into_iter()
            .map(|(course_id, assignment)| EnrichedAssignment {
                course_id,
                status: assignment
                    .id
                    .and_then(|id| statuses.get(&id))
                    .map(StatusOutcome::status)
                    .unwrap_or_default(),
                assignment,
            })
            .collect::<Vec<_>>();

        let assignment_stats =
            reconcile::<AssignmentVariant, _>(&self.repository, &mut changes, &enriched, now)
                .await
                .map_err(|e| SyncError::new(SyncPhase::ReconcileAssignments, e))?;

        // Sequential: content trees are large
        let mut resource_stats = ReconcileStats::default();
        for &course_id in &course_ids {
            let sections = self
                .gateway
                .get_course_contents(course_id)
                .await
                .map_err(|e| SyncError::new(SyncPhase::FetchResources, e))?;
            let files = flatten_course_files(course_id, sections);
            tracing::debug!("Course {course_id} lists {} file(s)", files.len());

            resource_stats +=
                reconcile::<ResourceVariant, _>(&self.repository, &mut changes, &files, now)
                    .await
                    .map_err(|e| SyncError::new(SyncPhase::ReconcileResources, e))?;
        }

        let committed = self
            .repository
            .commit(&changes)
            .await
            .map_err(|e| SyncError::new(SyncPhase::Commit, e))?;

        tracing::info!(
            "Sync finished: {} inserted, {} updated, {} assignment status(es) unknown",
            committed.inserted,
            committed.updated,
            status_unknown
        );

        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            courses: course_stats,
            assignments: assignment_stats,
            resources: resource_stats,
            status_unknown,
            committed,
        })
    }
}

fn distinct_course_ids(courses: &[RemoteCourse]) -> Vec<i64> {
    let mut seen = HashSet::new();
    courses
        .iter()
        .filter_map(|course| course.id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Stamp each assignment with its owning course, in remote order.
///
/// Groups for courses outside `course_ids` are dropped: their rows would
/// reference a course that is not mirrored.
fn flatten_assignments(
    response: AssignmentsResponse,
    course_ids: &[i64],
) -> Vec<(i64, RemoteAssignment)> {
    response
        .courses
        .into_iter()
        .filter(|group| {
            let known = course_ids.contains(&group.id);
            if !known {
                tracing::warn!(
                    "Ignoring {} assignment(s) of unknown course {}",
                    group.assignments.len(),
                    group.id
                );
            }
            known
        })
        .flat_map(|group| {
            let course_id = group.id;
            group
                .assignments
                .into_iter()
                .map(move |assignment| (course_id, assignment))
        })
        .collect()
}

fn flatten_course_files(course_id: i64, sections: Vec<RemoteSection>) -> Vec<CourseFile> {
    sections
        .into_iter()
        .flat_map(|section| {
            let label =
                normalize_text_option(section.name).unwrap_or_else(|| DEFAULT_SECTION.to_string());
            section
                .modules
                .into_iter()
                .flat_map(|module| module.contents)
                .filter(RemoteContent::is_file)
                .map(move |content| CourseFile {
                    course_id,
                    section: label.clone(),
                    content,
                })
        })
        .collect()
}
