//! Synchronization engine: mirrors Moodle state into the local database.
//!
//! A run fetches courses, then assignments (enriched with submission status),
//! then course files, staging every write in a [`ChangeSet`](crate::db::ChangeSet)
//! that is committed once at the end.

mod engine;
mod enrich;
mod reconcile;

#[cfg(test)]
mod testing;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::db::CommitSummary;
use crate::gateway::GatewayError;

pub use engine::SyncEngine;
pub use enrich::{
    normalize_grade, AssignmentStatus, StatusEnricher, StatusFailure, StatusMap, StatusOutcome,
    STATUS_FETCH_CONCURRENCY,
};
pub use reconcile::{
    reconcile, AssignmentVariant, CourseFile, CourseVariant, EnrichedAssignment, EntityVariant,
    ResourceVariant,
};

/// Stages of a sync run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    FetchCourses,
    ReconcileCourses,
    FetchAssignments,
    ReconcileAssignments,
    FetchResources,
    ReconcileResources,
    Commit,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FetchCourses => "fetch courses",
            Self::ReconcileCourses => "reconcile courses",
            Self::FetchAssignments => "fetch assignments",
            Self::ReconcileAssignments => "reconcile assignments",
            Self::FetchResources => "fetch resources",
            Self::ReconcileResources => "reconcile resources",
            Self::Commit => "commit",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SyncCause {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] crate::Error),
}

/// A failed run: nothing staged by it was committed.
#[derive(Debug, Error)]
#[error("Sync failed during {phase}: {cause}")]
pub struct SyncError {
    pub phase: SyncPhase,
    #[source]
    pub cause: SyncCause,
}

impl SyncError {
    pub fn new(phase: SyncPhase, cause: impl Into<SyncCause>) -> Self {
        Self {
            phase,
            cause: cause.into(),
        }
    }
}

/// Outcome counts for one entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Records that created a row
    pub inserted: usize,
    /// Records that changed at least one mutable field
    pub updated: usize,
    /// Records that matched a row with identical mutable fields
    pub unchanged: usize,
    /// Records without a natural key
    pub skipped: usize,
}

impl ReconcileStats {
    pub const fn total(&self) -> usize {
        self.inserted + self.updated + self.unchanged + self.skipped
    }
}

impl std::ops::AddAssign for ReconcileStats {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub courses: ReconcileStats,
    pub assignments: ReconcileStats,
    pub resources: ReconcileStats,
    /// Assignments whose submission status could not be fetched
    pub status_unknown: usize,
    pub committed: CommitSummary,
}
