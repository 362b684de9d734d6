//! Insert-if-absent / update-if-present reconciliation, shared by all entity kinds.

#![allow(clippy::cast_possible_truncation)] // progress is a 0..=100 percentage

use std::fmt::Display;
use std::hash::Hash;

use super::enrich::AssignmentStatus;
use super::ReconcileStats;
use crate::db::{ChangeSet, MirrorRepository, StagedTable};
use crate::error::Result;
use crate::gateway::{RemoteAssignment, RemoteContent, RemoteCourse};
use crate::models::{
    Assignment, AssignmentField, Course, CourseField, LocalId, Resource, ResourceField,
    UNKNOWN_FILENAME,
};
use crate::util::{instant_from_epoch_secs, normalize_text_option};

/// Describes how one entity kind is matched, created and updated.
#[allow(async_fn_in_trait)]
pub trait EntityVariant {
    /// Remote record this kind is built from
    type Remote;
    /// Natural key
    type Key: Eq + Hash + Clone + Display;
    /// Local row
    type Row: Clone;
    /// Mutable columns
    type Field: Ord + Copy;

    const KIND: &'static str;

    /// `None` means the record is skipped.
    fn natural_key(remote: &Self::Remote) -> Option<Self::Key>;

    /// Build a new row with every field taken from the remote record.
    fn create(remote: &Self::Remote, now: i64) -> Self::Row;

    /// Overwrite the mutable fields of `row`, returning the ones that changed.
    fn update(remote: &Self::Remote, row: &mut Self::Row) -> Vec<Self::Field>;

    fn touch(row: &mut Self::Row, now: i64);

    fn staged(changes: &mut ChangeSet) -> &mut StagedTable<Self::Key, Self::Row, Self::Field>;

    async fn find<R: MirrorRepository>(repo: &R, key: &Self::Key) -> Result<Option<Self::Row>>;
}

/// Converge staged state for one entity kind towards `records`.
///
/// Records are handled in order. Lookups consult rows staged earlier in the
/// run before the repository, so a repeated natural key updates the row the
/// first occurrence staged instead of inserting a second one.
pub async fn reconcile<V, R>(
    repo: &R,
    changes: &mut ChangeSet,
    records: &[V::Remote],
    now: i64,
) -> Result<ReconcileStats>
where
    V: EntityVariant,
    R: MirrorRepository,
{
    let mut stats = ReconcileStats::default();

    for remote in records {
        let Some(key) = V::natural_key(remote) else {
            tracing::debug!("Skipping {} without natural key", V::KIND);
            stats.skipped += 1;
            continue;
        };

        let existing = match V::staged(changes).get(&key) {
            Some(row) => Some(row.clone()),
            None => V::find(repo, &key).await?,
        };

        match existing {
            None => {
                tracing::debug!("Creating {} {key}", V::KIND);
                V::staged(changes).queue_insert(key, V::create(remote, now));
                stats.inserted += 1;
            }
            Some(mut row) => {
                let fields = V::update(remote, &mut row);
                if fields.is_empty() {
                    stats.unchanged += 1;
                    continue;
                }
                tracing::debug!("Updating {} {key}: {} field(s)", V::KIND, fields.len());
                V::touch(&mut row, now);
                V::staged(changes).queue_update(key, row, fields);
                stats.updated += 1;
            }
        }
    }

    Ok(stats)
}

/// Assign `value` to `slot` and record `field` if it differs.
fn set_field<T: PartialEq, F>(slot: &mut T, value: T, field: F, changed: &mut Vec<F>) {
    if *slot != value {
        *slot = value;
        changed.push(field);
    }
}

pub struct CourseVariant;

fn course_progress(remote: &RemoteCourse) -> i64 {
    remote.progress.map_or(0, |percent| percent.round() as i64)
}

impl EntityVariant for CourseVariant {
    type Remote = RemoteCourse;
    type Key = i64;
    type Row = Course;
    type Field = CourseField;

    const KIND: &'static str = "course";

    fn natural_key(remote: &RemoteCourse) -> Option<i64> {
        remote.id
    }

    fn create(remote: &RemoteCourse, now: i64) -> Course {
        Course {
            id: LocalId::new(),
            moodle_id: remote.id.unwrap_or_default(),
            fullname: remote.fullname.clone().unwrap_or_default(),
            shortname: remote.shortname.clone().unwrap_or_default(),
            category_id: remote.category,
            progress: course_progress(remote),
            created_at: now,
            updated_at: now,
        }
    }

    fn update(remote: &RemoteCourse, row: &mut Course) -> Vec<CourseField> {
        let mut changed = Vec::new();
        set_field(
            &mut row.fullname,
            remote.fullname.clone().unwrap_or_default(),
            CourseField::Fullname,
            &mut changed,
        );
        set_field(
            &mut row.progress,
            course_progress(remote),
            CourseField::Progress,
            &mut changed,
        );
        changed
    }

    fn touch(row: &mut Course, now: i64) {
        row.updated_at = now;
    }

    fn staged(changes: &mut ChangeSet) -> &mut StagedTable<i64, Course, CourseField> {
        &mut changes.courses
    }

    async fn find<R: MirrorRepository>(repo: &R, key: &i64) -> Result<Option<Course>> {
        repo.find_course_by_remote_id(*key).await
    }
}

/// An assignment stamped with its owning course and resolved status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedAssignment {
    pub course_id: i64,
    pub assignment: RemoteAssignment,
    pub status: AssignmentStatus,
}

pub struct AssignmentVariant;

impl EntityVariant for AssignmentVariant {
    type Remote = EnrichedAssignment;
    type Key = i64;
    type Row = Assignment;
    type Field = AssignmentField;

    const KIND: &'static str = "assignment";

    fn natural_key(remote: &EnrichedAssignment) -> Option<i64> {
        remote.assignment.id
    }

    fn create(remote: &EnrichedAssignment, now: i64) -> Assignment {
        let assignment = &remote.assignment;
        Assignment {
            id: LocalId::new(),
            moodle_id: assignment.id.unwrap_or_default(),
            course_id: remote.course_id,
            cmid: assignment.cmid,
            name: assignment.name.clone().unwrap_or_default(),
            description: assignment.intro.clone().unwrap_or_default(),
            due_date: instant_from_epoch_secs(assignment.duedate),
            submitted: remote.status.submitted,
            grade: remote.status.grade.clone(),
            is_new: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn update(remote: &EnrichedAssignment, row: &mut Assignment) -> Vec<AssignmentField> {
        let assignment = &remote.assignment;
        let mut changed = Vec::new();
        set_field(
            &mut row.name,
            assignment.name.clone().unwrap_or_default(),
            AssignmentField::Name,
            &mut changed,
        );
        set_field(
            &mut row.description,
            assignment.intro.clone().unwrap_or_default(),
            AssignmentField::Description,
            &mut changed,
        );
        set_field(
            &mut row.due_date,
            instant_from_epoch_secs(assignment.duedate),
            AssignmentField::DueDate,
            &mut changed,
        );
        set_field(
            &mut row.cmid,
            assignment.cmid,
            AssignmentField::Cmid,
            &mut changed,
        );
        // Remote status is authoritative: overwrite, never merge
        set_field(
            &mut row.submitted,
            remote.status.submitted,
            AssignmentField::Submitted,
            &mut changed,
        );
        set_field(
            &mut row.grade,
            remote.status.grade.clone(),
            AssignmentField::Grade,
            &mut changed,
        );
        changed
    }

    fn touch(row: &mut Assignment, now: i64) {
        row.updated_at = now;
    }

    fn staged(changes: &mut ChangeSet) -> &mut StagedTable<i64, Assignment, AssignmentField> {
        &mut changes.assignments
    }

    async fn find<R: MirrorRepository>(repo: &R, key: &i64) -> Result<Option<Assignment>> {
        repo.find_assignment_by_remote_id(*key).await
    }
}

/// A file content item together with where it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseFile {
    pub course_id: i64,
    pub section: String,
    pub content: RemoteContent,
}

pub struct ResourceVariant;

impl EntityVariant for ResourceVariant {
    type Remote = CourseFile;
    type Key = String;
    type Row = Resource;
    type Field = ResourceField;

    const KIND: &'static str = "resource";

    fn natural_key(remote: &CourseFile) -> Option<String> {
        normalize_text_option(remote.content.fileurl.clone())
    }

    fn create(remote: &CourseFile, now: i64) -> Resource {
        let content = &remote.content;
        Resource {
            id: LocalId::new(),
            moodle_id: content.id.unwrap_or_default(),
            course_id: remote.course_id,
            section: remote.section.clone(),
            filename: normalize_text_option(content.filename.clone())
                .unwrap_or_else(|| UNKNOWN_FILENAME.to_string()),
            file_url: Self::natural_key(remote).unwrap_or_default(),
            mimetype: content.mimetype.clone().unwrap_or_default(),
            filesize: content.filesize.unwrap_or_default(),
            time_created: instant_from_epoch_secs(content.timecreated),
            is_new: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn update(remote: &CourseFile, row: &mut Resource) -> Vec<ResourceField> {
        // Files are immutable once mirrored, except for the section they sit in
        let mut changed = Vec::new();
        set_field(
            &mut row.section,
            remote.section.clone(),
            ResourceField::Section,
            &mut changed,
        );
        changed
    }

    fn touch(row: &mut Resource, now: i64) {
        row.updated_at = now;
    }

    fn staged(changes: &mut ChangeSet) -> &mut StagedTable<String, Resource, ResourceField> {
        &mut changes.resources
    }

    async fn find<R: MirrorRepository>(repo: &R, key: &String) -> Result<Option<Resource>> {
        repo.find_resource_by_file_url(key).await
    }
}
