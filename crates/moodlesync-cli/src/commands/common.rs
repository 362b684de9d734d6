use std::env;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use moodlesync_core::db::{Database, LibSqlMirrorRepository, ListFilter};
use moodlesync_core::models::{Assignment, Course, Resource};
use moodlesync_core::sync::ReconcileStats;
use moodlesync_core::SyncReport;

use crate::error::CliError;

pub async fn load_courses(db_path: &Path) -> Result<Vec<Course>, CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlMirrorRepository::new(db.connection());
    Ok(repo.list_courses().await?)
}

pub async fn load_assignments(
    filter: ListFilter,
    db_path: &Path,
) -> Result<Vec<Assignment>, CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlMirrorRepository::new(db.connection());
    Ok(repo.list_assignments(filter).await?)
}

pub async fn load_resources(filter: ListFilter, db_path: &Path) -> Result<Vec<Resource>, CliError> {
    let db = open_database(db_path).await?;
    let repo = LibSqlMirrorRepository::new(db.connection());
    Ok(repo.list_resources(filter).await?)
}

pub fn format_course_lines(courses: &[Course]) -> Vec<String> {
    courses
        .iter()
        .map(|course| {
            let fullname = truncate(&course.fullname, 40);
            format!(
                "{:<8}  {:<12}  {fullname:<40}  {:>3}%",
                course.moodle_id,
                truncate(&course.shortname, 12),
                course.progress
            )
        })
        .collect()
}

pub fn format_assignment_lines(assignments: &[Assignment]) -> Vec<String> {
    assignments
        .iter()
        .map(|assignment| {
            let marker = new_marker(assignment.is_new);
            let due = format_due_date(assignment.due_date);
            let status = assignment_status_label(assignment);
            let name = truncate(&assignment.name, 40);
            format!(
                "{marker} {:<8}  {due:<20}  {status:<14}  {name}",
                assignment.moodle_id
            )
        })
        .collect()
}

pub fn format_resource_lines(resources: &[Resource]) -> Vec<String> {
    resources
        .iter()
        .map(|resource| {
            let marker = new_marker(resource.is_new);
            let section = truncate(&resource.section, 20);
            let filename = truncate(&resource.filename, 40);
            let size = format_filesize(resource.filesize);
            format!("{marker} {section:<20}  {filename:<40}  {size:>9}")
        })
        .collect()
}

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let elapsed = report
        .finished_at
        .signed_duration_since(report.started_at)
        .num_milliseconds();

    let mut lines = vec![
        format_stats_line("Courses", report.courses),
        format_stats_line("Assignments", report.assignments),
        format_stats_line("Resources", report.resources),
    ];
    if report.status_unknown > 0 {
        lines.push(format!(
            "Submission status unknown for {} assignment(s)",
            report.status_unknown
        ));
    }
    lines.push(format!(
        "Sync completed in {elapsed} ms: {} inserted, {} updated",
        report.committed.inserted, report.committed.updated
    ));
    lines
}

fn format_stats_line(label: &str, stats: ReconcileStats) -> String {
    let total = stats.total();
    let mut line = format!(
        "{label:<12} {total} record(s): {} new, {} updated, {} unchanged",
        stats.inserted, stats.updated, stats.unchanged
    );
    if stats.skipped > 0 {
        let _ = write!(line, ", {} skipped", stats.skipped);
    }
    line
}

pub fn format_due_date(due_date: Option<DateTime<Utc>>) -> String {
    due_date.map_or_else(
        || "no due date".to_string(),
        |due| due.format("%Y-%m-%d %H:%M UTC").to_string(),
    )
}

pub fn assignment_status_label(assignment: &Assignment) -> String {
    match (&assignment.grade, assignment.submitted) {
        (Some(grade), _) => format!("graded {grade}"),
        (None, true) => "submitted".to_string(),
        (None, false) => "pending".to_string(),
    }
}

#[allow(clippy::cast_precision_loss)]
pub fn format_filesize(bytes: i64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes.max(0) as f64;
    if size < KB {
        format!("{bytes} B")
    } else if size < MB {
        format!("{:.1} KB", size / KB)
    } else if size < GB {
        format!("{:.1} MB", size / MB)
    } else {
        format!("{:.1} GB", size / GB)
    }
}

const fn new_marker(is_new: bool) -> char {
    if is_new {
        '*'
    } else {
        ' '
    }
}

pub fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let truncated = value
        .chars()
        .take(max_chars.saturating_sub(3))
        .collect::<String>();
    format!("{truncated}...")
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("MOODLESYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("moodlesync")
        .join("moodlesync.db")
}

pub async fn open_database(path: &Path) -> Result<Database, CliError> {
    Ok(Database::open(path).await?)
}
