use std::path::PathBuf;

use chrono::DateTime;
use clap::Parser;
use moodlesync_core::db::{
    ChangeSet, Database, LibSqlMirrorRepository, ListFilter, MirrorRepository,
};
use moodlesync_core::models::{Assignment, Course, LocalId, Resource};
use moodlesync_core::sync::{ReconcileStats, SyncReport};

use crate::cli::{Cli, Commands};
use crate::commands::common::{
    assignment_status_label, default_db_path, format_assignment_lines, format_course_lines,
    format_due_date, format_filesize, format_resource_lines, format_sync_report, load_assignments,
    load_courses, load_resources, resolve_db_path, truncate,
};

fn course(moodle_id: i64, fullname: &str) -> Course {
    Course {
        id: LocalId::new(),
        moodle_id,
        fullname: fullname.to_string(),
        shortname: "SHORT".to_string(),
        category_id: None,
        progress: 40,
        created_at: 1_000,
        updated_at: 1_000,
    }
}

fn assignment(moodle_id: i64, course_id: i64, is_new: bool) -> Assignment {
    Assignment {
        id: LocalId::new(),
        moodle_id,
        course_id,
        cmid: None,
        name: format!("Homework {moodle_id}"),
        description: String::new(),
        due_date: DateTime::from_timestamp(1_700_000_000, 0),
        submitted: false,
        grade: None,
        is_new,
        created_at: 1_000,
        updated_at: 1_000,
    }
}

fn resource(file_url: &str, course_id: i64) -> Resource {
    Resource {
        id: LocalId::new(),
        moodle_id: 0,
        course_id,
        section: "Week 1".to_string(),
        filename: "slides.pdf".to_string(),
        file_url: file_url.to_string(),
        mimetype: "application/pdf".to_string(),
        filesize: 1536,
        time_created: None,
        is_new: true,
        created_at: 1_000,
        updated_at: 1_000,
    }
}

#[test]
fn resolve_db_path_prefers_cli_argument() {
    let explicit = PathBuf::from("/tmp/explicit.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn default_db_path_ends_with_app_file() {
    let path = default_db_path();
    assert!(path.ends_with("moodlesync/moodlesync.db"));
}

#[test]
fn cli_parses_assignment_filters() {
    let cli = Cli::try_parse_from([
        "moodlesync",
        "assignments",
        "--course",
        "10",
        "--new",
        "--db-path",
        "/tmp/m.db",
    ])
    .unwrap();

    assert_eq!(cli.db_path, Some(PathBuf::from("/tmp/m.db")));
    assert!(matches!(
        cli.command,
        Commands::Assignments {
            course: Some(10),
            new: true,
            json: false
        }
    ));
}

#[test]
fn cli_requires_subcommand() {
    assert!(Cli::try_parse_from(["moodlesync"]).is_err());
}

#[test]
fn format_due_date_is_utc() {
    assert_eq!(
        format_due_date(DateTime::from_timestamp(1_700_000_000, 0)),
        "2023-11-14 22:13 UTC"
    );
    assert_eq!(format_due_date(None), "no due date");
}

#[test]
fn format_filesize_units() {
    assert_eq!(format_filesize(512), "512 B");
    assert_eq!(format_filesize(1536), "1.5 KB");
    assert_eq!(format_filesize(5 * 1024 * 1024), "5.0 MB");
}

#[test]
fn truncate_adds_ellipsis() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(
        truncate("This is a very long course name", 12),
        "This is a..."
    );
}

#[test]
fn assignment_status_label_prefers_grade() {
    let mut item = assignment(1, 10, true);
    assert_eq!(assignment_status_label(&item), "pending");

    item.submitted = true;
    assert_eq!(assignment_status_label(&item), "submitted");

    item.grade = Some("85 %".to_string());
    assert_eq!(assignment_status_label(&item), "graded 85 %");
}

#[test]
fn format_lines_include_key_fields() {
    let courses = format_course_lines(&[course(10, "Algebra")]);
    assert!(courses[0].starts_with("10"));
    assert!(courses[0].contains("Algebra"));
    assert!(courses[0].ends_with(" 40%"));

    let assignments = format_assignment_lines(&[assignment(100, 10, true)]);
    assert!(assignments[0].starts_with('*'));
    assert!(assignments[0].contains("Homework 100"));
    assert!(assignments[0].contains("2023-11-14"));

    let resources = format_resource_lines(&[resource("https://x/f1", 10)]);
    assert!(resources[0].contains("slides.pdf"));
    assert!(resources[0].contains("1.5 KB"));
}

#[test]
fn format_sync_report_mentions_unknown_statuses() {
    let started_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let report = SyncReport {
        started_at,
        finished_at: started_at + chrono::Duration::milliseconds(250),
        courses: ReconcileStats {
            inserted: 1,
            ..ReconcileStats::default()
        },
        assignments: ReconcileStats::default(),
        resources: ReconcileStats {
            skipped: 2,
            ..ReconcileStats::default()
        },
        status_unknown: 3,
        committed: moodlesync_core::db::CommitSummary {
            inserted: 1,
            updated: 0,
        },
    };

    let lines = format_sync_report(&report);
    assert!(lines[0].contains("1 record(s): 1 new"));
    assert!(lines[2].contains("2 skipped"));
    assert!(lines.iter().any(|line| line.contains("unknown for 3")));
    assert_eq!(
        lines.last().map(String::as_str),
        Some("Sync completed in 250 ms: 1 inserted, 0 updated")
    );
}

#[cfg_attr(windows, ignore = "libsql integration is flaky on windows CI")]
#[tokio::test(flavor = "current_thread")]
async fn list_helpers_read_filtered_mirror() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("mirror").join("moodlesync.db");
    {
        let db = Database::open(&db_path).await.unwrap();
        let repo = LibSqlMirrorRepository::new(db.connection());

        let mut changes = ChangeSet::new();
        changes.courses.queue_insert(10, course(10, "Algebra"));
        changes.courses.queue_insert(20, course(20, "Biology"));
        changes
            .assignments
            .queue_insert(100, assignment(100, 10, true));
        changes
            .assignments
            .queue_insert(101, assignment(101, 10, false));
        changes
            .assignments
            .queue_insert(200, assignment(200, 20, true));
        changes
            .resources
            .queue_insert("https://x/f1".to_string(), resource("https://x/f1", 20));
        repo.commit(&changes).await.unwrap();
    }

    let courses = load_courses(&db_path).await.unwrap();
    assert_eq!(courses.len(), 2);

    let new_in_algebra = load_assignments(
        ListFilter {
            course_id: Some(10),
            only_new: true,
        },
        &db_path,
    )
    .await
    .unwrap();
    assert_eq!(
        new_in_algebra
            .iter()
            .map(|a| a.moodle_id)
            .collect::<Vec<_>>(),
        vec![100]
    );

    let algebra_files = load_resources(
        ListFilter {
            course_id: Some(10),
            only_new: false,
        },
        &db_path,
    )
    .await
    .unwrap();
    assert!(algebra_files.is_empty());
}
