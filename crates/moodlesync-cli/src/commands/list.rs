use std::path::Path;

use moodlesync_core::db::ListFilter;

use crate::commands::common::{
    format_assignment_lines, format_course_lines, format_resource_lines, load_assignments,
    load_courses, load_resources,
};
use crate::error::CliError;

pub async fn run_courses(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let courses = load_courses(db_path).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&courses)?);
    } else if courses.is_empty() {
        println!("No courses mirrored yet. Run `moodlesync sync` first.");
    } else {
        for line in format_course_lines(&courses) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_assignments(
    course_id: Option<i64>,
    only_new: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let filter = ListFilter {
        course_id,
        only_new,
    };
    let assignments = load_assignments(filter, db_path).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&assignments)?);
    } else if assignments.is_empty() {
        println!("No assignments found.");
    } else {
        for line in format_assignment_lines(&assignments) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_resources(
    course_id: Option<i64>,
    only_new: bool,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let filter = ListFilter {
        course_id,
        only_new,
    };
    let resources = load_resources(filter, db_path).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&resources)?);
    } else if resources.is_empty() {
        println!("No resources found.");
    } else {
        for line in format_resource_lines(&resources) {
            println!("{line}");
        }
    }
    Ok(())
}
