use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "moodlesync")]
#[command(about = "Mirror Moodle courses, assignments and files into a local database")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one sync pass against the configured Moodle site
    Sync {
        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List mirrored courses
    Courses {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List mirrored assignments
    Assignments {
        /// Only assignments of this course (Moodle id)
        #[arg(long, value_name = "ID")]
        course: Option<i64>,
        /// Only assignments still flagged as new
        #[arg(long)]
        new: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List mirrored course files
    Resources {
        /// Only files of this course (Moodle id)
        #[arg(long, value_name = "ID")]
        course: Option<i64>,
        /// Only files still flagged as new
        #[arg(long)]
        new: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
