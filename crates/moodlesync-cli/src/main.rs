//! moodlesync CLI - Mirror Moodle courses, assignments and files locally
//!
//! Runs a sync pass against the configured Moodle site and lists what the
//! local mirror holds.

mod cli;
mod commands;
mod error;

#[cfg(test)]
mod tests;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::common::resolve_db_path;
use crate::commands::list::{run_assignments, run_courses, run_resources};
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("moodlesync=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Sync { json } => run_sync(json, &db_path).await?,
        Commands::Courses { json } => run_courses(json, &db_path).await?,
        Commands::Assignments { course, new, json } => {
            run_assignments(course, new, json, &db_path).await?;
        }
        Commands::Resources { course, new, json } => {
            run_resources(course, new, json, &db_path).await?;
        }
    }

    Ok(())
}
