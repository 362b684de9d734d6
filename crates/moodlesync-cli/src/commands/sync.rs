use std::path::Path;

use moodlesync_core::config::MoodleConfig;
use moodlesync_core::db::LibSqlMirrorRepository;
use moodlesync_core::gateway::MoodleClient;
use moodlesync_core::SyncEngine;

use crate::commands::common::{format_sync_report, open_database};
use crate::error::CliError;

pub async fn run_sync(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let config = MoodleConfig::from_env()?;
    let client = MoodleClient::new(&config)?;

    let db = open_database(db_path).await?;
    let engine = SyncEngine::new(client, LibSqlMirrorRepository::new(db.connection()));
    let report = engine.run().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for line in format_sync_report(&report) {
            println!("{line}");
        }
    }
    Ok(())
}
