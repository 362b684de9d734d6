use std::io;

use moodlesync_core::config::ConfigError;
use moodlesync_core::gateway::GatewayError;
use moodlesync_core::SyncError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] moodlesync_core::Error),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error("{0}. Set MOODLE_URL, MOODLE_TOKEN and MOODLE_USER_ID to enable `moodlesync sync`.")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
