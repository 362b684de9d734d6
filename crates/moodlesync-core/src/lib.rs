//! moodlesync-core - Core library for moodlesync
//!
//! This crate contains the mirror models, database layer, Moodle gateway and
//! the sync engine used by the `moodlesync` CLI.

pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use sync::{SyncEngine, SyncError, SyncReport};
