//! Database layer for the local mirror

mod changes;
mod connection;
mod migrations;
mod repository;

pub use changes::{ChangeSet, Staged, StagedTable};
pub use connection::Database;
pub use repository::{CommitSummary, LibSqlMirrorRepository, ListFilter, MirrorRepository};
