pub mod add;
pub mod books;
pub mod chat;
pub mod stats;

use anyhow::Result;
use rusqlite::Connection;

use llyfrgell::config::LibraryConfig;

/// Open the configured database for a one-shot command.
fn open(config: &LibraryConfig) -> Result<Connection> {
    llyfrgell::db::open_database(config.resolved_db_path())
}
