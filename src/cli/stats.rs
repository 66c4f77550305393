use anyhow::Result;
use chrono::Datelike;

use llyfrgell::config::LibraryConfig;
use llyfrgell::library::render::render_stats;
use llyfrgell::library::stats::{compute_selected, compute_stats};
use llyfrgell::library::types::StatSelection;

/// Display reading statistics in the terminal.
///
/// `names` picks specific statistics (unknown ones are ignored); `all` shows every one.
pub fn stats(config: &LibraryConfig, names: &[String], all: bool) -> Result<()> {
    let conn = super::open(config)?;
    let year = chrono::Local::now().year();

    let stats = if all {
        compute_selected(&conn, &StatSelection::ALL, year)?
    } else {
        compute_stats(&conn, Some(names), year)?
    };

    print!("{}", render_stats(&stats));
    Ok(())
}
