use anyhow::Result;

use llyfrgell::config::LibraryConfig;
use llyfrgell::library::{render, store};

/// Print every book in display order.
pub fn books(config: &LibraryConfig) -> Result<()> {
    let conn = super::open(config)?;
    let books = store::fetch_books(&conn)?;
    println!("{}", render::render_books(&books));
    Ok(())
}
