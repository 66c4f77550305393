use anyhow::Result;

use llyfrgell::agent::tools::add_book::AddBookParams;
use llyfrgell::config::LibraryConfig;
use llyfrgell::library::store;
use llyfrgell::library::types::{AddBookOutcome, NewBook};

/// Add a book from the command line, with the same validation the model's tool gets.
pub fn add(config: &LibraryConfig, params: AddBookParams) -> Result<()> {
    let book = match NewBook::try_from(params) {
        Ok(book) => book,
        Err(e) => anyhow::bail!("{}", AddBookOutcome::failed(&e).message),
    };

    let mut conn = super::open(config)?;
    let id = store::add_book(&mut conn, &book)?;
    println!("{} (id {id})", AddBookOutcome::added(&book).message);
    Ok(())
}
