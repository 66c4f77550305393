//! Book storage: the ordered read and the single-row insert.
//!
//! Both functions return errors to the caller; turning them into empty reads or
//! failure messages is the job of [`crate::library::backend`].

use anyhow::Result;
use rusqlite::{params, Connection, Row};

use crate::library::types::{AddBookError, BookRecord, NewBook};

/// In-progress first, then completed, then obtained-only, then everything else.
/// Within a bucket, the bucket's own date descending.
const FETCH_BOOKS_SQL: &str = r#"
SELECT id, title, author, genre, date_started_reading, date_completed, short_story, date_obtained
FROM books
ORDER BY
    CASE
        WHEN date_completed IS NULL AND date_started_reading IS NOT NULL THEN 1
        WHEN date_completed IS NOT NULL THEN 2
        WHEN date_obtained IS NOT NULL THEN 3
        ELSE 4
    END,
    CASE
        WHEN date_completed IS NULL AND date_started_reading IS NOT NULL THEN date_started_reading
        WHEN date_completed IS NOT NULL THEN date_completed
        WHEN date_obtained IS NOT NULL THEN date_obtained
        ELSE NULL
    END DESC,
    id
"#;

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<BookRecord> {
    Ok(BookRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        author: row.get(2)?,
        genre: row.get(3)?,
        date_started_reading: row.get(4)?,
        date_completed: row.get(5)?,
        short_story: row.get(6)?,
        date_obtained: row.get(7)?,
    })
}

/// Fetch every book in display order.
pub fn fetch_books(conn: &Connection) -> Result<Vec<BookRecord>> {
    let mut stmt = conn.prepare(FETCH_BOOKS_SQL)?;
    let books = stmt
        .query_map([], row_to_book)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(books)
}

/// Insert one book inside a transaction. Returns the new row id.
///
/// On failure the transaction is rolled back before the error is returned.
pub fn add_book(conn: &mut Connection, book: &NewBook) -> Result<i64, AddBookError> {
    let tx = conn.transaction()?;
    let now = chrono::Utc::now().to_rfc3339();

    let inserted = tx.execute(
        "INSERT INTO books (title, author, genre, date_started_reading, date_completed, date_obtained, short_story, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            book.title,
            book.author,
            book.genre,
            book.date_started_reading,
            book.date_completed,
            book.date_obtained,
            book.short_story,
            now,
        ],
    );

    match inserted {
        Ok(_) => {
            let id = tx.last_insert_rowid();
            tx.commit()?;
            Ok(id)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback() {
                tracing::error!(error = %rollback_err, "rollback after failed insert also failed");
            }
            Err(AddBookError::Storage(e))
        }
    }
}
