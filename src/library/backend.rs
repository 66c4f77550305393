//! Async façade over the SQLite book store.
//!
//! [`LibraryBackend`] is the seam the cache and the persona talk to. The SQLite
//! implementation runs the blocking store and stats calls on the blocking pool under a
//! timeout, and never lets a storage error escape: reads degrade to empty results and
//! writes come back as a failed [`AddBookOutcome`].

use async_trait::async_trait;
use chrono::Datelike;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::library::types::{AddBookError, AddBookOutcome, BookRecord, NewBook, ReadingStats};
use crate::library::{stats, store};

#[async_trait]
pub trait LibraryBackend: Send + Sync {
    /// Every book in display order. Empty when the store is unreachable.
    async fn books(&self) -> Vec<BookRecord>;

    /// Statistics for the requested names (`None` or empty selects the defaults).
    /// Empty when the store is unreachable.
    async fn stats(&self, requested: Option<Vec<String>>) -> ReadingStats;

    /// Insert a validated book.
    async fn add_book(&self, book: NewBook) -> AddBookOutcome;
}

/// [`LibraryBackend`] backed by a shared SQLite connection.
#[derive(Clone)]
pub struct SqliteLibrary {
    db: Arc<Mutex<Connection>>,
    query_timeout: Duration,
}

impl SqliteLibrary {
    pub fn new(db: Arc<Mutex<Connection>>, query_timeout: Duration) -> Self {
        Self { db, query_timeout }
    }

    /// Run `f` against the connection on the blocking pool, bounded by the query timeout.
    ///
    /// `None` means the call never produced a result (timed out or the task died).
    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> T + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let task = tokio::task::spawn_blocking(move || {
            let mut conn = db.lock().unwrap_or_else(|e| e.into_inner());
            f(&mut conn)
        });

        match tokio::time::timeout(self.query_timeout, task).await {
            Ok(Ok(result)) => Some(result),
            Ok(Err(join_err)) => {
                tracing::error!(op, error = %join_err, "database task failed");
                None
            }
            Err(_) => {
                tracing::error!(
                    op,
                    timeout_ms = self.query_timeout.as_millis() as u64,
                    "database call timed out"
                );
                None
            }
        }
    }
}

#[async_trait]
impl LibraryBackend for SqliteLibrary {
    async fn books(&self) -> Vec<BookRecord> {
        match self.with_conn("fetch_books", |conn| store::fetch_books(conn)).await {
            Some(Ok(books)) => {
                tracing::debug!(count = books.len(), "fetched books");
                books
            }
            Some(Err(e)) => {
                tracing::error!(error = %e, "failed to fetch books");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    async fn stats(&self, requested: Option<Vec<String>>) -> ReadingStats {
        let year = chrono::Local::now().year();
        let computed = self
            .with_conn("compute_stats", move |conn| {
                stats::compute_stats(conn, requested.as_deref(), year)
            })
            .await;

        match computed {
            Some(Ok(stats)) => stats,
            Some(Err(e)) => {
                tracing::error!(error = %e, "failed to compute stats");
                ReadingStats::new()
            }
            None => ReadingStats::new(),
        }
    }

    async fn add_book(&self, book: NewBook) -> AddBookOutcome {
        let row = book.clone();
        let inserted = self
            .with_conn("add_book", move |conn| store::add_book(conn, &row))
            .await
            .unwrap_or(Err(AddBookError::Unavailable));

        match inserted {
            Ok(id) => {
                tracing::info!(id, title = %book.title, author = %book.author, "book added");
                AddBookOutcome::added(&book)
            }
            Err(e) => {
                tracing::error!(error = %e, title = %book.title, "failed to add book");
                AddBookOutcome::failed(&e)
            }
        }
    }
}
