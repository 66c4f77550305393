//! Reading statistics over the `books` table.
//!
//! Each [`StatSelection`] maps to one fixed query; medians are taken in Rust over the
//! per-row completion durations.

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::library::types::{ReadingStats, StatSelection, StatValue};

/// How a statistic is computed. Every statistic owns its own filter; the only bound
/// parameter is the calendar year (`?1`) for the "this year" variants.
enum StatQuery {
    /// `SELECT COUNT(*) ...`
    Count(&'static str),
    /// Selects one completion duration in days per qualifying row.
    Durations(&'static str),
}

fn stat_query(stat: StatSelection) -> StatQuery {
    use StatSelection::*;
    match stat {
        InProgress => StatQuery::Count(
            "SELECT COUNT(*) FROM books WHERE date_started_reading IS NOT NULL AND date_completed IS NULL",
        ),
        CompletedBooks => StatQuery::Count(
            "SELECT COUNT(*) FROM books WHERE date_completed IS NOT NULL AND short_story = 0",
        ),
        CompletedShortStories => StatQuery::Count(
            "SELECT COUNT(*) FROM books WHERE date_completed IS NOT NULL AND short_story = 1",
        ),
        BooksThisYear => StatQuery::Count(
            "SELECT COUNT(*) FROM books WHERE date_completed IS NOT NULL \
             AND CAST(strftime('%Y', date_completed) AS INTEGER) = ?1 AND short_story = 0",
        ),
        ShortStoriesThisYear => StatQuery::Count(
            "SELECT COUNT(*) FROM books WHERE date_completed IS NOT NULL \
             AND CAST(strftime('%Y', date_completed) AS INTEGER) = ?1 AND short_story = 1",
        ),
        TotalBooks => StatQuery::Count("SELECT COUNT(*) FROM books WHERE short_story = 0"),
        TotalShortStories => StatQuery::Count("SELECT COUNT(*) FROM books WHERE short_story = 1"),
        TotalAll => StatQuery::Count("SELECT COUNT(*) FROM books"),
        MedianCompletionDaysAll => StatQuery::Durations(
            "SELECT julianday(date_completed) - julianday(date_started_reading) FROM books \
             WHERE date_started_reading IS NOT NULL AND date_completed IS NOT NULL",
        ),
        MedianCompletionDaysNovels => StatQuery::Durations(
            "SELECT julianday(date_completed) - julianday(date_started_reading) FROM books \
             WHERE date_started_reading IS NOT NULL AND date_completed IS NOT NULL AND short_story = 0",
        ),
        MedianCompletionDaysThisYear => StatQuery::Durations(
            "SELECT julianday(date_completed) - julianday(date_started_reading) FROM books \
             WHERE date_started_reading IS NOT NULL AND date_completed IS NOT NULL \
             AND CAST(strftime('%Y', date_completed) AS INTEGER) = ?1 AND short_story = 0",
        ),
    }
}

fn is_yearly(stat: StatSelection) -> bool {
    matches!(
        stat,
        StatSelection::BooksThisYear
            | StatSelection::ShortStoriesThisYear
            | StatSelection::MedianCompletionDaysThisYear
    )
}

/// Compute reading statistics.
///
/// `None` or an empty request selects [`StatSelection::DEFAULTS`]. Unknown names are
/// dropped; if none survive, the result is empty and the database is not touched.
/// `year` is the calendar year the "this year" statistics filter on.
pub fn compute_stats<S: AsRef<str>>(
    conn: &Connection,
    requested: Option<&[S]>,
    year: i32,
) -> Result<ReadingStats> {
    let selection = match requested {
        Some(names) if !names.is_empty() => StatSelection::parse_requested(names),
        _ => StatSelection::DEFAULTS.to_vec(),
    };
    compute_selected(conn, &selection, year)
}

/// Compute exactly the given statistics.
pub fn compute_selected(
    conn: &Connection,
    selection: &[StatSelection],
    year: i32,
) -> Result<ReadingStats> {
    let mut stats = ReadingStats::new();
    for &stat in selection {
        let value = match stat_query(stat) {
            StatQuery::Count(sql) => {
                let count: i64 = if is_yearly(stat) {
                    conn.query_row(sql, params![year], |row| row.get(0))?
                } else {
                    conn.query_row(sql, [], |row| row.get(0))?
                };
                StatValue::Count(count as u64)
            }
            StatQuery::Durations(sql) => {
                let mut stmt = conn.prepare_cached(sql)?;
                let durations: Vec<f64> = if is_yearly(stat) {
                    stmt.query_map(params![year], |row| row.get(0))?
                        .collect::<Result<Vec<_>, _>>()?
                } else {
                    stmt.query_map([], |row| row.get(0))?
                        .collect::<Result<Vec<_>, _>>()?
                };
                StatValue::MedianDays(median(durations))
            }
        };
        stats.insert(stat, value);
    }
    tracing::debug!(count = stats.len(), year, "computed reading statistics");
    Ok(stats)
}

/// Continuous median (linear interpolation between the two middle values).
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let position = (values.len() - 1) as f64 * 0.5;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(values[lower] + (values[upper] - values[lower]) * fraction)
}
