//! Core library type definitions.
//!
//! Defines [`BookRecord`] (a stored reading item), [`NewBook`] (a validated insert),
//! [`StatSelection`] (the closed set of reading statistics), [`StatValue`], and the
//! add-book outcome and error types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of the `books` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub date_started_reading: Option<NaiveDate>,
    pub date_completed: Option<NaiveDate>,
    pub short_story: bool,
    /// Only used for ordering items that were never started.
    pub date_obtained: Option<NaiveDate>,
}

impl BookRecord {
    /// A completed date means finished, whatever the short story flag says.
    pub fn is_finished(&self) -> bool {
        self.date_completed.is_some()
    }

    pub fn is_in_progress(&self) -> bool {
        self.date_started_reading.is_some() && self.date_completed.is_none()
    }
}

/// A validated book ready to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub date_started_reading: Option<NaiveDate>,
    pub date_completed: Option<NaiveDate>,
    pub short_story: bool,
    pub date_obtained: Option<NaiveDate>,
}

/// Why an add-book request was refused.
#[derive(Debug, thiserror::Error)]
pub enum AddBookError {
    #[error("{}", describe_validation(.missing, .invalid))]
    Validation {
        /// Required fields that were absent or blank.
        missing: Vec<&'static str>,
        /// `field ('value')` for every date that is not a calendar date.
        invalid: Vec<String>,
    },
    #[error("the book could not be saved: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("the library records could not be reached")]
    Unavailable,
}

fn describe_validation(missing: &[&'static str], invalid: &[String]) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing required field(s): {}", missing.join(", ")));
    }
    if !invalid.is_empty() {
        parts.push(format!(
            "invalid date(s), expected YYYY-MM-DD: {}",
            invalid.join(", ")
        ));
    }
    parts.join("; ")
}

/// In-band result of an add-book request, handed back to the model as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddBookOutcome {
    pub success: bool,
    pub message: String,
}

impl AddBookOutcome {
    pub fn added(book: &NewBook) -> Self {
        Self {
            success: true,
            message: format!(
                "Successfully added '{}' by {} to the library.",
                book.title, book.author
            ),
        }
    }

    pub fn failed(err: &AddBookError) -> Self {
        Self {
            success: false,
            message: format!("Failed to add the book: {err}."),
        }
    }
}

/// The closed set of reading statistics.
///
/// Declaration order is the display order of a [`ReadingStats`] map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatSelection {
    InProgress,
    CompletedBooks,
    CompletedShortStories,
    BooksThisYear,
    ShortStoriesThisYear,
    TotalBooks,
    TotalShortStories,
    TotalAll,
    MedianCompletionDaysAll,
    MedianCompletionDaysNovels,
    MedianCompletionDaysThisYear,
}

impl StatSelection {
    pub const ALL: [StatSelection; 11] = [
        Self::InProgress,
        Self::CompletedBooks,
        Self::CompletedShortStories,
        Self::BooksThisYear,
        Self::ShortStoriesThisYear,
        Self::TotalBooks,
        Self::TotalShortStories,
        Self::TotalAll,
        Self::MedianCompletionDaysAll,
        Self::MedianCompletionDaysNovels,
        Self::MedianCompletionDaysThisYear,
    ];

    /// Returned when no specific statistics are requested.
    pub const DEFAULTS: [StatSelection; 9] = [
        Self::InProgress,
        Self::CompletedBooks,
        Self::CompletedShortStories,
        Self::BooksThisYear,
        Self::ShortStoriesThisYear,
        Self::TotalAll,
        Self::MedianCompletionDaysAll,
        Self::MedianCompletionDaysNovels,
        Self::MedianCompletionDaysThisYear,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "in_progress",
            Self::CompletedBooks => "completed_books",
            Self::CompletedShortStories => "completed_short_stories",
            Self::BooksThisYear => "books_this_year",
            Self::ShortStoriesThisYear => "short_stories_this_year",
            Self::TotalBooks => "total_books",
            Self::TotalShortStories => "total_short_stories",
            Self::TotalAll => "total_all",
            Self::MedianCompletionDaysAll => "median_completion_days_all",
            Self::MedianCompletionDaysNovels => "median_completion_days_novels",
            Self::MedianCompletionDaysThisYear => "median_completion_days_this_year",
        }
    }

    pub fn is_median(&self) -> bool {
        matches!(
            self,
            Self::MedianCompletionDaysAll
                | Self::MedianCompletionDaysNovels
                | Self::MedianCompletionDaysThisYear
        )
    }

    /// Parse a requested list, silently dropping names that are not statistics.
    pub fn parse_requested<S: AsRef<str>>(names: &[S]) -> Vec<StatSelection> {
        let mut selected = Vec::new();
        for name in names {
            match name.as_ref().parse::<StatSelection>() {
                Ok(stat) if !selected.contains(&stat) => selected.push(stat),
                Ok(_) => {}
                Err(_) => tracing::debug!(name = name.as_ref(), "ignoring unknown statistic"),
            }
        }
        selected
    }
}

impl std::fmt::Display for StatSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StatSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|stat| stat.as_str() == s)
            .ok_or_else(|| format!("unknown statistic: {s}"))
    }
}

/// Value of a single statistic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Count(u64),
    /// `None` when no rows qualify.
    MedianDays(Option<f64>),
}

impl StatValue {
    /// Display form. `None` when there is not enough data to show anything.
    pub fn display(&self) -> Option<String> {
        match self {
            Self::Count(n) => Some(n.to_string()),
            Self::MedianDays(Some(days)) => {
                let days = days.round() as i64;
                Some(format!("{days} {}", if days == 1 { "day" } else { "days" }))
            }
            Self::MedianDays(None) => None,
        }
    }
}

/// Computed statistics keyed by selection.
pub type ReadingStats = BTreeMap<StatSelection, StatValue>;
