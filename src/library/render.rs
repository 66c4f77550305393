//! Turns books and statistics into the text blocks handed to the model.

use crate::library::types::{BookRecord, ReadingStats};

pub const NO_BOOKS: &str = "No book data available in the library.";
pub const NO_STATS: &str = "No reading statistics available or no valid stats were requested.";
pub const NOT_ENOUGH_DATA: &str = "N/A (not enough data)";

const STAT_LABELS: &[(&str, &str)] = &[
    ("in_progress", "Books currently in progress"),
    ("completed_books", "Total books completed"),
    ("completed_short_stories", "Total short stories completed"),
    ("books_this_year", "Books completed this year"),
    ("short_stories_this_year", "Short stories completed this year"),
    ("total_books", "Total books ever added"),
    ("total_short_stories", "Total short stories ever added"),
    ("total_all", "Total reading items ever added"),
    ("median_completion_days_all", "Median completion time for all items"),
    ("median_completion_days_novels", "Median completion time for novels"),
    ("median_completion_days_this_year", "Median completion time this year for novels"),
];

/// Human-readable label for a statistic key; unknown keys are title-cased.
pub fn stat_label(key: &str) -> String {
    if let Some((_, label)) = STAT_LABELS.iter().find(|(k, _)| *k == key) {
        return (*label).to_string();
    }
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn format_date(date: Option<chrono::NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn render_book(book: &BookRecord) -> String {
    format!(
        "Title: {}\nAuthor: {}\nGenre: {}\nDate Started Reading: {}\nDate Completed: {}\nShort Story: {}\n",
        book.title,
        book.author,
        book.genre,
        format_date(book.date_started_reading),
        format_date(book.date_completed),
        if book.short_story { "Yes" } else { "No" },
    )
}

/// One block per book, in input order, between a header and a footer.
pub fn render_books(books: &[BookRecord]) -> String {
    if books.is_empty() {
        return NO_BOOKS.to_string();
    }

    let rule = "---".repeat(15);
    let blocks: Vec<String> = books.iter().map(render_book).collect();
    format!(
        "\n{rule} All Books in Library {rule}\n{}\n{}\n",
        blocks.join("\n"),
        "---".repeat(40)
    )
}

/// One labeled line per statistic.
pub fn render_stats(stats: &ReadingStats) -> String {
    if stats.is_empty() {
        return NO_STATS.to_string();
    }

    let mut out = String::from("--- Reading Statistics ---\n");
    for (stat, value) in stats {
        let shown = value.display().unwrap_or_else(|| NOT_ENOUGH_DATA.to_string());
        out.push_str(&format!("{}: {shown}\n", stat_label(stat.as_str())));
    }
    out.push_str("--------------------------\n");
    out
}
