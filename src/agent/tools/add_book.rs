//! `add_book` tool parameters and their validation into a [`NewBook`].

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::library::types::{AddBookError, NewBook};

/// Arguments of the `add_book` tool.
///
/// Every field is optional at the wire level so a missing title comes back to the
/// model as an in-band validation message rather than a parse failure.
#[derive(Debug, Default, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AddBookParams {
    #[schemars(description = "The title of the book.")]
    pub title: Option<String>,

    #[schemars(description = "The author of the book.")]
    pub author: Option<String>,

    #[schemars(description = "The genre of the book.")]
    pub genre: Option<String>,

    #[schemars(description = "The date the user started reading the book, in YYYY-MM-DD format.")]
    pub date_started_reading: Option<String>,

    #[schemars(description = "The date the user completed the book, in YYYY-MM-DD format.")]
    pub date_completed: Option<String>,

    #[schemars(description = "Whether the book is a short story. True for short story, False otherwise.")]
    pub short_story: Option<bool>,

    /// Not exposed to the model; set from the command line.
    #[serde(skip)]
    pub date_obtained: Option<String>,
}

fn required(value: Option<String>, field: &'static str, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => {
            missing.push(field);
            String::new()
        }
    }
}

fn optional_date(value: Option<String>, field: &'static str, invalid: &mut Vec<String>) -> Option<NaiveDate> {
    let raw = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())?;
    match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            invalid.push(format!("{field} ('{raw}')"));
            None
        }
    }
}

impl TryFrom<AddBookParams> for NewBook {
    type Error = AddBookError;

    fn try_from(params: AddBookParams) -> Result<Self, Self::Error> {
        let mut missing = Vec::new();
        let mut invalid = Vec::new();

        let title = required(params.title, "title", &mut missing);
        let author = required(params.author, "author", &mut missing);
        let genre = required(params.genre, "genre", &mut missing);
        let date_started_reading =
            optional_date(params.date_started_reading, "date_started_reading", &mut invalid);
        let date_completed = optional_date(params.date_completed, "date_completed", &mut invalid);
        let date_obtained = optional_date(params.date_obtained, "date_obtained", &mut invalid);

        if !missing.is_empty() || !invalid.is_empty() {
            return Err(AddBookError::Validation { missing, invalid });
        }

        Ok(NewBook {
            title,
            author,
            genre,
            date_started_reading,
            date_completed,
            short_story: params.short_story.unwrap_or(false),
            date_obtained,
        })
    }
}
