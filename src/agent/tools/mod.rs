//! The three library tools: schema for the model, typed parsing, and dispatch.
//!
//! Tool names map onto the closed [`LibraryTool`] enum. A name outside that set yields
//! an empty `{}` result and arguments that do not parse yield `{"error": ...}`; either
//! way the conversation carries on.

pub mod add_book;
pub mod get_books;
pub mod get_stats;

use add_book::AddBookParams;
use get_books::GetBooksParams;
use get_stats::GetStatsParams;
use schemars::JsonSchema;
use serde_json::{json, Value};

use crate::agent::model::{ToolCallRequest, ToolDefinition};
use crate::library::backend::LibraryBackend;
use crate::library::cache::ContextCache;
use crate::library::render::{render_books, render_stats};
use crate::library::types::{AddBookOutcome, NewBook, StatSelection};

pub const ADD_BOOK: &str = "add_book";
pub const GET_STATS: &str = "get_stats_tool";
pub const GET_BOOKS: &str = "get_books_tool";

/// JSON Schema for a parameter struct, trimmed to what the Chat Completions API expects.
fn parameters_schema<T: JsonSchema>(required: &[&str]) -> Value {
    let mut value = Value::from(schemars::schema_for!(T));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("properties").or_insert_with(|| json!({}));
        if !required.is_empty() {
            obj.insert("required".into(), json!(required));
        }
    }
    value
}

/// The tool schema sent with every request.
pub fn definitions() -> Vec<ToolDefinition> {
    let mut stats_schema = parameters_schema::<GetStatsParams>(&[]);
    let names: Vec<&str> = StatSelection::ALL.iter().map(|s| s.as_str()).collect();
    stats_schema["properties"]["requested_stats"]["items"] = json!({
        "type": "string",
        "enum": names,
    });

    vec![
        ToolDefinition::function(
            ADD_BOOK,
            "Adds a new book to the user's reading database. Requires title, author, and genre. \
             Optional fields include date started reading, date completed, and whether it's a short story.",
            parameters_schema::<AddBookParams>(&["title", "author", "genre"]),
        ),
        ToolDefinition::function(
            GET_STATS,
            "Retrieves reading statistics from the user's reading database. Specific statistics may be \
             requested, otherwise a default set is returned. Statistics include counts of books in progress, \
             completed books and short stories (overall and this year), total items ever added, and median \
             completion times for all completed items, for novels, and for novels completed this year. \
             The default set is cached, so repeated calls will not always hit the database.",
            stats_schema,
        ),
        ToolDefinition::function(
            GET_BOOKS,
            "Retrieves the full list of books and short stories in the user's reading database, including \
             title, author, genre, dates started and completed, and whether each is a short story. The list \
             is cached, so repeated calls will not always hit the database. Call this when the user asks \
             about specific books, the library in general, or what has been read.",
            parameters_schema::<GetBooksParams>(&[]),
        ),
    ]
}

/// A parsed tool call.
#[derive(Debug, Clone)]
pub enum LibraryTool {
    AddBook(AddBookParams),
    GetStats(GetStatsParams),
    GetBooks,
}

impl LibraryTool {
    /// Parse a call by name. `Ok(None)` for names that are not library tools.
    pub fn parse(name: &str, arguments: &str) -> Result<Option<Self>, serde_json::Error> {
        let arguments = if arguments.trim().is_empty() { "{}" } else { arguments };
        let tool = match name {
            ADD_BOOK => Self::AddBook(serde_json::from_str(arguments)?),
            GET_STATS => Self::GetStats(serde_json::from_str(arguments)?),
            GET_BOOKS => {
                let _: GetBooksParams = serde_json::from_str(arguments)?;
                Self::GetBooks
            }
            _ => return Ok(None),
        };
        Ok(Some(tool))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::AddBook(_) => ADD_BOOK,
            Self::GetStats(_) => GET_STATS,
            Self::GetBooks => GET_BOOKS,
        }
    }

    /// Run the tool. The returned value is what gets serialized back to the model.
    pub async fn execute(self, cache: &ContextCache, backend: &dyn LibraryBackend) -> Value {
        match self {
            Self::GetBooks => {
                let books = cache.books(false).await;
                Value::String(render_books(books.as_slice()))
            }
            Self::GetStats(params) => {
                let requested = params.requested_stats.filter(|names| !names.is_empty());
                let text = match requested {
                    None => {
                        let stats = cache.stats(false).await;
                        render_stats(stats.as_ref())
                    }
                    // Custom subsets bypass the cache, which only holds the defaults.
                    Some(names) => render_stats(&backend.stats(Some(names)).await),
                };
                Value::String(text)
            }
            Self::AddBook(params) => {
                let outcome = match NewBook::try_from(params) {
                    Ok(book) => {
                        let outcome = backend.add_book(book).await;
                        if outcome.success {
                            cache.invalidate().await;
                        }
                        outcome
                    }
                    Err(e) => {
                        tracing::info!(error = %e, "add_book arguments rejected");
                        AddBookOutcome::failed(&e)
                    }
                };
                json!(outcome)
            }
        }
    }
}

/// Parse and run one model-requested call.
pub async fn run_tool_call(
    call: &ToolCallRequest,
    cache: &ContextCache,
    backend: &dyn LibraryBackend,
) -> Value {
    let name = call.function.name.as_str();
    match LibraryTool::parse(name, &call.function.arguments) {
        Ok(Some(tool)) => {
            tracing::info!(tool = tool.name(), call_id = %call.id, "tool called");
            tool.execute(cache, backend).await
        }
        Ok(None) => {
            tracing::warn!(tool = name, call_id = %call.id, "unknown tool requested");
            json!({})
        }
        Err(e) => {
            tracing::warn!(tool = name, call_id = %call.id, error = %e, "malformed tool arguments");
            json!({ "error": format!("invalid arguments for {name}: {e}") })
        }
    }
}
