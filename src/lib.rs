//! A reading library with a Gothic host.
//!
//! Llyfrgell is a persona chatbot: Dracula, proprietor of a small library, answers
//! questions about one person's career and reading history. Reading records live in
//! SQLite; the model reaches them through three tools (`add_book`, `get_stats_tool`,
//! `get_books_tool`) in a bounded tool-calling loop.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, and migrations
//! - [`library`]: Book storage, reading statistics, the context cache, and prompt rendering
//! - [`agent`]: Chat model client, tool schema and dispatch, and the persona loop
//! - [`profile`]: The owner's career profile text
//! - [`server`]: HTTP chat surface

pub mod agent;
pub mod config;
pub mod db;
pub mod library;
pub mod profile;
pub mod server;
