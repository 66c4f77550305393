#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use llyfrgell::agent::model::{ChatMessage, ChatModel, Completion, FinishReason, ToolCallRequest, ToolDefinition};
use llyfrgell::agent::persona::{AgentOptions, PersonaAgent};
use llyfrgell::db;
use llyfrgell::library::backend::{LibraryBackend, SqliteLibrary};
use llyfrgell::library::cache::ContextCache;
use llyfrgell::library::store;
use llyfrgell::library::types::{
    AddBookOutcome, BookRecord, NewBook, ReadingStats, StatSelection, StatValue,
};
use llyfrgell::profile::Profile;

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    db::open_memory_database().unwrap()
}

pub fn date(s: &str) -> Option<NaiveDate> {
    Some(s.parse().expect("valid test date"))
}

/// Insert a book through the store. Dates are `YYYY-MM-DD` or empty for none.
pub fn insert_book(
    conn: &mut Connection,
    title: &str,
    started: &str,
    completed: &str,
    short_story: bool,
    obtained: &str,
) -> i64 {
    let parse = |s: &str| if s.is_empty() { None } else { date(s) };
    let book = NewBook {
        title: title.to_string(),
        author: "Test Author".to_string(),
        genre: "Test Genre".to_string(),
        date_started_reading: parse(started),
        date_completed: parse(completed),
        short_story,
        date_obtained: parse(obtained),
    };
    store::add_book(conn, &book).unwrap()
}

pub fn sqlite_library(conn: Connection) -> Arc<SqliteLibrary> {
    Arc::new(SqliteLibrary::new(Arc::new(Mutex::new(conn)), Duration::from_secs(5)))
}

/// A backend that counts calls and serves fixed data.
#[derive(Default)]
pub struct CountingBackend {
    pub books_calls: AtomicUsize,
    pub stats_calls: AtomicUsize,
    pub add_calls: AtomicUsize,
    pub books: Vec<BookRecord>,
}

impl CountingBackend {
    pub fn books_calls(&self) -> usize {
        self.books_calls.load(Ordering::SeqCst)
    }

    pub fn stats_calls(&self) -> usize {
        self.stats_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LibraryBackend for CountingBackend {
    async fn books(&self) -> Vec<BookRecord> {
        self.books_calls.fetch_add(1, Ordering::SeqCst);
        self.books.clone()
    }

    async fn stats(&self, requested: Option<Vec<String>>) -> ReadingStats {
        self.stats_calls.fetch_add(1, Ordering::SeqCst);
        let selection = match requested {
            Some(names) if !names.is_empty() => StatSelection::parse_requested(&names),
            _ => StatSelection::DEFAULTS.to_vec(),
        };
        selection
            .into_iter()
            .map(|stat| {
                let value = if stat.is_median() {
                    StatValue::MedianDays(Some(4.0))
                } else {
                    StatValue::Count(3)
                };
                (stat, value)
            })
            .collect()
    }

    async fn add_book(&self, book: NewBook) -> AddBookOutcome {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        AddBookOutcome::added(&book)
    }
}

/// A model that replays canned completions. The last one repeats forever.
pub struct ScriptedModel {
    script: Mutex<VecDeque<Completion>>,
    pub requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    pub fn new(script: Vec<Completion>) -> Self {
        assert!(!script.is_empty(), "script needs at least one completion");
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, n: usize) -> Vec<ChatMessage> {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: &[ChatMessage], _tools: &[ToolDefinition]) -> anyhow::Result<Completion> {
        self.requests.lock().unwrap().push(messages.to_vec());
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            Ok(script.pop_front().unwrap())
        } else {
            Ok(script.front().cloned().unwrap())
        }
    }
}

/// A model service that is always down.
pub struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn complete(&self, _messages: &[ChatMessage], _tools: &[ToolDefinition]) -> anyhow::Result<Completion> {
        anyhow::bail!("connection refused")
    }
}

pub fn answer(text: &str) -> Completion {
    Completion {
        message: ChatMessage::assistant(text),
        finish_reason: Some(FinishReason::Stop),
    }
}

pub fn tool_calls(calls: &[(&str, &str, &str)]) -> Completion {
    let calls = calls
        .iter()
        .map(|(id, name, args)| ToolCallRequest::new(*id, *name, *args))
        .collect();
    Completion {
        message: ChatMessage::assistant_tool_calls(calls),
        finish_reason: Some(FinishReason::ToolCalls),
    }
}

pub fn options(max_tool_rounds: usize) -> AgentOptions {
    AgentOptions {
        owner_name: "Jonathan Harker".into(),
        library_name: "Llyfrgell Woko".into(),
        max_tool_rounds,
        model_timeout: Duration::from_secs(5),
    }
}

pub fn profile() -> Profile {
    Profile::new(
        "Solicitor turned reluctant adventurer.",
        "Clerk at Hawkins & Co, Exeter. Travelled to Transylvania on a property matter.",
    )
}

pub fn agent(
    model: Arc<dyn ChatModel>,
    backend: Arc<dyn LibraryBackend>,
    max_tool_rounds: usize,
) -> PersonaAgent {
    let cache = ContextCache::new(Arc::clone(&backend), Duration::from_secs(300));
    PersonaAgent::new(model, backend, cache, profile(), options(max_tool_rounds))
}
