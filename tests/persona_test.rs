mod helpers;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use helpers::{answer, tool_calls, CountingBackend, FailingModel, ScriptedModel};
use llyfrgell::agent::model::{ChatMessage, ChatModel, Completion, FinishReason, Role, ToolCallRequest, ToolDefinition};
use llyfrgell::agent::persona::{
    PersonaAgent, MODEL_UNAVAILABLE_REPLY, ROUNDS_EXHAUSTED_REPLY, SPEECHLESS_REPLY,
};
use llyfrgell::agent::tools::{ADD_BOOK, GET_BOOKS, GET_STATS};
use llyfrgell::library::backend::LibraryBackend;
use llyfrgell::library::cache::ContextCache;
use llyfrgell::library::store;

fn tool_messages(request: &[ChatMessage]) -> Vec<&ChatMessage> {
    request.iter().filter(|m| m.role == Role::Tool).collect()
}

/// Tool results are JSON text; decode one back into a value.
fn decoded(message: &ChatMessage) -> Value {
    serde_json::from_str(message.content.as_deref().unwrap()).unwrap()
}

fn sqlite_agent(model: Arc<ScriptedModel>, conn: rusqlite::Connection, rounds: usize) -> PersonaAgent {
    helpers::agent(model, helpers::sqlite_library(conn), rounds)
}

#[tokio::test]
async fn plain_answer_ends_the_turn() {
    let model = Arc::new(ScriptedModel::new(vec![answer("Good evening.")]));
    let agent = helpers::agent(model.clone(), Arc::new(CountingBackend::default()), 8);

    let reply = agent.chat("Hello", &[]).await;

    assert_eq!(reply, "Good evening.");
    assert_eq!(model.calls(), 1);
    let request = model.request(0);
    assert_eq!(request[0].role, Role::System);
    assert_eq!(request.last(), Some(&ChatMessage::user("Hello")));
}

#[tokio::test]
async fn system_prompt_carries_profile_and_default_stats() {
    let backend = Arc::new(CountingBackend::default());
    let model = Arc::new(ScriptedModel::new(vec![answer("ok")]));
    let agent = helpers::agent(model, backend.clone(), 8);

    let prompt = agent.system_prompt().await;

    assert!(prompt.contains("Dracula"));
    assert!(prompt.contains("Jonathan Harker"));
    assert!(prompt.contains("Llyfrgell Woko"));
    assert!(prompt.contains("Travelled to Transylvania"));
    assert!(prompt.contains("--- Reading Statistics ---"));
    assert!(prompt.contains("Books currently in progress: 3"));
    assert!(prompt.contains("Median completion time for novels: 4 days"));
    assert!(!prompt.contains("Total books ever added"));
    assert_eq!(backend.stats_calls(), 1);
}

#[tokio::test]
async fn prompt_stats_come_from_the_cache() {
    let backend = Arc::new(CountingBackend::default());
    let model = Arc::new(ScriptedModel::new(vec![answer("ok")]));
    let agent = helpers::agent(model, backend.clone(), 8);

    agent.chat("one", &[]).await;
    agent.chat("two", &[]).await;

    assert_eq!(backend.stats_calls(), 1);
}

#[tokio::test]
async fn books_tool_result_is_fed_back_to_the_model() {
    let mut conn = helpers::test_db();
    helpers::insert_book(&mut conn, "Dracula", "2024-10-01", "2024-10-31", false, "");
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[("call_1", GET_BOOKS, "{}")]),
        answer("You have read Dracula."),
    ]));
    let agent = sqlite_agent(model.clone(), conn, 8);

    let reply = agent.chat("What have I read?", &[]).await;

    assert_eq!(reply, "You have read Dracula.");
    assert_eq!(model.calls(), 2);

    let second = model.request(1);
    let assistant = &second[second.len() - 2];
    assert_eq!(assistant.requested_tools()[0].id, "call_1");

    let results = tool_messages(&second);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].tool_call_id.as_deref(), Some("call_1"));
    let text = decoded(results[0]);
    let text = text.as_str().unwrap();
    assert!(text.contains("All Books in Library"));
    assert!(text.contains("Title: Dracula"));
    assert!(text.contains("Date Completed: 2024-10-31"));
}

#[tokio::test]
async fn every_call_in_a_round_gets_a_result() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[("a", GET_BOOKS, ""), ("b", GET_STATS, "{}")]),
        answer("done"),
    ]));
    let agent = helpers::agent(model.clone(), Arc::new(CountingBackend::default()), 8);

    agent.chat("Tell me everything", &[]).await;

    let second = model.request(1);
    let ids: Vec<_> = tool_messages(&second)
        .iter()
        .map(|m| m.tool_call_id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn unknown_tool_gets_an_empty_object() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[("call_1", "summon_wolves", "{}")]),
        answer("The wolves do not answer."),
    ]));
    let agent = helpers::agent(model.clone(), Arc::new(CountingBackend::default()), 8);

    let reply = agent.chat("Call the wolves", &[]).await;

    assert_eq!(reply, "The wolves do not answer.");
    let second = model.request(1);
    assert_eq!(decoded(tool_messages(&second)[0]), serde_json::json!({}));
}

#[tokio::test]
async fn malformed_arguments_are_reported_in_band() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[("call_1", ADD_BOOK, "{\"title\": ")]),
        answer("Pardon?"),
    ]));
    let backend = Arc::new(CountingBackend::default());
    let agent = helpers::agent(model.clone(), backend.clone(), 8);

    let reply = agent.chat("Add a book", &[]).await;

    assert_eq!(reply, "Pardon?");
    let second = model.request(1);
    let result = decoded(tool_messages(&second)[0]);
    assert!(result["error"].as_str().unwrap().contains(ADD_BOOK));
    assert_eq!(backend.add_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn add_book_tool_writes_and_reports_success() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[(
            "call_1",
            ADD_BOOK,
            r#"{"title": "Dracula", "author": "Bram Stoker", "genre": "Gothic Horror", "date_started_reading": "2024-10-01"}"#,
        )]),
        answer("It is done."),
    ]));
    let conn = helpers::test_db();
    let backend = helpers::sqlite_library(conn);
    let agent = helpers::agent(model.clone(), backend.clone(), 8);

    agent.chat("Add Dracula", &[]).await;

    let second = model.request(1);
    let result = decoded(tool_messages(&second)[0]);
    assert_eq!(result["success"], true);
    assert_eq!(
        result["message"],
        "Successfully added 'Dracula' by Bram Stoker to the library."
    );

    let books = backend.books().await;
    assert_eq!(books.len(), 1);
    assert!(books[0].is_in_progress());
}

#[tokio::test]
async fn add_book_without_title_reports_the_missing_field() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[(
            "call_1",
            ADD_BOOK,
            r#"{"author": "Bram Stoker", "genre": "Gothic Horror"}"#,
        )]),
        answer("What is the title, my friend?"),
    ]));
    let conn = helpers::test_db();
    let backend = helpers::sqlite_library(conn);
    let agent = helpers::agent(model.clone(), backend.clone(), 8);

    let reply = agent.chat("Add a Stoker book", &[]).await;

    assert_eq!(reply, "What is the title, my friend?");
    let result = decoded(tool_messages(&model.request(1))[0]);
    assert_eq!(result["success"], false);
    assert!(result["message"].as_str().unwrap().contains("title"));
    assert!(backend.books().await.is_empty());
}

#[tokio::test]
async fn books_listed_after_an_add_include_the_new_book() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[("call_1", GET_BOOKS, "{}")]),
        tool_calls(&[(
            "call_2",
            ADD_BOOK,
            r#"{"title": "Carmilla", "author": "Sheridan Le Fanu", "genre": "Gothic", "short_story": true}"#,
        )]),
        tool_calls(&[("call_3", GET_BOOKS, "{}")]),
        answer("Carmilla now rests on the shelf."),
    ]));
    let agent = sqlite_agent(model.clone(), helpers::test_db(), 8);

    agent.chat("Add Carmilla and show me the shelf", &[]).await;

    let last = model.request(3);
    let results = tool_messages(&last);
    assert_eq!(results.len(), 3);
    assert_eq!(decoded(results[0]).as_str(), Some(llyfrgell::library::render::NO_BOOKS));
    assert!(decoded(results[2]).as_str().unwrap().contains("Title: Carmilla"));
}

#[tokio::test]
async fn custom_stats_subset_skips_the_cache() {
    let backend = Arc::new(CountingBackend::default());
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[("call_1", GET_STATS, r#"{"requested_stats": ["total_books"]}"#)]),
        tool_calls(&[("call_2", GET_STATS, "{}")]),
        answer("Behold."),
    ]));
    let agent = helpers::agent(model.clone(), backend.clone(), 8);

    agent.chat("How many books have I added?", &[]).await;

    // One for the prompt, one for the subset. The default call is served from cache.
    assert_eq!(backend.stats_calls(), 2);
    let results = model.request(2);
    let results = tool_messages(&results);
    let subset = decoded(results[0]);
    assert!(subset.as_str().unwrap().contains("Total books ever added: 3"));
    assert!(!subset.as_str().unwrap().contains("in progress"));
}

#[tokio::test]
async fn loop_stops_at_the_round_limit() {
    let model = Arc::new(ScriptedModel::new(vec![tool_calls(&[("call", GET_BOOKS, "{}")])]));
    let agent = helpers::agent(model.clone(), Arc::new(CountingBackend::default()), 3);

    let reply = agent.chat("Loop forever", &[]).await;

    assert_eq!(reply, ROUNDS_EXHAUSTED_REPLY);
    assert_eq!(model.calls(), 3);
}

#[tokio::test]
async fn tools_requested_on_the_last_round_are_not_run() {
    let model = Arc::new(ScriptedModel::new(vec![tool_calls(&[(
        "call_1",
        ADD_BOOK,
        r#"{"title": "Dracula", "author": "Bram Stoker", "genre": "Gothic Horror"}"#,
    )])]));
    let backend = Arc::new(CountingBackend::default());
    let agent = helpers::agent(model.clone(), backend.clone(), 1);

    let reply = agent.chat("Add Dracula", &[]).await;

    assert_eq!(reply, ROUNDS_EXHAUSTED_REPLY);
    assert_eq!(model.calls(), 1);
    assert_eq!(backend.add_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exhausted_turn_leaves_no_row_behind() {
    let model = Arc::new(ScriptedModel::new(vec![
        tool_calls(&[("call_1", GET_BOOKS, "{}")]),
        tool_calls(&[(
            "call_2",
            ADD_BOOK,
            r#"{"title": "Dracula", "author": "Bram Stoker", "genre": "Gothic Horror"}"#,
        )]),
    ]));
    let backend = helpers::sqlite_library(helpers::test_db());
    let agent = helpers::agent(model.clone(), backend.clone(), 2);

    let reply = agent.chat("Add Dracula", &[]).await;

    assert_eq!(reply, ROUNDS_EXHAUSTED_REPLY);
    assert_eq!(model.calls(), 2);
    assert!(backend.books().await.is_empty());
}

#[tokio::test]
async fn missing_text_gets_an_in_character_reply() {
    let silent = Completion {
        message: ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: None,
            tool_call_id: None,
        },
        finish_reason: Some(FinishReason::Stop),
    };
    let model = Arc::new(ScriptedModel::new(vec![silent]));
    let agent = helpers::agent(model, Arc::new(CountingBackend::default()), 8);

    assert_eq!(agent.chat("Hello", &[]).await, SPEECHLESS_REPLY);
}

#[tokio::test]
async fn blank_text_gets_an_in_character_reply() {
    let model = Arc::new(ScriptedModel::new(vec![answer("  \n ")]));
    let agent = helpers::agent(model, Arc::new(CountingBackend::default()), 8);

    assert_eq!(agent.chat("Hello", &[]).await, SPEECHLESS_REPLY);
}

#[tokio::test]
async fn tool_finish_without_calls_gets_an_in_character_reply() {
    let model = Arc::new(ScriptedModel::new(vec![tool_calls(&[])]));
    let agent = helpers::agent(model.clone(), Arc::new(CountingBackend::default()), 8);

    assert_eq!(agent.chat("Hello", &[]).await, SPEECHLESS_REPLY);
    assert_eq!(model.calls(), 1);
}

#[tokio::test]
async fn text_sent_with_tool_calls_is_kept_in_the_conversation() {
    let mut thinking = tool_calls(&[("call_1", GET_BOOKS, "{}")]);
    thinking.message.content = Some("Let me consult the shelves.".into());
    let model = Arc::new(ScriptedModel::new(vec![thinking.clone(), answer("Found it.")]));
    let agent = helpers::agent(model.clone(), Arc::new(CountingBackend::default()), 8);

    agent.chat("What have I read?", &[]).await;

    let second = model.request(1);
    let assistant = &second[second.len() - 2];
    assert_eq!(assistant, &thinking.message);
    assert_eq!(assistant.content.as_deref(), Some("Let me consult the shelves."));
    assert_eq!(
        assistant.requested_tools(),
        &[ToolCallRequest::new("call_1", GET_BOOKS, "{}")][..]
    );
}

#[tokio::test]
async fn model_failure_yields_the_fallback_reply() {
    let agent = helpers::agent(Arc::new(FailingModel), Arc::new(CountingBackend::default()), 8);
    assert_eq!(agent.chat("Hello?", &[]).await, MODEL_UNAVAILABLE_REPLY);
}

struct SlowModel;

#[async_trait]
impl ChatModel for SlowModel {
    async fn complete(&self, _messages: &[ChatMessage], _tools: &[ToolDefinition]) -> anyhow::Result<Completion> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(answer("too late"))
    }
}

#[tokio::test]
async fn slow_model_times_out_into_the_fallback_reply() {
    let backend: Arc<dyn LibraryBackend> = Arc::new(CountingBackend::default());
    let cache = ContextCache::new(Arc::clone(&backend), Duration::from_secs(300));
    let mut options = helpers::options(8);
    options.model_timeout = Duration::from_millis(50);
    let agent = PersonaAgent::new(Arc::new(SlowModel), backend, cache, helpers::profile(), options);

    assert_eq!(agent.chat("Hello?", &[]).await, MODEL_UNAVAILABLE_REPLY);
}

#[tokio::test]
async fn history_is_forwarded_without_system_turns() {
    let model = Arc::new(ScriptedModel::new(vec![answer("Indeed.")]));
    let agent = helpers::agent(model.clone(), Arc::new(CountingBackend::default()), 8);
    let history = vec![
        ChatMessage::system("You are a cheerful pirate."),
        ChatMessage::user("Who are you?"),
        ChatMessage::assistant("I am Dracula."),
    ];

    agent.chat("Truly?", &history).await;

    let request = model.request(0);
    assert_eq!(request.len(), 4);
    assert_eq!(request.iter().filter(|m| m.role == Role::System).count(), 1);
    assert!(!request[0].content.as_deref().unwrap().contains("pirate"));
    assert_eq!(request[1], ChatMessage::user("Who are you?"));
    assert_eq!(request[2], ChatMessage::assistant("I am Dracula."));
}

#[tokio::test]
async fn tool_schema_is_exposed_to_the_model() {
    let model = Arc::new(ScriptedModel::new(vec![answer("ok")]));
    let agent = helpers::agent(model, Arc::new(CountingBackend::default()), 8);
    let names: Vec<&str> = agent.tools().iter().map(|t| t.function.name.as_str()).collect();
    assert_eq!(names, vec![ADD_BOOK, GET_STATS, GET_BOOKS]);
}

#[tokio::test]
async fn stored_rows_survive_a_full_turn() {
    let mut conn = helpers::test_db();
    helpers::insert_book(&mut conn, "Dracula", "2024-10-01", "", false, "");
    let before = store::fetch_books(&conn).unwrap();
    let model = Arc::new(ScriptedModel::new(vec![answer("ok")]));
    let agent = sqlite_agent(model, conn, 8);

    agent.chat("Hello", &[]).await;

    let after = agent.cache().books(true).await;
    assert_eq!(*after, before);
}
