//! HTTP chat surface and shared setup.
//!
//! [`build_agent`] wires the database, model client, cache, and profile into a
//! [`PersonaAgent`]. [`router`] exposes it over `POST /chat` and `GET /health`;
//! [`serve`] binds it to the configured address.

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::agent::model::{ChatMessage, Role};
use crate::agent::openai::OpenAiClient;
use crate::agent::persona::{AgentOptions, PersonaAgent};
use crate::config::LibraryConfig;
use crate::db;
use crate::library::backend::{LibraryBackend, SqliteLibrary};
use crate::library::cache::ContextCache;
use crate::profile::Profile;

/// Open the database, load the profile, and build the persona.
pub fn build_agent(config: &LibraryConfig) -> Result<PersonaAgent> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let backend: Arc<dyn LibraryBackend> = Arc::new(SqliteLibrary::new(
        Arc::new(Mutex::new(conn)),
        config.query_timeout(),
    ));
    let cache = ContextCache::new(Arc::clone(&backend), config.cache_ttl());

    let client = OpenAiClient::new(&config.model)?;
    if config.model.api_key.is_none() {
        tracing::warn!("no API key configured; set OPENAI_API_KEY if the model service needs one");
    }
    tracing::info!(model = client.model(), "model client ready");

    let profile = Profile::load(&config.persona)?;

    Ok(PersonaAgent::new(
        Arc::new(client),
        backend,
        cache,
        profile,
        AgentOptions::from_config(config),
    ))
}

/// One prior turn as the chat widget sends it.
#[derive(Debug, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

/// Keep only the user and assistant text turns; the widget has no business sending
/// system prompts or tool results.
fn history_messages(history: Vec<HistoryTurn>) -> Vec<ChatMessage> {
    history
        .into_iter()
        .filter_map(|turn| match turn.role {
            Role::User => Some(ChatMessage::user(turn.content)),
            Role::Assistant => Some(ChatMessage::assistant(turn.content)),
            Role::System | Role::Tool => None,
        })
        .collect()
}

async fn chat(
    State(agent): State<Arc<PersonaAgent>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, (StatusCode, String)> {
    if req.message.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "message must not be empty".into()));
    }

    tracing::info!(message_len = req.message.len(), history = req.history.len(), "chat turn");
    let history = history_messages(req.history);
    let reply = agent.chat(&req.message, &history).await;
    Ok(Json(ChatResponse { reply }))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn router(agent: Arc<PersonaAgent>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .with_state(agent)
}

/// Serve the chat endpoint until ctrl-c.
pub async fn serve(config: LibraryConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let agent = Arc::new(build_agent(&config)?);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "chat server listening at http://{bind_addr}/chat");

    axum::serve(listener, router(agent))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down chat server");
        })
        .await?;

    Ok(())
}
