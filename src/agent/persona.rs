//! The Dracula persona and its tool-calling loop.
//!
//! Each [`PersonaAgent::chat`] call composes a system prompt (owner profile plus the
//! cached default statistics), then alternates between the model and the library tools
//! until the model answers in plain text or the round budget runs out. Every path ends
//! in some in-character text; backend trouble never surfaces as an error.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::model::{ChatMessage, ChatModel, Completion, Role, ToolDefinition};
use crate::agent::tools;
use crate::config::LibraryConfig;
use crate::library::backend::LibraryBackend;
use crate::library::cache::ContextCache;
use crate::library::render::render_stats;
use crate::profile::Profile;

/// Reply when the model service cannot be reached.
pub const MODEL_UNAVAILABLE_REPLY: &str = "Alas, the candles gutter and the voices that carry my words have fallen silent. \
I could not reach the library records just now. Return in a moment, and I shall receive you properly.";

/// Reply when the model ends its turn without any text.
pub const SPEECHLESS_REPLY: &str = "Ah, the words escape me, as mist escapes the moonlight. \
Ask again, my guest, and I shall answer you properly.";

/// Reply when the model keeps asking for tools past the round budget.
pub const ROUNDS_EXHAUSTED_REPLY: &str = "Forgive me, my guest. I have wandered the stacks too long without finding what you seek, \
and I am unable to complete this request. Perhaps you might ask it of me another way?";

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub owner_name: String,
    pub library_name: String,
    /// Upper bound on model calls per chat turn.
    pub max_tool_rounds: usize,
    pub model_timeout: Duration,
}

impl AgentOptions {
    pub fn from_config(config: &LibraryConfig) -> Self {
        Self {
            owner_name: config.persona.owner_name.clone(),
            library_name: config.persona.library_name.clone(),
            max_tool_rounds: config.model.max_tool_rounds.max(1),
            model_timeout: Duration::from_millis(config.model.request_timeout_ms),
        }
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self::from_config(&LibraryConfig::default())
    }
}

pub struct PersonaAgent {
    model: Arc<dyn ChatModel>,
    backend: Arc<dyn LibraryBackend>,
    cache: ContextCache,
    profile: Profile,
    options: AgentOptions,
    tools: Vec<ToolDefinition>,
}

impl PersonaAgent {
    pub fn new(
        model: Arc<dyn ChatModel>,
        backend: Arc<dyn LibraryBackend>,
        cache: ContextCache,
        profile: Profile,
        options: AgentOptions,
    ) -> Self {
        Self {
            model,
            backend,
            cache,
            profile,
            options,
            tools: tools::definitions(),
        }
    }

    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    fn greeting(&self) -> String {
        let AgentOptions {
            owner_name,
            library_name,
            ..
        } = &self.options;
        format!(
            "Greetings, mortal. I am Dracula, the proprietor of '{library_name}', a humble abode for the literary treasures of {owner_name}. \
             I possess a profound knowledge of {owner_name}'s professional journey, voracious reading habits, and various fascinations. \
             You may inquire about the trajectory of that career, its formidable skills, or any facet of the background. \
             Should you seek details about the volumes devoured here, I shall consult the library's records through my arcane tools. \
             I am also capable of adding new books to the collection, should you provide the necessary details. \
             Now, what whispers of knowledge do you seek to unearth from the shadows of this library?"
        )
    }

    /// Build the system prompt. Costs at most one stats refresh.
    ///
    /// Always carries the default statistics, whatever subset the model later asks for.
    pub async fn system_prompt(&self) -> String {
        let owner = &self.options.owner_name;
        let library = &self.options.library_name;

        let mut prompt = format!(
            "You are acting as Dracula from the Bram Stoker novel, who is the proprietor of '{library}'. \
             You are speaking on behalf of the user, {owner}, and have a deep knowledge of their professional background, \
             reading habits, and personal interests. Your tone should be formal, archaic, and a little sinister, \
             but also welcoming, as if you are a host.\n\n\
             **Regarding Books:** You do not have a comprehensive list of all books in your immediate memory. \
             When the user asks for details about specific books, a list of books, or general information about {owner}'s reading, \
             you must use the '{books}' tool to retrieve the list of books from the database. \
             It is cached, so calling it several times in a short period will not hit the database repeatedly.\n\n\
             **Regarding Statistics:** If the user asks for interesting facts or statistics about {owner}'s reading, \
             prefer the statistics already provided below when they cover the request. Only call '{stats}' for specific \
             statistics not already in your context, or for a refresh.\n\n\
             You can add a book to the library by calling '{add}'. If the user wants to add a book but has not given \
             enough information, stay in character and ask for what is missing.\n\n\
             You have been given the following information to assist you in your role as host.",
            books = tools::GET_BOOKS,
            stats = tools::GET_STATS,
            add = tools::ADD_BOOK,
        );

        prompt.push_str(&format!(
            "\n\n## If the user begins the conversation with a generic greeting, provide the following response:\n{}",
            self.greeting()
        ));
        prompt.push_str(&format!(
            "\n\n## Summary of {owner}'s Career:\n{}\n\n## {owner}'s Career Profile:\n{}\n",
            self.profile.summary, self.profile.career
        ));

        let stats = self.cache.stats(false).await;
        if !stats.is_empty() {
            prompt.push_str("\n\n## Reading Statistics:\n");
            prompt.push_str(&render_stats(stats.as_ref()));
        }

        prompt.push_str(&format!(
            "\n\nWith this context, please chat with the user, always staying in character as Dracula, the proprietor of '{library}'."
        ));
        prompt
    }

    async fn call_model(&self, messages: &[ChatMessage]) -> Option<Completion> {
        match tokio::time::timeout(self.options.model_timeout, self.model.complete(messages, &self.tools)).await {
            Ok(Ok(completion)) => Some(completion),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "model call failed");
                None
            }
            Err(_) => {
                tracing::error!(
                    timeout_ms = self.options.model_timeout.as_millis() as u64,
                    "model call timed out"
                );
                None
            }
        }
    }

    /// Answer one user message. `history` holds the earlier turns, oldest first.
    pub async fn chat(&self, message: &str, history: &[ChatMessage]) -> String {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt().await));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
        messages.push(ChatMessage::user(message));

        for round in 1..=self.options.max_tool_rounds {
            let Some(completion) = self.call_model(&messages).await else {
                return MODEL_UNAVAILABLE_REPLY.to_string();
            };

            if !completion.wants_tools() {
                tracing::debug!(round, finish_reason = ?completion.finish_reason, "model answered");
                return match completion.message.content {
                    Some(text) if !text.trim().is_empty() => text,
                    _ => {
                        tracing::warn!(round, "model answered with no text");
                        SPEECHLESS_REPLY.to_string()
                    }
                };
            }

            // No model call is left to read the results, so nothing runs.
            if round == self.options.max_tool_rounds {
                break;
            }

            let calls = completion.message.requested_tools().to_vec();
            tracing::info!(round, calls = calls.len(), "model requested tools");

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let result = tools::run_tool_call(call, &self.cache, self.backend.as_ref()).await;
                results.push(ChatMessage::tool_result(call.id.clone(), result.to_string()));
            }

            messages.push(completion.message);
            messages.extend(results);
        }

        tracing::warn!(
            max_tool_rounds = self.options.max_tool_rounds,
            "tool loop hit its round limit"
        );
        ROUNDS_EXHAUSTED_REPLY.to_string()
    }
}
