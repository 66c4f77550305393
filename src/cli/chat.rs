use anyhow::Result;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use llyfrgell::agent::model::ChatMessage;
use llyfrgell::config::LibraryConfig;
use llyfrgell::server::build_agent;

/// Interactive chat in the terminal. An empty line or EOF ends the session.
pub async fn chat(config: &LibraryConfig) -> Result<()> {
    let agent = build_agent(config)?;
    let mut history: Vec<ChatMessage> = Vec::new();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        let reply = agent.chat(message, &history).await;
        println!("\n{reply}\n");

        history.push(ChatMessage::user(message));
        history.push(ChatMessage::assistant(reply));
    }

    Ok(())
}
