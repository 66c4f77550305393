mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use llyfrgell::agent::tools::add_book::AddBookParams;
use llyfrgell::config::LibraryConfig;
use llyfrgell::server;

#[derive(Parser)]
#[command(name = "llyfrgell", version, about = "A reading library with a Gothic host")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP chat server
    Serve,
    /// Chat with the persona in the terminal
    Chat,
    /// List every book in the library
    Books,
    /// Show reading statistics
    Stats {
        /// Specific statistics to show (defaults to the common set)
        names: Vec<String>,
        /// Show every statistic
        #[arg(long, conflicts_with = "names")]
        all: bool,
    },
    /// Add a book to the library
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        author: String,
        #[arg(long)]
        genre: String,
        /// Date reading started (YYYY-MM-DD)
        #[arg(long)]
        started: Option<String>,
        /// Date reading finished (YYYY-MM-DD)
        #[arg(long)]
        completed: Option<String>,
        /// Date the book was obtained (YYYY-MM-DD)
        #[arg(long)]
        obtained: Option<String>,
        #[arg(long)]
        short_story: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = LibraryConfig::load()?;

    // Log to stderr so stdout stays clean for command output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => server::serve(config).await?,
        Command::Chat => cli::chat::chat(&config).await?,
        Command::Books => cli::books::books(&config)?,
        Command::Stats { names, all } => cli::stats::stats(&config, &names, all)?,
        Command::Add {
            title,
            author,
            genre,
            started,
            completed,
            obtained,
            short_story,
        } => {
            let params = AddBookParams {
                title: Some(title),
                author: Some(author),
                genre: Some(genre),
                date_started_reading: started,
                date_completed: completed,
                short_story: Some(short_story),
                date_obtained: obtained,
            };
            cli::add::add(&config, params)?;
        }
    }

    Ok(())
}
