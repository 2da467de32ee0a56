//! # pdfqa CLI
//!
//! Ask questions about a PDF from the command line, or serve the HTTP API.
//!
//! ## Usage
//!
//! ```bash
//! pdfqa --config ./config/pdfqa.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfqa modes` | List response modes and their instructions |
//! | `pdfqa chunks <pdf>` | Extract and chunk a PDF, printing previews |
//! | `pdfqa ask <pdf> "<question>"` | Index a PDF and answer one question |
//! | `pdfqa serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! pdfqa ask notes.pdf "Why did the empire fall?" --mode exam
//! pdfqa ask notes.pdf "What is osmosis?" --mode explain_like_5 --show-prompt
//! RUST_LOG=debug pdfqa serve --bind 127.0.0.1:9000
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use pdfqa::config::{self, DEFAULT_CONFIG_PATH};
use pdfqa::{commands, embedding, logging, server, session::Session};

/// Ask questions about an uploaded PDF.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. When the file does not exist, built-in defaults are used.
#[derive(Parser)]
#[command(
    name = "pdfqa",
    about = "Ask questions about a PDF in one of several response modes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List response modes and their formatting instructions.
    Modes,

    /// Extract and chunk a PDF without embedding it.
    Chunks {
        /// Path to the PDF.
        pdf: PathBuf,
    },

    /// Index a PDF and answer a single question about it.
    Ask {
        /// Path to the PDF.
        pdf: PathBuf,

        /// The question to answer.
        question: String,

        /// Response mode: default, exam, summary, explain_like_5, creative.
        #[arg(long, default_value = "default")]
        mode: String,

        /// Print the full rendered prompt before the answer.
        #[arg(long)]
        show_prompt: bool,
    },

    /// Start the HTTP server.
    Serve {
        /// Override `[server].bind`.
        #[arg(long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if let Commands::Modes = cli.command {
        commands::run_modes();
        return Ok(());
    }

    let mut cfg = config::load_config(&cli.config)?;
    logging::init(&cfg.logging.level);

    match cli.command {
        Commands::Modes => {}
        Commands::Chunks { pdf } => {
            commands::run_chunks(&cfg, &pdf)?;
        }
        Commands::Ask {
            pdf,
            question,
            mode,
            show_prompt,
        } => {
            commands::run_ask(&cfg, &pdf, &question, &mode, show_prompt).await?;
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                cfg.server.bind = bind;
            }
            let embedder = embedding::create_embedder(&cfg.embedding)?;
            let session = Arc::new(Session::from_config(&cfg, embedder));
            server::run_server(&cfg, session).await?;
        }
    }

    Ok(())
}
