//! One-shot CLI commands.
//!
//! Each command prints human-readable output to stdout; diagnostics go
//! through `tracing` to stderr.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use pdfqa_core::chunk::split_document;
use pdfqa_core::modes::Mode;

use crate::config::Config;
use crate::embedding::create_embedder;
use crate::extract::load_pdf;
use crate::session::Session;

const PREVIEW_CHARS: usize = 80;

/// `pdfqa modes`: list every mode with its instruction text.
pub fn run_modes() {
    for mode in Mode::ALL {
        println!("{}", mode);
        for line in mode.instruction().lines() {
            println!("    {}", line);
        }
        println!();
    }
}

/// `pdfqa chunks <pdf>`: extract and chunk without embedding.
pub fn run_chunks(config: &Config, path: &Path) -> Result<()> {
    let document = load_pdf(path)?;
    let chunks = split_document(&document, &config.chunking.params());

    println!(
        "{}: {} pages, {} chunks (chunk_size={}, overlap={})",
        document.filename,
        document.page_count(),
        chunks.len(),
        config.chunking.chunk_size,
        config.chunking.chunk_overlap
    );
    for chunk in &chunks {
        println!(
            "  #{:<4} page {:<4} {:>5} chars  {}",
            chunk.sequence_index,
            chunk.page_index + 1,
            chunk.text.chars().count(),
            preview(&chunk.text)
        );
    }
    Ok(())
}

/// `pdfqa ask <pdf> <question>`: ingest one PDF and answer one question.
pub async fn run_ask(
    config: &Config,
    path: &Path,
    question: &str,
    mode: &str,
    show_prompt: bool,
) -> Result<()> {
    let embedder = create_embedder(&config.embedding)?;
    let session = Session::from_config(config, Arc::clone(&embedder));

    let summary = session.ingest_pdf(path).await?;
    tracing::info!(
        pages = summary.page_count,
        chunks = summary.chunk_count,
        model = embedder.model_name(),
        "indexed {}",
        summary.filename
    );

    let answer = session.ask(question, mode).await?;
    if show_prompt {
        println!("{}", answer.prompt);
        println!("{}", "-".repeat(60));
    }
    println!("{}", answer.answer);
    println!();
    println!("[{} mode, {} sources]", answer.mode, answer.sources.len());
    for chunk in &answer.sources {
        println!("  page {}: {}", chunk.page_index + 1, preview(&chunk.text));
    }
    Ok(())
}

/// First line of `text`, shortened to a fixed width.
fn preview(text: &str) -> String {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim();
    if line.chars().count() > PREVIEW_CHARS {
        let cut: String = line.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}
