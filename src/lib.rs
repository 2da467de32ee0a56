//! # pdfqa
//!
//! Question answering over a single uploaded PDF.
//!
//! A PDF is split into pages, chunked, and embedded into an in-memory
//! index. Each question retrieves the closest chunks and an extractive
//! synthesizer composes the answer from them in one of five response
//! modes (`default`, `exam`, `summary`, `explain_like_5`, `creative`).
//! The pipeline itself lives in the `pdfqa-core` crate; this crate adds
//! PDF extraction, embedding backends, session state, an HTTP API and
//! the `pdfqa` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │ PDF      │──▶│ Chunk+Embed  │──▶│ Index        │
//! │ extract  │   │ (pdfqa-core) │   │ (in memory)  │
//! └──────────┘   └──────────────┘   └──────┬───────┘
//!                                          │ top-k
//!                                          ▼
//!                                   ┌──────────────┐
//!                                   │ Query+Synth  │
//!                                   └──────┬───────┘
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   CLI    │       │   HTTP   │
//!                 │ (pdfqa)  │       │  (axum)  │
//!                 └──────────┘       └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`extract`] | PDF → ordered pages |
//! | [`embedding`] | Embedding provider construction |
//! | [`session`] | Active document, index and conversation log |
//! | [`server`] | HTTP API |
//! | [`commands`] | One-shot CLI commands |

pub mod commands;
pub mod config;
pub mod embedding;
pub mod extract;
pub mod logging;
pub mod server;
pub mod session;

pub use pdfqa_core::{QaError, QaResult};
