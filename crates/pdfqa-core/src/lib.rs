//! # pdfqa core
//!
//! The retrieval and answer-composition pipeline behind `pdfqa`: chunking,
//! the embedding index, retrieval, context/prompt rendering, response modes,
//! and the extractive answer synthesizer.
//!
//! This crate has no filesystem, HTTP, or PDF-parsing dependencies. The
//! application crate extracts pages, owns the session state, and passes the
//! active [`index::Index`] into these functions explicitly.
//!
//! ```text
//! pages ──▶ chunk ──▶ index::Index::build
//!                           │
//! question ──▶ retrieve ────┘──▶ context ──▶ query::QueryParts ──▶ synth
//! ```

pub mod chunk;
pub mod context;
pub mod embedding;
pub mod error;
pub mod index;
pub mod models;
pub mod modes;
pub mod query;
pub mod retrieve;
pub mod synth;

pub use error::{QaError, QaResult};
