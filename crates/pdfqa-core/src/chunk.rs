//! Recursive character text chunker.
//!
//! Splits page text into overlapping windows of at most `chunk_size`
//! characters, preferring paragraph, then line, then word boundaries before
//! falling back to single characters.
//!
//! # Algorithm
//!
//! 1. Pick the first separator in `["\n\n", "\n", " ", ""]` that occurs in
//!    the text and split on it, keeping the separator at the start of each
//!    following piece.
//! 2. Pieces shorter than `chunk_size` are accumulated; any piece that is
//!    too long is split again with the remaining, finer separators.
//! 3. Accumulated pieces are merged greedily into windows. When a window
//!    is full it is emitted (trimmed), and pieces are dropped from its front
//!    until at most `chunk_overlap` characters remain; those carry over as
//!    the start of the next window.
//! 4. Windows that are empty after trimming are discarded.
//!
//! Lengths are measured in characters, not bytes.
//!
//! # Example
//!
//! ```rust
//! use pdfqa_core::chunk::{split_text, ChunkParams};
//!
//! let pieces = split_text("Hello world.\n\nSecond paragraph.", &ChunkParams::default());
//! assert_eq!(pieces, vec!["Hello world.\n\nSecond paragraph."]);
//! ```

use std::collections::VecDeque;

use sha2::{Digest, Sha256};

use crate::models::{Chunk, Document, Page};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Separators tried in order, coarsest first. The empty separator splits
/// into single characters.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Window size and overlap, both in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Chunk every page of a document, in page order.
pub fn split_document(document: &Document, params: &ChunkParams) -> Vec<Chunk> {
    split_pages(&document.id, &document.pages, params)
}

/// Chunk an ordered sequence of pages.
///
/// Sequence indices are contiguous across the whole document. Pages with no
/// text contribute no chunks.
pub fn split_pages(document_id: &str, pages: &[Page], params: &ChunkParams) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for page in pages {
        for (start, text) in locate_pieces(&page.text, split_text(&page.text, params), params) {
            let sequence_index = chunks.len();
            chunks.push(make_chunk(document_id, page.index, sequence_index, start, text));
        }
    }
    chunks
}

/// Split raw text into trimmed, non-empty windows.
pub fn split_text(text: &str, params: &ChunkParams) -> Vec<String> {
    split_recursive(text, &SEPARATORS, params)
}

fn split_recursive(text: &str, separators: &[&str], params: &ChunkParams) -> Vec<String> {
    let mut separator = separators.last().copied().unwrap_or("");
    let mut finer: &[&str] = &[];
    for (i, sep) in separators.iter().enumerate() {
        if sep.is_empty() {
            separator = *sep;
            break;
        }
        if text.contains(sep) {
            separator = *sep;
            finer = &separators[i + 1..];
            break;
        }
    }

    let mut out = Vec::new();
    let mut pending: Vec<String> = Vec::new();

    for piece in split_keeping_separator(text, separator) {
        if char_len(&piece) < params.chunk_size {
            pending.push(piece);
            continue;
        }
        if !pending.is_empty() {
            out.extend(merge_pieces(&pending, params));
            pending.clear();
        }
        if finer.is_empty() {
            out.push(piece);
        } else {
            out.extend(split_recursive(&piece, finer, params));
        }
    }

    if !pending.is_empty() {
        out.extend(merge_pieces(&pending, params));
    }

    out
}

/// Split on `separator`, re-attaching it to the start of every piece after
/// the first. Empty pieces are dropped.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut pieces = Vec::new();
    for (i, part) in text.split(separator).enumerate() {
        let piece = if i == 0 {
            part.to_string()
        } else {
            format!("{}{}", separator, part)
        };
        if !piece.is_empty() {
            pieces.push(piece);
        }
    }
    pieces
}

fn merge_pieces(pieces: &[String], params: &ChunkParams) -> Vec<String> {
    let mut docs = Vec::new();
    let mut window: VecDeque<&str> = VecDeque::new();
    let mut total = 0usize;

    for piece in pieces {
        let len = char_len(piece);
        if total + len > params.chunk_size && !window.is_empty() {
            if let Some(doc) = join_window(&window) {
                docs.push(doc);
            }
            while total > params.chunk_overlap || (total + len > params.chunk_size && total > 0) {
                let Some(first) = window.pop_front() else {
                    break;
                };
                total -= char_len(first);
            }
        }
        window.push_back(piece);
        total += len;
    }

    if let Some(doc) = join_window(&window) {
        docs.push(doc);
    }

    docs
}

fn join_window(window: &VecDeque<&str>) -> Option<String> {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Find the byte offset of each piece within `text`.
///
/// Each search starts where the previous piece's overlap could begin, so
/// repeated phrases resolve to the occurrence in document order.
fn locate_pieces(text: &str, pieces: Vec<String>, params: &ChunkParams) -> Vec<(usize, String)> {
    let mut located = Vec::with_capacity(pieces.len());
    let mut from = 0usize;

    for piece in pieces {
        let begin = snap_to_char_boundary(text, from);
        let start = text[begin..]
            .find(piece.as_str())
            .map(|pos| pos + begin)
            .or_else(|| text.find(piece.as_str()))
            .unwrap_or(begin);
        from = start + piece.len() - tail_bytes(&piece, params.chunk_overlap);
        located.push((start, piece));
    }

    located
}

/// Byte length of the last `chars` characters of `s`.
fn tail_bytes(s: &str, chars: usize) -> usize {
    if chars == 0 {
        return 0;
    }
    s.char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(i, _)| s.len() - i)
        .unwrap_or(s.len())
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn make_chunk(
    document_id: &str,
    page_index: usize,
    sequence_index: usize,
    start: usize,
    text: String,
) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: format!("{}:{}", document_id, sequence_index),
        document_id: document_id.to_string(),
        text,
        page_index,
        sequence_index,
        start,
        hash,
    }
}
