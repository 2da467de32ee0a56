//! Renders retrieved chunks into a labeled context block.

use crate::models::Chunk;

/// Label prefix for each source in the rendered context.
pub const SOURCE_LABEL: &str = "[Source ";

/// Format chunks as `[Source N]` blocks in input order.
pub fn format_context(chunks: &[Chunk]) -> String {
    format_sources(chunks.iter().map(|c| c.text.as_str()))
}

/// Format raw source texts as `[Source N]` blocks, N starting at 1.
///
/// ```rust
/// use pdfqa_core::context::format_sources;
///
/// let block = format_sources(["alpha", "beta"]);
/// assert_eq!(block, "[Source 1]\nalpha\n\n[Source 2]\nbeta\n");
/// ```
pub fn format_sources<'a>(sources: impl IntoIterator<Item = &'a str>) -> String {
    sources
        .into_iter()
        .enumerate()
        .map(|(i, text)| format!("{}{}]\n{}\n", SOURCE_LABEL, i + 1, text))
        .collect::<Vec<_>>()
        .join("\n")
}
