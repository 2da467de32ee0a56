//! Extractive answer synthesizer.
//!
//! Builds the answer text from the retrieved sources themselves; nothing is
//! generated. Given the sources, the question, and a [`Mode`]:
//!
//! 1. Classify the question (why / who / what / where / when / how).
//! 2. Extract keywords: lower-cased whitespace tokens, edge punctuation
//!    stripped, stopwords and short tokens dropped.
//! 3. Score each source: 2 per keyword found in it, plus +3 for a "why"
//!    question whose source contains a cause word, or +2 for a "who"
//!    question whose source mentions a person.
//! 4. Keep sources scoring above zero (or all of them with score 1 if none
//!    do), stable-sort by score, and join the top two.
//! 5. Collapse whitespace, split on `.`, and render the sentences in the
//!    mode's template.
//!
//! The sentence splitter is deliberately naive: every `.` ends a sentence,
//! including those in abbreviations and decimals.

use serde::Serialize;

use crate::context::SOURCE_LABEL;
use crate::modes::Mode;
use crate::query::{QueryParts, CONTEXT_MARKER, QUESTION_MARKER};

/// Returned when no sources could be recovered.
pub const NOT_FOUND_ANSWER: &str = "I could not find this information in the uploaded material.";

/// Number of top-ranked sources combined into the answer.
const TOP_SOURCES: usize = 2;

/// Prefix that ends the question section of a rendered prompt.
const MODE_SECTION_PREFIX: &str = "Response Mode";

const STOPWORDS: [&str; 24] = [
    "is", "the", "a", "an", "was", "were", "are", "be", "been", "being", "have", "has", "had",
    "do", "does", "did", "will", "would", "should", "could", "may", "might", "must", "can",
];

const WHY_INDICATORS: [&str; 4] = ["because", "reason", "since", "as"];
const WHO_INDICATORS: [&str; 4] = ["he", "she", "person", "character"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Why,
    Who,
    What,
    Where,
    When,
    How,
}

/// Keyword families, checked in priority order.
const QUESTION_FAMILIES: [(QuestionType, &[&str]); 6] = [
    (QuestionType::Why, &["why", "reason", "because"]),
    (QuestionType::Who, &["who", "person", "character"]),
    (QuestionType::What, &["what", "describe"]),
    (QuestionType::Where, &["where", "place", "location"]),
    (QuestionType::When, &["when", "time"]),
    (QuestionType::How, &["how"]),
];

/// A source with its relevance score for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredSource<'a> {
    pub score: u32,
    pub text: &'a str,
}

/// Classify a question by the first keyword family it mentions.
///
/// Matching is by substring over the lower-cased question, so "somehow"
/// counts as a "how" question.
pub fn classify_question(question: &str) -> Option<QuestionType> {
    let lower = question.to_lowercase();
    QUESTION_FAMILIES
        .iter()
        .find(|(_, words)| words.iter().any(|w| lower.contains(w)))
        .map(|(kind, _)| *kind)
}

/// Lower-cased question words worth matching against sources.
///
/// Tokens are split on whitespace and stripped of leading/trailing
/// `? . , !`. A token is dropped if it is a stopword or if it was at most
/// two characters long before stripping. Duplicates are kept.
pub fn extract_keywords(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split_whitespace()
        .filter(|raw| raw.chars().count() > 2)
        .map(|raw| raw.trim_matches(|c| matches!(c, '?' | '.' | ',' | '!')))
        .filter(|word| !STOPWORDS.contains(word))
        .map(str::to_string)
        .collect()
}

/// Score one source against the question's keywords and type.
pub fn score_source(source: &str, keywords: &[String], kind: Option<QuestionType>) -> u32 {
    let lower = source.to_lowercase();
    let mut score = 2 * keywords
        .iter()
        .filter(|k| lower.contains(k.as_str()))
        .count() as u32;

    match kind {
        Some(QuestionType::Why) if WHY_INDICATORS.iter().any(|w| lower.contains(w)) => score += 3,
        Some(QuestionType::Who) if WHO_INDICATORS.iter().any(|w| lower.contains(w)) => score += 2,
        _ => {}
    }

    score
}

/// Rank sources for a question, best first.
///
/// Zero-score sources are dropped; if every source scores zero, all are
/// kept with score 1 in their original order. Ties keep input order.
pub fn rank_sources<'a, S: AsRef<str>>(sources: &'a [S], question: &str) -> Vec<ScoredSource<'a>> {
    let keywords = extract_keywords(question);
    let kind = classify_question(question);

    let mut ranked: Vec<ScoredSource<'a>> = sources
        .iter()
        .map(|s| ScoredSource {
            score: score_source(s.as_ref(), &keywords, kind),
            text: s.as_ref(),
        })
        .filter(|s| s.score > 0)
        .collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    if ranked.is_empty() {
        ranked = sources
            .iter()
            .map(|s| ScoredSource {
                score: 1,
                text: s.as_ref(),
            })
            .collect();
    }

    tracing::debug!(?kind, ?keywords, scores = ?ranked.iter().map(|s| s.score).collect::<Vec<_>>(), "ranked sources");
    ranked
}

/// Split on every `.`, trimming pieces and dropping empty ones.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Compose the answer for a typed query.
pub fn synthesize(parts: &QueryParts) -> String {
    compose(&parts.context_sources, &parts.question, parts.mode)
}

/// Compose the answer from a rendered prompt string.
///
/// The question and sources are recovered from the prompt's `Question:`,
/// `Context:`, and `[Source N]` markers. Unknown modes render as `default`.
pub fn synthesize_prompt(prompt: &str, mode: &str) -> String {
    let question = extract_question(prompt);
    let sources = extract_sources(prompt);
    compose(&sources, &question, Mode::parse_lenient(mode))
}

/// Text between the first `Question:` marker and the mode section.
pub fn extract_question(prompt: &str) -> String {
    prompt
        .split(QUESTION_MARKER)
        .nth(1)
        .and_then(|rest| rest.split(MODE_SECTION_PREFIX).next())
        .map(|q| q.trim().to_string())
        .unwrap_or_default()
}

/// Source texts listed between the `Context:` and `Question:` markers.
pub fn extract_sources(prompt: &str) -> Vec<String> {
    let Some(section) = prompt.split(CONTEXT_MARKER).nth(1) else {
        return Vec::new();
    };
    let section = section.split(QUESTION_MARKER).next().unwrap_or_default();
    split_on_source_labels(section)
        .into_iter()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split on `[Source N]` labels (N one or more ASCII digits).
fn split_on_source_labels(section: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut piece_start = 0;
    let mut search_from = 0;

    while let Some(pos) = section[search_from..].find(SOURCE_LABEL) {
        let label_start = search_from + pos;
        let digits_start = label_start + SOURCE_LABEL.len();
        let digits = section[digits_start..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let close = digits_start + digits;
        if digits > 0 && section[close..].starts_with(']') {
            pieces.push(&section[piece_start..label_start]);
            piece_start = close + 1;
            search_from = close + 1;
        } else {
            search_from = digits_start;
        }
    }

    pieces.push(&section[piece_start..]);
    pieces
}

fn compose<S: AsRef<str>>(sources: &[S], question: &str, mode: Mode) -> String {
    if sources.is_empty() {
        return NOT_FOUND_ANSWER.to_string();
    }

    let ranked = rank_sources(sources, question);
    let combined = ranked
        .iter()
        .take(TOP_SOURCES)
        .map(|s| s.text)
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let sentences = split_sentences(&combined);

    match mode {
        Mode::Summary => render_summary(&sentences, &combined),
        Mode::Exam => render_exam(&sentences),
        Mode::ExplainLike5 => render_explain_like_5(&sentences, &combined),
        Mode::Creative => render_creative(&sentences, &combined),
        Mode::Default => render_default(&sentences, &combined),
    }
}

fn render_summary(sentences: &[&str], combined: &str) -> String {
    let bullets: Vec<String> = sentences
        .iter()
        .take(3)
        .map(|s| {
            if s.chars().count() > 100 {
                format!("• {}...", truncate_chars(s, 97))
            } else {
                format!("• {}", s)
            }
        })
        .collect();
    if bullets.is_empty() {
        truncate_chars(combined, 200).to_string()
    } else {
        bullets.join("\n")
    }
}

fn render_exam(sentences: &[&str]) -> String {
    let mut out = String::from("**Answer:**\n");
    if let Some(first) = sentences.first() {
        out.push_str(first);
        out.push('.');
    }
    out.push_str("\n\n**Key Points:**");
    for (i, point) in sentences.iter().skip(1).take(2).enumerate() {
        out.push_str(&format!("\n{}. {}.", i + 1, point));
    }
    if let Some(extra) = sentences.get(3) {
        out.push_str(&format!("\n\n**Additional Context:**\n{}.", extra));
    }
    out
}

fn render_explain_like_5(sentences: &[&str], combined: &str) -> String {
    let Some(first) = sentences.first() else {
        return truncate_chars(combined, 300).to_string();
    };
    let mut out = format!("Okay, here's the simple answer:\n\n{}.", first);
    if let Some(second) = sentences.get(1) {
        out.push_str(&format!("\n\nIn other words: {}.", second));
    }
    out
}

fn render_creative(sentences: &[&str], combined: &str) -> String {
    let Some(first) = sentences.first() else {
        return truncate_chars(combined, 400).to_string();
    };
    let mut out = format!("Here's an interesting way to think about it:\n\n{}.", first);
    if let Some(second) = sentences.get(1) {
        out.push_str(&format!(" {}.", second));
    }
    if let Some(third) = sentences.get(2) {
        out.push_str(&format!(" This shows us that {}.", third));
    }
    out
}

fn render_default(sentences: &[&str], combined: &str) -> String {
    if sentences.is_empty() {
        return truncate_chars(combined, 400).to_string();
    }
    let take = if sentences.len() >= 3 { 4 } else { sentences.len() };
    let body = sentences
        .iter()
        .take(take)
        .copied()
        .collect::<Vec<_>>()
        .join(". ");
    format!("{}.", body)
}

/// UTF-8 safe truncation to `max` characters.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
