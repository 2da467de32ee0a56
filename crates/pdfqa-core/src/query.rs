//! Query builder.
//!
//! [`QueryParts`] is the typed hand-off between retrieval and the answer
//! synthesizer. Its rendered form ([`QueryParts::render`]) is the full
//! prompt text, kept for logging and for callers that only have a prompt
//! string; [`crate::synth::synthesize_prompt`] can recover the parts from it
//! using the markers below.

use serde::Serialize;

use crate::context::format_sources;
use crate::models::Chunk;
use crate::modes::Mode;

pub const CONTEXT_MARKER: &str = "Context:";
pub const QUESTION_MARKER: &str = "Question:";
pub const MODE_MARKER: &str = "Response Mode Instructions:";

/// Phrase the preamble asks for when the answer is not in the context.
pub const OUT_OF_CONTEXT_PHRASE: &str = "I could not find this in the uploaded material.";

pub const SYSTEM_PREAMBLE: &str = "You are an Educational Content Assistant.

Your job is to answer questions ONLY using the provided study material context.
If the answer is not present in the context, say:
\"I could not find this in the uploaded material.\"

Never invent information outside the provided context.
Always follow the selected response mode strictly.
";

const CLOSING_LINE: &str =
    "Answer using only the context provided above. Follow the response mode instructions strictly.";

/// Everything the synthesizer needs for one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParts {
    pub system_preamble: &'static str,
    /// Retrieved source texts, trimmed, best match first.
    pub context_sources: Vec<String>,
    pub question: String,
    pub mode: Mode,
    pub mode_instruction: &'static str,
}

impl QueryParts {
    pub fn new(sources: Vec<String>, question: impl Into<String>, mode: Mode) -> Self {
        let context_sources = sources
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Self {
            system_preamble: SYSTEM_PREAMBLE,
            context_sources,
            question: question.into(),
            mode,
            mode_instruction: mode.instruction(),
        }
    }

    pub fn from_chunks(chunks: &[Chunk], question: impl Into<String>, mode: Mode) -> Self {
        Self::new(
            chunks.iter().map(|c| c.text.clone()).collect(),
            question,
            mode,
        )
    }

    /// The `[Source N]` context block for these sources.
    pub fn context(&self) -> String {
        format_sources(self.context_sources.iter().map(String::as_str))
    }

    /// Render the full prompt text.
    pub fn render(&self) -> String {
        render_prompt(&self.context(), &self.question, self.mode_instruction)
    }
}

/// Compose preamble, context, question, and mode instruction into one
/// prompt string. Unknown modes use the `default` instruction.
pub fn build_query(context: &str, question: &str, mode: &str) -> String {
    render_prompt(context, question, crate::modes::instruction_for(mode))
}

fn render_prompt(context: &str, question: &str, mode_instruction: &str) -> String {
    format!(
        "{}\n\n{}\n{}\n\n{}\n{}\n\n{}\n{}\n\n{}\n",
        SYSTEM_PREAMBLE,
        CONTEXT_MARKER,
        context,
        QUESTION_MARKER,
        question,
        MODE_MARKER,
        mode_instruction,
        CLOSING_LINE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_appear_in_fixed_order() {
        let prompt = build_query("[Source 1]\nfacts\n", "What happened?", "summary");
        let preamble = prompt.find("Educational Content Assistant").unwrap();
        let context = prompt.find(CONTEXT_MARKER).unwrap();
        let question = prompt.find(QUESTION_MARKER).unwrap();
        let mode = prompt.find(MODE_MARKER).unwrap();
        assert!(preamble < context && context < question && question < mode);
        assert!(prompt.contains(OUT_OF_CONTEXT_PHRASE));
        assert!(prompt.contains(Mode::Summary.instruction()));
        assert!(prompt.contains("\nWhat happened?\n"));
    }

    #[test]
    fn unknown_mode_renders_default_instruction() {
        let a = build_query("ctx", "q", "nonsense");
        let b = build_query("ctx", "q", "default");
        assert_eq!(a, b);
    }

    #[test]
    fn parts_trim_and_drop_blank_sources() {
        let parts = QueryParts::new(
            vec!["  one \n".to_string(), "   ".to_string(), "two".to_string()],
            "q",
            Mode::Exam,
        );
        assert_eq!(parts.context_sources, vec!["one", "two"]);
        assert_eq!(parts.mode_instruction, Mode::Exam.instruction());
        assert_eq!(parts.render(), build_query(&parts.context(), "q", "exam"));
    }
}
