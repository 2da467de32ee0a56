//! Response modes and their formatting instructions.
//!
//! | Mode | Style |
//! |------|-------|
//! | `default` | Clear, balanced explanation |
//! | `exam` | Structured answer with key points |
//! | `summary` | Short bullet points |
//! | `explain_like_5` | Very simple language |
//! | `creative` | Narrative framing |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "exam")]
    Exam,
    #[serde(rename = "summary")]
    Summary,
    #[serde(rename = "explain_like_5")]
    ExplainLike5,
    #[serde(rename = "creative")]
    Creative,
}

impl Mode {
    /// Every mode, in listing order.
    pub const ALL: [Mode; 5] = [
        Mode::Default,
        Mode::Exam,
        Mode::Summary,
        Mode::ExplainLike5,
        Mode::Creative,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Default => "default",
            Mode::Exam => "exam",
            Mode::Summary => "summary",
            Mode::ExplainLike5 => "explain_like_5",
            Mode::Creative => "creative",
        }
    }

    /// Parse a mode identifier, falling back to [`Mode::Default`] for
    /// anything unrecognised.
    pub fn parse_lenient(s: &str) -> Mode {
        s.parse().unwrap_or_default()
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            Mode::Default => {
                "Respond with:\n\
                 - Clear explanation\n\
                 - Simple language\n\
                 - Medium length\n\
                 - Balanced detail"
            }
            Mode::Exam => {
                "Respond in formal academic format with:\n\
                 1. Definition\n\
                 2. Detailed Explanation\n\
                 3. Key Points (bullet points)\n\
                 4. Conclusion\n\
                 Use formal academic tone and structured format."
            }
            Mode::Summary => {
                "Respond with:\n\
                 - Very concise answer\n\
                 - Bullet points only\n\
                 - Key facts only\n\
                 - No elaboration"
            }
            Mode::ExplainLike5 => {
                "Respond with:\n\
                 - Extremely simple language\n\
                 - Use analogies and examples\n\
                 - No technical jargon\n\
                 - Explain as if talking to a 5-year-old child"
            }
            Mode::Creative => {
                "Respond with:\n\
                 - Story-based explanation\n\
                 - Use metaphors and creative narratives\n\
                 - Make it engaging and memorable\n\
                 - Still educational and accurate"
            }
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = QaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| QaError::InvalidMode {
                mode: s.to_string(),
                available: available_modes().join(", "),
            })
    }
}

/// Instruction text for a mode identifier. Unknown identifiers get the
/// `default` instruction.
pub fn instruction_for(mode: &str) -> &'static str {
    Mode::parse_lenient(mode).instruction()
}

/// Valid mode identifiers, in listing order.
pub fn available_modes() -> Vec<&'static str> {
    Mode::ALL.iter().map(Mode::as_str).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_modes_in_order() {
        assert_eq!(
            available_modes(),
            vec!["default", "exam", "summary", "explain_like_5", "creative"]
        );
    }

    #[test]
    fn unknown_mode_uses_default_instruction() {
        for unknown in ["", "poetry", "DEFAULT", "exam "] {
            assert_eq!(instruction_for(unknown), instruction_for("default"));
        }
        assert_ne!(instruction_for("exam"), instruction_for("default"));
    }

    #[test]
    fn from_str_round_trips_and_rejects_unknown() {
        for m in Mode::ALL {
            assert_eq!(m.as_str().parse::<Mode>().unwrap(), m);
        }
        let err = "haiku".parse::<Mode>().unwrap_err();
        assert!(matches!(err, QaError::InvalidMode { .. }));
        assert!(err.to_string().contains("explain_like_5"));
    }

    #[test]
    fn serde_uses_mode_identifiers() {
        let json = serde_json::to_string(&Mode::ExplainLike5).unwrap();
        assert_eq!(json, "\"explain_like_5\"");
        let back: Mode = serde_json::from_str("\"creative\"").unwrap();
        assert_eq!(back, Mode::Creative);
    }
}
