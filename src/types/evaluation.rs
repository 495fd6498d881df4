//! Forensic evaluation verdicts
//!
//! The grader model is asked for a fixed JSON object. Nothing at the protocol
//! level enforces that, so [`Evaluation`] also carries the two degraded
//! shapes: unparseable output kept verbatim, and a failed call.

use serde::{Deserialize, Deserializer, Serialize};

/// Marker the grader uses for a claim with no supporting context sentence
pub const NOT_FOUND_MARKER: &str = "❌ Not found";

/// The marker without its glyph, as some graders emit it
const NOT_FOUND_TEXT: &str = "not found";

/// Placeholder raw text when no evaluation was produced
pub const NO_EVALUATION: &str = "No evaluation available";

/// One claim from the answer paired with its verbatim context sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMatch {
    pub claim: String,
    #[serde(rename = "match")]
    pub matched: String,
}

impl ContextMatch {
    /// True when the grader found no supporting sentence for this claim.
    ///
    /// Only an empty match or the bare marker counts; a verbatim context line
    /// that merely contains the words "not found" is a real match.
    pub fn is_unsupported(&self) -> bool {
        let matched = self.matched.trim();
        matched.is_empty()
            || matched.contains(NOT_FOUND_MARKER)
            || matched.trim_start_matches('❌').trim().eq_ignore_ascii_case(NOT_FOUND_TEXT)
    }
}

/// Structured verdict emitted by the grader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub user_question: String,
    pub bot_understood_question: String,
    pub response_type: String,
    pub response_effectiveness: String,
    pub factually_correct: String,
    pub engagement_proactiveness: String,
    #[serde(deserialize_with = "string_or_number")]
    pub confidence_in_evaluation: String,
    pub context_utilization: String,
    #[serde(default)]
    pub context_matches: Vec<ContextMatch>,
    #[serde(default)]
    pub issues_identified: Vec<String>,
    #[serde(default)]
    pub suggested_improvements: Vec<String>,
}

impl EvaluationReport {
    pub fn is_factually_correct(&self) -> bool {
        self.factually_correct.trim().eq_ignore_ascii_case("yes")
    }

    pub fn unsupported_claims(&self) -> usize {
        self.context_matches
            .iter()
            .filter(|m| m.is_unsupported())
            .count()
    }

    /// All-or-nothing rule: a single unsupported claim makes the answer incorrect.
    /// Returns false when the grader's own verdict contradicts its claim list.
    pub fn is_consistent(&self) -> bool {
        !(self.is_factually_correct() && self.unsupported_claims() > 0)
    }
}

/// Outcome of the evaluation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evaluation {
    /// Well-formed verdict
    Report(EvaluationReport),
    /// Model output that did not parse, surfaced for manual inspection
    Unparsed { raw_text: String, error: String },
    /// The grader call itself failed
    Failed { error: String },
    /// No evaluation was run
    Unavailable { raw_text: String },
}

impl Evaluation {
    pub fn unavailable() -> Self {
        Evaluation::Unavailable {
            raw_text: NO_EVALUATION.to_string(),
        }
    }

    pub fn report(&self) -> Option<&EvaluationReport> {
        match self {
            Evaluation::Report(report) => Some(report),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Evaluation::Unparsed { error, .. } | Evaluation::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Evaluation::Report(_) => "report",
            Evaluation::Unparsed { .. } => "unparsed",
            Evaluation::Failed { .. } => "failed",
            Evaluation::Unavailable { .. } => "unavailable",
        }
    }
}

impl Default for Evaluation {
    fn default() -> Self {
        Self::unavailable()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}
