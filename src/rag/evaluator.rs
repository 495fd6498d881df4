//! Forensic self-evaluation
//!
//! A second model call grades the answer claim by claim against the context.
//! The grader is asked for one JSON object; when it returns anything else the
//! raw text is kept next to the parse error instead of being dropped.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::errors::RagError;
use crate::rag::generator::preview;
use crate::services::{ChatRequest, ChatService};
use crate::types::{Evaluation, EvaluationReport};

/// Evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Run the grader after every answer
    pub enabled: bool,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            temperature: 0.1,
            max_tokens: 800,
        }
    }
}

/// Grader instructions and output schema
pub const FORENSIC_SYSTEM_PROMPT: &str = r#"You are a forensic evaluator of model answers. Decide whether the answer is factually supported by the provided context.

Be STRICT. The answer may only contain facts that are clearly and explicitly stated in the context.

For every factual claim in the answer, find the exact supporting sentence in the context. If no such sentence exists, the claim is unsupported.

If even ONE claim is unsupported, the answer is factually incorrect.

Instructions:
1. For each key fact or claim in the answer, give:
   - the claim
   - the matching sentence from the context, verbatim, or "❌ Not found"
2. Rate the overall answer:
   - Did the model understand the user's intent?
   - Did it cite the right sources?
   - Did it miss anything important?
3. Be ruthless but fair. Do not assume or imagine context.

Return ONLY the following JSON object. No Markdown, no code fences, no text before or after it:

{
  "user_question": "<...>",
  "bot_understood_question": "<Yes/No>",
  "response_type": "<Task-based | Informational>",
  "response_effectiveness": "<Fully | Mostly | Partially | Not at all>",
  "factually_correct": "<Yes/No>",
  "engagement_proactiveness": "<Excellent | Good | Minimal | None>",
  "confidence_in_evaluation": "<1/5-5/5>",
  "context_utilization": "<Fully | Partially | Not at all>",
  "context_matches": [
    {
      "claim": "<quoted part of the answer>",
      "match": "<verbatim matching line from the context OR ❌ Not found>"
    }
  ],
  "issues_identified": [
    "<issue>"
  ],
  "suggested_improvements": [
    "<improvement>"
  ]
}"#;

/// User prompt for the grader
pub fn evaluation_user_prompt(query: &str, context: &str, answer: &str) -> String {
    format!(
        "Context:\n{}\n\nUser Question: {}\n\nModel Answer: {}",
        context, query, answer
    )
}

/// Parse grader output. Never fails: malformed output becomes [`Evaluation::Unparsed`].
pub fn parse_evaluation(raw: &str) -> Evaluation {
    let raw = raw.trim();
    match serde_json::from_str::<EvaluationReport>(strip_code_fence(raw)) {
        Ok(report) => Evaluation::Report(report),
        Err(e) => {
            let error = RagError::EvaluationParse(e.to_string());
            error!(error = %error, "Failed to parse evaluation JSON");
            debug!(raw_text = %raw, "raw evaluation text");
            Evaluation::Unparsed {
                raw_text: raw.to_string(),
                error: error.to_string(),
            }
        }
    }
}

/// Strip one surrounding ``` or ```json fence, if present. The tag is
/// matched case-insensitively.
fn strip_code_fence(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let Some(inner) = inner.strip_suffix("```") else {
        return text;
    };
    let inner = match inner.get(..4) {
        Some(tag) if tag.eq_ignore_ascii_case("json") => &inner[4..],
        _ => inner,
    };
    inner.trim()
}

/// Forensic grader over a [`ChatService`]
pub struct Evaluator {
    chat: Arc<dyn ChatService>,
    model: String,
    config: EvaluationConfig,
}

impl Evaluator {
    pub fn new(chat: Arc<dyn ChatService>, model: impl Into<String>) -> Self {
        Self::with_config(chat, model, EvaluationConfig::default())
    }

    pub fn with_config(
        chat: Arc<dyn ChatService>,
        model: impl Into<String>,
        config: EvaluationConfig,
    ) -> Self {
        Self {
            chat,
            model: model.into(),
            config,
        }
    }

    pub async fn evaluate(&self, query: &str, context: &str, answer: &str) -> Evaluation {
        if !self.config.enabled {
            debug!("evaluation disabled");
            return Evaluation::unavailable();
        }

        let request = ChatRequest {
            system_prompt: FORENSIC_SYSTEM_PROMPT.to_string(),
            user_prompt: evaluation_user_prompt(query, context, answer),
            model: self.model.clone(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let raw = match self.chat.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(provider = self.chat.provider(), error = %e, "Error during evaluation request");
                return Evaluation::Failed {
                    error: format!("Evaluation failed: {}", e),
                };
            }
        };
        debug!(preview = %preview(raw.trim(), 200), "evaluation text");

        let evaluation = parse_evaluation(&raw);
        if let Evaluation::Report(report) = &evaluation {
            info!(
                factually_correct = %report.factually_correct,
                claims = report.context_matches.len(),
                unsupported = report.unsupported_claims(),
                "evaluation parsed"
            );
            if !report.is_consistent() {
                warn!(
                    unsupported = report.unsupported_claims(),
                    "grader marked answer correct despite unsupported claims"
                );
            }
        }
        evaluation
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const VALID: &str = r#"{
        "user_question": "Is 2.8 supported?",
        "bot_understood_question": "Yes",
        "response_type": "Informational",
        "response_effectiveness": "Mostly",
        "factually_correct": "No",
        "engagement_proactiveness": "Minimal",
        "confidence_in_evaluation": "4/5",
        "context_utilization": "Partially",
        "context_matches": [
            {"claim": "2.8 is supported", "match": "❌ Not found"}
        ],
        "issues_identified": ["Unsupported claim"],
        "suggested_improvements": ["Quote the support table"]
    }"#;

    struct ScriptedChat {
        reply: std::result::Result<String, String>,
        last: Mutex<Option<ChatRequest>>,
    }

    #[async_trait]
    impl ChatService for ScriptedChat {
        async fn complete(&self, request: &ChatRequest) -> Result<String> {
            *self.last.lock().unwrap() = Some(request.clone());
            self.reply
                .clone()
                .map_err(|message| RagError::chat("scripted", message))
        }

        fn provider(&self) -> &str {
            "scripted"
        }
    }

    fn evaluator(reply: std::result::Result<&str, &str>) -> (Evaluator, Arc<ScriptedChat>) {
        let chat = Arc::new(ScriptedChat {
            reply: reply.map(str::to_string).map_err(str::to_string),
            last: Mutex::new(None),
        });
        (Evaluator::new(chat.clone(), "deployment02"), chat)
    }

    #[test]
    fn test_parse_valid_report() {
        let evaluation = parse_evaluation(VALID);
        let report = evaluation.report().expect("report");
        assert!(!report.is_factually_correct());
        assert_eq!(report.unsupported_claims(), 1);
        assert!(report.is_consistent());
    }

    #[test]
    fn test_parse_fenced_report() {
        let fenced = format!("```json\n{}\n```", VALID);
        assert!(parse_evaluation(&fenced).report().is_some());
        let bare_fence = format!("```\n{}\n```", VALID);
        assert!(parse_evaluation(&bare_fence).report().is_some());
    }

    #[test]
    fn test_parse_uppercase_fence_tag() {
        let fenced = format!("```JSON\n{}\n```", VALID);
        assert_eq!(parse_evaluation(&fenced).kind(), "report");
        let mixed = format!("```Json\n{}\n```", VALID);
        assert_eq!(parse_evaluation(&mixed).kind(), "report");
    }

    #[test]
    fn test_parse_prose_falls_back_to_raw_text() {
        let raw = "The answer looks mostly right to me.";
        match parse_evaluation(raw) {
            Evaluation::Unparsed { raw_text, error } => {
                assert_eq!(raw_text, raw);
                assert!(error.starts_with("Failed to parse evaluation JSON"));
            }
            other => panic!("expected unparsed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_wrong_schema_falls_back() {
        let evaluation = parse_evaluation(r#"{"verdict": "fine"}"#);
        assert_eq!(evaluation.kind(), "unparsed");
    }

    #[test]
    fn test_parse_prose_around_json_falls_back() {
        let raw = format!("Here is my evaluation:\n{}", VALID);
        assert_eq!(parse_evaluation(&raw).kind(), "unparsed");
    }

    #[test]
    fn test_parse_truncated_json_falls_back() {
        let cut = VALID.find("\"context_matches\"").unwrap();
        let truncated = &VALID[..cut];
        match parse_evaluation(truncated) {
            Evaluation::Unparsed { raw_text, .. } => assert_eq!(raw_text, truncated.trim()),
            other => panic!("expected unparsed, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_empty_output_falls_back() {
        assert_eq!(parse_evaluation("   ").kind(), "unparsed");
    }

    #[test]
    fn test_strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("{}"), "{}");
        assert_eq!(strip_code_fence("```unterminated"), "```unterminated");
    }

    #[tokio::test]
    async fn test_evaluate_request_shape() {
        let (evaluator, chat) = evaluator(Ok(VALID));
        let evaluation = evaluator
            .evaluate("Is 2.8 supported?", "Source_1: table", "Yes [Source_1]")
            .await;
        assert_eq!(evaluation.kind(), "report");

        let request = chat.last.lock().unwrap().clone().unwrap();
        assert_eq!(request.temperature, 0.1);
        assert_eq!(request.max_tokens, 800);
        assert!(request.system_prompt.contains("forensic"));
        assert_eq!(
            request.user_prompt,
            "Context:\nSource_1: table\n\nUser Question: Is 2.8 supported?\n\nModel Answer: Yes [Source_1]"
        );
    }

    #[tokio::test]
    async fn test_evaluate_call_failure() {
        let (evaluator, _) = evaluator(Err("connection reset"));
        match evaluator.evaluate("q", "c", "a").await {
            Evaluation::Failed { error } => {
                assert!(error.starts_with("Evaluation failed:"));
                assert!(error.contains("connection reset"));
            }
            other => panic!("expected failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_evaluate_disabled_skips_call() {
        let chat = Arc::new(ScriptedChat {
            reply: Ok(VALID.to_string()),
            last: Mutex::new(None),
        });
        let evaluator = Evaluator::with_config(
            chat.clone(),
            "m",
            EvaluationConfig {
                enabled: false,
                ..Default::default()
            },
        );
        assert_eq!(evaluator.evaluate("q", "c", "a").await, Evaluation::unavailable());
        assert!(chat.last.lock().unwrap().is_none());
    }
}
