//! Response normalization for structured model output.
//!
//! Models are not guaranteed to emit syntactically valid JSON. The
//! normalizer strips common formatting artifacts (markdown code fences)
//! and decodes the rest; every input maps to either a decoded structure
//! or a well-formed error value. Nothing here can fail past this boundary.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rewording {
    pub original: String,
    pub suggested: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockAction {
    MoveUp,
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockOrderSuggestion {
    pub block: String,
    pub action: BlockAction,
}

/// The structured improvement report the model is asked to produce.
/// Fields default to empty so a partial response still decodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub suggested_rewordings: Vec<Rewording>,
    #[serde(default)]
    pub block_order_suggestions: Vec<BlockOrderSuggestion>,
}

/// Outcome of normalizing raw model text: either the decoded structure or
/// an explicit parse-error value carrying the cleaned raw text. Never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisOutcome {
    Parsed(ResumeAnalysis),
    Unparsed { error: String, raw: String },
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Total function from raw model text to an [`AnalysisOutcome`].
pub fn normalize_analysis(text: &str) -> AnalysisOutcome {
    let cleaned = strip_code_fences(text);

    match serde_json::from_str::<ResumeAnalysis>(cleaned) {
        Ok(analysis) => AnalysisOutcome::Parsed(analysis),
        Err(e) => {
            tracing::debug!("Model output failed JSON decoding: {e}");
            AnalysisOutcome::Unparsed {
                error: "Failed to parse JSON".to_string(),
                raw: cleaned.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_code_fences_unterminated() {
        let input = "```json\n{\"key\": \"value\"}";
        assert_eq!(strip_code_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_normalize_fenced_json() {
        let input = "```json\n{\"missing_skills\": [\"rust\"]}\n```";
        let outcome = normalize_analysis(input);
        assert_eq!(
            outcome,
            AnalysisOutcome::Parsed(ResumeAnalysis {
                missing_skills: vec!["rust".to_string()],
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_normalize_full_schema() {
        let input = r#"{
            "missing_skills": ["docker"],
            "suggested_rewordings": [{"original": "did stuff", "suggested": "delivered results"}],
            "block_order_suggestions": [{"block": "skills", "action": "move_up"}]
        }"#;
        match normalize_analysis(input) {
            AnalysisOutcome::Parsed(analysis) => {
                assert_eq!(analysis.missing_skills, vec!["docker"]);
                assert_eq!(analysis.suggested_rewordings[0].suggested, "delivered results");
                assert_eq!(
                    analysis.block_order_suggestions[0].action,
                    BlockAction::MoveUp
                );
            }
            other => panic!("expected parsed outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_non_json_yields_error_value() {
        let outcome = normalize_analysis("not json at all");
        assert_eq!(
            outcome,
            AnalysisOutcome::Unparsed {
                error: "Failed to parse JSON".to_string(),
                raw: "not json at all".to_string(),
            }
        );
    }

    #[test]
    fn test_normalize_unknown_action_yields_error_value() {
        let input = r#"{"block_order_suggestions": [{"block": "skills", "action": "shuffle"}]}"#;
        match normalize_analysis(input) {
            AnalysisOutcome::Unparsed { error, raw } => {
                assert_eq!(error, "Failed to parse JSON");
                assert_eq!(raw, input);
            }
            other => panic!("expected unparsed outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_normalize_round_trip_is_stable() {
        let input = r#"{"missing_skills": ["kubernetes"], "suggested_rewordings": [], "block_order_suggestions": []}"#;
        let first = normalize_analysis(input);
        let AnalysisOutcome::Parsed(ref analysis) = first else {
            panic!("expected parsed outcome");
        };
        let reserialized = serde_json::to_string(analysis).unwrap();
        assert_eq!(normalize_analysis(&reserialized), first);
    }
}
