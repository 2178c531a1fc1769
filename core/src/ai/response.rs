use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::model::Evaluation;

static CODE_FENCE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\s*```\s*$").expect("valid code fence regex")
});

/// Removes a surrounding markdown code fence (```` ```json ... ``` ````), if any.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE_REGEX.captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Parses model output as JSON after removing an optional code fence.
pub fn parse_json_response<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_code_fence(text))
}

/// Structured-output schema for analysis calls: `{analysis: [{language, evaluation, feedback, suggestion?}]}`.
pub fn analysis_response_schema() -> Value {
    let evaluations: Vec<&str> = Evaluation::ALL.iter().map(Evaluation::label).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "analysis": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "language": { "type": "STRING" },
                        "evaluation": { "type": "STRING", "enum": evaluations },
                        "feedback": { "type": "STRING" },
                        "suggestion": { "type": "STRING" }
                    },
                    "required": ["language", "evaluation", "feedback"]
                }
            }
        },
        "required": ["analysis"]
    })
}
