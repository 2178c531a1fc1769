use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::path;

/// Key path -> free-text note describing where the string appears in the UI.
pub type ContextMap = BTreeMap<String, String>;

/// Source term -> language code -> mandated translation.
pub type Glossary = BTreeMap<String, BTreeMap<String, String>>;

/// Key path -> language code -> last user-approved value.
pub type TranslationHistory = BTreeMap<String, BTreeMap<String, String>>;

/// One uploaded language document.
///
/// `data` is shared and only ever replaced wholesale, so a change can be
/// detected with [`TranslationFile::same_data`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationFile {
    pub name: String,
    pub data: Arc<Value>,
}

impl TranslationFile {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(data),
        }
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        path::get_by_path(&self.data, key)
    }

    /// Leaf at `key` rendered as text, `None` when the key is undefined here.
    pub fn text(&self, key: &str) -> Option<String> {
        self.value(key).map(path::value_text)
    }

    pub fn same_data(&self, other: &TranslationFile) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub reference_keys: Vec<String>,
}

impl TranslationGroup {
    pub fn is_reference(&self, key: &str) -> bool {
        self.reference_keys.iter().any(|candidate| candidate == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|candidate| candidate == key)
    }

    /// Drops duplicates and reference keys that are no longer members.
    pub fn normalize(&mut self) {
        dedupe_in_order(&mut self.keys);
        dedupe_in_order(&mut self.reference_keys);
        let members = &self.keys;
        self.reference_keys.retain(|key| members.contains(key));
    }
}

fn dedupe_in_order(items: &mut Vec<String>) {
    let mut seen: Vec<String> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

/// Verdict the model gives a single translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evaluation {
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
    #[serde(rename = "Incorrect")]
    Incorrect,
}

impl Evaluation {
    pub const ALL: [Evaluation; 3] = [
        Evaluation::Good,
        Evaluation::NeedsImprovement,
        Evaluation::Incorrect,
    ];

    /// Wire literal used by the response schema and the UI.
    pub fn label(&self) -> &'static str {
        match self {
            Evaluation::Good => "Good",
            Evaluation::NeedsImprovement => "Needs Improvement",
            Evaluation::Incorrect => "Incorrect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub language: String,
    pub evaluation: Evaluation,
    #[serde(default)]
    pub feedback: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl AnalysisItem {
    /// Suggestion text worth offering: present, non-blank and not a `Good` verdict.
    pub fn actionable_suggestion(&self) -> Option<&str> {
        if self.evaluation == Evaluation::Good {
            return None;
        }
        self.suggestion
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub analysis: Vec<AnalysisItem>,
}

/// Outcome of analysing one key inside a batch; exactly one side is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAnalysis {
    pub result: Option<Vec<AnalysisItem>>,
    pub error: Option<String>,
}

impl KeyAnalysis {
    pub fn success(items: Vec<AnalysisItem>) -> Self {
        Self {
            result: Some(items),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: None,
            error: Some(message.into()),
        }
    }
}
