//! Review of translations by the language model.
//!
//! Every key is analysed by its own request. Batches fan the requests out
//! concurrently and collect each outcome separately, so one failing key never
//! hides the results of the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::ai::{
    analysis_response_schema, parse_json_response, strip_code_fence, GeminiClient, ModelClient,
    ModelRequest,
};
use crate::config::ReviewerConfig;
use crate::error::{classify_model_error, ReviewError, ReviewResult};
use crate::model::{AnalysisItem, AnalysisResponse, KeyAnalysis, TranslationFile, TranslationGroup};
use crate::prompt::{self, AnalysisPromptInput, GroupReference, LanguageText};
use crate::reference::References;
use crate::session::{AnalysisBatch, Session};

/// A suggestion that differs from the current value and can still be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSuggestion {
    pub language: String,
    pub key: String,
    pub suggestion: String,
}

pub struct Analyzer {
    client: Arc<dyn ModelClient>,
    model_id: String,
}

impl Analyzer {
    pub fn new(client: Arc<dyn ModelClient>, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    /// Gemini-backed analyzer built from the configuration.
    pub fn from_config(config: &ReviewerConfig) -> ReviewResult<Self> {
        let client = GeminiClient::new(config).map_err(classify_model_error)?;
        Ok(Self::new(Arc::new(client), config.model_id.clone()))
    }

    fn ensure_credentials(&self) -> ReviewResult<()> {
        if self.client.has_credentials() {
            Ok(())
        } else {
            Err(ReviewError::Configuration(format!(
                "no API key configured for {}",
                self.client.name()
            )))
        }
    }

    /// The exact request that analysing `input` sends.
    pub fn analysis_request(&self, input: &AnalysisPromptInput<'_>) -> ModelRequest {
        ModelRequest::structured(
            self.model_id.clone(),
            prompt::analysis_prompt(input),
            analysis_response_schema(),
        )
    }

    /// Analyses a single key from an already-built prompt input.
    pub async fn analyze_one(&self, input: &AnalysisPromptInput<'_>) -> ReviewResult<Vec<AnalysisItem>> {
        self.ensure_credentials()?;
        request_analysis(self.client.as_ref(), &self.analysis_request(input)).await
    }

    /// Prompt that analysing `key` would send, for display before sending.
    pub fn preview_prompt(&self, session: &Session, key: &str) -> ReviewResult<String> {
        let references = References::resolve(session.files())?;
        let group = session.group_of(key);
        Ok(build_prompt(session, &references, key, group))
    }

    /// Analyses one key of the session.
    pub async fn analyze_key(&self, session: &Session, key: &str) -> ReviewResult<AnalysisBatch> {
        self.analyze_all(session, &[key.to_string()]).await
    }

    /// Analyses `keys` concurrently; each key gets its own result or error.
    ///
    /// Keys that belong to a group are analysed with that group's context and
    /// reference examples.
    pub async fn analyze_all(&self, session: &Session, keys: &[String]) -> ReviewResult<AnalysisBatch> {
        self.ensure_credentials()?;
        if keys.is_empty() {
            return Err(ReviewError::validation("no keys selected for analysis"));
        }
        let references = References::resolve(session.files())?;

        let requests = keys
            .iter()
            .map(|key| {
                let prompt = build_prompt(session, &references, key, session.group_of(key));
                (key.clone(), self.structured(prompt))
            })
            .collect();

        Ok(AnalysisBatch {
            ticket: session.ticket(),
            results: self.run_batch(requests).await,
        })
    }

    /// Analyses every member of a group, with reference members as exemplars.
    pub async fn analyze_group(&self, session: &Session, group_id: &str) -> ReviewResult<AnalysisBatch> {
        self.ensure_credentials()?;
        let group = session
            .group(group_id)
            .ok_or_else(|| ReviewError::validation(format!("unknown group: {group_id}")))?;
        if group.keys.is_empty() {
            return Err(ReviewError::validation(format!(
                "group {} has no keys",
                group.name
            )));
        }
        let references = References::resolve(session.files())?;

        let requests = group
            .keys
            .iter()
            .map(|key| {
                let prompt = build_prompt(session, &references, key, Some(group));
                (key.clone(), self.structured(prompt))
            })
            .collect();

        info!("analysing group {} ({} keys)", group.name, group.keys.len());
        Ok(AnalysisBatch {
            ticket: session.ticket(),
            results: self.run_batch(requests).await,
        })
    }

    /// Analyses the members of every group in one concurrent batch.
    ///
    /// A key listed in several groups is analysed once, with the first group.
    pub async fn analyze_all_groups(&self, session: &Session) -> ReviewResult<AnalysisBatch> {
        self.ensure_credentials()?;
        let references = References::resolve(session.files())?;

        let mut requests: Vec<(String, ModelRequest)> = Vec::new();
        for group in session.groups() {
            for key in &group.keys {
                if requests.iter().any(|(queued, _)| queued == key) {
                    continue;
                }
                let prompt = build_prompt(session, &references, key, Some(group));
                requests.push((key.clone(), self.structured(prompt)));
            }
        }
        if requests.is_empty() {
            return Err(ReviewError::validation("no grouped keys to analyse"));
        }

        info!(
            "analysing {} groups ({} keys)",
            session.groups().len(),
            requests.len()
        );
        Ok(AnalysisBatch {
            ticket: session.ticket(),
            results: self.run_batch(requests).await,
        })
    }

    /// Asks the model to describe where `key` is used.
    pub async fn suggest_context(&self, session: &Session, key: &str) -> ReviewResult<String> {
        self.ensure_credentials()?;
        let translations: Vec<LanguageText> = session
            .files()
            .iter()
            .filter_map(|file| file.text(key).map(|text| LanguageText::new(file.name.clone(), Some(text))))
            .collect();
        if translations.is_empty() {
            return Err(ReviewError::validation(format!("{key} has no translations")));
        }

        let request = ModelRequest::text(
            self.model_id.clone(),
            prompt::context_suggestion_prompt(key, &translations),
        );
        let reply = self
            .client
            .generate(&request)
            .await
            .map_err(classify_model_error)?;

        let suggestion = strip_code_fence(&reply).trim().to_string();
        if suggestion.is_empty() {
            return Err(ReviewError::analysis("the model returned an empty context"));
        }
        Ok(suggestion)
    }

    fn structured(&self, prompt: String) -> ModelRequest {
        ModelRequest::structured(self.model_id.clone(), prompt, analysis_response_schema())
    }

    async fn run_batch(&self, requests: Vec<(String, ModelRequest)>) -> BTreeMap<String, KeyAnalysis> {
        let mut handles = Vec::with_capacity(requests.len());
        for (key, request) in requests {
            let client = Arc::clone(&self.client);
            let handle =
                tokio::spawn(async move { request_analysis(client.as_ref(), &request).await });
            handles.push((key, handle));
        }

        let mut results = BTreeMap::new();
        for (key, handle) in handles {
            let outcome = match handle.await {
                Ok(Ok(items)) => KeyAnalysis::success(items),
                Ok(Err(error)) => {
                    warn!("analysis of {key} failed: {error}");
                    KeyAnalysis::failure(error.to_string())
                }
                Err(join_error) => {
                    warn!("analysis task for {key} did not finish: {join_error}");
                    KeyAnalysis::failure(format!("analysis task failed: {join_error}"))
                }
            };
            results.insert(key, outcome);
        }

        let failed = results.values().filter(|outcome| outcome.error.is_some()).count();
        info!("analysed {} keys, {} failed", results.len(), failed);
        results
    }
}

async fn request_analysis(
    client: &dyn ModelClient,
    request: &ModelRequest,
) -> ReviewResult<Vec<AnalysisItem>> {
    let reply = client.generate(request).await.map_err(classify_model_error)?;
    let response: AnalysisResponse = parse_json_response(&reply)
        .map_err(|err| ReviewError::analysis(format!("could not parse model response: {err}")))?;
    Ok(response.analysis)
}

fn language_text(file: &TranslationFile, key: &str) -> LanguageText {
    LanguageText::new(file.name.clone(), file.text(key))
}

fn build_prompt(
    session: &Session,
    references: &References<'_>,
    key: &str,
    group: Option<&TranslationGroup>,
) -> String {
    let group_references = group
        .map(|group| group_references(session.files(), group, key))
        .unwrap_or_default();
    let context = group
        .map(|group| group.context.as_str())
        .filter(|context| !context.trim().is_empty())
        .unwrap_or_else(|| session.context_for(key));

    let input = AnalysisPromptInput {
        key,
        context,
        secondary: language_text(references.secondary, key),
        primary: references.primary.map(|file| language_text(file, key)),
        others: references
            .others(session.files())
            .into_iter()
            .map(|file| language_text(file, key))
            .collect(),
        glossary: session.glossary(),
        history: session.history(),
        group_references: &group_references,
    };
    prompt::analysis_prompt(&input)
}

/// Reference members of `group` other than `key`, with every defined translation.
fn group_references(files: &[TranslationFile], group: &TranslationGroup, key: &str) -> Vec<GroupReference> {
    group
        .reference_keys
        .iter()
        .filter(|reference| reference.as_str() != key)
        .map(|reference| GroupReference {
            key: reference.clone(),
            translations: files
                .iter()
                .filter_map(|file| {
                    file.text(reference)
                        .map(|text| LanguageText::new(file.name.clone(), Some(text)))
                })
                .collect(),
        })
        .filter(|reference| !reference.translations.is_empty())
        .collect()
}

/// Actionable suggestions for `key` that differ from the current values.
pub fn pending_suggestions(session: &Session, key: &str) -> Vec<PendingSuggestion> {
    let Some(items) = session.analysis(key).and_then(|analysis| analysis.result.as_ref()) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let suggestion = item.actionable_suggestion()?;
            let file = session.file(&item.language)?;
            if file.text(key).as_deref() == Some(suggestion) {
                return None;
            }
            Some(PendingSuggestion {
                language: item.language.clone(),
                key: key.to_string(),
                suggestion: suggestion.to_string(),
            })
        })
        .collect()
}

/// Writes a suggestion into its document, records it in the history and
/// turns the verdict for that language into `Good`.
pub fn apply_suggestion(
    session: &mut Session,
    language: &str,
    key: &str,
    suggestion: &str,
) -> ReviewResult<()> {
    session.update_value(language, key, Value::String(suggestion.to_string()))?;
    session.mark_suggestion_applied(key, language);
    Ok(())
}

/// Applies every suggestion whose language does not already hold that text.
pub fn apply_all(session: &mut Session, suggestions: &[PendingSuggestion]) -> ReviewResult<usize> {
    let mut applied = 0;
    for pending in suggestions {
        if session.text(&pending.language, &pending.key).as_deref() == Some(pending.suggestion.as_str()) {
            continue;
        }
        apply_suggestion(session, &pending.language, &pending.key, &pending.suggestion)?;
        applied += 1;
    }
    Ok(applied)
}
