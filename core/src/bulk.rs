//! Bulk translation of many keys into several target languages.
//!
//! Keys are processed one after another, one request per key covering every
//! target language. A failing key is logged and skipped; the run continues.

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::ai::{parse_json_response, GeminiClient, ModelClient, ModelRequest};
use crate::config::ReviewerConfig;
use crate::error::{classify_model_error, ReviewError, ReviewResult};
use crate::path;
use crate::prompt::{self, TranslationPromptInput};
use crate::reference::References;
use crate::session::{BatchTicket, KeyTranslations, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BulkProgress {
    pub total: u32,
    pub done: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyFailure {
    pub key: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkOutcome {
    pub ticket: BatchTicket,
    pub translations: Vec<KeyTranslations>,
    pub failures: Vec<KeyFailure>,
    /// Keys with neither a Polish nor an English value.
    pub skipped: Vec<String>,
}

pub struct BulkTranslator {
    client: Arc<dyn ModelClient>,
    model_id: String,
}

impl BulkTranslator {
    pub fn new(client: Arc<dyn ModelClient>, model_id: impl Into<String>) -> Self {
        Self {
            client,
            model_id: model_id.into(),
        }
    }

    pub fn from_config(config: &ReviewerConfig) -> ReviewResult<Self> {
        let client = GeminiClient::new(config).map_err(classify_model_error)?;
        Ok(Self::new(Arc::new(client), config.model_id.clone()))
    }

    /// Translates `keys` into `targets`, reporting progress after every key.
    pub async fn translate_all<F>(
        &self,
        session: &Session,
        keys: &[String],
        targets: &[String],
        mut on_progress: F,
    ) -> ReviewResult<BulkOutcome>
    where
        F: FnMut(BulkProgress),
    {
        if !self.client.has_credentials() {
            return Err(ReviewError::Configuration(format!(
                "no API key configured for {}",
                self.client.name()
            )));
        }
        let references = References::resolve(session.files())?;

        let targets: Vec<String> = targets
            .iter()
            .filter(|target| !references.is_reference(target))
            .cloned()
            .collect();
        if targets.is_empty() {
            return Err(ReviewError::validation(
                "select at least one target language other than Polish and English",
            ));
        }
        if keys.is_empty() {
            return Err(ReviewError::validation("no keys selected for translation"));
        }

        let total = keys.len() as u32;
        let mut outcome = BulkOutcome {
            ticket: session.ticket(),
            translations: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
        };

        info!(
            "bulk translating {} keys into {}",
            keys.len(),
            targets.join(", ")
        );

        for (index, key) in keys.iter().enumerate() {
            let secondary = references.secondary.text(key);
            let primary = references.primary.and_then(|file| file.text(key));

            if secondary.is_none() && primary.is_none() {
                outcome.skipped.push(key.clone());
            } else {
                let input = TranslationPromptInput {
                    app_context: session.app_context(),
                    glossary: session.glossary(),
                    key,
                    context: session.context_for(key),
                    secondary: secondary.as_deref(),
                    primary: primary.as_deref(),
                    target_languages: &targets,
                };
                let request =
                    ModelRequest::text(self.model_id.clone(), prompt::bulk_translation_prompt(&input));

                match self.translate_key(&request, &targets).await {
                    Ok(suggestions) => outcome.translations.push(KeyTranslations {
                        key: key.clone(),
                        suggestions,
                    }),
                    Err(error) => {
                        warn!("bulk translation of {key} failed: {error}");
                        outcome.failures.push(KeyFailure {
                            key: key.clone(),
                            error: error.to_string(),
                        });
                    }
                }
            }

            let done = index as u32 + 1;
            debug!("bulk translation progress {done}/{total}");
            on_progress(BulkProgress { total, done });
        }

        info!(
            "bulk translation finished: {} translated, {} failed, {} skipped",
            outcome.translations.len(),
            outcome.failures.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    async fn translate_key(
        &self,
        request: &ModelRequest,
        targets: &[String],
    ) -> ReviewResult<BTreeMap<String, String>> {
        let reply = self
            .client
            .generate(request)
            .await
            .map_err(classify_model_error)?;
        let parsed: serde_json::Map<String, Value> = parse_json_response(&reply)
            .map_err(|err| ReviewError::analysis(format!("could not parse model response: {err}")))?;

        Ok(parsed
            .into_iter()
            .filter(|(language, _)| targets.contains(language))
            .filter(|(_, value)| !value.is_null())
            .map(|(language, value)| (language, path::value_text(&value).trim().to_string()))
            .filter(|(_, text)| !text.is_empty())
            .collect())
    }
}
