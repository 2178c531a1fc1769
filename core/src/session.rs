//! In-memory state of one review session.
//!
//! Everything the user edits lives here: the uploaded documents, the per-key
//! context, the glossary, the approval history, the groups and the latest
//! analysis results. Loading a new upload bumps the session generation so that
//! results of requests started against the previous upload can be recognised
//! and dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::bundle::{self, BundleResult, UploadBundle};
use crate::error::{ReviewError, ReviewResult};
use crate::model::{
    ContextMap, Evaluation, Glossary, KeyAnalysis, TranslationFile, TranslationGroup,
    TranslationHistory,
};
use crate::path;

/// Identifies the upload a batch of results was requested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchTicket {
    pub generation: u64,
}

/// Analysis results for a set of keys, tagged with the upload they belong to.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisBatch {
    pub ticket: BatchTicket,
    pub results: BTreeMap<String, KeyAnalysis>,
}

/// Model-proposed values for one key, by language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyTranslations {
    pub key: String,
    pub suggestions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    files: Vec<TranslationFile>,
    context: ContextMap,
    glossary: Glossary,
    history: TranslationHistory,
    groups: Vec<TranslationGroup>,
    app_context: String,
    analyses: BTreeMap<String, KeyAnalysis>,
    generation: u64,
}

impl Session {
    pub fn from_bundle(bundle: UploadBundle) -> Self {
        let mut session = Self::default();
        session.load_bundle(bundle);
        session
    }

    /// Replaces the whole session with a fresh upload.
    pub fn load_bundle(&mut self, bundle: UploadBundle) {
        let UploadBundle {
            files,
            context,
            glossary,
            history,
            mut groups,
            app_context,
        } = bundle;

        groups.iter_mut().for_each(TranslationGroup::normalize);

        self.files = files;
        self.context = context;
        self.glossary = glossary;
        self.history = history;
        self.groups = groups;
        self.app_context = app_context;
        self.analyses.clear();
        self.generation += 1;

        info!(
            "session generation {} loaded with {} languages and {} keys",
            self.generation,
            self.files.len(),
            self.keys().len()
        );
    }

    /// Snapshot of the current state in upload form.
    pub fn to_bundle(&self) -> UploadBundle {
        UploadBundle {
            files: self.files.clone(),
            context: self.context.clone(),
            glossary: self.glossary.clone(),
            history: self.history.clone(),
            groups: self.groups.clone(),
            app_context: self.app_context.clone(),
        }
    }

    pub fn download_zip(&self) -> BundleResult<Vec<u8>> {
        bundle::write_zip(&self.to_bundle())
    }

    pub fn files(&self) -> &[TranslationFile] {
        &self.files
    }

    pub fn file(&self, language: &str) -> Option<&TranslationFile> {
        self.files.iter().find(|file| file.name == language)
    }

    pub fn languages(&self) -> Vec<&str> {
        self.files.iter().map(|file| file.name.as_str()).collect()
    }

    pub fn context(&self) -> &ContextMap {
        &self.context
    }

    pub fn context_for(&self, key: &str) -> &str {
        self.context.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn glossary(&self) -> &Glossary {
        &self.glossary
    }

    pub fn history(&self) -> &TranslationHistory {
        &self.history
    }

    pub fn groups(&self) -> &[TranslationGroup] {
        &self.groups
    }

    pub fn group(&self, id: &str) -> Option<&TranslationGroup> {
        self.groups.iter().find(|group| group.id == id)
    }

    /// First group that lists `key` as a member.
    pub fn group_of(&self, key: &str) -> Option<&TranslationGroup> {
        self.groups.iter().find(|group| group.contains(key))
    }

    pub fn app_context(&self) -> &str {
        &self.app_context
    }

    pub fn analyses(&self) -> &BTreeMap<String, KeyAnalysis> {
        &self.analyses
    }

    pub fn analysis(&self, key: &str) -> Option<&KeyAnalysis> {
        self.analyses.get(key)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ticket(&self) -> BatchTicket {
        BatchTicket {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, ticket: BatchTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Sorted, de-duplicated union of the leaf keys of every document.
    pub fn keys(&self) -> Vec<String> {
        let keys: BTreeSet<String> = self
            .files
            .iter()
            .flat_map(|file| path::flatten(&file.data))
            .collect();
        keys.into_iter().collect()
    }

    /// Keys whose path, context or any translation contains `query`, case-insensitively.
    pub fn search_keys(&self, query: &str) -> Vec<String> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.keys();
        }

        self.keys()
            .into_iter()
            .filter(|key| {
                key.to_lowercase().contains(&needle)
                    || self.context_for(key).to_lowercase().contains(&needle)
                    || self.files.iter().any(|file| {
                        file.text(key)
                            .is_some_and(|text| text.to_lowercase().contains(&needle))
                    })
            })
            .collect()
    }

    /// Languages in which `key` is undefined.
    pub fn missing_languages(&self, key: &str) -> Vec<String> {
        self.files
            .iter()
            .filter(|file| file.value(key).is_none())
            .map(|file| file.name.clone())
            .collect()
    }

    pub fn text(&self, language: &str, key: &str) -> Option<String> {
        self.file(language).and_then(|file| file.text(key))
    }

    /// 1-based line of `key` in the pretty-printed document.
    pub fn line_number(&self, language: &str, key: &str) -> Option<usize> {
        self.file(language)
            .and_then(|file| path::line_number_of(&file.data, key))
    }

    /// Writes `value` at `key`, replacing the document and recording the approval.
    pub fn update_value(&mut self, language: &str, key: &str, value: Value) -> ReviewResult<()> {
        let file = self
            .files
            .iter_mut()
            .find(|file| file.name == language)
            .ok_or_else(|| ReviewError::validation(format!("unknown language: {language}")))?;
        if key.trim().is_empty() {
            return Err(ReviewError::validation("key path must not be empty"));
        }

        let approved = path::value_text(&value);
        file.data = Arc::new(path::set_by_path(&file.data, key, value));
        self.history
            .entry(key.to_string())
            .or_default()
            .insert(language.to_string(), approved);

        debug!("updated {language}:{key}");
        Ok(())
    }

    /// Sets or, for blank text, clears the context note of `key`.
    pub fn set_context(&mut self, key: &str, text: &str) {
        if text.trim().is_empty() {
            self.context.remove(key);
        } else {
            self.context.insert(key.to_string(), text.to_string());
        }
    }

    /// Stores a generated context only when the user has not written one.
    pub fn fill_context_if_empty(&mut self, key: &str, text: &str) -> bool {
        if !self.context_for(key).trim().is_empty() || text.trim().is_empty() {
            return false;
        }
        self.context.insert(key.to_string(), text.trim().to_string());
        true
    }

    pub fn add_glossary_term(&mut self, term: &str, language: &str, translation: &str) -> ReviewResult<()> {
        let (term, language, translation) = (term.trim(), language.trim(), translation.trim());
        if term.is_empty() || language.is_empty() || translation.is_empty() {
            return Err(ReviewError::validation(
                "glossary entries need a term, a language and a translation",
            ));
        }
        self.glossary
            .entry(term.to_string())
            .or_default()
            .insert(language.to_string(), translation.to_string());
        Ok(())
    }

    pub fn remove_glossary_term(&mut self, term: &str) -> bool {
        self.glossary.remove(term).is_some()
    }

    pub fn remove_glossary_translation(&mut self, term: &str, language: &str) -> bool {
        let Some(translations) = self.glossary.get_mut(term) else {
            return false;
        };
        let removed = translations.remove(language).is_some();
        if translations.is_empty() {
            self.glossary.remove(term);
        }
        removed
    }

    pub fn remove_history_entry(&mut self, key: &str, language: &str) -> bool {
        let Some(entries) = self.history.get_mut(key) else {
            return false;
        };
        let removed = entries.remove(language).is_some();
        if entries.is_empty() {
            self.history.remove(key);
        }
        removed
    }

    pub fn set_app_context(&mut self, text: &str) {
        self.app_context = text.trim().to_string();
    }

    /// Creates a group and returns its id.
    pub fn create_group(&mut self, name: &str, context: &str, keys: Vec<String>) -> ReviewResult<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReviewError::validation("group name must not be empty"));
        }

        let mut group = TranslationGroup {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            context: context.to_string(),
            keys,
            reference_keys: Vec::new(),
        };
        group.normalize();
        let id = group.id.clone();
        self.groups.push(group);
        Ok(id)
    }

    fn group_mut(&mut self, id: &str) -> ReviewResult<&mut TranslationGroup> {
        self.groups
            .iter_mut()
            .find(|group| group.id == id)
            .ok_or_else(|| ReviewError::validation(format!("unknown group: {id}")))
    }

    pub fn rename_group(&mut self, id: &str, name: &str) -> ReviewResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ReviewError::validation("group name must not be empty"));
        }
        self.group_mut(id)?.name = name.to_string();
        Ok(())
    }

    pub fn set_group_context(&mut self, id: &str, context: &str) -> ReviewResult<()> {
        self.group_mut(id)?.context = context.to_string();
        Ok(())
    }

    pub fn add_keys_to_group(&mut self, id: &str, keys: &[String]) -> ReviewResult<()> {
        let group = self.group_mut(id)?;
        group.keys.extend(keys.iter().cloned());
        group.normalize();
        Ok(())
    }

    /// Removing a member also drops it from the reference keys.
    pub fn remove_key_from_group(&mut self, id: &str, key: &str) -> ReviewResult<()> {
        let group = self.group_mut(id)?;
        group.keys.retain(|member| member != key);
        group.normalize();
        Ok(())
    }

    /// Flips the reference flag of a member key and returns the new state.
    pub fn toggle_reference_key(&mut self, id: &str, key: &str) -> ReviewResult<bool> {
        let group = self.group_mut(id)?;
        if !group.contains(key) {
            return Err(ReviewError::validation(format!(
                "{key} is not a member of group {}",
                group.name
            )));
        }

        if group.is_reference(key) {
            group.reference_keys.retain(|reference| reference != key);
            Ok(false)
        } else {
            group.reference_keys.push(key.to_string());
            Ok(true)
        }
    }

    pub fn delete_group(&mut self, id: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|group| group.id != id);
        self.groups.len() != before
    }

    /// Merges a finished batch unless a newer upload replaced the session meanwhile.
    pub fn accept_analysis_batch(&mut self, batch: AnalysisBatch) -> bool {
        if !self.is_current(batch.ticket) {
            info!(
                "discarding {} analysis results from generation {} (current {})",
                batch.results.len(),
                batch.ticket.generation,
                self.generation
            );
            return false;
        }
        self.analyses.extend(batch.results);
        true
    }

    /// Marks the verdict for `language` as accepted after its suggestion was applied.
    pub fn mark_suggestion_applied(&mut self, key: &str, language: &str) {
        let items = self
            .analyses
            .get_mut(key)
            .and_then(|analysis| analysis.result.as_mut());
        if let Some(item) = items
            .into_iter()
            .flatten()
            .find(|item| item.language == language)
        {
            item.evaluation = Evaluation::Good;
            item.suggestion = None;
        }
    }

    /// Writes bulk translation results for the chosen `languages` into their documents.
    ///
    /// Results from an older upload and languages that no longer exist are skipped.
    pub fn apply_translations(
        &mut self,
        ticket: BatchTicket,
        results: &[KeyTranslations],
        languages: &[String],
    ) -> ReviewResult<usize> {
        if !self.is_current(ticket) {
            info!(
                "discarding bulk translations from generation {} (current {})",
                ticket.generation, self.generation
            );
            return Ok(0);
        }

        let mut applied = 0;
        for result in results {
            for (language, text) in &result.suggestions {
                if !languages.contains(language) || self.file(language).is_none() {
                    continue;
                }
                self.update_value(language, &result.key, Value::String(text.clone()))?;
                applied += 1;
            }
        }
        Ok(applied)
    }
}
