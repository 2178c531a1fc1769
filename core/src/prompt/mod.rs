//! Prompt construction for every model call.
//!
//! All builders here are pure: they take already-resolved texts and return the
//! exact instruction string, so the UI can show the prompt before it is sent.
//!
//! The analysis prompt layers its guidance in a fixed order of precedence:
//! group reference examples, then the user-approved history for the key, then
//! glossary terms, then the reference translations, then the free-text context.
//! Layers without data are left out entirely.

mod glossary;

pub use glossary::{applicable_terms, GlossaryTerm};

use crate::model::{Evaluation, Glossary, TranslationHistory};

pub(crate) const GROUP_REFERENCE_HEADING: &str = "GROUP REFERENCE EXAMPLES";
pub(crate) const HISTORY_HEADING: &str = "USER-APPROVED HISTORY";
pub(crate) const GLOSSARY_HEADING: &str = "GLOSSARY";
pub(crate) const SOURCE_HEADING: &str = "SOURCE OF TRUTH";
pub(crate) const CONTEXT_HEADING: &str = "CONTEXT";
pub(crate) const REVIEW_HEADING: &str = "TRANSLATIONS TO EVALUATE";

const MISSING_VALUE: &str = "<missing>";

/// A language code paired with its value for the key, `None` when undefined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageText {
    pub language: String,
    pub text: Option<String>,
}

impl LanguageText {
    pub fn new(language: impl Into<String>, text: Option<String>) -> Self {
        Self {
            language: language.into(),
            text,
        }
    }

    fn rendered(&self) -> String {
        match &self.text {
            Some(text) => quoted(text),
            None => MISSING_VALUE.to_string(),
        }
    }
}

/// Translations of one reference key of the group being analysed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReference {
    pub key: String,
    pub translations: Vec<LanguageText>,
}

#[derive(Debug, Clone)]
pub struct AnalysisPromptInput<'a> {
    pub key: &'a str,
    pub context: &'a str,
    pub secondary: LanguageText,
    pub primary: Option<LanguageText>,
    pub others: Vec<LanguageText>,
    pub glossary: &'a Glossary,
    pub history: &'a TranslationHistory,
    pub group_references: &'a [GroupReference],
}

impl AnalysisPromptInput<'_> {
    /// Every translation the model must return a verdict for, references first.
    pub fn reviewed_languages(&self) -> Vec<&LanguageText> {
        let mut reviewed = vec![&self.secondary];
        reviewed.extend(self.primary.as_ref());
        reviewed.extend(self.others.iter());
        reviewed
    }

    fn reference_texts(&self) -> Vec<&str> {
        let mut texts: Vec<&str> = self.secondary.text.as_deref().into_iter().collect();
        if let Some(primary) = &self.primary {
            texts.extend(primary.text.as_deref());
        }
        texts
    }
}

struct Sections {
    buffer: String,
    next: usize,
}

impl Sections {
    fn new(preamble: &str) -> Self {
        Self {
            buffer: preamble.to_string(),
            next: 1,
        }
    }

    fn numbered(&mut self, heading: &str, note: &str) {
        self.buffer.push_str(&format!("\n\n## {}. {}", self.next, heading));
        if !note.is_empty() {
            self.line(note);
        }
        self.next += 1;
    }

    fn plain(&mut self, heading: &str) {
        self.buffer.push_str(&format!("\n\n## {heading}"));
    }

    fn line(&mut self, text: &str) {
        self.buffer.push('\n');
        self.buffer.push_str(text);
    }

    fn finish(self) -> String {
        self.buffer
    }
}

/// Builds the per-key review instruction.
pub fn analysis_prompt(input: &AnalysisPromptInput<'_>) -> String {
    let mut sections = Sections::new(&format!(
        "You are an expert localization reviewer for a software user interface. \
         Review every translation of the key `{}` for accuracy, consistency and natural wording. \
         The guidance below is listed in strict order of priority: when two sections disagree, \
         the earlier section wins.",
        input.key
    ));

    if !input.group_references.is_empty() {
        sections.numbered(
            &format!("{GROUP_REFERENCE_HEADING} (HIGHEST PRIORITY)"),
            "These keys belong to the same group as the reviewed key and were marked as reference \
             translations. They are the absolute pattern for terminology, tone and style and \
             override everything below.",
        );
        for reference in input.group_references {
            sections.line(&format!("Key `{}`:", reference.key));
            for translation in &reference.translations {
                sections.line(&format!(
                    "- {}: {}",
                    translation.language,
                    translation.rendered()
                ));
            }
        }
    }

    if let Some(entries) = input.history.get(input.key).filter(|entries| !entries.is_empty()) {
        sections.numbered(
            &format!("{HISTORY_HEADING} (SECOND PRIORITY)"),
            "These are the final versions the user approved for this key. They override the \
             glossary and the reference translations below; a translation equal to its approved \
             version is correct.",
        );
        for (language, value) in entries {
            sections.line(&format!("- {language}: {}", quoted(value)));
        }
    }

    let terms = applicable_terms(input.glossary, &input.reference_texts());
    if !terms.is_empty() {
        sections.numbered(
            &format!("{GLOSSARY_HEADING} (MANDATORY TERMS)"),
            "Whenever a source term appears, the translation must use the mandated term for its \
             language. These rules have lower priority than the sections above.",
        );
        for term in &terms {
            sections.line(&term.describe());
        }
    }

    sections.numbered(
        SOURCE_HEADING,
        "The Polish text defines the intended meaning. The English text is the primary point of \
         comparison. Neither is assumed to be free of errors.",
    );
    sections.line(&format!(
        "- Polish ({}): {}",
        input.secondary.language,
        input.secondary.rendered()
    ));
    if let Some(primary) = &input.primary {
        sections.line(&format!(
            "- English ({}): {}",
            primary.language,
            primary.rendered()
        ));
    }

    sections.numbered(CONTEXT_HEADING, "");
    let context = input.context.trim();
    sections.line(if context.is_empty() {
        "No context was provided for this key."
    } else {
        context
    });

    sections.plain(REVIEW_HEADING);
    for translation in input.reviewed_languages() {
        sections.line(&format!(
            "- {}: {}",
            translation.language,
            translation.rendered()
        ));
    }

    sections.plain("RESPONSE FORMAT");
    sections.line(&format!(
        "Return a JSON object with a single field \"analysis\": an array containing exactly one \
         entry for every translation listed above, including the Polish and English texts, since \
         they may contain errors too. Each entry has:\n\
         - \"language\": the language code exactly as listed above.\n\
         - \"evaluation\": one of {}.\n\
         - \"feedback\": a short explanation in English of what is right or wrong. Justify it \
         with the wording and the context only; never mention the priority sections, the history, \
         the glossary or the group references by name.\n\
         - \"suggestion\": only the corrected replacement text, without quotes, labels or \
         explanation. Omit this field when the evaluation is \"{}\".\n\
         A missing translation ({MISSING_VALUE}) is always \"{}\" and needs a suggestion.",
        evaluation_choices(),
        Evaluation::Good.label(),
        Evaluation::Incorrect.label(),
    ));

    sections.finish()
}

/// Asks for a one-paragraph description of where a key is used, to pre-fill its context.
pub fn context_suggestion_prompt(key: &str, translations: &[LanguageText]) -> String {
    let mut sections = Sections::new(&format!(
        "You are helping a localization team document the strings of a software user interface. \
         Based on the key name `{key}` and its translations below, describe in one short paragraph \
         where this text most likely appears in the interface and what it is used for."
    ));

    sections.plain("TRANSLATIONS");
    for translation in translations {
        sections.line(&format!(
            "- {}: {}",
            translation.language,
            translation.rendered()
        ));
    }

    sections.plain("RESPONSE FORMAT");
    sections.line(
        "Reply with the paragraph only: plain text, no markdown, no quotes, no code fences \
         and no introduction.",
    );

    sections.finish()
}

#[derive(Debug, Clone)]
pub struct TranslationPromptInput<'a> {
    pub app_context: &'a str,
    pub glossary: &'a Glossary,
    pub key: &'a str,
    pub context: &'a str,
    pub secondary: Option<&'a str>,
    pub primary: Option<&'a str>,
    pub target_languages: &'a [String],
}

/// Asks for one translation per target language in a single call.
pub fn bulk_translation_prompt(input: &TranslationPromptInput<'_>) -> String {
    let mut sections = Sections::new(&format!(
        "You are a professional software localizer. Translate the user interface text of the key \
         `{}` into each of the target languages listed below.",
        input.key
    ));

    let app_context = input.app_context.trim();
    if !app_context.is_empty() {
        sections.plain("APPLICATION");
        sections.line(app_context);
    }

    let reference_texts: Vec<&str> = input
        .secondary
        .into_iter()
        .chain(input.primary)
        .collect();
    let terms = applicable_terms(input.glossary, &reference_texts);
    if !terms.is_empty() {
        sections.plain(&format!("{GLOSSARY_HEADING} (MANDATORY TERMS)"));
        for term in &terms {
            sections.line(&term.describe());
        }
    }

    sections.plain(SOURCE_HEADING);
    if let Some(secondary) = input.secondary {
        sections.line(&format!("- Polish (authoritative meaning): {}", quoted(secondary)));
    }
    if let Some(primary) = input.primary {
        sections.line(&format!("- English: {}", quoted(primary)));
    }

    let context = input.context.trim();
    if !context.is_empty() {
        sections.plain(CONTEXT_HEADING);
        sections.line(context);
    }

    sections.plain("TARGET LANGUAGES");
    sections.line(&input.target_languages.join(", "));

    sections.plain("RESPONSE FORMAT");
    sections.line(
        "Return only a JSON object whose keys are the target language codes exactly as listed \
         and whose values are the translated texts. Keep placeholders, HTML tags and punctuation \
         conventions of the source. Do not add explanations.",
    );

    sections.finish()
}

fn evaluation_choices() -> String {
    Evaluation::ALL
        .iter()
        .map(|evaluation| format!("\"{}\"", evaluation.label()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn quoted(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn position(prompt: &str, needle: &str) -> usize {
        prompt
            .find(needle)
            .unwrap_or_else(|| panic!("prompt is missing {needle:?}:\n{prompt}"))
    }

    fn base_input<'a>(
        glossary: &'a Glossary,
        history: &'a TranslationHistory,
        group_references: &'a [GroupReference],
    ) -> AnalysisPromptInput<'a> {
        AnalysisPromptInput {
            key: "buttons.save",
            context: "Label of the save button in the editor toolbar",
            secondary: LanguageText::new("pl", Some("Zapisz plik".into())),
            primary: Some(LanguageText::new("en", Some("Save file".into()))),
            others: vec![
                LanguageText::new("de", Some("Datei speichern".into())),
                LanguageText::new("fr", None),
            ],
            glossary,
            history,
            group_references,
        }
    }

    fn sample_glossary() -> Glossary {
        let mut glossary = Glossary::new();
        glossary.insert(
            "plik".into(),
            BTreeMap::from([("de".to_string(), "Datei".to_string())]),
        );
        glossary.insert(
            "folder".into(),
            BTreeMap::from([("de".to_string(), "Ordner".to_string())]),
        );
        glossary
    }

    fn sample_history() -> TranslationHistory {
        let mut history = TranslationHistory::new();
        history.insert(
            "buttons.save".into(),
            BTreeMap::from([("de".to_string(), "Datei sichern".to_string())]),
        );
        history
    }

    fn sample_references() -> Vec<GroupReference> {
        vec![GroupReference {
            key: "buttons.open".into(),
            translations: vec![
                LanguageText::new("pl", Some("Otwórz plik".into())),
                LanguageText::new("de", Some("Datei öffnen".into())),
            ],
        }]
    }

    #[test]
    fn group_references_come_before_history() {
        let glossary = sample_glossary();
        let history = sample_history();
        let references = sample_references();
        let prompt = analysis_prompt(&base_input(&glossary, &history, &references));

        let group = position(&prompt, GROUP_REFERENCE_HEADING);
        let approved = position(&prompt, HISTORY_HEADING);
        let glossary_at = position(&prompt, GLOSSARY_HEADING);
        let source = position(&prompt, SOURCE_HEADING);
        let context = position(&prompt, "## 5. CONTEXT");

        assert!(group < approved);
        assert!(approved < glossary_at);
        assert!(glossary_at < source);
        assert!(source < context);
        assert!(prompt.contains("## 1. GROUP REFERENCE EXAMPLES"));
        assert!(prompt.contains("\"Datei öffnen\""));
        assert!(prompt.contains("- de: \"Datei sichern\""));
    }

    #[test]
    fn absent_layers_are_omitted_and_numbering_closes_up() {
        let glossary = Glossary::new();
        let history = TranslationHistory::new();
        let prompt = analysis_prompt(&base_input(&glossary, &history, &[]));

        assert!(!prompt.contains(GROUP_REFERENCE_HEADING));
        assert!(!prompt.contains(HISTORY_HEADING));
        assert!(!prompt.contains(GLOSSARY_HEADING));
        assert!(prompt.contains("## 1. SOURCE OF TRUTH"));
        assert!(prompt.contains("## 2. CONTEXT"));
    }

    #[test]
    fn history_for_other_keys_is_ignored() {
        let glossary = Glossary::new();
        let mut history = sample_history();
        let entry = history.remove("buttons.save").unwrap();
        history.insert("buttons.other".into(), entry);

        let prompt = analysis_prompt(&base_input(&glossary, &history, &[]));
        assert!(!prompt.contains(HISTORY_HEADING));
    }

    #[test]
    fn only_glossary_terms_found_in_the_references_are_listed() {
        let glossary = sample_glossary();
        let history = TranslationHistory::new();
        let prompt = analysis_prompt(&base_input(&glossary, &history, &[]));

        assert!(prompt.contains("\"plik\""));
        assert!(prompt.contains("\"Datei\""));
        assert!(!prompt.contains("Ordner"));
    }

    #[test]
    fn every_translation_including_references_is_reviewed() {
        let glossary = Glossary::new();
        let history = TranslationHistory::new();
        let input = base_input(&glossary, &history, &[]);
        let prompt = analysis_prompt(&input);

        let review = position(&prompt, REVIEW_HEADING);
        let listed = &prompt[review..];
        assert!(listed.contains("- pl: \"Zapisz plik\""));
        assert!(listed.contains("- en: \"Save file\""));
        assert!(listed.contains("- de: \"Datei speichern\""));
        assert!(listed.contains("- fr: <missing>"));
        assert!(prompt.contains("including the Polish and English texts"));
        assert_eq!(input.reviewed_languages().len(), 4);
    }

    #[test]
    fn response_format_names_the_exact_evaluation_literals() {
        let glossary = Glossary::new();
        let history = TranslationHistory::new();
        let prompt = analysis_prompt(&base_input(&glossary, &history, &[]));

        assert!(prompt.contains("\"Good\", \"Needs Improvement\", \"Incorrect\""));
        assert!(prompt.contains("never mention the priority sections"));
        assert!(prompt.contains("without quotes, labels or explanation"));
    }

    #[test]
    fn blank_context_is_called_out() {
        let glossary = Glossary::new();
        let history = TranslationHistory::new();
        let mut input = base_input(&glossary, &history, &[]);
        input.context = "   ";
        let prompt = analysis_prompt(&input);
        assert!(prompt.contains("No context was provided for this key."));
    }

    #[test]
    fn prompt_is_deterministic() {
        let glossary = sample_glossary();
        let history = sample_history();
        let references = sample_references();
        let input = base_input(&glossary, &history, &references);
        assert_eq!(analysis_prompt(&input), analysis_prompt(&input));
    }

    #[test]
    fn context_suggestion_lists_values_and_forbids_formatting() {
        let prompt = context_suggestion_prompt(
            "dialog.delete.confirm",
            &[
                LanguageText::new("pl", Some("Czy na pewno usunąć?".into())),
                LanguageText::new("de", None),
            ],
        );
        assert!(prompt.contains("`dialog.delete.confirm`"));
        assert!(prompt.contains("- pl: \"Czy na pewno usunąć?\""));
        assert!(prompt.contains("- de: <missing>"));
        assert!(prompt.contains("no code fences"));
    }

    #[test]
    fn bulk_translation_prompt_lists_targets_and_sources() {
        let glossary = sample_glossary();
        let targets = vec!["de".to_string(), "fr".to_string()];
        let prompt = bulk_translation_prompt(&TranslationPromptInput {
            app_context: "A desktop file manager",
            glossary: &glossary,
            key: "buttons.save",
            context: "Toolbar button",
            secondary: Some("Zapisz plik"),
            primary: Some("Save file"),
            target_languages: &targets,
        });

        assert!(position(&prompt, "## APPLICATION") < position(&prompt, GLOSSARY_HEADING));
        assert!(prompt.contains("A desktop file manager"));
        assert!(prompt.contains("Polish (authoritative meaning): \"Zapisz plik\""));
        assert!(prompt.contains("English: \"Save file\""));
        assert!(prompt.contains("de, fr"));
        assert!(prompt.contains("Toolbar button"));
        assert!(!prompt.contains("Ordner"));
    }

    #[test]
    fn bulk_translation_prompt_skips_empty_sections() {
        let glossary = Glossary::new();
        let targets = vec!["de".to_string()];
        let prompt = bulk_translation_prompt(&TranslationPromptInput {
            app_context: "",
            glossary: &glossary,
            key: "title",
            context: "",
            secondary: None,
            primary: Some("Welcome"),
            target_languages: &targets,
        });

        assert!(!prompt.contains("## APPLICATION"));
        assert!(!prompt.contains(GLOSSARY_HEADING));
        assert!(!prompt.contains("## CONTEXT"));
        assert!(!prompt.contains("Polish"));
    }
}
