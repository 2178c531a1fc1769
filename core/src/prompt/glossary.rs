use crate::model::Glossary;

use super::quoted;

/// One glossary entry that applies to the texts being reviewed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlossaryTerm {
    pub source: String,
    pub translations: Vec<(String, String)>,
}

impl GlossaryTerm {
    pub(crate) fn describe(&self) -> String {
        let mandated = self
            .translations
            .iter()
            .map(|(language, term)| format!("{language}: {}", quoted(term)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("- {} -> {}", quoted(&self.source), mandated)
    }
}

/// Glossary terms whose source term occurs in any of `texts`, case-insensitively.
///
/// Blank source terms and terms without a single mandated translation are skipped.
pub fn applicable_terms(glossary: &Glossary, texts: &[&str]) -> Vec<GlossaryTerm> {
    let lowered: Vec<String> = texts.iter().map(|text| text.to_lowercase()).collect();

    glossary
        .iter()
        .filter(|(source, translations)| {
            let needle = source.trim().to_lowercase();
            !needle.is_empty()
                && !translations.is_empty()
                && lowered.iter().any(|text| text.contains(&needle))
        })
        .map(|(source, translations)| GlossaryTerm {
            source: source.clone(),
            translations: translations
                .iter()
                .map(|(language, term)| (language.clone(), term.clone()))
                .collect(),
        })
        .collect()
}
