//! Picks the reference documents out of an unordered upload.
//!
//! The Polish document is the source of truth and the English document the
//! primary point of comparison. Both are found by case-insensitive substring
//! match on the file name, so `"sample"` counts as Polish.

use crate::error::{ReviewError, ReviewResult};
use crate::model::TranslationFile;

const PRIMARY_MARKERS: &[&str] = &["en", "english"];
const SECONDARY_MARKERS: &[&str] = &["pl", "polish"];

fn name_matches(file: &TranslationFile, markers: &[&str]) -> bool {
    let lowered = file.name.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}

/// First file whose name contains `en` or `english`.
pub fn find_primary(files: &[TranslationFile]) -> Option<&TranslationFile> {
    files.iter().find(|file| name_matches(file, PRIMARY_MARKERS))
}

/// First file whose name contains `pl` or `polish`.
pub fn find_secondary(files: &[TranslationFile]) -> Option<&TranslationFile> {
    files.iter().find(|file| name_matches(file, SECONDARY_MARKERS))
}

/// Everything that is neither reference, in upload order.
pub fn others<'a>(
    files: &'a [TranslationFile],
    primary: Option<&TranslationFile>,
    secondary: Option<&TranslationFile>,
) -> Vec<&'a TranslationFile> {
    let is_reference = |file: &TranslationFile, reference: Option<&TranslationFile>| {
        reference.is_some_and(|reference| reference.name == file.name)
    };

    files
        .iter()
        .filter(|file| !is_reference(file, primary) && !is_reference(file, secondary))
        .collect()
}

/// The three-way split every analysis and translation run starts from.
#[derive(Debug, Clone, Copy)]
pub struct References<'a> {
    pub secondary: &'a TranslationFile,
    pub primary: Option<&'a TranslationFile>,
}

impl<'a> References<'a> {
    /// Resolves both references, failing when no source-of-truth file exists.
    pub fn resolve(files: &'a [TranslationFile]) -> ReviewResult<Self> {
        let secondary = find_secondary(files).ok_or_else(|| {
            ReviewError::validation(
                "a Polish translation file (name containing \"pl\" or \"polish\") is required as the source of truth",
            )
        })?;
        let primary = find_primary(files).filter(|primary| primary.name != secondary.name);

        Ok(Self { secondary, primary })
    }

    pub fn others(&self, files: &'a [TranslationFile]) -> Vec<&'a TranslationFile> {
        others(files, self.primary, Some(self.secondary))
    }

    pub fn is_reference(&self, language: &str) -> bool {
        self.secondary.name == language
            || self.primary.is_some_and(|primary| primary.name == language)
    }
}
