//! Upload and download bundles.
//!
//! An upload is a set of named JSON blobs, either loose or packed into one ZIP
//! archive. A handful of reserved names carry the auxiliary data; every other
//! `*.json` file is a translation document named after its file stem.

use std::collections::HashSet;
use std::io::{self, Cursor, Read, Write};
use std::path::Path;

use chrono::{DateTime, TimeZone};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use zip::read::ZipArchive;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::model::{ContextMap, Glossary, TranslationFile, TranslationGroup, TranslationHistory};

pub const CONTEXT_FILE: &str = "context.json";
pub const GLOSSARY_FILE: &str = "glossary.json";
pub const HISTORY_FILE: &str = "history.json";
pub const GROUPS_FILE: &str = "groups.json";
pub const APP_CONTEXT_FILE: &str = "app_context.json";

/// Largest decompressed size accepted for one archive entry.
const MAX_ENTRY_BYTES: u64 = 16 * 1024 * 1024;

const RESERVED_FILES: &[&str] = &[
    CONTEXT_FILE,
    GLOSSARY_FILE,
    HISTORY_FILE,
    GROUPS_FILE,
    APP_CONTEXT_FILE,
];

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("{file} is not valid JSON: {source}")]
    Json {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("context.json is missing or empty")]
    MissingContext,

    #[error("no translation files were found")]
    NoTranslationFiles,

    #[error("invalid entry: {0}")]
    InvalidEntry(String),
}

pub type BundleResult<T> = Result<T, BundleError>;

/// Everything a review session is loaded from and saved to.
#[derive(Debug, Clone, Default)]
pub struct UploadBundle {
    pub files: Vec<TranslationFile>,
    pub context: ContextMap,
    pub glossary: Glossary,
    pub history: TranslationHistory,
    pub groups: Vec<TranslationGroup>,
    pub app_context: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppContextFile {
    #[serde(default)]
    context: String,
}

/// Builds a bundle from loose uploads; any `.zip` upload is expanded in place.
pub fn read_upload(entries: Vec<(String, Vec<u8>)>) -> BundleResult<UploadBundle> {
    let mut expanded = Vec::with_capacity(entries.len());
    for (name, bytes) in entries {
        if name.to_lowercase().ends_with(".zip") {
            expanded.extend(zip_entries(&bytes)?);
        } else {
            expanded.push((name, bytes));
        }
    }
    parse_entries(expanded)
}

/// Builds a bundle from a single ZIP archive.
pub fn read_zip(bytes: &[u8]) -> BundleResult<UploadBundle> {
    parse_entries(zip_entries(bytes)?)
}

fn zip_entries(bytes: &[u8]) -> BundleResult<Vec<(String, Vec<u8>)>> {
    read_entries(bytes, MAX_ENTRY_BYTES)
}

/// Reads every file entry, trusting the actual stream rather than the size
/// declared in the archive headers.
fn read_entries(bytes: &[u8], limit: u64) -> BundleResult<Vec<(String, Vec<u8>)>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::with_capacity(archive.len());

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        if name.starts_with("__MACOSX/") {
            continue;
        }

        let mut contents = Vec::with_capacity(entry.size().min(limit) as usize);
        (&mut entry).take(limit + 1).read_to_end(&mut contents)?;
        if contents.len() as u64 > limit {
            return Err(BundleError::InvalidEntry(format!(
                "{name} is larger than {limit} bytes"
            )));
        }
        entries.push((name, contents));
    }

    Ok(entries)
}

fn parse_entries(entries: Vec<(String, Vec<u8>)>) -> BundleResult<UploadBundle> {
    let mut bundle = UploadBundle::default();
    let mut seen_languages = HashSet::new();

    for (raw_name, bytes) in entries {
        let Some(file_name) = Path::new(&raw_name)
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
        else {
            continue;
        };
        if file_name.starts_with("._") || !file_name.to_lowercase().ends_with(".json") {
            debug!("skipping non-JSON upload entry {raw_name}");
            continue;
        }

        let lowered = file_name.to_lowercase();
        match lowered.as_str() {
            CONTEXT_FILE => bundle.context = parse_json(&file_name, &bytes)?,
            GLOSSARY_FILE => bundle.glossary = parse_json(&file_name, &bytes)?,
            HISTORY_FILE => bundle.history = parse_json(&file_name, &bytes)?,
            GROUPS_FILE => {
                let mut groups: Vec<TranslationGroup> = parse_json(&file_name, &bytes)?;
                groups.iter_mut().for_each(TranslationGroup::normalize);
                bundle.groups = groups;
            }
            APP_CONTEXT_FILE => {
                let app_context: AppContextFile = parse_json(&file_name, &bytes)?;
                bundle.app_context = app_context.context;
            }
            _ => {
                let language = file_name[..file_name.len() - ".json".len()].to_string();
                let data: Value = parse_json(&file_name, &bytes)?;
                if !data.is_object() {
                    return Err(BundleError::InvalidEntry(format!(
                        "{file_name} must contain a JSON object"
                    )));
                }
                if !seen_languages.insert(language.clone()) {
                    return Err(BundleError::InvalidEntry(format!(
                        "{file_name} was uploaded more than once"
                    )));
                }
                bundle.files.push(TranslationFile::new(language, data));
            }
        }
    }

    // An empty context map counts as a missing context.json.
    if bundle.context.is_empty() {
        return Err(BundleError::MissingContext);
    }
    if bundle.files.is_empty() {
        return Err(BundleError::NoTranslationFiles);
    }

    info!(
        "loaded upload with {} translation files, {} context entries, {} glossary terms, {} groups",
        bundle.files.len(),
        bundle.context.len(),
        bundle.glossary.len(),
        bundle.groups.len()
    );
    Ok(bundle)
}

fn parse_json<T: DeserializeOwned>(file: &str, bytes: &[u8]) -> BundleResult<T> {
    let content = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    serde_json::from_slice(content).map_err(|source| BundleError::Json {
        file: file.to_string(),
        source,
    })
}

fn pretty<T: Serialize + ?Sized>(file: &str, value: &T) -> BundleResult<String> {
    serde_json::to_string_pretty(value).map_err(|source| BundleError::Json {
        file: file.to_string(),
        source,
    })
}

/// Files a download consists of: every translation plus the non-empty auxiliaries.
pub fn download_entries(bundle: &UploadBundle) -> BundleResult<Vec<(String, String)>> {
    let mut entries = Vec::with_capacity(bundle.files.len() + RESERVED_FILES.len());

    for file in &bundle.files {
        let name = format!("{}.json", file.name);
        let content = pretty(&name, file.data.as_ref())?;
        entries.push((name, content));
    }

    entries.push((CONTEXT_FILE.to_string(), pretty(CONTEXT_FILE, &bundle.context)?));
    if !bundle.glossary.is_empty() {
        entries.push((GLOSSARY_FILE.to_string(), pretty(GLOSSARY_FILE, &bundle.glossary)?));
    }
    if !bundle.history.is_empty() {
        entries.push((HISTORY_FILE.to_string(), pretty(HISTORY_FILE, &bundle.history)?));
    }
    if !bundle.groups.is_empty() {
        entries.push((GROUPS_FILE.to_string(), pretty(GROUPS_FILE, &bundle.groups)?));
    }
    if !bundle.app_context.trim().is_empty() {
        let app_context = AppContextFile {
            context: bundle.app_context.clone(),
        };
        entries.push((APP_CONTEXT_FILE.to_string(), pretty(APP_CONTEXT_FILE, &app_context)?));
    }

    Ok(entries)
}

/// Packs [`download_entries`] into a ZIP archive.
pub fn write_zip(bundle: &UploadBundle) -> BundleResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (name, content) in download_entries(bundle)? {
        writer.start_file(name, options)?;
        writer.write_all(content.as_bytes())?;
    }

    Ok(writer.finish()?.into_inner())
}

/// `translations_YYYYMMDD_HHMMSS.zip`
pub fn suggested_archive_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("translations_{}.zip", now.format("%Y%m%d_%H%M%S"))
}
