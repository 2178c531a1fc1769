pub mod ai;
pub mod analysis;
pub mod bulk;
pub mod bundle;
pub mod config;
pub mod error;
pub mod model;
pub mod path;
pub mod prompt;
pub mod reference;
pub mod session;

pub use ai::{GeminiClient, ModelClient, ModelError, ModelRequest};
pub use analysis::{apply_all, apply_suggestion, pending_suggestions, Analyzer, PendingSuggestion};
pub use bulk::{BulkOutcome, BulkProgress, BulkTranslator, KeyFailure};
pub use bundle::{
    download_entries, read_upload, read_zip, suggested_archive_name, write_zip, BundleError,
    UploadBundle,
};
pub use config::{ConfigError, ReviewerConfig};
pub use error::{AuthFailure, ReviewError, ReviewResult};
pub use model::{
    AnalysisItem, ContextMap, Evaluation, Glossary, KeyAnalysis, TranslationFile,
    TranslationGroup, TranslationHistory,
};
pub use reference::References;
pub use session::{AnalysisBatch, BatchTicket, KeyTranslations, Session};
