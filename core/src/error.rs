use thiserror::Error;

use crate::ai::ModelError;
use crate::bundle::BundleError;

pub type ReviewResult<T> = Result<T, ReviewError>;

/// Provider-side credential rejection, split so the UI can tell the user what to fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidKey,
    PermissionDenied,
}

impl AuthFailure {
    pub fn message(&self) -> &'static str {
        match self {
            AuthFailure::InvalidKey => {
                "The API key is not valid. Check the key in the settings and try again."
            }
            AuthFailure::PermissionDenied => {
                "The API key was rejected (permission denied). Make sure the key has access to the selected model."
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("{}", .0.message())]
    Auth(AuthFailure),
    #[error("analysis failed: {0}")]
    Analysis(String),
}

impl ReviewError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    /// Stable code the frontend uses to pick an alert style.
    pub fn code(&self) -> &'static str {
        match self {
            ReviewError::Validation(_) => "VALIDATION",
            ReviewError::Configuration(_) => "CONFIGURATION",
            ReviewError::Auth(AuthFailure::InvalidKey) => "AUTH_INVALID_KEY",
            ReviewError::Auth(AuthFailure::PermissionDenied) => "AUTH_PERMISSION_DENIED",
            ReviewError::Analysis(_) => "ANALYSIS",
        }
    }
}

/// Maps a client failure onto the review taxonomy.
///
/// Credential problems are detected by substring on the rendered error, the
/// same way the provider reports them in free text.
pub fn classify_model_error(error: ModelError) -> ReviewError {
    if let ModelError::MissingApiKey = error {
        return ReviewError::Configuration("no API key configured".into());
    }

    let rendered = error.to_string();
    if rendered.to_lowercase().contains("api key not valid") {
        return ReviewError::Auth(AuthFailure::InvalidKey);
    }
    if rendered.contains("PERMISSION_DENIED") || rendered.contains("403") {
        return ReviewError::Auth(AuthFailure::PermissionDenied);
    }

    ReviewError::Analysis(rendered)
}

impl From<BundleError> for ReviewError {
    fn from(error: BundleError) -> Self {
        ReviewError::Validation(error.to_string())
    }
}
