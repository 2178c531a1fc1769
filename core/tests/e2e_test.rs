//! End-to-end tests for the review workflow
//!
//! 1. Upload of loose files and ZIP archives
//! 2. Concurrent analysis against a model client
//! 3. Applying suggestions
//! 4. Download and re-upload

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use translation_reviewer_core::{
    apply_all, pending_suggestions, read_upload, read_zip, Analyzer, AuthFailure, BundleError,
    Evaluation, ModelClient, ModelError, ModelRequest, ReviewError, ReviewerConfig, Session,
};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const FIXTURE_PL: &str = include_str!("fixtures/pl.json");
const FIXTURE_EN: &str = include_str!("fixtures/en.json");
const FIXTURE_DE: &str = include_str!("fixtures/de.json");
const FIXTURE_CONTEXT: &str = include_str!("fixtures/context.json");

/// Answers every analysis with a fixed verdict per language.
struct FixtureClient;

#[async_trait]
impl ModelClient for FixtureClient {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError> {
        if !request.prompt.contains("`toolbar.save`") {
            return Err(ModelError::EmptyResponse);
        }
        Ok(json!({
            "analysis": [
                { "language": "pl", "evaluation": "Good", "feedback": "Source text." },
                { "language": "en", "evaluation": "Good", "feedback": "Accurate." },
                {
                    "language": "de",
                    "evaluation": "Needs Improvement",
                    "feedback": "\"Speichern unter\" means \"save as\".",
                    "suggestion": "Sichern"
                }
            ]
        })
        .to_string())
    }
}

fn upload() -> Vec<(String, Vec<u8>)> {
    [
        ("pl.json", FIXTURE_PL),
        ("en.json", FIXTURE_EN),
        ("de.json", FIXTURE_DE),
        ("context.json", FIXTURE_CONTEXT),
    ]
    .into_iter()
    .map(|(name, content)| (name.to_string(), content.as_bytes().to_vec()))
    .collect()
}

#[tokio::test]
async fn test_e2e_review_and_apply_suggestion() {
    let bundle = read_upload(upload()).expect("fixtures form a valid upload");
    let mut session = Session::from_bundle(bundle);

    assert_eq!(
        session.keys(),
        vec!["dialog.title", "toolbar.open", "toolbar.save"]
    );
    assert_eq!(session.missing_languages("dialog.title"), vec!["de"]);

    let analyzer = Analyzer::new(Arc::new(FixtureClient), "test-model");
    let batch = analyzer
        .analyze_all(&session, &["toolbar.save".to_string(), "toolbar.open".to_string()])
        .await
        .expect("batch runs");

    assert!(batch.results["toolbar.open"].error.is_some());
    let items = batch.results["toolbar.save"].result.clone().expect("save analysed");
    let languages: Vec<&str> = items.iter().map(|item| item.language.as_str()).collect();
    assert_eq!(languages, vec!["pl", "en", "de"]);

    assert!(session.accept_analysis_batch(batch));

    let pending = pending_suggestions(&session, "toolbar.save");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].suggestion, "Sichern");
    assert_eq!(apply_all(&mut session, &pending).unwrap(), 1);

    assert_eq!(session.text("de", "toolbar.save").as_deref(), Some("Sichern"));
    assert_eq!(session.history()["toolbar.save"]["de"], "Sichern");
    let verdict = &session.analysis("toolbar.save").unwrap().result.as_ref().unwrap()[2];
    assert_eq!(verdict.evaluation, Evaluation::Good);
    assert!(verdict.suggestion.is_none());

    let archive = session.download_zip().expect("download builds");
    let restored = read_zip(&archive).expect("download re-uploads");
    let de = restored.files.iter().find(|file| file.name == "de").unwrap();
    assert_eq!(de.text("toolbar.save").as_deref(), Some("Sichern"));
    assert_eq!(restored.history["toolbar.save"]["de"], "Sichern");
    assert_eq!(restored.context.len(), 2);
}

#[test]
fn test_e2e_empty_context_is_rejected() {
    let mut files = upload();
    files.retain(|(name, _)| name != "context.json");
    files.push(("context.json".to_string(), b"{}".to_vec()));

    let error = read_upload(files).unwrap_err();
    assert!(matches!(error, BundleError::MissingContext));
    assert!(matches!(ReviewError::from(error), ReviewError::Validation(_)));
}

#[tokio::test]
async fn test_e2e_permission_denied_is_reported_per_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string(
            r#"{"error":{"code":403,"message":"Method doesn't allow unregistered callers.","status":"PERMISSION_DENIED"}}"#,
        ))
        .mount(&server)
        .await;

    let config = ReviewerConfig {
        endpoint: server.uri(),
        api_key: Some("restricted".into()),
        ..ReviewerConfig::default()
    };
    let analyzer = Analyzer::from_config(&config).unwrap();
    let session = Session::from_bundle(read_upload(upload()).unwrap());

    let batch = analyzer
        .analyze_key(&session, "toolbar.save")
        .await
        .unwrap();
    assert_eq!(
        batch.results["toolbar.save"].error.as_deref(),
        Some(AuthFailure::PermissionDenied.message())
    );
}

#[tokio::test]
async fn test_e2e_missing_api_key_blocks_analysis() {
    let analyzer = Analyzer::from_config(&ReviewerConfig::default()).unwrap();
    let session = Session::from_bundle(read_upload(upload()).unwrap());

    let error = analyzer
        .analyze_key(&session, "toolbar.save")
        .await
        .unwrap_err();
    assert!(matches!(error, ReviewError::Configuration(_)));
}
