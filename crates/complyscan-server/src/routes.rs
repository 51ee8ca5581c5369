//! HTTP routes and handlers

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use complyscan_core::Error;
use complyscan_store::{Assessment, SqliteStore};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::analyzer::{
    Analysis, Analyzer, INFERENCE_FAILURE_MESSAGE, INPUT_REQUIRED_MESSAGE,
    INTERNAL_ERROR_MESSAGE, TIMEOUT_MESSAGE,
};
use crate::static_files;

/// Sample row written by `/test_database`
pub const SAMPLE_INPUT: &str = "这是一个测试输入";
pub const SAMPLE_ISSUE: &str = "测试问题";
pub const SAMPLE_REGULATION: &str = "测试法规";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,

    /// Durable store, when one is configured
    pub database: Option<SqliteStore>,

    /// Prometheus exporter handle for `/metrics`
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(analyzer: Arc<Analyzer>) -> Self {
        Self {
            analyzer,
            database: None,
            metrics: None,
        }
    }

    pub fn with_database(mut self, database: SqliteStore) -> Self {
        self.database = Some(database);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(static_files::index))
        .route("/static/*path", get(static_files::serve_static))
        .route("/analyze", post(analyze))
        .route("/test_database", get(test_database))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

async fn metrics(State(state): State<AppState>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}

/// `POST /analyze` with body `{"input": "..."}`
async fn analyze(State(state): State<AppState>, body: Bytes) -> Result<Response, AppError> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("analyze", %request_id);

    async move {
        metrics::counter!("complyscan_requests_total").increment(1);

        let input = extract_input(&body)?;
        info!("Received input of {} chars", input.chars().count());

        match state.analyzer.analyze(&input).await? {
            Analysis::Completed(report) => {
                info!(
                    cached = report.cached,
                    issues = report.identified_issues.len(),
                    "Analysis completed"
                );
                Ok(Json(report).into_response())
            }
            Analysis::Failed { message } => Err(AppError::Inference(message)),
        }
    }
    .instrument(span)
    .await
}

/// Non-empty (after trim) string under `input`
fn extract_input(body: &[u8]) -> complyscan_core::Result<String> {
    let value: Value = serde_json::from_slice(body).map_err(|e| {
        warn!("Rejected request body: {}", e);
        Error::validation(format!("request body is not JSON: {}", e))
    })?;

    match value.get("input").and_then(Value::as_str) {
        Some(input) if !input.trim().is_empty() => Ok(input.to_string()),
        _ => {
            warn!("No input provided");
            Err(Error::validation("missing or blank `input`"))
        }
    }
}

/// `GET /test_database`: round-trip a fixed sample through the durable store
async fn test_database(State(state): State<AppState>) -> Response {
    let Some(database) = state.database.as_ref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "success": false,
                "error": "no database configured, set DATABASE_URL to enable the durable store",
            })),
        )
            .into_response();
    };

    match round_trip_sample(database).await {
        Ok(assessment) => Json(json!({
            "success": true,
            "retrieved_assessment": assessment,
        }))
        .into_response(),
        Err(e) => {
            error!("Database round trip failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn round_trip_sample(database: &SqliteStore) -> complyscan_core::Result<Assessment> {
    database
        .add(
            SAMPLE_INPUT,
            &[SAMPLE_ISSUE.to_string()],
            &[SAMPLE_REGULATION.to_string()],
        )
        .await?;

    database
        .get_by_input(SAMPLE_INPUT)
        .await?
        .ok_or_else(|| Error::store("sample assessment missing after insert"))
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    InputRequired,
    Inference(String),
    Timeout,
    Internal(Error),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(_) => AppError::InputRequired,
            Error::Timeout(_) => AppError::Timeout,
            other => AppError::Internal(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::InputRequired => (StatusCode::BAD_REQUEST, INPUT_REQUIRED_MESSAGE.to_string()),
            AppError::Inference(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
            AppError::Timeout => (StatusCode::REQUEST_TIMEOUT, TIMEOUT_MESSAGE.to_string()),
            AppError::Internal(err) => {
                error!("Error during analysis: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_input() {
        assert_eq!(
            extract_input(r#"{"input": "公司账目"}"#.as_bytes()).unwrap(),
            "公司账目"
        );
        assert!(matches!(
            extract_input(br#"{"input": "   "}"#),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            extract_input(br#"{"input": 42}"#),
            Err(Error::Validation(_))
        ));
        assert!(matches!(extract_input(b"{}"), Err(Error::Validation(_))));

        let err = extract_input(b"not json").unwrap_err();
        assert!(matches!(AppError::from(err), AppError::InputRequired));
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: AppError| e.into_response().status();
        assert_eq!(status(Error::validation("x").into()), StatusCode::BAD_REQUEST);
        assert_eq!(status(Error::Timeout(30).into()), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            status(Error::store("disk full").into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status(AppError::Inference(INFERENCE_FAILURE_MESSAGE.to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
