//! HTTP surface.
//!
//! - `POST /hackrx/run`: fetch a PDF by URL and answer a list of questions.
//! - `POST /analyze`: multipart upload plus one query; returns the insights
//!   and a rendered report.
//! - `GET /health`: liveness probe.

use crate::service::AnswerService;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use docqa_core::{render_report, Document, PipelineError, ReportFormat};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_OUTPUT_FORMAT: &str = "markdown";
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: AnswerService + 'static,
{
    Router::new()
        .route("/hackrx/run", post(run_batch::<S>))
        .route("/analyze", post(analyze_document::<S>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct RunRequest {
    documents: String,
    questions: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RunResponse {
    answers: Vec<String>,
}

async fn run_batch<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<RunRequest>,
) -> Result<Json<RunResponse>, AppError>
where
    S: AnswerService,
{
    info!(
        document = %request.documents,
        questions = request.questions.len(),
        "batch request"
    );
    let answers = service
        .run_batch(&request.documents, &request.questions)
        .await?;
    Ok(Json(RunResponse { answers }))
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    status: &'static str,
    query: String,
    insights: String,
    report: String,
    format: String,
}

#[derive(Default)]
struct AnalyzeForm {
    document: Option<Document>,
    user_query: Option<String>,
    output_format: Option<String>,
}

async fn read_analyze_form(mut multipart: Multipart) -> Result<AnalyzeForm, AppError> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| AppError::BadRequest(format!("multipart error: {error}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let media_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_MEDIA_TYPE)
                    .to_string();
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|error| AppError::BadRequest(format!("failed to read file: {error}")))?;

                let document = Document::new(bytes.to_vec(), media_type);
                form.document = Some(match file_name {
                    Some(name) => document.with_file_name(name),
                    None => document,
                });
            }
            Some("user_query") => form.user_query = Some(read_text(field).await?),
            Some("output_format") => form.output_format = Some(read_text(field).await?),
            other => warn!(field = ?other, "ignoring unknown multipart field"),
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|error| AppError::BadRequest(format!("invalid form field: {error}")))
}

async fn analyze_document<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError>
where
    S: AnswerService,
{
    let form = read_analyze_form(multipart).await?;
    let document = form
        .document
        .ok_or(AppError::MissingField("file"))?;
    let query = form
        .user_query
        .ok_or(AppError::MissingField("user_query"))?;
    let format = form
        .output_format
        .unwrap_or_else(|| DEFAULT_OUTPUT_FORMAT.to_string());

    info!(
        file_name = ?document.file_name,
        media_type = %document.media_type,
        bytes = document.bytes.len(),
        format = %format,
        "analyze request"
    );

    let insights = service.analyze(document, &query).await?;
    let report = render_report(&insights, &query, ReportFormat::parse_lenient(&format));

    Ok(Json(AnalyzeResponse {
        status: "success",
        query,
        insights,
        report,
        format,
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    MissingField(&'static str),
    Pipeline(PipelineError),
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            Self::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            Self::MissingField(name) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("missing form field: {name}"),
            ),
            Self::Pipeline(PipelineError::Document(error)) if error.is_client_error() => {
                warn!(%error, "rejected document");
                (StatusCode::BAD_REQUEST, error.to_string())
            }
            Self::Pipeline(PipelineError::Document(error)) => {
                error!(%error, "document fetch failed");
                (StatusCode::BAD_GATEWAY, "failed to fetch document".to_string())
            }
            Self::Pipeline(PipelineError::Llm(error)) => {
                error!(%error, "generation call failed");
                (StatusCode::BAD_GATEWAY, "LLM error".to_string())
            }
            Self::Pipeline(PipelineError::Embedding(error)) if error.is_upstream() => {
                error!(%error, "embedding call failed");
                (StatusCode::BAD_GATEWAY, "embedding service error".to_string())
            }
            Self::Pipeline(error) => {
                error!(error = ?error, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
