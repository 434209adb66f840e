use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::app::curriculum_store::CurriculumStore;
use crate::app::model::{
    GenerateJourneyRequest, GenerateJourneyResponse, GenerateQuizRequest, GenerateQuizResponse,
    StoredCurriculum,
};
use crate::pipeline::{self, InputError, JourneyRequest, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub store: Option<Arc<dyn CurriculumStore>>,
    /// Cancelled on shutdown; each request runs under a child token.
    pub cancel: CancellationToken,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            store: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CurriculumStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Logs the full chain; clients only see which step failed.
fn internal(context: &str, err: anyhow::Error) -> ApiError {
    tracing::error!(error = %format!("{err:#}"), "{context}");
    ApiError::Internal(format!("{context} failed"))
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/api/generate-journey", post(generate_journey))
        .route("/api/generate-quiz", post(generate_quiz))
        .route("/api/journeys/:curriculum_id", get(get_journey))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn generate_journey(
    State(state): State<AppState>,
    payload: Result<Json<GenerateJourneyRequest>, JsonRejection>,
) -> Result<Json<GenerateJourneyResponse>, ApiError> {
    let Json(body) = payload?;
    let references = body.references.unwrap_or_default();
    let request = JourneyRequest::new(
        &references,
        body.target_module_count,
        body.curriculum_title,
    )?;

    let cancel = state.cancel.child_token();
    let assembled = state
        .pipeline
        .generate_journey(&request, &cancel)
        .await
        .map_err(|err| internal("generate journey", err))?;

    if assembled.is_empty() {
        tracing::warn!(
            termination = assembled.termination.as_str(),
            "no modules generated"
        );
        return Err(ApiError::Internal("failed to generate modules".to_owned()));
    }
    if assembled.is_short() {
        tracing::warn!(
            requested = assembled.requested_count,
            actual = assembled.actual_count,
            termination = assembled.termination.as_str(),
            "curriculum is shorter than requested"
        );
    }

    let mut curriculum_id = None;
    if let Some(store) = &state.store {
        let record = StoredCurriculum::new(
            request.references.iter().map(|r| r.url().to_string()).collect(),
            assembled.clone(),
        );
        store
            .put(&record)
            .await
            .map_err(|err| internal("store curriculum", err))?;
        tracing::info!(curriculum_id = %record.curriculum_id, "stored curriculum");
        curriculum_id = Some(record.curriculum_id);
    }

    Ok(Json(GenerateJourneyResponse {
        assembled,
        curriculum_id,
    }))
}

async fn generate_quiz(
    State(state): State<AppState>,
    payload: Result<Json<GenerateQuizRequest>, JsonRejection>,
) -> Result<Json<GenerateQuizResponse>, ApiError> {
    let Json(body) = payload?;
    let topic = pipeline::validate_topic(body.topic.as_deref())?;

    let cancel = state.cancel.child_token();
    let questions = state
        .pipeline
        .generate_quiz(topic, &cancel)
        .await
        .map_err(|err| internal("generate quiz", err))?;
    Ok(Json(GenerateQuizResponse { questions }))
}

async fn get_journey(
    State(state): State<AppState>,
    Path(curriculum_id): Path<String>,
) -> Result<Json<StoredCurriculum>, ApiError> {
    let curriculum_id = Uuid::parse_str(curriculum_id.trim())
        .map_err(|_| ApiError::BadRequest(format!("invalid curriculum id: {curriculum_id}")))?;

    let Some(store) = &state.store else {
        return Err(ApiError::NotFound("curriculum storage is disabled".to_owned()));
    };
    store
        .get(curriculum_id)
        .await
        .map_err(|err| internal("load curriculum", err))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("curriculum not found: {curriculum_id}")))
}
