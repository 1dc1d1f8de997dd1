use crate::{error::ApiError, state::AppState};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    routing::{get, post},
};
use inference::InferenceBackend;
use serde::Serialize;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const UPLOAD_FIELD: &str = "file";

#[derive(Serialize, Debug)]
pub struct DetectResponse {
    pub total_students: usize,
}

pub fn app<B>(state: AppState<B>, max_upload_bytes: usize) -> Router
where
    B: InferenceBackend + Send + 'static,
{
    Router::new()
        .route("/detect_students/", post(detect_students::<B>))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn detect_students<B>(
    State(state): State<AppState<B>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, ApiError>
where
    B: InferenceBackend + Send + 'static,
{
    let started = Instant::now();
    let metrics = state.metrics.clone();

    let result = handle_upload(state, multipart).await;
    match &result {
        Ok(response) => {
            tracing::info!(
                total_students = response.total_students,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Processed upload"
            );
        }
        Err(e) => metrics.record_failure(e.kind()),
    }
    result.map(Json)
}

async fn handle_upload<B>(
    state: AppState<B>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<DetectResponse, ApiError>
where
    B: InferenceBackend + Send + 'static,
{
    let mut multipart = multipart?;
    let bytes = read_file_field(&mut multipart).await?;

    let started = Instant::now();
    let worker_state = state.clone();
    let report = tokio::task::spawn_blocking(move || worker_state.process_upload(&bytes))
        .await
        .map_err(|e| anyhow::anyhow!("Processing task failed: {e}"))??;

    state
        .metrics
        .record_success(started.elapsed().as_secs_f64(), &report);

    if report.skipped > 0 {
        tracing::warn!(skipped = report.skipped, "Some detections produced no crop");
    }

    Ok(DetectResponse {
        total_students: report.count,
    })
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) {
            return Ok(field.bytes().await?.to_vec());
        }
    }
    Err(ApiError::MissingFile)
}
