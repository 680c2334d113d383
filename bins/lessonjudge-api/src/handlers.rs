// HTTP route handlers for the lessonjudge API

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
};
use lessonjudge_common::types::{SubmissionRequest, SubmissionResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RunParams {
    #[serde(default = "default_base64_encoded")]
    pub base64_encoded: bool,
}

fn default_base64_encoded() -> bool {
    true
}

/// Body as the front end sends it; presence is checked before grading
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunBody {
    pub lesson_id: Option<i64>,
    pub code: Option<String>,
    pub language_id: Option<u32>,
}

impl RunBody {
    fn into_request(self) -> Result<SubmissionRequest, ApiError> {
        match (self.lesson_id, self.code) {
            (Some(lesson_id), Some(code)) if !code.is_empty() => Ok(SubmissionRequest {
                lesson_id,
                code,
                language_id: self.language_id,
            }),
            _ => Err(ApiError::MissingFields),
        }
    }
}

/// POST /run - Grade a submission against its lesson's test cases
pub async fn run_code(
    State(state): State<Arc<AppState>>,
    query: Result<Query<RunParams>, QueryRejection>,
    payload: Result<Json<RunBody>, JsonRejection>,
) -> Result<Json<SubmissionResult>, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::BadPayload(e.body_text()))?;
    let Json(body) = payload.map_err(|e| ApiError::BadPayload(e.body_text()))?;
    let request = body.into_request()?;

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %request_id, lesson_id = request.lesson_id);

    async move {
        let timer = metrics::GRADING_DURATION_SECONDS.start_timer();
        let outcome = state.grader.grade(&request, params.base64_encoded).await;
        timer.observe_duration();

        match outcome {
            Ok(result) => {
                metrics::record_graded(&result);
                info!(success = result.success, "Grading result returned");
                Ok(Json(result))
            }
            Err(e) => {
                error!(stage = e.stage(), error = %e, "Grading failed");
                metrics::record_error(e.stage());
                Err(ApiError::CodeExecution(e))
            }
        }
    }
    .instrument(span)
    .await
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics() -> impl IntoResponse {
    match metrics::render() {
        Ok(text) => (StatusCode::OK, text),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}
