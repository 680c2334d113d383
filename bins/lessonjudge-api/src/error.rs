// HTTP mapping for grading failures
//
// Expected categories (missing fields, not found, bad encoding) get sanitized
// messages. Judge failures pass the upstream text through in `details` and
// add a hint the learner can act on.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use lessonjudge_grader::{GradeError, JudgeError, NotFoundError};
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    /// lessonId or code absent from the body
    MissingFields,
    /// Body was not the expected JSON
    BadPayload(String),
    Unauthorized,
    /// Any failure inside the grading pipeline
    CodeExecution(GradeError),
}

const HINT_TIMEOUT: &str = "Your code took too long to finish. Check for infinite loops or waiting on input that never arrives.";
const HINT_TOO_LARGE: &str = "Your program produced too much output. Reduce loop iterations or the amount you print.";

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFields | ApiError::BadPayload(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::CodeExecution(e) => grade_status(e),
        }
    }

    fn summary(&self) -> &'static str {
        match self {
            ApiError::MissingFields => "lessonId and code are required",
            ApiError::BadPayload(_) => "Invalid request body",
            ApiError::Unauthorized => "Missing bearer token",
            ApiError::CodeExecution(e) => match e {
                GradeError::Decode(_) => "Could not decode submitted code",
                GradeError::NotFound(NotFoundError::Language(_)) => {
                    "No language configured for this lesson"
                }
                GradeError::NotFound(_) => "Lesson or test cases not found",
                GradeError::InvalidTestCase { .. } => "Lesson has an invalid test case",
                GradeError::Store(_) => "Lesson data is unavailable",
                GradeError::Judge { .. } | GradeError::Timeout(_) => "Code execution failed",
            },
        }
    }

    fn details(&self) -> Option<String> {
        match self {
            ApiError::MissingFields | ApiError::Unauthorized => None,
            ApiError::BadPayload(reason) => Some(reason.clone()),
            // Store failures are internal; keep them in the logs only
            ApiError::CodeExecution(GradeError::Store(_)) => None,
            ApiError::CodeExecution(e) => Some(e.to_string()),
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self.status_code() {
            StatusCode::REQUEST_TIMEOUT => Some(HINT_TIMEOUT),
            StatusCode::PAYLOAD_TOO_LARGE => Some(HINT_TOO_LARGE),
            _ => None,
        }
    }
}

fn grade_status(error: &GradeError) -> StatusCode {
    match error {
        GradeError::Decode(_) | GradeError::InvalidTestCase { .. } => StatusCode::BAD_REQUEST,
        GradeError::NotFound(NotFoundError::Language(_)) => StatusCode::BAD_REQUEST,
        GradeError::NotFound(_) => StatusCode::NOT_FOUND,
        GradeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        GradeError::Judge {
            source: JudgeError::PayloadTooLarge { .. },
            ..
        } => StatusCode::PAYLOAD_TOO_LARGE,
        e if e.is_timeout() => StatusCode::REQUEST_TIMEOUT,
        GradeError::Judge { .. } | GradeError::Timeout(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "error": self.summary(),
            "details": self.details(),
        });
        if let Some(hint) = self.hint() {
            body["hint"] = json!(hint);
        }

        (self.status_code(), Json(body)).into_response()
    }
}
