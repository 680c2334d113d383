use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("code is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("decoded code is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("lesson {0} not found")]
    Lesson(i64),
    #[error("no language id configured for lesson {0}")]
    Language(i64),
    #[error("no test cases stored for lesson {0}")]
    TestCases(i64),
    #[error("test cases stored for lesson {0} are not a list")]
    TestCasesNotList(i64),
    #[error("lesson {0} has an empty test case list")]
    EmptyTestCases(i64),
}

#[derive(Debug, Error)]
#[error("lesson store error: {0}")]
pub struct StoreError(pub String);

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError(err.to_string())
    }
}

/// Failures talking to the external judge. None of these are retried.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("failed to reach judge: {0}")]
    Transport(String),
    #[error("judge responded with HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("judge rejected the submission as too large: {body}")]
    PayloadTooLarge { body: String },
    #[error("unexpected judge response: {0}")]
    Malformed(String),
    #[error("judge submission {token} still processing after {attempts} polls")]
    PollLimitReached { token: String, attempts: u32 },
    #[error("judge call did not finish within {0:?}")]
    Timeout(Duration),
}

impl JudgeError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            JudgeError::Timeout(_) | JudgeError::PollLimitReached { .. }
        )
    }
}

impl From<serde_json::Error> for JudgeError {
    fn from(err: serde_json::Error) -> Self {
        JudgeError::Malformed(err.to_string())
    }
}

/// Everything that can stop a submission from being graded.
/// Any variant aborts the whole submission; there is no partial grading.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error("test case {index} is invalid: {reason}")]
    InvalidTestCase { index: usize, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("judging test case {index} failed: {source}")]
    Judge {
        index: usize,
        #[source]
        source: JudgeError,
    },
    #[error("submission was not graded within {0:?}")]
    Timeout(Duration),
}

impl GradeError {
    /// Pipeline stage the error came from, for logs
    pub fn stage(&self) -> &'static str {
        match self {
            GradeError::Decode(_) => "decode",
            GradeError::NotFound(_) | GradeError::InvalidTestCase { .. } | GradeError::Store(_) => {
                "resolve"
            }
            GradeError::Judge { .. } | GradeError::Timeout(_) => "judge",
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            GradeError::Timeout(_) => true,
            GradeError::Judge { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}
