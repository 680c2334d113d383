//! Judge Client - submit-then-poll against an external Judge0 instance
//!
//! **Protocol:**
//! 1. POST /submissions → token
//! 2. GET /submissions/{token} every poll interval until status.id >= 3
//! 3. Hand the terminal payload back untouched (apart from transport decoding)
//!
//! **Not done here:**
//! - Retries: transport failures propagate immediately
//! - Verdicts: the judge's own accepted/wrong-answer taxonomy is ignored,
//!   the evaluator decides pass/fail
//!
//! Polling is unbounded unless `max_poll_attempts` or `call_timeout` is set.

use crate::error::JudgeError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Method, Request, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use lessonjudge_common::config::{Config, JudgeTransport};
use lessonjudge_common::types::GradingCase;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Judge0 status ids below this are still queued or running
pub const FIRST_TERMINAL_STATUS: u32 = 3;

/// Payload for exactly one test case
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeSubmission {
    pub source_code: String,
    pub language_id: u32,
    pub stdin: String,
    pub expected_output: Option<String>,
}

impl JudgeSubmission {
    pub fn for_case(source_code: &str, language_id: u32, case: &GradingCase) -> Self {
        Self {
            source_code: source_code.to_string(),
            language_id,
            stdin: case.spec.input.clone(),
            expected_output: case.judge_expected_output().map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JudgeStatus {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

impl JudgeStatus {
    pub fn is_terminal(&self) -> bool {
        self.id >= FIRST_TERMINAL_STATUS
    }
}

/// Final judge payload with output fields already in plain text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeResult {
    pub status: JudgeStatus,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub message: Option<String>,
    pub time: Option<String>,
    pub memory: Option<u64>,
}

/// Anything that can run one submission to a terminal status
#[async_trait]
pub trait Judge: Send + Sync {
    async fn submit_and_await(&self, submission: &JudgeSubmission) -> Result<JudgeResult, JudgeError>;
}

#[derive(Debug, Clone)]
pub struct JudgeClientConfig {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub transport: JudgeTransport,
    pub poll_interval: Duration,
    pub max_poll_attempts: Option<u32>,
    pub call_timeout: Option<Duration>,
}

impl JudgeClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
            transport: JudgeTransport::Base64,
            poll_interval: Duration::from_secs(2),
            max_poll_attempts: None,
            call_timeout: None,
        }
    }
}

impl From<&Config> for JudgeClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.judge_url.clone(),
            auth_token: config.judge_auth_token.clone(),
            transport: config.judge_transport,
            poll_interval: config.poll_interval,
            max_poll_attempts: config.max_poll_attempts,
            call_timeout: config.judge_call_timeout,
        }
    }
}

#[derive(Serialize)]
struct WireSubmission {
    source_code: String,
    language_id: u32,
    stdin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected_output: Option<String>,
}

#[derive(Deserialize)]
struct CreatedSubmission {
    token: String,
}

#[derive(Deserialize)]
struct WireResult {
    status: JudgeStatus,
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    message: Option<String>,
    time: Option<String>,
    memory: Option<u64>,
}

fn encode_field(transport: JudgeTransport, value: &str) -> String {
    match transport {
        JudgeTransport::Plain => value.to_string(),
        JudgeTransport::Base64 => general_purpose::STANDARD.encode(value),
    }
}

/// Judge0 wraps base64 output at 60 columns; strip that before decoding.
/// Output bytes are not guaranteed UTF-8, so decoding is lossy.
fn decode_field(transport: JudgeTransport, value: Option<String>) -> Result<Option<String>, JudgeError> {
    let Some(value) = value else {
        return Ok(None);
    };

    match transport {
        JudgeTransport::Plain => Ok(Some(value)),
        JudgeTransport::Base64 => {
            let compact: String = value.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            let bytes = general_purpose::STANDARD
                .decode(compact.as_bytes())
                .map_err(|e| JudgeError::Malformed(format!("output field is not base64: {}", e)))?;
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
    }
}

impl WireSubmission {
    fn new(submission: &JudgeSubmission, transport: JudgeTransport) -> Self {
        Self {
            source_code: encode_field(transport, &submission.source_code),
            language_id: submission.language_id,
            stdin: encode_field(transport, &submission.stdin),
            expected_output: submission
                .expected_output
                .as_deref()
                .map(|expected| encode_field(transport, expected)),
        }
    }
}

impl WireResult {
    fn into_result(self, transport: JudgeTransport) -> Result<JudgeResult, JudgeError> {
        Ok(JudgeResult {
            status: self.status,
            stdout: decode_field(transport, self.stdout)?,
            stderr: decode_field(transport, self.stderr)?,
            compile_output: decode_field(transport, self.compile_output)?,
            message: decode_field(transport, self.message)?,
            time: self.time,
            memory: self.memory,
        })
    }
}

/// HTTP client for a Judge0 deployment reachable over plain http
pub struct Judge0Client {
    http: Client<HttpConnector, Full<Bytes>>,
    config: JudgeClientConfig,
}

impl Judge0Client {
    pub fn new(config: JudgeClientConfig) -> Self {
        let http = Client::builder(TokioExecutor::new()).build_http();
        Self { http, config }
    }

    async fn send(&self, method: Method, uri: String, body: Option<Vec<u8>>) -> Result<Bytes, JudgeError> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACCEPT, "application/json");
        if body.is_some() {
            builder = builder.header(CONTENT_TYPE, "application/json");
        }
        if let Some(token) = &self.config.auth_token {
            builder = builder.header("X-Auth-Token", token.as_str());
        }

        let request = builder
            .body(Full::new(Bytes::from(body.unwrap_or_default())))
            .map_err(|e| JudgeError::Transport(format!("invalid judge request: {}", e)))?;

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| JudgeError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| JudgeError::Transport(e.to_string()))?
            .to_bytes();

        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Err(JudgeError::PayloadTooLarge {
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        if !status.is_success() {
            return Err(JudgeError::Upstream {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        Ok(bytes)
    }

    /// POST the submission and return the judge's token
    pub async fn submit(&self, submission: &JudgeSubmission) -> Result<String, JudgeError> {
        let transport = self.config.transport;
        let payload = serde_json::to_vec(&WireSubmission::new(submission, transport))?;
        let uri = format!(
            "{}/submissions?base64_encoded={}&wait=false",
            self.config.base_url,
            transport.is_base64()
        );

        let bytes = self.send(Method::POST, uri, Some(payload)).await?;
        let created: CreatedSubmission = serde_json::from_slice(&bytes)?;

        debug!(
            token = %created.token,
            language_id = submission.language_id,
            "Submission accepted by judge"
        );
        Ok(created.token)
    }

    /// Fetch the current state of a submission once
    pub async fn fetch(&self, token: &str) -> Result<JudgeResult, JudgeError> {
        let transport = self.config.transport;
        let uri = format!(
            "{}/submissions/{}?base64_encoded={}",
            self.config.base_url,
            token,
            transport.is_base64()
        );

        let bytes = self.send(Method::GET, uri, None).await?;
        let wire: WireResult = serde_json::from_slice(&bytes)?;
        wire.into_result(transport)
    }

    /// Poll until the judge reports a terminal status
    pub async fn await_terminal(&self, token: &str) -> Result<JudgeResult, JudgeError> {
        let mut attempts = 0u32;

        loop {
            let result = self.fetch(token).await?;
            attempts += 1;

            if result.status.is_terminal() {
                debug!(
                    token,
                    attempts,
                    status_id = result.status.id,
                    status = %result.status.description,
                    "Judge finished"
                );
                return Ok(result);
            }

            if let Some(max) = self.config.max_poll_attempts {
                if attempts >= max {
                    warn!(token, attempts, "Giving up on judge submission");
                    return Err(JudgeError::PollLimitReached {
                        token: token.to_string(),
                        attempts,
                    });
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn run(&self, submission: &JudgeSubmission) -> Result<JudgeResult, JudgeError> {
        let token = self.submit(submission).await?;
        self.await_terminal(&token).await
    }
}

#[async_trait]
impl Judge for Judge0Client {
    async fn submit_and_await(&self, submission: &JudgeSubmission) -> Result<JudgeResult, JudgeError> {
        match self.config.call_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(submission))
                .await
                .map_err(|_| JudgeError::Timeout(limit))?,
            None => self.run(submission).await,
        }
    }
}
