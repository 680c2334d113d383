//! Submission Aggregator - High-Level Orchestration
//!
//! **Responsibility:**
//! Normalize code, resolve the lesson, run every test case through the judge
//! concurrently, evaluate each result and merge them in input order.
//!
//! This module is the glue layer - it knows nothing about:
//! - How the judge is reached (judge's job)
//! - How outputs are compared (evaluator's job)
//!
//! All cases of one submission are in flight together and joined with
//! `try_join_all`: the first judge failure drops every outstanding call and
//! fails the whole submission, so no partial results ever leave this module.

use crate::decode;
use crate::error::GradeError;
use crate::evaluator;
use crate::judge::{Judge, JudgeSubmission};
use crate::resolver::{self, ResolvedLesson};
use crate::store::LessonStore;
use futures_util::future::try_join_all;
use lessonjudge_common::types::{SubmissionRequest, SubmissionResult, TestCaseResult, TestStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct Grader {
    store: Arc<dyn LessonStore>,
    judge: Arc<dyn Judge>,
    submission_deadline: Option<Duration>,
}

impl Grader {
    pub fn new(store: Arc<dyn LessonStore>, judge: Arc<dyn Judge>) -> Self {
        Self {
            store,
            judge,
            submission_deadline: None,
        }
    }

    /// Bound the whole grading run; None waits as long as the judge takes
    pub fn with_submission_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.submission_deadline = deadline;
        self
    }

    /// Grade one submission
    ///
    /// `base64_encoded` says whether `request.code` is in the front end's
    /// encoded form or already plain source.
    #[instrument(skip(self, request), fields(lesson_id = request.lesson_id))]
    pub async fn grade(
        &self,
        request: &SubmissionRequest,
        base64_encoded: bool,
    ) -> Result<SubmissionResult, GradeError> {
        let source = decode::normalize(&request.code, base64_encoded)?;
        let lesson = resolver::resolve(self.store.as_ref(), request.lesson_id).await?;

        if let Some(requested) = request.language_id {
            if requested != lesson.language_id {
                warn!(
                    requested_language_id = requested,
                    lesson_language_id = lesson.language_id,
                    "Request language differs from the lesson's; grading with the lesson's"
                );
            }
        }

        info!(
            language_id = lesson.language_id,
            test_cases = lesson.cases.len(),
            source_size = source.len(),
            "Grading submission"
        );

        let results = match self.submission_deadline {
            Some(limit) => tokio::time::timeout(limit, self.run_cases(&source, &lesson))
                .await
                .map_err(|_| GradeError::Timeout(limit))??,
            None => self.run_cases(&source, &lesson).await?,
        };

        let result = SubmissionResult::from_results(results);
        info!(
            passed = result.passed_count(),
            total = result.results.len(),
            success = result.success,
            "Submission graded"
        );

        Ok(result)
    }

    async fn run_cases(
        &self,
        source: &str,
        lesson: &ResolvedLesson,
    ) -> Result<Vec<TestCaseResult>, GradeError> {
        let pending = lesson.cases.iter().enumerate().map(|(index, case)| {
            let submission = JudgeSubmission::for_case(source, lesson.language_id, case);
            let judge = Arc::clone(&self.judge);

            async move {
                let judge_result = judge
                    .submit_and_await(&submission)
                    .await
                    .map_err(|source| GradeError::Judge { index, source })?;

                let result = evaluator::evaluate(case, &judge_result);
                debug!(
                    test_index = index,
                    mode = case.mode.name(),
                    status_id = judge_result.status.id,
                    passed = result.status == TestStatus::Passed,
                    "Test case evaluated"
                );
                Ok::<_, GradeError>(result)
            }
        });

        // try_join_all keeps input positions regardless of completion order
        try_join_all(pending).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::encode;
    use crate::error::{JudgeError, NotFoundError};
    use crate::judge::{JudgeResult, JudgeStatus};
    use crate::store::InMemoryLessonStore;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted judge keyed by stdin: (delay, outcome)
    #[derive(Default)]
    struct ScriptedJudge {
        script: HashMap<String, (u64, Result<String, String>)>,
        calls: AtomicUsize,
        seen: Mutex<Vec<JudgeSubmission>>,
    }

    impl ScriptedJudge {
        fn answer(mut self, stdin: &str, delay_ms: u64, stdout: &str) -> Self {
            self.script
                .insert(stdin.to_string(), (delay_ms, Ok(stdout.to_string())));
            self
        }

        fn fail(mut self, stdin: &str, delay_ms: u64) -> Self {
            self.script
                .insert(stdin.to_string(), (delay_ms, Err("judge down".to_string())));
            self
        }
    }

    #[async_trait]
    impl Judge for ScriptedJudge {
        async fn submit_and_await(&self, submission: &JudgeSubmission) -> Result<JudgeResult, JudgeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(submission.clone());

            let (delay, outcome) = self
                .script
                .get(&submission.stdin)
                .cloned()
                .unwrap_or((0, Ok(String::new())));
            tokio::time::sleep(Duration::from_millis(delay)).await;

            match outcome {
                Ok(stdout) => Ok(JudgeResult {
                    status: JudgeStatus {
                        id: 3,
                        description: "Accepted".to_string(),
                    },
                    stdout: Some(stdout),
                    stderr: Some(String::new()),
                    compile_output: None,
                    message: None,
                    time: None,
                    memory: None,
                }),
                Err(message) => Err(JudgeError::Transport(message)),
            }
        }
    }

    fn store(lesson_id: i64, test_cases: Value) -> Arc<InMemoryLessonStore> {
        Arc::new(
            InMemoryLessonStore::new()
                .with_course(1, 71)
                .with_lesson(lesson_id, 1, test_cases),
        )
    }

    fn request(lesson_id: i64, source: &str) -> SubmissionRequest {
        SubmissionRequest {
            lesson_id,
            code: encode(source),
            language_id: Some(71),
        }
    }

    #[tokio::test]
    async fn test_hello_world_end_to_end() {
        let judge = Arc::new(ScriptedJudge::default().answer("", 0, "Hello\n"));
        let grader = Grader::new(
            store(
                42,
                json!([{"input": "", "expectedOutput": "Hello\n", "autoDetect": false, "usePattern": false}]),
            ),
            judge.clone(),
        );

        let result = grader.grade(&request(42, "print('Hello')"), true).await.unwrap();

        assert!(result.success);
        assert_eq!(result.results.len(), 1);
        let case = &result.results[0];
        assert_eq!(case.input, "");
        assert_eq!(case.expected_output, "Hello");
        assert_eq!(case.actual_output, "Hello");
        assert_eq!(case.status, TestStatus::Passed);
        assert_eq!(case.error, None);

        let seen = judge.seen.lock().unwrap();
        assert_eq!(seen[0].source_code, "print('Hello')");
        assert_eq!(seen[0].language_id, 71);
        assert_eq!(seen[0].expected_output.as_deref(), Some("Hello\n"));
    }

    #[tokio::test]
    async fn test_results_keep_input_order_when_judge_finishes_out_of_order() {
        // First case is the slowest, last case the fastest
        let judge = Arc::new(
            ScriptedJudge::default()
                .answer("1", 60, "1")
                .answer("2", 30, "4")
                .answer("3", 0, "9"),
        );
        let grader = Grader::new(
            store(
                3,
                json!([
                    {"input": "1", "expectedOutput": "1"},
                    {"input": "2", "expectedOutput": "4"},
                    {"input": "3", "expectedOutput": "9"}
                ]),
            ),
            judge.clone(),
        );

        let result = grader.grade(&request(3, "print(n*n)"), true).await.unwrap();

        let inputs: Vec<&str> = result.results.iter().map(|r| r.input.as_str()).collect();
        assert_eq!(inputs, vec!["1", "2", "3"]);
        let outputs: Vec<&str> = result.results.iter().map(|r| r.actual_output.as_str()).collect();
        assert_eq!(outputs, vec!["1", "4", "9"]);
        assert!(result.success);
        assert_eq!(judge.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cases_run_concurrently() {
        let judge = Arc::new(
            ScriptedJudge::default()
                .answer("a", 150, "a")
                .answer("b", 150, "b")
                .answer("c", 150, "c"),
        );
        let grader = Grader::new(
            store(
                4,
                json!([
                    {"input": "a", "autoDetect": true},
                    {"input": "b", "autoDetect": true},
                    {"input": "c", "autoDetect": true}
                ]),
            ),
            judge,
        );

        let started = std::time::Instant::now();
        grader.grade(&request(4, "echo"), true).await.unwrap();

        // Sequential would take at least 450ms
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_single_failed_case_fails_submission() {
        let judge = Arc::new(
            ScriptedJudge::default()
                .answer("heads", 0, "Heads")
                .answer("sum", 0, "5"),
        );
        let grader = Grader::new(
            store(
                5,
                json!([
                    {"input": "heads", "usePattern": true, "pattern": "Heads|Tails"},
                    {"input": "sum", "expectedOutput": "4"}
                ]),
            ),
            judge,
        );

        let result = grader.grade(&request(5, "code"), true).await.unwrap();

        assert!(!result.success);
        assert_eq!(result.results[0].status, TestStatus::Passed);
        assert_eq!(result.results[1].status, TestStatus::Failed);
    }

    #[tokio::test]
    async fn test_missing_test_cases_fail_before_judging() {
        let judge = Arc::new(ScriptedJudge::default());
        let grader = Grader::new(store(7, Value::Null), judge.clone());

        let err = grader.grade(&request(7, "print(1)"), true).await.unwrap_err();

        assert!(matches!(err, GradeError::NotFound(NotFoundError::TestCases(7))));
        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_judge_failure_fails_whole_submission() {
        let judge = Arc::new(
            ScriptedJudge::default()
                .answer("ok", 0, "1")
                .fail("boom", 10),
        );
        let grader = Grader::new(
            store(
                6,
                json!([
                    {"input": "ok", "expectedOutput": "1"},
                    {"input": "boom", "expectedOutput": "1"}
                ]),
            ),
            judge,
        );

        match grader.grade(&request(6, "code"), true).await.unwrap_err() {
            GradeError::Judge { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(source, JudgeError::Transport(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_undecodable_code_is_rejected_before_lookup() {
        let judge = Arc::new(ScriptedJudge::default());
        let grader = Grader::new(Arc::new(InMemoryLessonStore::new()), judge.clone());

        let bad = SubmissionRequest {
            lesson_id: 1,
            code: "%%% not base64".to_string(),
            language_id: None,
        };
        let err = grader.grade(&bad, true).await.unwrap_err();

        assert!(matches!(err, GradeError::Decode(_)));
        assert_eq!(err.stage(), "decode");
        assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_plain_code_is_used_as_is() {
        let judge = Arc::new(ScriptedJudge::default().answer("", 0, "7"));
        let grader = Grader::new(store(8, json!([{"expectedOutput": "7"}])), judge.clone());

        let plain = SubmissionRequest {
            lesson_id: 8,
            code: "print(7)".to_string(),
            language_id: None,
        };
        let result = grader.grade(&plain, false).await.unwrap();

        assert!(result.success);
        assert_eq!(judge.seen.lock().unwrap()[0].source_code, "print(7)");
    }

    #[tokio::test]
    async fn test_lesson_language_wins_over_request_language() {
        let judge = Arc::new(ScriptedJudge::default().answer("", 0, "x"));
        let grader = Grader::new(store(9, json!([{"autoDetect": true}])), judge.clone());

        let mut mismatched = request(9, "x");
        mismatched.language_id = Some(62);
        grader.grade(&mismatched, true).await.unwrap();

        assert_eq!(judge.seen.lock().unwrap()[0].language_id, 71);
    }

    #[tokio::test]
    async fn test_submission_deadline() {
        let judge = Arc::new(ScriptedJudge::default().answer("", 500, "late"));
        let grader = Grader::new(store(10, json!([{"autoDetect": true}])), judge)
            .with_submission_deadline(Some(Duration::from_millis(50)));

        let err = grader.grade(&request(10, "sleep"), true).await.unwrap_err();

        assert!(matches!(err, GradeError::Timeout(_)));
        assert!(err.is_timeout());
    }
}
