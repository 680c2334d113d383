// Prometheus metrics for grading runs

use lazy_static::lazy_static;
use lessonjudge_common::types::{SubmissionResult, TestStatus};
use prometheus::{
    register_histogram, register_int_counter_vec, Encoder, Histogram, IntCounterVec, TextEncoder,
};

lazy_static! {
    /// Grading runs by outcome: passed, failed, or <stage>_error
    pub static ref GRADING_RUNS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lessonjudge_grading_runs_total",
        "Grading runs by outcome",
        &["outcome"]
    )
    .expect("grading runs counter registers once");

    pub static ref GRADING_DURATION_SECONDS: Histogram = register_histogram!(
        "lessonjudge_grading_duration_seconds",
        "Wall time of one grading run, judge polling included",
        vec![0.5, 1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0]
    )
    .expect("grading duration histogram registers once");

    pub static ref TEST_CASES_TOTAL: IntCounterVec = register_int_counter_vec!(
        "lessonjudge_test_cases_total",
        "Graded test cases by status",
        &["status"]
    )
    .expect("test case counter registers once");
}

pub fn record_graded(result: &SubmissionResult) {
    let outcome = if result.success { "passed" } else { "failed" };
    GRADING_RUNS_TOTAL.with_label_values(&[outcome]).inc();

    for case in &result.results {
        let status = match case.status {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
        };
        TEST_CASES_TOTAL.with_label_values(&[status]).inc();
    }
}

pub fn record_error(stage: &str) {
    let outcome = format!("{}_error", stage);
    GRADING_RUNS_TOTAL.with_label_values(&[outcome.as_str()]).inc();
}

/// Render every registered metric in the text exposition format
pub fn render() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}
