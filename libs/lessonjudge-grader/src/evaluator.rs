//! Result Evaluator - Mode-Aware Verdict Logic
//!
//! **Core Responsibility:**
//! Reduce one terminal judge payload plus one test case into Passed/Failed.
//!
//! **Critical Properties:**
//! - Knows nothing about HTTP or the judge wire format
//! - Knows nothing about lesson storage
//! - Pure function: (test case, judge result) → TestCaseResult
//!
//! **Comparison Rules (first match wins):**
//! - AutoDetect: passed iff stderr is empty or absent; stdout is accepted as is
//! - Pattern: trimmed stdout equals one of the trimmed alternatives
//! - Exact: literal `\n` in the expected text becomes a newline, both sides
//!   trimmed, then compared
//!
//! **Normalization Rules:**
//! - Trim leading/trailing whitespace: YES
//! - Case sensitivity: YES (exact match required)
//! - Internal whitespace: preserved

use crate::judge::JudgeResult;
use lessonjudge_common::types::{ComparisonMode, GradingCase, TestCaseResult, TestStatus};

/// Normalize output string for comparison
fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Instructors often type `\n` literally into the expected-output field
fn unescape_newlines(expected: &str) -> String {
    expected.replace("\\n", "\n")
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}

/// Error text reported for a run: stderr, else compiler output.
/// Only stderr decides an AutoDetect verdict; the judge status never does.
pub fn execution_error(result: &JudgeResult) -> Option<String> {
    non_empty(result.stderr.as_deref())
        .or_else(|| non_empty(result.compile_output.as_deref()))
        .map(str::to_string)
}

/// Evaluate a single test case against its terminal judge result
pub fn evaluate(case: &GradingCase, result: &JudgeResult) -> TestCaseResult {
    let actual = normalize_output(result.stdout.as_deref().unwrap_or_default());
    let error = execution_error(result);

    let passed = match &case.mode {
        ComparisonMode::AutoDetect => non_empty(result.stderr.as_deref()).is_none(),
        ComparisonMode::Pattern { alternatives } => {
            alternatives.iter().any(|alternative| alternative == actual)
        }
        ComparisonMode::Exact { expected_output } => {
            let expected = unescape_newlines(expected_output);
            normalize_output(&expected) == actual
        }
    };

    let expected_output = case
        .spec
        .expected_output
        .as_deref()
        .map(|expected| normalize_output(&unescape_newlines(expected)).to_string())
        .unwrap_or_default();

    TestCaseResult {
        input: case.spec.input.clone(),
        expected_output,
        actual_output: actual.to_string(),
        status: if passed {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        },
        error,
        auto_detect: case.spec.auto_detect,
        use_pattern: case.spec.use_pattern,
        pattern: case.spec.pattern.clone(),
    }
}
