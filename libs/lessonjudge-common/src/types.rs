use serde::{Deserialize, Deserializer, Serialize};

/// One grading rule as an instructor authored it on a lesson.
///
/// This is the stored JSON shape (camelCase, three independent flags). The
/// grading pipeline never branches on the flags directly: it converts each
/// spec into a [`GradingCase`] whose [`ComparisonMode`] names exactly one mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseSpec {
    #[serde(default, deserialize_with = "null_as_default")]
    pub input: String,
    #[serde(default)]
    pub expected_output: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub auto_detect: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub use_pattern: bool,
    #[serde(default)]
    pub pattern: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// How a test case's stdout is judged
///
/// Precedence when the stored flags overlap: AutoDetect, then Pattern, then Exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonMode {
    /// Trimmed stdout must equal the trimmed expected output
    Exact { expected_output: String },
    /// Any stdout is accepted as long as execution did not error
    AutoDetect,
    /// Trimmed stdout must equal one of the trimmed alternatives
    Pattern { alternatives: Vec<String> },
}

impl ComparisonMode {
    pub fn name(&self) -> &'static str {
        match self {
            ComparisonMode::Exact { .. } => "exact",
            ComparisonMode::AutoDetect => "auto_detect",
            ComparisonMode::Pattern { .. } => "pattern",
        }
    }
}

/// A validated test case: the stored spec plus its single active mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingCase {
    pub spec: TestCaseSpec,
    pub mode: ComparisonMode,
}

impl GradingCase {
    /// Pick the active mode for a stored spec and check it carries the
    /// fields that mode needs.
    pub fn from_spec(spec: TestCaseSpec) -> Result<Self, String> {
        let mode = if spec.auto_detect {
            ComparisonMode::AutoDetect
        } else if spec.use_pattern {
            let pattern = spec.pattern.as_deref().unwrap_or_default();
            let alternatives: Vec<String> = pattern
                .split('|')
                .map(|alternative| alternative.trim().to_string())
                .collect();

            if alternatives.iter().all(|alternative| alternative.is_empty()) {
                return Err("pattern mode requires a non-empty pattern".to_string());
            }

            ComparisonMode::Pattern { alternatives }
        } else {
            match spec.expected_output.as_deref() {
                Some(expected) if !expected.trim().is_empty() => ComparisonMode::Exact {
                    expected_output: expected.to_string(),
                },
                _ => {
                    return Err("exact mode requires a non-empty expectedOutput".to_string());
                }
            }
        };

        Ok(Self { spec, mode })
    }

    /// Expected output sent along to the judge; only meaningful in exact mode
    pub fn judge_expected_output(&self) -> Option<&str> {
        match &self.mode {
            ComparisonMode::Exact { expected_output } => Some(expected_output),
            _ => None,
        }
    }
}

/// One grading invocation as the front end sends it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub lesson_id: i64,
    pub code: String,
    #[serde(default)]
    pub language_id: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
}

/// Per-case outcome returned to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub status: TestStatus,
    pub error: Option<String>,
    pub auto_detect: bool,
    pub use_pattern: bool,
    pub pattern: Option<String>,
}

/// Aggregate response for one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub results: Vec<TestCaseResult>,
    pub success: bool,
}

impl SubmissionResult {
    pub fn from_results(results: Vec<TestCaseResult>) -> Self {
        let success = results.iter().all(|r| r.status == TestStatus::Passed);
        Self { results, success }
    }

    pub fn passed_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == TestStatus::Passed)
            .count()
    }
}
