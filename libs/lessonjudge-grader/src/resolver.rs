//! Test Case Resolver
//!
//! Loads the language id and ordered test cases a lesson is graded with and
//! turns every stored spec into a [`GradingCase`] with exactly one active mode.
//! Any missing or malformed piece stops grading before the judge is contacted.

use crate::error::{GradeError, NotFoundError};
use crate::store::LessonStore;
use lessonjudge_common::types::{GradingCase, TestCaseSpec};
use serde_json::Value;
use tracing::{debug, instrument};

/// Everything the aggregator needs to grade one lesson
#[derive(Debug, Clone)]
pub struct ResolvedLesson {
    pub lesson_id: i64,
    pub language_id: u32,
    pub cases: Vec<GradingCase>,
}

#[instrument(skip(store))]
pub async fn resolve(store: &dyn LessonStore, lesson_id: i64) -> Result<ResolvedLesson, GradeError> {
    if !store.lesson_exists(lesson_id).await? {
        return Err(NotFoundError::Lesson(lesson_id).into());
    }

    let language_id = store
        .language_id_for_lesson(lesson_id)
        .await?
        .ok_or(NotFoundError::Language(lesson_id))?;

    let entries = match store.test_cases(lesson_id).await? {
        None | Some(Value::Null) => return Err(NotFoundError::TestCases(lesson_id).into()),
        Some(Value::Array(entries)) => entries,
        Some(_) => return Err(NotFoundError::TestCasesNotList(lesson_id).into()),
    };

    // Grading needs at least one case; an empty list is never a silent pass
    if entries.is_empty() {
        return Err(NotFoundError::EmptyTestCases(lesson_id).into());
    }

    let cases = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            let spec: TestCaseSpec = serde_json::from_value(entry).map_err(|e| {
                GradeError::InvalidTestCase {
                    index,
                    reason: e.to_string(),
                }
            })?;
            GradingCase::from_spec(spec).map_err(|reason| GradeError::InvalidTestCase { index, reason })
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        lesson_id,
        language_id,
        test_cases = cases.len(),
        "Resolved lesson"
    );

    Ok(ResolvedLesson {
        lesson_id,
        language_id,
        cases,
    })
}
