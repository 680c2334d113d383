// Lesson store seam: where the resolver reads language ids and test cases from

use crate::error::StoreError;
use async_trait::async_trait;
use lessonjudge_common::redis as keys;
use redis::aio::ConnectionManager;
use serde_json::Value;
use std::collections::HashMap;

/// Read-only view of lesson records needed for grading
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LessonStore: Send + Sync {
    async fn lesson_exists(&self, lesson_id: i64) -> Result<bool, StoreError>;

    /// Language id of the lesson's parent course, if any
    async fn language_id_for_lesson(&self, lesson_id: i64) -> Result<Option<u32>, StoreError>;

    /// Raw stored test-case field; shape is checked by the resolver
    async fn test_cases(&self, lesson_id: i64) -> Result<Option<Value>, StoreError>;
}

/// Redis-backed store shared with the CLI's seeding commands
#[derive(Clone)]
pub struct RedisLessonStore {
    conn: ConnectionManager,
}

impl RedisLessonStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl LessonStore for RedisLessonStore {
    async fn lesson_exists(&self, lesson_id: i64) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        Ok(keys::lesson_exists(&mut conn, lesson_id).await?)
    }

    async fn language_id_for_lesson(&self, lesson_id: i64) -> Result<Option<u32>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(keys::get_language_id_for_lesson(&mut conn, lesson_id).await?)
    }

    async fn test_cases(&self, lesson_id: i64) -> Result<Option<Value>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(keys::get_test_cases(&mut conn, lesson_id).await?)
    }
}

#[derive(Debug, Clone)]
struct StoredLesson {
    course_id: i64,
    test_cases: Value,
}

/// Fixed set of lessons held in memory
///
/// Used for grading against a local test-case file and in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLessonStore {
    courses: HashMap<i64, u32>,
    lessons: HashMap<i64, StoredLesson>,
}

impl InMemoryLessonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_course(mut self, course_id: i64, language_id: u32) -> Self {
        self.courses.insert(course_id, language_id);
        self
    }

    /// `test_cases` is stored verbatim; JSON null reads back as missing
    pub fn with_lesson(mut self, lesson_id: i64, course_id: i64, test_cases: Value) -> Self {
        self.lessons.insert(
            lesson_id,
            StoredLesson {
                course_id,
                test_cases,
            },
        );
        self
    }
}

#[async_trait]
impl LessonStore for InMemoryLessonStore {
    async fn lesson_exists(&self, lesson_id: i64) -> Result<bool, StoreError> {
        Ok(self.lessons.contains_key(&lesson_id))
    }

    async fn language_id_for_lesson(&self, lesson_id: i64) -> Result<Option<u32>, StoreError> {
        Ok(self
            .lessons
            .get(&lesson_id)
            .and_then(|lesson| self.courses.get(&lesson.course_id))
            .copied())
    }

    async fn test_cases(&self, lesson_id: i64) -> Result<Option<Value>, StoreError> {
        Ok(self
            .lessons
            .get(&lesson_id)
            .map(|lesson| lesson.test_cases.clone())
            .filter(|value| !value.is_null()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_store_follows_course_link() {
        let store = InMemoryLessonStore::new()
            .with_course(1, 71)
            .with_lesson(42, 1, json!([{"expectedOutput": "Hello"}]))
            .with_lesson(43, 2, json!([]));

        assert!(store.lesson_exists(42).await.unwrap());
        assert!(!store.lesson_exists(44).await.unwrap());
        assert_eq!(store.language_id_for_lesson(42).await.unwrap(), Some(71));
        // course 2 was never seeded
        assert_eq!(store.language_id_for_lesson(43).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_in_memory_store_reads_null_as_missing() {
        let store = InMemoryLessonStore::new()
            .with_course(1, 71)
            .with_lesson(7, 1, Value::Null);

        assert!(store.lesson_exists(7).await.unwrap());
        assert_eq!(store.test_cases(7).await.unwrap(), None);
    }
}
