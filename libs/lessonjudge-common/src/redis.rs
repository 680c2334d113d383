use redis::{AsyncCommands, RedisResult};

/// Redis lesson-store layout - defines only key semantics and field access
/// Ensures the API and the CLI never drift on where lessons live
///
/// lessonjudge:lesson:{id}  hash { course_id, test_cases (JSON list) }
/// lessonjudge:course:{id}  hash { language_id }

pub const LESSON_PREFIX: &str = "lessonjudge:lesson";
pub const COURSE_PREFIX: &str = "lessonjudge:course";

pub const FIELD_COURSE_ID: &str = "course_id";
pub const FIELD_TEST_CASES: &str = "test_cases";
pub const FIELD_LANGUAGE_ID: &str = "language_id";

/// Generate deterministic key for a lesson record
pub fn lesson_key(lesson_id: i64) -> String {
    format!("{}:{}", LESSON_PREFIX, lesson_id)
}

/// Generate deterministic key for a course record
pub fn course_key(course_id: i64) -> String {
    format!("{}:{}", COURSE_PREFIX, course_id)
}

fn json_error(context: &'static str, e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, context, e.to_string()))
}

pub async fn lesson_exists(
    conn: &mut redis::aio::ConnectionManager,
    lesson_id: i64,
) -> RedisResult<bool> {
    conn.exists(lesson_key(lesson_id)).await
}

/// Resolve the judge language id of a lesson through its parent course
/// Returns None when the lesson, its course link, or the course language is missing
pub async fn get_language_id_for_lesson(
    conn: &mut redis::aio::ConnectionManager,
    lesson_id: i64,
) -> RedisResult<Option<u32>> {
    let course_id: Option<i64> = conn.hget(lesson_key(lesson_id), FIELD_COURSE_ID).await?;

    match course_id {
        Some(course_id) => conn.hget(course_key(course_id), FIELD_LANGUAGE_ID).await,
        None => Ok(None),
    }
}

/// Fetch the raw stored test-case field of a lesson
/// The value is returned unvalidated: it may be JSON null or not a list
pub async fn get_test_cases(
    conn: &mut redis::aio::ConnectionManager,
    lesson_id: i64,
) -> RedisResult<Option<serde_json::Value>> {
    let payload: Option<String> = conn.hget(lesson_key(lesson_id), FIELD_TEST_CASES).await?;

    match payload {
        Some(data) => {
            let value = serde_json::from_str(&data)
                .map_err(|e| json_error("test case deserialization error", e))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Store (or replace) a course's judge language id
pub async fn put_course(
    conn: &mut redis::aio::ConnectionManager,
    course_id: i64,
    language_id: u32,
) -> RedisResult<()> {
    conn.hset(course_key(course_id), FIELD_LANGUAGE_ID, language_id)
        .await
}

/// Store (or replace) a lesson's course link and test-case list
pub async fn put_lesson(
    conn: &mut redis::aio::ConnectionManager,
    lesson_id: i64,
    course_id: i64,
    test_cases: &serde_json::Value,
) -> RedisResult<()> {
    let payload = serde_json::to_string(test_cases)
        .map_err(|e| json_error("test case serialization error", e))?;

    conn.hset_multiple(
        lesson_key(lesson_id),
        &[
            (FIELD_COURSE_ID, course_id.to_string()),
            (FIELD_TEST_CASES, payload),
        ],
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lesson_key_format() {
        assert_eq!(lesson_key(42), "lessonjudge:lesson:42");
        assert_eq!(lesson_key(7), "lessonjudge:lesson:7");
    }

    #[test]
    fn test_course_key_format() {
        assert_eq!(course_key(3), "lessonjudge:course:3");
        assert_ne!(course_key(3), lesson_key(3));
    }

    async fn create_redis_conn() -> redis::aio::ConnectionManager {
        let client = redis::Client::open("redis://127.0.0.1:6379")
            .expect("Failed to create Redis client");
        client
            .get_connection_manager()
            .await
            .expect("Failed to connect to Redis")
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_lesson_round_trip() {
        let mut conn = create_redis_conn().await;
        let test_cases = json!([{"input": "", "expectedOutput": "Hello\n"}]);

        put_course(&mut conn, 9001, 71).await.unwrap();
        put_lesson(&mut conn, 9042, 9001, &test_cases).await.unwrap();

        assert!(lesson_exists(&mut conn, 9042).await.unwrap());
        assert_eq!(get_language_id_for_lesson(&mut conn, 9042).await.unwrap(), Some(71));
        assert_eq!(get_test_cases(&mut conn, 9042).await.unwrap(), Some(test_cases));
    }

    #[tokio::test]
    #[ignore] // Requires Redis
    async fn test_missing_lesson_resolves_to_none() {
        let mut conn = create_redis_conn().await;

        assert!(!lesson_exists(&mut conn, -1).await.unwrap());
        assert_eq!(get_language_id_for_lesson(&mut conn, -1).await.unwrap(), None);
        assert_eq!(get_test_cases(&mut conn, -1).await.unwrap(), None);
    }
}
