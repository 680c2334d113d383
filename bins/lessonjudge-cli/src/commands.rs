// CLI commands for managing lessons and grading locally
use anyhow::{bail, Context, Result};
use lessonjudge_common::config::Config;
use lessonjudge_common::redis as store_keys;
use lessonjudge_common::types::{
    GradingCase, SubmissionRequest, SubmissionResult, TestCaseResult, TestCaseSpec, TestStatus,
};
use lessonjudge_grader::decode;
use lessonjudge_grader::{
    Grader, InMemoryLessonStore, Judge0Client, JudgeClientConfig, LessonStore, RedisLessonStore,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Lesson id used for a `--cases` file held in memory
const LOCAL_LESSON_ID: i64 = 0;
const LOCAL_COURSE_ID: i64 = 0;

fn load_config() -> Result<Config> {
    Config::from_env().map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))
}

async fn connect_redis(config: &Config) -> Result<redis::aio::ConnectionManager> {
    let client = redis::Client::open(config.redis_url.as_str())
        .with_context(|| format!("Invalid Redis URL: {}", config.redis_url))?;
    client
        .get_connection_manager()
        .await
        .context("Failed to connect to Redis")
}

/// Parse a test-case list and reject entries grading would refuse later
fn parse_test_cases(content: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(content).context("Test cases are not valid JSON")?;

    let entries = match &value {
        Value::Array(entries) => entries,
        _ => bail!("Test cases must be a JSON list"),
    };
    if entries.is_empty() {
        bail!("Test case list is empty");
    }

    for (index, entry) in entries.iter().enumerate() {
        let spec: TestCaseSpec = serde_json::from_value(entry.clone())
            .with_context(|| format!("Test case {} has the wrong shape", index))?;
        GradingCase::from_spec(spec)
            .map_err(|reason| anyhow::anyhow!("Test case {} is invalid: {}", index, reason))?;
    }

    Ok(value)
}

fn load_test_cases(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_test_cases(&content)
}

/// Store a course's judge language
pub async fn seed_course(course_id: i64, language_id: u32) -> Result<()> {
    let config = load_config()?;
    let mut conn = connect_redis(&config).await?;

    store_keys::put_course(&mut conn, course_id, language_id)
        .await
        .context("Failed to store course")?;

    println!("✅ Course {} now runs language {}", course_id, language_id);
    Ok(())
}

/// Store a lesson with the test cases from a JSON file
pub async fn seed_lesson(lesson_id: i64, course_id: i64, cases_path: &Path) -> Result<()> {
    let test_cases = load_test_cases(cases_path)?;
    let count = test_cases.as_array().map_or(0, Vec::len);

    let config = load_config()?;
    let mut conn = connect_redis(&config).await?;

    println!("📝 Writing lesson {} ({} test case(s))...", lesson_id, count);
    store_keys::put_lesson(&mut conn, lesson_id, course_id, &test_cases)
        .await
        .context("Failed to store lesson")?;

    let language = store_keys::get_language_id_for_lesson(&mut conn, lesson_id).await?;
    println!("✅ Lesson {} stored under course {}", lesson_id, course_id);
    if language.is_none() {
        println!("\n⚠️  Course {} has no language yet - grading will fail until it does!", course_id);
        println!("\n📋 Next steps:");
        println!("  1. Seed the course: lessonjudge-cli seed-course --id {} --language <id>", course_id);
    }

    Ok(())
}

/// Print what grading would see for a lesson
pub async fn show_lesson(lesson_id: i64) -> Result<()> {
    let config = load_config()?;
    let conn = connect_redis(&config).await?;
    let store = RedisLessonStore::new(conn);

    if !store.lesson_exists(lesson_id).await? {
        bail!("Lesson {} not found", lesson_id);
    }

    let language = store.language_id_for_lesson(lesson_id).await?;
    let test_cases = store.test_cases(lesson_id).await?;

    println!("📋 Lesson {}\n", lesson_id);
    match language {
        Some(id) => println!("Language: {}", id),
        None => println!("Language: (not configured)"),
    }
    match test_cases {
        Some(value) => println!("Test cases:\n{}", serde_json::to_string_pretty(&value)?),
        None => println!("Test cases: (none)"),
    }

    Ok(())
}

/// Print a source file encoded as the front end submits it
pub fn encode_file(path: &Path) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}", decode::encode(&source));
    Ok(())
}

/// Where `grade` loads the lesson from
pub enum LessonSource {
    Redis(i64),
    File(PathBuf),
}

/// Grade a source file through the configured judge
pub async fn grade(path: &Path, lesson: LessonSource, language_id: Option<u32>) -> Result<()> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config = load_config()?;

    let (store, lesson_id): (Arc<dyn LessonStore>, i64) = match lesson {
        LessonSource::File(cases_path) => {
            let Some(language_id) = language_id else {
                bail!("--language is required when grading against --cases");
            };
            let store = InMemoryLessonStore::new()
                .with_course(LOCAL_COURSE_ID, language_id)
                .with_lesson(LOCAL_LESSON_ID, LOCAL_COURSE_ID, load_test_cases(&cases_path)?);
            (Arc::new(store), LOCAL_LESSON_ID)
        }
        LessonSource::Redis(lesson_id) => {
            let conn = connect_redis(&config).await?;
            (Arc::new(RedisLessonStore::new(conn)), lesson_id)
        }
    };

    let judge = Judge0Client::new(JudgeClientConfig::from(&config));
    let grader = Grader::new(store, Arc::new(judge))
        .with_submission_deadline(config.submission_deadline);

    let request = SubmissionRequest {
        lesson_id,
        code: decode::encode(&source),
        language_id,
    };

    println!("🚀 Grading {} against {}...\n", path.display(), config.judge_url);
    let result = grader.grade(&request, true).await?;
    print_result(&result);

    if !result.success {
        bail!(
            "{} of {} test case(s) failed",
            result.results.len() - result.passed_count(),
            result.results.len()
        );
    }

    Ok(())
}

fn verdict_line(index: usize, case: &TestCaseResult) -> String {
    let mark = match case.status {
        TestStatus::Passed => "✅",
        TestStatus::Failed => "❌",
    };
    let mut line = format!("{} #{:<3} got {:?}", mark, index, case.actual_output);

    if case.auto_detect {
        line.push_str(" (any output)");
    } else if case.use_pattern {
        line.push_str(&format!(" expected one of {:?}", case.pattern.as_deref().unwrap_or_default()));
    } else {
        line.push_str(&format!(" expected {:?}", case.expected_output));
    }

    if let Some(error) = &case.error {
        line.push_str(&format!("\n      error: {}", error.trim_end()));
    }
    line
}

fn print_result(result: &SubmissionResult) {
    for (index, case) in result.results.iter().enumerate() {
        println!("{}", verdict_line(index, case));
    }
    println!("{}", "─".repeat(60));
    println!(
        "{} {}/{} passed",
        if result.success { "✅" } else { "❌" },
        result.passed_count(),
        result.results.len()
    );
}
