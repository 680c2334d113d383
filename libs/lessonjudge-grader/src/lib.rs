//! Code-submission grading pipeline
//!
//! decode (normalizer) → resolver (lesson + test cases) → judge (submit, poll)
//! → evaluator (per-case verdict) → aggregator (ordered merge, success flag)

pub mod aggregator;
pub mod decode;
pub mod error;
pub mod evaluator;
pub mod judge;
pub mod resolver;
pub mod store;

pub use aggregator::Grader;
pub use error::{DecodeError, GradeError, JudgeError, NotFoundError, StoreError};
pub use judge::{Judge, Judge0Client, JudgeClientConfig, JudgeResult, JudgeStatus, JudgeSubmission};
pub use store::{InMemoryLessonStore, LessonStore, RedisLessonStore};
