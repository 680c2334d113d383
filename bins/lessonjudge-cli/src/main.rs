mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lessonjudge-cli")]
#[command(about = "lessonjudge CLI - Seed lessons, inspect them, and grade code locally", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a course and the judge language its lessons run in
    SeedCourse {
        /// Course id
        #[arg(short, long)]
        id: i64,

        /// Judge language id (e.g., 71 for Python 3)
        #[arg(short, long)]
        language: u32,
    },

    /// Store a lesson and its test cases
    SeedLesson {
        /// Lesson id
        #[arg(short, long)]
        id: i64,

        /// Parent course id
        #[arg(short, long)]
        course: i64,

        /// JSON file holding the test-case list
        #[arg(short = 't', long)]
        cases: PathBuf,
    },

    /// Print a lesson's language and test cases
    ShowLesson {
        /// Lesson id
        #[arg(short, long)]
        id: i64,
    },

    /// Encode a source file the way the front end does
    Encode {
        /// Source file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Grade a source file against a lesson through the judge
    Grade {
        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Lesson id stored in Redis
        #[arg(short = 'i', long, required_unless_present = "cases", conflicts_with = "cases")]
        lesson: Option<i64>,

        /// Grade against a local test-case file instead of Redis
        #[arg(short = 't', long)]
        cases: Option<PathBuf>,

        /// Judge language id; required with --cases
        #[arg(short, long)]
        language: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::SeedCourse { id, language } => {
            commands::seed_course(id, language).await?;
        }
        Commands::SeedLesson { id, course, cases } => {
            commands::seed_lesson(id, course, &cases).await?;
        }
        Commands::ShowLesson { id } => {
            commands::show_lesson(id).await?;
        }
        Commands::Encode { file } => {
            commands::encode_file(&file)?;
        }
        Commands::Grade {
            file,
            lesson,
            cases,
            language,
        } => {
            let source = match (lesson, cases) {
                (_, Some(cases)) => commands::LessonSource::File(cases),
                (Some(lesson), None) => commands::LessonSource::Redis(lesson),
                (None, None) => anyhow::bail!("--lesson or --cases is required"),
            };
            commands::grade(&file, source, language).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_needs_a_lesson_or_cases() {
        assert!(Cli::try_parse_from(["lessonjudge-cli", "grade", "--file", "main.py"]).is_err());
    }

    #[test]
    fn test_grade_accepts_lesson_or_cases_but_not_both() {
        let cli = Cli::try_parse_from(["lessonjudge-cli", "grade", "-f", "main.py", "--lesson", "42"]).unwrap();
        assert!(matches!(cli.command, Commands::Grade { lesson: Some(42), cases: None, .. }));

        let cli = Cli::try_parse_from([
            "lessonjudge-cli", "grade", "-f", "main.py", "--cases", "cases.json", "--language", "71",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Grade { lesson: None, cases: Some(_), .. }));

        assert!(Cli::try_parse_from([
            "lessonjudge-cli", "grade", "-f", "main.py", "--lesson", "42", "--cases", "cases.json",
        ])
        .is_err());
    }
}
