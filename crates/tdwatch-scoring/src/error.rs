use tdwatch_db::DbError;
use tdwatch_judge::JudgeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    /// The judgment capability failed (transport, API, or unparseable output).
    #[error("judgment call failed: {0}")]
    Judge(#[from] JudgeError),

    /// A judgment call exceeded the pipeline's outer timeout.
    #[error("judgment call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The judgment parsed as JSON but violated the expected shape or ranges.
    #[error("malformed judgment: {0}")]
    MalformedJudgment(String),

    #[error("article {0} not found")]
    ArticleNotFound(i64),

    /// Reprocessing would apply the article's judgments a second time.
    #[error("article {0} already has ratings applied and cannot be reprocessed")]
    AlreadyApplied(i64),

    #[error("politician '{0}' not found")]
    PoliticianNotFound(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] DbError),

    #[error("configuration error: {0}")]
    Config(#[from] tdwatch_core::ConfigError),
}
