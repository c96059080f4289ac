//! Postgres persistence for tdwatch: pool setup, embedded migrations, and
//! one module of typed rows and queries per table.

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;

// Resolves to <workspace-root>/migrations/ from this crate's manifest.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &tdwatch_core::AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections.min(config.db_max_connections),
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    /// A terminal write hit an article whose processed flag was already set.
    #[error("article {0} is already processed")]
    AlreadyProcessed(i64),
    #[error("invalid processing run transition for run {id}: expected status {expected_status}")]
    InvalidRunTransition {
        id: i64,
        expected_status: &'static str,
    },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to Postgres with explicit pool settings.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

async fn applied_migrations(pool: &PgPool) -> i64 {
    // The bookkeeping table does not exist before the first migration.
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Apply pending migrations and return how many were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    let before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let after = applied_migrations(pool).await;
    Ok(usize::try_from((after - before).max(0)).unwrap_or(0))
}

/// `SELECT 1` against the pool.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}


pub mod analyses;
pub mod articles;
pub mod ideology;
pub mod parties;
pub mod politicians;
pub mod processing_runs;
pub mod rating_history;
pub mod seed;

pub use analyses::{
    list_article_analyses, upsert_article_analysis, ArticleAnalysisRow, NewArticleAnalysis,
};
pub use articles::{
    get_article, insert_article, list_unprocessed_articles, mark_article_processed,
    reset_article, ArticleRow, ArticleTerminalUpdate, NewArticle,
};
pub use ideology::{
    insert_ideology_evidence, list_ideology_scores, list_recent_evidence, upsert_ideology_score,
    IdeologyEvidenceRow, IdeologyScoreRow, NewIdeologyEvidence,
};
pub use parties::{list_party_aggregates, recompute_party_aggregates, PartyAggregateRow};
pub use politicians::{
    get_politician_by_name, list_active_politicians, list_politicians, recompute_rankings,
    update_politician_rating, PoliticianRatingValues, PoliticianRow,
};
pub use processing_runs::{
    complete_processing_run, create_processing_run, fail_processing_run, get_processing_run,
    list_processing_runs, start_processing_run, ProcessingRunRow,
};
pub use rating_history::{insert_rating_history, list_rating_history, RatingHistoryRow};
pub use seed::seed_politicians;
