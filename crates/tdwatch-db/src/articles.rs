//! Database operations for the `articles` table.
//!
//! Rows are inserted by the external ingestion process. The pipeline only
//! reads unprocessed rows and writes terminal status back onto them.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const ARTICLE_COLUMNS: &str = "id, title, content, source, url, published_date, \
     credibility_score, processed, importance_score, topic_category, importance_reasoning, \
     primary_politicians, processing_status, processing_reason, score_applied, duplicate_of, \
     event_name, ai_summary, error_message, processed_at, created_at";

/// A row from the `articles` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleRow {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub source: String,
    pub url: String,
    pub published_date: DateTime<Utc>,
    pub credibility_score: f64,
    pub processed: bool,
    pub importance_score: Option<f64>,
    pub topic_category: Option<String>,
    pub importance_reasoning: Option<String>,
    pub primary_politicians: Vec<String>,
    pub processing_status: Option<String>,
    pub processing_reason: Option<String>,
    pub score_applied: bool,
    pub duplicate_of: Option<i64>,
    pub event_name: Option<String>,
    pub ai_summary: Option<String>,
    pub error_message: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by ingestion when an article is first stored.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub title: String,
    pub content: String,
    pub source: String,
    pub url: String,
    pub published_date: DateTime<Utc>,
    pub credibility_score: f64,
}

/// Everything written back when an article reaches its terminal state.
#[derive(Debug, Clone, Default)]
pub struct ArticleTerminalUpdate {
    pub id: i64,
    /// One of `scored`, `skipped_low_importance`, `duplicate`, `failed`.
    pub status: String,
    pub reason: Option<String>,
    pub importance_score: Option<f64>,
    pub topic_category: Option<String>,
    pub importance_reasoning: Option<String>,
    pub primary_politicians: Vec<String>,
    pub score_applied: bool,
    pub duplicate_of: Option<i64>,
    pub event_name: Option<String>,
    pub ai_summary: Option<String>,
    pub error_message: Option<String>,
}

/// Inserts an article, or refreshes its text if the URL is already stored.
///
/// Returns the article `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn insert_article(pool: &PgPool, article: &NewArticle) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO articles (title, content, source, url, published_date, credibility_score) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         ON CONFLICT (url) DO UPDATE SET \
             title = EXCLUDED.title, \
             content = EXCLUDED.content \
         RETURNING id",
    )
    .bind(&article.title)
    .bind(&article.content)
    .bind(&article.source)
    .bind(&article.url)
    .bind(article.published_date)
    .bind(article.credibility_score)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Returns up to `limit` unprocessed articles, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_unprocessed_articles(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ArticleRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleRow>(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles \
         WHERE processed = FALSE \
         ORDER BY published_date DESC, id \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a single article by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_article(pool: &PgPool, id: i64) -> Result<ArticleRow, DbError> {
    let row = sqlx::query_as::<_, ArticleRow>(&format!(
        "SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Clears the terminal state of an article so it can be reprocessed.
///
/// Only used by an explicit manual reprocess; rating history already written
/// for the article is left untouched.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn reset_article(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE articles SET \
             processed = FALSE, \
             processing_status = NULL, \
             processing_reason = NULL, \
             score_applied = FALSE, \
             duplicate_of = NULL, \
             event_name = NULL, \
             error_message = NULL, \
             processed_at = NULL \
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Writes the terminal state of an article and flips `processed`.
///
/// The update is guarded on `processed = FALSE` so an article reaches its
/// terminal state exactly once.
///
/// # Errors
///
/// Returns [`DbError::AlreadyProcessed`] if the row was already terminal (or
/// does not exist), or [`DbError::Sqlx`] if the update fails.
pub async fn mark_article_processed<'e, E>(
    executor: E,
    update: &ArticleTerminalUpdate,
) -> Result<(), DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE articles SET \
             processed = TRUE, \
             processing_status = $2, \
             processing_reason = $3, \
             importance_score = COALESCE($4, importance_score), \
             topic_category = COALESCE($5, topic_category), \
             importance_reasoning = COALESCE($6, importance_reasoning), \
             primary_politicians = $7, \
             score_applied = $8, \
             duplicate_of = $9, \
             event_name = $10, \
             ai_summary = $11, \
             error_message = $12, \
             processed_at = NOW() \
         WHERE id = $1 AND processed = FALSE",
    )
    .bind(update.id)
    .bind(&update.status)
    .bind(&update.reason)
    .bind(update.importance_score)
    .bind(&update.topic_category)
    .bind(&update.importance_reasoning)
    .bind(&update.primary_politicians)
    .bind(update.score_applied)
    .bind(update.duplicate_of)
    .bind(&update.event_name)
    .bind(&update.ai_summary)
    .bind(&update.error_message)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::AlreadyProcessed(update.id));
    }

    Ok(())
}
