//! Append-only rating audit trail. Rows are never updated; a trigger in the
//! schema rejects `UPDATE` and `DELETE`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `rating_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RatingHistoryRow {
    pub id: i64,
    pub politician_id: i64,
    pub article_id: Option<i64>,
    pub dimension: String,
    pub old_value: f64,
    pub new_value: f64,
    pub delta: f64,
    pub created_at: DateTime<Utc>,
}

/// Appends one history row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_rating_history<'e, E>(
    executor: E,
    politician_id: i64,
    article_id: Option<i64>,
    dimension: &str,
    old_value: f64,
    new_value: f64,
) -> Result<i64, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO rating_history \
             (politician_id, article_id, dimension, old_value, new_value, delta) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING id",
    )
    .bind(politician_id)
    .bind(article_id)
    .bind(dimension)
    .bind(old_value)
    .bind(new_value)
    .bind(new_value - old_value)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Returns the most recent `limit` history rows for a politician.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_rating_history(
    pool: &PgPool,
    politician_id: i64,
    limit: i64,
) -> Result<Vec<RatingHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, RatingHistoryRow>(
        "SELECT id, politician_id, article_id, dimension, old_value, new_value, delta, created_at \
         FROM rating_history \
         WHERE politician_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(politician_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
