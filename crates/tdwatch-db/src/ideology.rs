//! Database operations for `ideology_scores` and `ideology_evidence`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `ideology_scores` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdeologyScoreRow {
    pub politician_id: i64,
    pub dimension: String,
    pub value: f64,
    /// Accumulated evidence weight. Zero means no data.
    pub weight: f64,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `ideology_evidence` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdeologyEvidenceRow {
    pub id: i64,
    pub politician_id: i64,
    pub source_type: String,
    pub source_id: String,
    pub policy_topic: Option<String>,
    pub topic_category: Option<String>,
    pub stance: Option<String>,
    pub strength: Option<i16>,
    /// Raw per-dimension deltas as a JSON object.
    pub deltas: serde_json::Value,
    pub effective_weight: f64,
    pub consistency_penalty: f64,
    pub source_reliability: f64,
    pub source_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIdeologyEvidence {
    pub politician_id: i64,
    pub source_type: String,
    pub source_id: String,
    pub policy_topic: Option<String>,
    pub topic_category: Option<String>,
    pub stance: Option<String>,
    pub strength: Option<i16>,
    pub deltas: serde_json::Value,
    pub effective_weight: f64,
    pub consistency_penalty: f64,
    pub source_reliability: f64,
    pub source_date: DateTime<Utc>,
}

/// Returns all stored dimensions for a politician. Dimensions never touched
/// have no row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_ideology_scores<'e, E>(
    executor: E,
    politician_id: i64,
) -> Result<Vec<IdeologyScoreRow>, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, IdeologyScoreRow>(
        "SELECT politician_id, dimension, value, weight, updated_at \
         FROM ideology_scores \
         WHERE politician_id = $1 \
         ORDER BY dimension",
    )
    .bind(politician_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Inserts or replaces the value and accumulated weight of one dimension.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_ideology_score<'e, E>(
    executor: E,
    politician_id: i64,
    dimension: &str,
    value: f64,
    weight: f64,
) -> Result<(), DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO ideology_scores (politician_id, dimension, value, weight) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (politician_id, dimension) DO UPDATE SET \
             value = EXCLUDED.value, \
             weight = EXCLUDED.weight, \
             updated_at = NOW()",
    )
    .bind(politician_id)
    .bind(dimension)
    .bind(value)
    .bind(weight)
    .execute(executor)
    .await?;

    Ok(())
}

/// Appends one evidence row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_ideology_evidence<'e, E>(
    executor: E,
    evidence: &NewIdeologyEvidence,
) -> Result<i64, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO ideology_evidence \
             (politician_id, source_type, source_id, policy_topic, topic_category, stance, \
              strength, deltas, effective_weight, consistency_penalty, source_reliability, \
              source_date) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         RETURNING id",
    )
    .bind(evidence.politician_id)
    .bind(&evidence.source_type)
    .bind(&evidence.source_id)
    .bind(&evidence.policy_topic)
    .bind(&evidence.topic_category)
    .bind(&evidence.stance)
    .bind(evidence.strength)
    .bind(&evidence.deltas)
    .bind(evidence.effective_weight)
    .bind(evidence.consistency_penalty)
    .bind(evidence.source_reliability)
    .bind(evidence.source_date)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Returns evidence for a politician dated on or after `since`, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_evidence(
    pool: &PgPool,
    politician_id: i64,
    since: DateTime<Utc>,
) -> Result<Vec<IdeologyEvidenceRow>, DbError> {
    let rows = sqlx::query_as::<_, IdeologyEvidenceRow>(
        "SELECT id, politician_id, source_type, source_id, policy_topic, topic_category, \
                stance, strength, deltas, effective_weight, consistency_penalty, \
                source_reliability, source_date, created_at \
         FROM ideology_evidence \
         WHERE politician_id = $1 AND source_date >= $2 \
         ORDER BY source_date DESC, id DESC",
    )
    .bind(politician_id)
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
