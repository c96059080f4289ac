//! Database operations for `processing_runs`.
//!
//! A run moves `queued` → `running` → `succeeded` | `failed`. Every
//! transition is guarded on the expected prior status.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, run_type, trigger_source, status, started_at, \
     completed_at, records_processed, error_message, stats, created_at";

/// A row from the `processing_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProcessingRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// `batch` or `single`.
    pub run_type: String,
    /// `cli` or `scheduler`.
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub stats: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Creates a new run in `queued` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_processing_run(
    pool: &PgPool,
    run_type: &str,
    trigger_source: &str,
) -> Result<ProcessingRunRow, DbError> {
    let row = sqlx::query_as::<_, ProcessingRunRow>(&format!(
        "INSERT INTO processing_runs (public_id, run_type, trigger_source, status) \
         VALUES ($1, $2, $3, 'queued') \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(run_type)
    .bind(trigger_source)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a queued run as `running`.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `queued`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn start_processing_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE processing_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a running run as `succeeded` and records its stats.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn complete_processing_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
    stats: &serde_json::Value,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE processing_runs \
         SET status = 'succeeded', completed_at = NOW(), records_processed = $2, stats = $3 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(records_processed)
    .bind(stats)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a running run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidRunTransition`] if the run is not `running`, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn fail_processing_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE processing_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $2 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by internal id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_processing_run(pool: &PgPool, id: i64) -> Result<ProcessingRunRow, DbError> {
    let row = sqlx::query_as::<_, ProcessingRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM processing_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_processing_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<ProcessingRunRow>, DbError> {
    let rows = sqlx::query_as::<_, ProcessingRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM processing_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
