//! Database operations for the `politicians` table: roster reads, rating
//! writes, and rank recomputation.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

const POLITICIAN_COLUMNS: &str = "id, name, party, constituency, aliases, is_active, \
     overall_elo, transparency_elo, effectiveness_elo, integrity_elo, consistency_elo, \
     constituency_service_elo, total_stories, positive_stories, negative_stories, \
     neutral_stories, national_rank, party_rank, constituency_rank, last_updated, \
     created_at, updated_at";

/// A row from the `politicians` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PoliticianRow {
    pub id: i64,
    pub name: String,
    pub party: String,
    pub constituency: String,
    pub aliases: Vec<String>,
    pub is_active: bool,
    pub overall_elo: f64,
    pub transparency_elo: f64,
    pub effectiveness_elo: f64,
    pub integrity_elo: f64,
    pub consistency_elo: f64,
    pub constituency_service_elo: f64,
    pub total_stories: i32,
    pub positive_stories: i32,
    pub negative_stories: i32,
    pub neutral_stories: i32,
    pub national_rank: Option<i32>,
    pub party_rank: Option<i32>,
    pub constituency_rank: Option<i32>,
    pub last_updated: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// New rating values and counters written after an article is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoliticianRatingValues {
    pub overall: f64,
    pub transparency: f64,
    pub effectiveness: f64,
    pub integrity: f64,
    pub consistency: f64,
    pub constituency_service: f64,
    pub total_stories: i32,
    pub positive_stories: i32,
    pub negative_stories: i32,
    pub neutral_stories: i32,
}

/// Returns every active politician, ordered by name. Used as the mention
/// extraction roster.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_active_politicians(pool: &PgPool) -> Result<Vec<PoliticianRow>, DbError> {
    let rows = sqlx::query_as::<_, PoliticianRow>(&format!(
        "SELECT {POLITICIAN_COLUMNS} FROM politicians WHERE is_active ORDER BY name"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns active politicians ordered by overall rating, optionally filtered
/// to one party.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_politicians(
    pool: &PgPool,
    party: Option<&str>,
    limit: i64,
) -> Result<Vec<PoliticianRow>, DbError> {
    let rows = sqlx::query_as::<_, PoliticianRow>(&format!(
        "SELECT {POLITICIAN_COLUMNS} FROM politicians \
         WHERE is_active AND ($1::TEXT IS NULL OR party = $1) \
         ORDER BY overall_elo DESC, name \
         LIMIT $2"
    ))
    .bind(party)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Fetches a politician by name, case-insensitively.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row matches, or [`DbError::Sqlx`] if
/// the query fails.
pub async fn get_politician_by_name<'e, E>(
    executor: E,
    name: &str,
) -> Result<PoliticianRow, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, PoliticianRow>(&format!(
        "SELECT {POLITICIAN_COLUMNS} FROM politicians WHERE lower(name) = lower($1)"
    ))
    .bind(name)
    .fetch_optional(executor)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Overwrites the six ratings and story counters for one politician.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the id does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_politician_rating<'e, E>(
    executor: E,
    politician_id: i64,
    values: &PoliticianRatingValues,
) -> Result<(), DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query(
        "UPDATE politicians SET \
             overall_elo = $2, \
             transparency_elo = $3, \
             effectiveness_elo = $4, \
             integrity_elo = $5, \
             consistency_elo = $6, \
             constituency_service_elo = $7, \
             total_stories = $8, \
             positive_stories = $9, \
             negative_stories = $10, \
             neutral_stories = $11, \
             last_updated = NOW(), \
             updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(politician_id)
    .bind(values.overall)
    .bind(values.transparency)
    .bind(values.effectiveness)
    .bind(values.integrity)
    .bind(values.consistency)
    .bind(values.constituency_service)
    .bind(values.total_stories)
    .bind(values.positive_stories)
    .bind(values.negative_stories)
    .bind(values.neutral_stories)
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// Recomputes national, party, and constituency ranks by overall rating for
/// every active politician. Inactive politicians lose their ranks.
///
/// Returns the number of ranked politicians.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails; the transaction is
/// rolled back in that case.
pub async fn recompute_rankings(pool: &PgPool) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    let ranked = sqlx::query(
        "WITH ranked AS ( \
             SELECT id, \
                 RANK() OVER (ORDER BY overall_elo DESC) AS national_rank, \
                 RANK() OVER (PARTITION BY party ORDER BY overall_elo DESC) AS party_rank, \
                 RANK() OVER (PARTITION BY constituency ORDER BY overall_elo DESC) \
                     AS constituency_rank \
             FROM politicians \
             WHERE is_active \
         ) \
         UPDATE politicians p SET \
             national_rank = r.national_rank::INTEGER, \
             party_rank = r.party_rank::INTEGER, \
             constituency_rank = r.constituency_rank::INTEGER \
         FROM ranked r \
         WHERE p.id = r.id",
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE politicians SET national_rank = NULL, party_rank = NULL, constituency_rank = NULL \
         WHERE NOT is_active",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(ranked.rows_affected())
}
