//! Party-level rating rollups. Always a clean recompute from member ratings.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `party_aggregates` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PartyAggregateRow {
    pub party: String,
    pub member_count: i32,
    pub overall_elo: f64,
    pub transparency_elo: f64,
    pub effectiveness_elo: f64,
    pub integrity_elo: f64,
    pub consistency_elo: f64,
    pub constituency_service_elo: f64,
    pub computed_at: DateTime<Utc>,
}

/// Replaces every party aggregate with the arithmetic mean of its active
/// members' ratings.
///
/// Returns the number of parties written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if either statement fails; the previous
/// aggregates are kept in that case.
pub async fn recompute_party_aggregates(pool: &PgPool) -> Result<u64, DbError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM party_aggregates")
        .execute(&mut *tx)
        .await?;

    let inserted = sqlx::query(
        "INSERT INTO party_aggregates \
             (party, member_count, overall_elo, transparency_elo, effectiveness_elo, \
              integrity_elo, consistency_elo, constituency_service_elo, computed_at) \
         SELECT party, COUNT(*)::INTEGER, \
                AVG(overall_elo), AVG(transparency_elo), AVG(effectiveness_elo), \
                AVG(integrity_elo), AVG(consistency_elo), AVG(constituency_service_elo), \
                NOW() \
         FROM politicians \
         WHERE is_active \
         GROUP BY party",
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(inserted.rows_affected())
}

/// Returns all party aggregates, highest overall rating first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_party_aggregates(pool: &PgPool) -> Result<Vec<PartyAggregateRow>, DbError> {
    let rows = sqlx::query_as::<_, PartyAggregateRow>(
        "SELECT party, member_count, overall_elo, transparency_elo, effectiveness_elo, \
                integrity_elo, consistency_elo, constituency_service_elo, computed_at \
         FROM party_aggregates \
         ORDER BY overall_elo DESC, party",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
