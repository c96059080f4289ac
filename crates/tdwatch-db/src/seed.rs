use sqlx::PgPool;
use tdwatch_core::PoliticianConfig;

use crate::DbError;

/// Upsert the politician roster from config.
///
/// Identity fields (party, constituency, aliases, active flag) are refreshed;
/// ratings, counters, and ranks are left as they are.
///
/// Returns the number of politicians processed. All upserts run inside a
/// single transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_politicians(
    pool: &PgPool,
    politicians: &[PoliticianConfig],
) -> Result<usize, DbError> {
    let mut tx = pool.begin().await?;
    let mut count = 0usize;

    for politician in politicians {
        sqlx::query(
            "INSERT INTO politicians (name, party, constituency, aliases, is_active) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (name) DO UPDATE SET \
                 party = EXCLUDED.party, \
                 constituency = EXCLUDED.constituency, \
                 aliases = EXCLUDED.aliases, \
                 is_active = EXCLUDED.is_active, \
                 updated_at = NOW()",
        )
        .bind(&politician.name)
        .bind(&politician.party)
        .bind(&politician.constituency)
        .bind(&politician.aliases)
        .bind(politician.is_active)
        .execute(&mut *tx)
        .await?;

        count += 1;
    }

    tx.commit().await?;
    Ok(count)
}
