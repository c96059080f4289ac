//! Per (article, politician) judgment audit rows in `article_analyses`.
//!
//! Keyed by `(article_id, politician_name)`: reprocessing the same pair
//! overwrites the row instead of adding a second one.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `article_analyses` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleAnalysisRow {
    pub id: i64,
    pub article_id: i64,
    pub politician_name: String,
    pub status: String,
    pub analyzer: String,
    pub sentiment: Option<String>,
    pub story_type: Option<String>,
    pub impact_score: Option<f64>,
    /// `None` means the analyzer could not assess the score.
    pub transparency_score: Option<f64>,
    pub integrity_score: Option<f64>,
    pub effectiveness_score: Option<f64>,
    pub consistency_score: Option<f64>,
    pub rationale: serde_json::Value,
    pub confidence: Option<f64>,
    pub ideology_delta: Option<serde_json::Value>,
    pub policy_stance: Option<serde_json::Value>,
    pub is_opposition_advocacy: bool,
    pub flip_flop_detected: bool,
    pub suspicious_timing: bool,
    pub constituency_focus: bool,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub analyzed_at: DateTime<Utc>,
}

/// Audit payload for one analyzed or failed mention.
#[derive(Debug, Clone, Default)]
pub struct NewArticleAnalysis {
    pub article_id: i64,
    pub politician_name: String,
    /// `applied` or `failed`.
    pub status: String,
    pub analyzer: String,
    pub sentiment: Option<String>,
    pub story_type: Option<String>,
    pub impact_score: Option<f64>,
    pub transparency_score: Option<f64>,
    pub integrity_score: Option<f64>,
    pub effectiveness_score: Option<f64>,
    pub consistency_score: Option<f64>,
    pub rationale: serde_json::Value,
    pub confidence: Option<f64>,
    pub ideology_delta: Option<serde_json::Value>,
    pub policy_stance: Option<serde_json::Value>,
    pub is_opposition_advocacy: bool,
    pub flip_flop_detected: bool,
    pub suspicious_timing: bool,
    pub constituency_focus: bool,
    pub summary: Option<String>,
    pub error_message: Option<String>,
}

/// Inserts or overwrites the audit row for `(article_id, politician_name)`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_article_analysis<'e, E>(
    executor: E,
    analysis: &NewArticleAnalysis,
) -> Result<i64, DbError>
where
    E: sqlx::PgExecutor<'e>,
{
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO article_analyses \
             (article_id, politician_name, status, analyzer, sentiment, story_type, \
              impact_score, transparency_score, integrity_score, effectiveness_score, \
              consistency_score, rationale, confidence, ideology_delta, policy_stance, \
              is_opposition_advocacy, flip_flop_detected, suspicious_timing, \
              constituency_focus, summary, error_message) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                 $16, $17, $18, $19, $20, $21) \
         ON CONFLICT (article_id, politician_name) DO UPDATE SET \
             status = EXCLUDED.status, \
             analyzer = EXCLUDED.analyzer, \
             sentiment = EXCLUDED.sentiment, \
             story_type = EXCLUDED.story_type, \
             impact_score = EXCLUDED.impact_score, \
             transparency_score = EXCLUDED.transparency_score, \
             integrity_score = EXCLUDED.integrity_score, \
             effectiveness_score = EXCLUDED.effectiveness_score, \
             consistency_score = EXCLUDED.consistency_score, \
             rationale = EXCLUDED.rationale, \
             confidence = EXCLUDED.confidence, \
             ideology_delta = EXCLUDED.ideology_delta, \
             policy_stance = EXCLUDED.policy_stance, \
             is_opposition_advocacy = EXCLUDED.is_opposition_advocacy, \
             flip_flop_detected = EXCLUDED.flip_flop_detected, \
             suspicious_timing = EXCLUDED.suspicious_timing, \
             constituency_focus = EXCLUDED.constituency_focus, \
             summary = EXCLUDED.summary, \
             error_message = EXCLUDED.error_message, \
             analyzed_at = NOW() \
         RETURNING id",
    )
    .bind(analysis.article_id)
    .bind(&analysis.politician_name)
    .bind(&analysis.status)
    .bind(&analysis.analyzer)
    .bind(&analysis.sentiment)
    .bind(&analysis.story_type)
    .bind(analysis.impact_score)
    .bind(analysis.transparency_score)
    .bind(analysis.integrity_score)
    .bind(analysis.effectiveness_score)
    .bind(analysis.consistency_score)
    .bind(&analysis.rationale)
    .bind(analysis.confidence)
    .bind(&analysis.ideology_delta)
    .bind(&analysis.policy_stance)
    .bind(analysis.is_opposition_advocacy)
    .bind(analysis.flip_flop_detected)
    .bind(analysis.suspicious_timing)
    .bind(analysis.constituency_focus)
    .bind(&analysis.summary)
    .bind(&analysis.error_message)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Returns every audit row for one article, ordered by politician name.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_article_analyses(
    pool: &PgPool,
    article_id: i64,
) -> Result<Vec<ArticleAnalysisRow>, DbError> {
    let rows = sqlx::query_as::<_, ArticleAnalysisRow>(
        "SELECT id, article_id, politician_name, status, analyzer, sentiment, story_type, \
                impact_score, transparency_score, integrity_score, effectiveness_score, \
                consistency_score, rationale, confidence, ideology_delta, policy_stance, \
                is_opposition_advocacy, flip_flop_detected, suspicious_timing, \
                constituency_focus, summary, error_message, analyzed_at \
         FROM article_analyses \
         WHERE article_id = $1 \
         ORDER BY politician_name",
    )
    .bind(article_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
