//! Postgres implementation of [`PipelineStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{Acquire as _, PgPool};
use tdwatch_db::{
    ArticleTerminalUpdate, DbError, NewArticleAnalysis, NewIdeologyEvidence,
    PoliticianRatingValues,
};

use crate::error::ScoringError;
use crate::ideology::{EvidenceRecord, IdeologyProfile};
use crate::judgment::ImpactJudgment;
use crate::rating::PoliticianRating;
use crate::store::{
    AnalysisOutcome, AnalysisRecord, ArticleCommit, ArticleResolution, CommitReport,
    PipelineStore, PoliticianState, RunOutcome,
};
use crate::types::{Article, RosterEntry};

/// Evidence source type recorded for article-derived adjustments.
pub const ARTICLE_SOURCE_TYPE: &str = "article";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn terminal_update(resolution: &ArticleResolution) -> ArticleTerminalUpdate {
    let importance = resolution.importance.as_ref();
    ArticleTerminalUpdate {
        id: resolution.article_id,
        status: resolution.status.as_str().to_string(),
        reason: resolution.reason.clone(),
        importance_score: importance.map(|i| i.score),
        topic_category: importance.map(|i| i.topic_category.as_str().to_string()),
        importance_reasoning: importance.map(|i| i.reasoning.clone()),
        primary_politicians: importance
            .map(|i| i.primary_politicians.clone())
            .unwrap_or_default(),
        score_applied: resolution.score_applied,
        duplicate_of: resolution.duplicate_of,
        event_name: resolution.event_name.clone(),
        ai_summary: resolution.summary.clone(),
        error_message: resolution.error_message.clone(),
    }
}

fn applied_analysis(article_id: i64, name: &str, j: &ImpactJudgment) -> NewArticleAnalysis {
    let rationale: serde_json::Map<String, serde_json::Value> = j
        .rationale
        .iter()
        .map(|(dim, text)| (dim.as_str().to_string(), json!(text)))
        .collect();
    NewArticleAnalysis {
        article_id,
        politician_name: name.to_string(),
        status: "applied".to_string(),
        analyzer: j.analyzer.clone(),
        sentiment: Some(j.sentiment.as_str().to_string()),
        story_type: Some(j.story_type.as_str().to_string()),
        impact_score: Some(j.impact_score),
        transparency_score: j.process_scores.transparency.value(),
        integrity_score: j.process_scores.integrity.value(),
        effectiveness_score: j.process_scores.effectiveness.value(),
        consistency_score: j.process_scores.consistency.value(),
        rationale: serde_json::Value::Object(rationale),
        confidence: Some(j.confidence),
        ideology_delta: j
            .ideology_delta
            .as_ref()
            .and_then(|d| serde_json::to_value(d).ok()),
        policy_stance: j
            .policy_stance
            .as_ref()
            .and_then(|s| serde_json::to_value(s).ok()),
        is_opposition_advocacy: j.flags.opposition_advocacy,
        flip_flop_detected: j.flags.flip_flop,
        suspicious_timing: j.flags.suspicious_timing,
        constituency_focus: j.flags.constituency_focus,
        summary: Some(j.summary.clone()),
        error_message: None,
    }
}

fn analysis_row(article_id: i64, record: &AnalysisRecord) -> NewArticleAnalysis {
    match &record.outcome {
        AnalysisOutcome::Applied(judgment) => {
            applied_analysis(article_id, &record.politician_name, judgment)
        }
        AnalysisOutcome::Failed { analyzer, error } => NewArticleAnalysis {
            article_id,
            politician_name: record.politician_name.clone(),
            status: "failed".to_string(),
            analyzer: analyzer.clone(),
            rationale: json!({}),
            error_message: Some(error.clone()),
            ..NewArticleAnalysis::default()
        },
    }
}

fn not_found_as_none<T>(result: Result<T, DbError>) -> Result<Option<T>, ScoringError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(DbError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl PipelineStore for PgStore {
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<Article>, ScoringError> {
        let rows = tdwatch_db::list_unprocessed_articles(&self.pool, i64::from(limit)).await?;
        Ok(rows.into_iter().map(Article::from).collect())
    }

    async fn fetch_article(&self, article_id: i64) -> Result<Option<Article>, ScoringError> {
        let row = not_found_as_none(tdwatch_db::get_article(&self.pool, article_id).await)?;
        Ok(row.map(Article::from))
    }

    async fn reset_article(&self, article_id: i64) -> Result<(), ScoringError> {
        match tdwatch_db::reset_article(&self.pool, article_id).await {
            Ok(()) => Ok(()),
            Err(DbError::NotFound) => Err(ScoringError::ArticleNotFound(article_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn load_roster(&self) -> Result<Vec<RosterEntry>, ScoringError> {
        let rows = tdwatch_db::list_active_politicians(&self.pool).await?;
        Ok(rows.into_iter().map(RosterEntry::from).collect())
    }

    async fn load_politician_state(
        &self,
        name: &str,
        evidence_since: DateTime<Utc>,
    ) -> Result<Option<PoliticianState>, ScoringError> {
        let Some(row) =
            not_found_as_none(tdwatch_db::get_politician_by_name(&self.pool, name).await)?
        else {
            return Ok(None);
        };
        let scores = tdwatch_db::list_ideology_scores(&self.pool, row.id).await?;
        let evidence =
            tdwatch_db::list_recent_evidence(&self.pool, row.id, evidence_since).await?;

        Ok(Some(PoliticianState {
            id: row.id,
            rating: PoliticianRating::from(&row),
            ideology: IdeologyProfile::from_rows(&scores),
            recent_evidence: evidence.iter().map(EvidenceRecord::from).collect(),
            name: row.name,
            party: row.party,
            constituency: row.constituency,
        }))
    }

    async fn commit_terminal(&self, resolution: &ArticleResolution) -> Result<(), ScoringError> {
        tdwatch_db::mark_article_processed(&self.pool, &terminal_update(resolution)).await?;
        Ok(())
    }

    async fn commit_article(&self, commit: &ArticleCommit) -> Result<CommitReport, ScoringError> {
        let article_id = commit.resolution.article_id;
        let mut report = CommitReport::default();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        tdwatch_db::mark_article_processed(&mut *tx, &terminal_update(&commit.resolution))
            .await?;

        for record in &commit.analyses {
            tdwatch_db::upsert_article_analysis(&mut *tx, &analysis_row(article_id, record))
                .await?;
        }

        for update in &commit.politician_updates {
            let values = PoliticianRatingValues::from(update.rating.updated);
            tdwatch_db::update_politician_rating(&mut *tx, update.politician_id, &values).await?;

            for change in &update.rating.changes {
                let mut savepoint = tx.begin().await.map_err(DbError::from)?;
                let written = tdwatch_db::insert_rating_history(
                    &mut *savepoint,
                    update.politician_id,
                    Some(article_id),
                    change.dimension.as_str(),
                    change.old,
                    change.new,
                )
                .await;
                match written {
                    Ok(_) => savepoint.commit().await.map_err(DbError::from)?,
                    Err(e) => {
                        tracing::warn!(
                            article_id,
                            politician = %update.politician_name,
                            dimension = %change.dimension,
                            error = %e,
                            "rating history write failed; continuing"
                        );
                        savepoint.rollback().await.map_err(DbError::from)?;
                        report.history_failures += 1;
                    }
                }
            }

            let Some(ideology) = &update.ideology else {
                continue;
            };
            for change in &ideology.changes {
                tdwatch_db::upsert_ideology_score(
                    &mut *tx,
                    update.politician_id,
                    change.dimension.as_str(),
                    change.new.value,
                    change.new.weight,
                )
                .await?;
            }

            let evidence = &ideology.evidence;
            let row = NewIdeologyEvidence {
                politician_id: update.politician_id,
                source_type: evidence.source_type.clone(),
                source_id: evidence.source_id.clone(),
                policy_topic: evidence.policy_topic.clone(),
                topic_category: Some(evidence.topic_category.as_str().to_string()),
                stance: evidence.stance.map(|s| s.as_str().to_string()),
                strength: evidence.strength.map(i16::from),
                deltas: serde_json::to_value(&evidence.deltas).unwrap_or_else(|_| json!({})),
                effective_weight: evidence.effective_weight,
                consistency_penalty: evidence.consistency_penalty,
                source_reliability: evidence.source_reliability,
                source_date: evidence.source_date,
            };
            let mut savepoint = tx.begin().await.map_err(DbError::from)?;
            match tdwatch_db::insert_ideology_evidence(&mut *savepoint, &row).await {
                Ok(_) => savepoint.commit().await.map_err(DbError::from)?,
                Err(e) => {
                    tracing::warn!(
                        article_id,
                        politician = %update.politician_name,
                        error = %e,
                        "ideology evidence write failed; continuing"
                    );
                    savepoint.rollback().await.map_err(DbError::from)?;
                    report.evidence_failures += 1;
                }
            }
        }

        tx.commit().await.map_err(DbError::from)?;
        Ok(report)
    }

    async fn recompute_rankings(&self) -> Result<u64, ScoringError> {
        Ok(tdwatch_db::recompute_rankings(&self.pool).await?)
    }

    async fn recompute_party_aggregates(&self) -> Result<u64, ScoringError> {
        Ok(tdwatch_db::recompute_party_aggregates(&self.pool).await?)
    }

    async fn start_run(&self, run_type: &str, trigger_source: &str) -> Result<i64, ScoringError> {
        let run = tdwatch_db::create_processing_run(&self.pool, run_type, trigger_source).await?;
        tdwatch_db::start_processing_run(&self.pool, run.id).await?;
        Ok(run.id)
    }

    async fn finish_run(&self, run_id: i64, outcome: &RunOutcome) -> Result<(), ScoringError> {
        match outcome {
            RunOutcome::Succeeded { stats } => {
                let records = i32::try_from(stats.terminal_articles()).unwrap_or(i32::MAX);
                let stats_json = serde_json::to_value(stats).unwrap_or_else(|_| json!({}));
                tdwatch_db::complete_processing_run(&self.pool, run_id, records, &stats_json)
                    .await?;
            }
            RunOutcome::Failed { error } => {
                tdwatch_db::fail_processing_run(&self.pool, run_id, error).await?;
            }
        }
        Ok(())
    }
}
