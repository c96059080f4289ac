//! The persistence port used by the pipeline.
//!
//! Everything the orchestrator reads or writes goes through
//! [`PipelineStore`], so batches can run against Postgres ([`crate::PgStore`])
//! or an in-memory double in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ScoringError;
use crate::ideology::{EvidenceRecord, IdeologyProfile, IdeologyUpdate};
use crate::judgment::ImpactJudgment;
use crate::rating::{PoliticianRating, RatingUpdate};
use crate::types::{Article, ImportanceAssessment, ProcessingStatus, ProcessingStats, RosterEntry};

/// A politician's current state as needed to apply one article.
#[derive(Debug, Clone, PartialEq)]
pub struct PoliticianState {
    pub id: i64,
    pub name: String,
    pub party: String,
    pub constituency: String,
    pub rating: PoliticianRating,
    pub ideology: IdeologyProfile,
    /// Evidence dated on or after the requested cutoff, newest first.
    pub recent_evidence: Vec<EvidenceRecord>,
}

/// Terminal write-back for one article.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleResolution {
    pub article_id: i64,
    pub status: ProcessingStatus,
    pub reason: Option<String>,
    pub importance: Option<ImportanceAssessment>,
    pub duplicate_of: Option<i64>,
    pub event_name: Option<String>,
    pub summary: Option<String>,
    pub error_message: Option<String>,
    pub score_applied: bool,
}

impl ArticleResolution {
    /// A resolution with only the status set.
    #[must_use]
    pub fn new(article_id: i64, status: ProcessingStatus) -> Self {
        Self {
            article_id,
            status,
            reason: None,
            importance: None,
            duplicate_of: None,
            event_name: None,
            summary: None,
            error_message: None,
            score_applied: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Applied(ImpactJudgment),
    Failed { analyzer: String, error: String },
}

/// Audit record for one (article, politician) analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub politician_name: String,
    pub outcome: AnalysisOutcome,
}

/// State changes for one politician from one article.
#[derive(Debug, Clone, PartialEq)]
pub struct PoliticianUpdate {
    pub politician_id: i64,
    pub politician_name: String,
    pub rating: RatingUpdate,
    pub ideology: Option<IdeologyUpdate>,
}

/// Everything written for a canonical article, in one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleCommit {
    pub resolution: ArticleResolution,
    pub analyses: Vec<AnalysisRecord>,
    pub politician_updates: Vec<PoliticianUpdate>,
}

/// Secondary writes that failed without aborting the commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub history_failures: usize,
    pub evidence_failures: usize,
}

impl CommitReport {
    #[must_use]
    pub fn secondary_failures(&self) -> usize {
        self.history_failures + self.evidence_failures
    }
}

/// How a processing run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    Succeeded { stats: ProcessingStats },
    Failed { error: String },
}

#[async_trait]
pub trait PipelineStore: Send + Sync {
    /// Unprocessed articles, newest first, at most `limit`.
    async fn fetch_unprocessed(&self, limit: u32) -> Result<Vec<Article>, ScoringError>;

    async fn fetch_article(&self, article_id: i64) -> Result<Option<Article>, ScoringError>;

    /// Clear the processed flag and all written-back fields for a manual
    /// reprocess.
    async fn reset_article(&self, article_id: i64) -> Result<(), ScoringError>;

    async fn load_roster(&self) -> Result<Vec<RosterEntry>, ScoringError>;

    /// `None` when no politician has this name.
    async fn load_politician_state(
        &self,
        name: &str,
        evidence_since: DateTime<Utc>,
    ) -> Result<Option<PoliticianState>, ScoringError>;

    /// Mark a skipped, duplicate, or failed article processed.
    async fn commit_terminal(&self, resolution: &ArticleResolution) -> Result<(), ScoringError>;

    /// Apply and mark a canonical article processed, atomically.
    async fn commit_article(&self, commit: &ArticleCommit) -> Result<CommitReport, ScoringError>;

    /// Returns the number of politicians ranked.
    async fn recompute_rankings(&self) -> Result<u64, ScoringError>;

    /// Returns the number of parties aggregated.
    async fn recompute_party_aggregates(&self) -> Result<u64, ScoringError>;

    /// Record a new run as running; returns its id.
    async fn start_run(&self, run_type: &str, trigger_source: &str) -> Result<i64, ScoringError>;

    async fn finish_run(&self, run_id: i64, outcome: &RunOutcome) -> Result<(), ScoringError>;
}
