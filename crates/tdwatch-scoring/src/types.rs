//! Batch-level types shared across pipeline stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tdwatch_core::{PoliticianConfig, TopicCategory};
use tdwatch_db::{ArticleRow, PoliticianRow};

/// A news article as the pipeline sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub source: String,
    pub url: String,
    pub published_date: DateTime<Utc>,
    /// Source credibility in `[0, 1]`.
    pub credibility_score: f64,
    pub processed: bool,
    /// Judgments from this article have been applied to ratings.
    pub score_applied: bool,
}

impl Article {
    /// Headline on the first line, body after it. This is the text layout
    /// the mention extractor expects.
    #[must_use]
    pub fn full_text(&self) -> String {
        format!("{}\n{}", self.title, self.content)
    }

    /// Age in fractional days at `now`. Negative for future-dated articles.
    #[must_use]
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let secs = (now - self.published_date).num_seconds() as f64;
        secs / 86_400.0
    }
}

impl From<ArticleRow> for Article {
    fn from(row: ArticleRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            content: row.content,
            source: row.source,
            url: row.url,
            published_date: row.published_date,
            credibility_score: row.credibility_score.clamp(0.0, 1.0),
            processed: row.processed,
            score_applied: row.score_applied,
        }
    }
}

/// Output of the importance scorer for one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceAssessment {
    /// Always within `[0, 100]`.
    pub score: f64,
    pub topic_category: TopicCategory,
    pub primary_politicians: Vec<String>,
    pub reasoning: String,
}

impl ImportanceAssessment {
    /// Builds an assessment, clamping `score` into `[0, 100]`.
    #[must_use]
    pub fn new(
        score: f64,
        topic_category: TopicCategory,
        primary_politicians: Vec<String>,
        reasoning: String,
    ) -> Self {
        let score = if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            score,
            topic_category,
            primary_politicians,
            reasoning,
        }
    }
}

/// One roster entry used for mention matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub party: String,
    pub constituency: String,
    pub aliases: Vec<String>,
}

impl From<PoliticianRow> for RosterEntry {
    fn from(row: PoliticianRow) -> Self {
        Self {
            name: row.name,
            party: row.party,
            constituency: row.constituency,
            aliases: row.aliases,
        }
    }
}

impl From<&PoliticianConfig> for RosterEntry {
    fn from(config: &PoliticianConfig) -> Self {
        Self {
            name: config.name.clone(),
            party: config.party.clone(),
            constituency: config.constituency.clone(),
            aliases: config.aliases.clone(),
        }
    }
}

/// A politician found in an article. Never persisted on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PoliticianMention {
    pub name: String,
    pub party: String,
    pub constituency: String,
    /// Match confidence in `[0, 1]`.
    pub confidence: f64,
    pub substantial: bool,
}

/// Terminal outcome written onto an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Scored,
    SkippedLowImportance,
    Duplicate,
    Failed,
}

impl ProcessingStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::Scored => "scored",
            ProcessingStatus::SkippedLowImportance => "skipped_low_importance",
            ProcessingStatus::Duplicate => "duplicate",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run knobs for a batch.
#[derive(Debug, Clone)]
pub struct ProcessingOptions {
    pub batch_size: u32,
    /// Keep the top N percent of the batch by importance, `(0, 100]`.
    pub top_percentile: f64,
    /// Absolute importance floor, `[0, 100]`.
    pub min_importance_score: f64,
    /// Score, select, dedup, and extract, but write nothing and skip
    /// impact analysis.
    pub dry_run: bool,
    /// `cli` or `scheduler`; recorded on the processing run.
    pub trigger_source: String,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            batch_size: 50,
            top_percentile: 25.0,
            min_importance_score: 40.0,
            dry_run: false,
            trigger_source: "cli".to_string(),
        }
    }
}

/// Counters returned by a batch or single-article run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub fetched: usize,
    pub importance_scored: usize,
    pub importance_failed: usize,
    pub selected: usize,
    pub skipped_low_importance: usize,
    pub clusters: usize,
    pub duplicates: usize,
    pub canonical_processed: usize,
    pub mentions_found: usize,
    pub mentions_suppressed: usize,
    pub mentions_analyzed: usize,
    pub analyses_failed: usize,
    pub articles_failed: usize,
    pub commit_failures: usize,
    pub rating_changes: usize,
    pub ideology_updates: usize,
    pub secondary_write_failures: usize,
    pub already_processed: usize,
    pub aggregates_recomputed: bool,
}

impl ProcessingStats {
    /// Articles that reached a terminal state in this run.
    #[must_use]
    pub fn terminal_articles(&self) -> usize {
        self.importance_failed
            + self.skipped_low_importance
            + self.duplicates
            + self.canonical_processed
    }
}
