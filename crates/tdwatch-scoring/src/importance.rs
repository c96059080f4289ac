//! Importance scoring and batch selection.
//!
//! Selection keeps an article only if it is inside the top-percentile cutoff
//! of its batch AND at or above the absolute importance floor. Either test
//! alone is not enough.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tdwatch_core::TopicCategory;
use tdwatch_judge::parse_json_content;

use crate::backend::CompletionBackend;
use crate::error::ScoringError;
use crate::prompts::{importance_user_prompt, IMPORTANCE_SYSTEM};
use crate::types::{Article, ImportanceAssessment};

#[async_trait]
pub trait ImportanceScorer: Send + Sync {
    async fn score_importance(&self, article: &Article)
        -> Result<ImportanceAssessment, ScoringError>;
}

#[derive(Debug, Deserialize)]
struct RawImportance {
    score: Option<f64>,
    #[serde(default)]
    topic_category: Option<String>,
    #[serde(default)]
    primary_politicians: Vec<String>,
    #[serde(default)]
    reasoning: String,
}

/// Importance scorer backed by the judgment capability.
pub struct LlmImportanceScorer {
    backend: Arc<dyn CompletionBackend>,
}

impl LlmImportanceScorer {
    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ImportanceScorer for LlmImportanceScorer {
    async fn score_importance(
        &self,
        article: &Article,
    ) -> Result<ImportanceAssessment, ScoringError> {
        let content = self
            .backend
            .complete(IMPORTANCE_SYSTEM, &importance_user_prompt(article))
            .await?;
        let raw: RawImportance = parse_json_content(&content, "importance")?;

        let score = raw
            .score
            .ok_or_else(|| ScoringError::MalformedJudgment("importance missing score".into()))?;
        if !score.is_finite() {
            return Err(ScoringError::MalformedJudgment(format!(
                "importance score {score} is not a number"
            )));
        }
        let topic = raw
            .topic_category
            .as_deref()
            .map_or(TopicCategory::General, TopicCategory::parse_lenient);
        let primary = raw
            .primary_politicians
            .into_iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();

        Ok(ImportanceAssessment::new(score, topic, primary, raw.reasoning))
    }
}

/// Selection result for one article.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionDecision {
    pub article_id: i64,
    /// Zero-based position in the batch ranking.
    pub rank: usize,
    pub selected: bool,
    /// Why the article was rejected; `None` when selected.
    pub reason: Option<String>,
}

/// Number of ranks admitted by `top_percentile` for a batch of `n`.
#[must_use]
pub fn percentile_cutoff(n: usize, top_percentile: f64) -> usize {
    if n == 0 {
        return 0;
    }
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let cutoff = (n as f64 * top_percentile / 100.0).ceil() as usize;
    cutoff.clamp(1, n)
}

fn format_percent(p: f64) -> String {
    if (p.fract()).abs() < f64::EPSILON {
        format!("{p:.0}")
    } else {
        format!("{p}")
    }
}

/// Ranks `(article_id, score)` pairs by score descending (ties by id) and
/// applies both selection tests. Output is in rank order.
#[must_use]
pub fn select_by_importance(
    scored: &[(i64, f64)],
    top_percentile: f64,
    min_importance_score: f64,
) -> Vec<SelectionDecision> {
    let mut ranked: Vec<(i64, f64)> = scored.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    let n = ranked.len();
    let cutoff = percentile_cutoff(n, top_percentile);

    ranked
        .into_iter()
        .enumerate()
        .map(|(rank, (article_id, score))| {
            let mut failures = Vec::new();
            if score < min_importance_score {
                failures.push(format!(
                    "below minimum importance ({score:.1} < {min_importance_score:.1})"
                ));
            }
            if rank >= cutoff {
                failures.push(format!(
                    "outside top {}% of batch (rank {} of {n})",
                    format_percent(top_percentile),
                    rank + 1
                ));
            }
            let selected = failures.is_empty();
            SelectionDecision {
                article_id,
                rank,
                selected,
                reason: if selected {
                    None
                } else {
                    Some(failures.join("; "))
                },
            }
        })
        .collect()
}
