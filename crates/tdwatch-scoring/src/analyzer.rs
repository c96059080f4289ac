//! Impact analyzers: one judgment per (article, politician) pair.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tdwatch_core::TopicCategory;
use tdwatch_judge::parse_json_content;

use crate::backend::CompletionBackend;
use crate::error::ScoringError;
use crate::judgment::{
    apply_flip_flop_check, AnalysisContext, IdeologyDelta, ImpactJudgment, JudgmentFlags,
    PolicyStance, ProcessScore, ProcessScores, RawJudgment, Sentiment, StoryType,
};
use crate::prompts::{impact_user_prompt, perspective_system, IMPACT_SYSTEM};
use crate::types::{Article, PoliticianMention};

#[async_trait]
pub trait ImpactAnalyzer: Send + Sync {
    /// Recorded on every judgment and audit row.
    fn name(&self) -> &'static str;

    async fn analyze(
        &self,
        article: &Article,
        mention: &PoliticianMention,
        context: &AnalysisContext,
    ) -> Result<ImpactJudgment, ScoringError>;
}

async fn judge_once(
    backend: &dyn CompletionBackend,
    system: &str,
    user: &str,
    analyzer: &str,
    fallback_topic: TopicCategory,
) -> Result<ImpactJudgment, ScoringError> {
    let content = backend.complete(system, user).await?;
    let raw: RawJudgment = parse_json_content(&content, "impact judgment")?;
    raw.validate(analyzer, fallback_topic)
}

/// One judgment call per mention.
pub struct SinglePassAnalyzer {
    backend: Arc<dyn CompletionBackend>,
}

impl SinglePassAnalyzer {
    pub const NAME: &'static str = "single_pass";

    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ImpactAnalyzer for SinglePassAnalyzer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn analyze(
        &self,
        article: &Article,
        mention: &PoliticianMention,
        context: &AnalysisContext,
    ) -> Result<ImpactJudgment, ScoringError> {
        let user = impact_user_prompt(article, mention, context);
        let mut judgment = judge_once(
            self.backend.as_ref(),
            IMPACT_SYSTEM,
            &user,
            Self::NAME,
            context.fallback_topic(),
        )
        .await?;
        apply_flip_flop_check(&mut judgment, context);
        Ok(judgment)
    }
}

/// The panel's analyst perspectives, by label and instructions.
pub const PANEL_PERSPECTIVES: [(&str, &str); 3] = [
    (
        "accountability auditor",
        "You are an accountability auditor. Focus on honesty, disclosure, conflicts of interest, \
         and whether the politician delivered on past commitments.",
    ),
    (
        "policy analyst",
        "You are a policy analyst. Focus on the substance of the policy, its likely effects, and \
         how competently it was designed and delivered.",
    ),
    (
        "political-context reviewer",
        "You are a political-context reviewer. Focus on party dynamics, electoral timing, \
         constituency interests, and whether the politician is advocating from opposition.",
    ),
];

/// Minimum panelists that must return a valid judgment.
pub const PANEL_QUORUM: usize = 2;

/// Several analyst perspectives merged into one judgment.
pub struct PanelAnalyzer {
    backend: Arc<dyn CompletionBackend>,
}

impl PanelAnalyzer {
    pub const NAME: &'static str = "panel";

    #[must_use]
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl ImpactAnalyzer for PanelAnalyzer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn analyze(
        &self,
        article: &Article,
        mention: &PoliticianMention,
        context: &AnalysisContext,
    ) -> Result<ImpactJudgment, ScoringError> {
        let user = impact_user_prompt(article, mention, context);
        let calls = PANEL_PERSPECTIVES.into_iter().map(|(label, instructions)| {
            let system = perspective_system(instructions);
            let user = &user;
            async move {
                let result = judge_once(
                    self.backend.as_ref(),
                    &system,
                    user,
                    label,
                    context.fallback_topic(),
                )
                .await;
                (label, result)
            }
        });

        let mut successes = Vec::new();
        let mut first_error = None;
        for (label, result) in join_all(calls).await {
            match result {
                Ok(judgment) => successes.push((label, judgment)),
                Err(e) => {
                    tracing::warn!(
                        politician = %mention.name,
                        article_id = article.id,
                        perspective = label,
                        error = %e,
                        "panelist judgment failed"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        if successes.len() < PANEL_QUORUM {
            return Err(first_error.unwrap_or_else(|| {
                ScoringError::MalformedJudgment(format!(
                    "panel produced {} of {PANEL_QUORUM} required judgments",
                    successes.len()
                ))
            }));
        }

        let mut judgment = merge_panel(&successes);
        apply_flip_flop_check(&mut judgment, context);
        Ok(judgment)
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Most frequent item; ties resolve to whichever tied item appears first.
fn plurality<T: PartialEq + Copy>(items: &[T]) -> Option<(T, usize)> {
    let mut best: Option<(T, usize)> = None;
    for item in items {
        let count = items.iter().filter(|other| *other == item).count();
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((*item, count));
        }
    }
    best
}

fn merge_sentiment(sentiments: &[Sentiment]) -> (Sentiment, usize) {
    let Some((top, count)) = plurality(sentiments) else {
        return (Sentiment::Mixed, 0);
    };
    let tied = sentiments
        .iter()
        .filter(|s| **s != top)
        .any(|s| sentiments.iter().filter(|o| *o == s).count() == count);
    if tied {
        (Sentiment::Mixed, count)
    } else {
        (top, count)
    }
}

fn merge_stance(stances: &[&PolicyStance]) -> Option<PolicyStance> {
    let kinds: Vec<_> = stances.iter().map(|s| s.stance).collect();
    let (winner, count) = plurality(&kinds)?;
    let tied = kinds
        .iter()
        .filter(|k| **k != winner)
        .any(|k| kinds.iter().filter(|o| *o == k).count() == count);
    if tied {
        return None;
    }
    let backing: Vec<&&PolicyStance> = stances.iter().filter(|s| s.stance == winner).collect();
    let strengths: Vec<f64> = backing.iter().map(|s| f64::from(s.strength)).collect();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let strength = mean(&strengths).round().clamp(1.0, 5.0) as u8;
    let first = backing.first()?;
    Some(PolicyStance {
        stance: winner,
        strength,
        evidence: first.evidence.clone(),
        topic: first.topic.clone(),
    })
}

/// Combine panelist judgments, given as `(perspective, judgment)`, into one.
#[must_use]
pub fn merge_panel(panel: &[(&str, ImpactJudgment)]) -> ImpactJudgment {
    let n = panel.len();
    let judgments: Vec<&ImpactJudgment> = panel.iter().map(|(_, j)| j).collect();

    let mut process_scores = ProcessScores::unavailable();
    for dimension in ProcessScores::DIMENSIONS {
        let mut assessed: Vec<f64> = judgments
            .iter()
            .filter_map(|j| j.process_scores.get(dimension).and_then(ProcessScore::value))
            .collect();
        if assessed.len() * 2 > n {
            if let Some(m) = median(&mut assessed) {
                process_scores.set(dimension, ProcessScore::Assessed(m));
            }
        }
    }

    let sentiments: Vec<Sentiment> = judgments.iter().map(|j| j.sentiment).collect();
    let (sentiment, agreeing) = merge_sentiment(&sentiments);
    #[allow(clippy::cast_precision_loss)]
    let agreement = if n == 0 { 0.0 } else { agreeing as f64 / n as f64 };

    let impacts: Vec<f64> = judgments.iter().map(|j| j.impact_score).collect();
    let confidences: Vec<f64> = judgments.iter().map(|j| j.confidence).collect();

    let mut delta_values: BTreeMap<_, Vec<f64>> = BTreeMap::new();
    for delta in judgments.iter().filter_map(|j| j.ideology_delta.as_ref()) {
        for (dimension, value) in delta {
            delta_values.entry(*dimension).or_default().push(*value);
        }
    }
    let ideology_delta = if delta_values.is_empty() {
        None
    } else {
        Some(
            delta_values
                .into_iter()
                .map(|(dimension, values)| (dimension, mean(&values)))
                .collect::<IdeologyDelta>(),
        )
    };

    let stances: Vec<&PolicyStance> = judgments
        .iter()
        .filter_map(|j| j.policy_stance.as_ref())
        .collect();

    let flags = judgments.iter().fold(JudgmentFlags::default(), |acc, j| JudgmentFlags {
        opposition_advocacy: acc.opposition_advocacy || j.flags.opposition_advocacy,
        flip_flop: acc.flip_flop || j.flags.flip_flop,
        suspicious_timing: acc.suspicious_timing || j.flags.suspicious_timing,
        constituency_focus: acc.constituency_focus || j.flags.constituency_focus,
    });

    let story_types: Vec<_> = judgments.iter().map(|j| j.story_type).collect();
    let topics: Vec<_> = judgments.iter().map(|j| j.topic).collect();

    let mut rationale: BTreeMap<_, String> = BTreeMap::new();
    for (label, judgment) in panel {
        for (dimension, text) in &judgment.rationale {
            let entry = rationale.entry(*dimension).or_default();
            if !entry.is_empty() {
                entry.push(' ');
            }
            entry.push_str(&format!("[{label}] {text}"));
        }
    }

    let first = judgments.first();
    ImpactJudgment {
        sentiment,
        story_type: plurality(&story_types).map_or(StoryType::Other, |(s, _)| s),
        topic: plurality(&topics).map_or(TopicCategory::General, |(t, _)| t),
        process_scores,
        rationale,
        impact_score: mean(&impacts).clamp(-10.0, 10.0),
        confidence: (mean(&confidences) * agreement).clamp(0.0, 1.0),
        ideology_delta,
        policy_stance: merge_stance(&stances),
        flags,
        summary: first.map(|j| j.summary.clone()).unwrap_or_default(),
        analyzer: PanelAnalyzer::NAME.to_string(),
    }
}

#[cfg(test)]
#[path = "analyzer_test.rs"]
mod tests;
