//! ELO-style rating updates.
//!
//! Each dimension moves toward the article's evidence:
//!
//! ```text
//! expected  = 1 / (1 + 10^((1500 - current) / 400))
//! weight    = confidence * credibility * 0.5^(age_days / half_life)
//! magnitude = 0.5 + |impact| / 10
//! delta     = K * magnitude * weight * (actual - expected)
//! ```
//!
//! `delta` is capped per event and the result clamped to the rating band.

use serde::{Deserialize, Serialize};
use tdwatch_core::{RatingDimension, RATING_BASELINE};
use tdwatch_db::{PoliticianRatingValues, PoliticianRow};

use crate::judgment::{ImpactJudgment, ProcessScore, Sentiment};

/// Changes smaller than this are treated as no change.
const MIN_RECORDED_DELTA: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingParams {
    pub k_factor: f64,
    pub per_event_cap: f64,
    pub floor: f64,
    pub ceiling: f64,
    pub recency_half_life_days: f64,
}

impl Default for RatingParams {
    fn default() -> Self {
        Self {
            k_factor: 32.0,
            per_event_cap: 40.0,
            floor: 800.0,
            ceiling: 2200.0,
            recency_half_life_days: 30.0,
        }
    }
}

/// The six running ratings plus story counters for one politician.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoliticianRating {
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

impl Default for PoliticianRating {
    fn default() -> Self {
        Self {
            overall: RATING_BASELINE,
            transparency: RATING_BASELINE,
            effectiveness: RATING_BASELINE,
            integrity: RATING_BASELINE,
            consistency: RATING_BASELINE,
            constituency_service: RATING_BASELINE,
            total_stories: 0,
            positive_stories: 0,
            negative_stories: 0,
            neutral_stories: 0,
        }
    }
}

impl PoliticianRating {
    #[must_use]
    pub fn get(&self, dimension: RatingDimension) -> f64 {
        match dimension {
            RatingDimension::Overall => self.overall,
            RatingDimension::Transparency => self.transparency,
            RatingDimension::Effectiveness => self.effectiveness,
            RatingDimension::Integrity => self.integrity,
            RatingDimension::Consistency => self.consistency,
            RatingDimension::ConstituencyService => self.constituency_service,
        }
    }

    pub fn set(&mut self, dimension: RatingDimension, value: f64) {
        let slot = match dimension {
            RatingDimension::Overall => &mut self.overall,
            RatingDimension::Transparency => &mut self.transparency,
            RatingDimension::Effectiveness => &mut self.effectiveness,
            RatingDimension::Integrity => &mut self.integrity,
            RatingDimension::Consistency => &mut self.consistency,
            RatingDimension::ConstituencyService => &mut self.constituency_service,
        };
        *slot = value;
    }

    fn count(&mut self, sentiment: Sentiment) {
        self.total_stories += 1;
        match sentiment {
            Sentiment::Positive => self.positive_stories += 1,
            Sentiment::Negative => self.negative_stories += 1,
            Sentiment::Neutral => self.neutral_stories += 1,
            Sentiment::Mixed => {}
        }
    }
}

impl From<&PoliticianRow> for PoliticianRating {
    fn from(row: &PoliticianRow) -> Self {
        Self {
            overall: row.overall_elo,
            transparency: row.transparency_elo,
            effectiveness: row.effectiveness_elo,
            integrity: row.integrity_elo,
            consistency: row.consistency_elo,
            constituency_service: row.constituency_service_elo,
            total_stories: row.total_stories,
            positive_stories: row.positive_stories,
            negative_stories: row.negative_stories,
            neutral_stories: row.neutral_stories,
        }
    }
}

impl From<PoliticianRating> for PoliticianRatingValues {
    fn from(r: PoliticianRating) -> Self {
        Self {
            overall: r.overall,
            transparency: r.transparency,
            effectiveness: r.effectiveness,
            integrity: r.integrity,
            consistency: r.consistency,
            constituency_service: r.constituency_service,
            total_stories: r.total_stories,
            positive_stories: r.positive_stories,
            negative_stories: r.negative_stories,
            neutral_stories: r.neutral_stories,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingChange {
    pub dimension: RatingDimension,
    pub old: f64,
    pub new: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub updated: PoliticianRating,
    /// One entry per dimension whose value actually moved.
    pub changes: Vec<RatingChange>,
}

/// Win probability against a baseline opponent.
#[must_use]
pub fn expected_score(current: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((RATING_BASELINE - current) / 400.0))
}

/// Exponential decay by article age. Future-dated articles count in full.
#[must_use]
pub fn recency_factor(age_days: f64, half_life_days: f64) -> f64 {
    if age_days <= 0.0 || half_life_days <= 0.0 {
        1.0
    } else {
        0.5f64.powf(age_days / half_life_days)
    }
}

/// Observed outcome in `[0, 1]` for one dimension, or `None` when the
/// judgment gives no evidence for it.
fn actual_score(judgment: &ImpactJudgment, dimension: RatingDimension) -> Option<f64> {
    let from_impact = (0.5 + judgment.impact_score / 20.0).clamp(0.0, 1.0);
    match dimension {
        RatingDimension::Overall => Some(from_impact),
        RatingDimension::ConstituencyService => {
            judgment.flags.constituency_focus.then_some(from_impact)
        }
        process => match judgment.process_scores.get(process) {
            Some(ProcessScore::Assessed(score)) => Some((score / 100.0).clamp(0.0, 1.0)),
            Some(ProcessScore::Unavailable) | None => None,
        },
    }
}

/// Fold one judgment into a politician's ratings.
#[must_use]
pub fn update_rating(
    current: &PoliticianRating,
    judgment: &ImpactJudgment,
    source_credibility: f64,
    article_age_days: f64,
    params: &RatingParams,
) -> RatingUpdate {
    let weight = judgment.confidence.clamp(0.0, 1.0)
        * source_credibility.clamp(0.0, 1.0)
        * recency_factor(article_age_days, params.recency_half_life_days);
    let magnitude = 0.5 + judgment.impact_score.abs() / 10.0;

    let mut updated = *current;
    let mut changes = Vec::new();

    for dimension in RatingDimension::ALL {
        let Some(actual) = actual_score(judgment, dimension) else {
            continue;
        };
        let old = current.get(dimension);
        let raw = params.k_factor * magnitude * weight * (actual - expected_score(old));
        let delta = raw.clamp(-params.per_event_cap, params.per_event_cap);
        let new = (old + delta).clamp(params.floor, params.ceiling);
        if (new - old).abs() < MIN_RECORDED_DELTA {
            continue;
        }
        updated.set(dimension, new);
        changes.push(RatingChange {
            dimension,
            old,
            new,
            delta: new - old,
        });
    }

    updated.count(judgment.sentiment);
    RatingUpdate { updated, changes }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use tdwatch_core::TopicCategory;

    use super::*;
    use crate::judgment::{JudgmentFlags, ProcessScores, StoryType};

    fn judgment(impact: f64, confidence: f64) -> ImpactJudgment {
        ImpactJudgment {
            sentiment: Sentiment::Positive,
            story_type: StoryType::PolicyAction,
            topic: TopicCategory::Housing,
            process_scores: ProcessScores {
                transparency: ProcessScore::Assessed(80.0),
                integrity: ProcessScore::Unavailable,
                effectiveness: ProcessScore::Assessed(30.0),
                consistency: ProcessScore::Unavailable,
            },
            rationale: BTreeMap::new(),
            impact_score: impact,
            confidence,
            ideology_delta: None,
            policy_stance: None,
            flags: JudgmentFlags::default(),
            summary: String::new(),
            analyzer: "test".to_string(),
        }
    }

    fn change(update: &RatingUpdate, dimension: RatingDimension) -> Option<&RatingChange> {
        update.changes.iter().find(|c| c.dimension == dimension)
    }

    #[test]
    fn expected_is_half_at_baseline() {
        assert!((expected_score(1500.0) - 0.5).abs() < 1e-12);
        assert!(expected_score(1900.0) > 0.9);
        assert!(expected_score(1100.0) < 0.1);
    }

    #[test]
    fn recency_halves_every_half_life() {
        assert!((recency_factor(30.0, 30.0) - 0.5).abs() < 1e-12);
        assert!((recency_factor(60.0, 30.0) - 0.25).abs() < 1e-12);
        assert!((recency_factor(-3.0, 30.0) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn positive_impact_raises_overall_from_baseline() {
        let update = update_rating(
            &PoliticianRating::default(),
            &judgment(6.0, 0.8),
            1.0,
            0.0,
            &RatingParams::default(),
        );
        let overall = change(&update, RatingDimension::Overall).unwrap();
        // 32 * 1.1 * 0.8 * (0.8 - 0.5)
        assert!((overall.delta - 8.448).abs() < 1e-9);
        assert!((update.updated.overall - 1508.448).abs() < 1e-9);
    }

    #[test]
    fn unavailable_process_scores_leave_dimension_untouched() {
        let update = update_rating(
            &PoliticianRating::default(),
            &judgment(6.0, 0.8),
            1.0,
            0.0,
            &RatingParams::default(),
        );
        assert!(change(&update, RatingDimension::Integrity).is_none());
        assert!(change(&update, RatingDimension::Consistency).is_none());
        assert!((update.updated.integrity - RATING_BASELINE).abs() < f64::EPSILON);
        assert!(change(&update, RatingDimension::Transparency).unwrap().delta > 0.0);
        assert!(change(&update, RatingDimension::Effectiveness).unwrap().delta < 0.0);
    }

    #[test]
    fn constituency_service_requires_focus_flag() {
        let mut j = judgment(4.0, 1.0);
        let params = RatingParams::default();
        let plain = update_rating(&PoliticianRating::default(), &j, 1.0, 0.0, &params);
        assert!(change(&plain, RatingDimension::ConstituencyService).is_none());

        j.flags.constituency_focus = true;
        let focused = update_rating(&PoliticianRating::default(), &j, 1.0, 0.0, &params);
        assert!(change(&focused, RatingDimension::ConstituencyService).is_some());
    }

    #[test]
    fn per_event_change_is_capped() {
        let mut low = PoliticianRating::default();
        low.overall = 800.0;
        let update = update_rating(
            &low,
            &judgment(10.0, 1.0),
            1.0,
            0.0,
            &RatingParams::default(),
        );
        let overall = change(&update, RatingDimension::Overall).unwrap();
        assert!((overall.delta - 40.0).abs() < 1e-9);

        let mut high = PoliticianRating::default();
        high.overall = 2200.0;
        let update = update_rating(
            &high,
            &judgment(-10.0, 1.0),
            1.0,
            0.0,
            &RatingParams::default(),
        );
        assert!((change(&update, RatingDimension::Overall).unwrap().delta + 40.0).abs() < 1e-9);
    }

    #[test]
    fn ratings_stay_in_band() {
        let mut top = PoliticianRating::default();
        top.overall = 2195.0;
        let mut params = RatingParams::default();
        params.k_factor = 400.0;
        let mut j = judgment(10.0, 1.0);
        j.process_scores = ProcessScores::unavailable();
        let update = update_rating(&top, &j, 1.0, 0.0, &params);
        assert!(update.updated.overall <= 2200.0);

        let mut bottom = PoliticianRating::default();
        bottom.overall = 805.0;
        let update = update_rating(&bottom, &judgment(-10.0, 1.0), 1.0, 0.0, &params);
        assert!(update.updated.overall >= 800.0);
    }

    #[test]
    fn zero_confidence_changes_no_rating_but_counts_story() {
        let update = update_rating(
            &PoliticianRating::default(),
            &judgment(9.0, 0.0),
            1.0,
            0.0,
            &RatingParams::default(),
        );
        assert!(update.changes.is_empty());
        assert_eq!(update.updated.total_stories, 1);
        assert_eq!(update.updated.positive_stories, 1);
    }

    #[test]
    fn mixed_sentiment_counts_total_only() {
        let mut j = judgment(0.0, 0.5);
        j.sentiment = Sentiment::Mixed;
        let params = RatingParams::default();
        let update = update_rating(&PoliticianRating::default(), &j, 1.0, 0.0, &params);
        let r = update.updated;
        assert_eq!(r.total_stories, 1);
        assert_eq!(r.positive_stories + r.negative_stories + r.neutral_stories, 0);
    }

    #[test]
    fn old_low_credibility_news_moves_less() {
        let params = RatingParams::default();
        let start = PoliticianRating::default();
        let fresh = update_rating(&start, &judgment(6.0, 0.8), 1.0, 0.0, &params);
        let stale = update_rating(&start, &judgment(6.0, 0.8), 0.5, 30.0, &params);
        let fresh_delta = change(&fresh, RatingDimension::Overall).unwrap().delta;
        let stale_delta = change(&stale, RatingDimension::Overall).unwrap().delta;
        assert!((stale_delta - fresh_delta * 0.25).abs() < 1e-9);
    }
}
