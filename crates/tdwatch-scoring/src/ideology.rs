//! Incremental ideology profile updates.
//!
//! Each dimension holds a value and the evidence weight accumulated so far. An
//! adjustment of weight `w` shifts the value by `delta * w / (W + w)`, where
//! `W` is the accumulated weight (or a fresh prior), so established positions
//! move less. `w` is scaled by stance strength, analyzer confidence, source
//! reliability, topic salience, and two penalties (opposition advocacy,
//! inconsistency with recent evidence). Values are only ever moved by new
//! evidence, never recomputed.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tdwatch_core::{IdeologyDimension, TopicCategory};
use tdwatch_db::{IdeologyEvidenceRow, IdeologyScoreRow};

use crate::judgment::{normalize_topic, IdeologyDelta, PolicyStance, Stance};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdeologyParams {
    /// Stance strength is divided by this to get the base weight.
    pub stance_strength_scale: f64,
    /// Base weight when there is no stance and the caller gives none.
    pub default_base_weight: f64,
    pub opposition_advocacy_factor: f64,
    pub consistency_penalty: f64,
    pub contradiction_window_days: i64,
    pub direction_tolerance: f64,
    /// Accumulated weight assumed for a dimension with no evidence yet.
    pub fresh_prior_weight: f64,
    pub min_value: f64,
    pub max_value: f64,
}

impl Default for IdeologyParams {
    fn default() -> Self {
        Self {
            stance_strength_scale: 5.0,
            default_base_weight: 0.5,
            opposition_advocacy_factor: 0.5,
            consistency_penalty: 0.4,
            contradiction_window_days: 90,
            direction_tolerance: 0.5,
            fresh_prior_weight: 1.0,
            min_value: -10.0,
            max_value: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub value: f64,
    /// Accumulated evidence weight. Zero means no data, not a centrist
    /// position.
    pub weight: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdeologyProfile {
    scores: BTreeMap<IdeologyDimension, DimensionScore>,
}

impl IdeologyProfile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, dimension: IdeologyDimension) -> DimensionScore {
        self.scores.get(&dimension).copied().unwrap_or_default()
    }

    /// `None` when the dimension has no accumulated evidence.
    #[must_use]
    pub fn value(&self, dimension: IdeologyDimension) -> Option<f64> {
        let score = self.get(dimension);
        (score.weight > 0.0).then_some(score.value)
    }

    pub fn set(&mut self, dimension: IdeologyDimension, score: DimensionScore) {
        self.scores.insert(dimension, score);
    }

    /// Rows with unknown dimension names are skipped.
    #[must_use]
    pub fn from_rows(rows: &[IdeologyScoreRow]) -> Self {
        let scores = rows
            .iter()
            .filter_map(|row| {
                let dimension = row.dimension.parse::<IdeologyDimension>().ok()?;
                Some((
                    dimension,
                    DimensionScore {
                        value: row.value,
                        weight: row.weight,
                    },
                ))
            })
            .collect();
        Self { scores }
    }
}

/// Relevance of an ideology dimension to a topic, in `(0, 1]`.
#[must_use]
pub fn salience(topic: TopicCategory, dimension: IdeologyDimension) -> f64 {
    use IdeologyDimension as D;
    use TopicCategory as T;

    match (topic, dimension) {
        (T::General, _) => 0.5,

        (T::Housing, D::Economic | D::Welfare)
        | (T::Healthcare, D::Welfare)
        | (T::Economy, D::Economic)
        | (T::Justice, D::Authority)
        | (T::Immigration, D::Globalism | D::Cultural)
        | (T::Environment, D::Environmental) => 1.0,

        (T::Healthcare, D::Economic)
        | (T::Justice, D::Social)
        | (T::Education, D::Social | D::Welfare) => 0.7,

        (T::Economy, D::Globalism | D::Welfare)
        | (T::Immigration, D::Authority)
        | (T::Environment, D::Economic)
        | (T::Education, D::Cultural) => 0.6,

        (T::Housing, D::Social)
        | (T::Healthcare, D::Social | D::Technocratic)
        | (T::Economy, D::Technocratic)
        | (T::Justice, D::Cultural)
        | (T::Immigration, D::Social)
        | (T::Environment, D::Globalism | D::Technocratic)
        | (T::Education, D::Technocratic) => 0.5,

        _ => 0.25,
    }
}

/// A previously applied adjustment, as used by the consistency check.
#[derive(Debug, Clone, PartialEq)]
pub struct EvidenceRecord {
    pub policy_topic: Option<String>,
    /// Topic category of the judgment. `None` on rows recorded without one.
    pub topic_category: Option<TopicCategory>,
    pub stance: Option<Stance>,
    pub deltas: IdeologyDelta,
    pub source_date: DateTime<Utc>,
}

impl From<&IdeologyEvidenceRow> for EvidenceRecord {
    fn from(row: &IdeologyEvidenceRow) -> Self {
        let deltas = match serde_json::from_value(row.deltas.clone()) {
            Ok(deltas) => deltas,
            Err(e) => {
                tracing::warn!(
                    evidence_id = row.id,
                    politician_id = row.politician_id,
                    error = %e,
                    "malformed stored ideology deltas; row ignored for direction checks"
                );
                IdeologyDelta::new()
            }
        };
        Self {
            policy_topic: row.policy_topic.clone(),
            topic_category: row.topic_category.as_deref().and_then(|t| t.parse().ok()),
            stance: row.stance.as_deref().and_then(Stance::parse),
            deltas,
            source_date: row.source_date,
        }
    }
}

/// Provenance and scaling inputs for one adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentMetadata {
    pub source_type: String,
    pub source_id: String,
    pub source_date: DateTime<Utc>,
    pub topic: TopicCategory,
    pub confidence: f64,
    pub source_reliability: f64,
    pub policy_stance: Option<PolicyStance>,
    /// Used only when there is no policy stance.
    pub base_weight: Option<f64>,
    pub opposition_advocacy: bool,
}

/// Evidence row produced by an applied adjustment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdeologyEvidence {
    pub source_type: String,
    pub source_id: String,
    pub policy_topic: Option<String>,
    pub topic_category: TopicCategory,
    pub stance: Option<Stance>,
    pub strength: Option<u8>,
    pub deltas: IdeologyDelta,
    pub effective_weight: f64,
    pub consistency_penalty: f64,
    pub source_reliability: f64,
    pub source_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IdeologyChange {
    pub dimension: IdeologyDimension,
    pub old: DimensionScore,
    pub new: DimensionScore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdeologyUpdate {
    pub updated: IdeologyProfile,
    /// Weight before topic salience is applied per dimension.
    pub effective_weight: f64,
    pub consistency_penalty: f64,
    pub changes: Vec<IdeologyChange>,
    pub evidence: IdeologyEvidence,
}

fn base_weight(metadata: &AdjustmentMetadata, params: &IdeologyParams) -> f64 {
    match &metadata.policy_stance {
        Some(stance) => f64::from(stance.strength) / params.stance_strength_scale,
        None => metadata.base_weight.unwrap_or(params.default_base_weight),
    }
    .clamp(0.0, 1.0)
}

/// `true` when this adjustment disagrees with recent evidence on the same
/// topic: an opposite stance, or a delta pulling the other way from a prior
/// one by more than the tolerance. With a policy stance, "same topic" means
/// the same policy topic; without one, the same topic category.
fn is_inconsistent(
    delta: &IdeologyDelta,
    metadata: &AdjustmentMetadata,
    recent: &[EvidenceRecord],
    params: &IdeologyParams,
) -> bool {
    let window_start = metadata.source_date - Duration::days(params.contradiction_window_days);
    let topic = metadata
        .policy_stance
        .as_ref()
        .map(|s| normalize_topic(&s.topic));

    let comparable = recent.iter().filter(|e| e.source_date >= window_start).filter(|e| {
        match (&topic, &e.policy_topic) {
            (Some(t), Some(prior)) => *t == normalize_topic(prior),
            (Some(_), None) => false,
            (None, _) => e.topic_category == Some(metadata.topic),
        }
    });

    for prior in comparable {
        if let (Some(new), Some(old)) = (&metadata.policy_stance, prior.stance) {
            if new.stance.contradicts(old) {
                return true;
            }
        }
        let opposing = delta.iter().any(|(dim, value)| {
            prior.deltas.get(dim).is_some_and(|old| {
                value.signum() * old.signum() < 0.0
                    && (value - old).abs() > params.direction_tolerance
            })
        });
        if opposing {
            return true;
        }
    }
    false
}

/// Apply one ideology delta to a profile.
#[must_use]
pub fn apply_adjustments(
    profile: &IdeologyProfile,
    delta: &IdeologyDelta,
    metadata: &AdjustmentMetadata,
    recent_evidence: &[EvidenceRecord],
    params: &IdeologyParams,
) -> IdeologyUpdate {
    let penalty = if is_inconsistent(delta, metadata, recent_evidence, params) {
        params.consistency_penalty
    } else {
        1.0
    };
    let advocacy = if metadata.opposition_advocacy {
        params.opposition_advocacy_factor
    } else {
        1.0
    };
    let effective_weight = base_weight(metadata, params)
        * metadata.confidence.clamp(0.0, 1.0)
        * metadata.source_reliability.clamp(0.0, 1.0)
        * advocacy
        * penalty;

    let mut updated = profile.clone();
    let mut changes = Vec::new();

    for (&dimension, &shift) in delta {
        let w = effective_weight * salience(metadata.topic, dimension);
        if w <= 0.0 || shift.abs() < f64::EPSILON {
            continue;
        }
        let old = profile.get(dimension);
        let prior = if old.weight > 0.0 {
            old.weight
        } else {
            params.fresh_prior_weight
        };
        let value =
            (old.value + shift * w / (prior + w)).clamp(params.min_value, params.max_value);
        let new = DimensionScore {
            value,
            weight: old.weight + w,
        };
        updated.set(dimension, new);
        changes.push(IdeologyChange { dimension, old, new });
    }

    let evidence = IdeologyEvidence {
        source_type: metadata.source_type.clone(),
        source_id: metadata.source_id.clone(),
        policy_topic: metadata.policy_stance.as_ref().map(|s| s.topic.clone()),
        topic_category: metadata.topic,
        stance: metadata.policy_stance.as_ref().map(|s| s.stance),
        strength: metadata.policy_stance.as_ref().map(|s| s.strength),
        deltas: delta.clone(),
        effective_weight,
        consistency_penalty: penalty,
        source_reliability: metadata.source_reliability,
        source_date: metadata.source_date,
    };

    IdeologyUpdate {
        updated,
        effective_weight,
        consistency_penalty: penalty,
        changes,
        evidence,
    }
}
