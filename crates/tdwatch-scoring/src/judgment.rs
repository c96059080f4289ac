//! The typed impact judgment and its boundary validation.
//!
//! Analyzer output arrives as loosely shaped JSON ([`RawJudgment`]). It is
//! converted into an [`ImpactJudgment`] exactly once, here, and any shape or
//! range violation fails the mention instead of leaking into rating math.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tdwatch_core::{IdeologyDimension, RatingDimension, TopicCategory};

use crate::error::ScoringError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

impl Sentiment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Mixed => "mixed",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "negative" => Some(Sentiment::Negative),
            "neutral" => Some(Sentiment::Neutral),
            "mixed" => Some(Sentiment::Mixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryType {
    PolicyAction,
    Statement,
    Scandal,
    Achievement,
    ConstituencyWork,
    Campaign,
    Other,
}

impl StoryType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StoryType::PolicyAction => "policy_action",
            StoryType::Statement => "statement",
            StoryType::Scandal => "scandal",
            StoryType::Achievement => "achievement",
            StoryType::ConstituencyWork => "constituency_work",
            StoryType::Campaign => "campaign",
            StoryType::Other => "other",
        }
    }

    /// Unknown labels map to [`StoryType::Other`]; story type is descriptive
    /// and never feeds rating math.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "policy_action" | "policy" | "legislation" => StoryType::PolicyAction,
            "statement" | "speech" | "interview" => StoryType::Statement,
            "scandal" | "controversy" => StoryType::Scandal,
            "achievement" => StoryType::Achievement,
            "constituency_work" | "constituency" => StoryType::ConstituencyWork,
            "campaign" | "election" => StoryType::Campaign,
            _ => StoryType::Other,
        }
    }
}

/// A process score is either assessed or explicitly not assessed. "Not
/// assessed" is never replaced by a midpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "value")]
pub enum ProcessScore {
    Assessed(f64),
    Unavailable,
}

impl ProcessScore {
    #[must_use]
    pub fn value(self) -> Option<f64> {
        match self {
            ProcessScore::Assessed(v) => Some(v),
            ProcessScore::Unavailable => None,
        }
    }
}

/// The four behaviour-quality scores, each `0..=100` or unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessScores {
    pub transparency: ProcessScore,
    pub integrity: ProcessScore,
    pub effectiveness: ProcessScore,
    pub consistency: ProcessScore,
}

impl ProcessScores {
    pub const DIMENSIONS: [RatingDimension; 4] = [
        RatingDimension::Transparency,
        RatingDimension::Integrity,
        RatingDimension::Effectiveness,
        RatingDimension::Consistency,
    ];

    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            transparency: ProcessScore::Unavailable,
            integrity: ProcessScore::Unavailable,
            effectiveness: ProcessScore::Unavailable,
            consistency: ProcessScore::Unavailable,
        }
    }

    /// The score backing a rating dimension; `None` for `overall` and
    /// `constituency_service`, which are not process scores.
    #[must_use]
    pub fn get(&self, dimension: RatingDimension) -> Option<ProcessScore> {
        match dimension {
            RatingDimension::Transparency => Some(self.transparency),
            RatingDimension::Integrity => Some(self.integrity),
            RatingDimension::Effectiveness => Some(self.effectiveness),
            RatingDimension::Consistency => Some(self.consistency),
            RatingDimension::Overall | RatingDimension::ConstituencyService => None,
        }
    }

    pub fn set(&mut self, dimension: RatingDimension, score: ProcessScore) {
        match dimension {
            RatingDimension::Transparency => self.transparency = score,
            RatingDimension::Integrity => self.integrity = score,
            RatingDimension::Effectiveness => self.effectiveness = score,
            RatingDimension::Consistency => self.consistency = score,
            RatingDimension::Overall | RatingDimension::ConstituencyService => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Support,
    Oppose,
    Neutral,
}

impl Stance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stance::Support => "support",
            Stance::Oppose => "oppose",
            Stance::Neutral => "neutral",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "support" | "supports" | "for" => Some(Stance::Support),
            "oppose" | "opposes" | "against" => Some(Stance::Oppose),
            "neutral" => Some(Stance::Neutral),
            _ => None,
        }
    }

    /// Support against oppose, in either order. Neutral contradicts nothing.
    #[must_use]
    pub fn contradicts(self, other: Stance) -> bool {
        matches!(
            (self, other),
            (Stance::Support, Stance::Oppose) | (Stance::Oppose, Stance::Support)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStance {
    pub stance: Stance,
    /// `1..=5`.
    pub strength: u8,
    pub evidence: String,
    pub topic: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentFlags {
    pub opposition_advocacy: bool,
    pub flip_flop: bool,
    pub suspicious_timing: bool,
    pub constituency_focus: bool,
}

/// Signed shift per ideology dimension, each in `[-2, 2]`.
pub type IdeologyDelta = BTreeMap<IdeologyDimension, f64>;

/// Validated analyzer output for one (article, politician) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactJudgment {
    pub sentiment: Sentiment,
    pub story_type: StoryType,
    pub topic: TopicCategory,
    pub process_scores: ProcessScores,
    pub rationale: BTreeMap<RatingDimension, String>,
    /// `-10..=10`.
    pub impact_score: f64,
    /// `0..=1`, always supplied by the analyzer.
    pub confidence: f64,
    pub ideology_delta: Option<IdeologyDelta>,
    pub policy_stance: Option<PolicyStance>,
    pub flags: JudgmentFlags,
    pub summary: String,
    pub analyzer: String,
}

/// A stance the politician took earlier on some policy topic.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorStance {
    pub topic: String,
    pub stance: Stance,
    pub source_date: DateTime<Utc>,
}

/// What the analyzer knows about the politician besides the article.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisContext {
    pub party: String,
    pub constituency: String,
    pub prior_stances: Vec<PriorStance>,
    /// Topic assigned by importance scoring, used when the judgment omits one.
    pub topic: Option<TopicCategory>,
}

impl AnalysisContext {
    #[must_use]
    pub fn fallback_topic(&self) -> TopicCategory {
        self.topic.unwrap_or(TopicCategory::General)
    }

    /// Plain-text rendering for prompts.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!(
            "Party: {}\nConstituency: {}\n",
            self.party, self.constituency
        );
        if self.prior_stances.is_empty() {
            out.push_str("Recent recorded stances: none\n");
        } else {
            out.push_str("Recent recorded stances:\n");
            for prior in &self.prior_stances {
                out.push_str(&format!(
                    "- {} on '{}' ({})\n",
                    prior.stance.as_str(),
                    prior.topic,
                    prior.source_date.format("%Y-%m-%d")
                ));
            }
        }
        out
    }
}

/// Loose wire shape requested from the judgment capability.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJudgment {
    pub sentiment: Option<String>,
    pub story_type: Option<String>,
    pub topic: Option<String>,
    #[serde(default)]
    pub process_scores: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub rationale: BTreeMap<String, String>,
    pub impact_score: Option<f64>,
    pub confidence: Option<f64>,
    pub ideology_delta: Option<BTreeMap<String, f64>>,
    pub policy_stance: Option<RawPolicyStance>,
    #[serde(default)]
    pub opposition_advocacy: bool,
    #[serde(default)]
    pub flip_flop: bool,
    #[serde(default)]
    pub suspicious_timing: bool,
    #[serde(default)]
    pub constituency_focus: bool,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawPolicyStance {
    pub stance: String,
    pub strength: Option<f64>,
    #[serde(default)]
    pub evidence: String,
    #[serde(default)]
    pub topic: String,
}

const PROCESS_KEYS: [(&str, RatingDimension); 4] = [
    ("transparency", RatingDimension::Transparency),
    ("integrity", RatingDimension::Integrity),
    ("effectiveness", RatingDimension::Effectiveness),
    ("consistency", RatingDimension::Consistency),
];

fn malformed(msg: impl Into<String>) -> ScoringError {
    ScoringError::MalformedJudgment(msg.into())
}

fn in_range(name: &str, value: f64, min: f64, max: f64) -> Result<f64, ScoringError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(value)
    } else {
        Err(malformed(format!("{name} {value} is outside [{min}, {max}]")))
    }
}

impl RawJudgment {
    /// Validate and convert. Fails closed on any missing required field,
    /// out-of-range number, or unknown dimension.
    ///
    /// # Errors
    ///
    /// Returns [`ScoringError::MalformedJudgment`] describing the first
    /// violation found.
    pub fn validate(
        self,
        analyzer: &str,
        fallback_topic: TopicCategory,
    ) -> Result<ImpactJudgment, ScoringError> {
        let sentiment_raw = self
            .sentiment
            .ok_or_else(|| malformed("missing sentiment"))?;
        let sentiment = Sentiment::parse(&sentiment_raw)
            .ok_or_else(|| malformed(format!("unknown sentiment '{sentiment_raw}'")))?;

        let confidence = self
            .confidence
            .ok_or_else(|| malformed("missing confidence"))?;
        let confidence = in_range("confidence", confidence, 0.0, 1.0)?;

        let impact_score = self
            .impact_score
            .ok_or_else(|| malformed("missing impact_score"))?;
        let impact_score = in_range("impact_score", impact_score, -10.0, 10.0)?;

        let mut process_scores = ProcessScores::unavailable();
        for (key, value) in &self.process_scores {
            let (_, dimension) = PROCESS_KEYS
                .iter()
                .find(|(k, _)| k == key)
                .ok_or_else(|| malformed(format!("unknown process score '{key}'")))?;
            let score = match value {
                Some(v) => ProcessScore::Assessed(in_range(key, *v, 0.0, 100.0)?),
                None => ProcessScore::Unavailable,
            };
            process_scores.set(*dimension, score);
        }

        let mut rationale = BTreeMap::new();
        for (key, text) in self.rationale {
            if let Some((_, dimension)) = PROCESS_KEYS.iter().find(|(k, _)| *k == key) {
                rationale.insert(*dimension, text);
            } else if key == "overall" {
                rationale.insert(RatingDimension::Overall, text);
            }
        }

        let ideology_delta = match self.ideology_delta {
            None => None,
            Some(map) if map.is_empty() => None,
            Some(map) => {
                let mut delta = IdeologyDelta::new();
                for (key, value) in map {
                    let dimension: IdeologyDimension = key
                        .parse()
                        .map_err(|_| malformed(format!("unknown ideology dimension '{key}'")))?;
                    delta.insert(dimension, in_range(&key, value, -2.0, 2.0)?);
                }
                Some(delta)
            }
        };

        let policy_stance = match self.policy_stance {
            None => None,
            Some(raw) => {
                let stance = Stance::parse(&raw.stance)
                    .ok_or_else(|| malformed(format!("unknown stance '{}'", raw.stance)))?;
                let strength = raw
                    .strength
                    .ok_or_else(|| malformed("policy stance missing strength"))?;
                let strength = in_range("strength", strength, 1.0, 5.0)?;
                if raw.topic.trim().is_empty() {
                    return Err(malformed("policy stance missing topic"));
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let strength = strength.round() as u8;
                Some(PolicyStance {
                    stance,
                    strength,
                    evidence: raw.evidence,
                    topic: raw.topic.trim().to_string(),
                })
            }
        };

        let topic = self
            .topic
            .as_deref()
            .map_or(fallback_topic, TopicCategory::parse_lenient);
        let story_type = self
            .story_type
            .as_deref()
            .map_or(StoryType::Other, StoryType::parse_lenient);

        Ok(ImpactJudgment {
            sentiment,
            story_type,
            topic,
            process_scores,
            rationale,
            impact_score,
            confidence,
            ideology_delta,
            policy_stance,
            flags: JudgmentFlags {
                opposition_advocacy: self.opposition_advocacy,
                flip_flop: self.flip_flop,
                suspicious_timing: self.suspicious_timing,
                constituency_focus: self.constituency_focus,
            },
            summary: self.summary,
            analyzer: analyzer.to_string(),
        })
    }
}

/// Topic keys compare case- and whitespace-insensitively.
#[must_use]
pub fn normalize_topic(topic: &str) -> String {
    topic
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Sets the flip-flop flag when the judgment's stance contradicts a recorded
/// prior stance on the same topic. Never clears a flag the analyzer set.
pub fn apply_flip_flop_check(judgment: &mut ImpactJudgment, context: &AnalysisContext) {
    let Some(current) = &judgment.policy_stance else {
        return;
    };
    let topic = normalize_topic(&current.topic);
    let contradicted = context.prior_stances.iter().any(|prior| {
        normalize_topic(&prior.topic) == topic && prior.stance.contradicts(current.stance)
    });
    if contradicted {
        judgment.flags.flip_flop = true;
    }
}

#[cfg(test)]
#[path = "judgment_test.rs"]
mod tests;
