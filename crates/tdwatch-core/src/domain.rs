//! Domain vocabulary shared by the pipeline, the database layer, and the API.
//!
//! Every enum here round-trips through a lowercase snake-case string, which is
//! the form stored in Postgres `TEXT` columns and emitted on the wire.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Baseline value every rating dimension starts from.
pub const RATING_BASELINE: f64 = 1500.0;

/// One of the six running ELO-style ratings tracked per politician.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingDimension {
    Overall,
    Transparency,
    Effectiveness,
    Integrity,
    Consistency,
    ConstituencyService,
}

impl RatingDimension {
    pub const ALL: [RatingDimension; 6] = [
        RatingDimension::Overall,
        RatingDimension::Transparency,
        RatingDimension::Effectiveness,
        RatingDimension::Integrity,
        RatingDimension::Consistency,
        RatingDimension::ConstituencyService,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RatingDimension::Overall => "overall",
            RatingDimension::Transparency => "transparency",
            RatingDimension::Effectiveness => "effectiveness",
            RatingDimension::Integrity => "integrity",
            RatingDimension::Consistency => "consistency",
            RatingDimension::ConstituencyService => "constituency_service",
        }
    }
}

impl fmt::Display for RatingDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatingDimension {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RatingDimension::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "rating dimension",
                value: s.to_string(),
            })
    }
}

/// One axis of the multidimensional ideology model.
///
/// Values run from `-10.0` to `10.0`. The sign convention per axis is
/// left-to-right as named: e.g. `economic` negative is interventionist,
/// positive is market-oriented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeologyDimension {
    Economic,
    Social,
    Cultural,
    Globalism,
    Environmental,
    Authority,
    Welfare,
    Technocratic,
}

impl IdeologyDimension {
    pub const ALL: [IdeologyDimension; 8] = [
        IdeologyDimension::Economic,
        IdeologyDimension::Social,
        IdeologyDimension::Cultural,
        IdeologyDimension::Globalism,
        IdeologyDimension::Environmental,
        IdeologyDimension::Authority,
        IdeologyDimension::Welfare,
        IdeologyDimension::Technocratic,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            IdeologyDimension::Economic => "economic",
            IdeologyDimension::Social => "social",
            IdeologyDimension::Cultural => "cultural",
            IdeologyDimension::Globalism => "globalism",
            IdeologyDimension::Environmental => "environmental",
            IdeologyDimension::Authority => "authority",
            IdeologyDimension::Welfare => "welfare",
            IdeologyDimension::Technocratic => "technocratic",
        }
    }
}

impl fmt::Display for IdeologyDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdeologyDimension {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IdeologyDimension::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "ideology dimension",
                value: s.to_string(),
            })
    }
}

/// Fixed topic taxonomy assigned by the importance scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicCategory {
    Housing,
    Healthcare,
    Economy,
    Justice,
    Immigration,
    Environment,
    Education,
    General,
}

impl TopicCategory {
    pub const ALL: [TopicCategory; 8] = [
        TopicCategory::Housing,
        TopicCategory::Healthcare,
        TopicCategory::Economy,
        TopicCategory::Justice,
        TopicCategory::Immigration,
        TopicCategory::Environment,
        TopicCategory::Education,
        TopicCategory::General,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TopicCategory::Housing => "housing",
            TopicCategory::Healthcare => "healthcare",
            TopicCategory::Economy => "economy",
            TopicCategory::Justice => "justice",
            TopicCategory::Immigration => "immigration",
            TopicCategory::Environment => "environment",
            TopicCategory::Education => "education",
            TopicCategory::General => "general",
        }
    }

    /// Lenient parse used at the judgment boundary: unknown labels fall back
    /// to [`TopicCategory::General`] rather than failing the article.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "health" | "health care" => TopicCategory::Healthcare,
            "economic" | "finance" | "budget" => TopicCategory::Economy,
            "crime" | "courts" => TopicCategory::Justice,
            "climate" | "environmental" => TopicCategory::Environment,
            other => other.parse().unwrap_or(TopicCategory::General),
        }
    }
}

impl fmt::Display for TopicCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TopicCategory::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "topic category",
                value: s.to_string(),
            })
    }
}

/// Which impact analyzer implementation the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerMode {
    /// One judgment call per (article, politician) pair.
    Single,
    /// Several analyst perspectives merged into one judgment.
    Panel,
}

impl fmt::Display for AnalyzerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalyzerMode::Single => f.write_str("single"),
            AnalyzerMode::Panel => f.write_str("panel"),
        }
    }
}

impl FromStr for AnalyzerMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(AnalyzerMode::Single),
            "panel" => Ok(AnalyzerMode::Panel),
            other => Err(CoreError::UnknownVariant {
                kind: "analyzer mode",
                value: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_dimension_round_trips_through_str() {
        for dim in RatingDimension::ALL {
            assert_eq!(dim.as_str().parse::<RatingDimension>().unwrap(), dim);
        }
    }

    #[test]
    fn ideology_dimension_rejects_unknown() {
        let err = "libertarian".parse::<IdeologyDimension>().unwrap_err();
        assert!(matches!(err, CoreError::UnknownVariant { kind: "ideology dimension", .. }));
    }

    #[test]
    fn topic_lenient_parse_maps_synonyms_and_unknowns() {
        assert_eq!(TopicCategory::parse_lenient("Housing"), TopicCategory::Housing);
        assert_eq!(TopicCategory::parse_lenient("health"), TopicCategory::Healthcare);
        assert_eq!(TopicCategory::parse_lenient(" Climate "), TopicCategory::Environment);
        assert_eq!(TopicCategory::parse_lenient("sport"), TopicCategory::General);
    }

    #[test]
    fn analyzer_mode_parses_known_values() {
        assert_eq!("single".parse::<AnalyzerMode>().unwrap(), AnalyzerMode::Single);
        assert_eq!("panel".parse::<AnalyzerMode>().unwrap(), AnalyzerMode::Panel);
        assert!("ensemble".parse::<AnalyzerMode>().is_err());
    }

    #[test]
    fn rating_dimension_serializes_snake_case() {
        let json = serde_json::to_string(&RatingDimension::ConstituencyService).unwrap();
        assert_eq!(json, "\"constituency_service\"");
    }
}
