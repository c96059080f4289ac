//! Source reliability tiers.
//!
//! Maps an article's source (outlet name and/or URL host) to one of four
//! ordered tiers, and each tier to a reliability coefficient used to scale
//! ideology adjustments. The tier order is fixed:
//! official record > major outlet > minor outlet > social media.
//!
//! Lookup order: URL host (exact, then parent domain) → outlet name alias →
//! default tier. Loaded from `config/sources.yaml` when present; otherwise
//! the built-in seed is used.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTier {
    Official,
    MajorOutlet,
    MinorOutlet,
    SocialMedia,
}

impl fmt::Display for SourceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceTier::Official => "official",
            SourceTier::MajorOutlet => "major_outlet",
            SourceTier::MinorOutlet => "minor_outlet",
            SourceTier::SocialMedia => "social_media",
        };
        f.write_str(s)
    }
}

/// Reliability coefficient per tier, each in `(0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TierWeights {
    pub official: f64,
    pub major_outlet: f64,
    pub minor_outlet: f64,
    pub social_media: f64,
}

impl Default for TierWeights {
    fn default() -> Self {
        Self {
            official: 1.0,
            major_outlet: 0.85,
            minor_outlet: 0.6,
            social_media: 0.3,
        }
    }
}

impl TierWeights {
    #[must_use]
    pub fn weight(&self, tier: SourceTier) -> f64 {
        match tier {
            SourceTier::Official => self.official,
            SourceTier::MajorOutlet => self.major_outlet,
            SourceTier::MinorOutlet => self.minor_outlet,
            SourceTier::SocialMedia => self.social_media,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReliabilityConfig {
    #[serde(default)]
    pub tiers: TierWeights,
    #[serde(default = "default_tier")]
    pub default_tier: SourceTier,
    /// Host (without `www.`) → tier.
    #[serde(default)]
    pub domains: HashMap<String, SourceTier>,
    /// Lowercased outlet display name → tier.
    #[serde(default)]
    pub names: HashMap<String, SourceTier>,
}

fn default_tier() -> SourceTier {
    SourceTier::MinorOutlet
}

impl Default for SourceReliabilityConfig {
    fn default() -> Self {
        Self::default_seed()
    }
}

impl SourceReliabilityConfig {
    /// Built-in seed covering the Oireachtas record, national broadcasters and
    /// papers, and the main social platforms.
    #[must_use]
    pub fn default_seed() -> Self {
        let domains = [
            ("oireachtas.ie", SourceTier::Official),
            ("gov.ie", SourceTier::Official),
            ("irishstatutebook.ie", SourceTier::Official),
            ("rte.ie", SourceTier::MajorOutlet),
            ("irishtimes.com", SourceTier::MajorOutlet),
            ("independent.ie", SourceTier::MajorOutlet),
            ("irishexaminer.com", SourceTier::MajorOutlet),
            ("thejournal.ie", SourceTier::MajorOutlet),
            ("businesspost.ie", SourceTier::MajorOutlet),
            ("twitter.com", SourceTier::SocialMedia),
            ("x.com", SourceTier::SocialMedia),
            ("facebook.com", SourceTier::SocialMedia),
            ("tiktok.com", SourceTier::SocialMedia),
            ("reddit.com", SourceTier::SocialMedia),
            ("instagram.com", SourceTier::SocialMedia),
        ];
        let names = [
            ("oireachtas", SourceTier::Official),
            ("rte", SourceTier::MajorOutlet),
            ("rté", SourceTier::MajorOutlet),
            ("rte news", SourceTier::MajorOutlet),
            ("the irish times", SourceTier::MajorOutlet),
            ("irish times", SourceTier::MajorOutlet),
            ("irish independent", SourceTier::MajorOutlet),
            ("irish examiner", SourceTier::MajorOutlet),
            ("thejournal.ie", SourceTier::MajorOutlet),
            ("the journal", SourceTier::MajorOutlet),
            ("business post", SourceTier::MajorOutlet),
            ("twitter", SourceTier::SocialMedia),
            ("x", SourceTier::SocialMedia),
            ("facebook", SourceTier::SocialMedia),
            ("tiktok", SourceTier::SocialMedia),
            ("reddit", SourceTier::SocialMedia),
        ];

        Self {
            tiers: TierWeights::default(),
            default_tier: default_tier(),
            domains: domains
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            names: names.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }

    /// Resolve the tier for an article's outlet name and URL.
    #[must_use]
    pub fn tier_for(&self, source_name: &str, url: Option<&str>) -> SourceTier {
        if let Some(host) = url.and_then(host_of) {
            if let Some(tier) = self.domains.get(&host) {
                return *tier;
            }
            // Parent-domain fallback: "news.rte.ie" → "rte.ie".
            let mut rest = host.as_str();
            while let Some((_, parent)) = rest.split_once('.') {
                if let Some(tier) = self.domains.get(parent) {
                    return *tier;
                }
                rest = parent;
            }
        }

        let name = source_name.trim().to_lowercase();
        if let Some(tier) = self.names.get(&name) {
            return *tier;
        }
        if let Some(tier) = self.domains.get(&name) {
            return *tier;
        }

        self.default_tier
    }

    /// Tier and coefficient in one lookup.
    #[must_use]
    pub fn reliability_for(&self, source_name: &str, url: Option<&str>) -> (SourceTier, f64) {
        let tier = self.tier_for(source_name, url);
        (tier, self.tiers.weight(tier))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tiers;
        let ordered = [t.official, t.major_outlet, t.minor_outlet, t.social_media];
        if ordered.iter().any(|w| !(*w > 0.0 && *w <= 1.0)) {
            return Err(ConfigError::Validation(
                "source tier weights must be in (0, 1]".to_string(),
            ));
        }
        if ordered.windows(2).any(|pair| pair[0] <= pair[1]) {
            return Err(ConfigError::Validation(
                "source tier weights must strictly decrease: \
                 official > major_outlet > minor_outlet > social_media"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Load the reliability table, falling back to the built-in seed when the
/// file does not exist.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// violates the tier ordering.
pub fn load_sources(path: &Path) -> Result<SourceReliabilityConfig, ConfigError> {
    if !path.exists() {
        return Ok(SourceReliabilityConfig::default_seed());
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sources(&content)
}

/// Parse and validate a reliability table from YAML text. Keys are normalized
/// to lowercase and `www.` prefixes are dropped.
///
/// # Errors
///
/// Returns `ConfigError::FileParse` or `ConfigError::Validation`.
pub fn parse_sources(content: &str) -> Result<SourceReliabilityConfig, ConfigError> {
    let mut config: SourceReliabilityConfig =
        serde_yaml::from_str(content).map_err(ConfigError::FileParse)?;
    config.domains = config
        .domains
        .into_iter()
        .map(|(k, v)| (normalize_host(&k), v))
        .collect();
    config.names = config
        .names
        .into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect();
    config.validate()?;
    Ok(config)
}

fn normalize_host(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    lower.strip_prefix("www.").unwrap_or(&lower).to_string()
}

/// Normalized host of an absolute URL, or `None` when it does not parse.
fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?;
    if host.is_empty() {
        None
    } else {
        Some(normalize_host(host))
    }
}
