use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One roster entry from `config/politicians.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoliticianConfig {
    pub name: String,
    pub party: String,
    pub constituency: String,
    /// Alternative spellings or name forms seen in coverage
    /// (e.g. "Mary Lou" for "Mary Lou McDonald").
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl PoliticianConfig {
    /// Last whitespace-separated token of the name, used for
    /// honorific + surname matching ("Minister Byrne").
    #[must_use]
    pub fn surname(&self) -> Option<&str> {
        self.name.split_whitespace().last()
    }
}

#[derive(Debug, Deserialize)]
pub struct PoliticiansFile {
    pub politicians: Vec<PoliticianConfig>,
}

/// Load and validate the politician roster from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_politicians(path: &Path) -> Result<PoliticiansFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_politicians(&content)
}

/// Parse and validate a roster from YAML text.
///
/// # Errors
///
/// Returns `ConfigError::FileParse` on malformed YAML or
/// `ConfigError::Validation` on empty fields and duplicates.
pub fn parse_politicians(content: &str) -> Result<PoliticiansFile, ConfigError> {
    let file: PoliticiansFile = serde_yaml::from_str(content).map_err(ConfigError::FileParse)?;
    validate_politicians(&file)?;
    Ok(file)
}

fn validate_politicians(file: &PoliticiansFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for p in &file.politicians {
        if p.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "politician name must be non-empty".to_string(),
            ));
        }
        if p.party.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "politician '{}' has an empty party",
                p.name
            )));
        }
        if p.constituency.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "politician '{}' has an empty constituency",
                p.name
            )));
        }
        if !seen_names.insert(p.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate politician name: '{}'",
                p.name
            )));
        }
    }

    // An alias that is another politician's full name would make mentions ambiguous.
    for p in &file.politicians {
        for alias in &p.aliases {
            let lower = alias.to_lowercase();
            if lower != p.name.to_lowercase() && seen_names.contains(&lower) {
                return Err(ConfigError::Validation(format!(
                    "alias '{alias}' of '{}' collides with another politician's name",
                    p.name
                )));
            }
        }
    }

    Ok(())
}
