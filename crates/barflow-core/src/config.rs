use std::collections::HashMap;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("location {key}: {message}")]
    Location { key: String, message: String },
}

static UTC_OFFSET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-][0-9]{1,2}:[0-9]{2}$").expect("valid offset regex"));

/// Runtime settings, usually read from `barflow.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory holding the queued raw files for this run.
    pub queue_dir: PathBuf,
    /// Leave consumed files in the queue (useful while debugging a batch).
    pub keep_files: bool,
    pub lookup: LookupConfig,
    pub locations: Vec<LocationConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Maps the city key found in a transaction file name onto the canonical bar
/// name and the UTC offset its timestamps are recorded in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LocationConfig {
    pub key: String,
    pub name: String,
    pub utc_offset: String,
}

impl LocationConfig {
    pub fn new(key: &str, name: &str, utc_offset: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            utc_offset: utc_offset.to_string(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.thecocktaildb.com/api/json/v1/1".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_dir: PathBuf::from("queue"),
            keep_files: false,
            lookup: LookupConfig::default(),
            locations: vec![
                LocationConfig::new("BUDAPEST", "BUDAPEST", "+1:00"),
                LocationConfig::new("LONDON", "LONDON", "+0:00"),
                LocationConfig::new("NY", "NEW_YORK", "-4:00"),
            ],
        }
    }
}

impl PipelineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.location_registry()?;
        Ok(config)
    }

    pub fn location_registry(&self) -> Result<LocationRegistry, ConfigError> {
        LocationRegistry::new(self.locations.clone())
    }
}

/// Known transaction-file locations keyed by their uppercased city key.
#[derive(Debug, Clone, Default)]
pub struct LocationRegistry {
    by_key: HashMap<String, LocationConfig>,
}

impl LocationRegistry {
    pub fn new(locations: Vec<LocationConfig>) -> Result<Self, ConfigError> {
        let mut by_key = HashMap::with_capacity(locations.len());
        for location in locations {
            let key = location.key.to_uppercase();
            if !UTC_OFFSET.is_match(&location.utc_offset) {
                return Err(ConfigError::Location {
                    key,
                    message: format!(
                        "utc_offset '{}' must look like +1:00 or -04:00",
                        location.utc_offset
                    ),
                });
            }
            if location.name.trim().is_empty() {
                return Err(ConfigError::Location {
                    key,
                    message: "name must not be empty".to_string(),
                });
            }
            if by_key.contains_key(&key) {
                return Err(ConfigError::Location {
                    key,
                    message: "declared more than once".to_string(),
                });
            }
            by_key.insert(key, location);
        }
        Ok(Self { by_key })
    }

    pub fn resolve(&self, city: &str) -> Option<&LocationConfig> {
        self.by_key.get(&city.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_three_bars() {
        let registry = PipelineConfig::default()
            .location_registry()
            .expect("registry");
        assert_eq!(registry.len(), 3);
        let ny = registry.resolve("ny").expect("ny");
        assert_eq!(ny.name, "NEW_YORK");
        assert_eq!(ny.utc_offset, "-4:00");
    }

    #[test]
    fn example_file_matches_defaults() {
        let config = PipelineConfig::from_toml_str(include_str!("../../../barflow.example.toml"))
            .expect("example config");
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn parses_toml_overrides() {
        let config = PipelineConfig::from_toml_str(
            r#"
            queue_dir = "/srv/barflow/queue"
            keep_files = true

            [lookup]
            base_url = "http://localhost:8080/api"

            [[locations]]
            key = "PARIS"
            name = "PARIS"
            utc_offset = "+2:00"
            "#,
        )
        .expect("config");

        assert!(config.keep_files);
        assert_eq!(config.queue_dir, PathBuf::from("/srv/barflow/queue"));
        assert_eq!(config.lookup.base_url, "http://localhost:8080/api");
        assert_eq!(config.lookup.timeout_secs, 30);
        assert_eq!(config.locations.len(), 1);
    }

    #[test]
    fn rejects_malformed_offsets() {
        let err = PipelineConfig::from_toml_str(
            r#"
            [[locations]]
            key = "PARIS"
            name = "PARIS"
            utc_offset = "CET"
            "#,
        )
        .expect_err("offset must be rejected");
        assert!(matches!(err, ConfigError::Location { .. }));
    }

    #[test]
    fn rejects_duplicate_keys() {
        let err = LocationRegistry::new(vec![
            LocationConfig::new("ny", "NEW_YORK", "-4:00"),
            LocationConfig::new("NY", "NEW_YORK", "-5:00"),
        ])
        .expect_err("duplicate key");
        assert!(matches!(err, ConfigError::Location { .. }));
    }
}
