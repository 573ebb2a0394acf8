//! Weave configuration file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;
use weft_core::PageKind;
use weft_growth::EvolutionPlan;

/// Default file written by `weft init`.
pub const DEFAULT_CONFIG_FILE: &str = "weft.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for generating and evolving a mock site.
///
/// Missing fields in a config file take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaveConfig {
    /// Blend between uniform (0) and degree-proportional (1) attachment.
    pub preferential_attachment: f64,
    pub root_kind: PageKind,
    /// Path of the root page; empty serves the site at `/`.
    pub path_prefix: String,
    pub initial_hubs: usize,
    pub initial_authorities: usize,
    pub max_hubs: usize,
    pub max_authorities: usize,
    pub hub_rate_per_hour: f64,
    pub authority_rate_per_hour: f64,
    pub addr: SocketAddr,
    /// Seeds parent selection for reproducible structure.
    pub seed: Option<u64>,
}

impl Default for WeaveConfig {
    fn default() -> Self {
        Self {
            preferential_attachment: 0.8,
            root_kind: PageKind::Hub,
            path_prefix: String::new(),
            initial_hubs: 10,
            initial_authorities: 30,
            max_hubs: 50,
            max_authorities: 300,
            hub_rate_per_hour: 60.0,
            authority_rate_per_hour: 600.0,
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            seed: None,
        }
    }
}

impl WeaveConfig {
    /// Reads a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Checks the settings that do not depend on graph state.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.preferential_attachment) {
            return Err(ConfigError::Invalid(format!(
                "preferential_attachment must be within [0, 1], got {}",
                self.preferential_attachment
            )));
        }
        if self.initial_hubs > self.max_hubs {
            return Err(ConfigError::Invalid(format!(
                "initial_hubs ({}) exceeds max_hubs ({})",
                self.initial_hubs, self.max_hubs
            )));
        }
        if self.initial_authorities > self.max_authorities {
            return Err(ConfigError::Invalid(format!(
                "initial_authorities ({}) exceeds max_authorities ({})",
                self.initial_authorities, self.max_authorities
            )));
        }
        Ok(())
    }

    /// Evolution targets and rates.
    pub fn evolution_plan(&self) -> EvolutionPlan {
        EvolutionPlan {
            max_hubs: self.max_hubs,
            max_authorities: self.max_authorities,
            hub_rate_per_hour: self.hub_rate_per_hour,
            authority_rate_per_hour: self.authority_rate_per_hour,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);

        let config = WeaveConfig {
            seed: Some(42),
            path_prefix: "/site".to_string(),
            ..WeaveConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(WeaveConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{ "max_hubs": 12, "root_kind": "authority" }"#).unwrap();

        let config = WeaveConfig::load(&path).unwrap();

        assert_eq!(config.max_hubs, 12);
        assert_eq!(config.root_kind, PageKind::Authority);
        assert_eq!(config.max_authorities, WeaveConfig::default().max_authorities);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "preferential_attachment": 2.0 }"#).unwrap();
        assert!(matches!(
            WeaveConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));

        fs::write(&path, r#"{ "initial_hubs": 9, "max_hubs": 3 }"#).unwrap();
        assert!(matches!(
            WeaveConfig::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(matches!(WeaveConfig::load(&path), Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_missing_file_falls_back_only_when_unset() {
        assert_eq!(
            WeaveConfig::load_or_default(None).unwrap(),
            WeaveConfig::default()
        );

        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            WeaveConfig::load_or_default(Some(&missing)),
            Err(ConfigError::Io(_))
        ));
    }

    #[test]
    fn test_evolution_plan() {
        let plan = WeaveConfig::default().evolution_plan();
        assert_eq!(plan.max_hubs, 50);
        assert_eq!(plan.authority_rate_per_hour, 600.0);
    }
}
