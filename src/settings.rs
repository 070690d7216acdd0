use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_info;

pub const DEFAULT_BREAKPOINTS: [i64; 3] = [480, 600, 782];
pub const DEFAULT_SAMPLE_SIZE: usize = 3;
pub const DEFAULT_FRESHNESS_TTL_SECS: i64 = 24 * 60 * 60;

/// Grouping configuration shared by every group of a collection.
///
/// Values are checked when a collection is built, so a settings file may hold
/// values the collection later rejects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionSettings {
    pub breakpoints: Vec<i64>,
    pub sample_size: usize,
    /// Seconds.
    pub freshness_ttl: i64,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            breakpoints: DEFAULT_BREAKPOINTS.to_vec(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            freshness_ttl: DEFAULT_FRESHNESS_TTL_SECS,
        }
    }
}

impl CollectionSettings {
    /// Reads settings from `path`, falling back to the defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log_info!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", path.display()))
    }

    pub fn persist(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write settings to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("urlmetrics-{}-{name}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = CollectionSettings::load(&temp_path("missing.json")).unwrap();
        assert_eq!(settings, CollectionSettings::default());
        assert_eq!(settings.breakpoints, vec![480, 600, 782]);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = temp_path("partial.json");
        fs::write(&path, r#"{ "sample_size": 5 }"#).unwrap();

        let settings = CollectionSettings::load(&path).unwrap();
        assert_eq!(settings.sample_size, 5);
        assert_eq!(settings.freshness_ttl, DEFAULT_FRESHNESS_TTL_SECS);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_persist_then_load() {
        let path = temp_path("persist.json");
        let settings = CollectionSettings {
            breakpoints: vec![320, 1024],
            sample_size: 2,
            freshness_ttl: 0,
        };
        settings.persist(&path).unwrap();

        assert_eq!(CollectionSettings::load(&path).unwrap(), settings);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = temp_path("malformed.json");
        fs::write(&path, "not json").unwrap();

        let err = CollectionSettings::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings"));

        fs::remove_file(&path).unwrap();
    }
}
