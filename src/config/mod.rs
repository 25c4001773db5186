//! # Config Module
//!
//! Settings shared by the CLI and any other front end, loaded from a JSON
//! file. Every field has a default, so a config file only needs the values
//! it changes:
//!
//! ```json
//! { "thresholds": { "hamming_ratio": 0.15 }, "metric": "euclidean" }
//! ```

use crate::core::capture::CaptureConfig;
use crate::core::extractor::{validate_size, FingerprintConfig};
use crate::core::fingerprint::FingerprintKind;
use crate::core::ranking::{RankConfig, RankMetric, SearchMode};
use crate::core::scanner::ScanConfig;
use crate::core::scorer::Thresholds;
use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = "photo-catalog";

/// Which fingerprint new items get
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintSettings {
    pub kind: FingerprintKind,
    /// Grid size; `None` uses the kind's default
    pub size: Option<u32>,
}

impl Default for FingerprintSettings {
    fn default() -> Self {
        Self {
            kind: FingerprintKind::DHash,
            size: None,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// SQLite file; `None` uses the per-user data directory
    pub database_path: Option<PathBuf>,
    pub fingerprint: FingerprintSettings,
    pub capture: CaptureConfig,
    pub thresholds: Thresholds,
    /// Distance used to order HSV-mean results
    pub metric: RankMetric,
    pub scan: ScanConfig,
}

impl CatalogConfig {
    /// `<data dir>/photo-catalog/catalog.db`
    pub fn default_database_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("catalog.db")
    }

    /// `<config dir>/photo-catalog/config.json`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.json"))
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(Self::default_database_path)
    }

    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            CatalogError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| CatalogError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;

        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `path` if given, else the default config file if it exists,
    /// else built-in defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_config_path() {
                Some(default) if default.is_file() => Self::load(&default),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Write the config as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CatalogError::Config(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CatalogError::Config(e.to_string()))?;
        fs::write(path, json)
            .map_err(|e| CatalogError::Config(format!("cannot write {}: {}", path.display(), e)))
    }

    /// Reject values that would only fail later, deep inside a run
    pub fn validate(&self) -> Result<()> {
        if let Some(size) = self.fingerprint.size {
            validate_size(size)?;
        }
        if self.capture.size == 0 {
            return Err(CatalogError::Config(
                "capture.size must be positive".to_string(),
            ));
        }
        if !(1..=100).contains(&self.capture.jpeg_quality) {
            return Err(CatalogError::Config(
                "capture.jpeg_quality must be between 1 and 100".to_string(),
            ));
        }
        if !self.thresholds.euclidean.is_finite() || self.thresholds.euclidean < 0.0 {
            return Err(CatalogError::Config(
                "thresholds.euclidean must be a non-negative number".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.thresholds.hamming_ratio) {
            return Err(CatalogError::Config(
                "thresholds.hamming_ratio must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Extractor settings for new fingerprints
    pub fn fingerprint_config(&self) -> FingerprintConfig {
        let config = FingerprintConfig::new().kind(self.fingerprint.kind);
        match self.fingerprint.size {
            Some(size) => config.size(size),
            None => config,
        }
    }

    /// Ranking settings for a search
    pub fn rank_config(&self, mode: SearchMode) -> RankConfig {
        RankConfig::new()
            .metric(self.metric)
            .thresholds(self.thresholds)
            .mode(mode)
    }
}
