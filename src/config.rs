//! Engine configuration.
//!
//! Configuration is YAML-first so deployments can tune the engine
//! without recompiling:
//!
//! ```yaml
//! version: "1"
//! name: marketplace-search
//! analyzer:
//!   min_query_chars: 2
//! scoring:
//!   profession_exact: 0.40
//!   exact_boost: 1.2
//! routing:
//!   ai_timeout_ms: 2000
//! taxonomy:
//!   source: merged
//!   path: /etc/craftmatch/taxonomy-overrides.yaml
//! ```
//!
//! Every section is optional; an empty document is a valid config that
//! selects the builtin taxonomy and shipped defaults.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyzer::AnalyzerConfig;
use crate::scoring::ScoringWeights;
use crate::taxonomy::{Taxonomy, TaxonomyError};

/// Semantic tier deadline when neither the config nor the request
/// overrides it.
pub const DEFAULT_AI_TIMEOUT_MS: u64 = 2_000;

/// Tier-walk tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Deadline for one semantic tier attempt, in milliseconds.
    /// Requests may shorten or extend it per call.
    pub ai_timeout_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            ai_timeout_ms: DEFAULT_AI_TIMEOUT_MS,
        }
    }
}

/// Where the engine's taxonomy comes from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum TaxonomySource {
    /// The table set bundled with the library.
    #[default]
    Builtin,
    /// A complete taxonomy file, replacing the builtin one.
    File { path: String },
    /// The builtin tables with a fragment file merged over them. The
    /// fragment may carry any subset of the tables.
    Merged { path: String },
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Config schema version. `"1"` and `"1.0"` are accepted.
    pub version: String,
    /// Optional deployment name, surfaced in startup logs.
    pub name: Option<String>,
    pub analyzer: AnalyzerConfig,
    pub scoring: ScoringWeights,
    pub routing: RoutingConfig,
    pub taxonomy: TaxonomySource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: "1".to_string(),
            name: None,
            analyzer: AnalyzerConfig::default(),
            scoring: ScoringWeights::default(),
            routing: RoutingConfig::default(),
            taxonomy: TaxonomySource::default(),
        }
    }
}

impl EngineConfig {
    /// Reads, parses, and validates a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parses and validates config YAML.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigLoadError> {
        let config: EngineConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks version and section-level invariants.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if !matches!(self.version.as_str(), "1" | "1.0") {
            return Err(ConfigLoadError::UnsupportedVersion(self.version.clone()));
        }
        if self.analyzer.min_query_chars == 0 {
            return Err(ConfigLoadError::Validation(
                "analyzer.min_query_chars must be at least 1".into(),
            ));
        }
        self.scoring.validate().map_err(ConfigLoadError::Validation)?;
        if self.routing.ai_timeout_ms == 0 {
            return Err(ConfigLoadError::Validation(
                "routing.ai_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Resolves the configured taxonomy source into a shareable table
    /// set. Merged sources validate the combined result, not the
    /// fragment, so fragments can stay partial.
    pub fn load_taxonomy(&self) -> Result<Arc<Taxonomy>, ConfigLoadError> {
        match &self.taxonomy {
            TaxonomySource::Builtin => Ok(Taxonomy::builtin()),
            TaxonomySource::File { path } => Ok(Arc::new(Taxonomy::from_file(path)?)),
            TaxonomySource::Merged { path } => {
                let mut merged = Taxonomy::builtin().as_ref().clone();
                merged.merge(Taxonomy::fragment_from_file(path)?);
                merged.validate()?;
                Ok(Arc::new(merged))
            }
        }
    }
}

/// Failures while loading or validating an engine config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigLoadError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),
    /// The text is not valid YAML for the config schema.
    #[error("failed to parse config YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),
    /// A version this build does not understand.
    #[error("unsupported config version '{0}' (expected \"1\")")]
    UnsupportedVersion(String),
    /// A value failed a range or consistency check.
    #[error("invalid config: {0}")]
    Validation(String),
    /// The referenced taxonomy failed to load.
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),
}
