//! Craft taxonomy: canonical terms, their synonyms, and product-name
//! inference tables.
//!
//! The taxonomy is the single vocabulary shared by the query analyzer
//! and the candidate scorer. A builtin table ships inside the library
//! so the engine works with zero configuration; deployments with their
//! own vocabulary load a YAML file and optionally [`merge`] it over the
//! builtin one.
//!
//! [`merge`]: Taxonomy::merge

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Newest schema version this build understands. Version 0 is reserved
/// and always invalid.
pub const TAXONOMY_SCHEMA_VERSION: u32 = 1;

// Parsed once on first use. A failure here means the bundled asset is
// broken, which is a defect of the build itself, not of any request.
static BUILTIN: Lazy<Arc<Taxonomy>> = Lazy::new(|| {
    let taxonomy = Taxonomy::from_yaml(include_str!("../data/taxonomy.yaml"))
        .expect("bundled taxonomy asset must parse and validate");
    Arc::new(taxonomy)
});

/// Term tables driving keyword and synonym matching.
///
/// All tables map lowercase canonical terms to lowercase alternate
/// forms. `BTreeMap` keeps iteration order stable, which in turn keeps
/// analysis output deterministic for identical inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Schema version of this table set. Absent on fragments, which
    /// deserializes to the reserved 0 and is fixed up on merge.
    #[serde(default)]
    pub version: u32,
    /// Canonical profession -> alternate names and agent nouns.
    #[serde(default)]
    pub professions: BTreeMap<String, Vec<String>>,
    /// Canonical material -> specific variants.
    #[serde(default)]
    pub materials: BTreeMap<String, Vec<String>>,
    /// Canonical technique -> alternate names and inflections.
    #[serde(default)]
    pub techniques: BTreeMap<String, Vec<String>>,
    /// Product word -> profession that typically makes it.
    #[serde(default)]
    pub product_professions: BTreeMap<String, String>,
}

impl Taxonomy {
    /// Shared handle to the builtin table set.
    pub fn builtin() -> Arc<Taxonomy> {
        Arc::clone(&BUILTIN)
    }

    /// Parses and validates a taxonomy from YAML text. Keys and terms
    /// are trimmed and lowercased before validation, so hand-edited
    /// files with mixed case load cleanly.
    pub fn from_yaml(text: &str) -> Result<Self, TaxonomyError> {
        let taxonomy: Taxonomy = serde_yaml::from_str(text)?;
        let taxonomy = taxonomy.normalized();
        taxonomy.validate()?;
        Ok(taxonomy)
    }

    /// Reads, parses, and validates a taxonomy file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parses an overlay fragment: normalized but not validated, since
    /// fragments routinely carry a single table or no version at all.
    /// Validation happens on the merged result.
    pub fn fragment_from_yaml(text: &str) -> Result<Self, TaxonomyError> {
        let fragment: Taxonomy = serde_yaml::from_str(text)?;
        Ok(fragment.normalized())
    }

    /// Reads and parses an overlay fragment file.
    pub fn fragment_from_file(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let text = std::fs::read_to_string(path)?;
        Self::fragment_from_yaml(&text)
    }

    /// Structural integrity check.
    ///
    /// The deterministic tier re-runs this per request on whatever
    /// taxonomy the engine was built with, so a bad table routes
    /// requests to the emergency tier instead of producing garbage
    /// scores.
    pub fn validate(&self) -> Result<(), TaxonomyError> {
        if self.version == 0 || self.version > TAXONOMY_SCHEMA_VERSION {
            return Err(TaxonomyError::UnsupportedVersion(self.version));
        }
        if self.professions.is_empty() {
            return Err(TaxonomyError::InvalidEntry(
                "professions table is empty".into(),
            ));
        }
        for (table, entries) in [
            ("professions", &self.professions),
            ("materials", &self.materials),
            ("techniques", &self.techniques),
        ] {
            for (canonical, synonyms) in entries {
                if canonical.trim().is_empty() {
                    return Err(TaxonomyError::InvalidEntry(format!(
                        "{table} table contains a blank canonical term"
                    )));
                }
                if synonyms.iter().any(|s| s.trim().is_empty()) {
                    return Err(TaxonomyError::InvalidEntry(format!(
                        "{table} entry '{canonical}' contains a blank synonym"
                    )));
                }
            }
        }
        for (product, profession) in &self.product_professions {
            if product.trim().is_empty() {
                return Err(TaxonomyError::InvalidEntry(
                    "product_professions contains a blank product".into(),
                ));
            }
            if !self.professions.contains_key(profession) {
                return Err(TaxonomyError::InvalidEntry(format!(
                    "product '{product}' maps to unknown profession '{profession}'"
                )));
            }
        }
        Ok(())
    }

    /// Folds `other` into this taxonomy. Synonym lists are unioned,
    /// product mappings from `other` win on conflict, and the version
    /// becomes the larger of the two.
    pub fn merge(&mut self, other: Taxonomy) {
        fn merge_table(into: &mut BTreeMap<String, Vec<String>>, from: BTreeMap<String, Vec<String>>) {
            for (canonical, synonyms) in from {
                let entry = into.entry(canonical).or_default();
                entry.extend(synonyms);
                entry.sort();
                entry.dedup();
            }
        }
        merge_table(&mut self.professions, other.professions);
        merge_table(&mut self.materials, other.materials);
        merge_table(&mut self.techniques, other.techniques);
        self.product_professions.extend(other.product_professions);
        self.version = self.version.max(other.version);
    }

    /// Total number of matchable terms across all tables. Logged at
    /// engine startup.
    pub fn term_count(&self) -> usize {
        let table_terms = |t: &BTreeMap<String, Vec<String>>| {
            t.len() + t.values().map(Vec::len).sum::<usize>()
        };
        table_terms(&self.professions)
            + table_terms(&self.materials)
            + table_terms(&self.techniques)
            + self.product_professions.len()
    }

    fn normalized(self) -> Self {
        fn clean(term: &str) -> String {
            term.trim().to_lowercase()
        }
        fn clean_table(table: BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
            table
                .into_iter()
                .map(|(canonical, synonyms)| {
                    let mut cleaned: Vec<String> = synonyms.iter().map(|s| clean(s)).collect();
                    cleaned.sort();
                    cleaned.dedup();
                    (clean(&canonical), cleaned)
                })
                .collect()
        }
        Taxonomy {
            version: self.version,
            professions: clean_table(self.professions),
            materials: clean_table(self.materials),
            techniques: clean_table(self.techniques),
            product_professions: self
                .product_professions
                .into_iter()
                .map(|(product, profession)| (clean(&product), clean(&profession)))
                .collect(),
        }
    }
}

/// Failures while loading or validating a taxonomy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaxonomyError {
    /// The file could not be read.
    #[error("failed to read taxonomy file: {0}")]
    FileRead(#[from] std::io::Error),
    /// The text is not valid YAML for the taxonomy schema.
    #[error("failed to parse taxonomy YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// Version 0, or a version newer than this build understands.
    #[error("unsupported taxonomy version {0} (expected {TAXONOMY_SCHEMA_VERSION})")]
    UnsupportedVersion(u32),
    /// A structural problem in one of the tables.
    #[error("invalid taxonomy entry: {0}")]
    InvalidEntry(String),
}
