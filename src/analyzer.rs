//! Query analysis: normalization, taxonomy term extraction, and the
//! query confidence estimate.
//!
//! Analysis is a pure function of the query text, the active taxonomy,
//! and the request options. It performs no I/O and cannot fail; a
//! query that yields nothing produces an empty analysis with floor
//! confidence rather than an error.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::taxonomy::Taxonomy;
use crate::types::MatchOptions;

/// Base confidence for any analyzable query.
pub(crate) const CONFIDENCE_FLOOR: f32 = 0.3;
/// Added per extracted term, exact or inferred.
const CONFIDENCE_PER_MATCH: f32 = 0.1;
/// Added again for each exact canonical-term hit.
const CONFIDENCE_PER_EXACT: f32 = 0.1;
/// Keyword analysis never claims more certainty than this.
const CONFIDENCE_CEILING: f32 = 0.8;

/// Engine-level analyzer tuning, fixed at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Normalized queries shorter than this many characters are not
    /// analyzed at all and short-circuit to an empty result.
    pub min_query_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self { min_query_chars: 2 }
    }
}

/// How the analyzer arrived at its terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Canonical terms only.
    Keyword,
    /// Reserved for a future edit-distance expansion; never produced
    /// by the current analyzer.
    Fuzzy,
    /// Synonym or product inference only.
    Synonym,
    /// Both exact and inferred terms contributed.
    Hybrid,
}

/// Structured view of one query, shared by the scorer and returned to
/// the caller for diagnostics.
///
/// Sets are `BTreeSet` so serialization order is stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    /// Surface forms that actually occurred in the query. Exact hits
    /// record the canonical term, inferred hits the matched synonym or
    /// product word.
    pub detected_keywords: BTreeSet<String>,
    /// Canonical professions the query points at, however derived.
    pub possible_professions: BTreeSet<String>,
    /// Canonical materials, plus the matched variant on synonym hits.
    pub extracted_materials: BTreeSet<String>,
    /// Canonical techniques, plus the matched variant on synonym hits.
    pub extracted_techniques: BTreeSet<String>,
    /// Confidence in `[0.0, 1.0]`. Exactly 0.0 only for queries too
    /// short to analyze.
    pub confidence: f32,
    pub method: ExtractionMethod,
}

impl QueryAnalysis {
    /// Analysis of an unanalyzable query. Confidence 0.0 is reserved
    /// for this case.
    pub fn empty() -> Self {
        Self {
            detected_keywords: BTreeSet::new(),
            possible_professions: BTreeSet::new(),
            extracted_materials: BTreeSet::new(),
            extracted_techniques: BTreeSet::new(),
            confidence: 0.0,
            method: ExtractionMethod::Keyword,
        }
    }

    /// True when at least one taxonomy term was found.
    pub fn has_signals(&self) -> bool {
        !self.detected_keywords.is_empty()
    }
}

/// Canonicalizes raw query text: NFKC, lowercase, whitespace collapsed
/// to single spaces, leading and trailing whitespace dropped.
///
/// All taxonomy terms are stored in this same form, so containment
/// scans work on identical bytes regardless of how the query was
/// typed.
pub fn normalize_query(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.nfkc() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(ch.to_lowercase());
    }
    out
}

/// Analyzes a raw query against the taxonomy.
///
/// Each table is scanned by substring containment of the canonical
/// term first; only when that misses (and synonym matching is enabled)
/// are the entry's alternate forms tried. Product words map to the
/// profession that typically makes them. The confidence estimate is
/// `0.3 + 0.1 * total_hits + 0.1 * exact_hits`, capped at 0.8.
pub fn analyze_query(
    raw: &str,
    taxonomy: &Taxonomy,
    config: &AnalyzerConfig,
    options: &MatchOptions,
) -> QueryAnalysis {
    let query = normalize_query(raw);
    if query.chars().count() < config.min_query_chars {
        return QueryAnalysis::empty();
    }

    let mut analysis = QueryAnalysis::empty();
    let mut total_hits = 0usize;
    let mut exact_hits = 0usize;
    let mut inferred_hits = 0usize;

    for (canonical, synonyms) in &taxonomy.professions {
        if query.contains(canonical.as_str()) {
            analysis.detected_keywords.insert(canonical.clone());
            analysis.possible_professions.insert(canonical.clone());
            total_hits += 1;
            exact_hits += 1;
        } else if options.enable_synonym_matching
            && let Some(hit) = synonyms.iter().find(|s| query.contains(s.as_str()))
        {
            analysis.detected_keywords.insert(hit.clone());
            analysis.possible_professions.insert(canonical.clone());
            total_hits += 1;
            inferred_hits += 1;
        }
    }

    for (canonical, synonyms) in &taxonomy.materials {
        if query.contains(canonical.as_str()) {
            analysis.detected_keywords.insert(canonical.clone());
            analysis.extracted_materials.insert(canonical.clone());
            total_hits += 1;
            exact_hits += 1;
        } else if options.enable_synonym_matching
            && let Some(hit) = synonyms.iter().find(|s| query.contains(s.as_str()))
        {
            analysis.detected_keywords.insert(hit.clone());
            // Both forms go into the extracted set so the scorer can
            // match candidates that list either one.
            analysis.extracted_materials.insert(canonical.clone());
            analysis.extracted_materials.insert(hit.clone());
            total_hits += 1;
            inferred_hits += 1;
        }
    }

    for (canonical, synonyms) in &taxonomy.techniques {
        if query.contains(canonical.as_str()) {
            analysis.detected_keywords.insert(canonical.clone());
            analysis.extracted_techniques.insert(canonical.clone());
            total_hits += 1;
            exact_hits += 1;
        } else if options.enable_synonym_matching
            && let Some(hit) = synonyms.iter().find(|s| query.contains(s.as_str()))
        {
            analysis.detected_keywords.insert(hit.clone());
            analysis.extracted_techniques.insert(canonical.clone());
            analysis.extracted_techniques.insert(hit.clone());
            total_hits += 1;
            inferred_hits += 1;
        }
    }

    for (product, profession) in &taxonomy.product_professions {
        if query.contains(product.as_str()) {
            analysis.detected_keywords.insert(product.clone());
            analysis.possible_professions.insert(profession.clone());
            total_hits += 1;
            inferred_hits += 1;
        }
    }

    analysis.confidence = confidence_for(total_hits, exact_hits);
    analysis.method = if exact_hits > 0 && inferred_hits > 0 {
        ExtractionMethod::Hybrid
    } else if inferred_hits > 0 {
        ExtractionMethod::Synonym
    } else {
        ExtractionMethod::Keyword
    };
    analysis
}

fn confidence_for(total_hits: usize, exact_hits: usize) -> f32 {
    (CONFIDENCE_FLOOR
        + CONFIDENCE_PER_MATCH * total_hits as f32
        + CONFIDENCE_PER_EXACT * exact_hits as f32)
        .min(CONFIDENCE_CEILING)
}
