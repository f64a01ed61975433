//! Request and result types for the artisan matching engine.
//!
//! Everything here is serde-friendly so requests can arrive over any
//! transport and results can be handed straight back. Options carry
//! per-request knobs only; engine-wide tuning lives in
//! [`crate::config::EngineConfig`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analyzer::QueryAnalysis;
use crate::profile::ArtisanProfile;
use crate::upstream::UpstreamMatches;

/// Floor applied to relevance scores before a result is kept, when the
/// caller does not override it. Tiers one and two share this value.
pub const DEFAULT_MIN_SCORE: f32 = 0.1;
/// Looser floor used by the emergency tier so a degraded run still
/// surfaces weak-but-plausible candidates.
pub const EMERGENCY_MIN_SCORE: f32 = 0.05;
/// Result cap for tiers one and two.
pub const DEFAULT_MAX_RESULTS: usize = 20;
/// Tighter result cap for the emergency tier.
pub const EMERGENCY_MAX_RESULTS: usize = 10;

/// Per-request tuning knobs.
///
/// All fields are optional on the wire; absent fields fall back to
/// tier-aware defaults at assembly time. Invalid values are rejected by
/// [`MatchOptions::validate`] in the deterministic tier and silently
/// ignored by the emergency tier, which must never fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions {
    /// Cap on returned matches. Defaults to 20 (10 in emergency mode).
    pub max_results: Option<usize>,
    /// Minimum relevance score a match must reach to be returned.
    /// Defaults to 0.1 (0.05 in emergency mode).
    pub min_score: Option<f32>,
    /// Reserved. Accepted so existing callers keep working, but the
    /// current analyzer performs no fuzzy expansion.
    pub enable_fuzzy_matching: bool,
    /// Expand query terms through the synonym taxonomy. On by default.
    pub enable_synonym_matching: bool,
    /// Multiply the raw score by an exact-profession boost before
    /// clamping. Off by default.
    pub boost_exact_matches: bool,
    /// Free-text location filter. Only sets the `location_match` flag
    /// on results; it never excludes candidates.
    pub location: Option<String>,
    /// Budget for the semantic tier, in milliseconds. Defaults to the
    /// engine-wide `routing.ai_timeout_ms`.
    pub ai_timeout_ms: Option<u64>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            max_results: None,
            min_score: None,
            enable_fuzzy_matching: false,
            enable_synonym_matching: true,
            boost_exact_matches: false,
            location: None,
            ai_timeout_ms: None,
        }
    }
}

impl MatchOptions {
    /// Checks explicit values for internal consistency. Absent fields
    /// are always valid.
    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(max) = self.max_results
            && max == 0
        {
            return Err(EngineError::InvalidOptions(
                "max_results must be at least 1".into(),
            ));
        }
        if let Some(min) = self.min_score
            && !(0.0..=1.0).contains(&min)
        {
            return Err(EngineError::InvalidOptions(format!(
                "min_score must be within [0.0, 1.0], got {min}"
            )));
        }
        if let Some(timeout) = self.ai_timeout_ms
            && timeout == 0
        {
            return Err(EngineError::InvalidOptions(
                "ai_timeout_ms must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Score floor in effect for `tier`. Out-of-range explicit values
    /// are ignored rather than propagated; the emergency tier relies on
    /// this to stay infallible.
    pub fn effective_min_score(&self, tier: MatchTier) -> f32 {
        match self.min_score {
            Some(min) if (0.0..=1.0).contains(&min) => min,
            _ if tier == MatchTier::Emergency => EMERGENCY_MIN_SCORE,
            _ => DEFAULT_MIN_SCORE,
        }
    }

    /// Result cap in effect for `tier`.
    pub fn effective_max_results(&self, tier: MatchTier) -> usize {
        match self.max_results {
            Some(max) if max >= 1 => max,
            _ if tier == MatchTier::Emergency => EMERGENCY_MAX_RESULTS,
            _ => DEFAULT_MAX_RESULTS,
        }
    }

    /// Semantic-tier budget, falling back to the engine default.
    pub fn ai_timeout(&self, default_ms: u64) -> Duration {
        let ms = match self.ai_timeout_ms {
            Some(ms) if ms >= 1 => ms,
            _ => default_ms,
        };
        Duration::from_millis(ms)
    }
}

/// A single matching request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Raw query text as the user typed it.
    pub query: String,
    #[serde(default)]
    pub options: MatchOptions,
    /// Health verdict for the semantic service, supplied by the
    /// caller's health tracker. When false the semantic tier is skipped
    /// without being called.
    #[serde(default)]
    pub ai_healthy: bool,
    /// Pre-computed semantic ranking for this query, if the caller
    /// already holds one. Takes precedence over the engine's own
    /// upstream matcher.
    #[serde(default)]
    pub upstream: Option<UpstreamMatches>,
    /// Optional opaque attributes; surfaced in debug logs and otherwise
    /// ignored by the engine.
    #[serde(default)]
    pub attributes: Option<serde_json::Value>,
}

impl MatchRequest {
    /// Convenience constructor for the common query-only case.
    pub fn for_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }
}

/// Which tier produced a result. Diagnostic only; callers branch on
/// [`MatchRunResult::fallback_used`], not on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Semantic upstream ranking accepted as-is.
    Ai,
    /// Taxonomy-driven keyword and synonym scoring.
    Deterministic,
    /// Plain-text scan of last resort.
    Emergency,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MatchTier::Ai => "ai",
            MatchTier::Deterministic => "deterministic",
            MatchTier::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

/// Coarse confidence bucket shown to end users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// Buckets a relevance score: above 0.8 is high, above 0.6 is
    /// medium, everything else is low.
    pub fn for_score(score: f32) -> Self {
        if score > 0.8 {
            ConfidenceLevel::High
        } else if score > 0.6 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

/// Per-dimension score contributions for one match. Buckets are summed
/// signal weights, not normalized shares; `experience` and
/// `performance` stay zero until a richer tier fills them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub profession: f32,
    pub skill: f32,
    pub material: f32,
    pub technique: f32,
    pub experience: f32,
    pub location: f32,
    pub performance: f32,
}

/// Human-readable account of why a candidate matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchExplanation {
    /// One-line headline, derived from the strongest signal group.
    pub primary_reason: String,
    /// Up to five supporting statements in signal-priority order.
    pub detailed_reasons: Vec<String>,
    pub matched_skills: Vec<String>,
    pub matched_materials: Vec<String>,
    pub matched_techniques: Vec<String>,
    pub confidence_level: ConfidenceLevel,
    pub score_breakdown: ScoreBreakdown,
}

/// One ranked candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Snapshot of the matched profile.
    pub artisan: ArtisanProfile,
    /// Final clamped score in `[0.0, 1.0]`.
    pub relevance_score: f32,
    pub profession_match: bool,
    pub material_match: bool,
    pub technique_match: bool,
    pub specialization_match: bool,
    pub location_match: bool,
    pub explanation: MatchExplanation,
    /// 1-based dense position within this result set.
    pub rank: usize,
}

/// Complete outcome of one engine run. Always produced; the engine has
/// no error path that reaches the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRunResult {
    pub matches: Vec<MatchResult>,
    /// Candidates that cleared the score floor, counted before the
    /// result cap was applied.
    pub total_found: usize,
    pub query_analysis: QueryAnalysis,
    pub processing_time_ms: u64,
    /// Query-level confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// True whenever the semantic tier did not produce this result.
    pub fallback_used: bool,
    pub tier: MatchTier,
}

/// Caller feedback on a served match, fed back for offline tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchFeedback {
    Positive,
    Negative,
}

/// Internal failures of the deterministic tier. These never cross the
/// engine boundary; they route the request to the emergency tier.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// Explicit request options failed validation.
    #[error("invalid match options: {0}")]
    InvalidOptions(String),
    /// The active taxonomy failed its integrity check.
    #[error("invalid taxonomy: {0}")]
    InvalidTaxonomy(String),
}

/// Cooperative cancellation handle for long candidate scans.
///
/// Cloning shares the flag. The scorer polls it between batches, so
/// cancellation yields a truncated-but-valid result rather than an
/// error.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
