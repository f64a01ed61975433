//! Interface to the optional semantic ranking service.
//!
//! The engine never talks to a model service directly; it calls
//! whatever [`SemanticMatcher`] the embedder wires in, under a hard
//! deadline. Everything that can go wrong on that path is an ordinary
//! fall-through to the deterministic tier.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::profile::ArtisanProfile;
use crate::types::MatchOptions;

/// One candidate ranked by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamHit {
    /// Id of a candidate in the request's candidate list. Hits naming
    /// unknown ids are skipped with a warning.
    pub artisan_id: String,
    /// Relevance in `[0.0, 1.0]`. Sanitized on ingestion, so services
    /// sending garbage degrade a hit rather than a whole run.
    pub score: f32,
    /// Optional human-readable reason, surfaced verbatim as the
    /// result's primary explanation.
    #[serde(default)]
    pub reason: Option<String>,
}

/// A complete ranking from the upstream service for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamMatches {
    pub hits: Vec<UpstreamHit>,
    /// The service's own confidence in this ranking, in `[0.0, 1.0]`.
    pub confidence: f32,
}

/// Failures an upstream matcher may report.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum UpstreamError {
    /// The service is reachable but declined this request.
    #[error("semantic matcher rejected the request: {0}")]
    Rejected(String),
    /// Transport or backend failure.
    #[error("semantic matcher failed: {0}")]
    Backend(String),
}

/// A semantic ranking backend.
///
/// Implementations should report failures honestly instead of
/// returning made-up rankings; the engine degrades gracefully on
/// `Err`, but a fabricated `Ok` is served to users as-is.
#[async_trait]
pub trait SemanticMatcher: Send + Sync {
    /// Ranks `candidates` for `query`. The engine enforces its own
    /// deadline around this call, but implementations are still
    /// encouraged to bound their work.
    async fn rank(
        &self,
        query: &str,
        candidates: &[ArtisanProfile],
        options: &MatchOptions,
    ) -> Result<UpstreamMatches, UpstreamError>;
}
