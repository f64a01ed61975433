//! # Craftmatch (`craftmatch`)
//!
//! ## Purpose
//!
//! `craftmatch` matches free-text buyer queries ("handmade wooden chair",
//! "someone who can repair a silk saree") against a list of artisan
//! profiles. It is built for marketplaces where an AI-backed semantic
//! ranker exists but cannot be trusted to be up: every request walks a
//! three-tier cascade and the engine never returns an error, only a
//! result from a cheaper tier.
//!
//! The tiers, in order:
//! - semantic — an upstream ranking service behind the
//!   [`SemanticMatcher`] trait, consulted only while the caller's health
//!   tracker reports it up, under a hard timeout;
//! - deterministic — taxonomy-driven analysis ([`analyze_query`]) and
//!   weighted keyword scoring, explainable signal by signal;
//! - emergency — a bare substring scan over profession, name, and
//!   description that has no failure modes at all.
//!
//! Build a [`MatchEngine`] once, share it behind an
//! [`Arc`](std::sync::Arc), and feed it [`MatchRequest`]s; every run
//! comes back as a [`MatchRunResult`] whose matches carry a
//! per-candidate [`MatchExplanation`]. The craft vocabulary lives in a
//! [`Taxonomy`] (a curated table ships with the crate) and engine-wide
//! tuning in an [`EngineConfig`].
//!
//! ## Example Usage
//!
//! ```no_run
//! use craftmatch::{ArtisanProfile, MatchEngine, MatchRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = MatchEngine::with_defaults();
//!
//!     let candidates: Vec<ArtisanProfile> = serde_json::from_str(
//!         r#"[{"id": "a1", "name": "Asha Devi", "profession": "Pottery",
//!              "skills": ["pottery wheel", "glazing"]}]"#,
//!     )
//!     .expect("candidate list");
//!
//!     let request = MatchRequest::for_query("handmade ceramic bowl");
//!     let result = engine.match_artisans(&request, &candidates).await;
//!
//!     for m in &result.matches {
//!         println!(
//!             "#{} {} score={:.2} because {}",
//!             m.rank, m.artisan.display_name(), m.relevance_score,
//!             m.explanation.primary_reason
//!         );
//!     }
//! }
//! ```
//!
//! ## Observability
//!
//! The engine logs through [`tracing`]; route the `craftmatch` target
//! wherever your subscriber sends engine noise. Install an
//! [`EngineMetrics`] implementation via [`set_engine_metrics`] once at
//! startup to record per-run tier, latency, and match counts.

pub mod analyzer;
pub mod config;
pub mod emergency;
pub mod engine;
pub mod explain;
pub mod metrics;
pub mod profile;
pub mod scoring;
pub mod taxonomy;
pub mod types;
pub mod upstream;

mod assemble;

pub use crate::analyzer::{
    AnalyzerConfig, ExtractionMethod, QueryAnalysis, analyze_query, normalize_query,
};
pub use crate::config::{ConfigLoadError, EngineConfig, RoutingConfig, TaxonomySource};
pub use crate::engine::MatchEngine;
pub use crate::metrics::{EngineMetrics, set_engine_metrics};
pub use crate::profile::ArtisanProfile;
pub use crate::scoring::{MatchKind, ScoringWeights, SignalField, SignalHit};
pub use crate::taxonomy::{Taxonomy, TaxonomyError};
pub use crate::types::{
    CancelToken, ConfidenceLevel, EngineError, MatchExplanation, MatchFeedback, MatchOptions,
    MatchRequest, MatchResult, MatchRunResult, MatchTier, ScoreBreakdown,
};
pub use crate::upstream::{SemanticMatcher, UpstreamError, UpstreamHit, UpstreamMatches};
