//! The tiered matching engine.
//!
//! One request walks up to three tiers in a fixed order:
//!
//! 1. semantic — an upstream ranking service, used only when the
//!    caller's health tracker says it is up, under a hard deadline;
//! 2. deterministic — taxonomy-driven keyword and synonym scoring;
//! 3. emergency — a plain substring scan that cannot fail.
//!
//! The walk is total: every failure inside a tier routes the request
//! to the next tier, and the last tier has no failure modes, so
//! [`MatchEngine::match_artisans`] always returns a usable result.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analyzer::{
    AnalyzerConfig, CONFIDENCE_FLOOR, QueryAnalysis, analyze_query, normalize_query,
};
use crate::assemble::{PendingMatch, assemble};
use crate::config::{ConfigLoadError, DEFAULT_AI_TIMEOUT_MS, EngineConfig};
use crate::emergency::emergency_match;
use crate::metrics;
use crate::profile::ArtisanProfile;
use crate::scoring::{ScoringWeights, score_candidates};
use crate::taxonomy::Taxonomy;
use crate::types::{CancelToken, EngineError, MatchFeedback, MatchRequest, MatchRunResult, MatchTier};
use crate::upstream::{SemanticMatcher, UpstreamError};

/// Why the semantic tier produced nothing. Logged for operators and
/// otherwise invisible to callers.
#[derive(Debug, Error)]
enum Fallthrough {
    #[error("health tracker reports the service down")]
    Unhealthy,
    #[error("no upstream matcher configured")]
    NoUpstream,
    #[error("upstream exceeded its {0}ms budget")]
    Timeout(u64),
    #[error(transparent)]
    Failed(UpstreamError),
    #[error("upstream returned an empty ranking")]
    EmptyRanking,
    #[error("upstream ranking referenced only unknown candidates")]
    UnknownIds,
}

/// The matching engine. Cheap to share behind an [`Arc`]; all state is
/// read-only after construction, so one instance serves concurrent
/// requests without locking.
pub struct MatchEngine {
    taxonomy: Arc<Taxonomy>,
    upstream: Option<Arc<dyn SemanticMatcher>>,
    analyzer: AnalyzerConfig,
    weights: ScoringWeights,
    ai_timeout_ms: u64,
}

impl fmt::Debug for MatchEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchEngine")
            .field("taxonomy_version", &self.taxonomy.version)
            .field("taxonomy_terms", &self.taxonomy.term_count())
            .field("upstream", &self.upstream.is_some())
            .field("analyzer", &self.analyzer)
            .field("weights", &self.weights)
            .field("ai_timeout_ms", &self.ai_timeout_ms)
            .finish()
    }
}

impl Default for MatchEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MatchEngine {
    /// Builds an engine with the bundled taxonomy, default analyzer and
    /// scoring settings, and no upstream matcher. Infallible; the
    /// bundled taxonomy is validated at build time by its tests.
    pub fn with_defaults() -> Self {
        Self {
            taxonomy: Taxonomy::builtin(),
            upstream: None,
            analyzer: AnalyzerConfig::default(),
            weights: ScoringWeights::default(),
            ai_timeout_ms: DEFAULT_AI_TIMEOUT_MS,
        }
    }

    /// Builds an engine from a validated configuration, loading the
    /// taxonomy the configuration names.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigLoadError> {
        config.validate()?;
        let taxonomy = config.load_taxonomy()?;
        info!(
            name = config.name.as_deref().unwrap_or("craftmatch"),
            taxonomy_version = taxonomy.version,
            taxonomy_terms = taxonomy.term_count(),
            ai_timeout_ms = config.routing.ai_timeout_ms,
            "match engine ready"
        );
        Ok(Self {
            taxonomy,
            upstream: None,
            analyzer: config.analyzer,
            weights: config.scoring,
            ai_timeout_ms: config.routing.ai_timeout_ms,
        })
    }

    /// Replaces the taxonomy. The caller is responsible for handing in
    /// a validated table; an invalid one routes every request to the
    /// emergency tier.
    pub fn with_taxonomy(mut self, taxonomy: Arc<Taxonomy>) -> Self {
        self.taxonomy = taxonomy;
        self
    }

    /// Installs the upstream semantic matcher consulted by the first
    /// tier. Without one, requests start at the deterministic tier.
    pub fn with_upstream(mut self, upstream: Arc<dyn SemanticMatcher>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Whether a request should skip the semantic tier: the bare
    /// negation of the caller's health flag. `_force_check` is the
    /// reserved slot for health hysteresis (failure debounce, retry
    /// cooldown) and does not affect the decision today.
    pub fn should_use_fallback(&self, ai_healthy: bool, _force_check: bool) -> bool {
        !ai_healthy
    }

    /// Matches `candidates` against the request query. Total: failures
    /// inside a tier route the request to the next tier, never to the
    /// caller.
    pub async fn match_artisans(
        &self,
        request: &MatchRequest,
        candidates: &[ArtisanProfile],
    ) -> MatchRunResult {
        self.match_artisans_with_cancel(request, candidates, &CancelToken::new())
            .await
    }

    /// As [`match_artisans`](Self::match_artisans), but polls `cancel`
    /// during deterministic scoring. A cancelled run returns whatever
    /// was scored before the token flipped.
    pub async fn match_artisans_with_cancel(
        &self,
        request: &MatchRequest,
        candidates: &[ArtisanProfile],
        cancel: &CancelToken,
    ) -> MatchRunResult {
        debug!(
            query = %request.query,
            candidates = candidates.len(),
            ai_healthy = request.ai_healthy,
            "matching request"
        );

        match self.semantic_tier(request, candidates).await {
            Ok(result) => return self.finish(result),
            Err(reason) => {
                debug!(%reason, "semantic tier unavailable, trying deterministic");
            }
        }

        match self.deterministic_tier(request, candidates, cancel) {
            Ok(result) => self.finish(result),
            Err(err) => {
                warn!(error = %err, "deterministic tier failed, using emergency matching");
                let result = self.emergency_tier(request, candidates);
                self.finish(result)
            }
        }
    }

    /// Records caller feedback on a finished match. Today this only
    /// feeds the operational log; the signal is kept caller-facing so
    /// ranking can consume it later without an API change.
    pub fn record_feedback(&self, query: &str, artisan_id: &str, feedback: MatchFeedback) {
        info!(
            query,
            artisan_id,
            feedback = ?feedback,
            at = %chrono::Utc::now().to_rfc3339(),
            "match feedback recorded"
        );
    }

    fn finish(&self, result: MatchRunResult) -> MatchRunResult {
        if let Some(recorder) = metrics::recorder() {
            recorder.record_run(
                result.tier,
                Duration::from_millis(result.processing_time_ms),
                result.matches.len(),
                result.fallback_used,
            );
        }
        debug!(
            tier = %result.tier,
            matches = result.matches.len(),
            total_found = result.total_found,
            elapsed_ms = result.processing_time_ms,
            "request matched"
        );
        result
    }

    async fn semantic_tier(
        &self,
        request: &MatchRequest,
        candidates: &[ArtisanProfile],
    ) -> Result<MatchRunResult, Fallthrough> {
        let started = Instant::now();
        if self.should_use_fallback(request.ai_healthy, false) {
            return Err(Fallthrough::Unhealthy);
        }

        // A precomputed ranking on the request wins over the configured
        // matcher: the caller already paid for it.
        let ranking = if let Some(precomputed) = &request.upstream {
            precomputed.clone()
        } else {
            let upstream = self.upstream.as_ref().ok_or(Fallthrough::NoUpstream)?;
            let budget = request.options.ai_timeout(self.ai_timeout_ms);
            let outcome = tokio::time::timeout(
                budget,
                upstream.rank(&request.query, candidates, &request.options),
            )
            .await;
            match outcome {
                Err(_) => return Err(Fallthrough::Timeout(budget.as_millis() as u64)),
                Ok(Err(err)) => return Err(Fallthrough::Failed(err)),
                Ok(Ok(ranking)) => ranking,
            }
        };

        if ranking.hits.is_empty() {
            return Err(Fallthrough::EmptyRanking);
        }

        let by_id: HashMap<&str, usize> = candidates
            .iter()
            .enumerate()
            .map(|(index, artisan)| (artisan.id.as_str(), index))
            .collect();

        let mut seen: HashSet<usize> = HashSet::new();
        let mut pending: Vec<PendingMatch> = Vec::with_capacity(ranking.hits.len());
        for hit in &ranking.hits {
            let Some(&index) = by_id.get(hit.artisan_id.as_str()) else {
                warn!(artisan_id = %hit.artisan_id, "upstream ranked an unknown candidate, skipping");
                continue;
            };
            if !seen.insert(index) {
                continue;
            }
            pending.push(PendingMatch::from_upstream(index, hit.score, hit.reason.clone()));
        }
        if pending.is_empty() {
            return Err(Fallthrough::UnknownIds);
        }

        // Analysis is diagnostic at this tier; the ranking itself came
        // from upstream.
        let analysis =
            analyze_query(&request.query, &self.taxonomy, &self.analyzer, &request.options);
        Ok(assemble(
            pending,
            candidates,
            analysis,
            &request.options,
            MatchTier::Ai,
            ranking.confidence,
            started,
        ))
    }

    fn deterministic_tier(
        &self,
        request: &MatchRequest,
        candidates: &[ArtisanProfile],
        cancel: &CancelToken,
    ) -> Result<MatchRunResult, EngineError> {
        let started = Instant::now();
        request.options.validate()?;
        self.taxonomy
            .validate()
            .map_err(|err| EngineError::InvalidTaxonomy(err.to_string()))?;

        let analysis =
            analyze_query(&request.query, &self.taxonomy, &self.analyzer, &request.options);
        if analysis.confidence == 0.0 {
            // Too short to analyze. An empty result is the honest
            // answer here; emergency matching is reserved for failures.
            debug!(query = %request.query, "query below analyzable length");
            let confidence = analysis.confidence;
            return Ok(assemble(
                Vec::new(),
                candidates,
                analysis,
                &request.options,
                MatchTier::Deterministic,
                confidence,
                started,
            ));
        }

        let scored = score_candidates(
            &analysis,
            candidates,
            &self.taxonomy,
            &request.options,
            &self.weights,
            Some(cancel),
        );
        let pending = scored
            .into_iter()
            .map(|(index, score)| PendingMatch::from_signals(index, score))
            .collect();
        let confidence = analysis.confidence;
        Ok(assemble(
            pending,
            candidates,
            analysis,
            &request.options,
            MatchTier::Deterministic,
            confidence,
            started,
        ))
    }

    fn emergency_tier(
        &self,
        request: &MatchRequest,
        candidates: &[ArtisanProfile],
    ) -> MatchRunResult {
        let started = Instant::now();
        let scored = emergency_match(&request.query, candidates);
        let pending: Vec<PendingMatch> = scored
            .into_iter()
            .map(|(index, score)| PendingMatch::from_signals(index, score))
            .collect();

        // No analysis ran; report the floor so callers can tell a
        // degraded answer from an unanalyzable query.
        let mut analysis = QueryAnalysis::empty();
        let normalized = normalize_query(&request.query);
        if normalized.chars().count() >= self.analyzer.min_query_chars {
            analysis.confidence = CONFIDENCE_FLOOR;
        }
        let confidence = analysis.confidence;
        assemble(
            pending,
            candidates,
            analysis,
            &request.options,
            MatchTier::Emergency,
            confidence,
            started,
        )
    }
}
