//! Turns scored candidates into the final ranked result.
//!
//! Assembly is the one place where score floors, result caps, ordering,
//! and rank numbering are applied, so all three tiers behave
//! identically once their scoring is done.

use std::time::Instant;

use crate::analyzer::QueryAnalysis;
use crate::explain::{build_explanation, upstream_explanation};
use crate::profile::ArtisanProfile;
use crate::scoring::{CandidateScore, SignalHit};
use crate::types::{MatchOptions, MatchResult, MatchRunResult, MatchTier};

/// Explanation material carried alongside a pending score.
pub(crate) enum Evidence {
    /// Deterministic and emergency tiers: the recorded signal hits.
    Signals(Vec<SignalHit>),
    /// Semantic tier: the upstream reason text, if any.
    Upstream(Option<String>),
}

/// A candidate that survived scoring and awaits filter/sort/rank.
pub(crate) struct PendingMatch {
    pub index: usize,
    pub score: f32,
    pub profession_match: bool,
    pub material_match: bool,
    pub technique_match: bool,
    pub specialization_match: bool,
    pub location_match: bool,
    pub evidence: Evidence,
}

impl PendingMatch {
    pub fn from_signals(index: usize, scored: CandidateScore) -> Self {
        Self {
            index,
            score: scored.score,
            profession_match: scored.profession_match,
            material_match: scored.material_match,
            technique_match: scored.technique_match,
            specialization_match: scored.specialization_match,
            location_match: scored.location_match,
            evidence: Evidence::Signals(scored.hits),
        }
    }

    /// Upstream scores arrive from outside the process, so they are
    /// sanitized here: non-finite becomes 0.0, the rest is clamped.
    pub fn from_upstream(index: usize, score: f32, reason: Option<String>) -> Self {
        let score = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
        Self {
            index,
            score,
            profession_match: false,
            material_match: false,
            technique_match: false,
            specialization_match: false,
            location_match: false,
            evidence: Evidence::Upstream(reason),
        }
    }
}

/// Applies the tier's score floor and result cap, orders by descending
/// score, and wraps everything into a [`MatchRunResult`].
///
/// `total_found` counts candidates that cleared the floor before the
/// cap was applied. The sort is stable, so candidates with equal
/// scores keep the caller's input order; ranks are dense and 1-based.
pub(crate) fn assemble(
    pending: Vec<PendingMatch>,
    candidates: &[ArtisanProfile],
    analysis: QueryAnalysis,
    options: &MatchOptions,
    tier: MatchTier,
    confidence: f32,
    started: Instant,
) -> MatchRunResult {
    let min_score = options.effective_min_score(tier);
    let max_results = options.effective_max_results(tier);

    let mut passing: Vec<PendingMatch> = pending
        .into_iter()
        .filter(|p| p.score >= min_score)
        .collect();
    let total_found = passing.len();

    passing.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    passing.truncate(max_results);

    let mut matches = Vec::with_capacity(passing.len());
    for pending in passing {
        let Some(artisan) = candidates.get(pending.index) else {
            continue;
        };
        let explanation = match &pending.evidence {
            Evidence::Signals(hits) => build_explanation(hits, pending.score),
            Evidence::Upstream(reason) => upstream_explanation(reason.as_deref(), pending.score),
        };
        matches.push(MatchResult {
            artisan: artisan.clone(),
            relevance_score: pending.score,
            profession_match: pending.profession_match,
            material_match: pending.material_match,
            technique_match: pending.technique_match,
            specialization_match: pending.specialization_match,
            location_match: pending.location_match,
            explanation,
            rank: matches.len() + 1,
        });
    }

    MatchRunResult {
        matches,
        total_found,
        query_analysis: analysis,
        processing_time_ms: started.elapsed().as_millis() as u64,
        confidence: if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 },
        fallback_used: tier != MatchTier::Ai,
        tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles(n: usize) -> Vec<ArtisanProfile> {
        (0..n)
            .map(|i| ArtisanProfile {
                id: format!("artisan-{i}"),
                name: format!("Artisan {i}"),
                ..Default::default()
            })
            .collect()
    }

    fn signal_pending(index: usize, score: f32) -> PendingMatch {
        PendingMatch::from_signals(
            index,
            CandidateScore {
                score,
                ..Default::default()
            },
        )
    }

    fn assemble_deterministic(
        pending: Vec<PendingMatch>,
        candidates: &[ArtisanProfile],
        options: &MatchOptions,
    ) -> MatchRunResult {
        assemble(
            pending,
            candidates,
            QueryAnalysis::empty(),
            options,
            MatchTier::Deterministic,
            0.5,
            Instant::now(),
        )
    }

    #[test]
    fn scores_below_floor_are_dropped() {
        let candidates = profiles(2);
        let pending = vec![signal_pending(0, 0.05), signal_pending(1, 0.5)];
        let result = assemble_deterministic(pending, &candidates, &MatchOptions::default());
        assert_eq!(result.total_found, 1);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].artisan.id, "artisan-1");
    }

    #[test]
    fn total_found_counts_before_truncation() {
        let candidates = profiles(30);
        let pending: Vec<PendingMatch> =
            (0..30).map(|i| signal_pending(i, 0.9)).collect();
        let result = assemble_deterministic(pending, &candidates, &MatchOptions::default());
        assert_eq!(result.total_found, 30);
        assert_eq!(result.matches.len(), 20);
    }

    #[test]
    fn results_are_ordered_descending_with_dense_ranks() {
        let candidates = profiles(3);
        let pending = vec![
            signal_pending(0, 0.3),
            signal_pending(1, 0.9),
            signal_pending(2, 0.6),
        ];
        let result = assemble_deterministic(pending, &candidates, &MatchOptions::default());
        let ids: Vec<&str> = result.matches.iter().map(|m| m.artisan.id.as_str()).collect();
        assert_eq!(ids, vec!["artisan-1", "artisan-2", "artisan-0"]);
        let ranks: Vec<usize> = result.matches.iter().map(|m| m.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let candidates = profiles(4);
        let pending: Vec<PendingMatch> =
            (0..4).map(|i| signal_pending(i, 0.5)).collect();
        let result = assemble_deterministic(pending, &candidates, &MatchOptions::default());
        let ids: Vec<&str> = result.matches.iter().map(|m| m.artisan.id.as_str()).collect();
        assert_eq!(ids, vec!["artisan-0", "artisan-1", "artisan-2", "artisan-3"]);
    }

    #[test]
    fn explicit_options_override_tier_defaults() {
        let candidates = profiles(3);
        let options = MatchOptions {
            min_score: Some(0.6),
            max_results: Some(1),
            ..Default::default()
        };
        let pending = vec![
            signal_pending(0, 0.5),
            signal_pending(1, 0.7),
            signal_pending(2, 0.9),
        ];
        let result = assemble_deterministic(pending, &candidates, &options);
        assert_eq!(result.total_found, 2);
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].artisan.id, "artisan-2");
    }

    #[test]
    fn emergency_tier_uses_looser_floor_and_tighter_cap() {
        let candidates = profiles(15);
        let pending: Vec<PendingMatch> =
            (0..15).map(|i| signal_pending(i, 0.07)).collect();
        let result = assemble(
            pending,
            &candidates,
            QueryAnalysis::empty(),
            &MatchOptions::default(),
            MatchTier::Emergency,
            0.3,
            Instant::now(),
        );
        // 0.07 clears the emergency floor (0.05) but not the default.
        assert_eq!(result.total_found, 15);
        assert_eq!(result.matches.len(), 10);
        assert!(result.fallback_used);
        assert_eq!(result.tier, MatchTier::Emergency);
    }

    #[test]
    fn upstream_evidence_builds_upstream_explanations() {
        let candidates = profiles(2);
        let pending = vec![
            PendingMatch::from_upstream(0, 0.9, Some("studio portfolio closely matches".into())),
            PendingMatch::from_upstream(1, 0.7, None),
        ];
        let result = assemble(
            pending,
            &candidates,
            QueryAnalysis::empty(),
            &MatchOptions::default(),
            MatchTier::Ai,
            0.9,
            Instant::now(),
        );
        assert!(!result.fallback_used);
        assert_eq!(result.tier, MatchTier::Ai);
        assert_eq!(
            result.matches[0].explanation.primary_reason,
            "studio portfolio closely matches"
        );
        assert_eq!(
            result.matches[1].explanation.primary_reason,
            crate::explain::UPSTREAM_DEFAULT_REASON
        );
    }

    #[test]
    fn non_finite_upstream_scores_are_sanitized() {
        let pending = PendingMatch::from_upstream(0, f32::NAN, None);
        assert_eq!(pending.score, 0.0);
        let pending = PendingMatch::from_upstream(0, 4.0, None);
        assert_eq!(pending.score, 1.0);
    }

    #[test]
    fn empty_pending_yields_empty_result() {
        let result = assemble_deterministic(Vec::new(), &profiles(5), &MatchOptions::default());
        assert!(result.matches.is_empty());
        assert_eq!(result.total_found, 0);
        assert!(result.fallback_used);
    }

    #[test]
    fn confidence_is_clamped() {
        let result = assemble(
            Vec::new(),
            &[],
            QueryAnalysis::empty(),
            &MatchOptions::default(),
            MatchTier::Deterministic,
            7.5,
            Instant::now(),
        );
        assert_eq!(result.confidence, 1.0);
    }
}
