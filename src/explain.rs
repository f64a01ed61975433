//! Builds human-readable explanations from recorded scoring signals.
//!
//! Explanations are derived, never invented: every statement traces
//! back to a [`SignalHit`] the scorer actually recorded, so the text
//! and the number always agree.

use std::collections::{BTreeMap, BTreeSet};

use crate::scoring::{SignalField, SignalHit};
use crate::types::{ConfidenceLevel, MatchExplanation, ScoreBreakdown};

/// Headline used when no signal group qualifies as a primary reason,
/// which is the normal case for emergency-tier results.
pub const FALLBACK_PRIMARY_REASON: &str = "basic keyword matching (fallback mode)";

/// Upstream rankers may omit a per-hit reason; this stands in.
pub const UPSTREAM_DEFAULT_REASON: &str = "semantic similarity match";

const MAX_DETAILED_REASONS: usize = 5;

/// Builds the explanation for one scored candidate.
///
/// The primary reason comes from the highest-priority non-empty signal
/// group among profession, material, technique, and skill. Detailed
/// reasons cover every non-empty group in priority order, capped at
/// five. Weights roll up into the breakdown by field; name,
/// specialization, and description evidence count toward the skill
/// bucket.
pub fn build_explanation(hits: &[SignalHit], score: f32) -> MatchExplanation {
    let mut groups: BTreeMap<SignalField, BTreeSet<&str>> = BTreeMap::new();
    for hit in hits {
        groups.entry(hit.field).or_default().insert(hit.term.as_str());
    }

    let primary_reason = [
        SignalField::Profession,
        SignalField::Material,
        SignalField::Technique,
        SignalField::Skill,
    ]
    .into_iter()
    .find_map(|field| groups.get(&field).map(|terms| primary_phrase(field, terms)))
    .unwrap_or_else(|| FALLBACK_PRIMARY_REASON.to_string());

    let mut detailed_reasons: Vec<String> = groups
        .iter()
        .map(|(field, terms)| detail_phrase(*field, terms))
        .collect();
    detailed_reasons.truncate(MAX_DETAILED_REASONS);

    let terms_of = |field: SignalField| -> Vec<String> {
        groups
            .get(&field)
            .map(|terms| terms.iter().map(|t| (*t).to_string()).collect())
            .unwrap_or_default()
    };

    let mut breakdown = ScoreBreakdown::default();
    for hit in hits {
        match hit.field {
            SignalField::Profession => breakdown.profession += hit.weight,
            SignalField::Material => breakdown.material += hit.weight,
            SignalField::Technique => breakdown.technique += hit.weight,
            SignalField::Skill
            | SignalField::Name
            | SignalField::Specialization
            | SignalField::Description => breakdown.skill += hit.weight,
        }
    }

    MatchExplanation {
        primary_reason,
        detailed_reasons,
        matched_skills: terms_of(SignalField::Skill),
        matched_materials: terms_of(SignalField::Material),
        matched_techniques: terms_of(SignalField::Technique),
        confidence_level: ConfidenceLevel::for_score(score),
        score_breakdown: breakdown,
    }
}

/// Explanation for a hit ranked by the semantic upstream. The upstream
/// score stands on its own, so the breakdown stays empty and the
/// reason text is passed through as the headline.
pub fn upstream_explanation(reason: Option<&str>, score: f32) -> MatchExplanation {
    let primary_reason = match reason.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => UPSTREAM_DEFAULT_REASON.to_string(),
    };
    MatchExplanation {
        primary_reason,
        detailed_reasons: Vec::new(),
        matched_skills: Vec::new(),
        matched_materials: Vec::new(),
        matched_techniques: Vec::new(),
        confidence_level: ConfidenceLevel::for_score(score),
        score_breakdown: ScoreBreakdown::default(),
    }
}

fn join(terms: &BTreeSet<&str>) -> String {
    terms.iter().copied().collect::<Vec<_>>().join(", ")
}

fn primary_phrase(field: SignalField, terms: &BTreeSet<&str>) -> String {
    let joined = join(terms);
    match field {
        SignalField::Profession => format!("Profession matches {joined}"),
        SignalField::Material => format!("Works with {joined}"),
        SignalField::Technique => format!("Skilled in {joined}"),
        _ => format!("Relevant skills: {joined}"),
    }
}

fn detail_phrase(field: SignalField, terms: &BTreeSet<&str>) -> String {
    let joined = join(terms);
    match field {
        SignalField::Profession => format!("Profession match: {joined}"),
        SignalField::Material => format!("Material expertise: {joined}"),
        SignalField::Technique => format!("Technique proficiency: {joined}"),
        SignalField::Skill => format!("Relevant skills: {joined}"),
        SignalField::Name => format!("Name contains: {joined}"),
        SignalField::Specialization => format!("Specializes in {joined}"),
        SignalField::Description => format!("Profile description mentions: {joined}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::MatchKind;

    fn hit(term: &str, field: SignalField, weight: f32) -> SignalHit {
        SignalHit {
            term: term.into(),
            field,
            weight,
            kind: MatchKind::Keyword,
        }
    }

    #[test]
    fn profession_headline_wins() {
        let hits = vec![
            hit("wood", SignalField::Material, 0.20),
            hit("pottery", SignalField::Profession, 0.40),
        ];
        let explanation = build_explanation(&hits, 0.60);
        assert_eq!(explanation.primary_reason, "Profession matches pottery");
    }

    #[test]
    fn priority_falls_through_to_materials() {
        let hits = vec![
            hit("carving", SignalField::Technique, 0.20),
            hit("teak", SignalField::Material, 0.20),
            hit("wood", SignalField::Material, 0.20),
        ];
        let explanation = build_explanation(&hits, 0.60);
        assert_eq!(explanation.primary_reason, "Works with teak, wood");
    }

    #[test]
    fn no_signals_uses_fallback_headline() {
        let explanation = build_explanation(&[], 0.05);
        assert_eq!(explanation.primary_reason, FALLBACK_PRIMARY_REASON);
        assert!(explanation.detailed_reasons.is_empty());
        assert_eq!(explanation.score_breakdown, ScoreBreakdown::default());
    }

    #[test]
    fn detailed_reasons_follow_priority_and_cap() {
        let hits = vec![
            hit("note", SignalField::Description, 0.05),
            hit("focus", SignalField::Specialization, 0.10),
            hit("asha", SignalField::Name, 0.10),
            hit("glazing", SignalField::Skill, 0.15),
            hit("carving", SignalField::Technique, 0.20),
            hit("wood", SignalField::Material, 0.20),
            hit("pottery", SignalField::Profession, 0.40),
        ];
        let explanation = build_explanation(&hits, 0.9);
        assert_eq!(explanation.detailed_reasons.len(), 5);
        assert_eq!(explanation.detailed_reasons[0], "Profession match: pottery");
        assert_eq!(explanation.detailed_reasons[1], "Material expertise: wood");
        assert_eq!(explanation.detailed_reasons[2], "Technique proficiency: carving");
        assert_eq!(explanation.detailed_reasons[3], "Relevant skills: glazing");
        assert_eq!(explanation.detailed_reasons[4], "Name contains: asha");
    }

    #[test]
    fn repeated_terms_are_mentioned_once() {
        let hits = vec![
            hit("wood", SignalField::Material, 0.20),
            hit("wood", SignalField::Material, 0.20),
        ];
        let explanation = build_explanation(&hits, 0.4);
        assert_eq!(explanation.detailed_reasons, vec!["Material expertise: wood"]);
        assert_eq!(explanation.matched_materials, vec!["wood"]);
        // Both contributions still count in the breakdown.
        assert!((explanation.score_breakdown.material - 0.40).abs() < 1e-6);
    }

    #[test]
    fn auxiliary_fields_roll_into_skill_bucket() {
        let hits = vec![
            hit("focus", SignalField::Specialization, 0.10),
            hit("note", SignalField::Description, 0.05),
            hit("asha", SignalField::Name, 0.10),
        ];
        let explanation = build_explanation(&hits, 0.25);
        assert!((explanation.score_breakdown.skill - 0.25).abs() < 1e-6);
        assert_eq!(explanation.score_breakdown.profession, 0.0);
    }

    #[test]
    fn matched_sets_are_filled_per_field() {
        let hits = vec![
            hit("glazing", SignalField::Skill, 0.15),
            hit("clay", SignalField::Material, 0.20),
            hit("carving", SignalField::Technique, 0.20),
        ];
        let explanation = build_explanation(&hits, 0.55);
        assert_eq!(explanation.matched_skills, vec!["glazing"]);
        assert_eq!(explanation.matched_materials, vec!["clay"]);
        assert_eq!(explanation.matched_techniques, vec!["carving"]);
    }

    #[test]
    fn confidence_level_tracks_score() {
        assert_eq!(
            build_explanation(&[], 0.9).confidence_level,
            ConfidenceLevel::High
        );
        assert_eq!(
            build_explanation(&[], 0.7).confidence_level,
            ConfidenceLevel::Medium
        );
        assert_eq!(
            build_explanation(&[], 0.2).confidence_level,
            ConfidenceLevel::Low
        );
    }

    #[test]
    fn upstream_reason_passes_through() {
        let explanation = upstream_explanation(Some("trained with master potters"), 0.9);
        assert_eq!(explanation.primary_reason, "trained with master potters");
        assert_eq!(explanation.confidence_level, ConfidenceLevel::High);
        assert!(explanation.detailed_reasons.is_empty());
    }

    #[test]
    fn missing_upstream_reason_uses_default() {
        assert_eq!(
            upstream_explanation(None, 0.5).primary_reason,
            UPSTREAM_DEFAULT_REASON
        );
        assert_eq!(
            upstream_explanation(Some("   "), 0.5).primary_reason,
            UPSTREAM_DEFAULT_REASON
        );
    }
}
