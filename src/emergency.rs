//! Plain-text scorer of last resort.
//!
//! This tier runs when the deterministic tier cannot, so it leans on
//! nothing configurable: no taxonomy, no weights table, no options
//! validation. It scans three profile fields with bare substring
//! checks and can only ever return, never fail.

use crate::analyzer::normalize_query;
use crate::profile::ArtisanProfile;
use crate::scoring::{CandidateScore, MatchKind, SignalField, SignalHit};

/// Flat weight for a query word found in the profession field.
pub(crate) const PROFESSION_WEIGHT: f32 = 0.30;
/// Flat weight for a query word found in the name.
pub(crate) const NAME_WEIGHT: f32 = 0.10;
/// Flat weight for a query word found in the description.
pub(crate) const DESCRIPTION_WEIGHT: f32 = 0.10;

/// Words shorter than this are skipped as noise.
const MIN_WORD_CHARS: usize = 2;

/// Splits a raw query into scannable lowercase words.
fn query_words(raw: &str) -> Vec<String> {
    normalize_query(raw)
        .split_whitespace()
        .filter(|w| w.chars().count() >= MIN_WORD_CHARS)
        .map(str::to_string)
        .collect()
}

/// Scores one candidate. Each field contributes at most once, on the
/// first query word it contains, so scores stay well below 1.0.
fn score_profile(words: &[String], profile: &ArtisanProfile) -> CandidateScore {
    let mut result = CandidateScore::default();

    let fields = [
        (
            profile.profession.as_deref().map(normalize_query).unwrap_or_default(),
            SignalField::Profession,
            PROFESSION_WEIGHT,
        ),
        (normalize_query(&profile.name), SignalField::Name, NAME_WEIGHT),
        (
            profile.description.as_deref().map(normalize_query).unwrap_or_default(),
            SignalField::Description,
            DESCRIPTION_WEIGHT,
        ),
    ];

    for (text, field, weight) in fields {
        if text.is_empty() {
            continue;
        }
        if let Some(word) = words.iter().find(|w| text.contains(w.as_str())) {
            result.score += weight;
            if field == SignalField::Profession {
                result.profession_match = true;
            }
            result.hits.push(SignalHit {
                term: word.clone(),
                field,
                weight,
                kind: MatchKind::Keyword,
            });
        }
    }

    result
}

/// Scores every candidate against the raw query text. An empty or
/// unusable query yields an empty list.
pub fn emergency_match(query: &str, candidates: &[ArtisanProfile]) -> Vec<(usize, CandidateScore)> {
    let words = query_words(query);
    if words.is_empty() {
        return Vec::new();
    }
    candidates
        .iter()
        .enumerate()
        .map(|(index, profile)| (index, score_profile(&words, profile)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn potter() -> ArtisanProfile {
        ArtisanProfile {
            id: "p-1".into(),
            name: "Ravi the Potter".into(),
            profession: Some("Pottery".into()),
            description: Some("Teaches weekend pottery classes.".into()),
            ..Default::default()
        }
    }

    #[test]
    fn profession_substring_scores_030() {
        let profile = ArtisanProfile {
            id: "p-2".into(),
            profession: Some("Pottery".into()),
            ..Default::default()
        };
        let scored = emergency_match("pott", &[profile]);
        assert!((scored[0].1.score - PROFESSION_WEIGHT).abs() < 1e-6);
        assert!(scored[0].1.profession_match);
    }

    #[test]
    fn all_three_fields_accumulate() {
        // "pottery" is not a substring of the name "Ravi the Potter",
        // so only profession and description fire.
        let scored = emergency_match("pottery", &[potter()]);
        let score = scored[0].1.score;
        assert!((score - (PROFESSION_WEIGHT + DESCRIPTION_WEIGHT)).abs() < 1e-6);

        let scored = emergency_match("potter", &[potter()]);
        let score = scored[0].1.score;
        assert!(
            (score - (PROFESSION_WEIGHT + NAME_WEIGHT + DESCRIPTION_WEIGHT)).abs() < 1e-6
        );
    }

    #[test]
    fn each_field_counts_once() {
        let profile = ArtisanProfile {
            id: "p-3".into(),
            profession: Some("pottery and clay work".into()),
            ..Default::default()
        };
        let scored = emergency_match("pottery clay", &[profile]);
        assert!((scored[0].1.score - PROFESSION_WEIGHT).abs() < 1e-6);
        assert_eq!(scored[0].1.hits.len(), 1);
    }

    #[test]
    fn single_char_words_are_ignored() {
        assert!(emergency_match("a b c", &[potter()]).is_empty());
        assert!(emergency_match("", &[potter()]).is_empty());
    }

    #[test]
    fn unrelated_query_scores_zero() {
        let scored = emergency_match("quantum", &[potter()]);
        assert_eq!(scored[0].1.score, 0.0);
        assert!(scored[0].1.hits.is_empty());
    }

    #[test]
    fn empty_profile_is_handled() {
        let blank = ArtisanProfile {
            id: "blank".into(),
            ..Default::default()
        };
        let scored = emergency_match("pottery", &[blank]);
        assert_eq!(scored[0].1.score, 0.0);
    }

    #[test]
    fn name_hit_uses_name_field() {
        let scored = emergency_match("ravi", &[potter()]);
        assert_eq!(scored[0].1.hits.len(), 1);
        assert_eq!(scored[0].1.hits[0].field, SignalField::Name);
        assert!((scored[0].1.score - NAME_WEIGHT).abs() < 1e-6);
    }
}
