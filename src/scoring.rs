//! Weighted scoring of candidates against a query analysis.
//!
//! Scoring walks fixed signal rows (profession, materials, techniques,
//! skills, specializations, description) and accumulates a weight per
//! matching term, then clamps to `[0.0, 1.0]`. Every contribution is
//! recorded as a [`SignalHit`] so explanations can be rebuilt from the
//! score rather than invented after the fact.

use serde::{Deserialize, Serialize};

use crate::analyzer::{QueryAnalysis, normalize_query};
use crate::profile::ArtisanProfile;
use crate::taxonomy::Taxonomy;
use crate::types::{CancelToken, MatchOptions};

/// Candidates scored between cancellation polls.
pub(crate) const CANCEL_CHECK_INTERVAL: usize = 64;

/// Per-signal weights. Deployments can re-tune these through the
/// engine config; the defaults are the shipped ranking behavior, and
/// omitted fields keep their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Candidate profession contains a canonical term the query named
    /// outright.
    pub profession_exact: f32,
    /// Profession matched through a synonym or inferred profession.
    pub profession_synonym: f32,
    /// Per extracted material matching a candidate material.
    pub material: f32,
    /// Per extracted technique matching a candidate technique.
    pub technique: f32,
    /// Per detected keyword matching a candidate skill.
    pub skill: f32,
    /// Per detected keyword matching a candidate specialization.
    pub specialization: f32,
    /// Per detected keyword found in the profile description.
    pub description: f32,
    /// Pre-clamp multiplier applied when `boost_exact_matches` is set
    /// and the profession matched exactly.
    pub exact_boost: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            profession_exact: 0.40,
            profession_synonym: 0.30,
            material: 0.20,
            technique: 0.20,
            skill: 0.15,
            specialization: 0.10,
            description: 0.05,
            exact_boost: 1.2,
        }
    }
}

impl ScoringWeights {
    /// Range check, run once when the engine is built.
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("profession_exact", self.profession_exact),
            ("profession_synonym", self.profession_synonym),
            ("material", self.material),
            ("technique", self.technique),
            ("skill", self.skill),
            ("specialization", self.specialization),
            ("description", self.description),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be within [0.0, 1.0], got {value}"));
            }
        }
        if !(1.0..=3.0).contains(&self.exact_boost) {
            return Err(format!(
                "exact_boost must be within [1.0, 3.0], got {}",
                self.exact_boost
            ));
        }
        Ok(())
    }
}

/// Which profile field a signal came from. Declaration order is the
/// priority order used when building explanations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalField {
    Profession,
    Material,
    Technique,
    Skill,
    /// Only produced by the emergency scorer.
    Name,
    Specialization,
    Description,
}

/// How the matched term related to the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The query named the term outright.
    Exact,
    /// Reached through the synonym tables or product inference.
    Synonym,
    /// Plain substring evidence.
    Keyword,
}

/// One scored signal: which term hit which field, and what it was
/// worth before clamping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalHit {
    pub term: String,
    pub field: SignalField,
    pub weight: f32,
    pub kind: MatchKind,
}

/// Result of scoring one candidate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateScore {
    /// Clamped to `[0.0, 1.0]`.
    pub score: f32,
    pub hits: Vec<SignalHit>,
    pub profession_match: bool,
    pub material_match: bool,
    pub technique_match: bool,
    pub specialization_match: bool,
    pub location_match: bool,
}

fn contains_either(a: &str, b: &str) -> bool {
    !a.is_empty() && !b.is_empty() && (a.contains(b) || b.contains(a))
}

/// Scores one candidate against the analysis.
///
/// The profession row distinguishes exact from inferred knowledge: a
/// canonical profession the user typed outright (it appears in
/// `detected_keywords`) earns the exact weight, one reached through a
/// synonym or product word earns the synonym weight. All other rows
/// accumulate per term.
pub fn score_candidate(
    analysis: &QueryAnalysis,
    profile: &ArtisanProfile,
    taxonomy: &Taxonomy,
    options: &MatchOptions,
    weights: &ScoringWeights,
) -> CandidateScore {
    let mut result = CandidateScore::default();
    let mut raw = 0.0f32;
    let mut exact_profession = false;

    let profession = profile
        .profession
        .as_deref()
        .map(normalize_query)
        .unwrap_or_default();

    if !profession.is_empty() {
        for candidate in &analysis.possible_professions {
            if profession.contains(candidate.as_str()) {
                if analysis.detected_keywords.contains(candidate) {
                    raw += weights.profession_exact;
                    exact_profession = true;
                    result.hits.push(SignalHit {
                        term: candidate.clone(),
                        field: SignalField::Profession,
                        weight: weights.profession_exact,
                        kind: MatchKind::Exact,
                    });
                } else {
                    raw += weights.profession_synonym;
                    result.hits.push(SignalHit {
                        term: candidate.clone(),
                        field: SignalField::Profession,
                        weight: weights.profession_synonym,
                        kind: MatchKind::Synonym,
                    });
                }
                result.profession_match = true;
            } else if let Some(synonyms) = taxonomy.professions.get(candidate)
                && let Some(hit) = synonyms.iter().find(|s| profession.contains(s.as_str()))
            {
                raw += weights.profession_synonym;
                result.profession_match = true;
                result.hits.push(SignalHit {
                    term: hit.clone(),
                    field: SignalField::Profession,
                    weight: weights.profession_synonym,
                    kind: MatchKind::Synonym,
                });
            }
        }
    }

    let materials: Vec<String> = profile.materials.iter().map(|m| normalize_query(m)).collect();
    for term in &analysis.extracted_materials {
        if materials.iter().any(|m| contains_either(m, term)) {
            raw += weights.material;
            result.material_match = true;
            result.hits.push(SignalHit {
                term: term.clone(),
                field: SignalField::Material,
                weight: weights.material,
                kind: MatchKind::Keyword,
            });
        }
    }

    let techniques: Vec<String> = profile.techniques.iter().map(|t| normalize_query(t)).collect();
    for term in &analysis.extracted_techniques {
        if techniques.iter().any(|t| contains_either(t, term)) {
            raw += weights.technique;
            result.technique_match = true;
            result.hits.push(SignalHit {
                term: term.clone(),
                field: SignalField::Technique,
                weight: weights.technique,
                kind: MatchKind::Keyword,
            });
        }
    }

    let skills: Vec<String> = profile.skills.iter().map(|s| normalize_query(s)).collect();
    let specializations: Vec<String> = profile
        .specializations
        .iter()
        .map(|s| normalize_query(s))
        .collect();
    let description = profile
        .description
        .as_deref()
        .map(normalize_query)
        .unwrap_or_default();

    for keyword in &analysis.detected_keywords {
        if skills.iter().any(|s| contains_either(s, keyword)) {
            raw += weights.skill;
            result.hits.push(SignalHit {
                term: keyword.clone(),
                field: SignalField::Skill,
                weight: weights.skill,
                kind: MatchKind::Keyword,
            });
        }
        if specializations.iter().any(|s| contains_either(s, keyword)) {
            raw += weights.specialization;
            result.specialization_match = true;
            result.hits.push(SignalHit {
                term: keyword.clone(),
                field: SignalField::Specialization,
                weight: weights.specialization,
                kind: MatchKind::Keyword,
            });
        }
        if description.contains(keyword.as_str()) {
            raw += weights.description;
            result.hits.push(SignalHit {
                term: keyword.clone(),
                field: SignalField::Description,
                weight: weights.description,
                kind: MatchKind::Keyword,
            });
        }
    }

    if options.boost_exact_matches && exact_profession {
        raw *= weights.exact_boost;
    }
    result.score = raw.clamp(0.0, 1.0);

    if let (Some(wanted), Some(have)) = (options.location.as_deref(), profile.location.as_deref()) {
        let wanted = normalize_query(wanted);
        let have = normalize_query(have);
        result.location_match = contains_either(&wanted, &have);
    }

    result
}

/// Scores a whole candidate list, polling `cancel` between batches.
///
/// Cancellation stops the scan and returns whatever was scored so far;
/// the caller still gets a valid, assemblable result. Returned tuples
/// carry the original candidate index so downstream ordering stays
/// tied to input order.
pub fn score_candidates(
    analysis: &QueryAnalysis,
    candidates: &[ArtisanProfile],
    taxonomy: &Taxonomy,
    options: &MatchOptions,
    weights: &ScoringWeights,
    cancel: Option<&CancelToken>,
) -> Vec<(usize, CandidateScore)> {
    let mut scored = Vec::with_capacity(candidates.len());
    for (index, profile) in candidates.iter().enumerate() {
        if index % CANCEL_CHECK_INTERVAL == 0
            && let Some(token) = cancel
            && token.is_cancelled()
        {
            tracing::debug!(
                scored = scored.len(),
                total = candidates.len(),
                "candidate scan cancelled"
            );
            break;
        }
        scored.push((index, score_candidate(analysis, profile, taxonomy, options, weights)));
    }
    scored
}
