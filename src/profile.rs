//! Candidate artisan profiles.
//!
//! Profiles arrive from the caller's own storage layer, usually as JSON
//! documents that have survived several schema generations. Every field
//! except `id` is therefore defaulted: a record with a missing or null
//! `skills` array deserializes to an empty list instead of failing the
//! whole request.

use serde::{Deserialize, Deserializer, Serialize};

// `#[serde(default)]` only covers absent keys; migrated records also
// carry explicit nulls, which must read as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single artisan candidate as presented to the matching engine.
///
/// The engine treats profiles as read-only snapshots. Matching never
/// mutates a profile; ranked results embed a clone so the caller can
/// render them without a second lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtisanProfile {
    /// Stable identifier from the caller's store. Upstream semantic
    /// rankers refer to candidates by this id.
    pub id: String,
    /// Display name. May be empty on partially migrated records.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Primary craft, free text ("Pottery", "wood carving", ...).
    #[serde(default)]
    pub profession: Option<String>,
    /// Self-reported skills, free text.
    #[serde(default, deserialize_with = "null_as_default")]
    pub skills: Vec<String>,
    /// Materials the artisan works with.
    #[serde(default, deserialize_with = "null_as_default")]
    pub materials: Vec<String>,
    /// Techniques the artisan practices.
    #[serde(default, deserialize_with = "null_as_default")]
    pub techniques: Vec<String>,
    /// Narrower focus areas within the profession.
    #[serde(default, deserialize_with = "null_as_default")]
    pub specializations: Vec<String>,
    /// Long-form profile text.
    #[serde(default)]
    pub description: Option<String>,
    /// Free-text location ("Jaipur", "Oaxaca, Mexico", ...).
    #[serde(default)]
    pub location: Option<String>,
    /// Years of practice, when the record carries it. Not consulted by
    /// the keyword scorer; reserved for richer ranking tiers.
    #[serde(default)]
    pub experience_years: Option<u32>,
    /// Aggregate review rating, when the record carries it. Reserved
    /// like `experience_years`.
    #[serde(default)]
    pub rating: Option<f32>,
}

impl ArtisanProfile {
    /// Name to use in logs and explanations. Falls back to the id for
    /// records with an empty display name.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_record_deserializes_with_defaults() {
        let profile: ArtisanProfile =
            serde_json::from_value(json!({ "id": "artisan-1" })).unwrap();
        assert_eq!(profile.id, "artisan-1");
        assert_eq!(profile.name, "");
        assert!(profile.profession.is_none());
        assert!(profile.skills.is_empty());
        assert!(profile.materials.is_empty());
        assert!(profile.rating.is_none());
    }

    #[test]
    fn null_fields_deserialize_as_defaults() {
        let batch: Vec<ArtisanProfile> = serde_json::from_str(
            r#"[{
                "id": "artisan-2",
                "name": null,
                "profession": null,
                "skills": null,
                "materials": null,
                "techniques": null,
                "specializations": null,
                "description": null,
                "location": null
            }]"#,
        )
        .unwrap();
        let profile = &batch[0];
        assert_eq!(profile.name, "");
        assert!(profile.profession.is_none());
        assert!(profile.skills.is_empty());
        assert!(profile.materials.is_empty());
        assert!(profile.techniques.is_empty());
        assert!(profile.specializations.is_empty());
        assert!(profile.description.is_none());
        assert!(profile.location.is_none());
    }

    #[test]
    fn unknown_fields_are_tolerated() {
        let profile: ArtisanProfile = serde_json::from_value(json!({
            "id": "artisan-3",
            "name": "Ravi",
            "legacy_score": 42,
            "portfolio_urls": ["https://example.com"],
        }))
        .unwrap();
        assert_eq!(profile.name, "Ravi");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let anon = ArtisanProfile {
            id: "artisan-4".into(),
            name: "   ".into(),
            ..Default::default()
        };
        assert_eq!(anon.display_name(), "artisan-4");

        let named = ArtisanProfile {
            id: "artisan-5".into(),
            name: "Meera".into(),
            ..Default::default()
        };
        assert_eq!(named.display_name(), "Meera");
    }

    #[test]
    fn full_record_round_trips() {
        let profile = ArtisanProfile {
            id: "artisan-6".into(),
            name: "Kenji".into(),
            profession: Some("Woodworking".into()),
            skills: vec!["joinery".into(), "lacquer".into()],
            materials: vec!["oak".into()],
            techniques: vec!["carving".into()],
            specializations: vec!["furniture".into()],
            description: Some("Third-generation furniture maker.".into()),
            location: Some("Kyoto".into()),
            experience_years: Some(22),
            rating: Some(4.8),
        };
        let encoded = serde_json::to_string(&profile).unwrap();
        let decoded: ArtisanProfile = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, profile);
    }
}
