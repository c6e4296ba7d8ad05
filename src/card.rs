// 🃏 Card Records - provider catalog, client-extracted data, and projected output
// Three shapes: SourceRecord (Scryfall bulk data), SecondaryRecord (game files),
// OutputRecord (the compact dataset we ship)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Image variant name → URL (e.g. "border_crop" → "https://...")
pub type ImageUris = BTreeMap<String, String>;

// ============================================================================
// SOURCE RECORD (provider catalog)
// ============================================================================

/// One card entry from the provider's bulk catalog.
///
/// Only the fields the pipeline reads are modeled; everything else in the
/// provider JSON is ignored on deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub name: String,

    /// Platform identifier (game client id). Missing for many recent prints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arena_id: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    #[serde(default)]
    pub set: String,

    /// Category marker ("token", "expansion", "promo", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_type: Option<String>,

    #[serde(default)]
    pub collector_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_identity: Option<Vec<String>>,

    /// Mana value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmc: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booster: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printed_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uris: Option<ImageUris>,

    /// Format → "legal" / "not_legal" / "banned" / "restricted"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legalities: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_faces: Option<Vec<CardFace>>,
}

/// One printed side of a multi-faced card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardFace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uris: Option<ImageUris>,
}

impl SourceRecord {
    /// Create a record with just a name, set and collector number
    pub fn new(name: &str, set: &str, collector_number: &str) -> Self {
        SourceRecord {
            name: name.to_string(),
            set: set.to_string(),
            collector_number: collector_number.to_string(),
            ..Default::default()
        }
    }

    /// Builder pattern: add platform id
    pub fn with_arena_id(mut self, arena_id: u32) -> Self {
        self.arena_id = Some(arena_id);
        self
    }

    /// Builder pattern: add faces
    pub fn with_faces(mut self, faces: Vec<CardFace>) -> Self {
        self.card_faces = Some(faces);
        self
    }

    /// Builder pattern: add top-level image variants
    pub fn with_images(mut self, images: ImageUris) -> Self {
        self.image_uris = Some(images);
        self
    }

    /// Two or more faces (split, transform, meld, ...)
    pub fn is_multi_faced(&self) -> bool {
        self.card_faces.as_ref().map_or(false, |faces| faces.len() > 1)
    }

    /// Name of the first face, if the record has any faces
    pub fn first_face_name(&self) -> Option<&str> {
        self.card_faces
            .as_ref()
            .and_then(|faces| faces.first())
            .and_then(|face| face.name.as_deref())
    }

    /// Short human-readable identifier for diagnostics
    pub fn label(&self) -> String {
        match self.arena_id {
            Some(id) => format!("{} ({} #{}, id {})", self.name, self.set, self.collector_number, id),
            None => format!("{} ({} #{})", self.name, self.set, self.collector_number),
        }
    }
}

impl CardFace {
    pub fn new(name: &str) -> Self {
        CardFace {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn with_oracle_text(mut self, text: &str) -> Self {
        self.oracle_text = Some(text.to_string());
        self
    }

    pub fn with_images(mut self, images: ImageUris) -> Self {
        self.image_uris = Some(images);
        self
    }
}

// ============================================================================
// SECONDARY RECORD (extracted from the game client)
// ============================================================================

/// Minimal card mapping pulled from the client's own data files.
/// Authoritative for platform ids; used only to backfill SourceRecords.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecondaryRecord {
    #[serde(rename = "arenaId")]
    pub arena_id: u32,
    pub name: String,
    pub collector_number: String,
    pub set: String,
}

// ============================================================================
// OUTPUT RECORD (projected dataset)
// ============================================================================

/// Front/back image URLs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardImages {
    pub front: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
}

/// Face entry in the output; only whitelisted fields survive
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputFace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_text: Option<String>,
}

/// Projected card. Absent fields are omitted, never written as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "arenaId", default, skip_serializing_if = "Option::is_none")]
    pub arena_id: Option<u32>,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_identity: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmc: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rarity: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_line: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booster: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_types: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printed_name: Option<String>,

    #[serde(rename = "imgs", default, skip_serializing_if = "Option::is_none")]
    pub images: Option<CardImages>,

    /// Always present; keys restricted to the recognized formats
    #[serde(default)]
    pub legalities: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_faces: Option<Vec<OutputFace>>,
}

impl OutputRecord {
    pub fn front_image(&self) -> Option<&str> {
        self.images.as_ref().map(|imgs| imgs.front.as_str())
    }

    pub fn back_image(&self) -> Option<&str> {
        self.images.as_ref().and_then(|imgs| imgs.back.as_deref())
    }

    /// Set `imgs.front`, keeping any back image already present
    pub fn set_front_image(&mut self, url: &str) {
        match self.images.as_mut() {
            Some(imgs) => imgs.front = url.to_string(),
            None => {
                self.images = Some(CardImages {
                    front: url.to_string(),
                    back: None,
                })
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_record_ignores_unknown_fields() {
        let json = r#"{
            "object": "card",
            "name": "Shock",
            "arena_id": 68709,
            "lang": "en",
            "set": "m20",
            "collector_number": "160",
            "prices": {"usd": "0.10"},
            "legalities": {"standard": "legal", "vintage": "legal"}
        }"#;

        let record: SourceRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.name, "Shock");
        assert_eq!(record.arena_id, Some(68709));
        assert_eq!(record.collector_number, "160");
        assert_eq!(record.legalities.unwrap().len(), 2);
        assert!(record.card_faces.is_none());
    }

    #[test]
    fn test_multi_faced_requires_two_faces() {
        let single = SourceRecord::new("Solo", "xyz", "1").with_faces(vec![CardFace::new("Solo")]);
        let double = SourceRecord::new("Fire // Ice", "xyz", "2")
            .with_faces(vec![CardFace::new("Fire"), CardFace::new("Ice")]);

        assert!(!single.is_multi_faced());
        assert!(double.is_multi_faced());
        assert_eq!(double.first_face_name(), Some("Fire"));
    }

    #[test]
    fn test_output_record_omits_absent_fields() {
        let record = OutputRecord {
            arena_id: Some(1),
            name: "Opt".to_string(),
            ..Default::default()
        };

        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.get("arenaId").unwrap(), 1);
        assert!(obj.contains_key("legalities"));
        assert!(!obj.contains_key("imgs"));
        assert!(!obj.contains_key("rarity"));
        assert!(obj.values().all(|v| !v.is_null()));
    }

    #[test]
    fn test_secondary_record_wire_shape() {
        let json = r#"{"arenaId": 77000, "name": "Bonecrusher Giant", "collector_number": "115", "set": "eld"}"#;
        let record: SecondaryRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.arena_id, 77000);
        assert_eq!(record.set, "eld");
    }

    #[test]
    fn test_set_front_image_keeps_back() {
        let mut record = OutputRecord::default();
        record.images = Some(CardImages {
            front: "a".to_string(),
            back: Some("b".to_string()),
        });

        record.set_front_image("c");

        assert_eq!(record.front_image(), Some("c"));
        assert_eq!(record.back_image(), Some("b"));
    }
}
