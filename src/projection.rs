// 📦 Field Projection & Reshape - Catalog record → compact output record
// Whitelisted copy, image flattening, legality pruning, face trimming,
// then replacement images on top

use crate::card::{ImageUris, OutputFace, OutputRecord, SourceRecord};
use crate::config::PipelineConfig;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

/// A record whose nested structure cannot be projected
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProjectionError {
    #[error("top-level images lack the '{variant}' variant")]
    MissingImageVariant { variant: String },

    #[error("no top-level images and face {face} has no '{variant}' image")]
    MissingFaceImage { face: usize, variant: String },
}

// ============================================================================
// IMAGE OVERRIDES
// ============================================================================

/// Indexed replacement-image tables (first entry wins on duplicate keys)
#[derive(Debug, Clone, Default)]
pub struct ImageOverrides {
    by_id: HashMap<u32, String>,
    by_name_set: HashMap<(String, String), String>,
}

impl ImageOverrides {
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut overrides = ImageOverrides::default();

        for replacement in &config.replacement_images {
            overrides
                .by_id
                .entry(replacement.arena_id)
                .or_insert_with(|| replacement.img.clone());
        }

        for extra in &config.extra_replacements {
            overrides
                .by_name_set
                .entry((extra.name.clone(), extra.set.clone()))
                .or_insert_with(|| extra.img.clone());
        }

        overrides
    }

    /// Id-keyed entry first, then name+set.
    ///
    /// The name+set table applies to any card without an id-keyed entry, not
    /// only to cards lacking a platform id: after filtering every card has
    /// one, and the name+set entries exist for printings whose ids differ
    /// between client builds.
    pub fn lookup(&self, arena_id: Option<u32>, name: &str, set: &str) -> Option<&str> {
        if let Some(img) = arena_id.and_then(|id| self.by_id.get(&id)) {
            return Some(img.as_str());
        }
        self.by_name_set
            .get(&(name.to_string(), set.to_string()))
            .map(|img| img.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_name_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// PROJECTION
// ============================================================================

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Project a record that passed the filter into the output shape.
///
/// Order matters: top-level images are taken first, so a face image is
/// only used for the front when the card has none of its own. A missing
/// front is an error only when neither the first face nor a replacement
/// image can supply one.
pub fn project(
    record: &SourceRecord,
    config: &PipelineConfig,
    overrides: &ImageOverrides,
) -> Result<OutputRecord, ProjectionError> {
    let variant = config.image_variant.as_str();
    let replacement = overrides.lookup(record.arena_id, &record.name, &record.set);

    let mut output = OutputRecord {
        arena_id: record.arena_id,
        name: record.name.clone(),
        color_identity: record.color_identity.clone(),
        cmc: record.cmc,
        set: non_empty(&record.set),
        rarity: record.rarity.clone(),
        type_line: record.type_line.clone(),
        oracle_text: record.oracle_text.clone(),
        layout: record.layout.clone(),
        keywords: record.keywords.clone(),
        collector_number: non_empty(&record.collector_number),
        booster: record.booster,
        promo_types: record.promo_types.clone(),
        printed_name: record.printed_name.clone(),
        images: None,
        legalities: BTreeMap::new(),
        card_faces: None,
    };

    if let Some(images) = record.image_uris.as_ref().filter(|imgs| !imgs.is_empty()) {
        match (pick_variant(images, variant), replacement) {
            (Some(front), _) | (None, Some(front)) => output.set_front_image(front),
            // Faces get their chance below
            (None, None) if record.is_multi_faced() => {}
            (None, None) => {
                return Err(ProjectionError::MissingImageVariant {
                    variant: variant.to_string(),
                })
            }
        }
    }

    if let Some(legalities) = &record.legalities {
        for format in &config.recognized_formats {
            if let Some(status) = legalities.get(format).filter(|s| s.as_str() == "legal") {
                output.legalities.insert(format.clone(), status.clone());
            }
        }
    }

    if let Some(faces) = record.card_faces.as_ref().filter(|_| record.is_multi_faced()) {
        if output.images.is_none() {
            let front = faces[0]
                .image_uris
                .as_ref()
                .and_then(|imgs| pick_variant(imgs, variant))
                .or(replacement)
                .ok_or_else(|| ProjectionError::MissingFaceImage {
                    face: 0,
                    variant: variant.to_string(),
                })?;
            output.set_front_image(front);
        }

        let back = faces[1]
            .image_uris
            .as_ref()
            .and_then(|imgs| pick_variant(imgs, variant));
        if let (Some(back), Some(images)) = (back, output.images.as_mut()) {
            images.back = Some(back.to_string());
        }

        output.card_faces = Some(
            faces
                .iter()
                .map(|face| OutputFace {
                    name: face.name.clone(),
                    oracle_text: face.oracle_text.clone(),
                })
                .collect(),
        );
    }

    if let Some(img) = replacement {
        output.set_front_image(img);
    }

    Ok(output)
}

fn pick_variant<'a>(images: &'a ImageUris, variant: &str) -> Option<&'a str> {
    images.get(variant).map(|url| url.as_str())
}

// ============================================================================
// TESTS
// ============================================================================
