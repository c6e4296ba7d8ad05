// 🔍 Client Data Extractor - Pull platform ids straight from the game files
// data_cards (card definitions) + data_loc (localized strings) → SecondaryRecords

use crate::card::SecondaryRecord;
use anyhow::{Context as AnyhowContext, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum ExtractError {
    #[error("localization file has no language entries")]
    EmptyLocalization,

    #[error("no cards found for set '{0}'")]
    NoCardsFound(String),
}

// ============================================================================
// CLIENT FILE SHAPES
// ============================================================================

/// One card definition from `data_cards`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCard {
    pub grpid: u32,
    pub title_id: u32,
    #[serde(default)]
    pub collector_number: String,
    #[serde(default)]
    pub set: String,
    #[serde(default)]
    pub is_token: bool,
    #[serde(default)]
    pub is_secondary_card: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalizedText {
    pub id: u32,
    pub text: String,
}

/// One language block from `data_loc`; the first block is English
#[derive(Debug, Clone, Deserialize)]
pub struct LocalizationTable {
    #[serde(default, rename = "isoCode")]
    pub iso_code: Option<String>,
    pub keys: Vec<LocalizedText>,
}

// ============================================================================
// EXTRACTOR
// ============================================================================

pub struct ClientDataExtractor {
    cards: Vec<ClientCard>,
    titles: HashMap<u32, String>,
}

impl ClientDataExtractor {
    /// Build from parsed client data. Titles come from the first language block.
    pub fn new(cards: Vec<ClientCard>, localization: Vec<LocalizationTable>) -> Result<Self, ExtractError> {
        let english = localization
            .into_iter()
            .next()
            .ok_or(ExtractError::EmptyLocalization)?;

        let mut titles = HashMap::new();
        for entry in english.keys {
            titles.entry(entry.id).or_insert(entry.text);
        }

        Ok(ClientDataExtractor { cards, titles })
    }

    /// Load `data_cards` and `data_loc` JSON exports
    pub fn from_files(data_cards: &Path, data_loc: &Path) -> Result<Self> {
        let content = fs::read_to_string(data_cards)
            .with_context(|| format!("Failed to read card data: {}", data_cards.display()))?;
        let cards: Vec<ClientCard> =
            serde_json::from_str(&content).context("Failed to parse card data JSON")?;

        let content = fs::read_to_string(data_loc)
            .with_context(|| format!("Failed to read localization data: {}", data_loc.display()))?;
        let localization: Vec<LocalizationTable> =
            serde_json::from_str(&content).context("Failed to parse localization JSON")?;

        Ok(ClientDataExtractor::new(cards, localization)?)
    }

    pub fn title(&self, title_id: u32) -> Option<&str> {
        self.titles.get(&title_id).map(|t| t.as_str())
    }

    /// Every primary, non-token card of a set (set code is case-insensitive)
    pub fn extract_set(&self, set: &str) -> Result<Vec<SecondaryRecord>, ExtractError> {
        let wanted = set.to_uppercase();
        let mut records = Vec::new();

        for card in self.cards.iter().filter(|c| c.set.to_uppercase() == wanted) {
            if card.is_token || card.is_secondary_card {
                continue;
            }

            let Some(name) = self.title(card.title_id) else {
                warn!(grpid = card.grpid, title_id = card.title_id, "card title missing from localization");
                continue;
            };

            records.push(SecondaryRecord {
                arena_id: card.grpid,
                name: name.to_string(),
                collector_number: card.collector_number.clone(),
                set: card.set.to_lowercase(),
            });
        }

        debug!(set = %set, cards = records.len(), "extracted client cards");

        if records.is_empty() {
            return Err(ExtractError::NoCardsFound(set.to_lowercase()));
        }
        Ok(records)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_extractor() -> ClientDataExtractor {
        let cards: Vec<ClientCard> = serde_json::from_str(
            r#"[
                {"grpid": 79400, "titleId": 1, "collectorNumber": "44", "set": "MID"},
                {"grpid": 79401, "titleId": 2, "collectorNumber": "47", "set": "MID"},
                {"grpid": 79402, "titleId": 3, "collectorNumber": "47", "set": "MID", "isSecondaryCard": true},
                {"grpid": 79403, "titleId": 4, "collectorNumber": "1", "set": "MID", "isToken": true},
                {"grpid": 79404, "titleId": 99, "collectorNumber": "50", "set": "MID"},
                {"grpid": 80000, "titleId": 5, "collectorNumber": "1", "set": "VOW"}
            ]"#,
        )
        .unwrap();

        let localization: Vec<LocalizationTable> = serde_json::from_str(
            r#"[
                {"isoCode": "en-US", "keys": [
                    {"id": 1, "text": "Consider"},
                    {"id": 2, "text": "Delver of Secrets"},
                    {"id": 3, "text": "Insectile Aberration"},
                    {"id": 4, "text": "Zombie"},
                    {"id": 5, "text": "Cemetery Gatekeeper"}
                ]},
                {"isoCode": "de-DE", "keys": [{"id": 1, "text": "Erwägen"}]}
            ]"#,
        )
        .unwrap();

        ClientDataExtractor::new(cards, localization).unwrap()
    }

    #[test]
    fn test_extract_set_skips_tokens_and_secondary_cards() {
        let extractor = create_extractor();

        let records = extractor.extract_set("mid").unwrap();

        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Consider", "Delver of Secrets"]);
        assert!(records.iter().all(|r| r.set == "mid"));
        assert_eq!(records[0].arena_id, 79400);
        assert_eq!(records[1].collector_number, "47");
    }

    #[test]
    fn test_english_titles_used() {
        let extractor = create_extractor();

        assert_eq!(extractor.title(1), Some("Consider"));
    }

    #[test]
    fn test_unknown_set_is_error() {
        let extractor = create_extractor();

        assert_eq!(
            extractor.extract_set("xyz"),
            Err(ExtractError::NoCardsFound("xyz".to_string()))
        );
    }

    #[test]
    fn test_empty_localization_rejected() {
        let result = ClientDataExtractor::new(Vec::new(), Vec::new());

        assert!(matches!(result, Err(ExtractError::EmptyLocalization)));
    }
}
