// ⚙️ Pipeline Configuration - Override tables as data
// Allow-lists, exclusion lists, image replacements and corrections.
// Built-in defaults live here; a JSON file can override any section.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::fs;
use std::path::Path;

// ============================================================================
// TABLE ENTRY TYPES
// ============================================================================

/// Field-level patch applied to a projected card. `None` = leave alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collector_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booster: Option<bool>,
}

impl CardPatch {
    pub fn relocate(set: &str, collector_number: &str) -> Self {
        CardPatch {
            set: Some(set.to_string()),
            collector_number: Some(collector_number.to_string()),
            booster: None,
        }
    }
}

/// Rewrite applied to every card of a set (e.g. client-only set codes)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetCorrection {
    pub set: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename_to: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub booster: Option<bool>,
}

/// Replacement front image keyed by platform id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReplacement {
    #[serde(rename = "arenaId")]
    pub arena_id: u32,
    pub img: String,
}

/// Replacement front image for cards without a platform id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraReplacement {
    pub name: String,
    pub set: String,
    pub img: String,
}

// ============================================================================
// CONFLICTS
// ============================================================================

/// Two entries of a table disagree for the same key.
/// First entry wins at lookup time; conflicts are reported, not resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigConflict {
    pub table: String,
    pub key: String,
    pub message: String,
}

impl ConfigConflict {
    pub fn new(table: &str, key: &str, message: &str) -> Self {
        ConfigConflict {
            table: table.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for ConfigConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.table, self.key, self.message)
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

/// Every override table and setting the pipeline consults.
///
/// Loaded once, then passed by reference into each stage; never mutated
/// during a run. Missing sections in a config file fall back to the
/// built-in defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Only this language survives the filter
    pub primary_language: String,

    /// Sets included even without a provider id (backfill runs for these),
    /// each with the names known to be wrongly included
    pub set_exceptions: BTreeMap<String, Vec<String>>,

    /// Multi-origin sets: set code → secondary datasets searched by name only
    pub secondary_unions: BTreeMap<String, Vec<String>>,

    /// Known duplicate/erroneous platform ids
    pub problem_ids: BTreeSet<u32>,

    /// Set code → collector numbers to drop (duplicate basic land arts, ...)
    pub collector_exclusions: BTreeMap<String, Vec<String>>,

    /// Every variant of this set is a distinct game object
    pub keep_all_variants_set: String,

    /// Every card of this set is dropped
    pub drop_promos_set: String,

    pub undesirable_promo_types: Vec<String>,

    /// Legality formats copied into the output
    pub recognized_formats: Vec<String>,

    /// Provider image variant used for imgs.front / imgs.back
    pub image_variant: String,

    pub replacement_images: Vec<ImageReplacement>,
    pub extra_replacements: Vec<ExtraReplacement>,

    pub set_corrections: Vec<SetCorrection>,
    pub corrections: BTreeMap<u32, CardPatch>,
}

impl PipelineConfig {
    /// Load config from a JSON file (missing sections use defaults)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let config: PipelineConfig =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        Ok(config)
    }

    /// Is this set allowed in without a provider id?
    pub fn is_set_exception(&self, set: &str) -> bool {
        self.set_exceptions.contains_key(set)
    }

    /// Names hand-picked for exclusion within an allow-listed set
    pub fn is_excluded_name(&self, set: &str, name: &str) -> bool {
        self.set_exceptions
            .get(set)
            .map_or(false, |names| names.iter().any(|n| n == name))
    }

    pub fn is_excluded_collector_number(&self, set: &str, collector_number: &str) -> bool {
        self.collector_exclusions
            .get(set)
            .map_or(false, |numbers| numbers.iter().any(|n| n == collector_number))
    }

    pub fn is_undesirable_promo(&self, promo_type: &str) -> bool {
        self.undesirable_promo_types.iter().any(|p| p == promo_type)
    }

    /// Check tables for keys that map to conflicting values
    pub fn validate(&self) -> Vec<ConfigConflict> {
        let mut conflicts = Vec::new();

        let mut by_id: HashMap<u32, &str> = HashMap::new();
        for replacement in &self.replacement_images {
            match by_id.get(&replacement.arena_id) {
                Some(existing) if *existing != replacement.img => {
                    conflicts.push(ConfigConflict::new(
                        "replacement_images",
                        &replacement.arena_id.to_string(),
                        &format!("conflicting images: {} vs {}", existing, replacement.img),
                    ));
                }
                Some(_) => {}
                None => {
                    by_id.insert(replacement.arena_id, &replacement.img);
                }
            }
        }

        let mut by_name_set: HashMap<(&str, &str), &str> = HashMap::new();
        for extra in &self.extra_replacements {
            let key = (extra.name.as_str(), extra.set.as_str());
            match by_name_set.get(&key) {
                Some(existing) if *existing != extra.img => {
                    conflicts.push(ConfigConflict::new(
                        "extra_replacements",
                        &format!("{} [{}]", extra.name, extra.set),
                        &format!("conflicting images: {} vs {}", existing, extra.img),
                    ));
                }
                Some(_) => {}
                None => {
                    by_name_set.insert(key, &extra.img);
                }
            }
        }

        // Backfill only runs for allow-listed sets, so a union elsewhere is dead
        for set in self.secondary_unions.keys() {
            if !self.is_set_exception(set) {
                conflicts.push(ConfigConflict::new(
                    "secondary_unions",
                    set,
                    "set is not in set_exceptions; its union is never searched",
                ));
            }
        }

        let mut seen_sets = BTreeSet::new();
        for correction in &self.set_corrections {
            if !seen_sets.insert(correction.set.as_str()) {
                conflicts.push(ConfigConflict::new(
                    "set_corrections",
                    &correction.set,
                    "set listed more than once",
                ));
            }
        }

        for correction in &self.set_corrections {
            if let Some(target) = &correction.rename_to {
                if target != &correction.set && seen_sets.contains(target.as_str()) {
                    conflicts.push(ConfigConflict::new(
                        "set_corrections",
                        &correction.set,
                        &format!("renamed to {}, which is itself corrected", target),
                    ));
                }
            }
        }

        conflicts
    }
}

// ============================================================================
// BUILT-IN TABLES
// ============================================================================

/// Wrongly included cards within the j21 allow-list
const J21_EXCLUDED_NAMES: &[&str] = &[
    "Lightning Bolt",
    "Duress",
    "Fog",
    "Giant Growth",
    "Kraken Hatchling",
    "Light of Hope",
    "Ponder",
    "Regal Force",
    "Reassembling Skeleton",
    "Dark Ritual",
    "Shivan Dragon",
    "Stormfront Pegasus",
    "Force Spike",
    "Swords to Plowshares",
    "Assault Strobe",
    "Tropical Island",
];

/// Realmwalker/Orah buy-a-box promos and the phantom Reflections of Littjara art
const PROBLEM_IDS: &[u32] = &[75382, 75910, 75381, 77382];

const COLLECTOR_EXCLUSIONS: &[(&str, &[&str])] = &[
    ("mid", &["386", "385"]),
    // Duplicate basic land arts
    ("pana", &["249", "252", "253", "248", "250", "251", "255", "254", "247", "246"]),
    ("neo", &["507"]),
    ("stx", &["376"]),
    ("snc", &["461"]),
];

/// (platform id, set, collector number) for brawl exclusives and land reprints
const RELOCATIONS: &[(u32, &str, &str)] = &[
    // Brawl exclusives
    (29535, "shm", "237"),
    (49077, "m13", "72"),
    (63081, "soi", "245"),
    (18674, "scg", "136"),
    (48499, "inv", "249"),
    // BFZ lands
    (62115, "bfz", "250"),
    (62125, "bfz", "255"),
    (62135, "bfz", "260"),
    (62145, "bfz", "265"),
    (62155, "bfz", "270"),
    // RTR lands (Island's id in the client is wrong, left out)
    (51789, "rtr", "250"),
    (51809, "rtr", "260"),
    (51819, "rtr", "265"),
    (51829, "rtr", "270"),
    // AKH lands
    (65363, "akh", "256"),
    (65369, "akh", "258"),
    (65379, "akh", "262"),
    (65385, "akh", "264"),
    (65393, "akh", "267"),
    // MIR lands
    (7193, "mir", "331"),
    (7065, "mir", "336"),
    (7347, "mir", "340"),
    (7153, "mir", "346"),
    (6993, "mir", "347"),
    // ROE lands
    (36786, "roe", "229"),
    (36818, "roe", "235"),
    (36812, "roe", "237"),
    (36788, "roe", "242"),
    (36802, "roe", "245"),
    // UND lands
    (73136, "und", "87"),
    (73137, "und", "89"),
    (73138, "und", "91"),
    (73139, "und", "93"),
    // UND full art lands
    (73141, "und", "88"),
    (73142, "und", "90"),
    (73143, "und", "92"),
    (73144, "und", "94"),
    // Godzilla lands
    (73644, "sld", "63"),
    (73645, "sld", "64"),
    (73646, "sld", "65"),
    (73647, "sld", "66"),
    (73648, "sld", "67"),
    // UST full art John Avon lands
    (75021, "ust", "212"),
    (75022, "ust", "213"),
    (75023, "ust", "214"),
    (75024, "ust", "215"),
    (75025, "ust", "216"),
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut set_exceptions = BTreeMap::new();
        set_exceptions.insert("j21".to_string(), strings(J21_EXCLUDED_NAMES));
        set_exceptions.insert("mid".to_string(), Vec::new());
        set_exceptions.insert("ana".to_string(), Vec::new());
        set_exceptions.insert("vow".to_string(), Vec::new());

        // j21 reprints cards from mh1/mh2 with reused collector numbers
        let mut secondary_unions = BTreeMap::new();
        secondary_unions.insert("j21".to_string(), strings(&["j21", "mh1", "mh2"]));

        let collector_exclusions = COLLECTOR_EXCLUSIONS
            .iter()
            .map(|(set, numbers)| (set.to_string(), strings(numbers)))
            .collect();

        let corrections = RELOCATIONS
            .iter()
            .map(|(id, set, number)| (*id, CardPatch::relocate(set, number)))
            .collect();

        PipelineConfig {
            primary_language: "en".to_string(),
            set_exceptions,
            secondary_unions,
            problem_ids: PROBLEM_IDS.iter().copied().collect(),
            collector_exclusions,
            keep_all_variants_set: "sta".to_string(),
            drop_promos_set: "pdom".to_string(),
            undesirable_promo_types: strings(&["boosterfun", "promopack"]),
            recognized_formats: strings(&["standard", "historic", "brawl", "historicbrawl", "future"]),
            image_variant: "border_crop".to_string(),
            replacement_images: Vec::new(),
            extra_replacements: vec![ExtraReplacement {
                name: "Fast // Furious".to_string(),
                set: "j21".to_string(),
                img: "https://c1.scryfall.com/file/scryfall-cards/border_crop/front/5/b/5b209759-6215-49e8-a6a0-a6c94040adb2.jpg?1629231952".to_string(),
            }],
            set_corrections: vec![
                // Arena-exclusive jumpstart cards belong to jumpstart proper
                SetCorrection {
                    set: "ajmp".to_string(),
                    rename_to: Some("jmp".to_string()),
                    booster: Some(true),
                },
                SetCorrection {
                    set: "sta".to_string(),
                    rename_to: None,
                    booster: Some(true),
                },
            ],
            corrections,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
