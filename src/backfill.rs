// 🔗 Identifier Backfill - Cross-reference client data to fill missing platform ids
// Two lookup paths:
//   1. Multi-origin sets: name-only search over a union of datasets
//   2. Everything else: (name, collector number, set) composite key

use crate::card::{SecondaryRecord, SourceRecord};
use crate::config::{ConfigConflict, PipelineConfig};
use anyhow::{Context as AnyhowContext, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

// ============================================================================
// SECONDARY DATASETS
// ============================================================================

/// Named datasets extracted from the game client, one per set code
#[derive(Debug, Clone, Default)]
pub struct SecondaryDatasets {
    datasets: BTreeMap<String, Vec<SecondaryRecord>>,
}

impl SecondaryDatasets {
    pub fn new() -> Self {
        SecondaryDatasets::default()
    }

    /// Add (or replace) a named dataset
    pub fn insert(&mut self, name: &str, records: Vec<SecondaryRecord>) {
        self.datasets.insert(name.to_string(), records);
    }

    /// Load every `<name>.json` file in a directory. The file stem names the dataset.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut datasets = SecondaryDatasets::new();

        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read secondary data directory: {}", dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
            let records: Vec<SecondaryRecord> = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse dataset: {}", path.display()))?;

            debug!(dataset = name, records = records.len(), "loaded secondary dataset");
            datasets.insert(&name.to_lowercase(), records);
        }

        Ok(datasets)
    }

    pub fn get(&self, name: &str) -> Option<&[SecondaryRecord]> {
        self.datasets.get(name).map(|records| records.as_slice())
    }

    /// Dataset names in iteration order
    pub fn names(&self) -> Vec<&str> {
        self.datasets.keys().map(|k| k.as_str()).collect()
    }

    /// All records of all datasets, in dataset order
    pub fn iter_all(&self) -> impl Iterator<Item = &SecondaryRecord> {
        self.datasets.values().flatten()
    }

    pub fn record_count(&self) -> usize {
        self.datasets.values().map(|records| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

// ============================================================================
// BACKFILL INDEX
// ============================================================================

type CompositeKey = (String, String, String);

/// A platform id and the position of its record in scan order
#[derive(Debug, Clone, Copy, PartialEq)]
struct Hit {
    position: usize,
    arena_id: u32,
}

/// Of a primary-name hit and a first-face hit, the one scanned first
fn earliest(by_name: Option<Hit>, by_face: Option<Hit>) -> Option<u32> {
    by_name
        .into_iter()
        .chain(by_face)
        .min_by_key(|hit| hit.position)
        .map(|hit| hit.arena_id)
}

/// Precomputed first-match-wins lookups over the secondary datasets.
///
/// Built once per run. Later entries that collide with an earlier key are
/// ignored for lookup and recorded as conflicts when their id differs.
/// Each entry remembers where it was scanned, so a record matching by both
/// its own name and its first face name gets whichever came first.
#[derive(Debug, Default)]
pub struct BackfillIndex {
    /// Union set code → name → platform id
    unions: HashMap<String, HashMap<String, Hit>>,

    /// (name, collector number, set) → platform id
    composite: HashMap<CompositeKey, Hit>,

    conflicts: Vec<ConfigConflict>,
}

impl BackfillIndex {
    pub fn build(datasets: &SecondaryDatasets, config: &PipelineConfig) -> Self {
        let mut index = BackfillIndex::default();

        for (set, sources) in &config.secondary_unions {
            let mut by_name: HashMap<String, Hit> = HashMap::new();
            let mut position = 0;

            for source in sources {
                let Some(records) = datasets.get(source) else {
                    index.conflicts.push(ConfigConflict::new(
                        "secondary_unions",
                        set,
                        &format!("dataset '{}' was not loaded", source),
                    ));
                    continue;
                };

                for record in records {
                    position += 1;
                    match by_name.get(&record.name).map(|hit| hit.arena_id) {
                        Some(existing) if existing != record.arena_id => {
                            index.conflicts.push(ConfigConflict::new(
                                "secondary_unions",
                                &format!("{} [{}]", record.name, set),
                                &format!("ids {} and {} share a name", existing, record.arena_id),
                            ));
                        }
                        Some(_) => {}
                        None => {
                            by_name.insert(
                                record.name.clone(),
                                Hit {
                                    position,
                                    arena_id: record.arena_id,
                                },
                            );
                        }
                    }
                }
            }

            index.unions.insert(set.clone(), by_name);
        }

        for (position, record) in datasets.iter_all().enumerate() {
            let key = (
                record.name.clone(),
                record.collector_number.clone(),
                record.set.clone(),
            );
            match index.composite.get(&key).map(|hit| hit.arena_id) {
                Some(existing) if existing != record.arena_id => {
                    index.conflicts.push(ConfigConflict::new(
                        "secondary_datasets",
                        &format!("{} [{} #{}]", record.name, record.set, record.collector_number),
                        &format!("ids {} and {} share a key", existing, record.arena_id),
                    ));
                }
                Some(_) => {}
                None => {
                    index.composite.insert(
                        key,
                        Hit {
                            position,
                            arena_id: record.arena_id,
                        },
                    );
                }
            }
        }

        for conflict in &index.conflicts {
            warn!(%conflict, "secondary data conflict (first entry wins)");
        }

        index
    }

    pub fn conflicts(&self) -> &[ConfigConflict] {
        &self.conflicts
    }

    /// Find a platform id for a record without mutating it
    pub fn lookup(&self, record: &SourceRecord) -> Option<u32> {
        let face = record.first_face_name().filter(|_| record.is_multi_faced());

        if let Some(by_name) = self.unions.get(&record.set) {
            // Collector numbers and set codes are not join keys across the union
            return earliest(
                by_name.get(&record.name).copied(),
                face.and_then(|face| by_name.get(face).copied()),
            );
        }

        let composite = |name: &str| {
            let key = (
                name.to_string(),
                record.collector_number.clone(),
                record.set.clone(),
            );
            self.composite.get(&key).copied()
        };
        earliest(composite(&record.name), face.and_then(composite))
    }
}

/// Fill in a missing platform id from the secondary data.
///
/// Returns true if an id was assigned. Records that already carry an id,
/// and records with no match, are left untouched and return false.
pub fn add_identifier(record: &mut SourceRecord, index: &BackfillIndex) -> bool {
    if record.arena_id.is_some() {
        return false;
    }

    match index.lookup(record) {
        Some(id) => {
            debug!(card = %record.name, set = %record.set, arena_id = id, "backfilled platform id");
            record.arena_id = Some(id);
            true
        }
        None => false,
    }
}

// ============================================================================
// TESTS
// ============================================================================
