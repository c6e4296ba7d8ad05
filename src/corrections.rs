// 🩹 Correction Application - Patch known-bad entries after projection
// Set-level rewrites first, then the platform-id keyed table (which always wins)

use crate::card::OutputRecord;
use crate::config::{CardPatch, PipelineConfig, SetCorrection};
use std::collections::{HashMap, HashSet};
use tracing::warn;

pub struct CorrectionTable {
    by_set: HashMap<String, SetCorrection>,
    by_id: HashMap<u32, CardPatch>,
}

impl CorrectionTable {
    /// Chained renames (`a → b`, `b → c`) are collapsed to their final set so
    /// that a second pass over a corrected card changes nothing.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut first: HashMap<&str, &SetCorrection> = HashMap::new();
        for correction in &config.set_corrections {
            first.entry(correction.set.as_str()).or_insert(correction);
        }

        let by_set = first
            .keys()
            .map(|set| (set.to_string(), resolve_chain(set, &first)))
            .collect();

        CorrectionTable {
            by_set,
            by_id: config
                .corrections
                .iter()
                .map(|(id, patch)| (*id, patch.clone()))
                .collect(),
        }
    }

    /// Number of id-keyed and set-level entries
    pub fn len(&self) -> usize {
        self.by_id.len() + self.by_set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply every matching correction. Returns true if anything matched.
    ///
    /// Field-level overwrite only; never removes a field. Applying twice is
    /// the same as applying once.
    pub fn apply(&self, card: &mut OutputRecord) -> bool {
        let mut matched = false;

        let set_correction = card.set.as_ref().and_then(|set| self.by_set.get(set));
        if let Some(correction) = set_correction {
            if let Some(rename) = &correction.rename_to {
                card.set = Some(rename.clone());
            }
            if let Some(booster) = correction.booster {
                card.booster = Some(booster);
            }
            matched = true;
        }

        if let Some(patch) = card.arena_id.and_then(|id| self.by_id.get(&id)) {
            apply_patch(card, patch);
            matched = true;
        }

        matched
    }
}

/// Follow `rename_to` from `start` until it leaves the table. The booster flag
/// is the last one set along the way. A cycle keeps the set where it is.
fn resolve_chain(start: &str, table: &HashMap<&str, &SetCorrection>) -> SetCorrection {
    let mut visited = HashSet::new();
    let mut current = start;
    let mut booster = None;

    while let Some(correction) = table.get(current) {
        if !visited.insert(current) {
            warn!(set = start, "set corrections form a rename cycle; rename ignored");
            return SetCorrection {
                set: start.to_string(),
                rename_to: None,
                booster: table.get(start).and_then(|c| c.booster),
            };
        }
        booster = correction.booster.or(booster);
        match correction.rename_to.as_deref() {
            Some(next) if next != current => current = next,
            _ => break,
        }
    }

    SetCorrection {
        set: start.to_string(),
        rename_to: (current != start).then(|| current.to_string()),
        booster,
    }
}

/// Overwrite each field named in the patch
pub fn apply_patch(card: &mut OutputRecord, patch: &CardPatch) {
    if let Some(set) = &patch.set {
        card.set = Some(set.clone());
    }
    if let Some(collector_number) = &patch.collector_number {
        card.collector_number = Some(collector_number.clone());
    }
    if let Some(booster) = patch.booster {
        card.booster = Some(booster);
    }
}

/// Look up and apply the id-keyed and set-level corrections for one card
pub fn apply_corrections(card: &mut OutputRecord, table: &CorrectionTable) -> bool {
    table.apply(card)
}

// ============================================================================
// TESTS
// ============================================================================
