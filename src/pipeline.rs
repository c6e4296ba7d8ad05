// 🏭 Card Pipeline - Backfill → Filter → Project → Correct
// One pass over the catalog; every record ends up kept, rejected or skipped

use crate::backfill::{add_identifier, BackfillIndex};
use crate::card::{OutputRecord, SourceRecord};
use crate::config::PipelineConfig;
use crate::corrections::CorrectionTable;
use crate::filter::{filter_record, RejectReason};
use crate::projection::{project, ImageOverrides, ProjectionError};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

// ============================================================================
// PER-RECORD OUTCOME
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Kept {
        card: OutputRecord,
        backfilled: bool,
    },

    /// Filtered out by an eligibility check (normal, not an error)
    Rejected { label: String, reason: RejectReason },

    /// Malformed record; skipped without aborting the run
    Skipped { label: String, error: ProjectionError },
}

impl RecordOutcome {
    pub fn is_kept(&self) -> bool {
        matches!(self, RecordOutcome::Kept { .. })
    }
}

/// A record skipped during projection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub label: String,
    pub stage: String,
    pub reason: String,
}

// ============================================================================
// PIPELINE REPORT
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub cards: Vec<OutputRecord>,
    pub total_records: usize,
    pub backfilled: usize,
    pub corrected: usize,
    pub rejected: BTreeMap<RejectReason, usize>,
    pub skipped: Vec<SkippedRecord>,
}

impl PipelineReport {
    pub fn rejected_count(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} records: {} kept ({} backfilled, {} corrected), {} rejected, {} skipped",
            self.total_records,
            self.cards.len(),
            self.backfilled,
            self.corrected,
            self.rejected_count(),
            self.skipped.len()
        )
    }

    fn record(&mut self, outcome: RecordOutcome, corrected: bool) {
        self.total_records += 1;
        match outcome {
            RecordOutcome::Kept { card, backfilled } => {
                if backfilled {
                    self.backfilled += 1;
                }
                if corrected {
                    self.corrected += 1;
                }
                self.cards.push(card);
            }
            RecordOutcome::Rejected { reason, .. } => {
                *self.rejected.entry(reason).or_insert(0) += 1;
            }
            RecordOutcome::Skipped { label, error } => {
                self.skipped.push(SkippedRecord {
                    label,
                    stage: "projection".to_string(),
                    reason: error.to_string(),
                });
            }
        }
    }

    /// Concatenate two partial reports (order of cards not preserved)
    fn merge(mut self, other: PipelineReport) -> PipelineReport {
        self.cards.extend(other.cards);
        self.total_records += other.total_records;
        self.backfilled += other.backfilled;
        self.corrected += other.corrected;
        for (reason, count) in other.rejected {
            *self.rejected.entry(reason).or_insert(0) += count;
        }
        self.skipped.extend(other.skipped);
        self
    }
}

// ============================================================================
// CARD PIPELINE
// ============================================================================

/// Stage wiring over injected, read-only tables
pub struct CardPipeline<'a> {
    config: &'a PipelineConfig,
    index: &'a BackfillIndex,
    overrides: &'a ImageOverrides,
    corrections: &'a CorrectionTable,
}

impl<'a> CardPipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        index: &'a BackfillIndex,
        overrides: &'a ImageOverrides,
        corrections: &'a CorrectionTable,
    ) -> Self {
        CardPipeline {
            config,
            index,
            overrides,
            corrections,
        }
    }

    /// Run one record through every stage
    pub fn process(&self, record: SourceRecord) -> RecordOutcome {
        self.process_tracked(record).0
    }

    fn process_tracked(&self, mut record: SourceRecord) -> (RecordOutcome, bool) {
        let backfilled = record.arena_id.is_none()
            && self.config.is_set_exception(&record.set)
            && add_identifier(&mut record, self.index);

        if let Err(reason) = filter_record(&record, self.config) {
            debug!(card = %record.label(), %reason, "rejected");
            return (
                RecordOutcome::Rejected {
                    label: record.label(),
                    reason,
                },
                false,
            );
        }

        let mut card = match project(&record, self.config, self.overrides) {
            Ok(card) => card,
            Err(error) => {
                warn!(card = %record.label(), %error, "unable to process card, skipping");
                return (
                    RecordOutcome::Skipped {
                        label: record.label(),
                        error,
                    },
                    false,
                );
            }
        };

        let corrected = self.corrections.apply(&mut card);

        (RecordOutcome::Kept { card, backfilled }, corrected)
    }

    /// Process the whole catalog in input order
    pub fn run(&self, records: Vec<SourceRecord>) -> PipelineReport {
        let mut report = PipelineReport::default();

        for record in records {
            let (outcome, corrected) = self.process_tracked(record);
            report.record(outcome, corrected);
        }

        info!("{}", report.summary());
        report
    }

    /// Same as `run`, spread across the rayon pool. Output order is not kept.
    pub fn run_parallel(&self, records: Vec<SourceRecord>) -> PipelineReport {
        let report = records
            .into_par_iter()
            .fold(PipelineReport::default, |mut report, record| {
                let (outcome, corrected) = self.process_tracked(record);
                report.record(outcome, corrected);
                report
            })
            .reduce(PipelineReport::default, PipelineReport::merge);

        info!("{}", report.summary());
        report
    }
}

// ============================================================================
// TESTS
// ============================================================================
