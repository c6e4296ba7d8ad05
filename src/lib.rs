// Arena Card Prep - Core Library
// Card preprocessing pipeline + draft reward simulator, shared by the CLI and tests

pub mod card;
pub mod config;
pub mod backfill;
pub mod filter;
pub mod projection;
pub mod corrections;
pub mod pipeline;
pub mod output;
pub mod extractor;
pub mod simulator;

#[cfg(feature = "cli")]
pub mod logging;

// Re-export commonly used types
pub use card::{
    CardFace, CardImages, ImageUris, OutputFace, OutputRecord, SecondaryRecord, SourceRecord,
};
pub use config::{
    CardPatch, ConfigConflict, ExtraReplacement, ImageReplacement, PipelineConfig, SetCorrection,
};
pub use backfill::{add_identifier, BackfillIndex, SecondaryDatasets};
pub use filter::{filter_record, is_canonical_collector_number, RejectReason};
pub use projection::{project, ImageOverrides, ProjectionError};
pub use corrections::{apply_corrections, apply_patch, CorrectionTable};
pub use pipeline::{CardPipeline, PipelineReport, RecordOutcome, SkippedRecord};
pub use output::{
    load_catalog, output_file_name, write_cards, write_json, write_manifest, write_skip_report,
    RunManifest,
};
pub use extractor::{ClientCard, ClientDataExtractor, ExtractError, LocalizationTable};
pub use simulator::{
    expected_rewards, simulate_event, sweep, EntryFee, EventFormat, EventOutcome, ExpectedReward,
    RewardTier, SimulatorError,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
