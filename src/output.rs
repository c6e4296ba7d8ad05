// 💾 Output - Catalog loading, timestamped dataset files, run manifest, skip report

use crate::card::{OutputRecord, SourceRecord};
use crate::pipeline::{PipelineReport, SkippedRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// INPUT
// ============================================================================

/// Load the provider's bulk catalog. Absent or unparseable input is fatal.
pub fn load_catalog(path: &Path) -> Result<Vec<SourceRecord>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;

    let records: Vec<SourceRecord> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse catalog JSON: {}", path.display()))?;

    Ok(records)
}

// ============================================================================
// RUN MANIFEST
// ============================================================================

/// Metadata describing one written dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    /// RFC3339
    pub created_at: String,
    pub file_name: String,
    pub card_count: usize,
    pub rejected_count: usize,
    pub skipped_count: usize,
    /// SHA256 of the written file (hex)
    pub checksum: String,
}

impl RunManifest {
    pub fn summary(&self) -> String {
        format!(
            "{} → {} cards ({} rejected, {} skipped), sha256 {}",
            self.file_name,
            self.card_count,
            self.rejected_count,
            self.skipped_count,
            &self.checksum[..12.min(self.checksum.len())]
        )
    }
}

/// `<prefix>YYYYMMDDHHMMSS.json`, in UTC
pub fn output_file_name(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{}{}.json", prefix, now.format("%Y%m%d%H%M%S"))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// WRITERS
// ============================================================================

/// Write the card array to a timestamped file in `out_dir`
pub fn write_cards(out_dir: &Path, report: &PipelineReport) -> Result<(PathBuf, RunManifest)> {
    write_cards_at(out_dir, report, Utc::now())
}

pub fn write_cards_at(
    out_dir: &Path,
    report: &PipelineReport,
    now: DateTime<Utc>,
) -> Result<(PathBuf, RunManifest)> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create output directory: {}", out_dir.display()))?;

    let file_name = output_file_name("arenaCards", now);
    let path = out_dir.join(&file_name);

    let bytes = serialize_cards(&report.cards)?;
    fs::write(&path, &bytes).with_context(|| format!("Failed to write: {}", path.display()))?;

    let manifest = RunManifest {
        run_id: uuid::Uuid::new_v4().to_string(),
        created_at: now.to_rfc3339(),
        file_name,
        card_count: report.cards.len(),
        rejected_count: report.rejected_count(),
        skipped_count: report.skipped.len(),
        checksum: sha256_hex(&bytes),
    };

    Ok((path, manifest))
}

fn serialize_cards(cards: &[OutputRecord]) -> Result<Vec<u8>> {
    serde_json::to_vec(cards).context("Failed to serialize cards")
}

/// Pretty-printed JSON for anything serializable (manifests, lookups, extracts)
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write: {}", path.display()))?;
    Ok(())
}

pub fn write_manifest(path: &Path, manifest: &RunManifest) -> Result<()> {
    write_json(path, manifest)
}

/// CSV with one row per skipped record: label, stage, reason
pub fn write_skip_report(path: &Path, skipped: &[SkippedRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create skip report: {}", path.display()))?;

    for skip in skipped {
        writer.serialize(skip).context("Failed to write skip report row")?;
    }

    writer.flush().context("Failed to flush skip report")?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn create_report() -> PipelineReport {
        let mut report = PipelineReport::default();
        report.cards.push(OutputRecord {
            arena_id: Some(1),
            name: "Opt".to_string(),
            ..Default::default()
        });
        report.total_records = 2;
        report.skipped.push(SkippedRecord {
            label: "Broken // Card (khm #50, id 11)".to_string(),
            stage: "projection".to_string(),
            reason: "no top-level images".to_string(),
        });
        report
    }

    #[test]
    fn test_output_file_name_format() {
        let now = Utc.with_ymd_and_hms(2021, 4, 12, 9, 3, 13).unwrap();

        assert_eq!(output_file_name("arenaCards", now), "arenaCards20210412090313.json");
    }

    #[test]
    fn test_write_cards_manifest_matches_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2022, 10, 19, 9, 4, 57).unwrap();

        let (path, manifest) = write_cards_at(dir.path(), &create_report(), now).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(manifest.checksum, sha256_hex(&bytes));
        assert_eq!(manifest.card_count, 1);
        assert_eq!(manifest.skipped_count, 1);
        assert_eq!(manifest.file_name, "arenaCards20221019090457.json");

        let cards: Vec<OutputRecord> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(cards[0].name, "Opt");
    }

    #[test]
    fn test_skip_report_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skipped.csv");

        write_skip_report(&path, &create_report().skipped).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("label,stage,reason"));
        assert!(lines.next().unwrap().contains("projection"));
    }

    #[test]
    fn test_load_catalog_errors() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{\"not\": \"an array\"}").unwrap();

        assert!(load_catalog(&bad).is_err());
        assert!(load_catalog(&dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn test_load_catalog_reads_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default-cards.json");
        fs::write(&path, r#"[{"name": "Opt", "set": "dom", "collector_number": "60"}]"#).unwrap();

        let records = load_catalog(&path).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].set, "dom");
    }
}
