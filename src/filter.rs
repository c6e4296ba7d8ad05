// 🚦 Eligibility Filter - Decide which catalog records belong in the client dataset
// Ten ordered checks, first rejection wins

use crate::card::SourceRecord;
use crate::config::PipelineConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical half of a meld pair: three digits then "a"
static MELD_FRONT_HALF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3}a$").unwrap());

// ============================================================================
// REJECT REASON
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RejectReason {
    /// No platform id and the set is not allow-listed
    MissingPlatformId,

    /// Allow-listed set, but no secondary entry matched
    BackfillFailed,

    /// Hand-picked name exclusion within an allow-listed set
    ExcludedBySetException,

    ForeignLanguage,

    Token,

    /// Known duplicate/erroneous platform id
    ProblemId,

    /// (set, collector number) in the exclusion table
    ExcludedCollectorNumber,

    DroppedPromoSet,

    /// Carries a promo tag marking an alternate/duplicate print
    UndesirablePromo,

    /// Alphabetic collector number other than a canonical meld half
    AlternateCollectorNumber,
}

impl RejectReason {
    /// Short code used in reports
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingPlatformId => "missing_platform_id",
            RejectReason::BackfillFailed => "backfill_failed",
            RejectReason::ExcludedBySetException => "excluded_by_set_exception",
            RejectReason::ForeignLanguage => "foreign_language",
            RejectReason::Token => "token",
            RejectReason::ProblemId => "problem_id",
            RejectReason::ExcludedCollectorNumber => "excluded_collector_number",
            RejectReason::DroppedPromoSet => "dropped_promo_set",
            RejectReason::UndesirablePromo => "undesirable_promo",
            RejectReason::AlternateCollectorNumber => "alternate_collector_number",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// FILTER
// ============================================================================

/// Keep/reject a record that has already been through identifier backfill.
///
/// Checks run in a fixed order and stop at the first rejection:
/// 1. platform id present (allow-listed sets only get here via backfill)
/// 2. per-set name exclusions for allow-listed sets
/// 3. language
/// 4. token markers (layout or set category)
/// 5. problem ids
/// 6. (set, collector number) exclusions
/// 7. keep-all-variants set → accept
/// 8. drop-all-promos set → reject
/// 9. promo tags → accept unless an undesirable tag is present
/// 10. alphabetic collector numbers → accept only `NNNa`
pub fn filter_record(record: &SourceRecord, config: &PipelineConfig) -> Result<(), RejectReason> {
    let allow_listed = config.is_set_exception(&record.set);

    let Some(arena_id) = record.arena_id else {
        return Err(if allow_listed {
            RejectReason::BackfillFailed
        } else {
            RejectReason::MissingPlatformId
        });
    };

    if allow_listed && config.is_excluded_name(&record.set, &record.name) {
        return Err(RejectReason::ExcludedBySetException);
    }

    if let Some(lang) = &record.lang {
        if *lang != config.primary_language {
            return Err(RejectReason::ForeignLanguage);
        }
    }

    if is_token(record) {
        return Err(RejectReason::Token);
    }

    if config.problem_ids.contains(&arena_id) {
        return Err(RejectReason::ProblemId);
    }

    if config.is_excluded_collector_number(&record.set, &record.collector_number) {
        return Err(RejectReason::ExcludedCollectorNumber);
    }

    if record.set == config.keep_all_variants_set {
        return Ok(());
    }

    if record.set == config.drop_promos_set {
        return Err(RejectReason::DroppedPromoSet);
    }

    if let Some(promo_types) = &record.promo_types {
        if promo_types.iter().any(|p| config.is_undesirable_promo(p)) {
            return Err(RejectReason::UndesirablePromo);
        }
        return Ok(());
    }

    if !is_canonical_collector_number(&record.collector_number) {
        return Err(RejectReason::AlternateCollectorNumber);
    }

    Ok(())
}

/// Layout-based or category-based token marker
fn is_token(record: &SourceRecord) -> bool {
    let layout_token = matches!(
        record.layout.as_deref(),
        Some("token") | Some("double_faced_token")
    );
    let category_token = record.set_type.as_deref() == Some("token");

    layout_token || category_token
}

/// Purely numeric, or the front half of a meld pair.
///
/// Rebalanced prints ("A-234"), back halves ("123b") and other lettered
/// variants ("5r") fail. Tied to the provider's current numbering scheme.
pub fn is_canonical_collector_number(collector_number: &str) -> bool {
    if !collector_number.chars().any(|c| c.is_alphabetic()) {
        return true;
    }
    MELD_FRONT_HALF.is_match(collector_number)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn create_passing_record(collector_number: &str) -> SourceRecord {
        let mut record = SourceRecord::new("Opt", "dom", collector_number).with_arena_id(67000);
        record.lang = Some("en".to_string());
        record.layout = Some("normal".to_string());
        record
    }

    #[test]
    fn test_collector_number_scenario() {
        let config = PipelineConfig::default();
        let numbers = ["234", "A-234", "123a", "123b", "5r"];

        let kept: Vec<&str> = numbers
            .iter()
            .copied()
            .filter(|n| filter_record(&create_passing_record(n), &config).is_ok())
            .collect();

        assert_eq!(kept, vec!["234", "123a"]);
        assert_eq!(
            filter_record(&create_passing_record("A-234"), &config),
            Err(RejectReason::AlternateCollectorNumber)
        );
    }

    #[test]
    fn test_meld_pattern_is_exact() {
        assert!(is_canonical_collector_number("18"));
        assert!(is_canonical_collector_number("238a"));
        assert!(!is_canonical_collector_number("38a"));
        assert!(!is_canonical_collector_number("1238a"));
        assert!(!is_canonical_collector_number("238A"));
    }

    #[test]
    fn test_missing_id_rejected() {
        let config = PipelineConfig::default();

        let mut outside = create_passing_record("1");
        outside.arena_id = None;
        assert_eq!(filter_record(&outside, &config), Err(RejectReason::MissingPlatformId));

        let mut allow_listed = create_passing_record("1");
        allow_listed.arena_id = None;
        allow_listed.set = "mid".to_string();
        assert_eq!(filter_record(&allow_listed, &config), Err(RejectReason::BackfillFailed));
    }

    #[test]
    fn test_set_exception_name_exclusion() {
        let config = PipelineConfig::default();
        let mut record = create_passing_record("1");
        record.set = "j21".to_string();
        record.name = "Lightning Bolt".to_string();

        assert_eq!(filter_record(&record, &config), Err(RejectReason::ExcludedBySetException));

        record.name = "Davriel's Withering".to_string();
        assert_eq!(filter_record(&record, &config), Ok(()));
    }

    #[test]
    fn test_allow_listed_record_still_checked() {
        let config = PipelineConfig::default();
        let mut record = create_passing_record("1");
        record.set = "mid".to_string();
        record.lang = Some("de".to_string());

        assert_eq!(filter_record(&record, &config), Err(RejectReason::ForeignLanguage));
    }

    #[test]
    fn test_language_absent_passes() {
        let config = PipelineConfig::default();
        let mut record = create_passing_record("1");
        record.lang = None;

        assert!(filter_record(&record, &config).is_ok());
    }

    #[test]
    fn test_token_markers() {
        let config = PipelineConfig::default();

        let mut by_layout = create_passing_record("1");
        by_layout.layout = Some("token".to_string());
        assert_eq!(filter_record(&by_layout, &config), Err(RejectReason::Token));

        let mut by_category = create_passing_record("1");
        by_category.set_type = Some("token".to_string());
        assert_eq!(filter_record(&by_category, &config), Err(RejectReason::Token));
    }

    #[test]
    fn test_problem_id_and_collector_exclusion() {
        let config = PipelineConfig::default();

        let problem = create_passing_record("1").with_arena_id(75382);
        assert_eq!(filter_record(&problem, &config), Err(RejectReason::ProblemId));

        let mut duplicate_land = create_passing_record("249");
        duplicate_land.set = "pana".to_string();
        assert_eq!(
            filter_record(&duplicate_land, &config),
            Err(RejectReason::ExcludedCollectorNumber)
        );
    }

    #[test]
    fn test_keep_all_and_drop_all_sets() {
        let config = PipelineConfig::default();

        // Lettered number and boosterfun tag would otherwise reject
        let mut archive = create_passing_record("63e");
        archive.set = "sta".to_string();
        archive.promo_types = Some(vec!["boosterfun".to_string()]);
        assert_eq!(filter_record(&archive, &config), Ok(()));

        let mut promo = create_passing_record("1");
        promo.set = "pdom".to_string();
        assert_eq!(filter_record(&promo, &config), Err(RejectReason::DroppedPromoSet));
    }

    #[test]
    fn test_promo_tags() {
        let config = PipelineConfig::default();

        let mut showcase = create_passing_record("300");
        showcase.promo_types = Some(vec!["boosterfun".to_string()]);
        assert_eq!(filter_record(&showcase, &config), Err(RejectReason::UndesirablePromo));

        let mut pack = create_passing_record("300");
        pack.promo_types = Some(vec!["promopack".to_string(), "stamped".to_string()]);
        assert_eq!(filter_record(&pack, &config), Err(RejectReason::UndesirablePromo));

        let mut harmless = create_passing_record("300");
        harmless.promo_types = Some(vec!["stamped".to_string()]);
        assert_eq!(filter_record(&harmless, &config), Ok(()));
    }

    #[test]
    fn test_reason_codes_are_unique() {
        use std::collections::HashSet;

        let reasons = [
            RejectReason::MissingPlatformId,
            RejectReason::BackfillFailed,
            RejectReason::ExcludedBySetException,
            RejectReason::ForeignLanguage,
            RejectReason::Token,
            RejectReason::ProblemId,
            RejectReason::ExcludedCollectorNumber,
            RejectReason::DroppedPromoSet,
            RejectReason::UndesirablePromo,
            RejectReason::AlternateCollectorNumber,
        ];
        let codes: HashSet<&str> = reasons.iter().map(|r| r.code()).collect();

        assert_eq!(codes.len(), reasons.len());
    }
}
