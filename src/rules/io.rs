//! Storage-facing rules: planner page costs and the background writer.

use crate::engine::{CheckResult, Priority};
use crate::error::AssessmentError;
use crate::host::StorageType;
use crate::normalize::{Normalized, Param, UnitKind};

use super::{trim_number, RuleInput};

pub(crate) const PAGE_COST: &str = "random_page_cost/seq_page_cost";
pub(crate) const RANDOM_PAGE_COST: Param = Param::required("random_page_cost", UnitKind::Cost);
pub(crate) const SEQ_PAGE_COST: Param = Param::required("seq_page_cost", UnitKind::Cost);

pub(crate) const BGWRITER_LRU_MAXPAGES: Param =
    Param::required("bgwriter_lru_maxpages", UnitKind::Count);
pub(crate) const MAXWRITTEN_CLEAN: Param =
    Param::optional("pg_stat_bgwriter.maxwritten_clean", UnitKind::Count);

/// Gap between random and sequential page cost, judged per storage type.
pub fn page_cost(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let random = input.cost(&RANDOM_PAGE_COST)?;
    let seq = input.cost(&SEQ_PAGE_COST)?;
    let gap = random - seq;

    let (band, label) = match input.host.storage_type {
        StorageType::Ssd => (input.config.page_cost.ssd, "SSD"),
        StorageType::Hdd => (input.config.page_cost.hdd, "HDD"),
    };
    let target = format!(
        "{}-{}",
        trim_number(seq + band.min),
        trim_number(seq + band.max)
    );

    let result = if band.contains(gap) {
        CheckResult::passed(PAGE_COST, Priority::Low, format!("Optimal for {} storage", label))
    } else {
        let note = match input.host.storage_type {
            StorageType::Ssd => format!(
                "For SSD: reduce random_page_cost to within {} of seq_page_cost ({}).",
                band, target
            ),
            StorageType::Hdd if gap < band.min => format!(
                "For HDD: random_page_cost should exceed seq_page_cost by {} ({}). Increase random_page_cost.",
                band, target
            ),
            StorageType::Hdd => format!(
                "For HDD: random_page_cost exceeds seq_page_cost by more than {} ({}). Reduce random_page_cost.",
                band.max, target
            ),
        };
        CheckResult::failed(PAGE_COST, Priority::Medium, note)
    };

    Ok(result
        .current(format!("random={}, seq={}", random, seq))
        .recommended(format!("random_page_cost {}", target)))
}

/// Background writer page limit. When `maxwritten_clean` statistics are
/// present, any stop on the limit wins over the configured band.
pub fn bgwriter_lru_maxpages(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let pages = input.count(&BGWRITER_LRU_MAXPAGES)?;
    let band = input.config.background_writer.lru_maxpages;
    let name = BGWRITER_LRU_MAXPAGES.name;

    let result = match input.value(&MAXWRITTEN_CLEAN)? {
        Normalized::Count(stops) if stops > 0 => CheckResult::failed(
            name,
            Priority::Medium,
            format!(
                "Background writer stopped {} times on the page limit. Consider increasing bgwriter_lru_maxpages to reduce checkpoint I/O spikes.",
                stops
            ),
        ),
        _ if band.contains(pages as f64) => CheckResult::passed(
            name,
            Priority::Low,
            "bgwriter_lru_maxpages is properly configured.",
        ),
        _ if pages == 0 => CheckResult::failed(
            name,
            Priority::Medium,
            format!(
                "Background writer is disabled (0). Set bgwriter_lru_maxpages within {}.",
                band
            ),
        ),
        _ => CheckResult::failed(
            name,
            Priority::Medium,
            format!(
                "Outside recommended range ({} not within {}). Adjust bgwriter_lru_maxpages.",
                pages, band
            ),
        ),
    };

    Ok(result.current(pages.to_string()).recommended(band.to_string()))
}
