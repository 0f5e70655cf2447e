//! Background worker counts scaled by CPU count.

use crate::config::WorkerFormula;
use crate::engine::{CheckResult, Priority};
use crate::error::AssessmentError;
use crate::normalize::{Param, UnitKind};

use super::RuleInput;

pub(crate) const AUTOVACUUM_MAX_WORKERS: Param =
    Param::required("autovacuum_max_workers", UnitKind::Count);
pub(crate) const MAX_PARALLEL_MAINTENANCE_WORKERS: Param =
    Param::required("max_parallel_maintenance_workers", UnitKind::Count);

pub fn autovacuum_max_workers(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    enough_workers(
        input,
        &AUTOVACUUM_MAX_WORKERS,
        &input.config.workers.autovacuum_max_workers,
    )
}

pub fn max_parallel_maintenance_workers(
    input: &RuleInput<'_>,
) -> Result<CheckResult, AssessmentError> {
    enough_workers(
        input,
        &MAX_PARALLEL_MAINTENANCE_WORKERS,
        &input.config.workers.max_parallel_maintenance_workers,
    )
}

/// Only too few workers is a failure; more than recommended passes.
fn enough_workers(
    input: &RuleInput<'_>,
    param: &Param,
    formula: &WorkerFormula,
) -> Result<CheckResult, AssessmentError> {
    let current = input.count(param)?;
    let cpus = input.host.cpu_count;
    let recommended = formula.recommend(cpus);

    let result = if current < i64::from(recommended) {
        CheckResult::failed(
            param.name,
            Priority::Medium,
            format!(
                "Current: {}, Recommended: {} for {} CPUs",
                current, recommended, cpus
            ),
        )
    } else {
        CheckResult::passed(
            param.name,
            Priority::Medium,
            format!("Sufficient for {} CPUs (recommended: {})", cpus, recommended),
        )
    };

    Ok(result
        .current(current.to_string())
        .recommended(recommended.to_string()))
}
