//! Memory sizing rules: shared buffers, per-operation memory and the
//! connection-driven worst case.

use crate::engine::{CheckResult, Priority};
use crate::error::AssessmentError;
use crate::normalize::{format_bytes, ByteUnit, Param, UnitKind};

use super::{percent, to_gb, to_mb, RuleInput};

pub(crate) const SHARED_BUFFERS: Param =
    Param::required("shared_buffers", UnitKind::Bytes(ByteUnit::Pages));
pub(crate) const WORK_MEM: Param =
    Param::required("work_mem", UnitKind::Bytes(ByteUnit::Kilobytes));
pub(crate) const MAINTENANCE_WORK_MEM: Param =
    Param::required("maintenance_work_mem", UnitKind::Bytes(ByteUnit::Kilobytes));
pub(crate) const MAX_CONNECTIONS: Param = Param::required("max_connections", UnitKind::Count);

/// `shared_buffers` should sit between 20% and 40% of host memory.
pub fn shared_buffers(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let bytes = input.bytes(&SHARED_BUFFERS)?;
    let thresholds = &input.config.memory;

    let current_gb = to_gb(bytes);
    let memory_gb = input.host.memory_gb();
    let low = memory_gb * thresholds.shared_buffers_min_fraction;
    let high = memory_gb * thresholds.shared_buffers_max_fraction;

    let result = if current_gb > high {
        CheckResult::failed(
            SHARED_BUFFERS.name,
            Priority::High,
            format!(
                "Exceeds {}% of memory ({:.1}GB/{:.1}GB). Reduce to prevent OS pressure.",
                percent(thresholds.shared_buffers_max_fraction),
                current_gb,
                memory_gb
            ),
        )
    } else if current_gb < low {
        CheckResult::failed(
            SHARED_BUFFERS.name,
            Priority::Low,
            format!(
                "Below {}% of memory ({:.1}GB < {:.1}GB). Increase to improve cache hit ratio.",
                percent(thresholds.shared_buffers_min_fraction),
                current_gb,
                low
            ),
        )
    } else {
        CheckResult::passed(SHARED_BUFFERS.name, Priority::Low, "Within acceptable range")
    };

    Ok(result
        .current(format_bytes(bytes))
        .recommended(format!("{:.1}GB-{:.1}GB", low, high)))
}

/// Worst-case memory if every connection uses a full `work_mem` while
/// maintenance runs, against total host memory.
pub fn max_connections(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let connections = positive_connections(input)?;
    let work_mem = input.bytes(&WORK_MEM)?;
    let shared = input.bytes(&SHARED_BUFFERS)?;
    let maintenance = input.bytes(&MAINTENANCE_WORK_MEM)?;

    let work_mem_mb = to_mb(work_mem);
    let usage_gb =
        work_mem_mb * connections as f64 / 1024.0 + to_gb(shared) + to_gb(maintenance);
    let memory_gb = input.host.memory_gb();

    let result = if usage_gb >= memory_gb {
        CheckResult::failed(
            MAX_CONNECTIONS.name,
            Priority::High,
            format!(
                "Memory usage ({:.1}GB) may exceed available ({:.1}GB). Reduce connections ({}) or work_mem ({:.0}MB).",
                usage_gb, memory_gb, connections, work_mem_mb
            ),
        )
    } else {
        CheckResult::passed(
            MAX_CONNECTIONS.name,
            Priority::Low,
            format!(
                "Worst-case memory usage ({:.1}GB) fits in available memory ({:.1}GB)",
                usage_gb, memory_gb
            ),
        )
    };

    Ok(result.current(connections.to_string()))
}

/// `maintenance_work_mem` above the configured ceiling (1GB).
pub fn maintenance_work_mem(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let bytes = input.bytes(&MAINTENANCE_WORK_MEM)?;
    let ceiling = input.config.memory.maintenance_work_mem_max;

    let result = if bytes > ceiling.0 {
        CheckResult::failed(
            MAINTENANCE_WORK_MEM.name,
            Priority::Medium,
            format!(
                "Exceeds {} ({:.0}MB). Reduce to prevent excessive memory usage.",
                ceiling,
                to_mb(bytes)
            ),
        )
    } else {
        CheckResult::passed(
            MAINTENANCE_WORK_MEM.name,
            Priority::Medium,
            format!("Within {} limit", ceiling),
        )
    };

    Ok(result
        .current(format_bytes(bytes))
        .recommended(format!("<= {}", ceiling)))
}

/// Total `work_mem` across connections against a fraction of the memory left
/// after `shared_buffers`.
pub fn work_mem(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let work_mem = input.bytes(&WORK_MEM)?;
    let connections = positive_connections(input)?;
    let shared = input.bytes(&SHARED_BUFFERS)?;
    let fraction = input.config.memory.work_mem_budget_fraction;

    let limit_mb = (input.host.memory_mb() - to_mb(shared)) * fraction;
    let potential_mb = to_mb(work_mem) * connections as f64;

    let result = if potential_mb > limit_mb {
        CheckResult::failed(
            WORK_MEM.name,
            Priority::High,
            format!(
                "Potential usage ({:.0}MB) exceeds {}% limit ({:.0}MB). Reduce work_mem or connections.",
                potential_mb,
                percent(fraction),
                limit_mb
            ),
        )
    } else {
        CheckResult::passed(
            WORK_MEM.name,
            Priority::Low,
            format!(
                "Potential usage ({:.0}MB) within {}% limit ({:.0}MB)",
                potential_mb,
                percent(fraction),
                limit_mb
            ),
        )
    };

    let per_connection_mb = (limit_mb / connections as f64).max(0.0).floor();
    Ok(result
        .current(format_bytes(work_mem))
        .recommended(format!("<= {:.0}MB", per_connection_mb)))
}

fn positive_connections(input: &RuleInput<'_>) -> Result<i64, AssessmentError> {
    let connections = input.count(&MAX_CONNECTIONS)?;
    if connections < 1 {
        return Err(AssessmentError::malformed(
            MAX_CONNECTIONS.name,
            connections.to_string(),
        ));
    }
    Ok(connections)
}
