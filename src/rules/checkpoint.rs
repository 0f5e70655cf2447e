//! Checkpoint cadence: timeout against the recovery objective, and WAL size
//! against requested checkpoints.

use crate::engine::{CheckResult, Priority};
use crate::error::AssessmentError;
use crate::normalize::{format_bytes, ByteUnit, Normalized, Param, TimeUnit, UnitKind};

use super::RuleInput;

pub(crate) const CHECKPOINT_TIMEOUT: Param =
    Param::required("checkpoint_timeout", UnitKind::Duration(TimeUnit::Seconds));
pub(crate) const MAX_WAL_SIZE: Param =
    Param::required("max_wal_size", UnitKind::Bytes(ByteUnit::Megabytes));
pub(crate) const NUM_TIMED: Param =
    Param::optional("pg_stat_checkpointer.num_timed", UnitKind::Count);
pub(crate) const NUM_REQUESTED: Param =
    Param::optional("pg_stat_checkpointer.num_requested", UnitKind::Count);

pub fn checkpoint_timeout(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let millis = input.millis(&CHECKPOINT_TIMEOUT)?;
    let minutes = millis / 60_000.0;
    let name = CHECKPOINT_TIMEOUT.name;

    let result = match input.host.desired_rto_minutes {
        Some(rto) if minutes > rto => CheckResult::failed(
            name,
            Priority::Medium,
            format!(
                "Exceeds RTO ({:.1}min > {}min). Reduce to meet recovery objectives.",
                minutes, rto
            ),
        )
        .recommended(format!("<= {}min", rto)),
        Some(rto) => CheckResult::passed(
            name,
            Priority::Low,
            format!("Within RTO ({:.1}min <= {}min)", minutes, rto),
        )
        .recommended(format!("<= {}min", rto)),
        None => {
            let band = input.config.checkpoint.fallback_minutes;
            let result = if band.contains(minutes) {
                CheckResult::passed(
                    name,
                    Priority::Low,
                    format!("Within default range of {}min (no RTO given)", band),
                )
            } else {
                CheckResult::failed(
                    name,
                    Priority::Medium,
                    format!(
                        "Outside default range ({:.1}min not within {}min). Provide an RTO or adjust checkpoint_timeout.",
                        minutes, band
                    ),
                )
            };
            result.recommended(format!("{}min", band))
        }
    };

    Ok(result.current(Normalized::Millis(millis).to_string()))
}

/// Requested checkpoints outnumbering timed ones mean WAL fills up before
/// the timeout; without statistics fall back to a minimum size.
pub fn max_wal_size(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let bytes = input.bytes(&MAX_WAL_SIZE)?;
    let minimum = input.config.wal.max_wal_size_min;
    let name = MAX_WAL_SIZE.name;

    let stats = (input.value(&NUM_TIMED)?, input.value(&NUM_REQUESTED)?);
    let result = match stats {
        (Normalized::Count(timed), Normalized::Count(requested)) if timed < requested => {
            CheckResult::failed(
                name,
                Priority::High,
                format!(
                    "Requested checkpoints ({}) outnumber timed ones ({}). Consider increasing max_wal_size to reduce checkpoint frequency and I/O spikes.",
                    requested, timed
                ),
            )
        }
        _ if bytes >= minimum.0 => {
            CheckResult::passed(name, Priority::Low, "max_wal_size is properly configured.")
        }
        _ => CheckResult::failed(
            name,
            Priority::Medium,
            format!(
                "Below {} ({}). Increase max_wal_size to reduce checkpoint frequency.",
                minimum,
                format_bytes(bytes)
            ),
        ),
    };

    Ok(result
        .current(format_bytes(bytes))
        .recommended(format!(">= {}", minimum)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Status;
    use crate::host::HostProfile;
    use crate::rules::testing::run;
    use crate::snapshot::ParameterSnapshot;

    #[test]
    fn test_checkpoint_exceeds_rto() {
        let host = HostProfile::with_memory_gb(4, 16).rto_minutes(1.0);
        let snap = ParameterSnapshot::new().with("checkpoint_timeout", "5min");
        let result = run(checkpoint_timeout, &snap, &host);

        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.priority, Priority::Medium);
        assert_eq!(
            result.note,
            "Exceeds RTO (5.0min > 1min). Reduce to meet recovery objectives."
        );
        assert_eq!(result.current_value.as_deref(), Some("5min"));
    }

    #[test]
    fn test_checkpoint_within_rto() {
        let host = HostProfile::with_memory_gb(4, 16).rto_minutes(1.0);
        let snap = ParameterSnapshot::new().with("checkpoint_timeout", "0.5min");
        let result = run(checkpoint_timeout, &snap, &host);
        assert_eq!(result.status, Status::Passed);
        assert_eq!(result.priority, Priority::Low);
    }

    #[test]
    fn test_checkpoint_bare_number_is_seconds() {
        let host = HostProfile::with_memory_gb(4, 16).rto_minutes(10.0);
        let snap = ParameterSnapshot::new().with("checkpoint_timeout", 300);
        let result = run(checkpoint_timeout, &snap, &host);
        assert_eq!(result.status, Status::Passed);
        assert_eq!(result.current_value.as_deref(), Some("5min"));
    }

    #[test]
    fn test_checkpoint_fallback_band_without_rto() {
        let host = HostProfile::with_memory_gb(4, 16);

        let snap = ParameterSnapshot::new().with("checkpoint_timeout", "5min");
        assert_eq!(run(checkpoint_timeout, &snap, &host).status, Status::Passed);

        let snap = ParameterSnapshot::new().with("checkpoint_timeout", "30s");
        let result = run(checkpoint_timeout, &snap, &host);
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.priority, Priority::Medium);

        let snap = ParameterSnapshot::new().with("checkpoint_timeout", "2h");
        assert_eq!(run(checkpoint_timeout, &snap, &host).status, Status::Failed);
    }

    #[test]
    fn test_max_wal_size_stats_branch_is_high() {
        let host = HostProfile::with_memory_gb(4, 16);
        let snap = ParameterSnapshot::new()
            .with("max_wal_size", "4GB")
            .with("pg_stat_checkpointer.num_timed", 10)
            .with("pg_stat_checkpointer.num_requested", 25);
        let result = run(max_wal_size, &snap, &host);

        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.priority, Priority::High);
        assert!(result.note.contains("Consider increasing max_wal_size"));
    }

    #[test]
    fn test_max_wal_size_minimum_without_stats() {
        let host = HostProfile::with_memory_gb(4, 16);

        let snap = ParameterSnapshot::new().with("max_wal_size", 1024);
        let result = run(max_wal_size, &snap, &host);
        assert_eq!(result.status, Status::Passed);
        assert_eq!(result.current_value.as_deref(), Some("1GB"));

        let snap = ParameterSnapshot::new().with("max_wal_size", "512MB");
        let result = run(max_wal_size, &snap, &host);
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.priority, Priority::Medium);
        assert_eq!(
            result.note,
            "Below 1GB (512MB). Increase max_wal_size to reduce checkpoint frequency."
        );
    }

    #[test]
    fn test_max_wal_size_healthy_stats_fall_through() {
        let host = HostProfile::with_memory_gb(4, 16);
        let snap = ParameterSnapshot::new()
            .with("max_wal_size", "2GB")
            .with("pg_stat_checkpointer.num_timed", 50)
            .with("pg_stat_checkpointer.num_requested", 3);
        assert_eq!(run(max_wal_size, &snap, &host).status, Status::Passed);
    }
}
