//! Diagnostics switches. All of these are off by default in PostgreSQL and
//! cheap enough to leave on.

use crate::engine::{CheckResult, Priority};
use crate::error::AssessmentError;
use crate::normalize::{format_bytes, ByteUnit, Normalized, Param, UnitKind};

use super::RuleInput;

pub(crate) const TRACK_IO_TIMING: Param = Param::optional("track_io_timing", UnitKind::Boolean);
pub(crate) const TRACK_WAL_IO_TIMING: Param =
    Param::optional("track_wal_io_timing", UnitKind::Boolean);
pub(crate) const TRACK_COMMIT_TIMESTAMP: Param =
    Param::optional("track_commit_timestamp", UnitKind::Boolean);
pub(crate) const LOG_LOCK_WAITS: Param = Param::optional("log_lock_waits", UnitKind::Boolean);
pub(crate) const LOG_TEMP_FILES: Param =
    Param::optional("log_temp_files", UnitKind::Bytes(ByteUnit::Kilobytes)).disabled_at(-1);

pub fn track_io_timing(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    switched_on(
        input,
        &TRACK_IO_TIMING,
        "allows for measuring I/O timings which is useful for performance diagnostics.",
    )
}

pub fn track_wal_io_timing(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    switched_on(
        input,
        &TRACK_WAL_IO_TIMING,
        "allows for measuring WAL I/O timings which can help diagnose WAL-related performance issues.",
    )
}

pub fn track_commit_timestamp(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    switched_on(
        input,
        &TRACK_COMMIT_TIMESTAMP,
        "allows tracking transaction commit timestamps, which is useful for replication and temporal queries.",
    )
}

pub fn log_lock_waits(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    switched_on(
        input,
        &LOG_LOCK_WAITS,
        "allows logging of lock wait events, which can help diagnose lock contention issues.",
    )
}

/// Absent counts as off.
fn switched_on(
    input: &RuleInput<'_>,
    param: &Param,
    benefit: &str,
) -> Result<CheckResult, AssessmentError> {
    let result = match input.value(param)? {
        Normalized::Flag(true) => CheckResult::passed(
            param.name,
            Priority::Low,
            format!("{} is enabled.", param.name),
        )
        .current("on"),
        other => CheckResult::failed(
            param.name,
            Priority::Low,
            format!("{} is disabled. Enabling this setting {}", param.name, benefit),
        )
        .current(match other {
            Normalized::Unset => "unset",
            _ => "off",
        }),
    };
    Ok(result.recommended("on"))
}

/// `-1` (or absent) disables temp file logging; any size threshold passes.
pub fn log_temp_files(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    let name = LOG_TEMP_FILES.name;
    let result = match input.value(&LOG_TEMP_FILES)? {
        Normalized::Bytes(0) => CheckResult::passed(
            name,
            Priority::Low,
            "log_temp_files is set to 0, so every temporary file is logged.",
        )
        .current("0"),
        Normalized::Bytes(bytes) => CheckResult::passed(
            name,
            Priority::Low,
            format!(
                "log_temp_files is set to {}, so temporary files larger than this are logged.",
                format_bytes(bytes)
            ),
        )
        .current(format_bytes(bytes)),
        other => CheckResult::failed(
            name,
            Priority::Low,
            "log_temp_files is disabled (-1). Setting this to a value (in kB) will log the use of temporary files larger than that threshold, which helps identify queries that might benefit from more work_mem.",
        )
        .current(other.to_string()),
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Status;
    use crate::host::HostProfile;
    use crate::rules::testing::run;
    use crate::snapshot::ParameterSnapshot;

    #[test]
    fn test_flag_on_passes() {
        let host = HostProfile::with_memory_gb(4, 16);
        let snap = ParameterSnapshot::new().with("track_io_timing", "on");
        let result = run(track_io_timing, &snap, &host);
        assert_eq!(result.status, Status::Passed);
        assert_eq!(result.priority, Priority::Low);
        assert_eq!(result.current_value.as_deref(), Some("on"));
    }

    #[test]
    fn test_flag_off_fails_with_diagnostic_note() {
        let host = HostProfile::with_memory_gb(4, 16);
        let snap = ParameterSnapshot::new().with("log_lock_waits", false);
        let result = run(log_lock_waits, &snap, &host);
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.priority, Priority::Low);
        assert_eq!(
            result.note,
            "log_lock_waits is disabled. Enabling this setting allows logging of lock wait events, which can help diagnose lock contention issues."
        );
    }

    #[test]
    fn test_absent_flag_counts_as_off() {
        let host = HostProfile::with_memory_gb(4, 16);
        let result = run(track_commit_timestamp, &ParameterSnapshot::new(), &host);
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.current_value.as_deref(), Some("unset"));
    }

    #[test]
    fn test_log_temp_files_disabled() {
        let host = HostProfile::with_memory_gb(4, 16);
        let snap = ParameterSnapshot::new().with("log_temp_files", -1);
        let result = run(log_temp_files, &snap, &host);
        assert_eq!(result.status, Status::Failed);
        assert_eq!(result.priority, Priority::Low);
        assert!(result.note.starts_with("log_temp_files is disabled (-1)."));

        let result = run(log_temp_files, &ParameterSnapshot::new(), &host);
        assert_eq!(result.status, Status::Failed);
    }

    #[test]
    fn test_log_temp_files_threshold() {
        let host = HostProfile::with_memory_gb(4, 16);

        let snap = ParameterSnapshot::new().with("log_temp_files", "10240");
        let result = run(log_temp_files, &snap, &host);
        assert_eq!(result.status, Status::Passed);
        assert_eq!(result.current_value.as_deref(), Some("10MB"));

        let snap = ParameterSnapshot::new().with("log_temp_files", 0);
        let result = run(log_temp_files, &snap, &host);
        assert_eq!(result.status, Status::Passed);
        assert!(result.note.contains("every temporary file"));
    }
}
