//! Session and statement timeouts. Zero or unset means no timeout.

use crate::engine::{CheckResult, Priority};
use crate::error::AssessmentError;
use crate::normalize::{format_duration, Normalized, Param, TimeUnit, UnitKind};

use super::RuleInput;

pub(crate) const IDLE_IN_TRANSACTION_SESSION_TIMEOUT: Param = Param::optional(
    "idle_in_transaction_session_timeout",
    UnitKind::Duration(TimeUnit::Milliseconds),
)
.disabled_at(0);
pub(crate) const IDLE_SESSION_TIMEOUT: Param = Param::optional(
    "idle_session_timeout",
    UnitKind::Duration(TimeUnit::Milliseconds),
)
.disabled_at(0);
pub(crate) const STATEMENT_TIMEOUT: Param = Param::optional(
    "statement_timeout",
    UnitKind::Duration(TimeUnit::Milliseconds),
)
.disabled_at(0);

pub fn idle_in_transaction_session_timeout(
    input: &RuleInput<'_>,
) -> Result<CheckResult, AssessmentError> {
    timeout_is_set(
        input,
        &IDLE_IN_TRANSACTION_SESSION_TIMEOUT,
        "Add timeout to prevent resource locks.",
    )
}

pub fn idle_session_timeout(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    timeout_is_set(
        input,
        &IDLE_SESSION_TIMEOUT,
        "Add timeout to terminate inactive sessions.",
    )
}

pub fn statement_timeout(input: &RuleInput<'_>) -> Result<CheckResult, AssessmentError> {
    timeout_is_set(
        input,
        &STATEMENT_TIMEOUT,
        "Add timeout to prevent long-running queries.",
    )
}

fn timeout_is_set(
    input: &RuleInput<'_>,
    param: &Param,
    advice: &str,
) -> Result<CheckResult, AssessmentError> {
    let result = match input.value(param)? {
        Normalized::Millis(ms) if ms > 0.0 => {
            CheckResult::passed(param.name, Priority::Low, format!("Timeout set: {}", format_duration(ms)))
                .current(format_duration(ms))
        }
        other => CheckResult::failed(
            param.name,
            Priority::Low,
            format!("No timeout set. {}", advice),
        )
        .current(other.to_string()),
    };
    Ok(result)
}
