//! The rule catalog.
//!
//! Each rule is a pure function from a [`RuleInput`] (snapshot, host profile,
//! thresholds) to exactly one [`CheckResult`]. Rules are registered in a
//! static table whose order is the report order:
//!
//! 1. `random_page_cost/seq_page_cost`
//! 2. `shared_buffers`
//! 3. `checkpoint_timeout`
//! 4. `max_connections`
//! 5. `maintenance_work_mem`
//! 6. `work_mem`
//! 7. `idle_in_transaction_session_timeout`
//! 8. `idle_session_timeout`
//! 9. `statement_timeout`
//! 10. `bgwriter_lru_maxpages`
//! 11. `max_wal_size`
//! 12. `autovacuum_max_workers`
//! 13. `max_parallel_maintenance_workers`
//! 14. `track_io_timing`
//! 15. `track_wal_io_timing`
//! 16. `track_commit_timestamp`
//! 17. `log_lock_waits`
//! 18. `log_temp_files`
//!
//! Every read goes through [`crate::normalize::normalize`]; a rule that hits
//! a malformed or missing value returns the error and the engine turns it
//! into a FAILED/HIGH row.

use std::fmt;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::engine::CheckResult;
use crate::error::AssessmentError;
use crate::host::HostProfile;
use crate::normalize::{normalize, Normalized, Param};
use crate::snapshot::ParameterSnapshot;

mod checkpoint;
mod io;
mod memory;
mod observability;
mod timeouts;
mod workers;

/// Signature every rule implements.
pub type Evaluate = fn(&RuleInput<'_>) -> Result<CheckResult, AssessmentError>;

/// Grouping used in listings only; it has no effect on evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Memory,
    Io,
    Checkpoint,
    Parallelism,
    Timeouts,
    Observability,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Memory => "memory",
            Category::Io => "io",
            Category::Checkpoint => "checkpoint",
            Category::Parallelism => "parallelism",
            Category::Timeouts => "timeouts",
            Category::Observability => "observability",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, independently registered check.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Name reported in the result (`a/b` for grouped parameters)
    pub parameter: &'static str,
    pub category: Category,
    /// Snapshot keys the rule reads, with their unit kinds
    pub inputs: &'static [Param],
    pub evaluate: Evaluate,
}

/// The catalog, in report order.
pub static CATALOG: &[Rule] = &[
    Rule {
        parameter: io::PAGE_COST,
        category: Category::Io,
        inputs: &[io::RANDOM_PAGE_COST, io::SEQ_PAGE_COST],
        evaluate: io::page_cost,
    },
    Rule {
        parameter: "shared_buffers",
        category: Category::Memory,
        inputs: &[memory::SHARED_BUFFERS],
        evaluate: memory::shared_buffers,
    },
    Rule {
        parameter: "checkpoint_timeout",
        category: Category::Checkpoint,
        inputs: &[checkpoint::CHECKPOINT_TIMEOUT],
        evaluate: checkpoint::checkpoint_timeout,
    },
    Rule {
        parameter: "max_connections",
        category: Category::Memory,
        inputs: &[
            memory::MAX_CONNECTIONS,
            memory::WORK_MEM,
            memory::SHARED_BUFFERS,
            memory::MAINTENANCE_WORK_MEM,
        ],
        evaluate: memory::max_connections,
    },
    Rule {
        parameter: "maintenance_work_mem",
        category: Category::Memory,
        inputs: &[memory::MAINTENANCE_WORK_MEM],
        evaluate: memory::maintenance_work_mem,
    },
    Rule {
        parameter: "work_mem",
        category: Category::Memory,
        inputs: &[
            memory::WORK_MEM,
            memory::MAX_CONNECTIONS,
            memory::SHARED_BUFFERS,
        ],
        evaluate: memory::work_mem,
    },
    Rule {
        parameter: "idle_in_transaction_session_timeout",
        category: Category::Timeouts,
        inputs: &[timeouts::IDLE_IN_TRANSACTION_SESSION_TIMEOUT],
        evaluate: timeouts::idle_in_transaction_session_timeout,
    },
    Rule {
        parameter: "idle_session_timeout",
        category: Category::Timeouts,
        inputs: &[timeouts::IDLE_SESSION_TIMEOUT],
        evaluate: timeouts::idle_session_timeout,
    },
    Rule {
        parameter: "statement_timeout",
        category: Category::Timeouts,
        inputs: &[timeouts::STATEMENT_TIMEOUT],
        evaluate: timeouts::statement_timeout,
    },
    Rule {
        parameter: "bgwriter_lru_maxpages",
        category: Category::Io,
        inputs: &[io::BGWRITER_LRU_MAXPAGES, io::MAXWRITTEN_CLEAN],
        evaluate: io::bgwriter_lru_maxpages,
    },
    Rule {
        parameter: "max_wal_size",
        category: Category::Checkpoint,
        inputs: &[
            checkpoint::MAX_WAL_SIZE,
            checkpoint::NUM_TIMED,
            checkpoint::NUM_REQUESTED,
        ],
        evaluate: checkpoint::max_wal_size,
    },
    Rule {
        parameter: "autovacuum_max_workers",
        category: Category::Parallelism,
        inputs: &[workers::AUTOVACUUM_MAX_WORKERS],
        evaluate: workers::autovacuum_max_workers,
    },
    Rule {
        parameter: "max_parallel_maintenance_workers",
        category: Category::Parallelism,
        inputs: &[workers::MAX_PARALLEL_MAINTENANCE_WORKERS],
        evaluate: workers::max_parallel_maintenance_workers,
    },
    Rule {
        parameter: "track_io_timing",
        category: Category::Observability,
        inputs: &[observability::TRACK_IO_TIMING],
        evaluate: observability::track_io_timing,
    },
    Rule {
        parameter: "track_wal_io_timing",
        category: Category::Observability,
        inputs: &[observability::TRACK_WAL_IO_TIMING],
        evaluate: observability::track_wal_io_timing,
    },
    Rule {
        parameter: "track_commit_timestamp",
        category: Category::Observability,
        inputs: &[observability::TRACK_COMMIT_TIMESTAMP],
        evaluate: observability::track_commit_timestamp,
    },
    Rule {
        parameter: "log_lock_waits",
        category: Category::Observability,
        inputs: &[observability::LOG_LOCK_WAITS],
        evaluate: observability::log_lock_waits,
    },
    Rule {
        parameter: "log_temp_files",
        category: Category::Observability,
        inputs: &[observability::LOG_TEMP_FILES],
        evaluate: observability::log_temp_files,
    },
];

/// Everything a rule may look at. Reads are normalized on the way out.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub snapshot: &'a ParameterSnapshot,
    pub host: &'a HostProfile,
    pub config: &'a EngineConfig,
}

impl<'a> RuleInput<'a> {
    pub fn new(
        snapshot: &'a ParameterSnapshot,
        host: &'a HostProfile,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            snapshot,
            host,
            config,
        }
    }

    /// Normalized value of `param`.
    pub fn value(&self, param: &Param) -> Result<Normalized, AssessmentError> {
        normalize(param, self.snapshot.get(param.name))
    }

    pub fn bytes(&self, param: &Param) -> Result<u64, AssessmentError> {
        match self.value(param)? {
            Normalized::Bytes(b) => Ok(b),
            other => Err(self.unexpected(param, other)),
        }
    }

    pub fn millis(&self, param: &Param) -> Result<f64, AssessmentError> {
        match self.value(param)? {
            Normalized::Millis(ms) => Ok(ms),
            other => Err(self.unexpected(param, other)),
        }
    }

    pub fn count(&self, param: &Param) -> Result<i64, AssessmentError> {
        match self.value(param)? {
            Normalized::Count(n) => Ok(n),
            other => Err(self.unexpected(param, other)),
        }
    }

    pub fn cost(&self, param: &Param) -> Result<f64, AssessmentError> {
        match self.value(param)? {
            Normalized::Cost(c) => Ok(c),
            other => Err(self.unexpected(param, other)),
        }
    }

    fn unexpected(&self, param: &Param, value: Normalized) -> AssessmentError {
        let raw = self
            .snapshot
            .get(param.name)
            .map(|r| r.to_string())
            .unwrap_or_else(|| value.to_string());
        AssessmentError::malformed(param.name, raw)
    }
}

const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * MIB;

fn to_mb(bytes: u64) -> f64 {
    bytes as f64 / MIB
}

fn to_gb(bytes: u64) -> f64 {
    bytes as f64 / GIB
}

fn percent(fraction: f64) -> String {
    trim_number(fraction * 100.0)
}

/// Two decimals at most, trailing zeros dropped (`1.10` -> `1.1`, `4.00` -> `4`).
fn trim_number(value: f64) -> String {
    let s = format!("{:.2}", value);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
