//! Assessment engine for PostgreSQL configuration snapshots.
//!
//! Runs every rule of the catalog against one snapshot and host profile and
//! collects exactly one [`CheckResult`] per rule, in catalog order.
//!
//! # Architecture
//!
//! - **Thresholds**: Loaded from TOML (or embedded defaults) at startup
//! - **Evaluation**: Snapshot + host profile -> ordered result set
//! - **Recovery**: A rule that cannot read its inputs reports FAILED/HIGH
//!   instead of aborting the run
//!
//! # Example
//!
//! ```ignore
//! use pgconf_audit::engine::{AssessmentEngine, Priority};
//! use pgconf_audit::host::HostProfile;
//! use pgconf_audit::snapshot::ParameterSnapshot;
//!
//! let engine = AssessmentEngine::with_defaults();
//! let snapshot = ParameterSnapshot::new()
//!     .with("shared_buffers", "4GB")
//!     .with("work_mem", "64MB");
//! let host = HostProfile::with_memory_gb(8, 32);
//!
//! let results = engine.run(&snapshot, &host)?;
//! for result in results.filter_by_priority(Priority::High).iter() {
//!     println!("{}: {}", result.parameter, result.note);
//! }
//! ```

mod types;

pub use types::*;

use tracing::{debug, error, info, warn};

use crate::config::{default_config, EngineConfig};
use crate::error::AssessmentError;
use crate::host::HostProfile;
use crate::rules::{Rule, RuleInput, CATALOG};
use crate::snapshot::ParameterSnapshot;

/// Runs the rule catalog.
///
/// Holds only thresholds; the same engine can assess any number of
/// snapshots and every run is independent of the previous ones.
#[derive(Debug, Clone)]
pub struct AssessmentEngine {
    config: EngineConfig,
    rules: &'static [Rule],
}

impl AssessmentEngine {
    /// Create an engine with the given thresholds, rejecting invalid ones.
    pub fn new(config: EngineConfig) -> Result<Self, AssessmentError> {
        config.validate()?;
        Ok(Self {
            config,
            rules: CATALOG,
        })
    }

    /// Engine with the embedded default thresholds.
    pub fn with_defaults() -> Self {
        Self {
            config: default_config(),
            rules: CATALOG,
        }
    }

    /// The rules this engine evaluates, in report order.
    pub fn rules(&self) -> &'static [Rule] {
        self.rules
    }

    /// Assess one snapshot.
    ///
    /// # Errors
    /// Only `InvalidHostProfile`, before any rule runs. Problems with
    /// individual values are reported as FAILED/HIGH results.
    pub fn run(
        &self,
        snapshot: &ParameterSnapshot,
        host: &HostProfile,
    ) -> Result<ResultSet, AssessmentError> {
        host.validate()?;
        debug!(
            "Assessing {} parameters against {} rules ({} CPUs, {:.1}GB, {})",
            snapshot.len(),
            self.rules.len(),
            host.cpu_count,
            host.memory_gb(),
            host.storage_type
        );

        let input = RuleInput::new(snapshot, host, &self.config);
        let results = ResultSet::new(
            self.rules
                .iter()
                .map(|rule| self.evaluate(rule, &input))
                .collect(),
        );

        let summary = results.summary();
        info!(
            "Assessment complete: {} checks, {} passed, {} failed ({} high)",
            summary.total, summary.passed, summary.failed, summary.failed_high
        );
        Ok(results)
    }

    fn evaluate(&self, rule: &Rule, input: &RuleInput<'_>) -> CheckResult {
        match (rule.evaluate)(input) {
            Ok(result) => {
                debug!(
                    "{}: {} {} - {}",
                    rule.parameter, result.status, result.priority, result.note
                );
                result
            }
            Err(e) => {
                if e.is_recoverable() {
                    warn!("Rule {} could not be evaluated: {}", rule.parameter, e);
                } else {
                    error!("Rule {} failed unexpectedly: {}", rule.parameter, e);
                }
                CheckResult::failed(rule.parameter, Priority::High, e.to_string())
            }
        }
    }
}

impl Default for AssessmentEngine {
    fn default() -> Self {
        Self::with_defaults()
    }
}
