//! Threshold configuration for the rule catalog.
//!
//! Provides three loading methods:
//! - `default_config()` - Thresholds embedded in the binary
//! - `load_config(path)` - A custom TOML file
//! - `resolve_config(path)` - Explicit path, then the user config dir, then defaults

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};
use tracing::{debug, info};

use crate::error::AssessmentError;
use crate::normalize::{format_bytes, normalize, ByteUnit, Normalized, Param, UnitKind};
use crate::snapshot::RawValue;

/// Default thresholds embedded at compile time from `config/thresholds.toml`.
const DEFAULT_CONFIG: &str = include_str!("../config/thresholds.toml");

const CONFIG_DIR_NAME: &str = "pgconf-audit";
const CONFIG_FILE_NAME: &str = "thresholds.toml";

/// Slack for float comparisons at band edges (1.0 + 0.3 is not exactly 1.3).
const EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    pub memory: MemoryThresholds,
    pub page_cost: PageCostBands,
    pub checkpoint: CheckpointThresholds,
    pub background_writer: BackgroundWriterThresholds,
    pub wal: WalThresholds,
    pub workers: WorkerFormulas,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MemoryThresholds {
    pub shared_buffers_min_fraction: f64,
    pub shared_buffers_max_fraction: f64,
    pub work_mem_budget_fraction: f64,
    pub maintenance_work_mem_max: ByteSize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageCostBands {
    pub ssd: Band,
    pub hdd: Band,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckpointThresholds {
    pub fallback_minutes: Band,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackgroundWriterThresholds {
    pub lru_maxpages: Band,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WalThresholds {
    pub max_wal_size_min: ByteSize,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkerFormulas {
    pub autovacuum_max_workers: WorkerFormula,
    pub max_parallel_maintenance_workers: WorkerFormula,
}

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min - EPSILON && value <= self.max + EPSILON
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// A memory size written as a PostgreSQL size string (`"1GB"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub u64);

const SIZE: Param = Param::required("size", UnitKind::Bytes(ByteUnit::Bytes));

impl<'de> Deserialize<'de> for ByteSize {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match normalize(&SIZE, Some(&RawValue::Text(raw.clone()))) {
            Ok(Normalized::Bytes(bytes)) => Ok(ByteSize(bytes)),
            _ => Err(serde::de::Error::custom(format!("invalid size '{}'", raw))),
        }
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_bytes(self.0))
    }
}

/// How `cpu_count / divisor` is turned into a whole number of workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounding {
    #[default]
    Floor,
    Nearest,
    Ceil,
}

/// CPU-scaled worker recommendation: `clamp(round(cpus / divisor), floor, ceiling)`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WorkerFormula {
    pub divisor: f64,
    pub floor: u32,
    pub ceiling: u32,
    #[serde(default)]
    pub rounding: Rounding,
}

impl WorkerFormula {
    pub fn recommend(&self, cpu_count: u32) -> u32 {
        let scaled = cpu_count as f64 / self.divisor;
        let rounded = match self.rounding {
            Rounding::Floor => scaled.floor(),
            Rounding::Nearest => scaled.round(),
            Rounding::Ceil => scaled.ceil(),
        };
        (rounded as u32).max(self.floor).min(self.ceiling)
    }
}

impl EngineConfig {
    /// Reject thresholds no rule could sensibly use.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        let m = &self.memory;
        for (name, fraction) in [
            ("memory.shared_buffers_min_fraction", m.shared_buffers_min_fraction),
            ("memory.shared_buffers_max_fraction", m.shared_buffers_max_fraction),
            ("memory.work_mem_budget_fraction", m.work_mem_budget_fraction),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(AssessmentError::Config(format!(
                    "{} must be within (0, 1], got {}",
                    name, fraction
                )));
            }
        }
        if m.shared_buffers_min_fraction > m.shared_buffers_max_fraction {
            return Err(AssessmentError::Config(
                "memory.shared_buffers_min_fraction exceeds shared_buffers_max_fraction"
                    .to_string(),
            ));
        }

        for (name, band) in [
            ("page_cost.ssd", &self.page_cost.ssd),
            ("page_cost.hdd", &self.page_cost.hdd),
            ("checkpoint.fallback_minutes", &self.checkpoint.fallback_minutes),
            ("background_writer.lru_maxpages", &self.background_writer.lru_maxpages),
        ] {
            if !band.min.is_finite() || !band.max.is_finite() || band.min > band.max {
                return Err(AssessmentError::Config(format!(
                    "{} must have finite min <= max, got {}",
                    name, band
                )));
            }
        }

        for (name, formula) in [
            ("workers.autovacuum_max_workers", &self.workers.autovacuum_max_workers),
            (
                "workers.max_parallel_maintenance_workers",
                &self.workers.max_parallel_maintenance_workers,
            ),
        ] {
            if !(formula.divisor.is_finite() && formula.divisor > 0.0) {
                return Err(AssessmentError::Config(format!(
                    "{}.divisor must be positive, got {}",
                    name, formula.divisor
                )));
            }
            if formula.floor > formula.ceiling {
                return Err(AssessmentError::Config(format!(
                    "{}.floor ({}) exceeds ceiling ({})",
                    name, formula.floor, formula.ceiling
                )));
            }
        }

        Ok(())
    }
}

/// Load thresholds from a TOML file and validate them.
pub fn load_config(path: &Path) -> Result<EngineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: EngineConfig = toml::from_str(&content)
        .map_err(|e| AssessmentError::Config(format!("{:?}: {}", path, e)))?;
    config.validate()?;
    debug!("Loaded thresholds from {:?}", path);
    Ok(config)
}

/// Get the default thresholds embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_config() -> EngineConfig {
    toml::from_str(DEFAULT_CONFIG).expect("embedded thresholds.toml must be valid TOML")
}

/// `<config dir>/pgconf-audit/thresholds.toml`, when the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Pick the thresholds for a run: an explicit file wins, then the user's
/// config file if it exists, then the embedded defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        info!("Using thresholds from {:?}", path);
        return load_config(path);
    }
    if let Some(path) = user_config_path().filter(|p| p.is_file()) {
        info!("Using thresholds from {:?}", path);
        return load_config(&path);
    }
    debug!("Using embedded default thresholds");
    Ok(default_config())
}
