//! Host facts every rule is evaluated against.
//!
//! A `HostProfile` is built once at the boundary (CLI flags, detected
//! hardware) and handed to the engine by value. Rules never look at
//! process state themselves.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AssessmentError;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Storage backend type. Drives the page cost band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Ssd,
    Hdd,
}

impl StorageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageType::Ssd => "ssd",
            StorageType::Hdd => "hdd",
        }
    }
}

impl FromStr for StorageType {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ssd" => Ok(StorageType::Ssd),
            "hdd" => Ok(StorageType::Hdd),
            other => Err(AssessmentError::InvalidHostProfile(format!(
                "storage type must be 'ssd' or 'hdd', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for StorageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the server runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentType {
    #[default]
    Onprem,
    Rds,
}

impl DeploymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentType::Onprem => "onprem",
            DeploymentType::Rds => "rds",
        }
    }
}

impl FromStr for DeploymentType {
    type Err = AssessmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "onprem" => Ok(DeploymentType::Onprem),
            "rds" => Ok(DeploymentType::Rds),
            other => Err(AssessmentError::InvalidHostProfile(format!(
                "deployment type must be 'onprem' or 'rds', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostProfile {
    pub cpu_count: u32,
    pub memory_bytes: u64,
    #[serde(default)]
    pub storage_type: StorageType,
    #[serde(default)]
    pub deployment_type: DeploymentType,
    /// Desired recovery time objective in minutes.
    #[serde(default)]
    pub desired_rto_minutes: Option<f64>,
}

impl HostProfile {
    /// Profile with default storage (ssd), deployment (onprem) and no RTO.
    pub fn new(cpu_count: u32, memory_bytes: u64) -> Self {
        Self {
            cpu_count,
            memory_bytes,
            storage_type: StorageType::default(),
            deployment_type: DeploymentType::default(),
            desired_rto_minutes: None,
        }
    }

    pub fn with_memory_gb(cpu_count: u32, memory_gb: u64) -> Self {
        Self::new(cpu_count, memory_gb.saturating_mul(1024 * 1024 * 1024))
    }

    pub fn storage(mut self, storage_type: StorageType) -> Self {
        self.storage_type = storage_type;
        self
    }

    pub fn deployment(mut self, deployment_type: DeploymentType) -> Self {
        self.deployment_type = deployment_type;
        self
    }

    pub fn rto_minutes(mut self, minutes: f64) -> Self {
        self.desired_rto_minutes = Some(minutes);
        self
    }

    /// Reject profiles no rule can be evaluated against.
    pub fn validate(&self) -> Result<(), AssessmentError> {
        if self.cpu_count == 0 {
            return Err(AssessmentError::InvalidHostProfile(
                "CPU count must be a positive integer, got 0".to_string(),
            ));
        }
        if self.memory_bytes == 0 {
            return Err(AssessmentError::InvalidHostProfile(
                "memory must be a positive number of bytes, got 0".to_string(),
            ));
        }
        if let Some(rto) = self.desired_rto_minutes {
            if !rto.is_finite() || rto <= 0.0 {
                return Err(AssessmentError::InvalidHostProfile(format!(
                    "RTO must be a positive number of minutes, got {}",
                    rto
                )));
            }
        }
        Ok(())
    }

    pub fn memory_mb(&self) -> f64 {
        self.memory_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn memory_gb(&self) -> f64 {
        self.memory_bytes as f64 / GIB
    }
}
