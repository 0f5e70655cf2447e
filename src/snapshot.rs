//! Parameter snapshots: one point-in-time read of server settings.
//!
//! Values are kept exactly as the source reported them (strings, native
//! numbers, booleans or `setting`/`unit` pairs from `pg_settings`). Nothing
//! here interprets units; that is the normalizer's job.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AssessmentError;

/// A raw parameter value as reported by the source system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    /// A `pg_settings` style pair: the setting is expressed in `unit`
    /// (e.g. `16384` in `8kB` pages).
    Setting {
        #[serde(deserialize_with = "string_or_number")]
        setting: String,
        #[serde(default)]
        unit: Option<String>,
    },
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(b) => write!(f, "{}", b),
            RawValue::Integer(i) => write!(f, "{}", i),
            RawValue::Float(x) => write!(f, "{}", x),
            RawValue::Text(s) => f.write_str(s),
            RawValue::Setting {
                setting,
                unit: Some(unit),
            } => write!(f, "{} {}", setting, unit),
            RawValue::Setting { setting, unit: None } => f.write_str(setting),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        RawValue::Text(s)
    }
}

impl From<i64> for RawValue {
    fn from(i: i64) -> Self {
        RawValue::Integer(i)
    }
}

impl From<i32> for RawValue {
    fn from(i: i32) -> Self {
        RawValue::Integer(i as i64)
    }
}

impl From<f64> for RawValue {
    fn from(x: f64) -> Self {
        RawValue::Float(x)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        RawValue::Bool(b)
    }
}

/// `pg_settings` exports write `setting` as text, hand-written snapshots
/// often as a number.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "setting must be a string or a number, got {}",
            other
        ))),
    }
}

/// Convert one JSON value, keeping shapes we do not recognize as text so
/// the rule that reads the parameter reports it as malformed.
fn raw_value(name: &str, value: Value) -> RawValue {
    match serde_json::from_value::<RawValue>(value.clone()) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("Unrecognized value for {}: {}", name, e);
            RawValue::Text(value.to_string())
        }
    }
}

/// One row of a `SELECT name, setting, unit FROM pg_settings` export.
#[derive(Debug, Deserialize)]
struct SettingRow {
    name: String,
    setting: Option<Value>,
    #[serde(default)]
    unit: Option<String>,
}

/// Mapping from parameter name to raw value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSnapshot {
    values: BTreeMap<String, RawValue>,
}

impl ParameterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, name: &str, value: impl Into<RawValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<RawValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a snapshot from JSON.
    ///
    /// Accepts either an object keyed by parameter name, or an array of
    /// `pg_settings` rows with `name`, `setting` and optional `unit`.
    /// `null` values are treated as absent.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let snapshot = match value {
            Value::Object(map) => {
                let mut values = BTreeMap::new();
                for (name, raw) in map {
                    if raw.is_null() {
                        continue;
                    }
                    let raw = raw_value(&name, raw);
                    values.insert(name, raw);
                }
                Self { values }
            }
            Value::Array(rows) => {
                let mut values = BTreeMap::new();
                for row in rows {
                    let row: SettingRow = serde_json::from_value(row)
                        .map_err(|e| AssessmentError::Snapshot(format!("settings row: {}", e)))?;
                    let Some(setting) = row.setting.filter(|v| !v.is_null()) else {
                        continue;
                    };
                    let setting = raw_value(&row.name, setting);
                    let raw = match row.unit.filter(|u| !u.trim().is_empty()) {
                        Some(unit) => RawValue::Setting {
                            setting: setting.to_string(),
                            unit: Some(unit),
                        },
                        None => setting,
                    };
                    values.insert(row.name, raw);
                }
                Self { values }
            }
            _ => {
                return Err(AssessmentError::Snapshot(
                    "expected a JSON object or an array of settings rows".to_string(),
                )
                .into())
            }
        };
        Ok(snapshot)
    }
}

/// Read a parameter snapshot from a JSON file on disk.
pub fn read_snapshot(path: &Path) -> Result<ParameterSnapshot> {
    let content = std::fs::read_to_string(path)?;
    let snapshot = ParameterSnapshot::from_json(&content)?;

    debug!(
        "Read snapshot with {} parameters from {:?}",
        snapshot.len(),
        path
    );

    Ok(snapshot)
}
