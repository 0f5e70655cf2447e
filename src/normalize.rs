//! Unit/value normalization for raw parameter values.
//!
//! Every raw value a rule looks at passes through [`normalize`], which turns
//! memory strings, durations, integers, booleans and costs into canonical
//! values:
//!
//! - sizes in bytes (1 kB = 1024 bytes, PostgreSQL memory units)
//! - durations in milliseconds
//! - counts as integers, flags as booleans, costs as floats
//!
//! Bare numbers carry the parameter's own unit (`shared_buffers` counts 8kB
//! pages, `statement_timeout` milliseconds, `checkpoint_timeout` seconds),
//! so each [`Param`] declares its base unit.

use std::fmt;

use serde::Serialize;

use crate::error::AssessmentError;
use crate::snapshot::RawValue;

const KB: u64 = 1024;
const MB: u64 = 1024 * KB;
const GB: u64 = 1024 * MB;
const TB: u64 = 1024 * GB;

/// Memory suffixes, largest first so formatting picks the biggest even unit.
const BYTE_SUFFIXES: &[(&str, u64)] = &[("TB", TB), ("GB", GB), ("MB", MB), ("kB", KB), ("B", 1)];

/// Time suffixes in milliseconds, largest first.
const TIME_SUFFIXES: &[(&str, f64)] = &[
    ("d", 86_400_000.0),
    ("h", 3_600_000.0),
    ("min", 60_000.0),
    ("s", 1_000.0),
    ("ms", 1.0),
    ("us", 0.001),
];

/// Unit of a bare number for memory parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteUnit {
    Bytes,
    Kilobytes,
    /// 8kB blocks (`shared_buffers`, `effective_cache_size`).
    Pages,
    Megabytes,
}

impl ByteUnit {
    pub fn multiplier(self) -> u64 {
        match self {
            ByteUnit::Bytes => 1,
            ByteUnit::Kilobytes => KB,
            ByteUnit::Pages => 8 * KB,
            ByteUnit::Megabytes => MB,
        }
    }
}

/// Unit of a bare number for time parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
}

impl TimeUnit {
    pub fn millis(self) -> f64 {
        match self {
            TimeUnit::Milliseconds => 1.0,
            TimeUnit::Seconds => 1_000.0,
            TimeUnit::Minutes => 60_000.0,
        }
    }
}

/// What kind of value a parameter holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnitKind {
    Bytes(ByteUnit),
    Duration(TimeUnit),
    Count,
    Boolean,
    Cost,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitKind::Bytes(_) => f.write_str("bytes"),
            UnitKind::Duration(_) => f.write_str("duration"),
            UnitKind::Count => f.write_str("count"),
            UnitKind::Boolean => f.write_str("boolean"),
            UnitKind::Cost => f.write_str("cost"),
        }
    }
}

/// Declaration of one rule input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Param {
    pub name: &'static str,
    pub kind: UnitKind,
    /// Absence is an error (via the malformed-value path) rather than `Unset`.
    pub required: bool,
    /// Raw magnitude meaning "disabled" (`0` for timeouts, `-1` for log_temp_files).
    pub disabled_at: Option<i64>,
}

impl Param {
    pub const fn required(name: &'static str, kind: UnitKind) -> Self {
        Self {
            name,
            kind,
            required: true,
            disabled_at: None,
        }
    }

    pub const fn optional(name: &'static str, kind: UnitKind) -> Self {
        Self {
            name,
            kind,
            required: false,
            disabled_at: None,
        }
    }

    pub const fn disabled_at(mut self, sentinel: i64) -> Self {
        self.disabled_at = Some(sentinel);
        self
    }
}

/// A canonical parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Normalized {
    /// Key absent from the snapshot.
    Unset,
    /// Sentinel value meaning the feature is switched off.
    Disabled,
    Bytes(u64),
    Millis(f64),
    Count(i64),
    Flag(bool),
    Cost(f64),
}

impl fmt::Display for Normalized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalized::Unset => f.write_str("unset"),
            Normalized::Disabled => f.write_str("disabled"),
            Normalized::Bytes(b) => f.write_str(&format_bytes(*b)),
            Normalized::Millis(ms) => f.write_str(&format_duration(*ms)),
            Normalized::Count(n) => write!(f, "{}", n),
            Normalized::Flag(true) => f.write_str("on"),
            Normalized::Flag(false) => f.write_str("off"),
            Normalized::Cost(c) => write!(f, "{}", c),
        }
    }
}

/// Normalize the raw value of `param`; `raw` is `None` when the key is absent.
pub fn normalize(param: &Param, raw: Option<&RawValue>) -> Result<Normalized, AssessmentError> {
    let Some(raw) = raw else {
        return if param.required {
            Err(AssessmentError::MissingParameter {
                parameter: param.name.to_string(),
            })
        } else {
            Ok(Normalized::Unset)
        };
    };

    let malformed = || AssessmentError::malformed(param.name, raw.to_string());

    match param.kind {
        UnitKind::Boolean => parse_flag(raw).map(Normalized::Flag).ok_or_else(malformed),
        UnitKind::Bytes(base) => {
            let Some((magnitude, suffix)) = numeric(param, raw)? else {
                return Ok(Normalized::Disabled);
            };
            scale_bytes(magnitude, &suffix, base)
                .map(Normalized::Bytes)
                .ok_or_else(malformed)
        }
        UnitKind::Duration(base) => {
            let Some((magnitude, suffix)) = numeric(param, raw)? else {
                return Ok(Normalized::Disabled);
            };
            scale_duration(magnitude, &suffix, base)
                .map(Normalized::Millis)
                .ok_or_else(malformed)
        }
        UnitKind::Count => {
            let Some((magnitude, suffix)) = numeric(param, raw)? else {
                return Ok(Normalized::Disabled);
            };
            if !suffix.is_empty() || magnitude.fract() != 0.0 {
                return Err(malformed());
            }
            Ok(Normalized::Count(magnitude as i64))
        }
        UnitKind::Cost => {
            let Some((magnitude, suffix)) = numeric(param, raw)? else {
                return Ok(Normalized::Disabled);
            };
            if !suffix.is_empty() {
                return Err(malformed());
            }
            Ok(Normalized::Cost(magnitude))
        }
    }
}

/// Magnitude and suffix of a numeric raw value, or `None` when it hits the
/// parameter's disabled sentinel.
fn numeric(param: &Param, raw: &RawValue) -> Result<Option<(f64, String)>, AssessmentError> {
    let (magnitude, suffix) =
        split_raw(raw).ok_or_else(|| AssessmentError::malformed(param.name, raw.to_string()))?;
    match param.disabled_at {
        Some(sentinel) if magnitude == sentinel as f64 => Ok(None),
        _ => Ok(Some((magnitude, suffix))),
    }
}

/// Bytes for a magnitude and suffix; an empty suffix means `base`.
fn scale_bytes(magnitude: f64, suffix: &str, base: ByteUnit) -> Option<u64> {
    if magnitude < 0.0 {
        return None;
    }
    let multiplier = if suffix.is_empty() {
        base.multiplier()
    } else {
        byte_multiplier(suffix)?
    };
    Some((magnitude * multiplier as f64).round() as u64)
}

/// Milliseconds for a magnitude and suffix; an empty suffix means `base`.
fn scale_duration(magnitude: f64, suffix: &str, base: TimeUnit) -> Option<f64> {
    if magnitude < 0.0 {
        return None;
    }
    let multiplier = if suffix.is_empty() {
        base.millis()
    } else {
        time_multiplier(suffix)?
    };
    Some(magnitude * multiplier)
}

/// Render bytes in the largest memory unit that divides them evenly.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0".to_string();
    }
    for (suffix, size) in BYTE_SUFFIXES {
        if bytes % size == 0 {
            return format!("{}{}", bytes / size, suffix);
        }
    }
    format!("{}B", bytes)
}

/// Render milliseconds in the largest time unit that divides them evenly.
pub fn format_duration(ms: f64) -> String {
    if ms == 0.0 {
        return "0".to_string();
    }
    if ms.fract() == 0.0 {
        for (suffix, size) in TIME_SUFFIXES.iter().take(5) {
            if ms % size == 0.0 {
                return format!("{}{}", ms / size, suffix);
            }
        }
    }
    format!("{}ms", ms)
}

/// Split a raw value into its numeric magnitude and unit suffix.
/// For `pg_settings` pairs the unit stands in for a missing suffix.
fn split_raw(raw: &RawValue) -> Option<(f64, String)> {
    match raw {
        RawValue::Integer(i) => Some((*i as f64, String::new())),
        RawValue::Float(x) if x.is_finite() => Some((*x, String::new())),
        RawValue::Float(_) | RawValue::Bool(_) => None,
        RawValue::Text(s) => split_number(s).map(|(m, suffix)| (m, suffix.to_string())),
        RawValue::Setting { setting, unit } => {
            let (magnitude, suffix) = split_number(setting)?;
            if suffix.is_empty() {
                let unit = unit.as_deref().map(str::trim).unwrap_or("");
                Some((magnitude, unit.to_string()))
            } else {
                Some((magnitude, suffix.to_string()))
            }
        }
    }
}

fn split_number(raw: &str) -> Option<(f64, &str)> {
    let s = raw.trim();
    let idx = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(s.len());
    let (number, suffix) = s.split_at(idx);
    let magnitude: f64 = number.trim().parse().ok()?;
    if !magnitude.is_finite() {
        return None;
    }
    Some((magnitude, suffix.trim()))
}

/// Multiplier for a memory unit; accepts scaled units such as `8kB` or `16MB`.
fn byte_multiplier(unit: &str) -> Option<u64> {
    let (count, suffix) = split_unit_count(unit)?;
    let size = BYTE_SUFFIXES
        .iter()
        .find(|(s, _)| *s == suffix)
        .map(|(_, size)| *size)?;
    Some(count * size)
}

/// Multiplier in milliseconds for a time unit such as `s` or `min`.
fn time_multiplier(unit: &str) -> Option<f64> {
    let (count, suffix) = split_unit_count(unit)?;
    let size = TIME_SUFFIXES
        .iter()
        .find(|(s, _)| *s == suffix)
        .map(|(_, size)| *size)?;
    Some(count as f64 * size)
}

fn split_unit_count(unit: &str) -> Option<(u64, &str)> {
    let unit = unit.trim();
    let idx = unit
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unit.len());
    let (count, suffix) = unit.split_at(idx);
    let count = if count.is_empty() { 1 } else { count.parse().ok()? };
    Some((count, suffix.trim()))
}

fn parse_flag(raw: &RawValue) -> Option<bool> {
    match raw {
        RawValue::Bool(b) => Some(*b),
        RawValue::Integer(1) => Some(true),
        RawValue::Integer(0) => Some(false),
        RawValue::Text(s) | RawValue::Setting { setting: s, .. } => {
            match s.trim().to_lowercase().as_str() {
                "on" | "true" | "yes" | "1" => Some(true),
                "off" | "false" | "no" | "0" => Some(false),
                _ => None,
            }
        }
        _ => None,
    }
}
