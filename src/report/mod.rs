//! Rendering of result sets: table, CSV and JSON.
//!
//! Renderers take an already filtered/sorted [`ResultSet`] and never look
//! at rule internals; every literal they print comes from the results.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::engine::{ResultSet, Summary};
use crate::host::HostProfile;

mod csv;
mod table;

pub use self::csv::render_csv;
pub use self::table::{render_catalog, render_table};

pub const EMPTY_MESSAGE: &str = "No results match the specified criteria.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Table,
    Csv,
    Json,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "table" => Ok(Format::Table),
            "csv" => Ok(Format::Csv),
            "json" => Ok(Format::Json),
            other => Err(format!("unknown format '{}' (use table, csv or json)", other)),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Table => "table",
            Format::Csv => "csv",
            Format::Json => "json",
        })
    }
}

/// JSON document wrapping the results with the run context.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub generated_at: DateTime<Utc>,
    pub host: &'a HostProfile,
    pub summary: Summary,
    pub results: &'a ResultSet,
}

impl<'a> Report<'a> {
    pub fn new(results: &'a ResultSet, host: &'a HostProfile) -> Self {
        Self {
            generated_at: Utc::now(),
            host,
            summary: results.summary(),
            results,
        }
    }
}

pub fn render_json(results: &ResultSet, host: &HostProfile) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Report::new(results, host))?)
}

/// Render `results` in the requested format.
pub fn render(format: Format, results: &ResultSet, host: &HostProfile) -> Result<String> {
    match format {
        Format::Table => Ok(render_table(results, host)),
        Format::Csv => Ok(render_csv(results)),
        Format::Json => render_json(results, host),
    }
}
