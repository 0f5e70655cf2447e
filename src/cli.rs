//! Command-line interface: `assess` a snapshot file or list the `rules`.
//!
//! Exit codes: 0 no failures, 1 failures without HIGH, 2 at least one HIGH
//! failure, 3 usage or input errors.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};

use crate::config::resolve_config;
use crate::engine::{AssessmentEngine, NameMatch, Priority, ResultSet, Summary};
use crate::host::{DeploymentType, HostProfile, StorageType};
use crate::report::{self, Format};
use crate::snapshot::read_snapshot;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

pub const EXIT_OK: i32 = 0;
pub const EXIT_FAILURES: i32 = 1;
pub const EXIT_HIGH_FAILURES: i32 = 2;
pub const EXIT_USAGE: i32 = 3;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    after_help = r#"Examples:
  # Assess an exported pg_settings snapshot on this machine's hardware
  pgconf-audit assess --snapshot settings.json

  # Assess for a specific host with a 5 minute recovery objective
  pgconf-audit assess --snapshot settings.json --cpu-count 32 --memory-gb 128 --desired-rto 5

  # Only HIGH failures, as CSV
  pgconf-audit assess --snapshot settings.json --hide-passed --priority high --format csv

  # List the checks in evaluation order
  pgconf-audit rules"#
)]
pub struct Cli {
    /// Thresholds file (default: <config dir>/pgconf-audit/thresholds.toml, then built-in)
    #[arg(long, value_name = "CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Assess a parameter snapshot against the host profile
    Assess(AssessArgs),
    /// List the rule catalog in evaluation order
    Rules,
}

#[derive(clap::Args, Debug)]
pub struct AssessArgs {
    /// JSON snapshot: an object of name -> value, or an array of pg_settings rows
    #[arg(long, short = 's', value_name = "FILE")]
    pub snapshot: PathBuf,

    /// CPU count (detected when omitted)
    #[arg(long, value_name = "N")]
    pub cpu_count: Option<u32>,

    /// Total memory in GB (detected when omitted)
    #[arg(long, value_name = "GB")]
    pub memory_gb: Option<f64>,

    /// Storage type: ssd or hdd
    #[arg(long, default_value = "ssd")]
    pub storage_type: StorageType,

    /// Deployment type: onprem or rds
    #[arg(long, default_value = "onprem")]
    pub deployment_type: DeploymentType,

    /// Desired recovery time objective in minutes
    #[arg(long, value_name = "MINUTES")]
    pub desired_rto: Option<f64>,

    /// Output format: table, csv or json
    #[arg(long, short = 'f', default_value = "table")]
    pub format: Format,

    /// Show only failed checks
    #[arg(long)]
    pub hide_passed: bool,

    /// Keep only these priorities (repeatable)
    #[arg(long = "priority", value_name = "PRIORITY")]
    pub priorities: Vec<Priority>,

    /// Keep only parameters containing NAME (repeatable)
    #[arg(long = "parameter", value_name = "NAME")]
    pub parameters: Vec<String>,

    /// Match --parameter names exactly instead of by substring
    #[arg(long)]
    pub exact: bool,

    /// Order by priority (HIGH first) instead of catalog order
    #[arg(long)]
    pub sort_by_priority: bool,
}

/// Run a parsed command line; returns the process exit code.
pub fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Assess(args) => assess(cli.config.as_deref(), &args),
        Commands::Rules => {
            let engine = AssessmentEngine::with_defaults();
            println!("{}", report::render_catalog(engine.rules()));
            Ok(EXIT_OK)
        }
    }
}

fn assess(config_path: Option<&Path>, args: &AssessArgs) -> Result<i32> {
    let config = resolve_config(config_path)?;
    let engine = AssessmentEngine::new(config)?;

    let snapshot = read_snapshot(&args.snapshot)
        .with_context(|| format!("Failed to read snapshot {:?}", args.snapshot))?;
    let host = host_profile(args);

    let results = engine.run(&snapshot, &host)?;
    let shown = apply_view(&results, args);
    debug!("Showing {} of {} results", shown.len(), results.len());

    println!("{}", report::render(args.format, &shown, &host)?);
    Ok(exit_code(&shown.summary()))
}

/// Host profile from flags, detecting CPU count and memory when omitted.
pub fn host_profile(args: &AssessArgs) -> HostProfile {
    let cpu_count = args.cpu_count.unwrap_or_else(|| {
        let detected = num_cpus::get() as u32;
        info!("Detected {} CPUs", detected);
        detected
    });
    let memory_bytes = match args.memory_gb {
        Some(gb) if gb.is_finite() && gb > 0.0 => (gb * GIB).round() as u64,
        Some(_) => 0,
        None => detect_memory_bytes(),
    };

    let mut host = HostProfile::new(cpu_count, memory_bytes)
        .storage(args.storage_type)
        .deployment(args.deployment_type);
    if let Some(rto) = args.desired_rto {
        host = host.rto_minutes(rto);
    }
    host
}

fn detect_memory_bytes() -> u64 {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    info!("Detected {:.1}GB of memory", total as f64 / GIB);
    total
}

/// Filters and ordering requested on the command line.
pub fn apply_view(results: &ResultSet, args: &AssessArgs) -> ResultSet {
    let mut view = if args.hide_passed {
        results.without_passed()
    } else {
        results.clone()
    };
    if !args.priorities.is_empty() {
        view = view.filter_by_priorities(&args.priorities);
    }
    if !args.parameters.is_empty() {
        let matching = if args.exact {
            NameMatch::Exact
        } else {
            NameMatch::Substring
        };
        view = view.filter_by_parameters(&args.parameters, matching);
    }
    if args.sort_by_priority {
        view = view.sorted_by_priority();
    }
    view
}

pub fn exit_code(summary: &Summary) -> i32 {
    if summary.failed_high > 0 {
        EXIT_HIGH_FAILURES
    } else if summary.failed > 0 {
        EXIT_FAILURES
    } else {
        EXIT_OK
    }
}
