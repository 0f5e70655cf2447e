pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod host;
pub mod normalize;
pub mod report;
pub mod rules;
pub mod snapshot;

pub use config::{default_config, load_config, EngineConfig};
pub use engine::{AssessmentEngine, CheckResult, NameMatch, Priority, ResultSet, Status};
pub use error::AssessmentError;
pub use host::{DeploymentType, HostProfile, StorageType};
pub use snapshot::{read_snapshot, ParameterSnapshot, RawValue};

/// Log to stderr so stdout stays clean for reports. `RUST_LOG` overrides
/// the default `info` level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
