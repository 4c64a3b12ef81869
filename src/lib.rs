//! regionping library - sample cloud provider IP ranges and measure latency per region.
//!
//! The `regionping` binary is a thin CLI over [`pipeline::run`].
//!
//! # Modules
//!
//! - [`provider`] - Provider JSON schemas flattened into prefix records
//! - [`sampler`] - Random per-region address sampling
//! - [`probe`] - Latency probes (`ping`, external programs)
//! - [`runner`] - Bounded parallel probing
//! - [`stats`] - Min/max/average aggregation
//! - [`output`] - Append-only txt/csv result files
//! - [`pipeline`] - Region-by-region orchestration
//!
//! # Example
//!
//! ```no_run
//! use regionping::{build_probe, run, Config};
//! use std::path::PathBuf;
//!
//! let config = Config {
//!     input: PathBuf::from("ip-ranges.json"),
//!     provider: Some("aws".to_string()),
//!     format: "csv".to_string(),
//!     ..Config::default()
//! };
//! let probe = build_probe(&config).expect("ping not installed");
//! let summary = run(&config, probe).expect("run failed");
//! println!("{}", summary.output_path.display());
//! ```

pub mod error;
pub mod output;
pub mod pipeline;
pub mod probe;
pub mod provider;
pub mod runner;
pub mod sampler;
pub mod stats;

// Re-export for convenience
pub use error::ConfigError;
pub use output::{parse_csv_line, CsvRecord, OutputFormat, ResultWriter};
pub use pipeline::{build_probe, run, Config, RunSummary};
pub use probe::{CommandProbe, LatencyProbe, PingProbe, ProbeResult};
pub use provider::{extract_prefixes, group_by_region, PrefixRecord, Provider};
pub use runner::ProbeRunner;
pub use sampler::{sample_size, RegionSampler};
pub use stats::RegionStats;
