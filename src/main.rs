use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use regionping::probe::DEFAULT_PING_COUNT;
use regionping::runner::DEFAULT_CONCURRENCY;
use regionping::{build_probe, run, Config};

#[derive(Debug, Parser)]
#[command(name = "regionping")]
#[command(about = "Measure latency to sampled addresses in each cloud provider region")]
#[command(version)]
struct Command {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Provider IP range document (JSON)
    #[arg(short, long)]
    input: PathBuf,
    /// Provider schema of the input: google, aws or azure
    #[arg(short, long)]
    provider: Option<String>,
    /// Include IPv6 prefixes
    #[arg(long)]
    ipv6: bool,
    /// Directory for the result file
    #[arg(short, long, default_value = "Results")]
    output_dir: PathBuf,
    /// Result format: txt or csv
    #[arg(short, long, default_value = "txt")]
    format: String,
    /// Maximum probes in flight within a region
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,
    /// Echo requests sent per address
    #[arg(long, default_value_t = DEFAULT_PING_COUNT)]
    ping_count: u32,
    /// Probe with an external program instead of ping; it is called with the
    /// address as its last argument and must print "<address> <ms>" or "<address> N/A".
    /// Takes every following argument, so pass it last.
    #[arg(long, num_args = 1.., allow_hyphen_values = true, value_name = "PROGRAM")]
    probe_command: Option<Vec<String>>,
    /// Seed for the address sampling
    #[arg(long)]
    seed: Option<u64>,
    /// Do not draw a progress bar
    #[arg(long)]
    no_progress: bool,
}

impl From<Command> for Config {
    fn from(opts: Command) -> Self {
        Config {
            input: opts.input,
            provider: opts.provider,
            ipv6: opts.ipv6,
            output_dir: opts.output_dir,
            format: opts.format,
            concurrency: opts.concurrency,
            ping_count: opts.ping_count,
            probe_command: opts.probe_command,
            seed: opts.seed,
            progress: !opts.no_progress,
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let opts = Command::parse();
    init_logging(opts.verbose);

    let config = Config::from(opts);
    config.validate()?;
    let probe = build_probe(&config)?;

    let summary = run(&config, probe)?;
    info!(
        "Wrote {} of {} regions ({} skipped), {}/{} probes reachable",
        summary.regions_written,
        summary.regions_total,
        summary.regions_skipped,
        summary.probes_reachable,
        summary.probes_sent
    );
    println!("{}", summary.output_path.display());
    Ok(())
}
