//! Region-by-region measurement pipeline.
//!
//! Regions are handled one after another: sample, probe, aggregate, append.
//! Probing inside a region is the only parallel part, which keeps the number
//! of probes in flight at the runner's limit and leaves the result file with
//! a single writer.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::output::{result_path, OutputFormat, ResultWriter};
use crate::probe::{CommandProbe, LatencyProbe, PingProbe, DEFAULT_PING_COUNT};
use crate::provider::{extract_prefixes, group_by_region, Provider};
use crate::runner::{ProbeRunner, DEFAULT_CONCURRENCY};
use crate::sampler::RegionSampler;
use crate::stats::RegionStats;

/// Runtime options for a measurement run, separate from CLI parsing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider range document (JSON)
    pub input: PathBuf,
    /// Provider tag: google, aws or azure
    pub provider: Option<String>,
    /// Probe IPv6 prefixes as well as IPv4
    pub ipv6: bool,
    /// Directory holding the result file
    pub output_dir: PathBuf,
    /// Result format: txt or csv
    pub format: String,
    /// Maximum probes in flight within a region
    pub concurrency: usize,
    /// Echo requests per ping probe
    pub ping_count: u32,
    /// External probe program and its leading arguments
    pub probe_command: Option<Vec<String>>,
    /// Seed for the sampling draw (random if unset)
    pub seed: Option<u64>,
    /// Show a progress bar on stderr
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: PathBuf::new(),
            provider: None,
            ipv6: false,
            output_dir: PathBuf::from("Results"),
            format: OutputFormat::Txt.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            ping_count: DEFAULT_PING_COUNT,
            probe_command: None,
            seed: None,
            progress: true,
        }
    }
}

impl Config {
    /// Check the settings that can be checked without touching the input.
    pub fn validate(&self) -> Result<(Provider, OutputFormat)> {
        let provider = self
            .provider
            .as_deref()
            .ok_or(ConfigError::MissingProvider)?
            .parse::<Provider>()?;
        let format = self.format.parse::<OutputFormat>()?;
        if self.concurrency == 0 {
            bail!(ConfigError::InvalidConcurrency);
        }
        Ok((provider, format))
    }
}

/// What a run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub regions_total: usize,
    pub regions_written: usize,
    pub regions_skipped: usize,
    pub probes_sent: usize,
    pub probes_reachable: usize,
}

/// Pick the configured probe and make sure the program it runs exists.
pub fn build_probe(config: &Config) -> Result<Arc<dyn LatencyProbe>> {
    match &config.probe_command {
        Some(command) => {
            let probe = CommandProbe::from_command_line(command)
                .ok_or_else(|| ConfigError::MissingTool(String::new()))?;
            probe.ensure_available()?;
            Ok(Arc::new(probe))
        }
        None => {
            PingProbe::ensure_available(config.ipv6)?;
            Ok(Arc::new(PingProbe::new(config.ping_count)))
        }
    }
}

fn progress_bar(config: &Config, regions: usize) -> Result<ProgressBar> {
    if !config.progress {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(regions as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} regions {msg}")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Measure every region in the input document and append results to the
/// provider's result file.
pub fn run(config: &Config, probe: Arc<dyn LatencyProbe>) -> Result<RunSummary> {
    let (provider, format) = config.validate()?;

    let raw = fs::read_to_string(&config.input)
        .with_context(|| format!("Failed to read {}", config.input.display()))?;
    let document: Value = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {} as JSON", config.input.display()))?;

    let records = extract_prefixes(&document, provider, config.ipv6)
        .with_context(|| format!("Failed to read prefixes from {}", config.input.display()))?;
    debug!("Extracted {} prefixes for {}", records.len(), provider);
    let regions = group_by_region(records);

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;
    let path = result_path(&config.output_dir, provider.as_str(), format);
    let mut writer = ResultWriter::open(&path, format)?;

    let runner = ProbeRunner::new(config.concurrency)?;
    let sampler = RegionSampler::new(config.ipv6);
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    info!(
        "Probing {} regions for {} with up to {} probes in flight",
        regions.len(),
        provider,
        runner.limit()
    );

    let pb = progress_bar(config, regions.len())?;
    let mut summary = RunSummary {
        output_path: path,
        regions_total: regions.len(),
        regions_written: 0,
        regions_skipped: 0,
        probes_sent: 0,
        probes_reachable: 0,
    };

    for (region, records) in &regions {
        pb.set_message(region.clone());

        let Some(addresses) = sampler.sample(records, &mut rng) else {
            pb.suspend(|| warn!("No addresses for region {}, skipping", region));
            summary.regions_skipped += 1;
            pb.inc(1);
            continue;
        };

        let results = runner.run(addresses, &probe);
        let stats = RegionStats::aggregate(region, &results);
        writer.write(&stats)?;

        pb.suspend(|| {
            info!(
                "{}: {}/{} reachable, avg {:?} ms",
                region, stats.reachable, stats.probed, stats.avg
            )
        });
        summary.probes_sent += stats.probed;
        summary.probes_reachable += stats.reachable;
        summary.regions_written += 1;
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(summary)
}
