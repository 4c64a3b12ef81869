//! Latency probes.
//!
//! A probe takes one address and returns the round-trip latency in
//! milliseconds, or `None` when the address could not be measured. Probes
//! never fail loudly: a host that is down, a program that crashes, or output
//! that cannot be parsed all count as unreachable.
//!
//! Results travel as single lines of the form `<address> <latency-ms>` or
//! `<address> N/A`, which is also the contract for external probe programs.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;
use crate::provider::looks_like_ipv6;

/// Marker written in place of a latency when an address was unreachable.
pub const UNREACHABLE: &str = "N/A";

/// Default number of echo requests per probe.
pub const DEFAULT_PING_COUNT: u32 = 3;

/// Matches the summary line of iputils, BSD and BusyBox ping, capturing the average.
/// Linux:   rtt min/avg/max/mdev = 11.021/12.345/14.002/1.101 ms
/// macOS:   round-trip min/avg/max/stddev = 11.021/12.345/14.002/1.101 ms
/// BusyBox: round-trip min/avg/max = 11.021/12.345/14.002 ms
static PING_SUMMARY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:rtt|round-trip) min/avg/max(?:/(?:mdev|stddev))? = [\d.]+/([\d.]+)/")
        .expect("Invalid ping summary regex pattern")
});

/// Outcome of probing a single address.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub address: String,
    /// Round-trip latency in milliseconds, `None` if unreachable.
    pub latency_ms: Option<f64>,
}

impl ProbeResult {
    pub fn reachable(address: impl Into<String>, latency_ms: f64) -> Self {
        ProbeResult {
            address: address.into(),
            latency_ms: Some(latency_ms),
        }
    }

    pub fn unreachable(address: impl Into<String>) -> Self {
        ProbeResult {
            address: address.into(),
            latency_ms: None,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.latency_ms.is_some()
    }

    /// Parse a `<address> <latency>` line.
    ///
    /// Returns `None` for a blank line. A missing, non-numeric, negative or
    /// non-finite latency is read as unreachable.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let address = fields.next()?;
        let latency_ms = fields.next().and_then(parse_latency);
        Some(ProbeResult {
            address: address.to_string(),
            latency_ms,
        })
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.latency_ms {
            Some(latency) => write!(f, "{} {}", self.address, latency),
            None => write!(f, "{} {}", self.address, UNREACHABLE),
        }
    }
}

fn parse_latency(field: &str) -> Option<f64> {
    if field == UNREACHABLE {
        return None;
    }
    let field = field.strip_suffix("ms").unwrap_or(field);
    field
        .parse::<f64>()
        .ok()
        .filter(|latency| latency.is_finite() && *latency >= 0.0)
}

/// A single-address latency measurement.
pub trait LatencyProbe: Send + Sync {
    fn probe(&self, address: &str) -> Option<f64>;
}

/// Pull the average round-trip time out of ping's output.
pub fn parse_ping_average(output: &str) -> Option<f64> {
    let caps = PING_SUMMARY_RE.captures(output)?;
    parse_latency(caps.get(1)?.as_str())
}

/// Probe using the system `ping` program.
#[derive(Debug, Clone)]
pub struct PingProbe {
    count: u32,
}

impl PingProbe {
    pub fn new(count: u32) -> Self {
        PingProbe {
            count: count.max(1),
        }
    }

    fn program(address: &str) -> &'static str {
        if cfg!(target_os = "macos") && looks_like_ipv6(address) {
            "ping6"
        } else {
            "ping"
        }
    }

    /// Fail if the programs this probe runs are not installed.
    pub fn ensure_available(include_ipv6: bool) -> Result<()> {
        find_in_path("ping").ok_or_else(|| ConfigError::MissingTool("ping".to_string()))?;
        if include_ipv6 && cfg!(target_os = "macos") {
            find_in_path("ping6").ok_or_else(|| ConfigError::MissingTool("ping6".to_string()))?;
        }
        Ok(())
    }
}

impl Default for PingProbe {
    fn default() -> Self {
        PingProbe::new(DEFAULT_PING_COUNT)
    }
}

impl LatencyProbe for PingProbe {
    fn probe(&self, address: &str) -> Option<f64> {
        let mut cmd = Command::new(Self::program(address));
        cmd.arg("-c").arg(self.count.to_string());
        if cfg!(target_os = "linux") && looks_like_ipv6(address) {
            cmd.arg("-6");
        }
        cmd.arg(address).stdin(Stdio::null()).stderr(Stdio::null());

        let output = match cmd.output() {
            Ok(output) => output,
            Err(err) => {
                debug!("Failed to run ping for {}: {}", address, err);
                return None;
            }
        };
        if !output.status.success() {
            return None;
        }
        parse_ping_average(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Probe by running an external program that prints one result line.
///
/// The address is appended as the last argument. Only the first non-blank
/// line of stdout is read; its latency field decides the outcome.
#[derive(Debug, Clone)]
pub struct CommandProbe {
    program: String,
    args: Vec<String>,
}

impl CommandProbe {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        CommandProbe {
            program: program.into(),
            args,
        }
    }

    /// Build from a command line, first element being the program.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(CommandProbe::new(program.clone(), args.to_vec()))
    }

    pub fn ensure_available(&self) -> Result<()> {
        let program = PathBuf::from(&self.program);
        if program.components().count() > 1 {
            if !program.is_file() {
                bail!(ConfigError::MissingTool(self.program.clone()));
            }
        } else if find_in_path(&self.program).is_none() {
            bail!(ConfigError::MissingTool(self.program.clone()));
        }
        Ok(())
    }
}

impl LatencyProbe for CommandProbe {
    fn probe(&self, address: &str) -> Option<f64> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(address)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output();
        let output = match output {
            Ok(output) => output,
            Err(err) => {
                debug!("Failed to run {} for {}: {}", self.program, address, err);
                return None;
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .lines()
            .find_map(ProbeResult::parse_line)
            .and_then(|result| result.latency_ms)
    }
}

fn find_in_path(program: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
