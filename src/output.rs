//! Result file writer.
//!
//! One file per provider, opened in append mode. Each region is rendered in
//! full and handed to a single `write_all`, so blocks from different regions
//! never interleave.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::error::ConfigError;
use crate::stats::RegionStats;

/// Marker written for a statistic with no reachable samples.
pub const NA: &str = "NA";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Txt,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Csv => "csv",
        }
    }

    /// Render one region as the exact bytes appended to the result file.
    pub fn render(&self, stats: &RegionStats) -> String {
        match self {
            OutputFormat::Txt => format!(
                "Timestamp: {}\nRegion: {}\nMin Latency: {}\nMax Latency: {}\nAvg Latency: {}\nReachable: {}/{}\n\n",
                stats.timestamp.format(TIMESTAMP_FORMAT),
                stats.region,
                with_unit(stats.min),
                with_unit(stats.max),
                with_unit(stats.avg),
                stats.reachable,
                stats.probed,
            ),
            OutputFormat::Csv => format!(
                "{},{},{},{}\n",
                stats.region,
                stat(stats.min),
                stat(stats.max),
                stat(stats.avg),
            ),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "txt" => Ok(OutputFormat::Txt),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn stat(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NA.to_string(),
    }
}

fn with_unit(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v} ms"),
        None => NA.to_string(),
    }
}

/// `<output_dir>/<provider>_latency_results.<ext>`
pub fn result_path(output_dir: &Path, provider: &str, format: OutputFormat) -> PathBuf {
    output_dir.join(format!(
        "{}_latency_results.{}",
        provider,
        format.extension()
    ))
}

/// Appends region results to a single file.
pub struct ResultWriter {
    file: File,
    path: PathBuf,
    format: OutputFormat,
}

impl ResultWriter {
    /// Open `path` for appending, creating it if needed. Existing content is kept.
    pub fn open(path: &Path, format: OutputFormat) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open result file {}", path.display()))?;
        Ok(ResultWriter {
            file,
            path: path.to_path_buf(),
            format,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&mut self, stats: &RegionStats) -> Result<()> {
        let block = self.format.render(stats);
        self.file
            .write_all(block.as_bytes())
            .and_then(|_| self.file.flush())
            .with_context(|| format!("Failed to append to {}", self.path.display()))
    }
}

/// One parsed line of a csv result file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    pub region: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
}

/// Parse a `region,min,max,avg` line. The region may itself contain commas.
pub fn parse_csv_line(line: &str) -> Option<CsvRecord> {
    let mut fields = line.trim_end_matches(['\r', '\n']).rsplitn(4, ',');
    let avg = parse_stat(fields.next()?)?;
    let max = parse_stat(fields.next()?)?;
    let min = parse_stat(fields.next()?)?;
    let region = fields.next()?.to_string();
    Some(CsvRecord {
        region,
        min,
        max,
        avg,
    })
}

/// `Some(None)` for the NA marker, `None` if the field is garbage.
fn parse_stat(field: &str) -> Option<Option<f64>> {
    let field = field.trim();
    if field == NA {
        return Some(None);
    }
    field.parse::<f64>().ok().map(Some)
}
