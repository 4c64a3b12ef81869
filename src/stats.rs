//! Per-region latency aggregation.

use chrono::{DateTime, Local};

use crate::probe::ProbeResult;

/// Aggregated latency for one region.
///
/// The statistics are `None` when no probe in the region got a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionStats {
    pub region: String,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    /// Number of probes that returned a latency.
    pub reachable: usize,
    /// Number of probes sent.
    pub probed: usize,
    pub timestamp: DateTime<Local>,
}

impl RegionStats {
    /// Aggregate results, stamped with the current local time.
    pub fn aggregate(region: &str, results: &[ProbeResult]) -> Self {
        Self::aggregate_at(region, results, Local::now())
    }

    pub fn aggregate_at(region: &str, results: &[ProbeResult], timestamp: DateTime<Local>) -> Self {
        let latencies: Vec<f64> = results.iter().filter_map(|r| r.latency_ms).collect();

        let (min, max, avg) = if latencies.is_empty() {
            (None, None, None)
        } else {
            let min = latencies.iter().copied().fold(f64::INFINITY, f64::min);
            let max = latencies.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let avg = latencies.iter().sum::<f64>() / latencies.len() as f64;
            // Summation rounding can push the mean a hair outside [min, max].
            (Some(min), Some(max), Some(avg.clamp(min, max)))
        };

        RegionStats {
            region: region.to_string(),
            min,
            max,
            avg,
            reachable: latencies.len(),
            probed: results.len(),
            timestamp,
        }
    }

    pub fn has_data(&self) -> bool {
        self.avg.is_some()
    }
}
