//! Bounded parallel probing of one region's sample.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::channel;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, warn};
use workerpool::thunk::{Thunk, ThunkWorker};
use workerpool::Pool;

use crate::error::ConfigError;
use crate::probe::{LatencyProbe, ProbeResult};

/// Default number of probes in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 16;

/// Runs probes on a fixed-size worker pool.
///
/// At most `limit` probes are in flight at any time. There is no deadline on
/// top of what the probe itself enforces, so a probe that never returns keeps
/// its worker busy for the rest of the run.
pub struct ProbeRunner {
    pool: Pool<ThunkWorker<ProbeResult>>,
    limit: usize,
}

impl ProbeRunner {
    pub fn new(limit: usize) -> Result<Self> {
        if limit == 0 {
            bail!(ConfigError::InvalidConcurrency);
        }
        Ok(ProbeRunner {
            pool: Pool::new(limit),
            limit,
        })
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Probe every address and return one result per address, in completion order.
    pub fn run(&self, addresses: Vec<String>, probe: &Arc<dyn LatencyProbe>) -> Vec<ProbeResult> {
        let expected = addresses.len();
        let (tx, rx) = channel();

        for address in addresses {
            let probe = Arc::clone(probe);
            self.pool.execute_to(
                tx.clone(),
                Thunk::of(move || probe_one(probe.as_ref(), address)),
            );
        }
        drop(tx);

        let results: Vec<ProbeResult> = rx.iter().take(expected).collect();
        if results.len() != expected {
            warn!(
                "Expected {} probe results, collected {}",
                expected,
                results.len()
            );
        }
        results
    }
}

fn probe_one(probe: &dyn LatencyProbe, address: String) -> ProbeResult {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| probe.probe(&address)));
    let result = match outcome {
        Ok(latency) => ProbeResult {
            address,
            latency_ms: latency.filter(|ms| ms.is_finite() && *ms >= 0.0),
        },
        Err(_) => {
            warn!("Probe for {} panicked, treating as unreachable", address);
            ProbeResult::unreachable(address)
        }
    };
    debug!("{}", result);
    result
}
