//! Per-region address sampling.
//!
//! Probing every announced block would take hours for the larger providers,
//! so each region is represented by a random subset of its base addresses.

use std::collections::HashSet;

use rand::seq::IndexedRandom;
use rand::RngCore;

use crate::provider::{looks_like_ipv6, PrefixRecord};

/// Smallest sample drawn from a region, unless the region has fewer addresses.
pub const MIN_SAMPLE_SIZE: usize = 3;

/// Number of addresses drawn from a region holding `available` addresses.
///
/// This is `max(3, floor(0.2 * available))`, capped at `available` so that a
/// region with one or two addresses is probed in full.
pub fn sample_size(available: usize) -> usize {
    (available / 5).max(MIN_SAMPLE_SIZE).min(available)
}

/// Strip the `/N` length from a prefix, leaving the base address.
pub fn base_address(prefix: &str) -> Option<&str> {
    let address = match prefix.split_once('/') {
        Some((address, _)) => address,
        None => prefix,
    };
    let address = address.trim();
    if address.is_empty() {
        None
    } else {
        Some(address)
    }
}

/// Base addresses for a region's records, in record order with duplicates removed.
pub fn extract_addresses(records: &[PrefixRecord], include_ipv6: bool) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| include_ipv6 || !(record.is_ipv6 || looks_like_ipv6(&record.cidr)))
        .filter_map(|record| base_address(&record.cidr))
        .filter(|address| seen.insert(*address))
        .map(str::to_string)
        .collect()
}

/// Draws address samples for one region at a time.
pub struct RegionSampler {
    include_ipv6: bool,
}

impl RegionSampler {
    pub fn new(include_ipv6: bool) -> Self {
        RegionSampler { include_ipv6 }
    }

    /// Draw a fresh sample for the given records.
    ///
    /// Every draw is independent; calling this twice gives two unrelated
    /// samples. Returns `None` when the records yield no usable address, in
    /// which case the region should be skipped.
    pub fn sample(&self, records: &[PrefixRecord], rng: &mut dyn RngCore) -> Option<Vec<String>> {
        let addresses = extract_addresses(records, self.include_ipv6);
        if addresses.is_empty() {
            return None;
        }

        let amount = sample_size(addresses.len());
        Some(addresses.choose_multiple(rng, amount).cloned().collect())
    }
}
