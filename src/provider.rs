//! Provider schema adapters.
//!
//! Each cloud provider publishes its address ranges in a different JSON shape.
//! The adapters here flatten those documents into a uniform list of
//! [`PrefixRecord`]s, one per announced network block.
//!
//! Field paths per provider:
//!
//! - `google`: `prefixes[].scope` with `ipv4Prefix` and, when present, `ipv6Prefix`
//! - `aws`: `prefixes[].region`/`ip_prefix` plus `ipv6_prefixes[].region`/`ipv6_prefix`
//! - `azure`: `values[].properties.region` with `addressPrefixes`, and
//!   `ipv6AddressPrefixes` only when IPv6 is enabled
//!
//! Entries whose region or prefix is missing, null, empty or of the wrong JSON
//! type are dropped without an error, as are list entries that are not
//! objects. Only a list that is not a list at all fails the document.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use crate::error::ConfigError;

/// Cloud providers with a known range document schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Google,
    Aws,
    Azure,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Google => "google",
            Provider::Aws => "aws",
            Provider::Azure => "azure",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(Provider::Google),
            "aws" => Ok(Provider::Aws),
            "azure" => Ok(Provider::Azure),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// A single announced network block belonging to a region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrefixRecord {
    pub region: String,
    pub cidr: String,
    pub is_ipv6: bool,
}

impl PrefixRecord {
    fn new(region: String, cidr: String) -> Self {
        let is_ipv6 = looks_like_ipv6(&cidr);
        PrefixRecord {
            region,
            cidr,
            is_ipv6,
        }
    }
}

/// Address family check used throughout: anything containing a colon is IPv6.
pub fn looks_like_ipv6(prefix: &str) -> bool {
    prefix.contains(':')
}

// Lists are kept as raw values and each entry is converted on its own, so a
// malformed entry is dropped instead of failing the whole document.

#[derive(Deserialize)]
struct GoogleDocument {
    #[serde(default)]
    prefixes: Vec<Value>,
}

#[derive(Deserialize)]
struct GooglePrefix {
    #[serde(default, deserialize_with = "lenient_string")]
    scope: Option<String>,
    #[serde(default, rename = "ipv4Prefix", deserialize_with = "lenient_string")]
    ipv4_prefix: Option<String>,
    #[serde(default, rename = "ipv6Prefix", deserialize_with = "lenient_string")]
    ipv6_prefix: Option<String>,
}

#[derive(Deserialize)]
struct AwsDocument {
    #[serde(default)]
    prefixes: Vec<Value>,
    #[serde(default)]
    ipv6_prefixes: Vec<Value>,
}

#[derive(Deserialize)]
struct AwsPrefix {
    #[serde(default, deserialize_with = "lenient_string")]
    region: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    ip_prefix: Option<String>,
}

#[derive(Deserialize)]
struct AwsIpv6Prefix {
    #[serde(default, deserialize_with = "lenient_string")]
    region: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    ipv6_prefix: Option<String>,
}

#[derive(Deserialize)]
struct AzureDocument {
    #[serde(default)]
    values: Vec<Value>,
}

#[derive(Deserialize)]
struct AzureServiceTag {
    properties: Option<AzureProperties>,
}

#[derive(Deserialize)]
struct AzureProperties {
    #[serde(default, deserialize_with = "lenient_string")]
    region: Option<String>,
    #[serde(default, rename = "addressPrefixes", deserialize_with = "lenient_strings")]
    address_prefixes: Vec<Option<String>>,
    #[serde(default, rename = "ipv6AddressPrefixes", deserialize_with = "lenient_strings")]
    ipv6_address_prefixes: Vec<Option<String>>,
}

/// A string field; any other JSON type reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_string))
}

/// A list of strings; non-string elements read as absent.
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Option::<Vec<Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .iter()
        .map(|value| value.as_str().map(str::to_string))
        .collect())
}

/// Convert every entry that has the expected shape, skipping the rest.
fn entries<T: DeserializeOwned>(values: &[Value]) -> Vec<T> {
    let parsed: Vec<T> = values
        .iter()
        .filter_map(|value| T::deserialize(value).ok())
        .collect();
    if parsed.len() != values.len() {
        debug!("Skipped {} malformed entries", values.len() - parsed.len());
    }
    parsed
}

/// Collects records, skipping entries with an absent region or prefix.
#[derive(Default)]
struct RecordSink {
    records: Vec<PrefixRecord>,
}

impl RecordSink {
    fn push(&mut self, region: &Option<String>, prefix: &Option<String>) {
        let (Some(region), Some(prefix)) = (usable(region), usable(prefix)) else {
            return;
        };
        self.records
            .push(PrefixRecord::new(region.to_string(), prefix.to_string()));
    }
}

/// Trimmed value, or `None` if empty or carrying control characters that
/// would break a line-oriented result file.
fn usable(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && !s.chars().any(char::is_control))
}

/// Flatten a provider document into prefix records.
///
/// `include_ipv6` only changes the Azure adapter, which keeps its IPv6 ranges
/// in a separate list. Google and AWS records always carry both families and
/// the sampler filters them later.
pub fn extract_prefixes(
    document: &Value,
    provider: Provider,
    include_ipv6: bool,
) -> Result<Vec<PrefixRecord>> {
    let mut sink = RecordSink::default();

    match provider {
        Provider::Google => {
            let doc = GoogleDocument::deserialize(document)
                .context("Document does not match the google schema")?;
            for prefix in entries::<GooglePrefix>(&doc.prefixes) {
                sink.push(&prefix.scope, &prefix.ipv4_prefix);
                sink.push(&prefix.scope, &prefix.ipv6_prefix);
            }
        }
        Provider::Aws => {
            let doc = AwsDocument::deserialize(document)
                .context("Document does not match the aws schema")?;
            for prefix in entries::<AwsPrefix>(&doc.prefixes) {
                sink.push(&prefix.region, &prefix.ip_prefix);
            }
            for prefix in entries::<AwsIpv6Prefix>(&doc.ipv6_prefixes) {
                sink.push(&prefix.region, &prefix.ipv6_prefix);
            }
        }
        Provider::Azure => {
            let doc = AzureDocument::deserialize(document)
                .context("Document does not match the azure schema")?;
            let tags = entries::<AzureServiceTag>(&doc.values);
            for props in tags.iter().filter_map(|tag| tag.properties.as_ref()) {
                for prefix in &props.address_prefixes {
                    sink.push(&props.region, prefix);
                }
                if include_ipv6 {
                    for prefix in &props.ipv6_address_prefixes {
                        sink.push(&props.region, prefix);
                    }
                }
            }
        }
    }

    Ok(sink.records)
}

/// Group records by region. Keys are the distinct regions, in sorted order.
pub fn group_by_region(records: Vec<PrefixRecord>) -> BTreeMap<String, Vec<PrefixRecord>> {
    let mut regions: BTreeMap<String, Vec<PrefixRecord>> = BTreeMap::new();
    for record in records {
        regions.entry(record.region.clone()).or_default().push(record);
    }
    regions
}
