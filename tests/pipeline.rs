//! End-to-end pipeline tests with an in-process probe.

mod common;

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;

use common::{write_document, ScriptedProbe, AWS_DOCUMENT};
use regionping::{parse_csv_line, run, Config, LatencyProbe};
use tempfile::TempDir;

fn csv_config(dir: &TempDir, input: std::path::PathBuf, provider: &str) -> Config {
    Config {
        input,
        provider: Some(provider.to_string()),
        output_dir: dir.path().join("Results"),
        format: "csv".to_string(),
        concurrency: 1,
        seed: Some(11),
        progress: false,
        ..Config::default()
    }
}

#[test]
fn test_aws_region_min_max_avg() {
    let dir = TempDir::new().unwrap();
    let input = write_document(dir.path(), "ip-ranges.json", AWS_DOCUMENT);
    let config = csv_config(&dir, input, "aws");

    let probe = Arc::new(ScriptedProbe::new(&[Some(20.0), Some(30.0), Some(40.0)]));
    let summary = run(&config, probe.clone()).unwrap();

    assert_eq!(summary.regions_written, 1);
    assert_eq!(summary.probes_sent, 3);

    let seen = probe.seen.lock().unwrap().clone();
    let unique: HashSet<&String> = seen.iter().collect();
    assert_eq!(seen.len(), 3);
    assert_eq!(unique.len(), 3);
    let candidates: HashSet<String> = (0..5).map(|i| format!("10.0.{i}.0")).collect();
    assert!(seen.iter().all(|addr| candidates.contains(addr)));

    let content = fs::read_to_string(&summary.output_path).unwrap();
    assert_eq!(content, "us-east-1,20,40,30\n");
}

#[test]
fn test_unreachable_region_writes_na() {
    let dir = TempDir::new().unwrap();
    let input = write_document(dir.path(), "ip-ranges.json", AWS_DOCUMENT);
    let config = csv_config(&dir, input, "aws");

    let probe: Arc<dyn LatencyProbe> = Arc::new(ScriptedProbe::new(&[]));
    let summary = run(&config, probe).unwrap();
    assert_eq!(summary.probes_reachable, 0);

    let content = fs::read_to_string(&summary.output_path).unwrap();
    assert_eq!(content, "us-east-1,NA,NA,NA\n");
    let record = parse_csv_line(content.lines().next().unwrap()).unwrap();
    assert_eq!(record.region, "us-east-1");
    assert_eq!((record.min, record.max, record.avg), (None, None, None));
}

#[test]
fn test_results_are_appended_across_runs() {
    let dir = TempDir::new().unwrap();
    let input = write_document(dir.path(), "ip-ranges.json", AWS_DOCUMENT);
    let config = csv_config(&dir, input, "aws");

    run(&config, Arc::new(ScriptedProbe::new(&[Some(5.0); 3]))).unwrap();
    let summary = run(&config, Arc::new(ScriptedProbe::new(&[Some(8.0); 3]))).unwrap();

    let content = fs::read_to_string(&summary.output_path).unwrap();
    assert_eq!(content, "us-east-1,5,5,5\nus-east-1,8,8,8\n");
}

#[test]
fn test_google_txt_blocks() {
    let dir = TempDir::new().unwrap();
    let input = write_document(
        dir.path(),
        "cloud.json",
        r#"{
            "syncToken": "1717000000",
            "creationTime": "2024-05-29T12:00:00",
            "prefixes": [
                { "ipv4Prefix": "34.1.208.0/20", "service": "Google Cloud", "scope": "africa-south1" },
                { "ipv6Prefix": "2600:1900:8000::/44", "service": "Google Cloud", "scope": "africa-south1" },
                { "ipv4Prefix": "34.35.0.0/16", "service": "Google Cloud", "scope": "europe-west1" },
                { "ipv6Prefix": "2600:1900:4000::/44", "service": "Google Cloud", "scope": "me-west1" }
            ]
        }"#,
    );
    let config = Config {
        format: "txt".to_string(),
        ..csv_config(&dir, input, "google")
    };

    let probe = Arc::new(ScriptedProbe::new(&[Some(12.5), None]));
    let summary = run(&config, probe.clone()).unwrap();

    assert_eq!(summary.regions_total, 3);
    assert_eq!(summary.regions_written, 2);
    assert_eq!(summary.regions_skipped, 1);
    assert!(summary
        .output_path
        .ends_with("Results/google_latency_results.txt"));
    assert!(probe
        .seen
        .lock()
        .unwrap()
        .iter()
        .all(|addr| !addr.contains(':')));

    let content = fs::read_to_string(&summary.output_path).unwrap();
    let blocks: Vec<&str> = content.split("\n\n").filter(|b| !b.is_empty()).collect();
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].contains("Region: africa-south1\n"));
    assert!(blocks[0].contains("Min Latency: 12.5 ms\n"));
    assert!(blocks[0].starts_with("Timestamp: "));
    assert!(blocks[1].contains("Region: europe-west1\n"));
    assert!(blocks[1].contains("Avg Latency: NA\n"));
}

#[test]
fn test_azure_ipv6_enabled() {
    let dir = TempDir::new().unwrap();
    let input = write_document(
        dir.path(),
        "ServiceTags_Public.json",
        r#"{
            "changeNumber": 300,
            "cloud": "Public",
            "values": [
                {
                    "name": "AzureCloud.eastus",
                    "id": "AzureCloud.eastus",
                    "properties": {
                        "region": "eastus",
                        "addressPrefixes": [],
                        "ipv6AddressPrefixes": ["2603:1030:210::/47"]
                    }
                }
            ]
        }"#,
    );

    let mut config = csv_config(&dir, input, "azure");
    let probe = Arc::new(ScriptedProbe::new(&[Some(3.0)]));
    let summary = run(&config, probe).unwrap();
    assert_eq!(summary.regions_total, 0);

    config.ipv6 = true;
    let probe = Arc::new(ScriptedProbe::new(&[Some(3.0)]));
    let summary = run(&config, probe.clone()).unwrap();
    assert_eq!(summary.regions_written, 1);
    assert_eq!(
        probe.seen.lock().unwrap().as_slice(),
        &["2603:1030:210::".to_string()]
    );

    let content = fs::read_to_string(&summary.output_path).unwrap();
    assert_eq!(content, "eastus,3,3,3\n");
}
