//! Common test utilities for regionping integration tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use regionping::LatencyProbe;

/// Hands out latencies in call order; `None` entries mean unreachable.
/// Once the script runs out every probe is unreachable.
#[allow(dead_code)]
pub struct ScriptedProbe {
    script: Mutex<VecDeque<Option<f64>>>,
    pub seen: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedProbe {
    pub fn new(script: &[Option<f64>]) -> Self {
        ScriptedProbe {
            script: Mutex::new(script.iter().copied().collect()),
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl LatencyProbe for ScriptedProbe {
    fn probe(&self, address: &str) -> Option<f64> {
        self.seen.lock().unwrap().push(address.to_string());
        self.script.lock().unwrap().pop_front().flatten()
    }
}

/// Write a JSON document into `dir` and return its path.
pub fn write_document(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).expect("Failed to write test document");
    path
}

#[allow(dead_code)]
pub const AWS_DOCUMENT: &str = r#"{
    "syncToken": "1717000000",
    "createDate": "2024-05-29-12-00-00",
    "prefixes": [
        { "ip_prefix": "10.0.0.0/24", "region": "us-east-1", "service": "AMAZON" },
        { "ip_prefix": "10.0.1.0/24", "region": "us-east-1", "service": "AMAZON" },
        { "ip_prefix": "10.0.2.0/24", "region": "us-east-1", "service": "EC2" },
        { "ip_prefix": "10.0.3.0/24", "region": "us-east-1", "service": "EC2" },
        { "ip_prefix": "10.0.4.0/24", "region": "us-east-1", "service": "S3" }
    ],
    "ipv6_prefixes": []
}"#;
