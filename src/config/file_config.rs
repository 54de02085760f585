use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub data_dir: Option<String>,
    pub settings_passcode: Option<String>,
    pub mirror_queue_capacity: Option<usize>,

    pub remote: Option<RemoteFileConfig>,
}

/// `[remote]` section: HTTP knobs for the remote and media hosts.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RemoteFileConfig {
    pub timeout_sec: Option<u64>,
    pub page_size: Option<usize>,
    pub firestore_endpoint: Option<String>,
    pub cloudinary_endpoint: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
