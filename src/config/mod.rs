mod file_config;

pub use file_config::{FileConfig, RemoteFileConfig};

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::capture::DEFAULT_CLOUDINARY_ENDPOINT;
use crate::remote::{RemoteOptions, DEFAULT_FIRESTORE_ENDPOINT};

pub const DB_FILE_NAME: &str = "recipebox.db";

/// CLI arguments that can be overridden by the TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub settings_passcode: Option<String>,
    pub mirror_queue_capacity: usize,
    pub remote_timeout_sec: u64,
    pub remote_page_size: usize,
    pub firestore_endpoint: Option<String>,
    pub cloudinary_endpoint: Option<String>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            settings_passcode: None,
            mirror_queue_capacity: 64,
            remote_timeout_sec: 30,
            remote_page_size: 100,
            firestore_endpoint: None,
            cloudinary_endpoint: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub settings_passcode: Option<String>,
    pub mirror_queue_capacity: usize,
    pub remote_timeout_sec: u64,
    pub remote_page_size: usize,
    pub firestore_endpoint: String,
    pub cloudinary_endpoint: String,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let remote = file.remote.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;

        // Missing directories are created when the store opens.
        if data_dir.exists() && !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let settings_passcode = file
            .settings_passcode
            .or_else(|| cli.settings_passcode.clone());

        let mirror_queue_capacity = file
            .mirror_queue_capacity
            .unwrap_or(cli.mirror_queue_capacity);
        if mirror_queue_capacity == 0 {
            bail!("mirror_queue_capacity must be at least 1");
        }

        let remote_timeout_sec = remote.timeout_sec.unwrap_or(cli.remote_timeout_sec);
        let remote_page_size = remote.page_size.unwrap_or(cli.remote_page_size);
        if remote_page_size == 0 {
            bail!("remote page_size must be at least 1");
        }

        let firestore_endpoint = remote
            .firestore_endpoint
            .or_else(|| cli.firestore_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_FIRESTORE_ENDPOINT.to_string());
        let cloudinary_endpoint = remote
            .cloudinary_endpoint
            .or_else(|| cli.cloudinary_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_CLOUDINARY_ENDPOINT.to_string());

        Ok(Self {
            data_dir,
            settings_passcode,
            mirror_queue_capacity,
            remote_timeout_sec,
            remote_page_size,
            firestore_endpoint,
            cloudinary_endpoint,
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_sec)
    }

    pub fn remote_options(&self) -> RemoteOptions {
        RemoteOptions {
            endpoint: self.firestore_endpoint.clone(),
            timeout: self.remote_timeout(),
            page_size: self.remote_page_size,
        }
    }
}
