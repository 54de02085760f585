use std::sync::{Arc, RwLock};

use tracing::{debug, error, info, warn};

use super::mirror_queue::{MirrorOp, MirrorQueue, MirrorStats};
use crate::local_store::LocalStore;
use crate::record::Record;
use crate::remote::{FirestoreRemoteStore, RemoteConfig, RemoteOptions, RemoteStore};
use crate::settings::{ConfigStore, Settings};

/// Builds a remote store out of settings, or nothing if they are incomplete.
pub trait RemoteConnector: Send + Sync {
    fn connect(&self, settings: &Settings) -> Option<Arc<dyn RemoteStore>>;
}

pub struct FirestoreConnector {
    options: RemoteOptions,
}

impl FirestoreConnector {
    pub fn new(options: RemoteOptions) -> Self {
        Self { options }
    }
}

impl RemoteConnector for FirestoreConnector {
    fn connect(&self, settings: &Settings) -> Option<Arc<dyn RemoteStore>> {
        let config = RemoteConfig::from_settings(settings)?;
        match FirestoreRemoteStore::new(config, &self.options) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                error!("Could not set up the remote store: {}", e);
                None
            }
        }
    }
}

/// Outcome of a startup pull.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub remote_available: bool,
    pub records_pulled: usize,
    pub records_failed: usize,
    pub settings_merged: bool,
    pub errors: Vec<String>,
}

/// Keeps the local stores and the optional remote store in step.
pub struct SyncCoordinator {
    local: Arc<dyn LocalStore>,
    config: Arc<ConfigStore>,
    connector: Arc<dyn RemoteConnector>,
    remote: RwLock<Option<Arc<dyn RemoteStore>>>,
    queue: MirrorQueue,
}

impl SyncCoordinator {
    /// Must be called from within a tokio runtime, the mirror worker is spawned
    /// right away.
    pub fn new(
        local: Arc<dyn LocalStore>,
        config: Arc<ConfigStore>,
        connector: Arc<dyn RemoteConnector>,
        queue_capacity: usize,
    ) -> Self {
        let remote = connector.connect(&config.current());
        if remote.is_none() {
            info!("Remote store not configured, running local only");
        }
        Self {
            local,
            config,
            connector,
            remote: RwLock::new(remote),
            queue: MirrorQueue::new(queue_capacity),
        }
    }

    pub fn is_remote_configured(&self) -> bool {
        self.remote.read().unwrap().is_some()
    }

    fn remote(&self) -> Option<Arc<dyn RemoteStore>> {
        self.remote.read().unwrap().clone()
    }

    /// Rebuilds the remote store from `settings`. Mirror calls already queued
    /// keep going to the store they were issued against.
    pub fn reconfigure(&self, settings: &Settings) {
        let remote = self.connector.connect(settings);
        match &remote {
            Some(_) => info!("Remote store configured"),
            None => info!("Remote store disabled, settings incomplete"),
        }
        *self.remote.write().unwrap() = remote;
    }

    /// Pulls every remote record and the remote settings into the local stores.
    ///
    /// Remote records overwrite local ones with the same key unconditionally.
    /// Local records missing remotely are left alone. Mirror calls already
    /// queued are flushed first, so a pull never reads back a remote copy older
    /// than a local write. A failed record fetch or settings fetch is logged and
    /// the other one still runs; local write failures skip the affected record.
    pub async fn startup_pull(&self) -> SyncReport {
        let mut report = SyncReport::default();
        let Some(remote) = self.remote() else {
            return report;
        };
        report.remote_available = true;

        if self.queue.pending() > 0 {
            debug!("Flushing {} mirror calls before pulling", self.queue.pending());
            self.queue.wait_idle().await;
        }

        match remote.get_all().await {
            Ok(records) => {
                info!("Pulling {} remote records", records.len());
                for record in records {
                    let key = record.key.clone();
                    match self.local.put(record) {
                        Ok(_) => report.records_pulled += 1,
                        Err(e) => {
                            error!("Failed to store pulled record {}: {}", key, e);
                            report.records_failed += 1;
                            report.errors.push(e.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                warn!("Could not fetch remote records: {}", e);
                report.errors.push(e.to_string());
            }
        }

        match remote.get_settings().await {
            Ok(Some(remote_settings)) => match self.config.apply_remote(&remote_settings) {
                Ok(merged) => {
                    report.settings_merged = true;
                    self.reconfigure(&merged);
                }
                Err(e) => {
                    error!("Failed to save merged settings: {}", e);
                    report.errors.push(e.to_string());
                }
            },
            Ok(None) => debug!("No remote settings to merge"),
            Err(e) => {
                warn!("Could not fetch remote settings: {}", e);
                report.errors.push(e.to_string());
            }
        }

        report
    }

    fn mirror(&self, op: MirrorOp) -> bool {
        match self.remote() {
            Some(remote) => self.queue.enqueue(remote, op),
            None => {
                debug!("Remote store not configured, not mirroring");
                false
            }
        }
    }

    /// Queues the remote copy of a record that was just written locally.
    pub fn mirror_put(&self, record: &Record) -> bool {
        self.mirror(MirrorOp::PutRecord(record.clone()))
    }

    pub fn mirror_delete(&self, key: &str) -> bool {
        self.mirror(MirrorOp::DeleteRecord(key.to_string()))
    }

    pub fn mirror_settings(&self, settings: &Settings) -> bool {
        self.mirror(MirrorOp::PutSettings(settings.clone()))
    }

    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    pub fn stats(&self) -> MirrorStats {
        self.queue.stats()
    }

    pub async fn wait_idle(&self) {
        self.queue.wait_idle().await
    }

    /// Stops accepting mirror calls and waits for the queued ones to finish.
    pub async fn shutdown(self) {
        self.queue.shutdown().await
    }
}
