use std::sync::{Arc, RwLock};

use tracing::{debug, info};

use super::Settings;
use crate::local_store::{SettingsStore, StoreError};

/// Cached view over the persisted settings blob.
///
/// Reads are served from memory; every change is written through to the
/// underlying store before the cache is updated, so a failed write leaves the
/// previous settings in effect.
pub struct ConfigStore {
    store: Arc<dyn SettingsStore>,
    current: RwLock<Settings>,
}

impl ConfigStore {
    pub fn load(store: Arc<dyn SettingsStore>) -> Result<Self, StoreError> {
        let current = store.get_settings()?;
        debug!("Loaded {} settings fields", current.len());
        Ok(Self {
            store,
            current: RwLock::new(current),
        })
    }

    pub fn current(&self) -> Settings {
        self.current.read().unwrap().clone()
    }

    pub fn save(&self, settings: Settings) -> Result<Settings, StoreError> {
        self.store.put_settings(&settings)?;
        *self.current.write().unwrap() = settings.clone();
        Ok(settings)
    }

    /// Merges settings fetched from the remote store into the local ones
    /// (remote wins per field) and persists the result.
    pub fn apply_remote(&self, remote: &Settings) -> Result<Settings, StoreError> {
        let merged = self.current().merged_with_remote(remote);
        info!(
            "Merging {} remote settings fields into local settings",
            remote.len()
        );
        self.save(merged)
    }
}
