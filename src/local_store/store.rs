use super::StoreError;
use crate::record::Record;
use crate::settings::Settings;

pub trait LocalStore: Send + Sync {
    /// Ensures tables and indices exist. Safe to call any number of times.
    fn init(&self) -> Result<(), StoreError>;

    /// Stamps `updated_at` with the current time and writes the record,
    /// replacing whatever was stored under the same key.
    /// Returns the record as stored.
    fn put(&self, record: Record) -> Result<Record, StoreError>;

    /// Returns Ok(None) if no record is stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Record>, StoreError>;

    /// Returns every stored record, in no particular order.
    fn get_all(&self) -> Result<Vec<Record>, StoreError>;

    /// Removes the record if present. Returns whether something was removed,
    /// deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Records sorted for display, most recently written first.
    fn get_all_by_recency(&self) -> Result<Vec<Record>, StoreError> {
        let mut records = self.get_all()?;
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(records)
    }
}

/// Storage for the single settings blob.
pub trait SettingsStore: Send + Sync {
    /// Returns empty settings if none were ever saved.
    fn get_settings(&self) -> Result<Settings, StoreError>;

    fn put_settings(&self, settings: &Settings) -> Result<(), StoreError>;
}

/// Everything the application needs from the device storage.
pub trait DeviceStore: LocalStore + SettingsStore {}

impl<T: LocalStore + SettingsStore> DeviceStore for T {}
