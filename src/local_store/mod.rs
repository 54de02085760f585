mod error;
mod sqlite_local_store;
mod store;

pub use error::StoreError;
pub use sqlite_local_store::SqliteLocalStore;
pub use store::{DeviceStore, LocalStore, SettingsStore};
