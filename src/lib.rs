//! Recipebox library
//!
//! Recipe cards keyed by a scanned barcode, stored on the device and mirrored
//! to a Firestore document store when one is configured.

pub mod app;
pub mod capture;
pub mod cli_style;
pub mod config;
pub mod local_store;
pub mod lock;
pub mod record;
pub mod remote;
pub mod settings;
pub mod sqlite_persistence;
pub mod sync;
pub mod terminal;

// Re-export commonly used types for convenience
pub use app::{App, AppError, AppOptions, Capabilities};
pub use local_store::{LocalStore, SettingsStore, SqliteLocalStore, StoreError};
pub use record::{ImageData, Record, RecordImage};
pub use remote::{FirestoreRemoteStore, RemoteError, RemoteStore};
pub use settings::{fields, ConfigStore, Settings};
pub use sync::{FirestoreConnector, RemoteConnector, SyncCoordinator, SyncReport};
