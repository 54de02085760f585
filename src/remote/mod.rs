mod config;
pub mod document;
mod firestore;
mod remote_store;

pub use config::{RemoteConfig, RemoteOptions, DEFAULT_DATABASE, DEFAULT_FIRESTORE_ENDPOINT};
pub use firestore::FirestoreRemoteStore;
pub use remote_store::{RemoteError, RemoteStore};
