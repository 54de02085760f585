use async_trait::async_trait;
use thiserror::Error;

use crate::record::Record;
use crate::settings::Settings;

/// Failures talking to the remote store. Never fatal: callers log them and keep
/// treating the local store as authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Remote rejected the request with status {status}: {message}")]
    RemoteRejected { status: u16, message: String },
}

/// Network mirror of the record set, scoped to one user namespace.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Creates or fully replaces the remote copy of `record`.
    async fn put(&self, record: &Record) -> Result<(), RemoteError>;

    /// Removes the remote copy of `key`. Succeeds if it was already gone.
    async fn delete(&self, key: &str) -> Result<(), RemoteError>;

    /// Fetches every remote record.
    async fn get_all(&self) -> Result<Vec<Record>, RemoteError>;

    /// Returns Ok(None) if no settings were ever pushed.
    async fn get_settings(&self) -> Result<Option<Settings>, RemoteError>;

    async fn put_settings(&self, settings: &Settings) -> Result<(), RemoteError>;
}
