//! Bounded background queue for mirror calls.
//!
//! Local mutations enqueue a [`MirrorOp`] and return immediately. A single
//! worker task drains the queue in order, so the remote sees operations in the
//! order they were issued locally. Failed operations are logged and dropped;
//! there is no retry.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::record::Record;
use crate::remote::{RemoteError, RemoteStore};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq)]
pub enum MirrorOp {
    PutRecord(Record),
    DeleteRecord(String),
    PutSettings(Settings),
}

impl MirrorOp {
    async fn apply(&self, remote: &dyn RemoteStore) -> Result<(), RemoteError> {
        match self {
            MirrorOp::PutRecord(record) => remote.put(record).await,
            MirrorOp::DeleteRecord(key) => remote.delete(key).await,
            MirrorOp::PutSettings(settings) => remote.put_settings(settings).await,
        }
    }

    fn describe(&self) -> String {
        match self {
            MirrorOp::PutRecord(record) => format!("put record {}", record.key),
            MirrorOp::DeleteRecord(key) => format!("delete record {}", key),
            MirrorOp::PutSettings(_) => "put settings".to_string(),
        }
    }
}

/// Counters describing what happened to enqueued mirror calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorStats {
    pub completed: u64,
    pub failed: u64,
    /// Operations refused because the queue was full or shut down.
    pub dropped: u64,
    pub last_error: Option<String>,
}

struct MirrorJob {
    op: MirrorOp,
    remote: Arc<dyn RemoteStore>,
}

pub struct MirrorQueue {
    tx: mpsc::Sender<MirrorJob>,
    pending: Arc<watch::Sender<usize>>,
    stats: Arc<Mutex<MirrorStats>>,
    worker: JoinHandle<()>,
}

impl MirrorQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn new(capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<MirrorJob>(capacity.max(1));
        let pending = Arc::new(watch::channel(0usize).0);
        let stats = Arc::new(Mutex::new(MirrorStats::default()));

        let worker_pending = pending.clone();
        let worker_stats = stats.clone();
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let description = job.op.describe();
                let result = job.op.apply(job.remote.as_ref()).await;
                {
                    let mut stats = worker_stats.lock().unwrap();
                    match result {
                        Ok(()) => {
                            debug!("Mirror call succeeded: {}", description);
                            stats.completed += 1;
                        }
                        Err(e) => {
                            warn!("Mirror call failed: {}: {}", description, e);
                            stats.failed += 1;
                            stats.last_error = Some(e.to_string());
                        }
                    }
                }
                worker_pending.send_modify(|n| *n = n.saturating_sub(1));
            }
            debug!("Mirror queue worker stopped");
        });

        Self {
            tx,
            pending,
            stats,
            worker,
        }
    }

    /// Queues `op` against `remote` without waiting. Returns false if the
    /// operation was dropped.
    pub fn enqueue(&self, remote: Arc<dyn RemoteStore>, op: MirrorOp) -> bool {
        self.pending.send_modify(|n| *n += 1);
        let description = op.describe();
        match self.tx.try_send(MirrorJob { op, remote }) {
            Ok(()) => true,
            Err(e) => {
                self.pending.send_modify(|n| *n = n.saturating_sub(1));
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "queue closed",
                };
                warn!("Dropping mirror call ({}): {}", reason, description);
                self.stats.lock().unwrap().dropped += 1;
                false
            }
        }
    }

    /// Mirror calls enqueued and not finished yet.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    pub fn stats(&self) -> MirrorStats {
        self.stats.lock().unwrap().clone()
    }

    /// Resolves once every enqueued call has finished.
    pub async fn wait_idle(&self) {
        let mut rx = self.pending.subscribe();
        // The sender lives as long as `self`, so this only fails if we're dropped.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stops accepting work, drains what is queued and waits for the worker.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!("Mirror queue worker ended abnormally: {}", e);
        }
    }
}
