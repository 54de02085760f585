mod coordinator;
mod mirror_queue;

pub use coordinator::{FirestoreConnector, RemoteConnector, SyncCoordinator, SyncReport};
pub use mirror_queue::{MirrorOp, MirrorQueue, MirrorStats};
