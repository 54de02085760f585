//! Common test infrastructure
//!
//! Hand-written fakes for every capability the application is wired to, an
//! in-memory remote store, a harness building an [`App`] on an in-memory
//! database, and a fake document server for exercising the HTTP client.
//!
//! Tests should only import from this module, not from internal submodules.

mod document_server;
mod fakes;
mod harness;

#[allow(unused_imports)]
pub use document_server::FakeDocumentServer;
#[allow(unused_imports)]
pub use fakes::{
    FakeConnector, FakePresenter, FakeRecognizer, FakeRemoteStore, FakeScanner, FakeUploader,
    FakeUploaderConnector, PresenterEvent,
};
#[allow(unused_imports)]
pub use harness::{remote_settings, TestApp};
