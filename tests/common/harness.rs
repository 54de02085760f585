//! Application harness on an in-memory database and fake capabilities.

#![allow(dead_code)]

use super::fakes::{
    FakeConnector, FakePresenter, FakeRecognizer, FakeRemoteStore, FakeScanner,
    FakeUploaderConnector,
};
use recipebox::local_store::SettingsStore;
use recipebox::{fields, App, AppOptions, Capabilities, Record, Settings, SqliteLocalStore};
use std::sync::Arc;

/// Settings carrying a complete remote quorum.
pub fn remote_settings() -> Settings {
    Settings::new()
        .with(fields::FB_API_KEY, "test-key")
        .with(fields::FB_PROJECT_ID, "test-project")
        .with(fields::FB_USER_ID, "u1")
}

pub struct TestApp {
    pub app: App,
    pub store: Arc<SqliteLocalStore>,
    pub remote: Arc<FakeRemoteStore>,
    pub connector: Arc<FakeConnector>,
    pub scanner: Arc<FakeScanner>,
    pub presenter: Arc<FakePresenter>,
    pub recognizer: Arc<FakeRecognizer>,
    pub uploads: Arc<FakeUploaderConnector>,
}

pub struct TestAppBuilder {
    settings: Settings,
    local_records: Vec<Record>,
    remote: Arc<FakeRemoteStore>,
    passcode: Option<String>,
    queue_capacity: usize,
}

impl TestApp {
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            settings: Settings::new(),
            local_records: Vec::new(),
            remote: FakeRemoteStore::new(),
            passcode: None,
            queue_capacity: 64,
        }
    }

    /// App with no remote configured.
    pub fn local_only() -> Self {
        Self::builder().build()
    }

    /// App with a configured, empty fake remote.
    pub fn with_remote() -> Self {
        Self::builder().settings(remote_settings()).build()
    }
}

impl TestAppBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn local_records(mut self, records: Vec<Record>) -> Self {
        self.local_records = records;
        self
    }

    pub fn remote(mut self, remote: Arc<FakeRemoteStore>) -> Self {
        self.remote = remote;
        self
    }

    pub fn passcode(mut self, passcode: &str) -> Self {
        self.passcode = Some(passcode.to_string());
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Must be called from within a tokio runtime.
    pub fn build(self) -> TestApp {
        use recipebox::LocalStore;

        let store = Arc::new(SqliteLocalStore::in_memory().unwrap());
        store.put_settings(&self.settings).unwrap();
        for record in self.local_records {
            store.put(record).unwrap();
        }

        let connector = FakeConnector::new(self.remote.clone());
        let scanner = FakeScanner::new();
        let presenter = FakePresenter::new();
        let recognizer = FakeRecognizer::new("recognized text");
        let uploads = FakeUploaderConnector::new();

        let app = App::new(
            store.clone(),
            Capabilities {
                scanner: scanner.clone(),
                recognizer: recognizer.clone(),
                presenter: presenter.clone(),
                uploader_connector: uploads.clone(),
                remote_connector: connector.clone(),
            },
            AppOptions {
                mirror_queue_capacity: self.queue_capacity,
                settings_passcode: self.passcode,
            },
        )
        .unwrap();

        TestApp {
            app,
            store,
            remote: self.remote,
            connector,
            scanner,
            presenter,
            recognizer,
            uploads,
        }
    }
}
