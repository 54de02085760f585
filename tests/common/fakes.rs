//! Fake capabilities and remote store.

#![allow(dead_code)]

use async_trait::async_trait;
use recipebox::capture::{
    CaptureError, DecodeSink, MediaConfig, MediaUploader, Notice, Presenter, Scanner, Screen,
    TextRecognizer, UploaderConnector,
};
use recipebox::remote::RemoteConfig;
use recipebox::{ImageData, Record, RemoteConnector, RemoteError, RemoteStore, Settings};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

// ============================================================================
// Remote store
// ============================================================================

/// In-memory remote store with a call log and an offline switch.
#[derive(Default)]
pub struct FakeRemoteStore {
    pub records: Mutex<BTreeMap<String, Record>>,
    pub settings: Mutex<Option<Settings>>,
    pub calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    write_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeRemoteStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_records(records: Vec<Record>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.records.lock().unwrap();
            for record in records {
                map.insert(record.key.clone(), record);
            }
        }
        Arc::new(store)
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Holds every later record write until a permit is added to the
    /// returned semaphore.
    pub fn hold_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.write_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    async fn pass_write_gate(&self) {
        let gate = self.write_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }

    pub fn record(&self, key: &str) -> Option<Record> {
        self.records.lock().unwrap().get(key).cloned()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn call(&self, description: String) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(description);
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::NetworkFailure("offline".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemoteStore {
    async fn put(&self, record: &Record) -> Result<(), RemoteError> {
        self.pass_write_gate().await;
        self.call(format!("put {}", record.key))?;
        self.records
            .lock()
            .unwrap()
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RemoteError> {
        self.call(format!("delete {}", key))?;
        self.records.lock().unwrap().remove(key);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Record>, RemoteError> {
        self.call("get_all".to_string())?;
        Ok(self.records.lock().unwrap().values().cloned().collect())
    }

    async fn get_settings(&self) -> Result<Option<Settings>, RemoteError> {
        self.call("get_settings".to_string())?;
        Ok(self.settings.lock().unwrap().clone())
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), RemoteError> {
        self.call("put_settings".to_string())?;
        *self.settings.lock().unwrap() = Some(settings.clone());
        Ok(())
    }
}

/// Hands out the same fake remote whenever the settings carry a full quorum.
pub struct FakeConnector {
    pub remote: Arc<FakeRemoteStore>,
    pub connects: AtomicUsize,
    pub last_config: Mutex<Option<RemoteConfig>>,
}

impl FakeConnector {
    pub fn new(remote: Arc<FakeRemoteStore>) -> Arc<Self> {
        Arc::new(Self {
            remote,
            connects: AtomicUsize::new(0),
            last_config: Mutex::new(None),
        })
    }
}

impl RemoteConnector for FakeConnector {
    fn connect(&self, settings: &Settings) -> Option<Arc<dyn RemoteStore>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let config = RemoteConfig::from_settings(settings);
        *self.last_config.lock().unwrap() = config.clone();
        config.map(|_| self.remote.clone() as Arc<dyn RemoteStore>)
    }
}

// ============================================================================
// Capture capabilities
// ============================================================================

#[derive(Default)]
pub struct FakeScanner {
    active: AtomicBool,
    pub starts: AtomicUsize,
    pub fail_with: Mutex<Option<CaptureError>>,
    sink: Mutex<Option<DecodeSink>>,
}

impl FakeScanner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Pretends the camera decoded `code`.
    pub fn emit(&self, code: &str) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            let _ = sink.send(code.to_string());
        }
    }

    pub fn fail_next_start(&self, error: CaptureError) {
        *self.fail_with.lock().unwrap() = Some(error);
    }
}

impl Scanner for FakeScanner {
    fn start(&self, sink: DecodeSink) -> Result<(), CaptureError> {
        if let Some(err) = self.fail_with.lock().unwrap().take() {
            return Err(err);
        }
        assert!(
            !self.active.swap(true, Ordering::SeqCst),
            "scanner started while already active"
        );
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.sink.lock().unwrap().take();
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

pub struct FakeRecognizer {
    result: Mutex<Result<String, CaptureError>>,
}

impl FakeRecognizer {
    pub fn new(text: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Mutex::new(Ok(text.to_string())),
        })
    }

    pub fn fail_with(&self, error: CaptureError) {
        *self.result.lock().unwrap() = Err(error);
    }
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn recognize(&self, _image: &ImageData) -> Result<String, CaptureError> {
        self.result.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct FakeUploader {
    pub uploads: AtomicUsize,
    fail: AtomicBool,
}

impl FakeUploader {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MediaUploader for FakeUploader {
    async fn upload(&self, image: &ImageData) -> Result<String, CaptureError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(CaptureError::UploadFailed("host unreachable".to_string()));
        }
        let n = self.uploads.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "https://media.test/{}/{}.{}",
            n,
            image.bytes.len(),
            image.mime_type.rsplit('/').next().unwrap_or("bin")
        ))
    }
}

/// Enables the shared fake uploader when both media fields are present.
pub struct FakeUploaderConnector {
    pub uploader: Arc<FakeUploader>,
}

impl FakeUploaderConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            uploader: Arc::new(FakeUploader::default()),
        })
    }
}

impl UploaderConnector for FakeUploaderConnector {
    fn connect(&self, settings: &Settings) -> Option<Arc<dyn MediaUploader>> {
        MediaConfig::from_settings(settings).map(|_| self.uploader.clone() as Arc<dyn MediaUploader>)
    }
}

// ============================================================================
// Presenter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Render(String),
    Screen(Screen),
    Notice(Notice),
}

#[derive(Default)]
pub struct FakePresenter {
    events: Mutex<Vec<PresenterEvent>>,
}

impl FakePresenter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<PresenterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn last_screen(&self) -> Option<Screen> {
        self.events().into_iter().rev().find_map(|e| match e {
            PresenterEvent::Screen(screen) => Some(screen),
            _ => None,
        })
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Render(key) => Some(key),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for FakePresenter {
    fn render(&self, record: &Record) {
        self.events
            .lock()
            .unwrap()
            .push(PresenterEvent::Render(record.key.clone()));
    }

    fn switch_screen(&self, screen: Screen) {
        self.events
            .lock()
            .unwrap()
            .push(PresenterEvent::Screen(screen));
    }

    fn notice(&self, notice: &Notice) {
        self.events
            .lock()
            .unwrap()
            .push(PresenterEvent::Notice(notice.clone()));
    }
}
