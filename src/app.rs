//! Application controller tying storage, sync, capture and presentation.

use std::sync::{Arc, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::capture::{
    CaptureError, CaptureFlow, CapturePhase, Draft, MediaUploader, Notice, Presenter, Scanner,
    Screen, TextRecognizer, UploaderConnector,
};
use crate::local_store::{DeviceStore, LocalStore, StoreError};
use crate::lock::SettingsLock;
use crate::record::{ImageData, Record, RecordImage};
use crate::settings::{ConfigStore, Settings};
use crate::sync::{MirrorStats, RemoteConnector, SyncCoordinator, SyncReport};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("Settings are locked")]
    Locked,
}

/// Platform bindings the application runs against.
pub struct Capabilities {
    pub scanner: Arc<dyn Scanner>,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub presenter: Arc<dyn Presenter>,
    pub uploader_connector: Arc<dyn UploaderConnector>,
    pub remote_connector: Arc<dyn RemoteConnector>,
}

#[derive(Debug, Clone)]
pub struct AppOptions {
    pub mirror_queue_capacity: usize,
    pub settings_passcode: Option<String>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            mirror_queue_capacity: 64,
            settings_passcode: None,
        }
    }
}

pub struct App {
    local: Arc<dyn LocalStore>,
    config: Arc<ConfigStore>,
    sync: SyncCoordinator,
    flow: CaptureFlow,
    lock: SettingsLock,
    recognizer: Arc<dyn TextRecognizer>,
    presenter: Arc<dyn Presenter>,
    uploader_connector: Arc<dyn UploaderConnector>,
    uploader: RwLock<Option<Arc<dyn MediaUploader>>>,
}

impl App {
    /// Must be called from within a tokio runtime.
    pub fn new<S: DeviceStore + 'static>(
        store: Arc<S>,
        capabilities: Capabilities,
        options: AppOptions,
    ) -> Result<Self, AppError> {
        let local: Arc<dyn LocalStore> = store.clone();
        let config = Arc::new(ConfigStore::load(store)?);
        let sync = SyncCoordinator::new(
            local.clone(),
            config.clone(),
            capabilities.remote_connector,
            options.mirror_queue_capacity,
        );
        let uploader = capabilities.uploader_connector.connect(&config.current());

        Ok(Self {
            local,
            config,
            sync,
            flow: CaptureFlow::new(capabilities.scanner),
            lock: SettingsLock::new(options.settings_passcode),
            recognizer: capabilities.recognizer,
            presenter: capabilities.presenter,
            uploader_connector: capabilities.uploader_connector,
            uploader: RwLock::new(uploader),
        })
    }

    /// Pulls remote state and shows the home screen.
    pub async fn start(&self) -> SyncReport {
        let report = self.pull().await;
        self.presenter.switch_screen(Screen::Home);
        report
    }

    /// Runs a startup-style pull from the remote store.
    pub async fn pull(&self) -> SyncReport {
        let report = self.sync.startup_pull().await;
        if report.settings_merged {
            self.refresh_uploader(&self.config.current());
        }
        if !report.errors.is_empty() {
            self.presenter.notice(&Notice::Warning(format!(
                "Sync incomplete: {}",
                report.errors.join("; ")
            )));
        }
        report
    }

    fn refresh_uploader(&self, settings: &Settings) {
        let uploader = self.uploader_connector.connect(settings);
        debug!("Media upload enabled: {}", uploader.is_some());
        *self.uploader.write().unwrap() = uploader;
    }

    fn uploader(&self) -> Option<Arc<dyn MediaUploader>> {
        self.uploader.read().unwrap().clone()
    }

    pub fn is_remote_configured(&self) -> bool {
        self.sync.is_remote_configured()
    }

    pub fn is_upload_configured(&self) -> bool {
        self.uploader.read().unwrap().is_some()
    }

    // Records

    /// Validates, stores and mirrors `record`, returning it as stored.
    pub fn save_record(&self, record: Record) -> Result<Record, AppError> {
        record.check_savable()?;
        let stored = self.local.put(record)?;
        self.sync.mirror_put(&stored);
        Ok(stored)
    }

    pub fn delete_record(&self, key: &str) -> Result<bool, AppError> {
        let deleted = self.local.delete(key)?;
        self.sync.mirror_delete(key);
        Ok(deleted)
    }

    pub fn get_record(&self, key: &str) -> Result<Option<Record>, AppError> {
        Ok(self.local.get(key)?)
    }

    /// Every record, most recently written first.
    pub fn list_records(&self) -> Result<Vec<Record>, AppError> {
        Ok(self.local.get_all_by_recency()?)
    }

    // Settings

    pub fn settings(&self) -> Settings {
        self.config.current()
    }

    pub fn is_settings_unlocked(&self) -> bool {
        self.lock.is_unlocked()
    }

    pub fn unlock_settings(&self, passcode: &str) -> bool {
        self.lock.unlock(passcode)
    }

    pub fn lock_settings(&self) {
        self.lock.lock()
    }

    /// Applies `changes` on top of the current settings. Empty values remove
    /// the field.
    pub fn update_settings<I, K, V>(&self, changes: I) -> Result<Settings, AppError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if !self.lock.is_unlocked() {
            return Err(AppError::Locked);
        }
        let mut settings = self.config.current();
        for (name, value) in changes {
            settings.set(name, value);
        }
        self.commit_settings(settings)
    }

    pub fn remove_setting(&self, name: &str) -> Result<Settings, AppError> {
        if !self.lock.is_unlocked() {
            return Err(AppError::Locked);
        }
        let mut settings = self.config.current();
        settings.remove(name);
        self.commit_settings(settings)
    }

    fn commit_settings(&self, settings: Settings) -> Result<Settings, AppError> {
        let saved = self.config.save(settings)?;
        self.sync.reconfigure(&saved);
        self.refresh_uploader(&saved);
        self.sync.mirror_settings(&saved);
        info!("Settings saved");
        Ok(saved)
    }

    // Capture

    pub fn capture_phase(&self) -> CapturePhase {
        self.flow.phase()
    }

    pub fn scanner_active(&self) -> bool {
        self.flow.scanner_active()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.flow.draft().ok()
    }

    pub fn viewing(&self) -> Option<&Record> {
        self.flow.viewing()
    }

    pub fn begin_scan(&mut self) -> Result<(), AppError> {
        if let Err(e) = self.flow.begin_scan() {
            self.presenter.notice(&Notice::Error(e.to_string()));
            self.presenter.switch_screen(Screen::Home);
            return Err(e.into());
        }
        self.presenter.switch_screen(Screen::Scanner);
        Ok(())
    }

    /// Handles a decoded code: shows the matching record, or opens the editor
    /// for a new one keyed by `text`. The code is used verbatim as the key. A
    /// blank code is rejected and scanning goes on.
    pub fn on_decoded(&mut self, text: &str) -> Result<CapturePhase, AppError> {
        if self.flow.phase() != CapturePhase::Scanning {
            return Err(CaptureError::InvalidState {
                state: self.flow.phase().as_str(),
                action: "handle a decoded code",
            }
            .into());
        }
        if text.trim().is_empty() {
            self.presenter
                .notice(&Notice::Warning("Empty code, still scanning".to_string()));
            return Err(StoreError::Validation("decoded code is empty".into()).into());
        }
        let key = text.to_string();
        let existing = self.local.get(&key)?;
        let phase = self.flow.resolve_scan(key, existing)?;
        match self.flow.viewing() {
            Some(record) => {
                self.presenter.render(record);
                self.presenter.switch_screen(Screen::Viewer);
            }
            None => self.presenter.switch_screen(Screen::Editor),
        }
        Ok(phase)
    }

    /// Handles a code the scanner already produced, if any.
    pub fn poll_decode(&mut self) -> Result<Option<CapturePhase>, AppError> {
        match self.flow.take_decode() {
            Some(text) => self.on_decoded(&text).map(Some),
            None => Ok(None),
        }
    }

    /// Waits for the scanner to produce a code and handles it.
    pub async fn await_decode(&mut self) -> Result<Option<CapturePhase>, AppError> {
        match self.flow.next_decode().await {
            Some(text) => self.on_decoded(&text).map(Some),
            None => Ok(None),
        }
    }

    pub fn begin_manual_entry(&mut self, key: &str) -> Result<(), AppError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(StoreError::Validation("key must not be empty".into()).into());
        }
        self.flow.begin_entry(key);
        self.presenter.switch_screen(Screen::Editor);
        Ok(())
    }

    /// Displays the stored record under `key`. Returns false if there is none.
    pub fn show_record(&mut self, key: &str) -> Result<bool, AppError> {
        let Some(record) = self.local.get(key)? else {
            return Ok(false);
        };
        self.presenter.render(&record);
        self.flow.view(record);
        self.presenter.switch_screen(Screen::Viewer);
        Ok(true)
    }

    /// Opens the record on display in the editor.
    pub fn edit_current(&mut self) -> Result<(), AppError> {
        self.flow.edit_current()?;
        self.presenter.switch_screen(Screen::Editor);
        Ok(())
    }

    pub fn set_draft_title(&mut self, title: &str) -> Result<(), AppError> {
        self.flow.draft_mut()?.title = title.to_string();
        Ok(())
    }

    pub fn set_draft_notes(&mut self, notes: &str) -> Result<(), AppError> {
        self.flow.draft_mut()?.notes = Some(notes.to_string());
        Ok(())
    }

    pub fn set_draft_photo(&mut self, photo: ImageData) -> Result<(), AppError> {
        self.flow.draft_mut()?.photo = Some(photo);
        Ok(())
    }

    /// Runs text recognition on the draft photo and puts the result in the
    /// notes. Recognition problems become a notice, not an error.
    pub async fn recognize_notes(&mut self) -> Result<Option<String>, AppError> {
        let Some(photo) = self.flow.draft()?.photo.clone() else {
            self.presenter
                .notice(&Notice::Warning("Take a photo first".to_string()));
            return Ok(None);
        };
        match self.recognizer.recognize(&photo).await {
            Ok(text) => {
                self.flow.draft_mut()?.notes = Some(text.clone());
                Ok(Some(text))
            }
            Err(e) => {
                warn!("Text recognition failed: {}", e);
                self.presenter.notice(&Notice::Warning(e.to_string()));
                Ok(None)
            }
        }
    }

    /// Stores the draft and returns to idle.
    ///
    /// An empty title is rejected before anything is written. The photo is
    /// uploaded when media upload is configured; if that fails the image stays
    /// inline. A local write failure keeps the draft open.
    pub async fn save_draft(&mut self) -> Result<Record, AppError> {
        let draft = self.flow.draft()?.clone();
        let mut record = draft.to_record();
        record.check_savable()?;

        if let (Some(photo), Some(uploader)) = (&draft.photo, self.uploader()) {
            match uploader.upload(photo).await {
                Ok(url) => record.image = Some(RecordImage::Url(url)),
                Err(e) => {
                    warn!("Keeping inline image for {}: {}", record.key, e);
                    self.presenter.notice(&Notice::Warning(format!(
                        "{}, image kept on this device",
                        e
                    )));
                }
            }
        }

        let stored = self.local.put(record)?;
        self.sync.mirror_put(&stored);
        self.flow.finish_save();
        self.presenter
            .notice(&Notice::Info(format!("Saved {}", stored.key)));
        self.presenter.switch_screen(Screen::Home);
        Ok(stored)
    }

    pub fn cancel(&mut self) {
        self.flow.cancel();
        self.presenter.switch_screen(Screen::Home);
    }

    // Status

    pub fn pending_mirrors(&self) -> usize {
        self.sync.pending()
    }

    pub fn mirror_stats(&self) -> MirrorStats {
        self.sync.stats()
    }

    pub async fn wait_mirrors_idle(&self) {
        self.sync.wait_idle().await
    }

    /// Releases the scanner and drains queued mirror calls.
    pub async fn shutdown(mut self) {
        self.flow.cancel();
        self.sync.shutdown().await;
        info!("Application stopped");
    }
}
