//! Scan-and-capture state machine.
//!
//! ```text
//! Idle → Scanning → Viewing(record)
//!                 → Entering(draft) → (saved) → Idle
//! ```
//!
//! The camera is only held while in `Scanning`: the [`ScannerLease`] lives
//! inside that state and stops the scanner when dropped, whichever way the
//! state is left.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::capabilities::{CaptureError, Scanner};
use crate::record::{ImageData, Record, RecordImage};

/// Holds the camera for as long as it is alive.
pub struct ScannerLease {
    scanner: Arc<dyn Scanner>,
}

impl ScannerLease {
    /// Makes sure the scanner is stopped, then starts it feeding a new channel.
    pub fn acquire(
        scanner: Arc<dyn Scanner>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<String>), CaptureError> {
        scanner.stop();
        let (tx, rx) = mpsc::unbounded_channel();
        scanner.start(tx)?;
        debug!("Scanner acquired");
        Ok((Self { scanner }, rx))
    }
}

impl Drop for ScannerLease {
    fn drop(&mut self) {
        self.scanner.stop();
        debug!("Scanner released");
    }
}

struct ScanSession {
    _lease: ScannerLease,
    decodes: mpsc::UnboundedReceiver<String>,
}

/// Record being entered or edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub key: String,
    pub title: String,
    pub notes: Option<String>,
    /// Freshly captured photo, not stored anywhere yet.
    pub photo: Option<ImageData>,
    /// Image the record already had when editing started.
    pub existing_image: Option<RecordImage>,
}

impl Draft {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    pub fn from_record(record: &Record) -> Self {
        Self {
            key: record.key.clone(),
            title: record.title.clone(),
            notes: record.notes.clone(),
            photo: None,
            existing_image: record.image.clone(),
        }
    }

    /// The record this draft would be saved as, photo inlined.
    pub fn to_record(&self) -> Record {
        let image = match &self.photo {
            Some(photo) => Some(RecordImage::Inline(photo.to_data_url())),
            None => self.existing_image.clone(),
        };
        Record {
            key: self.key.clone(),
            title: self.title.trim().to_string(),
            notes: self.notes.clone().filter(|n| !n.trim().is_empty()),
            image,
            updated_at: chrono::Utc::now(),
        }
    }
}

enum CaptureState {
    Idle,
    Scanning(ScanSession),
    Viewing(Record),
    Entering(Draft),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Scanning,
    Viewing,
    Entering,
}

impl CapturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapturePhase::Idle => "idle",
            CapturePhase::Scanning => "scanning",
            CapturePhase::Viewing => "viewing",
            CapturePhase::Entering => "entering",
        }
    }
}

pub struct CaptureFlow {
    scanner: Arc<dyn Scanner>,
    state: CaptureState,
}

impl CaptureFlow {
    pub fn new(scanner: Arc<dyn Scanner>) -> Self {
        Self {
            scanner,
            state: CaptureState::Idle,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        match self.state {
            CaptureState::Idle => CapturePhase::Idle,
            CaptureState::Scanning(_) => CapturePhase::Scanning,
            CaptureState::Viewing(_) => CapturePhase::Viewing,
            CaptureState::Entering(_) => CapturePhase::Entering,
        }
    }

    pub fn scanner_active(&self) -> bool {
        self.scanner.is_active()
    }

    fn invalid(&self, action: &'static str) -> CaptureError {
        CaptureError::InvalidState {
            state: self.phase().as_str(),
            action,
        }
    }

    /// Enters `Scanning`. Any previous state is left first, so a scanner still
    /// held from an earlier scan is released before the new one starts. On a
    /// start failure the flow ends up `Idle`.
    pub fn begin_scan(&mut self) -> Result<(), CaptureError> {
        self.state = CaptureState::Idle;
        let (lease, decodes) = ScannerLease::acquire(self.scanner.clone())?;
        self.state = CaptureState::Scanning(ScanSession {
            _lease: lease,
            decodes,
        });
        info!("Scanning started");
        Ok(())
    }

    /// Returns a decoded code if the scanner already produced one.
    pub fn take_decode(&mut self) -> Option<String> {
        match &mut self.state {
            CaptureState::Scanning(session) => session.decodes.try_recv().ok(),
            _ => None,
        }
    }

    /// Waits for the scanner's next decoded code. None if not scanning or the
    /// scanner went away.
    pub async fn next_decode(&mut self) -> Option<String> {
        match &mut self.state {
            CaptureState::Scanning(session) => session.decodes.recv().await,
            _ => None,
        }
    }

    /// Ends the scan with `key`: `Viewing` if a record exists, otherwise
    /// `Entering` with a draft for that key.
    pub fn resolve_scan(
        &mut self,
        key: String,
        existing: Option<Record>,
    ) -> Result<CapturePhase, CaptureError> {
        if self.phase() != CapturePhase::Scanning {
            return Err(self.invalid("resolve a scan"));
        }
        self.state = match existing {
            Some(record) => CaptureState::Viewing(record),
            None => CaptureState::Entering(Draft::new(key)),
        };
        Ok(self.phase())
    }

    /// Starts entering a record with a manually typed key.
    pub fn begin_entry(&mut self, key: impl Into<String>) {
        self.state = CaptureState::Entering(Draft::new(key));
    }

    /// Shows `record`, leaving whatever state the flow was in.
    pub fn view(&mut self, record: Record) {
        self.state = CaptureState::Viewing(record);
    }

    /// Switches from viewing a record to editing it.
    pub fn edit_current(&mut self) -> Result<&mut Draft, CaptureError> {
        let CaptureState::Viewing(record) = &self.state else {
            return Err(self.invalid("edit"));
        };
        self.state = CaptureState::Entering(Draft::from_record(record));
        self.draft_mut()
    }

    pub fn draft(&self) -> Result<&Draft, CaptureError> {
        match &self.state {
            CaptureState::Entering(draft) => Ok(draft),
            _ => Err(self.invalid("access the draft")),
        }
    }

    pub fn draft_mut(&mut self) -> Result<&mut Draft, CaptureError> {
        let state = self.phase().as_str();
        match &mut self.state {
            CaptureState::Entering(draft) => Ok(draft),
            _ => Err(CaptureError::InvalidState {
                state,
                action: "edit the draft",
            }),
        }
    }

    pub fn viewing(&self) -> Option<&Record> {
        match &self.state {
            CaptureState::Viewing(record) => Some(record),
            _ => None,
        }
    }

    /// Called once the draft was stored.
    pub fn finish_save(&mut self) {
        self.state = CaptureState::Idle;
    }

    pub fn cancel(&mut self) {
        if self.phase() != CapturePhase::Idle {
            debug!("Capture cancelled while {}", self.phase().as_str());
        }
        self.state = CaptureState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::DecodeSink;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeScanner {
        active: AtomicBool,
        starts: AtomicUsize,
        fail_with: Mutex<Option<CaptureError>>,
        sink: Mutex<Option<DecodeSink>>,
    }

    impl FakeScanner {
        fn emit(&self, code: &str) {
            if let Some(sink) = self.sink.lock().unwrap().as_ref() {
                sink.send(code.to_string()).unwrap();
            }
        }
    }

    impl Scanner for FakeScanner {
        fn start(&self, sink: DecodeSink) -> Result<(), CaptureError> {
            if let Some(err) = self.fail_with.lock().unwrap().clone() {
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

    #[test]
    fn test_leaving_scanning_without_decode_releases_camera() {
        let scanner = Arc::new(FakeScanner::default());
        let mut flow = CaptureFlow::new(scanner.clone());

        flow.begin_scan().unwrap();
        assert!(scanner.is_active());

        flow.cancel();
        assert!(!scanner.is_active());
        assert_eq!(flow.phase(), CapturePhase::Idle);

        flow.begin_scan().unwrap();
        flow.begin_entry("manual");
        assert!(!scanner.is_active());
    }

    #[test]
    fn test_rescanning_releases_before_reacquiring() {
        let scanner = Arc::new(FakeScanner::default());
        let mut flow = CaptureFlow::new(scanner.clone());

        flow.begin_scan().unwrap();
        // FakeScanner panics if started while active.
        flow.begin_scan().unwrap();
        assert_eq!(scanner.starts.load(Ordering::SeqCst), 2);
        assert!(scanner.is_active());
    }

    #[test]
    fn test_dropping_flow_releases_camera() {
        let scanner = Arc::new(FakeScanner::default());
        {
            let mut flow = CaptureFlow::new(scanner.clone());
            flow.begin_scan().unwrap();
        }
        assert!(!scanner.is_active());
    }

    #[test]
    fn test_start_failure_leaves_flow_idle() {
        let scanner = Arc::new(FakeScanner::default());
        *scanner.fail_with.lock().unwrap() = Some(CaptureError::PermissionDenied);
        let mut flow = CaptureFlow::new(scanner.clone());

        assert_eq!(flow.begin_scan(), Err(CaptureError::PermissionDenied));
        assert_eq!(flow.phase(), CapturePhase::Idle);
        assert!(!scanner.is_active());
    }

    #[test]
    fn test_decode_resolves_to_entering_or_viewing() {
        let scanner = Arc::new(FakeScanner::default());
        let mut flow = CaptureFlow::new(scanner.clone());

        flow.begin_scan().unwrap();
        scanner.emit("123");
        let code = flow.take_decode().unwrap();
        assert_eq!(
            flow.resolve_scan(code, None).unwrap(),
            CapturePhase::Entering
        );
        assert_eq!(flow.draft().unwrap().key, "123");
        assert!(!scanner.is_active());

        flow.begin_scan().unwrap();
        scanner.emit("456");
        let code = flow.take_decode().unwrap();
        let existing = Record::new("456", "Known");
        assert_eq!(
            flow.resolve_scan(code, Some(existing.clone())).unwrap(),
            CapturePhase::Viewing
        );
        assert_eq!(flow.viewing(), Some(&existing));
    }

    #[test]
    fn test_resolve_outside_scanning_is_rejected() {
        let scanner = Arc::new(FakeScanner::default());
        let mut flow = CaptureFlow::new(scanner);
        let err = flow.resolve_scan("1".into(), None).unwrap_err();
        assert!(matches!(err, CaptureError::InvalidState { state: "idle", .. }));
    }

    #[test]
    fn test_edit_current_prefills_draft() {
        let scanner = Arc::new(FakeScanner::default());
        let mut flow = CaptureFlow::new(scanner);
        let record = Record::new("k", "Soup")
            .with_notes("boil")
            .with_image(RecordImage::Url("https://x/y.jpg".into()));
        flow.view(record.clone());

        let draft = flow.edit_current().unwrap();
        assert_eq!(draft.title, "Soup");
        draft.title = "Better soup".into();

        let saved = flow.draft().unwrap().to_record();
        assert_eq!(saved.title, "Better soup");
        assert_eq!(saved.image, record.image);
    }

    #[test]
    fn test_draft_photo_becomes_inline_image() {
        let mut draft = Draft::new("k");
        draft.title = "  Bread ".into();
        draft.notes = Some("   ".into());
        draft.photo = Some(ImageData {
            mime_type: "image/jpeg".into(),
            bytes: vec![1, 2, 3],
        });

        let record = draft.to_record();
        assert_eq!(record.title, "Bread");
        assert_eq!(record.notes, None);
        assert!(record.image.unwrap().is_inline());
    }
}
