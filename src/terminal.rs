//! Capability bindings for the interactive shell.
//!
//! There is no camera in a terminal: the scanner is fed by typed codes and
//! text recognition reads a sidecar file next to the photo.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::capture::{CaptureError, DecodeSink, Notice, Presenter, Scanner, Screen, TextRecognizer};
use crate::cli_style::{self, colors};
use crate::record::{ImageData, Record, RecordImage};

pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn render(&self, record: &Record) {
        cli_style::print_section_header(&record.title);
        cli_style::print_key_value("Key", &record.key);
        cli_style::print_key_value(
            "Updated",
            &record
                .updated_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string(),
        );
        match &record.image {
            Some(RecordImage::Url(url)) => cli_style::print_key_value("Photo", url),
            Some(RecordImage::Inline(data)) => cli_style::print_key_value(
                "Photo",
                &format!("stored on device ({} bytes encoded)", data.len()),
            ),
            None => cli_style::print_key_value("Photo", "none"),
        }
        match &record.notes {
            Some(notes) => {
                println!();
                for line in notes.lines() {
                    println!("    {}", line);
                }
            }
            None => cli_style::print_empty_list("no notes"),
        }
        cli_style::print_section_footer();
    }

    fn switch_screen(&self, screen: Screen) {
        debug!("Screen: {:?}", screen);
        match screen {
            Screen::Scanner => cli_style::print_list_item(
                "Scanner running, type `decode <code>` or `cancel`",
                colors::SAFFRON,
            ),
            Screen::Editor => cli_style::print_list_item(
                "Editing, use `title`, `notes`, `photo`, `ocr` then `save`",
                colors::SAFFRON,
            ),
            Screen::Home | Screen::Viewer | Screen::Settings => {}
        }
    }

    fn notice(&self, notice: &Notice) {
        match notice {
            Notice::Info(message) => cli_style::print_success(message),
            Notice::Warning(message) => cli_style::print_warning(message),
            Notice::Error(message) => cli_style::print_error(message),
        }
    }
}

/// Scanner whose "camera" is the `decode` shell command.
#[derive(Default)]
pub struct ShellScanner {
    sink: Mutex<Option<DecodeSink>>,
}

impl ShellScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a code as if the camera had decoded it. Returns false when the
    /// scanner is not running.
    pub fn feed(&self, code: &str) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.send(code.to_string()).is_ok(),
            None => false,
        }
    }
}

impl Scanner for ShellScanner {
    fn start(&self, sink: DecodeSink) -> Result<(), CaptureError> {
        let mut current = self.sink.lock().unwrap();
        if current.is_some() {
            return Err(CaptureError::CameraUnavailable("already in use".into()));
        }
        *current = Some(sink);
        Ok(())
    }

    fn stop(&self) {
        self.sink.lock().unwrap().take();
    }

    fn is_active(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }
}

/// Reads `<photo>.txt` for the photo most recently loaded from disk.
#[derive(Default)]
pub struct SidecarTextRecognizer {
    source: Mutex<Option<PathBuf>>,
}

impl SidecarTextRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sidecar_path(photo: &Path) -> PathBuf {
        let mut name = photo.as_os_str().to_owned();
        name.push(".txt");
        PathBuf::from(name)
    }

    /// Remembers where the next photo came from.
    pub fn set_source(&self, photo: &Path) {
        *self.source.lock().unwrap() = Some(photo.to_path_buf());
    }
}

#[async_trait]
impl TextRecognizer for SidecarTextRecognizer {
    async fn recognize(&self, _image: &ImageData) -> Result<String, CaptureError> {
        let source = self.source.lock().unwrap().clone();
        let Some(photo) = source else {
            return Err(CaptureError::RecognitionFailed(
                "photo was not loaded from a file".into(),
            ));
        };
        let sidecar = Self::sidecar_path(&photo);
        let text = tokio::fs::read_to_string(&sidecar).await.map_err(|e| {
            CaptureError::RecognitionFailed(format!("{}: {}", sidecar.display(), e))
        })?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CaptureError::RecognitionFailed("no text found".into()));
        }
        Ok(text.to_string())
    }
}
