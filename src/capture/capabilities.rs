//! Device and presentation capabilities the capture flow is wired to.
//!
//! Production bindings are injected at startup; tests substitute fakes.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::record::{ImageData, Record};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    #[error("Text recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Cannot {action} while {state}")]
    InvalidState {
        state: &'static str,
        action: &'static str,
    },
}

/// Where a running scanner delivers decoded codes.
pub type DecodeSink = mpsc::UnboundedSender<String>;

/// Barcode/QR scanner bound to the camera.
pub trait Scanner: Send + Sync {
    /// Starts streaming from the camera, pushing every decoded code to `sink`.
    fn start(&self, sink: DecodeSink) -> Result<(), CaptureError>;

    /// Releases the camera. Calling it on a stopped scanner does nothing.
    fn stop(&self);

    fn is_active(&self) -> bool;
}

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &ImageData) -> Result<String, CaptureError>;
}

#[async_trait]
pub trait MediaUploader: Send + Sync {
    /// Uploads `image` and returns the URL it is served from.
    async fn upload(&self, image: &ImageData) -> Result<String, CaptureError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Scanner,
    Viewer,
    Editor,
    Settings,
}

/// Non-blocking message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
}

pub trait Presenter: Send + Sync {
    fn render(&self, record: &Record);

    fn switch_screen(&self, screen: Screen);

    fn notice(&self, notice: &Notice);
}
