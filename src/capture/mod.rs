mod capabilities;
mod cloudinary;
mod flow;

pub use capabilities::{
    CaptureError, DecodeSink, MediaUploader, Notice, Presenter, Scanner, Screen, TextRecognizer,
};
pub use cloudinary::{
    CloudinaryConnector, CloudinaryUploader, MediaConfig, UploaderConnector,
    DEFAULT_CLOUDINARY_ENDPOINT,
};
pub use flow::{CaptureFlow, CapturePhase, Draft, ScannerLease};
