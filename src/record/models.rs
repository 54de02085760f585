use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::local_store::StoreError;

const DATA_URL_PREFIX: &str = "data:";

/// Photo attached to a record.
///
/// Inline images are self-contained `data:` URLs, remote ones are whatever the
/// media host handed back after upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordImage {
    Inline(String),
    Url(String),
}

impl RecordImage {
    pub fn as_str(&self) -> &str {
        match self {
            RecordImage::Inline(s) | RecordImage::Url(s) => s,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, RecordImage::Inline(_))
    }

    /// Decodes an inline image back into raw bytes, `None` for remote images.
    pub fn inline_data(&self) -> Option<ImageData> {
        match self {
            RecordImage::Inline(data_url) => ImageData::from_data_url(data_url),
            RecordImage::Url(_) => None,
        }
    }
}

impl From<String> for RecordImage {
    fn from(value: String) -> Self {
        if value.starts_with(DATA_URL_PREFIX) {
            RecordImage::Inline(value)
        } else {
            RecordImage::Url(value)
        }
    }
}

impl From<RecordImage> for String {
    fn from(value: RecordImage) -> Self {
        match value {
            RecordImage::Inline(s) | RecordImage::Url(s) => s,
        }
    }
}

/// Raw photo bytes as handed over by the camera or read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    /// Wraps bytes, sniffing the mime type from the content.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());
        Self { mime_type, bytes }
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "{}{};base64,{}",
            DATA_URL_PREFIX,
            self.mime_type,
            STANDARD.encode(&self.bytes)
        )
    }

    pub fn from_data_url(data_url: &str) -> Option<Self> {
        let rest = data_url.strip_prefix(DATA_URL_PREFIX)?;
        let (mime_type, payload) = rest.split_once(";base64,")?;
        let bytes = STANDARD.decode(payload).ok()?;
        Some(Self {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

/// A cataloged recipe, keyed by the scanned code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub key: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<RecordImage>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// A record with only key and title set. `updated_at` is overwritten by the
    /// local store on every write.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            notes: None,
            image: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_image(mut self, image: RecordImage) -> Self {
        self.image = Some(image);
        self
    }

    /// Rejects records that must never reach a store.
    pub fn check_savable(&self) -> Result<(), StoreError> {
        if self.key.trim().is_empty() {
            return Err(StoreError::Validation("key must not be empty".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(StoreError::Validation(
                "title must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
