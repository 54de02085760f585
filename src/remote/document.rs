//! Typed-field document encoding used by the remote document store.
//!
//! A document is `{"name": "...", "fields": {"title": {"stringValue": "..."}}}`.
//! Only the value kinds records and settings need are produced; anything else
//! found on the wire decodes as `FieldValue::Other` and is ignored.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::record::{Record, RecordImage};
use crate::settings::Settings;

const TITLE: &str = "title";
const NOTES: &str = "notes";
const IMAGE: &str = "image";
const UPDATED_AT: &str = "updatedAt";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Timestamp(DateTime<Utc>),
    Null,
    Other(JsonValue),
}

impl FieldValue {
    pub fn to_json(&self) -> JsonValue {
        match self {
            FieldValue::String(s) => json!({ "stringValue": s }),
            FieldValue::Timestamp(t) => {
                json!({ "timestampValue": t.to_rfc3339_opts(SecondsFormat::Micros, true) })
            }
            FieldValue::Null => json!({ "nullValue": null }),
            FieldValue::Other(v) => v.clone(),
        }
    }

    pub fn from_json(value: &JsonValue) -> Self {
        if let Some(s) = value.get("stringValue").and_then(JsonValue::as_str) {
            return FieldValue::String(s.to_string());
        }
        if let Some(t) = value
            .get("timestampValue")
            .and_then(JsonValue::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        {
            return FieldValue::Timestamp(t.with_timezone(&Utc));
        }
        if value.get("nullValue").is_some() {
            return FieldValue::Null;
        }
        FieldValue::Other(value.clone())
    }

    fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    fn optional_string(value: Option<&str>) -> Self {
        match value {
            Some(s) => FieldValue::String(s.to_string()),
            None => FieldValue::Null,
        }
    }
}

/// Wire shape of a single document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, JsonValue>,
}

impl Document {
    fn from_fields(fields: BTreeMap<&str, FieldValue>) -> Self {
        Self {
            name: None,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_json()))
                .collect(),
        }
    }

    pub fn field(&self, name: &str) -> Option<FieldValue> {
        self.fields.get(name).map(FieldValue::from_json)
    }

    /// Last path segment of the document name, percent-decoded.
    pub fn id(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        let segment = name.rsplit('/').next()?;
        urlencoding::decode(segment).ok().map(|s| s.into_owned())
    }
}

/// Wire shape of a collection listing page.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("document has no id")]
    MissingId,

    #[error("missing string field '{0}'")]
    MissingField(&'static str),
}

pub fn record_to_document(record: &Record) -> Document {
    let mut fields = BTreeMap::new();
    fields.insert(TITLE, FieldValue::String(record.title.clone()));
    fields.insert(NOTES, FieldValue::optional_string(record.notes.as_deref()));
    fields.insert(
        IMAGE,
        FieldValue::optional_string(record.image.as_ref().map(RecordImage::as_str)),
    );
    fields.insert(UPDATED_AT, FieldValue::Timestamp(record.updated_at));
    Document::from_fields(fields)
}

pub fn record_from_document(document: &Document) -> Result<Record, DecodeError> {
    let key = document.id().ok_or(DecodeError::MissingId)?;
    let title = document
        .field(TITLE)
        .and_then(|v| v.as_string().map(str::to_string))
        .ok_or(DecodeError::MissingField(TITLE))?;
    let notes = document
        .field(NOTES)
        .and_then(|v| v.as_string().map(str::to_string));
    let image = document
        .field(IMAGE)
        .and_then(|v| v.as_string().map(str::to_string))
        .map(RecordImage::from);
    let updated_at = match document.field(UPDATED_AT) {
        Some(FieldValue::Timestamp(t)) => t,
        _ => Utc::now(),
    };
    Ok(Record {
        key,
        title,
        notes,
        image,
        updated_at,
    })
}

pub fn settings_to_document(settings: &Settings) -> Document {
    Document::from_fields(
        settings
            .iter()
            .map(|(name, value)| (name, FieldValue::String(value.to_string())))
            .collect(),
    )
}

/// Non-string fields are dropped, settings are flat strings.
pub fn settings_from_document(document: &Document) -> Settings {
    document
        .fields
        .iter()
        .filter_map(|(name, value)| match FieldValue::from_json(value) {
            FieldValue::String(s) => Some((name.clone(), s)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::fields;

    #[test]
    fn test_record_document_shape() {
        let record = Record::new("800 123", "Pancakes").with_notes("whisk");
        let document = record_to_document(&record);
        let json = serde_json::to_value(&document).unwrap();

        assert_eq!(json["fields"]["title"], json!({ "stringValue": "Pancakes" }));
        assert_eq!(json["fields"]["notes"], json!({ "stringValue": "whisk" }));
        assert_eq!(json["fields"]["image"], json!({ "nullValue": null }));
        assert!(json["fields"]["updatedAt"]["timestampValue"].is_string());
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_record_decoded_from_server_document() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/u1/recipes/800%20123",
            "fields": {
                "title": { "stringValue": "Pancakes" },
                "notes": { "nullValue": null },
                "image": { "stringValue": "https://media.example/p.jpg" },
                "updatedAt": { "timestampValue": "2024-03-01T10:00:00.123456Z" },
                "rating": { "integerValue": "5" }
            },
            "createTime": "2024-03-01T10:00:00Z"
        }))
        .unwrap();

        let record = record_from_document(&document).unwrap();
        assert_eq!(record.key, "800 123");
        assert_eq!(record.title, "Pancakes");
        assert_eq!(record.notes, None);
        assert_eq!(
            record.image,
            Some(RecordImage::Url("https://media.example/p.jpg".into()))
        );
        assert_eq!(
            record.updated_at,
            DateTime::parse_from_rfc3339("2024-03-01T10:00:00.123456Z").unwrap()
        );
    }

    #[test]
    fn test_record_without_title_fails_to_decode() {
        let document: Document = serde_json::from_value(json!({
            "name": "projects/p/databases/(default)/documents/users/u1/recipes/k",
            "fields": { "notes": { "stringValue": "x" } }
        }))
        .unwrap();
        assert_eq!(
            record_from_document(&document),
            Err(DecodeError::MissingField("title"))
        );

        let anonymous = Document::default();
        assert_eq!(record_from_document(&anonymous), Err(DecodeError::MissingId));
    }

    #[test]
    fn test_settings_document_keeps_only_strings() {
        let settings = Settings::new()
            .with(fields::CLOUD_NAME, "y")
            .with(fields::FB_USER_ID, "u1");
        let mut document = settings_to_document(&settings);
        document
            .fields
            .insert("legacy".to_string(), json!({ "booleanValue": true }));

        assert_eq!(settings_from_document(&document), settings);
    }
}
