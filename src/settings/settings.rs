//! Connection settings shared between devices.
//!
//! Settings are a flat map of named string fields. Components that need a
//! subset of them (remote store, media upload) read it through their own
//! `from_settings` constructor and stay disabled while the subset is incomplete.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Well-known field names.
pub mod fields {
    pub const FB_API_KEY: &str = "fbApiKey";
    pub const FB_PROJECT_ID: &str = "fbProjectId";
    pub const FB_USER_ID: &str = "fbUserId";
    pub const FB_DATABASE: &str = "fbDatabase";
    pub const CLOUD_NAME: &str = "cloudName";
    pub const UPLOAD_PRESET: &str = "uploadPreset";

    pub const ALL: &[&str] = &[
        FB_API_KEY,
        FB_PROJECT_ID,
        FB_USER_ID,
        FB_DATABASE,
        CLOUD_NAME,
        UPLOAD_PRESET,
    ];
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, String>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `name`, treating empty values as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    /// Sets `name`. An empty value removes the field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if value.trim().is_empty() {
            self.0.remove(&name);
        } else {
            self.0.insert(name, value);
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field-level union of `self` and `remote`. For fields present on both
    /// sides the remote value wins, connection credentials included.
    pub fn merged_with_remote(&self, remote: &Settings) -> Settings {
        let mut merged = self.0.clone();
        for (name, value) in &remote.0 {
            if !value.trim().is_empty() {
                merged.insert(name.clone(), value.clone());
            }
        }
        Settings(merged)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (name, value) in iter {
            settings.set(name, value);
        }
        settings
    }
}
