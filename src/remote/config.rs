use std::time::Duration;

use crate::settings::{fields, Settings};

pub const DEFAULT_DATABASE: &str = "(default)";
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Credentials and namespace of the remote store, all taken from settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_key: String,
    pub project_id: String,
    pub user_id: String,
    pub database: String,
}

impl RemoteConfig {
    /// Returns None unless api key, project id and user id are all set.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        Some(Self {
            api_key: settings.get(fields::FB_API_KEY)?.to_string(),
            project_id: settings.get(fields::FB_PROJECT_ID)?.to_string(),
            user_id: settings.get(fields::FB_USER_ID)?.to_string(),
            database: settings
                .get(fields::FB_DATABASE)
                .unwrap_or(DEFAULT_DATABASE)
                .to_string(),
        })
    }
}

/// Transport options, taken from the local app configuration rather than the
/// synced settings.
#[derive(Debug, Clone)]
pub struct RemoteOptions {
    pub endpoint: String,
    pub timeout: Duration,
    pub page_size: usize,
}

impl Default for RemoteOptions {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FIRESTORE_ENDPOINT.to_string(),
            timeout: Duration::from_secs(30),
            page_size: 100,
        }
    }
}
