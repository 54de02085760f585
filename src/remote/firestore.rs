//! HTTP client for the remote document store (Firestore REST layout).

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::document::{
    record_from_document, record_to_document, settings_from_document, settings_to_document,
    Document, ListDocumentsResponse,
};
use super::{RemoteConfig, RemoteError, RemoteOptions, RemoteStore};
use crate::record::Record;
use crate::settings::Settings;

const RECORDS_COLLECTION: &str = "recipes";
const SETTINGS_DOCUMENT: &str = "config/settings";

pub struct FirestoreRemoteStore {
    client: reqwest::Client,
    config: RemoteConfig,
    documents_url: String,
    page_size: usize,
}

impl FirestoreRemoteStore {
    pub fn new(config: RemoteConfig, options: &RemoteOptions) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| RemoteError::NetworkFailure(format!("Failed to create HTTP client: {}", e)))?;

        let documents_url = format!(
            "{}/v1/projects/{}/databases/{}/documents",
            options.endpoint.trim_end_matches('/'),
            urlencoding::encode(&config.project_id),
            config.database,
        );

        Ok(Self {
            client,
            config,
            documents_url,
            page_size: options.page_size.max(1),
        })
    }

    fn user_url(&self) -> String {
        format!(
            "{}/users/{}",
            self.documents_url,
            urlencoding::encode(&self.config.user_id)
        )
    }

    fn records_url(&self) -> String {
        format!("{}/{}", self.user_url(), RECORDS_COLLECTION)
    }

    fn record_url(&self, key: &str) -> String {
        format!("{}/{}", self.records_url(), urlencoding::encode(key))
    }

    fn settings_url(&self) -> String {
        format!("{}/{}", self.user_url(), SETTINGS_DOCUMENT)
    }

    pub fn base_url(&self) -> &str {
        &self.documents_url
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .query(&[("key", self.config.api_key.as_str())])
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        request
            .send()
            .await
            .map_err(|e| RemoteError::NetworkFailure(e.to_string()))
    }

    async fn rejected(response: Response) -> RemoteError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        RemoteError::RemoteRejected { status, message }
    }

    async fn expect_success(response: Response) -> Result<Response, RemoteError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::rejected(response).await)
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        response
            .json()
            .await
            .map_err(|e| RemoteError::NetworkFailure(format!("Undecodable response: {}", e)))
    }
}

#[async_trait]
impl RemoteStore for FirestoreRemoteStore {
    async fn put(&self, record: &Record) -> Result<(), RemoteError> {
        let request = self
            .request(Method::PATCH, &self.record_url(&record.key))
            .json(&record_to_document(record));
        Self::expect_success(self.send(request).await?).await?;
        debug!("Mirrored record {}", record.key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), RemoteError> {
        let response = self
            .send(self.request(Method::DELETE, &self.record_url(key)))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::expect_success(response).await?;
        debug!("Deleted remote record {}", key);
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Record>, RemoteError> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;
        let page_size = self.page_size.to_string();

        loop {
            let mut request = self
                .request(Method::GET, &self.records_url())
                .query(&[("pageSize", page_size.as_str())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = self.send(request).await?;
            // Missing collection, nothing to list.
            if response.status() == StatusCode::NOT_FOUND {
                break;
            }
            let page: ListDocumentsResponse =
                Self::decode(Self::expect_success(response).await?).await?;

            for document in &page.documents {
                match record_from_document(document) {
                    Ok(record) => records.push(record),
                    Err(e) => warn!(
                        "Skipping undecodable remote document {:?}: {}",
                        document.name, e
                    ),
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Fetched {} remote records", records.len());
        Ok(records)
    }

    async fn get_settings(&self) -> Result<Option<Settings>, RemoteError> {
        let response = self
            .send(self.request(Method::GET, &self.settings_url()))
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let document: Document = Self::decode(Self::expect_success(response).await?).await?;
        Ok(Some(settings_from_document(&document)))
    }

    async fn put_settings(&self, settings: &Settings) -> Result<(), RemoteError> {
        let request = self
            .request(Method::PATCH, &self.settings_url())
            .json(&settings_to_document(settings));
        Self::expect_success(self.send(request).await?).await?;
        debug!("Mirrored settings");
        Ok(())
    }
}
