//! Fake remote document server
//!
//! Serves the subset of the Firestore REST layout the remote store client
//! uses, keeping documents in memory. Each test gets its own server on a
//! random port; it stops when dropped.

#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const API_KEY: &str = "test-key";

#[derive(Default)]
pub struct DocumentState {
    /// Record documents by user id, then key.
    pub records: BTreeMap<String, BTreeMap<String, Value>>,
    pub settings: BTreeMap<String, Value>,
    /// `METHOD path-suffix` of every request received.
    pub requests: Vec<String>,
    /// When set, every request is answered with this status.
    pub fail_with: Option<StatusCode>,
}

type SharedState = Arc<Mutex<DocumentState>>;
type Params = HashMap<String, String>;

pub struct FakeDocumentServer {
    /// Endpoint to hand to the client, e.g. "http://127.0.0.1:12345"
    pub base_url: String,
    pub state: SharedState,
    handle: JoinHandle<()>,
}

impl FakeDocumentServer {
    pub async fn spawn() -> Self {
        let state: SharedState = Arc::new(Mutex::new(DocumentState::default()));

        let app = Router::new()
            .route(
                "/v1/projects/{project}/databases/{database}/documents/users/{user}/recipes",
                get(list_records),
            )
            .route(
                "/v1/projects/{project}/databases/{database}/documents/users/{user}/recipes/{key}",
                patch(put_record).delete(delete_record),
            )
            .route(
                "/v1/projects/{project}/databases/{database}/documents/users/{user}/config/settings",
                get(get_settings).patch(put_settings),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn fail_with(&self, status: Option<StatusCode>) {
        self.state.lock().unwrap().fail_with = status;
    }

    /// Stores a raw record document as if another device had written it.
    pub fn insert_record(&self, user: &str, key: &str, fields: Value) {
        let name = record_name("p", "(default)", user, key);
        self.state
            .lock()
            .unwrap()
            .records
            .entry(user.to_string())
            .or_default()
            .insert(key.to_string(), json!({ "name": name, "fields": fields }));
    }

    pub fn record(&self, user: &str, key: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .records
            .get(user)
            .and_then(|docs| docs.get(key))
            .cloned()
    }

    pub fn settings(&self, user: &str) -> Option<Value> {
        self.state.lock().unwrap().settings.get(user).cloned()
    }
}

impl Drop for FakeDocumentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn record_name(project: &str, database: &str, user: &str, key: &str) -> String {
    format!(
        "projects/{}/databases/{}/documents/users/{}/recipes/{}",
        project,
        database,
        user,
        urlencoding::encode(key)
    )
}

/// Logs the request and applies the api key check and failure injection.
fn admit(
    state: &SharedState,
    request: String,
    params: &Params,
) -> Result<(), (StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    state.requests.push(request);
    if let Some(status) = state.fail_with {
        return Err((status, Json(json!({ "error": { "message": "injected" } }))));
    }
    if params.get("key").map(String::as_str) != Some(API_KEY) {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "message": "bad api key" } })),
        ));
    }
    Ok(())
}

async fn list_records(
    State(state): State<SharedState>,
    Path((project, database, user)): Path<(String, String, String)>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    admit(&state, "GET recipes".to_string(), &params)?;

    let page_size: usize = params
        .get("pageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(100);
    let offset: usize = params
        .get("pageToken")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);

    let state = state.lock().unwrap();
    let Some(docs) = state.records.get(&user) else {
        return Ok(Json(json!({})));
    };
    let page: Vec<Value> = docs
        .iter()
        .skip(offset)
        .take(page_size)
        .map(|(key, doc)| {
            let mut doc = doc.clone();
            doc["name"] = json!(record_name(&project, &database, &user, key));
            doc
        })
        .collect();

    let mut body = json!({ "documents": page });
    if offset + page_size < docs.len() {
        body["nextPageToken"] = json!((offset + page_size).to_string());
    }
    Ok(Json(body))
}

async fn put_record(
    State(state): State<SharedState>,
    Path((_project, _database, user, key)): Path<(String, String, String, String)>,
    Query(params): Query<Params>,
    Json(document): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    admit(&state, format!("PATCH recipes/{}", key), &params)?;
    state
        .lock()
        .unwrap()
        .records
        .entry(user)
        .or_default()
        .insert(key, document.clone());
    Ok(Json(document))
}

async fn delete_record(
    State(state): State<SharedState>,
    Path((_project, _database, user, key)): Path<(String, String, String, String)>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    admit(&state, format!("DELETE recipes/{}", key), &params)?;
    let removed = state
        .lock()
        .unwrap()
        .records
        .get_mut(&user)
        .and_then(|docs| docs.remove(&key));
    match removed {
        Some(_) => Ok(Json(json!({}))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "message": "not found" } })),
        )),
    }
}

async fn get_settings(
    State(state): State<SharedState>,
    Path((_project, _database, user)): Path<(String, String, String)>,
    Query(params): Query<Params>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    admit(&state, "GET settings".to_string(), &params)?;
    match state.lock().unwrap().settings.get(&user) {
        Some(document) => Ok(Json(document.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "message": "not found" } })),
        )),
    }
}

async fn put_settings(
    State(state): State<SharedState>,
    Path((_project, _database, user)): Path<(String, String, String)>,
    Query(params): Query<Params>,
    Json(document): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    admit(&state, "PATCH settings".to_string(), &params)?;
    state
        .lock()
        .unwrap()
        .settings
        .insert(user, document.clone());
    Ok(Json(document))
}
