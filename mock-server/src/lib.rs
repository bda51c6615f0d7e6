//! Stand-in for the Mixpanel ingestion service.
//!
//! Accepts `/track`, `/engage` and `/import` with the same request shapes
//! as the real service and records every decoded payload so tests can
//! inspect exactly what a client put on the wire.

use std::sync::Arc;

use axum::{
    extract::{RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};

/// One request as the server decoded it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReceivedRequest {
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub accept: Option<String>,
    /// Decoded `Authorization: Basic` credentials.
    pub basic_auth: Option<(String, String)>,
    /// One entry for form endpoints, one per event for `/import`.
    pub payloads: Vec<Value>,
}

#[derive(Debug, Default)]
pub struct Ingest {
    pub requests: Vec<ReceivedRequest>,
    failure: Option<(u16, String)>,
}

impl Ingest {
    /// Answer every following request with `status` and `body`.
    pub fn fail_with(&mut self, status: u16, body: impl Into<String>) {
        self.failure = Some((status, body.into()));
    }

    pub fn clear_failure(&mut self) {
        self.failure = None;
    }

    pub fn last(&self) -> Option<&ReceivedRequest> {
        self.requests.last()
    }
}

pub type Db = Arc<RwLock<Ingest>>;

#[derive(Deserialize)]
struct DataForm {
    data: String,
}

#[derive(Deserialize)]
struct ImportParams {
    strict: Option<String>,
    project_id: Option<String>,
}

pub fn new_db() -> Db {
    Arc::new(RwLock::new(Ingest::default()))
}

pub fn app() -> Router {
    app_with_state(new_db())
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route("/track", post(track))
        .route("/engage", post(engage))
        .route("/import", post(import))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, new_db()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

async fn track(State(db): State<Db>, headers: HeaderMap, body: String) -> Response {
    form_endpoint("/track", db, headers, body).await
}

async fn engage(State(db): State<Db>, headers: HeaderMap, body: String) -> Response {
    form_endpoint("/engage", db, headers, body).await
}

async fn form_endpoint(path: &str, db: Db, headers: HeaderMap, body: String) -> Response {
    let payload = serde_urlencoded::from_str::<DataForm>(&body)
        .ok()
        .and_then(|form| serde_json::from_str::<Value>(&form.data).ok());
    let Some(payload) = payload else {
        warn!(path, "rejecting malformed form body");
        return (StatusCode::BAD_REQUEST, "0").into_response();
    };

    let mut ingest = db.write().await;
    ingest.requests.push(received(path, None, &headers, vec![payload]));
    info!(path, "accepted form payload");
    if let Some(failure) = failure_response(&ingest) {
        return failure;
    }
    (StatusCode::OK, "1").into_response()
}

async fn import(
    State(db): State<Db>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: String,
) -> Response {
    let params: Option<ImportParams> = query
        .as_deref()
        .and_then(|q| serde_urlencoded::from_str(q).ok());
    let Some(ImportParams {
        project_id: Some(_),
        strict,
    }) = params
    else {
        return bad_request("missing project_id");
    };
    let Ok(events) = serde_json::from_str::<Vec<Value>>(&body) else {
        return bad_request("body must be a JSON array of events");
    };
    if strict.as_deref() == Some("1") {
        if let Some(index) = events.iter().position(|e| e["properties"]["$insert_id"].is_null()) {
            return bad_request(&format!("event {index} is missing $insert_id"));
        }
    }

    let count = events.len();
    let mut ingest = db.write().await;
    ingest.requests.push(received("/import", query, &headers, events));
    info!(count, "accepted import batch");
    if let Some(failure) = failure_response(&ingest) {
        return failure;
    }
    Json(json!({"code": 200, "num_records_imported": count, "status": "OK"})).into_response()
}

fn bad_request(error: &str) -> Response {
    warn!(error, "rejecting import batch");
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"code": 400, "error": error, "status": "Bad Request"})),
    )
        .into_response()
}

fn failure_response(ingest: &Ingest) -> Option<Response> {
    let (status, body) = ingest.failure.as_ref()?;
    let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Some((status, body.clone()).into_response())
}

fn received(path: &str, query: Option<String>, headers: &HeaderMap, payloads: Vec<Value>) -> ReceivedRequest {
    let header_str = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    ReceivedRequest {
        path: path.to_string(),
        query,
        content_type: header_str(header::CONTENT_TYPE),
        accept: header_str(header::ACCEPT),
        basic_auth: header_str(header::AUTHORIZATION).and_then(|v| decode_basic_auth(&v)),
        payloads,
    }
}

fn decode_basic_auth(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (user, secret) = decoded.split_once(':')?;
    Some((user.to_string(), secret.to_string()))
}
