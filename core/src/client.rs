//! Stateless HTTP request builder and response parser for the ingestion API.
//!
//! # Design
//! `MixpanelClient` holds only an immutable `Config`. Each operation is a
//! `build_*` method that produces an `HttpRequest`; `parse_response` turns
//! the `HttpResponse` a transport returns into `Ok(())` or an `Api` error.
//! Success means a status below 300; the body is not inspected.
//!
//! Authentication: track, engage and alias payloads embed the project
//! token, import payloads never do. Basic auth is attached to every request
//! when a service account is configured.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, warn};

use crate::config::{Auth, Config};
use crate::encode::{encode, encode_alias, encode_for_import, encode_update};
use crate::error::{MixpanelError, Result};
use crate::http::{Endpoint, HttpRequest, HttpResponse};
use crate::types::{Event, Update};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
const APPLICATION_JSON: &str = "application/json";
const TEXT_PLAIN: &str = "text/plain";

#[derive(Debug, Clone)]
pub struct MixpanelClient {
    config: Config,
}

impl MixpanelClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// `POST /track` with the event as a form-encoded `data` field.
    pub fn build_track(&self, event: &Event) -> Result<HttpRequest> {
        let payload = encode(event, self.config.token());
        self.form_request(Endpoint::Track, &payload)
    }

    /// `POST /import?strict=1&project_id=..` with a JSON array body.
    ///
    /// Events without an insert id get a content-derived one. Fails with
    /// `MissingConfig` when no project id is configured.
    pub fn build_import(&self, events: &[Event]) -> Result<HttpRequest> {
        let project_id = self
            .config
            .project_id()
            .ok_or(MixpanelError::MissingConfig("project_id"))?;
        let payload: Vec<serde_json::Value> = events.iter().map(encode_for_import).collect();
        let body = serde_json::to_string(&payload)?;
        let query = serde_urlencoded::to_string(&[("strict", "1"), ("project_id", project_id)])?;

        let mut headers = vec![
            ("content-type".to_string(), APPLICATION_JSON.to_string()),
            ("accept".to_string(), APPLICATION_JSON.to_string()),
        ];
        self.push_auth(&mut headers);
        Ok(HttpRequest {
            endpoint: Endpoint::Import,
            url: format!("{}{}?{query}", self.config.api_url(), Endpoint::Import.path()),
            headers,
            body,
        })
    }

    /// `POST /engage` with the profile update as a form-encoded `data` field.
    pub fn build_update(&self, distinct_id: &str, update: &Update) -> Result<HttpRequest> {
        update.validate()?;
        let payload = encode_update(distinct_id, update, self.config.token());
        self.form_request(Endpoint::Engage, &payload)
    }

    /// `POST /track` with a `$create_alias` pseudo-event.
    pub fn build_alias(&self, distinct_id: &str, alias: &str) -> Result<HttpRequest> {
        let payload = encode_alias(distinct_id, alias, self.config.token());
        self.form_request(Endpoint::Track, &payload)
    }

    pub fn parse_response(&self, endpoint: Endpoint, response: HttpResponse) -> Result<()> {
        if response.status < 300 {
            debug!(path = endpoint.path(), status = response.status, "mixpanel request accepted");
            return Ok(());
        }
        warn!(
            path = endpoint.path(),
            status = response.status,
            body = %response.body,
            "mixpanel request rejected"
        );
        Err(MixpanelError::Api {
            status: response.status,
            path: endpoint.path().to_string(),
            body: response.body,
        })
    }

    fn form_request(&self, endpoint: Endpoint, payload: &serde_json::Value) -> Result<HttpRequest> {
        let data = serde_json::to_string(payload)?;
        let body = serde_urlencoded::to_string(&[("data", data.as_str())])?;
        let mut headers = vec![
            ("content-type".to_string(), FORM_URLENCODED.to_string()),
            ("accept".to_string(), TEXT_PLAIN.to_string()),
        ];
        self.push_auth(&mut headers);
        Ok(HttpRequest {
            endpoint,
            url: format!("{}{}", self.config.api_url(), endpoint.path()),
            headers,
            body,
        })
    }

    fn push_auth(&self, headers: &mut Vec<(String, String)>) {
        if let Auth::ServiceAccount { username, secret } = self.config.auth() {
            let credentials = STANDARD.encode(format!("{username}:{secret}"));
            headers.push(("authorization".to_string(), format!("Basic {credentials}")));
        }
    }
}
