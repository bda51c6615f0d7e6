//! HTTP request/response values exchanged with a `Transport`.
//!
//! # Design
//! `MixpanelClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without doing any I/O; a `Transport` carries one across the
//! network and hands back the other. Every ingestion call is a POST, so the
//! request carries no method.

/// Endpoints of the ingestion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Track,
    Import,
    Engage,
}

impl Endpoint {
    /// Path component used in request URLs and in `Api` errors.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Track => "/track",
            Endpoint::Import => "/import",
            Endpoint::Engage => "/engage",
        }
    }
}

/// A POST request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub endpoint: Endpoint,
    /// Absolute URL including any query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response described as plain data, produced by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}
