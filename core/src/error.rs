//! Error types for the Mixpanel client.
//!
//! # Design
//! Transport failures, encoding failures and API rejections are distinct
//! variants so callers can tell "the request never arrived" from "the
//! service said no". `Api` keeps the raw status, request path and body for
//! debugging. Nothing here is retried.

use thiserror::Error;

/// Boxed error produced by a [`Transport`](crate::Transport) implementation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by every `EventsApi` operation.
#[derive(Debug, Error)]
pub enum MixpanelError {
    /// The request could not be delivered (connection, DNS, timeout).
    #[error("mixpanel: request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: BoxError,
    },

    /// A payload could not be serialized to JSON or form encoding.
    #[error("mixpanel: encoding failed: {0}")]
    Encoding(String),

    /// The service answered with a non-success status.
    #[error("error returned from mixpanel: code: {status}, api: {path}, response: {body}")]
    Api {
        status: u16,
        path: String,
        body: String,
    },

    /// A configuration value required by the operation is not set.
    #[error("mixpanel: missing configuration value: {0}")]
    MissingConfig(&'static str),

    /// A profile update was rejected before sending.
    #[error("mixpanel: invalid update: {0}")]
    InvalidUpdate(String),
}

impl MixpanelError {
    /// True when the service was reached and rejected the request.
    pub fn is_api_error(&self) -> bool {
        matches!(self, MixpanelError::Api { .. })
    }

    /// HTTP status of an API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            MixpanelError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for MixpanelError {
    fn from(err: serde_json::Error) -> Self {
        MixpanelError::Encoding(err.to_string())
    }
}

impl From<serde_urlencoded::ser::Error> for MixpanelError {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        MixpanelError::Encoding(err.to_string())
    }
}

/// Result type alias for Mixpanel operations.
pub type Result<T> = std::result::Result<T, MixpanelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_status_path_and_body() {
        let err = MixpanelError::Api {
            status: 401,
            path: "/import".to_string(),
            body: "unauthorized".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "error returned from mixpanel: code: 401, api: /import, response: unauthorized"
        );
        assert!(err.is_api_error());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn transport_error_keeps_source() {
        let source: BoxError = "connection refused".into();
        let err = MixpanelError::Transport {
            url: "http://localhost:1/track".to_string(),
            source,
        };
        assert!(!err.is_api_error());
        assert_eq!(err.status(), None);
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("http://localhost:1/track"));
    }

    #[test]
    fn json_error_converts_to_encoding() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MixpanelError = json_err.into();
        assert!(matches!(err, MixpanelError::Encoding(_)));
    }
}
