//! The I/O seam between `MixpanelClient` and the network.
//!
//! # Design
//! `Transport` executes exactly one `HttpRequest` and reports what came
//! back. Status codes are returned as data, never as errors, so
//! `MixpanelClient::parse_response` owns the success contract. Timeouts and
//! cancellation belong to the transport (for `UreqTransport`, to the agent).

use crate::error::BoxError;
use crate::http::{HttpRequest, HttpResponse};

/// Executes a single POST round trip. Implementations must be share-safe.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError>;
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
        (**self).execute(request)
    }
}

#[cfg(feature = "ureq")]
pub use self::ureq_transport::UreqTransport;

#[cfg(feature = "ureq")]
mod ureq_transport {
    use super::*;

    /// Blocking transport backed by a `ureq` agent.
    #[derive(Clone)]
    pub struct UreqTransport {
        agent: ureq::Agent,
    }

    impl UreqTransport {
        /// Agent with ureq's status-code-as-error behavior disabled.
        pub fn new() -> Self {
            let agent = ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .new_agent();
            Self { agent }
        }

        /// Use a caller-configured agent (timeouts, proxies, TLS).
        pub fn with_agent(agent: ureq::Agent) -> Self {
            Self { agent }
        }
    }

    impl std::fmt::Debug for UreqTransport {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("UreqTransport").finish_non_exhaustive()
        }
    }

    impl Default for UreqTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Transport for UreqTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, BoxError> {
            let mut builder = self.agent.post(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }

            match builder.send(request.body.as_bytes()) {
                Ok(mut response) => {
                    let status = response.status().as_u16();
                    let body = response.body_mut().read_to_string()?;
                    Ok(HttpResponse { status, body })
                }
                // Agents supplied via `with_agent` may still treat statuses as errors.
                Err(ureq::Error::StatusCode(status)) => Ok(HttpResponse::new(status, "")),
                Err(err) => Err(err.into()),
            }
        }
    }
}
