//! The public events surface and its networked implementation.

use tracing::debug;

use crate::client::MixpanelClient;
use crate::config::Config;
use crate::error::{MixpanelError, Result};
use crate::http::HttpRequest;
use crate::transport::Transport;
use crate::types::{Event, Update};

/// Operations shared by [`Mixpanel`] and [`MockClient`](crate::MockClient).
pub trait EventsApi: Send + Sync {
    /// Send one event to `/track`. The project token is embedded.
    fn track(&self, event: &Event) -> Result<()>;

    /// Send a batch of events to `/import`. Missing insert ids are derived
    /// from event content.
    fn import(&self, events: &[Event]) -> Result<()>;

    /// Apply a profile update through `/engage`.
    fn update(&self, distinct_id: &str, update: &Update) -> Result<()>;

    /// Map `alias` onto `distinct_id`. Call once per alias.
    fn alias(&self, distinct_id: &str, alias: &str) -> Result<()>;
}

/// Networked client: encodes, performs one round trip, interprets the status.
///
/// Blocks the calling thread for the duration of the request. Nothing is
/// retried or queued.
#[derive(Debug, Clone)]
pub struct Mixpanel<T> {
    client: MixpanelClient,
    transport: T,
}

impl<T: Transport> Mixpanel<T> {
    pub fn new(config: Config, transport: T) -> Self {
        Self {
            client: MixpanelClient::new(config),
            transport,
        }
    }

    pub fn config(&self) -> &Config {
        self.client.config()
    }

    fn send(&self, request: HttpRequest) -> Result<()> {
        debug!(path = request.endpoint.path(), bytes = request.body.len(), "sending mixpanel request");
        let response = self
            .transport
            .execute(&request)
            .map_err(|source| MixpanelError::Transport {
                url: request.url.clone(),
                source,
            })?;
        self.client.parse_response(request.endpoint, response)
    }
}

#[cfg(feature = "ureq")]
impl Mixpanel<crate::transport::UreqTransport> {
    /// Client backed by a fresh blocking `ureq` agent.
    pub fn with_default_transport(config: Config) -> Self {
        Self::new(config, crate::transport::UreqTransport::new())
    }
}

impl<T: Transport> EventsApi for Mixpanel<T> {
    fn track(&self, event: &Event) -> Result<()> {
        let request = self.client.build_track(event)?;
        self.send(request)
    }

    fn import(&self, events: &[Event]) -> Result<()> {
        let request = self.client.build_import(events)?;
        debug!(events = events.len(), "importing mixpanel events");
        self.send(request)
    }

    fn update(&self, distinct_id: &str, update: &Update) -> Result<()> {
        let request = self.client.build_update(distinct_id, update)?;
        self.send(request)
    }

    fn alias(&self, distinct_id: &str, alias: &str) -> Result<()> {
        let request = self.client.build_alias(distinct_id, alias)?;
        self.send(request)
    }
}
