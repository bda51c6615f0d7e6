//! Blocking client for the Mixpanel ingestion API.
//!
//! # Overview
//! Records analytics events (`track`), bulk-uploads historical events
//! (`import`), updates user profiles (`update`) and merges identities
//! (`alias`) without callers building wire payloads by hand.
//!
//! # Design
//! - `encode` turns `Event` / `Update` values into the exact JSON the
//!   service expects. It is pure and total.
//! - `MixpanelClient` is sans-IO: `build_*` produces an `HttpRequest`,
//!   `parse_response` interprets the `HttpResponse`.
//! - A `Transport` performs the round trip. It is always injected;
//!   `UreqTransport` (feature `ureq`, on by default) is the stock one.
//! - `Mixpanel<T>` and `MockClient` both implement `EventsApi`, so call
//!   sites can swap the network for an in-memory recorder in tests.

pub mod client;
pub mod config;
pub mod encode;
pub mod error;
pub mod http;
pub mod mixpanel;
pub mod mock;
pub mod transport;
pub mod types;

pub use client::MixpanelClient;
pub use config::{Auth, Config, ConfigBuilder, DEFAULT_API_URL};
pub use error::{BoxError, MixpanelError, Result};
pub use http::{Endpoint, HttpRequest, HttpResponse};
pub use mixpanel::{EventsApi, Mixpanel};
pub use mock::{MockClient, MockProfile};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{Event, EventLocation, Update};
