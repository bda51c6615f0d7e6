//! In-memory stand-in for [`Mixpanel`](crate::Mixpanel), for unit tests.
//!
//! # Design
//! Events and updates are recorded per distinct ID in submission order
//! behind a single mutex. `import` assigns insert ids with the same
//! derivation as the networked client, so stored events have the shape the
//! service would have received. A mock built with `with_config` also rejects
//! imports without a project id, as `Mixpanel::import` does.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

use crate::config::Config;
use crate::encode::{insert_id_for, ALIAS_EVENT};
use crate::error::{MixpanelError, Result};
use crate::mixpanel::EventsApi;
use crate::types::{Event, Update};

/// Everything recorded for one distinct ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MockProfile {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub updates: Vec<Update>,
}

/// Without a config every import is accepted.
#[derive(Debug, Default)]
pub struct MockClient {
    config: Option<Config>,
    store: Mutex<BTreeMap<String, MockProfile>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mock that applies the same configuration checks as `Mixpanel`.
    pub fn with_config(config: Config) -> Self {
        Self {
            config: Some(config),
            store: Mutex::default(),
        }
    }

    /// Events recorded for `distinct_id`, oldest first.
    pub fn events(&self, distinct_id: &str) -> Vec<Event> {
        self.lock()
            .get(distinct_id)
            .map(|p| p.events.clone())
            .unwrap_or_default()
    }

    /// Updates recorded for `distinct_id`, oldest first.
    pub fn updates(&self, distinct_id: &str) -> Vec<Update> {
        self.lock()
            .get(distinct_id)
            .map(|p| p.updates.clone())
            .unwrap_or_default()
    }

    /// Every distinct ID seen so far, sorted.
    pub fn distinct_ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn snapshot(&self) -> BTreeMap<String, MockProfile> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, MockProfile>> {
        // A panicking caller cannot leave the map half-written.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(store: &mut BTreeMap<String, MockProfile>, event: Event) {
        store
            .entry(event.distinct_id.clone())
            .or_default()
            .events
            .push(event);
    }
}

impl EventsApi for MockClient {
    fn track(&self, event: &Event) -> Result<()> {
        Self::record(&mut self.lock(), event.clone());
        Ok(())
    }

    fn import(&self, events: &[Event]) -> Result<()> {
        if let Some(config) = &self.config {
            config
                .project_id()
                .ok_or(MixpanelError::MissingConfig("project_id"))?;
        }
        let mut store = self.lock();
        for event in events {
            let mut event = event.clone();
            event.insert_id = insert_id_for(&event);
            Self::record(&mut store, event);
        }
        Ok(())
    }

    fn update(&self, distinct_id: &str, update: &Update) -> Result<()> {
        update.validate()?;
        self.lock()
            .entry(distinct_id.to_string())
            .or_default()
            .updates
            .push(update.clone());
        Ok(())
    }

    fn alias(&self, distinct_id: &str, alias: &str) -> Result<()> {
        let event = Event::new(ALIAS_EVENT, distinct_id).with_property("alias", alias);
        Self::record(&mut self.lock(), event);
        Ok(())
    }
}

/// Tab-indented JSON of the whole store, grouped by distinct ID.
impl fmt::Display for MockClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.lock();
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        if store.serialize(&mut ser).is_err() {
            return f.write_str("ERROR");
        }
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}
