//! Domain types for the Mixpanel ingestion API.
//!
//! # Design
//! `Event` and `Update` are the in-memory shapes callers build. They are
//! never sent as-is: the `encode` module turns them into wire payloads.
//! Custom properties live in a `BTreeMap` so the serde representation of an
//! event is stable, which the dedup identifier derivation relies on.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MixpanelError, Result};

/// One analytics occurrence tied to an actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Semantic label of the event, e.g. `"Signed Up"`.
    pub name: String,

    /// Actor (user or device) that produced the event.
    pub distinct_id: String,

    /// Dedup identifier. Leave empty to have one derived on import.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub insert_id: String,

    /// Client IP for geolocation. Only provide one of this or `location`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,

    /// Explicit location. Only provide one of this or `ipv4_address`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<EventLocation>,

    /// When the event happened. `None` lets the service use ingestion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,

    /// Extra properties merged into the wire payload after the reserved keys,
    /// so a key such as `distinct_id` or `token` replaces the reserved value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_properties: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<String>, distinct_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            distinct_id: distinct_id.into(),
            ..Self::default()
        }
    }

    pub fn with_insert_id(mut self, insert_id: impl Into<String>) -> Self {
        self.insert_id = insert_id.into();
        self
    }

    pub fn with_ip(mut self, ipv4_address: impl Into<String>) -> Self {
        self.ipv4_address = Some(ipv4_address.into());
        self
    }

    pub fn with_location(mut self, location: EventLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn at(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    /// Adds a custom property. Keys that match a reserved wire key
    /// (`distinct_id`, `token`, `time`, ...) replace the reserved value.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom_properties.insert(key.into(), value.into());
        self
    }

    /// Adds a custom property from any `Serialize` value.
    ///
    /// Fails with [`MixpanelError::Encoding`] when the value has no JSON
    /// representation (for instance a map keyed by tuples).
    pub fn try_with_property<T>(mut self, key: impl Into<String>, value: &T) -> Result<Self>
    where
        T: Serialize + ?Sized,
    {
        let value = serde_json::to_value(value).map_err(MixpanelError::from)?;
        self.custom_properties.insert(key.into(), value);
        Ok(self)
    }
}

/// Where an event occurred.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLocation {
    #[serde(default)]
    pub city: String,

    /// Usually the state or province.
    #[serde(default)]
    pub region: String,

    /// Two character ISO country code. Anything other than two ASCII
    /// characters is dropped on the wire.
    #[serde(default)]
    pub country: String,
}

impl EventLocation {
    pub fn new(
        city: impl Into<String>,
        region: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        Self {
            city: city.into(),
            region: region.into(),
            country: country.into(),
        }
    }
}

/// A profile mutation sent to the `engage` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Update {
    /// Verb applied server-side, e.g. `"$set"` or `"$union"`.
    pub operation: String,

    /// Properties the operation applies to. At least one is required.
    pub properties: BTreeMap<String, Value>,
}

impl Update {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.operation.is_empty() {
            return Err(MixpanelError::InvalidUpdate("operation must not be empty".to_string()));
        }
        if self.properties.is_empty() {
            return Err(MixpanelError::InvalidUpdate(
                "at least one property must be specified".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn event_builder_sets_fields() {
        let event = Event::new("Signed Up", "1337")
            .with_insert_id("abc")
            .with_ip("10.0.0.1")
            .with_property("Referred By", "Friend");
        assert_eq!(event.name, "Signed Up");
        assert_eq!(event.distinct_id, "1337");
        assert_eq!(event.insert_id, "abc");
        assert_eq!(event.ipv4_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(event.custom_properties["Referred By"], "Friend");
    }

    #[test]
    fn try_with_property_accepts_structs() {
        #[derive(Serialize)]
        struct Cart {
            items: u32,
        }
        let event = Event::new("Checkout", "1")
            .try_with_property("cart", &Cart { items: 3 })
            .unwrap();
        assert_eq!(event.custom_properties["cart"]["items"], 3);
    }

    #[test]
    fn try_with_property_rejects_non_string_map_keys() {
        let mut weird: HashMap<(u8, u8), u8> = HashMap::new();
        weird.insert((1, 2), 3);
        let err = Event::new("Checkout", "1")
            .try_with_property("weird", &weird)
            .unwrap_err();
        assert!(matches!(err, MixpanelError::Encoding(_)));
    }

    #[test]
    fn event_serialization_omits_unset_fields() {
        let json = serde_json::to_value(Event::new("A", "1")).unwrap();
        assert_eq!(json, serde_json::json!({"name": "A", "distinct_id": "1"}));
    }

    #[test]
    fn update_validation() {
        assert!(Update::new("$set").with_property("plan", "pro").validate().is_ok());

        let err = Update::new("$set").validate().unwrap_err();
        assert!(matches!(err, MixpanelError::InvalidUpdate(_)));

        let err = Update::new("").with_property("plan", "pro").validate().unwrap_err();
        assert!(matches!(err, MixpanelError::InvalidUpdate(_)));
    }
}
