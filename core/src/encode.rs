//! Wire encoding for events, profile updates and aliases.
//!
//! Every function here is pure: it turns domain values into the JSON the
//! ingestion service expects and never touches the network.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::types::{Event, Update};

/// Event name the service interprets as an identity merge.
pub const ALIAS_EVENT: &str = "$create_alias";

/// Encodes `event` as `{"event": name, "properties": {...}}`.
///
/// `token` is embedded as `properties.token` when non-empty. The track path
/// passes the project token; the import path passes `""` and authenticates
/// at the request level instead.
///
/// Reserved keys (`distinct_id`, `token`, `ip`, `$city`, `$region`,
/// `mp_country_code`, `time`, `$insert_id`) are written first and custom
/// properties are overlaid afterwards, so a custom property with a reserved
/// name replaces the reserved value on the wire.
pub fn encode(event: &Event, token: &str) -> Value {
    let mut props = Map::new();
    props.insert("distinct_id".to_string(), Value::from(event.distinct_id.as_str()));
    if !token.is_empty() {
        props.insert("token".to_string(), Value::from(token));
    }
    if let Some(ip) = &event.ipv4_address {
        props.insert("ip".to_string(), Value::from(ip.as_str()));
    }
    if let Some(location) = &event.location {
        if !location.city.is_empty() {
            props.insert("$city".to_string(), Value::from(location.city.as_str()));
        }
        if !location.region.is_empty() {
            props.insert("$region".to_string(), Value::from(location.region.as_str()));
        }
        // No lookup against an ISO table. Non-ASCII input is dropped since
        // Unicode uppercasing can change the length ("ß" -> "SS").
        if location.country.len() == 2 && location.country.is_ascii() {
            props.insert(
                "mp_country_code".to_string(),
                Value::from(location.country.to_ascii_uppercase()),
            );
        }
    }
    if let Some(time) = &event.time {
        props.insert("time".to_string(), Value::from(time.timestamp()));
    }
    if !event.insert_id.is_empty() {
        props.insert("$insert_id".to_string(), Value::from(event.insert_id.as_str()));
    }

    for (key, value) in &event.custom_properties {
        props.insert(key.clone(), value.clone());
    }

    json!({
        "event": event.name,
        "properties": Value::Object(props),
    })
}

/// Encodes an event for the import path: no embedded token and an insert id
/// that is always present.
pub fn encode_for_import(event: &Event) -> Value {
    if event.insert_id.is_empty() {
        let mut event = event.clone();
        event.insert_id = derive_insert_id(&event);
        encode(&event, "")
    } else {
        encode(event, "")
    }
}

/// Returns the caller's insert id, or the derived one when it is empty.
pub fn insert_id_for(event: &Event) -> String {
    if event.insert_id.is_empty() {
        derive_insert_id(event)
    } else {
        event.insert_id.clone()
    }
}

/// Content-derived dedup identifier.
///
/// The input is the canonical JSON of the event (serde field order, custom
/// properties sorted by key) with the insert id cleared. The digest is the
/// first 128 bits of SHA-256, hex-encoded to 32 characters. Not a security
/// boundary.
pub fn derive_insert_id(event: &Event) -> String {
    let mut hasher = Sha256::new();
    if event.insert_id.is_empty() {
        write_canonical(&mut hasher, event);
    } else {
        let mut content = event.clone();
        content.insert_id.clear();
        write_canonical(&mut hasher, &content);
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

fn write_canonical(hasher: &mut Sha256, event: &Event) {
    // BTreeMap-backed properties and plain structs cannot fail to serialize.
    hasher.update(serde_json::to_vec(event).unwrap_or_default());
}

/// Encodes a profile update for the `engage` endpoint.
pub fn encode_update(distinct_id: &str, update: &Update, token: &str) -> Value {
    let mut params = Map::new();
    params.insert("$token".to_string(), Value::from(token));
    params.insert("$distinct_id".to_string(), Value::from(distinct_id));
    let properties: Map<String, Value> = update
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    params.insert(update.operation.clone(), Value::Object(properties));
    Value::Object(params)
}

/// Encodes the `$create_alias` pseudo-event mapping `alias` onto `distinct_id`.
pub fn encode_alias(distinct_id: &str, alias: &str, token: &str) -> Value {
    json!({
        "event": ALIAS_EVENT,
        "properties": {
            "distinct_id": distinct_id,
            "alias": alias,
            "token": token,
        },
    })
}
