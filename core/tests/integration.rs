//! End-to-end tests against the live mock ingestion server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `Mixpanel` over real
//! HTTP with the default `ureq` transport and inspects what the server
//! decoded.

use mixpanel_core::{
    Config, Event, EventLocation, EventsApi, Mixpanel, MixpanelError, Update, UreqTransport,
};
use mock_server::{Db, ReceivedRequest};
use serde_json::Value;

const TOKEN: &str = "api_token";
const ACCOUNT: &str = "service_account";
const SECRET: &str = "service_secret";
const PROJECT_ID: &str = "test_project";

/// Start the mock server on a random port and return its URL and state.
fn start_server() -> (String, Db) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let db = mock_server::new_db();
    let server_db = db.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_state(listener, server_db).await
        })
        .unwrap();
    });

    (format!("http://{addr}"), db)
}

fn setup() -> (Mixpanel<UreqTransport>, Db) {
    let (url, db) = start_server();
    let config = Config::builder()
        .token(TOKEN)
        .api_url(url)
        .service_account(ACCOUNT, SECRET)
        .project_id(PROJECT_ID)
        .build();
    (Mixpanel::with_default_transport(config), db)
}

fn last_request(db: &Db) -> ReceivedRequest {
    db.blocking_read().last().cloned().expect("no request received")
}

/// Decode a wire event back into an `Event`, returning the token separately.
fn decode_event(wire: &Value) -> (Event, Option<String>) {
    let mut event = Event::new(wire["event"].as_str().unwrap(), "");
    let mut token = None;
    for (key, value) in wire["properties"].as_object().unwrap() {
        match key.as_str() {
            "distinct_id" => event.distinct_id = value.as_str().unwrap().to_string(),
            "$insert_id" => event.insert_id = value.as_str().unwrap().to_string(),
            "token" => token = Some(value.as_str().unwrap().to_string()),
            _ => {
                event.custom_properties.insert(key.clone(), value.clone());
            }
        }
    }
    (event, token)
}

#[test]
fn track_sends_event_with_token() {
    let (mp, db) = setup();
    let event = Event::new("Signed Up", "1337").with_property("Referred By", "Friend");
    mp.track(&event).unwrap();

    let received = last_request(&db);
    assert_eq!(received.path, "/track");
    assert_eq!(received.content_type.as_deref(), Some("application/x-www-form-urlencoded"));
    assert_eq!(received.accept.as_deref(), Some("text/plain"));
    assert_eq!(received.payloads.len(), 1);

    let (decoded, token) = decode_event(&received.payloads[0]);
    assert_eq!(decoded, event);
    assert_eq!(token.as_deref(), Some(TOKEN));
}

#[test]
fn import_sends_batch_with_credentials() {
    let (mp, db) = setup();
    let events = vec![
        Event::new("Signed Up", "2")
            .with_insert_id("123")
            .with_property("Referred By", "Friend"),
        Event::new("Purchase", "2").with_property("Amount", 5.0),
    ];
    mp.import(&events).unwrap();

    let received = last_request(&db);
    assert_eq!(received.path, "/import");
    assert_eq!(
        received.query.as_deref(),
        Some("strict=1&project_id=test_project")
    );
    assert_eq!(received.content_type.as_deref(), Some("application/json"));
    assert_eq!(received.accept.as_deref(), Some("application/json"));
    assert_eq!(
        received.basic_auth,
        Some((ACCOUNT.to_string(), SECRET.to_string()))
    );
    assert_eq!(received.payloads.len(), 2);

    let (first, token) = decode_event(&received.payloads[0]);
    assert_eq!(first, events[0]);
    assert_eq!(token, None);

    let (second, token) = decode_event(&received.payloads[1]);
    assert_eq!(token, None);
    assert_eq!(second.name, "Purchase");
    assert_eq!(second.insert_id.len(), 32);
    assert_eq!(second.insert_id, mixpanel_core::encode::derive_insert_id(&events[1]));
}

#[test]
fn import_twice_yields_same_insert_ids() {
    let (mp, db) = setup();
    let events = vec![Event::new("Purchase", "3")
        .with_location(EventLocation::new("Paris", "", "fr"))
        .with_property("sku", "X-1")];
    mp.import(&events).unwrap();
    mp.import(&events).unwrap();

    let ingest = db.blocking_read();
    assert_eq!(ingest.requests.len(), 2);
    let first = &ingest.requests[0].payloads[0]["properties"];
    let second = &ingest.requests[1].payloads[0]["properties"];
    assert_eq!(first["$insert_id"], second["$insert_id"]);
    assert_eq!(first["mp_country_code"], "FR");
}

#[test]
fn update_and_alias_reach_the_server() {
    let (mp, db) = setup();
    mp.update("7", &Update::new("$set").with_property("plan", "pro"))
        .unwrap();
    let received = last_request(&db);
    assert_eq!(received.path, "/engage");
    assert_eq!(received.payloads[0]["$set"]["plan"], "pro");
    assert_eq!(received.payloads[0]["$token"], TOKEN);

    mp.alias("anon-1", "7").unwrap();
    let received = last_request(&db);
    assert_eq!(received.path, "/track");
    assert_eq!(received.payloads[0]["event"], "$create_alias");
    assert_eq!(received.payloads[0]["properties"]["alias"], "7");
}

#[test]
fn error_status_surfaces_as_api_error() {
    let (mp, db) = setup();
    db.blocking_write().fail_with(500, "internal error");

    let err = mp.track(&Event::new("A", "1")).unwrap_err();
    match err {
        MixpanelError::Api { status, path, body } => {
            assert_eq!(status, 500);
            assert_eq!(path, "/track");
            assert_eq!(body, "internal error");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    db.blocking_write().fail_with(401, "unauthorized");
    let err = mp.import(&[Event::new("A", "1")]).unwrap_err();
    assert_eq!(err.status(), Some(401));

    db.blocking_write().clear_failure();
    mp.track(&Event::new("A", "1")).unwrap();
}

#[test]
fn unreachable_server_is_a_transport_error() {
    // Bind then drop to get a port with nothing listening.
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let config = Config::builder().api_url(format!("http://{addr}")).build();
    let mp = Mixpanel::with_default_transport(config);

    let err = mp.track(&Event::new("A", "1")).unwrap_err();
    match err {
        MixpanelError::Transport { url, .. } => assert_eq!(url, format!("http://{addr}/track")),
        other => panic!("unexpected error: {other:?}"),
    }
}
