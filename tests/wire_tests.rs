use guardian::channels::radio::{RadioSource, SimulatedRadio};
use guardian::channels::wire::{parse_push_event, parse_status, parse_status_body, PushEvent, SseDecoder, MAX_LINE_BYTES};
use guardian::kernel::event::Event;
use guardian::kernel::state::Source;
use guardian::GuardianError;
use serde_json::json;

#[test]
fn test_parse_flat_status() {
    let body = json!({
        "connected": true,
        "location": { "lat": 40.7128, "lng": -74.006, "address": "Central Park" },
        "distance": 12.5,
        "rssi": -67,
        "battery": 85,
        "proximity_zone": "FAR",
        "zone_color": "#ff0000"
    });
    let update = parse_status(&body);

    assert_eq!(update.connected, Some(true));
    assert_eq!(update.distance, Some(12.5));
    assert_eq!(update.rssi, Some(-67));
    assert_eq!(update.battery, Some(85));
    let location = update.location.unwrap();
    assert_eq!(location.address.as_deref(), Some("Central Park"));
}

#[test]
fn test_parse_nested_device_status() {
    let body = json!({ "device": { "rssi": -72, "location": { "lat": 1.0 } }, "count": 1 });
    let update = parse_status(&body);
    assert_eq!(update.rssi, Some(-72));
    assert!(update.location.is_none(), "Half a coordinate pair is no location");
    assert!(update.connected.is_none());
}

#[test]
fn test_wrong_types_are_absent() {
    let body = json!({ "connected": "yes", "distance": null, "rssi": "strong", "battery": 55.6 });
    let update = parse_status(&body);
    assert!(update.connected.is_none());
    assert!(update.distance.is_none());
    assert!(update.rssi.is_none());
    assert_eq!(update.battery, Some(56));
}

#[test]
fn test_malformed_status_body() {
    assert!(matches!(parse_status_body("{not json"), Err(GuardianError::MalformedPayload(_))));
    assert!(matches!(parse_status_body("[1, 2]"), Err(GuardianError::MalformedPayload(_))));
    assert!(parse_status_body("{}").unwrap().is_empty());
}

#[test]
fn test_parse_push_events() {
    let location = parse_push_event(r#"{"type":"location","lat":40.7,"lng":-74.0,"rssi":-65}"#).unwrap();
    match &location {
        PushEvent::Location(update) => {
            assert_eq!(update.connected, Some(true));
            assert_eq!(update.rssi, Some(-65));
            assert!(update.location.is_some());
        }
        other => panic!("expected location, got {other:?}"),
    }
    assert!(matches!(location.into_event(), Event::Telemetry { source: Source::Push, .. }));

    let nested = parse_push_event(r#"{"type":"location","location":{"lat":1.5,"lng":2.5}}"#).unwrap();
    assert!(matches!(nested, PushEvent::Location(ref u) if u.location.is_some()));

    let fall = parse_push_event(r#"{"type":"fall_detected","severity":"high"}"#).unwrap();
    assert_eq!(fall, PushEvent::Fall { severity: Some("high".to_string()) });

    let presence = parse_push_event(r#"{"type":"presence","battery":40}"#).unwrap();
    assert!(matches!(presence, PushEvent::Presence(ref u) if u.battery == Some(40)));
}

#[test]
fn test_rejects_unknown_push_events() {
    assert!(parse_push_event(r#"{"type":"weather"}"#).is_err());
    assert!(parse_push_event(r#"{"lat":1.0}"#).is_err());
    assert!(parse_push_event("garbage").is_err());
}

#[test]
fn test_sse_decoder_handles_split_frames() {
    let mut decoder = SseDecoder::new();

    assert!(decoder.feed(b": keep-alive\n\ndata: {\"type\":").is_empty());
    let payloads = decoder.feed(b"\"fall\"}\r\n\r\nevent: ping\ndata: a\ndata: b\n\n");
    assert_eq!(payloads, vec![r#"{"type":"fall"}"#.to_string(), "a\nb".to_string()]);

    // Trailing data without a blank line is held back.
    assert!(decoder.feed(b"data: partial\n").is_empty());
    assert_eq!(decoder.feed(b"\n"), vec!["partial".to_string()]);
}

#[test]
fn test_simulated_radio_sweeps_between_bounds() {
    let mut radio = SimulatedRadio::default();
    let samples: Vec<i32> = (0..14).filter_map(|_| radio.read_rssi().unwrap()).collect();

    assert_eq!(&samples[..6], &[-65, -70, -75, -80, -85, -80]);
    assert!(samples.iter().all(|s| (-85..=-55).contains(s)));
    assert!(samples.contains(&-55));
}

#[test]
fn test_parse_status_update_push() {
    let payload = r#"{"type":"status_update","connected":false,"rssi":-88.4,"distance":70.0,
        "location":{"lat":null,"lng":null}}"#;
    let event = parse_push_event(payload).unwrap();
    let PushEvent::Status(update) = &event else {
        panic!("expected status, got {event:?}");
    };
    assert_eq!(update.connected, Some(false));
    assert_eq!(update.rssi, Some(-88));
    assert_eq!(update.distance, Some(70.0));
    assert!(update.location.is_none());
    assert!(matches!(event.into_event(), Event::Telemetry { source: Source::Push, .. }));
}

#[test]
fn test_parse_device_disconnected_push() {
    let payload = r#"{"type":"device_disconnected","distance":64.2,
        "last_location":{"lat":40.7,"lng":-74.0,"timestamp":"2024-01-01T00:00:00"}}"#;
    let update = match parse_push_event(payload).unwrap() {
        PushEvent::Disconnected(update) => update,
        other => panic!("expected disconnect, got {other:?}"),
    };
    assert_eq!(update.connected, Some(false));
    assert_eq!(update.distance, Some(64.2));
    assert!(update.location.is_some());

    // The scanner variant carries only a reason.
    let bare = parse_push_event(r#"{"type":"device_disconnected","reason":"out_of_range"}"#).unwrap();
    assert!(matches!(bare, PushEvent::Disconnected(ref u) if u.connected == Some(false) && u.distance.is_none()));
}

#[test]
fn test_sse_decoder_discards_overlong_line() {
    let mut decoder = SseDecoder::new();
    let junk = vec![b'x'; MAX_LINE_BYTES + 1];

    assert!(decoder.feed(b"data: ").is_empty());
    assert!(decoder.feed(&junk).is_empty());
    // The rest of the overlong line is skipped; the next event still decodes.
    let payloads = decoder.feed(b"tail\n\ndata: ok\n\n");
    assert_eq!(payloads, vec!["ok".to_string()]);
}
