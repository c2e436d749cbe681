use guardian::kernel::event::{AlertKind, EngineEvent, Event};
use guardian::kernel::proximity::Zone;
use guardian::kernel::reactor::Reactor;
use guardian::kernel::scheduler::SideEffect;
use guardian::kernel::speech::{AnnouncementRequest, HapticPattern};
use guardian::kernel::state::{Location, PartialDeviceState, Source};
use guardian::kernel::time::Timestamp;
use guardian::EngineConfig;

fn ms(ms: u64) -> Timestamp {
    Timestamp::from_millis(ms)
}

fn spoken(effects: &[SideEffect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Speak { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn alerts(effects: &[SideEffect]) -> Vec<AlertKind> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Publish(EngineEvent::Alert(alert)) => Some(alert.kind),
            _ => None,
        })
        .collect()
}

fn finish_current(reactor: &mut Reactor, effects: &[SideEffect], now: Timestamp) -> Vec<SideEffect> {
    let utterance = effects
        .iter()
        .rev()
        .find_map(|e| match e {
            SideEffect::Speak { utterance, .. } => Some(*utterance),
            _ => None,
        })
        .expect("something is speaking");
    reactor.tick_step(now, vec![Event::UtteranceFinished(utterance)])
}

fn connected_reactor() -> Reactor {
    let mut reactor = Reactor::default();
    let update = PartialDeviceState {
        connected: Some(true),
        location: Some(Location::new(40.7128, -74.006).with_address("Central Park")),
        distance: Some(5.0),
        ..Default::default()
    };
    reactor.tick_step(ms(0), vec![Event::telemetry(Source::Poll, update)]);
    reactor
}

#[test]
fn test_zone_escalation_end_to_end() {
    let mut reactor = connected_reactor();

    // 1. Near: no alert.
    let effects = reactor.tick_step(ms(500), vec![Event::telemetry(Source::Poll, PartialDeviceState::distance(20.0))]);
    assert!(alerts(&effects).is_empty());
    assert_eq!(reactor.state().proximity_zone, Zone::Near);

    // 2. Far: one urgent alert with the last known location.
    let effects = reactor.tick_step(ms(1_000), vec![Event::telemetry(Source::Poll, PartialDeviceState::distance(45.0))]);
    assert_eq!(alerts(&effects), vec![AlertKind::Zone(Zone::Far)]);
    assert!(effects.iter().any(|e| matches!(e, SideEffect::Vibrate(_))));
    assert_eq!(spoken(&effects), vec!["Warning. Your child is moving far away.".to_string()]);

    // 3. Repeated Far readings stay quiet.
    let effects = reactor.tick_step(ms(1_500), vec![Event::telemetry(Source::Poll, PartialDeviceState::distance(50.0))]);
    assert!(alerts(&effects).is_empty());
    assert!(spoken(&effects).is_empty());
}

#[test]
fn test_alert_carries_location_segment() {
    let mut reactor = connected_reactor();
    let effects = reactor.tick_step(ms(500), vec![Event::telemetry(Source::Poll, PartialDeviceState::distance(70.0))]);
    assert_eq!(alerts(&effects), vec![AlertKind::Zone(Zone::OutOfRange)]);

    let done = finish_current(&mut reactor, &effects, ms(600));
    assert!(spoken(&done).is_empty(), "Pause between segments");

    let resumed = reactor.tick_step(ms(1_100), vec![]);
    assert_eq!(spoken(&resumed), vec!["Last known location: Central Park.".to_string()]);
}

#[test]
fn test_zone_flapping_alerts_once_per_excursion() {
    let mut reactor = connected_reactor();
    let mut raised = Vec::new();

    for (i, d) in [20.0, 35.0, 28.0, 33.0, 15.0, 40.0].into_iter().enumerate() {
        let effects = reactor.tick_step(ms(500 * (i as u64 + 1)), vec![Event::telemetry(Source::Poll, PartialDeviceState::distance(d))]);
        raised.extend(alerts(&effects));
    }

    // 28 and 33 sit inside the band; 15 returns to Near and re-arms.
    assert_eq!(raised, vec![AlertKind::Zone(Zone::Far), AlertKind::Zone(Zone::Far)]);
}

#[test]
fn test_disconnect_after_grace_with_reminder() {
    let mut reactor = connected_reactor();

    let effects = reactor.tick_step(ms(1_000), vec![Event::failure(Source::Poll, "timeout")]);
    assert!(alerts(&effects).is_empty());
    assert!(reactor.state().connected);

    let effects = reactor.tick_step(ms(4_000), vec![]);
    assert_eq!(alerts(&effects), vec![AlertKind::Disconnected]);
    assert!(!reactor.state().connected);
    assert_eq!(spoken(&effects), vec!["Alert. Connection to the bracelet lost.".to_string()]);

    // More failures never re-announce the same outage.
    let effects = reactor.tick_step(ms(4_500), vec![Event::failure(Source::Poll, "timeout")]);
    assert!(alerts(&effects).is_empty());

    // The alert is still speaking (urgent), so the reminder at +10 s is dropped.
    // Once speech is idle, the next reminder speaks.
    let reminder = reactor.tick_step(ms(14_000), vec![]);
    assert!(spoken(&reminder).is_empty());
    reactor.tick_step(ms(14_050), vec![Event::CancelSpeech]);
    let reminder = reactor.tick_step(ms(24_000), vec![]);
    assert_eq!(spoken(&reminder), vec!["Child last seen at Central Park.".to_string()]);
}

#[test]
fn test_push_heals_failed_poll() {
    let mut reactor = connected_reactor();
    reactor.tick_step(ms(1_000), vec![Event::failure(Source::Poll, "timeout")]);
    reactor.tick_step(ms(2_000), vec![Event::telemetry(Source::Push, PartialDeviceState::rssi(-62))]);

    let effects = reactor.tick_step(ms(4_500), vec![]);
    assert!(alerts(&effects).is_empty());
    assert!(reactor.state().connected);
}

#[test]
fn test_fall_alert_with_cooldown() {
    let mut reactor = connected_reactor();

    let effects = reactor.tick_step(ms(1_000), vec![Event::Fall { severity: Some("high".into()) }]);
    assert_eq!(alerts(&effects), vec![AlertKind::Fall]);
    assert!(effects.iter().any(|e| matches!(e, SideEffect::Publish(EngineEvent::Fall { .. }))));

    let effects = reactor.tick_step(ms(3_000), vec![Event::Fall { severity: None }]);
    assert!(alerts(&effects).is_empty(), "Second report inside the cooldown");
}

#[test]
fn test_hint_does_not_interrupt_alert() {
    let mut reactor = connected_reactor();
    reactor.tick_step(ms(500), vec![Event::telemetry(Source::Poll, PartialDeviceState::distance(70.0))]);

    let effects = reactor.tick_step(ms(600), vec![Event::Announce(AnnouncementRequest::normal("Map view"))]);
    assert!(effects.is_empty());
    assert_eq!(reactor.telemetry.snapshot().speech_stats.dropped, 1);
}

#[test]
fn test_teardown_makes_late_events_noops() {
    let mut reactor = connected_reactor();
    reactor.tick_step(ms(500), vec![Event::Announce(AnnouncementRequest::normal("a").then("b"))]);

    let effects = reactor.teardown();
    assert_eq!(effects, vec![SideEffect::StopOutput]);
    assert!(reactor.is_torn_down());

    let before = reactor.state().clone();
    let late = reactor.tick_step(
        ms(60_000),
        vec![
            Event::telemetry(Source::Push, PartialDeviceState::distance(90.0)),
            Event::failure(Source::Poll, "late"),
            Event::Fall { severity: None },
        ],
    );
    assert!(late.is_empty());
    assert_eq!(reactor.state(), &before);
    assert!(reactor.teardown().is_empty());
}

#[test]
fn test_telemetry_counts() {
    let mut reactor = connected_reactor();
    reactor.tick_step(
        ms(500),
        vec![
            Event::telemetry(Source::Radio, PartialDeviceState::rssi(-80)),
            Event::PayloadDropped { source: Source::Push },
            Event::telemetry(Source::Push, PartialDeviceState::distance(70.0)),
        ],
    );

    let snap = reactor.telemetry.snapshot();
    assert_eq!(snap.ingest_stats.poll, 1);
    assert_eq!(snap.ingest_stats.radio, 1);
    assert_eq!(snap.ingest_stats.push, 1);
    assert_eq!(snap.ingest_stats.dropped_payloads, 1);
    assert_eq!(snap.zone_stats.transitions, 2);
    assert_eq!(snap.alert_stats.zone_alerts, 2);
    assert_eq!(snap.speech_stats.started, 1);
    assert_eq!(snap.speech_stats.preempted, 1);
}

#[test]
fn test_reactor_from_config() {
    let config = EngineConfig::from_toml_str(
        r#"
        [proximity]
        boundaries_m = [5.0, 15.0, 40.0]

        [watchdog]
        grace_ms = 1000
        "#,
    )
    .unwrap();
    let mut reactor = Reactor::new(&config).unwrap();
    reactor.tick_step(ms(0), vec![Event::telemetry(Source::Poll, PartialDeviceState::distance(20.0))]);
    assert_eq!(reactor.state().proximity_zone, Zone::Far);

    reactor.tick_step(ms(100), vec![Event::failure(Source::Poll, "timeout")]);
    let effects = reactor.tick_step(ms(1_100), vec![]);
    assert!(alerts(&effects).contains(&AlertKind::Disconnected));
}

fn published_connectivity(effects: &[SideEffect]) -> Vec<bool> {
    effects
        .iter()
        .filter_map(|e| match e {
            SideEffect::Publish(EngineEvent::Connectivity(change)) => Some(change.connected),
            _ => None,
        })
        .collect()
}

#[test]
fn test_backend_disconnect_alerts_and_arms_reminder() {
    let mut reactor = connected_reactor();

    let lost = PartialDeviceState { connected: Some(false), ..Default::default() };
    let effects = reactor.tick_step(ms(1_000), vec![Event::telemetry(Source::Poll, lost)]);
    assert_eq!(published_connectivity(&effects), vec![false]);
    assert_eq!(alerts(&effects), vec![AlertKind::Disconnected]);
    assert_eq!(reactor.reminder.next_due(), Some(ms(11_000)));

    let back = PartialDeviceState { connected: Some(true), ..Default::default() };
    let effects = reactor.tick_step(ms(2_000), vec![Event::telemetry(Source::Push, back)]);
    assert_eq!(published_connectivity(&effects), vec![true]);
    assert!(reactor.state().connected);
    assert_eq!(reactor.reminder.next_due(), None);
}

#[test]
fn test_connectivity_stream_matches_state() {
    let lost = || PartialDeviceState { connected: Some(false), distance: Some(70.0), ..Default::default() };
    let found = || PartialDeviceState { connected: Some(true), distance: Some(5.0), ..Default::default() };

    let script: Vec<(u64, Vec<Event>)> = vec![
        (0, vec![Event::telemetry(Source::Poll, lost())]),
        (500, vec![Event::telemetry(Source::Push, found())]),
        (1_000, vec![Event::telemetry(Source::Poll, lost())]),
        (1_500, vec![Event::telemetry(Source::Radio, PartialDeviceState::rssi(-60))]),
        (2_000, vec![Event::failure(Source::Poll, "timeout")]),
        (5_000, vec![]),
        (5_500, vec![Event::telemetry(Source::Poll, lost())]),
        (6_000, vec![Event::telemetry(Source::Push, found()), Event::telemetry(Source::Poll, lost())]),
    ];

    let mut reactor = Reactor::default();
    let mut published = Vec::new();
    for (at, events) in script {
        let effects = reactor.tick_step(ms(at), events);
        let changes = published_connectivity(&effects);
        if let Some(last) = changes.last() {
            assert_eq!(*last, reactor.state().connected, "publish disagrees with state at {at}ms");
        }
        published.extend(changes);
    }

    // Every publish is a real flip.
    assert!(published.windows(2).all(|w| w[0] != w[1]));
    assert_eq!(published, vec![true, false, true, false, true, false]);
}

#[test]
fn test_disconnect_vibrates_on_own_cadence() {
    let mut reactor = connected_reactor();
    reactor.tick_step(ms(1_000), vec![Event::telemetry(Source::Poll, PartialDeviceState { connected: Some(false), ..Default::default() })]);

    let effects = reactor.tick_step(ms(6_000), vec![]);
    assert!(effects.contains(&SideEffect::Vibrate(HapticPattern::escalation())));
    assert!(spoken(&effects).is_empty(), "Speech reminder runs on the slower cadence");

    let effects = reactor.tick_step(ms(11_000), vec![]);
    assert!(effects.contains(&SideEffect::Vibrate(HapticPattern::escalation())));

    // Reconnecting stops both cadences.
    reactor.tick_step(ms(12_000), vec![Event::telemetry(Source::Push, PartialDeviceState::presence())]);
    let effects = reactor.tick_step(ms(20_000), vec![]);
    assert!(!effects.iter().any(|e| matches!(e, SideEffect::Vibrate(_))));
}

#[test]
fn test_teardown_records_session_summary() {
    let mut reactor = connected_reactor();
    reactor.tick_step(ms(500), vec![Event::telemetry(Source::Poll, PartialDeviceState::distance(70.0))]);
    reactor.teardown();

    let snap = reactor.telemetry.snapshot();
    assert_eq!(snap.alert_stats.zone_alerts, 1);
    assert_eq!(snap.speech_stats.cancelled, 1);
}
