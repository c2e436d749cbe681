use guardian::kernel::speech::sequencer::Disposition;
use guardian::kernel::speech::{AnnouncementRequest, HapticPattern, SequencerState, SpeechCommand, SpeechSequencer, UtteranceId};
use guardian::kernel::time::Timestamp;

fn ms(ms: u64) -> Timestamp {
    Timestamp::from_millis(ms)
}

fn spoken(commands: &[SpeechCommand]) -> Vec<(UtteranceId, String)> {
    commands
        .iter()
        .filter_map(|c| match c {
            SpeechCommand::Speak { utterance, text, .. } => Some((*utterance, text.clone())),
            _ => None,
        })
        .collect()
}

#[test]
fn test_multi_segment_with_pause() {
    let mut seq = SpeechSequencer::new(500);
    let outcome = seq.enqueue(AnnouncementRequest::normal("Child last seen at Park.").then("Distance: 40 meters."));
    assert_eq!(outcome.disposition, Disposition::Started);

    let first = spoken(&outcome.commands);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].1, "Child last seen at Park.");

    // Segment 0 done: pause, no speech yet.
    assert!(seq.on_finished(first[0].0, ms(1_000)).is_empty());
    assert_eq!(seq.state(), SequencerState::Pausing { next: 1, resume_at: ms(1_500) });
    assert!(seq.poll(ms(1_499)).is_empty());

    let second = spoken(&seq.poll(ms(1_500)));
    assert_eq!(second[0].1, "Distance: 40 meters.");
    assert!(seq.on_finished(second[0].0, ms(2_000)).is_empty());
    assert!(seq.is_idle());
}

#[test]
fn test_urgent_preempts_normal_sequence() {
    let mut seq = SpeechSequencer::new(500);
    let hint = seq.enqueue(AnnouncementRequest::normal("one").then("two"));
    let stale = spoken(&hint.commands)[0].0;

    let urgent = AnnouncementRequest::urgent("Alert. Your child is out of range.").with_haptic(HapticPattern::escalation());
    let outcome = seq.enqueue(urgent);
    assert_eq!(outcome.disposition, Disposition::Preempted);

    // Stop, then haptic, then the alert itself.
    assert_eq!(outcome.commands[0], SpeechCommand::Stop);
    assert_eq!(outcome.commands[1], SpeechCommand::Vibrate(HapticPattern::escalation()));
    let alert = spoken(&outcome.commands);
    assert_eq!(alert[0].1, "Alert. Your child is out of range.");

    // The truncated hint's completion arrives late and is ignored.
    assert!(seq.on_finished(stale, ms(100)).is_empty());
    assert_eq!(seq.state(), SequencerState::Speaking { segment: 0 });

    // Its second segment is never spoken.
    assert!(seq.on_finished(alert[0].0, ms(200)).is_empty());
    assert!(seq.is_idle());
    assert!(seq.poll(ms(10_000)).is_empty());
}

#[test]
fn test_normal_dropped_while_urgent_active() {
    let mut seq = SpeechSequencer::new(500);
    seq.enqueue(AnnouncementRequest::urgent("Alert."));
    let outcome = seq.enqueue(AnnouncementRequest::normal("Battery 80 percent."));
    assert_eq!(outcome.disposition, Disposition::Dropped);
    assert!(outcome.commands.is_empty());
    assert!(seq.pending_request().is_none());
}

#[test]
fn test_urgent_replaces_urgent() {
    let mut seq = SpeechSequencer::new(500);
    seq.enqueue(AnnouncementRequest::urgent("Warning. Your child is moving far away."));
    let outcome = seq.enqueue(AnnouncementRequest::urgent("Alert. Your child is out of range."));
    assert_eq!(outcome.disposition, Disposition::Preempted);
    assert_eq!(seq.active_request().unwrap().segments[0], "Alert. Your child is out of range.");
}

#[test]
fn test_normal_behind_multi_segment_waits_in_pending_slot() {
    let mut seq = SpeechSequencer::new(0);
    let first = seq.enqueue(AnnouncementRequest::normal("a").then("b"));
    let a = spoken(&first.commands)[0].0;

    assert_eq!(seq.enqueue(AnnouncementRequest::normal("old hint")).disposition, Disposition::Deferred);
    assert_eq!(seq.enqueue(AnnouncementRequest::normal("new hint")).disposition, Disposition::Deferred);
    assert_eq!(seq.pending_request().unwrap().segments[0], "new hint", "Newest hint replaces the stale one");

    // Zero pause: the next segment follows immediately.
    let b = spoken(&seq.on_finished(a, ms(10)));
    assert_eq!(b[0].1, "b");

    let hint = spoken(&seq.on_finished(b[0].0, ms(20)));
    assert_eq!(hint[0].1, "new hint");
    assert!(seq.pending_request().is_none());
}

#[test]
fn test_normal_replaces_single_segment_normal() {
    let mut seq = SpeechSequencer::new(500);
    seq.enqueue(AnnouncementRequest::normal("Map view"));
    let outcome = seq.enqueue(AnnouncementRequest::normal("Settings"));
    assert_eq!(outcome.disposition, Disposition::Preempted);
    assert_eq!(spoken(&outcome.commands)[0].1, "Settings");
}

#[test]
fn test_cancel_all() {
    let mut seq = SpeechSequencer::new(500);
    assert!(seq.cancel_all().is_empty(), "Idle cancel emits nothing");

    let started = seq.enqueue(AnnouncementRequest::normal("a").then("b"));
    seq.enqueue(AnnouncementRequest::normal("later"));
    assert_eq!(seq.cancel_all(), vec![SpeechCommand::Stop]);
    assert!(seq.is_idle());
    assert!(seq.pending_request().is_none());

    // Late completion from the cancelled request changes nothing.
    let id = spoken(&started.commands)[0].0;
    assert!(seq.on_finished(id, ms(50)).is_empty());
}

#[test]
fn test_empty_request_dropped() {
    let mut seq = SpeechSequencer::default();
    let outcome = seq.enqueue(AnnouncementRequest::new(guardian::kernel::speech::Priority::Urgent, vec![]));
    assert_eq!(outcome.disposition, Disposition::Dropped);
    assert!(seq.is_idle());
}
