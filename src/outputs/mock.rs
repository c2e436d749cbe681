use std::sync::{Arc, Mutex};

use super::haptic::HapticSink;
use super::speech::{Completion, SpeechSink};
use crate::kernel::speech::HapticPattern;

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Speak(String),
    Stop,
    Vibrate(Vec<u32>),
    CancelHaptic,
}

/// Shared log of everything sent to the sinks.
pub type SinkLog = Arc<Mutex<Vec<SinkCall>>>;

/// Records calls instead of producing audio. With `auto_complete` every
/// utterance finishes immediately; otherwise the latest completion is held in
/// `completer()` for the test to finish by hand.
pub struct RecordingSpeechSink {
    log: SinkLog,
    auto_complete: bool,
    pending: Arc<Mutex<Option<Completion>>>,
}

impl RecordingSpeechSink {
    pub fn new(log: SinkLog, auto_complete: bool) -> Self {
        Self {
            log,
            auto_complete,
            pending: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle for finishing held utterances from a test.
    pub fn completer(&self) -> Arc<Mutex<Option<Completion>>> {
        Arc::clone(&self.pending)
    }
}

impl SpeechSink for RecordingSpeechSink {
    fn speak(&mut self, text: &str, _rate: f32, done: Completion) {
        if let Ok(mut log) = self.log.lock() {
            log.push(SinkCall::Speak(text.to_string()));
        }
        if self.auto_complete {
            done.finish();
        } else if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(done);
        }
    }

    fn stop(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.push(SinkCall::Stop);
        }
        if let Ok(mut pending) = self.pending.lock() {
            pending.take();
        }
    }
}

pub struct RecordingHapticSink {
    log: SinkLog,
}

impl RecordingHapticSink {
    pub fn new(log: SinkLog) -> Self {
        Self { log }
    }
}

impl HapticSink for RecordingHapticSink {
    fn vibrate(&mut self, pattern: &HapticPattern) {
        if let Ok(mut log) = self.log.lock() {
            log.push(SinkCall::Vibrate(pattern.0.clone()));
        }
    }

    fn cancel(&mut self) {
        if let Ok(mut log) = self.log.lock() {
            log.push(SinkCall::CancelHaptic);
        }
    }
}

/// Take the recorded calls so far.
pub fn drain(log: &SinkLog) -> Vec<SinkCall> {
    log.lock().map(|mut l| std::mem::take(&mut *l)).unwrap_or_default()
}
