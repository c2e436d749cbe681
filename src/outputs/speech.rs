use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::kernel::event::Event;
use crate::kernel::speech::UtteranceId;

/// Words per minute at rate 1.0 for `say` / `espeak`.
const BASE_WPM: f32 = 175.0;

/// Reports one finished utterance back to the reactor.
///
/// Dropping a `Completion` without calling `finish` means the utterance was
/// stopped; the sequencer does not need to hear about those.
#[derive(Debug)]
pub struct Completion {
    utterance: UtteranceId,
    tx: mpsc::Sender<Event>,
}

impl Completion {
    pub fn new(utterance: UtteranceId, tx: mpsc::Sender<Event>) -> Self {
        Self { utterance, tx }
    }

    pub fn utterance(&self) -> UtteranceId {
        self.utterance
    }

    pub fn finish(self) {
        let event = Event::UtteranceFinished(self.utterance);
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Engine gone; dropping completion for {:?}", self.utterance);
            }
            Err(mpsc::error::TrySendError::Full(event)) => {
                let tx = self.tx;
                tokio::spawn(async move {
                    let _ = tx.send(event).await;
                });
            }
        }
    }
}

/// Single-consumer audio output. At most one utterance is in flight.
pub trait SpeechSink: Send {
    fn speak(&mut self, text: &str, rate: f32, done: Completion);
    fn stop(&mut self);
}

/// Used when no speech engine is available: every utterance completes at once,
/// so the sequencer keeps moving.
#[derive(Debug, Default)]
pub struct NoopSpeechSink;

impl SpeechSink for NoopSpeechSink {
    fn speak(&mut self, text: &str, _rate: f32, done: Completion) {
        debug!("[SPEECH-NOOP] {}", text);
        done.finish();
    }

    fn stop(&mut self) {}
}

/// Speaks through a text-to-speech program (`say`, `espeak`).
#[derive(Debug)]
pub struct CommandSpeechSink {
    program: String,
    current: Option<oneshot::Sender<()>>,
}

impl CommandSpeechSink {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            current: None,
        }
    }

    fn rate_flag(&self) -> &'static str {
        if self.program.ends_with("say") {
            "-r"
        } else {
            "-s"
        }
    }
}

impl SpeechSink for CommandSpeechSink {
    fn speak(&mut self, text: &str, rate: f32, done: Completion) {
        self.stop();

        let wpm = (BASE_WPM * rate).round().max(1.0) as u32;
        let spawned = tokio::process::Command::new(&self.program)
            .arg(self.rate_flag())
            .arg(wpm.to_string())
            .arg(text)
            .kill_on_drop(true)
            .spawn();

        match spawned {
            Ok(mut child) => {
                let (stop_tx, mut stop_rx) = oneshot::channel();
                self.current = Some(stop_tx);
                tokio::spawn(async move {
                    tokio::select! {
                        _ = child.wait() => done.finish(),
                        // Dropping `child` kills it.
                        _ = &mut stop_rx => {}
                    }
                });
            }
            Err(e) => {
                warn!("Failed to spawn '{}': {}", self.program, e);
                done.finish();
            }
        }
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.current.take() {
            let _ = stop_tx.send(());
        }
    }
}
