pub mod haptic;
pub mod mock;
pub mod speech;

use tokio::sync::mpsc;

use crate::config::SpeechConfig;
use crate::kernel::event::Event;
use crate::kernel::scheduler::SideEffect;
use haptic::{HapticSink, LogHapticSink, NoopHapticSink};
use speech::{CommandSpeechSink, Completion, NoopSpeechSink, SpeechSink};

/// The audio and haptic sinks the driver executes speech effects against.
pub struct Outputs {
    pub speech: Box<dyn SpeechSink>,
    pub haptic: Box<dyn HapticSink>,
}

impl Default for Outputs {
    fn default() -> Self {
        Self::silent()
    }
}

impl Outputs {
    pub fn new(speech: Box<dyn SpeechSink>, haptic: Box<dyn HapticSink>) -> Self {
        Self { speech, haptic }
    }

    pub fn silent() -> Self {
        Self::new(Box::new(NoopSpeechSink), Box::new(NoopHapticSink))
    }

    /// Pick sinks from config. Anything disabled or unavailable becomes a no-op.
    pub fn from_config(config: &SpeechConfig) -> Self {
        let speech: Box<dyn SpeechSink> = match (&config.command, config.audio) {
            (Some(program), true) => Box::new(CommandSpeechSink::new(program.clone())),
            _ => Box::new(NoopSpeechSink),
        };
        let haptic: Box<dyn HapticSink> = if config.haptic {
            Box::new(LogHapticSink)
        } else {
            Box::new(NoopHapticSink)
        };
        Self::new(speech, haptic)
    }

    pub fn execute(&mut self, effect: SideEffect, completions: &mpsc::Sender<Event>) {
        match effect {
            SideEffect::Speak { utterance, text, rate } => {
                self.speech.speak(&text, rate, Completion::new(utterance, completions.clone()));
            }
            SideEffect::Vibrate(pattern) => self.haptic.vibrate(&pattern),
            SideEffect::StopOutput => {
                self.speech.stop();
                self.haptic.cancel();
            }
            SideEffect::Publish(_) => {}
        }
    }
}
