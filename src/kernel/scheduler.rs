use super::event::EngineEvent;
use super::speech::{AnnouncementRequest, HapticPattern, SpeechCommand, UtteranceId};
use super::state::DeviceState;

pub struct Scheduler;

/// Work for the driver. The reactor never performs I/O itself.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    Speak { utterance: UtteranceId, text: String, rate: f32 },
    Vibrate(HapticPattern),
    /// Silence both sinks.
    StopOutput,
    Publish(EngineEvent),
}

impl From<SpeechCommand> for SideEffect {
    fn from(command: SpeechCommand) -> Self {
        match command {
            SpeechCommand::Speak { utterance, text, rate } => SideEffect::Speak { utterance, text, rate },
            SpeechCommand::Vibrate(pattern) => SideEffect::Vibrate(pattern),
            SpeechCommand::Stop => SideEffect::StopOutput,
        }
    }
}

impl Scheduler {
    /// Pure Projection: alert + state -> announcement.
    /// Alerts gain a second segment with the last known location when there is one.
    pub fn compose_alert(&self, request: AnnouncementRequest, state: &DeviceState) -> AnnouncementRequest {
        match &state.location {
            Some(location) => request.then(format!("Last known location: {}.", location.label())),
            None => request,
        }
    }

    pub fn project(&self, commands: Vec<SpeechCommand>, effects: &mut Vec<SideEffect>) {
        effects.extend(commands.into_iter().map(SideEffect::from));
    }
}
