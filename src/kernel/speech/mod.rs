pub mod request;
pub mod sequencer;

pub use request::{AnnouncementRequest, HapticPattern, Priority};
pub use sequencer::{SequencerState, SpeechCommand, SpeechSequencer, UtteranceId};
