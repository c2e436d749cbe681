use tracing::info;

use crate::kernel::speech::HapticPattern;

pub trait HapticSink: Send {
    fn vibrate(&mut self, pattern: &HapticPattern);
    fn cancel(&mut self);
}

#[derive(Debug, Default)]
pub struct NoopHapticSink;

impl HapticSink for NoopHapticSink {
    fn vibrate(&mut self, _pattern: &HapticPattern) {}
    fn cancel(&mut self) {}
}

/// Stands in for a vibration motor on hosts without one.
#[derive(Debug, Default)]
pub struct LogHapticSink;

impl HapticSink for LogHapticSink {
    fn vibrate(&mut self, pattern: &HapticPattern) {
        info!("[HAPTIC] {:?}", pattern.0);
    }

    fn cancel(&mut self) {
        info!("[HAPTIC] cancel");
    }
}
