//! Engine telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer. Nothing in the reactor,
//! reconciler, deduplicator or sequencer reads it back to make a decision.
//!
//! # PRIVACY INVARIANT
//! Events carry zones, sources, counts and timestamps only. Never coordinates,
//! addresses or spoken text.

pub mod event;
pub mod metrics;
pub mod recorder;
