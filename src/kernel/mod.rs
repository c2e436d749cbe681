pub mod alert;
pub mod event;
pub mod proximity;
pub mod reactor;
pub mod reconciler;
pub mod reminder;
pub mod scheduler;
pub mod speech;
pub mod state;
pub mod telemetry;
pub mod time;
pub mod watchdog;
