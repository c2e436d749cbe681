use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::alert::AlertDeduplicator;
use super::event::{AlertEvent, AlertKind, EngineEvent, Event};
use super::reconciler::TelemetryReconciler;
use super::reminder::DisconnectReminder;
use super::scheduler::{Scheduler, SideEffect};
use super::speech::{AnnouncementRequest, SpeechSequencer};
use super::state::{DeviceState, PartialDeviceState, Source};
use super::telemetry::event::{SpeechEventKind, TelemetryEvent};
use super::telemetry::metrics::TelemetrySnapshot;
use super::telemetry::recorder::TelemetryRecorder;
use super::time::{Timestamp, TICK_MS};
use super::watchdog::ConnectivityChange;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::outputs::Outputs;

const EVENT_CAPACITY: usize = 256;
const BROADCAST_CAPACITY: usize = 64;

/// Single writer for every piece of engine state.
///
/// `tick_step` is synchronous and deterministic given `(now, events)`;
/// the async driver in `run` only moves events in and effects out.
pub struct Reactor {
    pub reconciler: TelemetryReconciler,
    pub alerts: AlertDeduplicator,
    pub sequencer: SpeechSequencer,
    pub reminder: DisconnectReminder,
    pub scheduler: Scheduler,
    pub telemetry: TelemetryRecorder,
    pub last_tick: Timestamp,
    torn_down: bool,
}

impl Default for Reactor {
    fn default() -> Self {
        Self {
            reconciler: TelemetryReconciler::default(),
            alerts: AlertDeduplicator::default(),
            sequencer: SpeechSequencer::default(),
            reminder: DisconnectReminder::default(),
            scheduler: Scheduler,
            telemetry: TelemetryRecorder::new(),
            last_tick: Timestamp::ZERO,
            torn_down: false,
        }
    }
}

impl Reactor {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            reconciler: TelemetryReconciler::from_config(&config.proximity, &config.watchdog)?,
            alerts: AlertDeduplicator::new(config.speech.rate, config.alerts.fall_cooldown_ms),
            sequencer: SpeechSequencer::new(config.speech.segment_pause_ms),
            reminder: DisconnectReminder::new(
                config.reminder.interval_ms,
                config.reminder.haptic_interval_ms,
                config.speech.rate,
            ),
            ..Self::default()
        })
    }

    pub fn state(&self) -> &DeviceState {
        self.reconciler.state()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Pure Tick Step: applies `events` strictly in arrival order, then
    /// resolves deadlines (grace window, reminder, speech pause) at `now`.
    /// MUST NOT await I/O or timers.
    pub fn tick_step(&mut self, now: Timestamp, events: Vec<Event>) -> Vec<SideEffect> {
        if self.torn_down {
            if !events.is_empty() {
                debug!("Ignoring {} late events after teardown", events.len());
            }
            return Vec::new();
        }
        self.last_tick = now;
        let mut effects = Vec::new();

        // === 1. APPLY ===
        for event in events {
            self.apply(event, now, &mut effects);
        }

        // === 2. DEADLINES ===
        if let Some(change) = self.reconciler.poll(now) {
            self.on_connectivity(change, &mut effects);
        }
        let due = self.reminder.poll(now, self.reconciler.state());
        if let Some(pattern) = due.vibration {
            effects.push(SideEffect::Vibrate(pattern));
        }
        if let Some(request) = due.announcement {
            self.enqueue(request, &mut effects);
        }
        let resumed = self.sequencer.poll(now);
        self.scheduler.project(resumed, &mut effects);

        effects
    }

    /// Silence speech, stop reminders, and refuse all further events.
    pub fn teardown(&mut self) -> Vec<SideEffect> {
        if self.torn_down {
            return Vec::new();
        }
        self.torn_down = true;
        self.reminder.stop();

        let mut effects = Vec::new();
        let commands = self.sequencer.cancel_all();
        if !commands.is_empty() {
            self.telemetry.record(TelemetryEvent::Speech { event: SpeechEventKind::Cancelled });
        }
        self.scheduler.project(commands, &mut effects);

        let summary = self.telemetry.aggregate_session(self.last_tick.ms);
        info!("Session summary: {:?}", summary);
        self.telemetry.record(summary);
        info!("Reactor torn down at {}ms; telemetry {:?}", self.last_tick.ms, self.telemetry.snapshot());
        effects
    }

    fn apply(&mut self, event: Event, now: Timestamp, effects: &mut Vec<SideEffect>) {
        match event {
            Event::Telemetry { source, update } => self.ingest(update, source, now, effects),

            Event::Fall { severity } => {
                // A fall report is also proof the bracelet is reachable.
                self.ingest(PartialDeviceState::default(), Source::Push, now, effects);
                warn!("Fall reported (severity {:?})", severity);
                effects.push(SideEffect::Publish(EngineEvent::Fall { severity, at: now }));

                if let Some(request) = self.alerts.on_fall(now) {
                    let request = self.scheduler.compose_alert(request, self.reconciler.state());
                    self.raise(AlertKind::Fall, request, now, effects);
                }
            }

            Event::ChannelFailure { source, reason } => {
                warn!("{:?} channel failure: {}", source, reason);
                self.telemetry.record(TelemetryEvent::ChannelFailure { source });
                if let Some(change) = self.reconciler.report_failure(source, now) {
                    self.on_connectivity(change, effects);
                }
            }

            Event::PayloadDropped { source } => {
                self.telemetry.record(TelemetryEvent::PayloadDropped { source });
            }

            Event::UtteranceFinished(utterance) => {
                let commands = self.sequencer.on_finished(utterance, now);
                self.scheduler.project(commands, effects);
            }

            Event::Announce(request) => self.enqueue(request, effects),

            Event::CancelSpeech => {
                let commands = self.sequencer.cancel_all();
                if !commands.is_empty() {
                    self.telemetry.record(TelemetryEvent::Speech { event: SpeechEventKind::Cancelled });
                }
                self.scheduler.project(commands, effects);
            }
        }
    }

    fn ingest(&mut self, update: PartialDeviceState, source: Source, now: Timestamp, effects: &mut Vec<SideEffect>) {
        let outcome = self.reconciler.ingest(update, source, now);
        self.telemetry.record(TelemetryEvent::Ingest { source, at: now });

        if let Some(change) = outcome.connectivity {
            self.on_connectivity(change, effects);
        }

        let Some(transition) = outcome.transition else {
            return;
        };
        self.telemetry.record(TelemetryEvent::ZoneTransition {
            from: transition.from,
            to: transition.to,
            at: transition.at,
        });
        effects.push(SideEffect::Publish(EngineEvent::ZoneChanged(transition)));

        let already_announced = self.alerts.memory().announced(transition.to);
        match self.alerts.on_transition(&transition) {
            Some(request) => {
                let request = self.scheduler.compose_alert(request, self.reconciler.state());
                self.raise(AlertKind::Zone(transition.to), request, now, effects);
            }
            None if already_announced => {
                debug!("{:?} already announced for this excursion", transition.to);
                self.telemetry.record(TelemetryEvent::AlertSuppressed { zone: transition.to });
            }
            None => {}
        }
    }

    fn on_connectivity(&mut self, change: ConnectivityChange, effects: &mut Vec<SideEffect>) {
        info!("Connectivity -> {} at {}ms", if change.connected { "connected" } else { "disconnected" }, change.at.ms);
        self.telemetry.record(TelemetryEvent::Connectivity {
            connected: change.connected,
            at: change.at,
        });
        effects.push(SideEffect::Publish(EngineEvent::Connectivity(change)));
        self.reminder.on_connectivity(&change);

        if !change.connected {
            let request = self.alerts.on_disconnect();
            let request = self.scheduler.compose_alert(request, self.reconciler.state());
            self.raise(AlertKind::Disconnected, request, change.at, effects);
        }
    }

    fn raise(&mut self, kind: AlertKind, request: AnnouncementRequest, now: Timestamp, effects: &mut Vec<SideEffect>) {
        info!("Alert raised: {:?}", kind);
        self.telemetry.record(TelemetryEvent::AlertRaised { kind, at: now });
        effects.push(SideEffect::Publish(EngineEvent::Alert(AlertEvent::new(kind, now))));
        self.enqueue(request, effects);
    }

    fn enqueue(&mut self, request: AnnouncementRequest, effects: &mut Vec<SideEffect>) {
        let outcome = self.sequencer.enqueue(request);
        self.telemetry.record(TelemetryEvent::Speech { event: outcome.disposition.into() });
        self.scheduler.project(outcome.commands, effects);
    }

    /// Move the reactor onto its own task and hand back the handle the
    /// channels and the presentation layer talk to.
    pub fn spawn(self, outputs: Outputs) -> EngineHandle {
        let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(self.state().clone());
        let (events_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let cancel = CancellationToken::new();

        let driver = Driver {
            receiver: rx,
            completions: tx.clone(),
            outputs,
            state_tx,
            events_tx: events_tx.clone(),
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(self.run(driver));

        EngineHandle {
            tx,
            state: state_rx,
            events: events_tx,
            cancel,
            task,
        }
    }

    /// Async Driver Loop
    async fn run(mut self, mut driver: Driver) -> TelemetrySnapshot {
        info!("Reactor pipeline started. Tick: {}ms", TICK_MS);

        let epoch = Instant::now();
        let mut cadence = interval(Duration::from_millis(TICK_MS));
        cadence.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = driver.cancel.cancelled() => break,
                _ = cadence.tick() => {}
            }

            let mut events = Vec::new();
            while let Ok(event) = driver.receiver.try_recv() {
                events.push(event);
            }

            let now = Timestamp::from_millis(epoch.elapsed().as_millis() as u64);
            let effects = self.tick_step(now, events);
            driver.dispatch(effects);
            driver.publish_state(self.state());
        }

        let effects = self.teardown();
        driver.dispatch(effects);
        // Anything still queued, or sent later, is never applied.
        driver.receiver.close();
        info!("Reactor pipeline stopped");
        self.telemetry.snapshot()
    }
}

struct Driver {
    receiver: mpsc::Receiver<Event>,
    completions: mpsc::Sender<Event>,
    outputs: Outputs,
    state_tx: watch::Sender<DeviceState>,
    events_tx: broadcast::Sender<EngineEvent>,
    cancel: CancellationToken,
}

impl Driver {
    fn dispatch(&mut self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::Publish(event) => {
                    // No subscribers is fine.
                    let _ = self.events_tx.send(event);
                }
                other => self.outputs.execute(other, &self.completions),
            }
        }
    }

    fn publish_state(&self, state: &DeviceState) {
        self.state_tx.send_if_modified(|current| {
            if *current != *state {
                *current = state.clone();
                true
            } else {
                false
            }
        });
    }
}

/// Handle to a running engine.
pub struct EngineHandle {
    tx: mpsc::Sender<Event>,
    state: watch::Receiver<DeviceState>,
    events: broadcast::Sender<EngineEvent>,
    cancel: CancellationToken,
    task: JoinHandle<TelemetrySnapshot>,
}

impl EngineHandle {
    /// Producer endpoint for channels and the presentation layer.
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.tx.clone()
    }

    pub fn state(&self) -> watch::Receiver<DeviceState> {
        self.state.clone()
    }

    pub fn current(&self) -> DeviceState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Token for producers; cancelled when the engine shuts down.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.child_token()
    }

    pub async fn announce(&self, request: AnnouncementRequest) -> Result<()> {
        self.tx
            .send(Event::Announce(request))
            .await
            .map_err(|_| crate::error::GuardianError::ChannelClosed)
    }

    /// Cancel speech, timers and subscriptions, then wait for the driver to exit.
    /// Returns the session's telemetry.
    pub async fn shutdown(self) -> Option<TelemetrySnapshot> {
        self.cancel.cancel();
        match self.task.await {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Reactor task ended abnormally: {}", e);
                None
            }
        }
    }
}
