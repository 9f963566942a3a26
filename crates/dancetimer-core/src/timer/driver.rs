//! Timer service: the async owner of the state machine.
//!
//! One tokio task owns the [`TimerMachine`] and the gesture detector. All
//! commands, ticks and hold deadlines are handled on that task, so there is
//! a single writer and no locking. Observers get whole state snapshots over
//! a `watch` channel and transition events over a `broadcast` channel.
//!
//! Two periodic tick sources (a fast primary interval and a slow backup)
//! feed the same idempotent [`TimerMachine::tick`]; both only run while a
//! session is running and unpaused.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::gesture::{self, Button, DetectorConfig, KeyAction, Trigger, TriggerDetector, TriggerMode};
use crate::pricing::PricingRule;
use crate::storage::DanceRecord;
use crate::store::{HistoryStore, RuleStore};

use super::clock::Clock;
use super::machine::TimerMachine;
use super::state::TimerState;

const MAILBOX_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 128;
/// `tokio::time::interval` panics on a zero period.
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

/// Everything the service can be asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start { auto: bool },
    Pause,
    Resume,
    Stop,
    CancelAuto,
    Acknowledge,
    /// Force a tick now, in addition to the periodic ones.
    Tick,
    /// Raw button event for the gesture detector.
    Key { button: Button, action: KeyAction },
    ResetGestures,
    SetTriggerMode(TriggerMode),
    /// The display turned off.
    ScreenOff,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub tick_interval: Duration,
    pub backup_tick_interval: Duration,
    pub auto_start_on_screen_off: bool,
    pub detector: DetectorConfig,
    /// Bill new sessions with this rule instead of the default one.
    pub rule_id: Option<i64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            backup_tick_interval: Duration::from_secs(30),
            auto_start_on_screen_off: false,
            detector: DetectorConfig::default(),
            rule_id: None,
        }
    }
}

/// Cloneable front door to a running [`TimerService`].
#[derive(Debug, Clone)]
pub struct TimerHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<TimerState>,
    events: broadcast::Sender<Event>,
}

impl TimerHandle {
    pub async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| CoreError::ServiceStopped)
    }

    /// Latest published snapshot.
    pub fn state(&self) -> TimerState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TimerState> {
        self.state.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }
}

pub struct TimerService {
    machine: TimerMachine,
    detector: TriggerDetector,
    config: ServiceConfig,
    clock: Arc<dyn Clock>,
    rules: Option<Arc<dyn RuleStore>>,
    history: Option<Arc<dyn HistoryStore>>,
    ticking: bool,
    state_tx: watch::Sender<TimerState>,
    events_tx: broadcast::Sender<Event>,
}

impl TimerService {
    pub fn new(machine: TimerMachine, config: ServiceConfig) -> Self {
        let (state_tx, _) = watch::channel(machine.state().clone());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            detector: TriggerDetector::new(config.detector),
            clock: machine.clock(),
            ticking: machine.is_ticking(),
            machine,
            config,
            rules: None,
            history: None,
            state_tx,
            events_tx,
        }
    }

    pub fn with_rules(mut self, rules: Arc<dyn RuleStore>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Start the service on the current runtime.
    pub fn spawn(self) -> (TimerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let handle = TimerHandle {
            commands: tx,
            state: self.state_tx.subscribe(),
            events: self.events_tx.clone(),
        };
        let task = tokio::spawn(self.run(rx));
        (handle, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        let mut primary = tokio::time::interval(self.config.tick_interval.max(MIN_TICK_INTERVAL));
        primary.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut backup =
            tokio::time::interval(self.config.backup_tick_interval.max(MIN_TICK_INTERVAL));
        backup.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(mode = ?self.detector.mode(), "timer service started");

        loop {
            let hold_at = self.hold_deadline();
            tokio::select! {
                command = rx.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    let was_ticking = self.ticking;
                    if self.handle(command).await.is_break() {
                        break;
                    }
                    if self.ticking && !was_ticking {
                        primary.reset();
                        backup.reset();
                    }
                }
                _ = primary.tick(), if self.ticking => self.on_tick(),
                _ = backup.tick(), if self.ticking => {
                    tracing::debug!("backup tick");
                    self.on_tick();
                }
                _ = tokio::time::sleep_until(hold_at.unwrap_or_else(Instant::now)), if hold_at.is_some() => {
                    self.on_hold_deadline().await;
                }
            }
        }

        tracing::info!("timer service stopped");
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Shutdown => return ControlFlow::Break(()),
            Command::Key { button, action } => {
                let now = self.clock.now_monotonic_ms();
                if let Some(trigger) = self.detector.on_event(button, action, now) {
                    self.on_trigger(trigger).await;
                }
            }
            Command::ResetGestures => self.detector.reset(),
            Command::SetTriggerMode(mode) => {
                tracing::info!(?mode, "trigger mode changed");
                self.detector.set_mode(mode);
            }
            Command::ScreenOff => {
                if self.config.auto_start_on_screen_off && self.machine.state().is_idle() {
                    tracing::info!("screen off, auto-starting");
                    self.execute(Command::Start { auto: true }).await;
                }
            }
            other => self.execute(other).await,
        }
        self.publish();
        ControlFlow::Continue(())
    }

    /// Apply one timer command to the machine.
    async fn execute(&mut self, command: Command) {
        let event = match command {
            Command::Start { auto } => {
                if !self.machine.state().is_idle() {
                    return;
                }
                let rule = self.lookup_rule().await;
                self.machine.start(rule, auto)
            }
            Command::Pause => {
                self.ticking = false;
                self.machine.pause()
            }
            Command::Resume => self.machine.resume(),
            Command::Stop => {
                self.ticking = false;
                self.machine.stop()
            }
            Command::CancelAuto => {
                self.ticking = false;
                self.machine.cancel_auto()
            }
            Command::Acknowledge => self.machine.acknowledge(),
            Command::Tick => self.machine.tick(),
            // handled before reaching the machine
            Command::Key { .. }
            | Command::ResetGestures
            | Command::SetTriggerMode(_)
            | Command::ScreenOff
            | Command::Shutdown => None,
        };
        self.ticking = self.machine.is_ticking();
        if let Some(event) = event {
            self.dispatch(event);
        }
    }

    async fn on_trigger(&mut self, trigger: Trigger) {
        let commands = gesture::route(trigger, self.machine.state());
        tracing::debug!(?trigger, ?commands, "gesture recognised");
        for command in commands {
            self.execute(command).await;
        }
    }

    async fn on_hold_deadline(&mut self) {
        let now = self.clock.now_monotonic_ms();
        for trigger in self.detector.poll(now) {
            self.on_trigger(trigger).await;
        }
        self.publish();
    }

    fn on_tick(&mut self) {
        if let Some(event) = self.machine.tick() {
            self.dispatch(event);
        }
        self.publish();
    }

    fn hold_deadline(&self) -> Option<Instant> {
        let deadline_ms = self.detector.next_deadline()?;
        let wait = deadline_ms.saturating_sub(self.clock.now_monotonic_ms());
        Some(Instant::now() + Duration::from_millis(wait))
    }

    async fn lookup_rule(&self) -> Option<PricingRule> {
        let rules = self.rules.clone()?;
        let rule_id = self.config.rule_id;
        let lookup = tokio::task::spawn_blocking(move || match rule_id {
            Some(id) => rules.rule(id),
            None => rules.default_rule(),
        })
        .await;

        match lookup {
            Ok(Ok(rule)) => rule,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "rule lookup failed, starting without a rule");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "rule lookup task failed, starting without a rule");
                None
            }
        }
    }

    fn dispatch(&self, event: Event) {
        if let Event::TimerStopped { record, .. } = &event {
            self.persist(record.clone());
        }
        // No subscribers is fine.
        let _ = self.events_tx.send(event);
    }

    fn persist(&self, record: DanceRecord) {
        let Some(history) = self.history.clone() else {
            return;
        };
        tokio::task::spawn_blocking(move || match history.insert_record(&record) {
            Ok(id) => tracing::info!(id, cost = record.cost, "dance record saved"),
            Err(e) => tracing::warn!(error = %e, "failed to save dance record"),
        });
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.machine.state().clone());
    }
}
