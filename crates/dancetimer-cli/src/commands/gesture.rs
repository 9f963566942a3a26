//! Offline replay of a recorded button trace.
//!
//! A trace is one event per line: `<ms> <button> <action>`, e.g.
//! `1200 a down`. Blank lines and `#` comments are ignored. Times are
//! milliseconds from the start of the trace and must not go backwards.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use dancetimer_core::gesture::{route, Button, KeyAction, Trigger, TriggerDetector, TriggerMode};
use dancetimer_core::timer::{Command, ManualClock, TimerMachine};
use dancetimer_core::{Config, Event, PricingRule};
use serde::Serialize;

use super::{open_db, resolve_rule, CliResult};

#[derive(Subcommand)]
pub enum GestureAction {
    /// Replay a button trace and print the recognised triggers
    Replay {
        /// Trace file
        file: PathBuf,
        /// Trigger mode (configured mode when omitted)
        #[arg(long)]
        mode: Option<TriggerMode>,
        /// Pricing rule id for sessions started by the trace
        #[arg(long)]
        rule: Option<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceEvent {
    pub at_ms: u64,
    pub button: Button,
    pub action: KeyAction,
}

#[derive(Serialize)]
struct TriggerLine {
    at_ms: u64,
    trigger: Trigger,
    events: Vec<Event>,
}

pub fn parse_trace(text: &str) -> Result<Vec<TraceEvent>, String> {
    let mut events = Vec::new();
    let mut last_ms = 0;
    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [at, button, action] = fields[..] else {
            return Err(format!("line {line_no}: expected '<ms> <button> <action>'"));
        };
        let at_ms: u64 = at
            .parse()
            .map_err(|_| format!("line {line_no}: bad timestamp '{at}'"))?;
        if at_ms < last_ms {
            return Err(format!("line {line_no}: timestamp {at_ms} goes backwards"));
        }
        last_ms = at_ms;
        let button = button
            .parse()
            .map_err(|e| format!("line {line_no}: {e}"))?;
        let action = action
            .parse()
            .map_err(|e| format!("line {line_no}: {e}"))?;
        events.push(TraceEvent {
            at_ms,
            button,
            action,
        });
    }
    Ok(events)
}

/// Drives a detector and machine on a hand-moved clock.
struct Replay {
    clock: Arc<ManualClock>,
    now_ms: u64,
    detector: TriggerDetector,
    machine: TimerMachine,
    rule: Option<PricingRule>,
    lines: Vec<TriggerLine>,
}

impl Replay {
    fn advance_to(&mut self, at_ms: u64) {
        if at_ms > self.now_ms {
            self.clock.advance(Duration::from_millis(at_ms - self.now_ms));
            self.now_ms = at_ms;
        }
    }

    /// Fire every hold deadline due at or before `until`, each at its own time.
    fn fire_deadlines(&mut self, until: Option<u64>) {
        loop {
            let Some(deadline) = self.detector.next_deadline() else {
                return;
            };
            if until.is_some_and(|until| deadline > until) {
                return;
            }
            self.advance_to(deadline);
            for trigger in self.detector.poll(deadline) {
                self.apply(trigger);
            }
        }
    }

    fn feed(&mut self, event: TraceEvent) {
        self.fire_deadlines(Some(event.at_ms));
        self.advance_to(event.at_ms);
        if let Some(trigger) = self.detector.on_event(event.button, event.action, event.at_ms) {
            self.apply(trigger);
        }
    }

    fn apply(&mut self, trigger: Trigger) {
        let mut events: Vec<Event> = self.machine.tick().into_iter().collect();
        for command in route(trigger, self.machine.state()) {
            let event = match command {
                Command::Start { auto } => self.machine.start(self.rule.clone(), auto),
                Command::Resume => self.machine.resume(),
                Command::Stop => self.machine.stop(),
                Command::Acknowledge => self.machine.acknowledge(),
                other => {
                    tracing::debug!(?other, "command not used by replay");
                    None
                }
            };
            events.extend(event);
        }
        self.lines.push(TriggerLine {
            at_ms: self.now_ms,
            trigger,
            events,
        });
    }
}

pub fn run(action: GestureAction) -> CliResult {
    match action {
        GestureAction::Replay { file, mode, rule } => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| format!("cannot read {}: {e}", file.display()))?;
            let trace = parse_trace(&text)?;

            let config = Config::load_or_default();
            let mut detector_config = config.service_config().detector;
            if let Some(mode) = mode {
                detector_config.mode = mode;
            }
            let db = open_db()?;
            let rule = resolve_rule(&db, rule)?;

            let clock = Arc::new(ManualClock::new(Utc::now()));
            let mut replay = Replay {
                machine: TimerMachine::new(clock.clone(), config.timer_settings()),
                clock,
                now_ms: 0,
                detector: TriggerDetector::new(detector_config),
                rule,
                lines: Vec::new(),
            };
            for event in trace {
                replay.feed(event);
            }
            replay.fire_deadlines(None);

            for line in &replay.lines {
                println!("{}", serde_json::to_string(line)?);
            }
        }
    }
    Ok(())
}
