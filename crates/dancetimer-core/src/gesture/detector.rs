//! Two-button trigger gesture detection.
//!
//! Turns raw press/release events from a pair of buttons (volume up and
//! down on a phone) into at most one semantic trigger per gesture. Two
//! recognition modes exist; only one is active at a time.
//!
//! # Sustained hold
//!
//! ```text
//!           Down                  deadline reached
//! Released ──────► Pending(deadline) ──────────────► Fired
//!    ▲                  │                              │
//!    │        Up        │             Up               │
//!    └──────────────────┴──────────────────────────────┘
//! ```
//!
//! Repeated `Down` events while `Pending` or `Fired` (key auto-repeat) are
//! ignored; only `Up` re-arms the button.
//!
//! # Rapid repeat
//!
//! Every `Down` is timestamped. Stamps older than the window are pruned
//! after each press, and the trigger fires once the surviving stamps reach
//! the repeat count: a sliding window, not a fixed bucket.
//!
//! The detector never reads a clock. Callers pass `now_ms` with each event
//! and call [`TriggerDetector::poll`] at [`TriggerDetector::next_deadline`].

use serde::{Deserialize, Serialize};

pub const DEFAULT_HOLD_THRESHOLD_MS: u64 = 1_500;
pub const DEFAULT_REPEAT_WINDOW_MS: u64 = 600;
pub const DEFAULT_REPEAT_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    /// Volume up.
    A,
    /// Volume down.
    B,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAction {
    Down,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Gesture on button A.
    Primary,
    /// Gesture on button B.
    Secondary,
}

impl Button {
    pub fn trigger(self) -> Trigger {
        match self {
            Button::A => Trigger::Primary,
            Button::B => Trigger::Secondary,
        }
    }

    fn slot(self) -> usize {
        match self {
            Button::A => 0,
            Button::B => 1,
        }
    }
}

impl std::str::FromStr for Button {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "up" | "+" => Ok(Button::A),
            "b" | "down" | "-" => Ok(Button::B),
            other => Err(format!("unknown button '{other}'")),
        }
    }
}

impl std::str::FromStr for KeyAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "down" | "press" => Ok(KeyAction::Down),
            "up" | "release" => Ok(KeyAction::Up),
            other => Err(format!("unknown key action '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    #[default]
    SustainedHold,
    RapidRepeat,
}

impl std::str::FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sustained_hold" | "hold" => Ok(TriggerMode::SustainedHold),
            "rapid_repeat" | "repeat" => Ok(TriggerMode::RapidRepeat),
            other => Err(format!("unknown trigger mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub mode: TriggerMode,
    pub hold_threshold_ms: u64,
    pub repeat_window_ms: u64,
    pub repeat_count: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            mode: TriggerMode::default(),
            hold_threshold_ms: DEFAULT_HOLD_THRESHOLD_MS,
            repeat_window_ms: DEFAULT_REPEAT_WINDOW_MS,
            repeat_count: DEFAULT_REPEAT_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Hold {
    #[default]
    Released,
    Pending {
        deadline_ms: u64,
    },
    Fired,
}

#[derive(Debug, Default)]
pub struct TriggerDetector {
    config: DetectorConfig,
    holds: [Hold; 2],
    presses: [Vec<u64>; 2],
}

impl TriggerDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            holds: [Hold::Released; 2],
            presses: [Vec::new(), Vec::new()],
        }
    }

    pub fn mode(&self) -> TriggerMode {
        self.config.mode
    }

    /// Switch recognition mode. Anything in flight is dropped.
    pub fn set_mode(&mut self, mode: TriggerMode) {
        if self.config.mode != mode {
            self.reset();
            self.config.mode = mode;
        }
    }

    /// Forget pending holds and press history, e.g. when input focus moves.
    pub fn reset(&mut self) {
        self.holds = [Hold::Released; 2];
        for presses in &mut self.presses {
            presses.clear();
        }
    }

    /// Feed one raw event.
    pub fn on_event(&mut self, button: Button, action: KeyAction, now_ms: u64) -> Option<Trigger> {
        match self.config.mode {
            TriggerMode::SustainedHold => self.on_hold_event(button, action, now_ms),
            TriggerMode::RapidRepeat => self.on_repeat_event(button, action, now_ms),
        }
    }

    /// Fire every hold whose deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> Vec<Trigger> {
        let mut fired = Vec::new();
        for button in [Button::A, Button::B] {
            if let Hold::Pending { deadline_ms } = self.holds[button.slot()] {
                if deadline_ms <= now_ms {
                    self.holds[button.slot()] = Hold::Fired;
                    tracing::debug!(?button, "hold threshold reached");
                    fired.push(button.trigger());
                }
            }
        }
        fired
    }

    /// Earliest pending hold deadline, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.holds
            .iter()
            .filter_map(|h| match h {
                Hold::Pending { deadline_ms } => Some(*deadline_ms),
                _ => None,
            })
            .min()
    }

    fn on_hold_event(&mut self, button: Button, action: KeyAction, now_ms: u64) -> Option<Trigger> {
        let slot = button.slot();
        match (self.holds[slot], action) {
            (Hold::Released, KeyAction::Down) => {
                self.holds[slot] = Hold::Pending {
                    deadline_ms: now_ms.saturating_add(self.config.hold_threshold_ms),
                };
                None
            }
            (Hold::Pending { .. } | Hold::Fired, KeyAction::Down) => None,
            // The deadline passed before anyone polled: the hold still counts.
            (Hold::Pending { deadline_ms }, KeyAction::Up) if deadline_ms <= now_ms => {
                self.holds[slot] = Hold::Released;
                Some(button.trigger())
            }
            (_, KeyAction::Up) => {
                self.holds[slot] = Hold::Released;
                None
            }
        }
    }

    fn on_repeat_event(&mut self, button: Button, action: KeyAction, now_ms: u64) -> Option<Trigger> {
        if action != KeyAction::Down {
            return None;
        }
        let window = self.config.repeat_window_ms;
        let presses = &mut self.presses[button.slot()];
        presses.push(now_ms);
        presses.retain(|&t| now_ms.saturating_sub(t) <= window);
        if presses.len() >= self.config.repeat_count {
            presses.clear();
            tracing::debug!(?button, "rapid repeat recognised");
            return Some(button.trigger());
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Button::{A, B};
    use KeyAction::{Down, Up};

    fn hold() -> TriggerDetector {
        TriggerDetector::new(DetectorConfig::default())
    }

    fn repeat() -> TriggerDetector {
        TriggerDetector::new(DetectorConfig {
            mode: TriggerMode::RapidRepeat,
            ..DetectorConfig::default()
        })
    }

    #[test]
    fn short_press_does_not_fire() {
        let mut d = hold();
        assert_eq!(d.on_event(A, Down, 0), None);
        assert_eq!(d.next_deadline(), Some(1_500));
        assert!(d.poll(1_399).is_empty());
        assert_eq!(d.on_event(A, Up, 1_400), None);
        assert_eq!(d.next_deadline(), None);
        assert!(d.poll(5_000).is_empty());
    }

    #[test]
    fn long_press_fires_once() {
        let mut d = hold();
        d.on_event(A, Down, 0);
        assert_eq!(d.poll(1_600), vec![Trigger::Primary]);
        assert!(d.poll(1_700).is_empty());
        assert_eq!(d.on_event(A, Up, 2_000), None);
    }

    #[test]
    fn auto_repeat_downs_do_not_rearm() {
        let mut d = hold();
        d.on_event(B, Down, 0);
        d.on_event(B, Down, 500);
        d.on_event(B, Down, 1_000);
        assert_eq!(d.next_deadline(), Some(1_500));
        assert_eq!(d.poll(1_500), vec![Trigger::Secondary]);
        d.on_event(B, Down, 1_600);
        assert_eq!(d.next_deadline(), None);
        assert!(d.poll(10_000).is_empty());
    }

    #[test]
    fn unpolled_deadline_fires_on_release() {
        let mut d = hold();
        d.on_event(A, Down, 0);
        assert_eq!(d.on_event(A, Up, 1_600), Some(Trigger::Primary));
        assert!(d.poll(2_000).is_empty());
    }

    #[test]
    fn buttons_are_tracked_independently() {
        let mut d = hold();
        d.on_event(A, Down, 0);
        d.on_event(B, Down, 200);
        d.on_event(A, Up, 100);
        assert_eq!(d.poll(1_700), vec![Trigger::Secondary]);
    }

    #[test]
    fn both_holds_can_fire_in_one_poll() {
        let mut d = hold();
        d.on_event(A, Down, 0);
        d.on_event(B, Down, 10);
        assert_eq!(d.poll(2_000), vec![Trigger::Primary, Trigger::Secondary]);
    }

    #[test]
    fn three_presses_inside_window_fire() {
        let mut d = repeat();
        assert_eq!(d.on_event(A, Down, 0), None);
        assert_eq!(d.on_event(A, Up, 50), None);
        assert_eq!(d.on_event(A, Down, 300), None);
        assert_eq!(d.on_event(A, Down, 600), Some(Trigger::Primary));
        // history cleared: the next press starts a fresh window
        assert_eq!(d.on_event(A, Down, 650), None);
    }

    #[test]
    fn three_presses_spanning_700ms_do_not_fire() {
        let mut d = repeat();
        d.on_event(B, Down, 0);
        d.on_event(B, Down, 350);
        assert_eq!(d.on_event(B, Down, 700), None);
        // window is sliding: the last two presses still count
        assert_eq!(d.on_event(B, Down, 800), Some(Trigger::Secondary));
    }

    #[test]
    fn presses_on_other_button_do_not_mix() {
        let mut d = repeat();
        d.on_event(A, Down, 0);
        d.on_event(B, Down, 100);
        assert_eq!(d.on_event(A, Down, 200), None);
        assert_eq!(d.on_event(A, Down, 300), Some(Trigger::Primary));
    }

    #[test]
    fn reset_clears_everything() {
        let mut d = hold();
        d.on_event(A, Down, 0);
        d.reset();
        assert_eq!(d.next_deadline(), None);
        assert!(d.poll(5_000).is_empty());

        let mut d = repeat();
        d.on_event(A, Down, 0);
        d.on_event(A, Down, 100);
        d.reset();
        assert_eq!(d.on_event(A, Down, 200), None);
    }

    #[test]
    fn switching_mode_drops_pending_hold() {
        let mut d = hold();
        d.on_event(A, Down, 0);
        d.set_mode(TriggerMode::RapidRepeat);
        assert_eq!(d.mode(), TriggerMode::RapidRepeat);
        assert_eq!(d.next_deadline(), None);
    }

    #[test]
    fn parses_buttons_and_actions() {
        assert_eq!("A".parse::<Button>(), Ok(A));
        assert_eq!("-".parse::<Button>(), Ok(B));
        assert_eq!("release".parse::<KeyAction>(), Ok(Up));
        assert!("x".parse::<Button>().is_err());
        assert_eq!("repeat".parse::<TriggerMode>(), Ok(TriggerMode::RapidRepeat));
    }
}
