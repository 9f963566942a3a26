//! Map recognised triggers onto timer commands for the current state.

use crate::timer::{Command, TimerState};

use super::Trigger;

/// Commands to run, in order, for `trigger` while the timer is in `state`.
///
/// Primary starts (clearing a finished summary first) or resumes. Secondary
/// stops a running session, paused or not. Anything else is ignored.
pub fn route(trigger: Trigger, state: &TimerState) -> Vec<Command> {
    match (trigger, state) {
        (Trigger::Primary, TimerState::Idle) => vec![Command::Start { auto: false }],
        (Trigger::Primary, TimerState::Finished(_)) => {
            vec![Command::Acknowledge, Command::Start { auto: false }]
        }
        (Trigger::Primary, TimerState::Running(r)) if r.is_paused => vec![Command::Resume],
        (Trigger::Primary, TimerState::Running(_)) => Vec::new(),
        (Trigger::Secondary, TimerState::Running(_)) => vec![Command::Stop],
        (Trigger::Secondary, _) => Vec::new(),
    }
}
