//! `dancetimer run`: a live timer session driven by stdin.
//!
//! Every line is one command (see `help`). Events are printed to stdout as
//! JSON lines; `status` prints the current state snapshot. EOF shuts the
//! service down cleanly.

use std::sync::Arc;

use clap::Args;
use dancetimer_core::gesture::{Button, KeyAction, TriggerMode};
use dancetimer_core::timer::{Command, SystemClock, TimerMachine, TimerService};
use dancetimer_core::{Config, HistoryStore, RuleStore, TracingFeedback};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use super::{open_db, resolve_rule, CliResult};

const HELP: &str = "commands: start | pause | resume | stop | cancel | ack | tick | status \
| screen-off | key <a|b> <down|up> | mode <hold|repeat> | reset-gestures | quit";

#[derive(Args)]
pub struct RunArgs {
    /// Pricing rule id (default rule when omitted)
    #[arg(long)]
    rule: Option<i64>,
}

#[derive(Debug, PartialEq)]
enum Input {
    Command(Command),
    Status,
    Help,
}

fn parse_input(line: &str) -> Result<Input, String> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let command = match words[..] {
        ["start"] => Command::Start { auto: false },
        ["pause"] => Command::Pause,
        ["resume"] => Command::Resume,
        ["stop"] => Command::Stop,
        ["cancel"] => Command::CancelAuto,
        ["ack"] => Command::Acknowledge,
        ["tick"] => Command::Tick,
        ["screen-off"] => Command::ScreenOff,
        ["reset-gestures"] => Command::ResetGestures,
        ["quit"] | ["exit"] => Command::Shutdown,
        ["key", button, action] => Command::Key {
            button: button.parse::<Button>()?,
            action: action.parse::<KeyAction>()?,
        },
        ["mode", mode] => Command::SetTriggerMode(mode.parse::<TriggerMode>()?),
        ["status"] => return Ok(Input::Status),
        ["help"] => return Ok(Input::Help),
        _ => return Err(format!("unrecognised input '{}'", line.trim())),
    };
    Ok(Input::Command(command))
}

pub fn run(args: RunArgs) -> CliResult {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(session(args))
}

async fn session(args: RunArgs) -> CliResult {
    let db = Arc::new(open_db()?);
    // fail fast on an unknown id instead of silently billing nothing
    resolve_rule(&db, args.rule)?;

    let config = Config::load_or_default();
    let mut service_config = config.service_config();
    service_config.rule_id = args.rule;

    let machine = TimerMachine::new(Arc::new(SystemClock::new()), config.timer_settings())
        .with_feedback(Arc::new(TracingFeedback));
    let rules: Arc<dyn RuleStore> = db.clone();
    let history: Arc<dyn HistoryStore> = db;
    let (handle, task) = TimerService::new(machine, service_config)
        .with_rules(rules)
        .with_history(history)
        .spawn();

    let mut events = handle.events();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => println!("{json}"),
                    Err(e) => tracing::warn!(error = %e, "failed to encode event"),
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event printer fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match parse_input(&line) {
            Ok(Input::Command(Command::Shutdown)) => break,
            Ok(Input::Command(command)) => handle.send(command).await?,
            Ok(Input::Status) => println!("{}", serde_json::to_string(&handle.state())?),
            Ok(Input::Help) => eprintln!("{HELP}"),
            Err(e) => eprintln!("{e}"),
        }
    }

    handle.send(Command::Shutdown).await?;
    task.await?;
    // the service dropped its sender; the printer drains and exits
    drop(handle);
    printer.await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timer_commands() {
        assert_eq!(
            parse_input("start"),
            Ok(Input::Command(Command::Start { auto: false }))
        );
        assert_eq!(parse_input("  stop  "), Ok(Input::Command(Command::Stop)));
        assert_eq!(parse_input("cancel"), Ok(Input::Command(Command::CancelAuto)));
        assert_eq!(parse_input("status"), Ok(Input::Status));
        assert_eq!(parse_input("quit"), Ok(Input::Command(Command::Shutdown)));
    }

    #[test]
    fn parses_key_and_mode() {
        assert_eq!(
            parse_input("key b up"),
            Ok(Input::Command(Command::Key {
                button: Button::B,
                action: KeyAction::Up
            }))
        );
        assert_eq!(
            parse_input("mode repeat"),
            Ok(Input::Command(Command::SetTriggerMode(TriggerMode::RapidRepeat)))
        );
    }

    #[test]
    fn rejects_unknown_input() {
        assert!(parse_input("dance").is_err());
        assert!(parse_input("key c down").is_err());
        assert!(parse_input("mode").is_err());
    }
}
