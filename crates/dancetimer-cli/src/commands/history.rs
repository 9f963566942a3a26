use chrono::{Local, NaiveDate, TimeZone, Utc};
use clap::Subcommand;
use dancetimer_core::billing::format::{format_cost, format_duration};
use dancetimer_core::Config;
use serde::Serialize;

use super::{open_db, print_json, CliResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Most recent sessions
    List {
        /// Maximum number of records
        #[arg(long, default_value = "50")]
        limit: usize,
    },
    /// Sessions that started between two local dates
    Range {
        /// First day (YYYY-MM-DD), inclusive
        from: NaiveDate,
        /// Last day (YYYY-MM-DD), inclusive
        to: NaiveDate,
    },
    /// Show one session
    Show {
        /// Record id
        id: i64,
    },
    /// Delete one session
    Delete {
        /// Record id
        id: i64,
    },
    /// Delete every session
    Clear {
        /// Required confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Cost today, this week and this month
    Summary,
}

#[derive(Serialize)]
struct RangeOutput<T> {
    records: Vec<T>,
    total_cost: String,
}

#[derive(Serialize)]
struct RecordLine {
    #[serde(flatten)]
    record: dancetimer_core::DanceRecord,
    duration: String,
}

fn local_day_start(day: NaiveDate) -> CliResult<chrono::DateTime<Utc>> {
    let naive = day
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid date {day}"))?;
    let local = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("{day} has no local midnight"))?;
    Ok(local.with_timezone(&Utc))
}

pub fn run(action: HistoryAction) -> CliResult {
    let db = open_db()?;

    match action {
        HistoryAction::List { limit } => {
            let records: Vec<RecordLine> = db
                .list_records(limit)?
                .into_iter()
                .map(|record| RecordLine {
                    duration: format_duration(record.duration_seconds),
                    record,
                })
                .collect();
            print_json(&records)?;
        }
        HistoryAction::Range { from, to } => {
            if to < from {
                return Err(format!("range end {to} is before start {from}").into());
            }
            let start = local_day_start(from)?;
            let end = local_day_start(to + chrono::Duration::days(1))?;
            let currency = Config::load_or_default().ui.currency_symbol;
            print_json(&RangeOutput {
                records: db.records_in_range(start, end)?,
                total_cost: format_cost(db.cost_in_range(start, end)?, &currency),
            })?;
        }
        HistoryAction::Show { id } => {
            let record = db
                .record(id)?
                .ok_or_else(|| format!("no dance record with id {id}"))?;
            print_json(&RecordLine {
                duration: format_duration(record.duration_seconds),
                record,
            })?;
        }
        HistoryAction::Delete { id } => {
            db.delete_record(id)?;
            println!("record {id} deleted");
        }
        HistoryAction::Clear { yes } => {
            if !yes {
                return Err("refusing to clear history without --yes".into());
            }
            let removed = db.delete_all_records()?;
            println!("{removed} records deleted");
        }
        HistoryAction::Summary => {
            print_json(&db.history_summary(Local::now())?)?;
        }
    }
    Ok(())
}
