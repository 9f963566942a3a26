//! SQLite storage for pricing rules and dance history.
//!
//! Provides persistent storage for:
//! - Pricing rules and their price tiers
//! - Finished dance sessions
//! - Cost summaries for today, this week and this month

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::error::{DatabaseError, Result};
use crate::pricing::{preset_rules, PriceTier, PricingRule};
use crate::store::{HistoryStore, RuleStore};

use super::data_dir;
use super::migrations;

/// One finished session. Rule name and id are copies taken at stop time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DanceRecord {
    #[serde(default)]
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: u64,
    pub cost: f64,
    pub pricing_rule_name: String,
    pub pricing_rule_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistorySummary {
    pub today_cost: f64,
    pub week_cost: f64,
    pub month_cost: f64,
    pub total_count: u64,
}

/// SQLite database for rules and history.
pub struct Database {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Open the database at `<data dir>/dancetimer.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("dancetimer.db");
        Self::open_at(&path)
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DatabaseError::Locked.into())
    }

    // ── Pricing rules ────────────────────────────────────────────────

    /// Insert a rule and its tiers. Returns the new rule id.
    ///
    /// A rule flagged as default takes the flag from whichever rule held it.
    pub fn insert_rule(&self, rule: &PricingRule) -> Result<i64> {
        rule.validate()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        if rule.is_default {
            tx.execute("UPDATE pricing_rules SET is_default = 0", [])?;
        }
        tx.execute(
            "INSERT INTO pricing_rules (name, is_default, created_at) VALUES (?1, ?2, ?3)",
            params![rule.name, rule.is_default, timestamp(&rule.created_at)],
        )?;
        let id = tx.last_insert_rowid();
        insert_tiers(&tx, id, &rule.tiers)?;
        tx.commit()?;
        tracing::debug!(id, name = %rule.name, "pricing rule inserted");
        Ok(id)
    }

    /// Rename a rule and replace its tiers.
    pub fn update_rule(&self, rule: &PricingRule) -> Result<()> {
        rule.validate()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "UPDATE pricing_rules SET name = ?1 WHERE id = ?2",
            params![rule.name, rule.id],
        )?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "pricing rule",
                id: rule.id,
            }
            .into());
        }
        tx.execute("DELETE FROM price_tiers WHERE rule_id = ?1", [rule.id])?;
        insert_tiers(&tx, rule.id, &rule.tiers)?;
        tx.commit()?;
        Ok(())
    }

    /// Delete a rule; its tiers go with it. History keeps the rule name.
    pub fn delete_rule(&self, id: i64) -> Result<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM pricing_rules WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "pricing rule",
                id,
            }
            .into());
        }
        Ok(())
    }

    /// All rules with their tiers, oldest first.
    pub fn list_rules(&self) -> Result<Vec<PricingRule>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, is_default, created_at FROM pricing_rules ORDER BY created_at ASC, id ASC",
        )?;
        let mut rules = stmt
            .query_map([], rule_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for rule in &mut rules {
            rule.tiers = tiers_for(&conn, rule.id)?;
        }
        Ok(rules)
    }

    pub fn rule_with_tiers(&self, id: i64) -> Result<Option<PricingRule>> {
        let conn = self.conn()?;
        let rule = conn
            .query_row(
                "SELECT id, name, is_default, created_at FROM pricing_rules WHERE id = ?1",
                [id],
                rule_from_row,
            )
            .optional()?;
        rule.map(|mut rule| -> Result<PricingRule> {
            rule.tiers = tiers_for(&conn, rule.id)?;
            Ok(rule)
        })
        .transpose()
    }

    pub fn default_rule_with_tiers(&self) -> Result<Option<PricingRule>> {
        let conn = self.conn()?;
        let rule = conn
            .query_row(
                "SELECT id, name, is_default, created_at FROM pricing_rules WHERE is_default = 1 LIMIT 1",
                [],
                rule_from_row,
            )
            .optional()?;
        rule.map(|mut rule| -> Result<PricingRule> {
            rule.tiers = tiers_for(&conn, rule.id)?;
            Ok(rule)
        })
        .transpose()
    }

    /// Make `id` the only default rule. Clear and set happen in one transaction.
    pub fn set_as_default(&self, id: i64) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("UPDATE pricing_rules SET is_default = 0", [])?;
        let changed = tx.execute("UPDATE pricing_rules SET is_default = 1 WHERE id = ?1", [id])?;
        if changed == 0 {
            // dropping `tx` rolls the clear back
            return Err(DatabaseError::NotFound {
                entity: "pricing rule",
                id,
            }
            .into());
        }
        tx.commit()?;
        tracing::info!(id, "default pricing rule changed");
        Ok(())
    }

    /// Append a tier to an existing rule, after its last `sort_order`.
    /// Returns the tier id.
    pub fn add_tier(&self, rule_id: i64, tier: &PriceTier) -> Result<i64> {
        tier.validate()?;
        let conn = self.conn()?;
        let exists = conn
            .query_row("SELECT 1 FROM pricing_rules WHERE id = ?1", [rule_id], |_| Ok(()))
            .optional()?
            .is_some();
        if !exists {
            return Err(DatabaseError::NotFound {
                entity: "pricing rule",
                id: rule_id,
            }
            .into());
        }
        conn.execute(
            "INSERT INTO price_tiers (rule_id, duration_minutes, price, sort_order)
             VALUES (?1, ?2, ?3,
                     (SELECT COALESCE(MAX(sort_order), -1) + 1 FROM price_tiers WHERE rule_id = ?1))",
            params![rule_id, tier.duration_minutes, tier.price],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn delete_tier(&self, tier_id: i64) -> Result<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM price_tiers WHERE id = ?1", [tier_id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "price tier",
                id: tier_id,
            }
            .into());
        }
        Ok(())
    }

    /// Install the preset rules when no rule exists yet.
    ///
    /// Returns how many rules were added.
    pub fn seed_default_rules(&self) -> Result<usize> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM pricing_rules", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(0);
        }
        let presets = preset_rules();
        for rule in &presets {
            self.insert_rule(rule)?;
        }
        tracing::info!(count = presets.len(), "seeded preset pricing rules");
        Ok(presets.len())
    }

    // ── Dance records ────────────────────────────────────────────────

    /// Most recent first.
    pub fn list_records(&self, limit: usize) -> Result<Vec<DanceRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, start_time, end_time, duration_seconds, cost, pricing_rule_name, pricing_rule_id
             FROM dance_records ORDER BY start_time DESC, id DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map([limit as i64], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    pub fn record(&self, id: i64) -> Result<Option<DanceRecord>> {
        let record = self
            .conn()?
            .query_row(
                "SELECT id, start_time, end_time, duration_seconds, cost, pricing_rule_name, pricing_rule_id
                 FROM dance_records WHERE id = ?1",
                [id],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Records that started in `[from, to)`, most recent first.
    pub fn records_in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<DanceRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, start_time, end_time, duration_seconds, cost, pricing_rule_name, pricing_rule_id
             FROM dance_records WHERE start_time >= ?1 AND start_time < ?2
             ORDER BY start_time DESC, id DESC",
        )?;
        let records = stmt
            .query_map(params![timestamp(&from), timestamp(&to)], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Total cost of records that started in `[from, to)`.
    pub fn cost_in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<f64> {
        let cost = self.conn()?.query_row(
            "SELECT COALESCE(SUM(cost), 0.0) FROM dance_records WHERE start_time >= ?1 AND start_time < ?2",
            params![timestamp(&from), timestamp(&to)],
            |row| row.get(0),
        )?;
        Ok(cost)
    }

    pub fn total_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM dance_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Cost today, this week (Monday start) and this month, in local time.
    pub fn history_summary(&self, now: DateTime<Local>) -> Result<HistorySummary> {
        let today = now.date_naive();
        let tomorrow = local_midnight(today + Duration::days(1));
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let month_start = today.with_day(1).unwrap_or(today);

        Ok(HistorySummary {
            today_cost: self.cost_in_range(local_midnight(today), tomorrow)?,
            week_cost: self.cost_in_range(local_midnight(week_start), tomorrow)?,
            month_cost: self.cost_in_range(local_midnight(month_start), tomorrow)?,
            total_count: self.total_count()?,
        })
    }

    pub fn delete_record(&self, id: i64) -> Result<()> {
        let changed = self
            .conn()?
            .execute("DELETE FROM dance_records WHERE id = ?1", [id])?;
        if changed == 0 {
            return Err(DatabaseError::NotFound {
                entity: "dance record",
                id,
            }
            .into());
        }
        Ok(())
    }

    /// Returns how many records were removed.
    pub fn delete_all_records(&self) -> Result<usize> {
        let removed = self.conn()?.execute("DELETE FROM dance_records", [])?;
        tracing::info!(removed, "dance history cleared");
        Ok(removed)
    }
}

impl RuleStore for Database {
    fn default_rule(&self) -> Result<Option<PricingRule>> {
        self.default_rule_with_tiers()
    }

    fn rule(&self, id: i64) -> Result<Option<PricingRule>> {
        self.rule_with_tiers(id)
    }
}

impl HistoryStore for Database {
    fn insert_record(&self, record: &DanceRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO dance_records
                (start_time, end_time, duration_seconds, cost, pricing_rule_name, pricing_rule_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timestamp(&record.start_time),
                timestamp(&record.end_time),
                record.duration_seconds as i64,
                record.cost,
                record.pricing_rule_name,
                record.pricing_rule_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

/// Fixed-width UTC text so that string order is time order.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(idx: usize, text: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn local_midnight(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

fn rule_from_row(row: &Row<'_>) -> rusqlite::Result<PricingRule> {
    let created_at: String = row.get(3)?;
    Ok(PricingRule {
        id: row.get(0)?,
        name: row.get(1)?,
        is_default: row.get(2)?,
        created_at: parse_timestamp(3, &created_at)?,
        tiers: Vec::new(),
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DanceRecord> {
    let start: String = row.get(1)?;
    let end: String = row.get(2)?;
    Ok(DanceRecord {
        id: row.get(0)?,
        start_time: parse_timestamp(1, &start)?,
        end_time: parse_timestamp(2, &end)?,
        duration_seconds: row.get::<_, i64>(3)?.max(0) as u64,
        cost: row.get(4)?,
        pricing_rule_name: row.get(5)?,
        pricing_rule_id: row.get(6)?,
    })
}

fn tiers_for(conn: &Connection, rule_id: i64) -> rusqlite::Result<Vec<PriceTier>> {
    let mut stmt = conn.prepare(
        "SELECT id, rule_id, duration_minutes, price, sort_order
         FROM price_tiers WHERE rule_id = ?1 ORDER BY duration_minutes ASC, sort_order ASC",
    )?;
    let tiers = stmt
        .query_map([rule_id], |row| {
            Ok(PriceTier {
                id: row.get(0)?,
                rule_id: row.get(1)?,
                duration_minutes: row.get(2)?,
                price: row.get(3)?,
                sort_order: row.get(4)?,
            })
        })?
        .collect();
    tiers
}

fn insert_tiers(conn: &Connection, rule_id: i64, tiers: &[PriceTier]) -> rusqlite::Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO price_tiers (rule_id, duration_minutes, price, sort_order) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (i, tier) in tiers.iter().enumerate() {
        stmt.execute(params![rule_id, tier.duration_minutes, tier.price, i as i32])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, minutes: f64, price: f64) -> PricingRule {
        PricingRule::new(name, vec![PriceTier::new(minutes, price)])
    }

    fn record_at(start: DateTime<Utc>, seconds: u64, cost: f64) -> DanceRecord {
        DanceRecord {
            id: 0,
            start_time: start,
            end_time: start + Duration::seconds(seconds as i64),
            duration_seconds: seconds,
            cost,
            pricing_rule_name: "4 min ¥20".into(),
            pricing_rule_id: Some(1),
        }
    }

    #[test]
    fn seeds_presets_once() {
        let db = Database::open_memory().unwrap();
        assert_eq!(db.seed_default_rules().unwrap(), 3);
        assert_eq!(db.seed_default_rules().unwrap(), 0);

        let rules = db.list_rules().unwrap();
        assert_eq!(rules.len(), 3);
        let default = db.default_rule_with_tiers().unwrap().unwrap();
        assert_eq!(default.name, "4 min ¥20");
        assert_eq!(default.tiers.len(), 1);
        assert_eq!(default.tiers[0].duration_minutes, 4.0);
    }

    #[test]
    fn rule_round_trip_keeps_tiers_sorted() {
        let db = Database::open_memory().unwrap();
        let mut input = PricingRule::new(
            "evening",
            vec![PriceTier::new(4.0, 20.0), PriceTier::new(3.5, 15.0)],
        );
        let id = db.insert_rule(&input).unwrap();
        let stored = db.rule_with_tiers(id).unwrap().unwrap();
        assert_eq!(stored.name, "evening");
        assert!(!stored.is_default);
        let durations: Vec<f64> = stored.tiers.iter().map(|t| t.duration_minutes).collect();
        assert_eq!(durations, vec![3.5, 4.0]);
        assert!(stored.tiers.iter().all(|t| t.rule_id == id));

        input.id = id;
        input.name = "late".into();
        input.tiers = vec![PriceTier::new(3.0, 10.0)];
        db.update_rule(&input).unwrap();
        let stored = db.rule_with_tiers(id).unwrap().unwrap();
        assert_eq!(stored.name, "late");
        assert_eq!(stored.tiers.len(), 1);
    }

    #[test]
    fn invalid_rule_is_rejected() {
        let db = Database::open_memory().unwrap();
        let err = db.insert_rule(&PricingRule::new("empty", vec![])).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Validation(_)));
        assert!(db.list_rules().unwrap().is_empty());
    }

    #[test]
    fn set_as_default_is_exclusive() {
        let db = Database::open_memory().unwrap();
        db.seed_default_rules().unwrap();
        let id = db.insert_rule(&rule("new", 2.0, 8.0)).unwrap();
        db.set_as_default(id).unwrap();

        let defaults: Vec<_> = db.list_rules().unwrap().into_iter().filter(|r| r.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, id);
    }

    #[test]
    fn set_as_default_unknown_rule_keeps_old_default() {
        let db = Database::open_memory().unwrap();
        db.seed_default_rules().unwrap();
        assert!(db.set_as_default(999).is_err());
        assert_eq!(db.default_rule_with_tiers().unwrap().unwrap().name, "4 min ¥20");
    }

    #[test]
    fn inserting_a_default_rule_moves_the_flag() {
        let db = Database::open_memory().unwrap();
        db.seed_default_rules().unwrap();
        let mut new_default = rule("house", 5.0, 25.0);
        new_default.is_default = true;
        let id = db.insert_rule(&new_default).unwrap();
        assert_eq!(db.default_rule_with_tiers().unwrap().unwrap().id, id);
    }

    #[test]
    fn deleting_rule_cascades_tiers_and_keeps_history() {
        let db = Database::open_memory().unwrap();
        let id = db.insert_rule(&rule("gone", 4.0, 20.0)).unwrap();
        let tier_id = db.add_tier(id, &PriceTier::new(8.0, 35.0)).unwrap();
        assert!(tier_id > 0);
        let mut record = record_at(Utc::now(), 300, 20.0);
        record.pricing_rule_id = Some(id);
        db.insert_record(&record).unwrap();

        db.delete_rule(id).unwrap();
        assert!(db.rule_with_tiers(id).unwrap().is_none());
        let count: i64 = db
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM price_tiers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(db.total_count().unwrap(), 1);
        assert!(matches!(
            db.delete_rule(id),
            Err(crate::error::CoreError::Database(DatabaseError::NotFound { .. }))
        ));
    }

    #[test]
    fn tier_edits() {
        let db = Database::open_memory().unwrap();
        let id = db.insert_rule(&rule("r", 4.0, 20.0)).unwrap();
        let tier_id = db.add_tier(id, &PriceTier::new(2.0, 12.0)).unwrap();
        assert_eq!(db.rule_with_tiers(id).unwrap().unwrap().tiers[0].duration_minutes, 2.0);
        db.delete_tier(tier_id).unwrap();
        assert_eq!(db.rule_with_tiers(id).unwrap().unwrap().tiers.len(), 1);
        assert!(db.add_tier(id, &PriceTier::new(0.0, 1.0)).is_err());
        assert!(db.add_tier(999, &PriceTier::new(1.0, 1.0)).is_err());
    }

    #[test]
    fn appended_tiers_get_distinct_sort_orders() {
        let db = Database::open_memory().unwrap();
        let id = db
            .insert_rule(&PricingRule::new(
                "two",
                vec![PriceTier::new(4.0, 20.0), PriceTier::new(6.0, 28.0)],
            ))
            .unwrap();
        db.add_tier(id, &PriceTier::new(8.0, 35.0)).unwrap();
        db.add_tier(id, &PriceTier::new(10.0, 40.0)).unwrap();

        let mut orders: Vec<i32> = db
            .rule_with_tiers(id)
            .unwrap()
            .unwrap()
            .tiers
            .iter()
            .map(|t| t.sort_order)
            .collect();
        orders.sort();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn records_round_trip() {
        let db = Database::open_memory().unwrap();
        let start = Utc.with_ymd_and_hms(2026, 3, 14, 20, 0, 0).unwrap();
        let id = db.insert_record(&record_at(start, 269, 20.0)).unwrap();
        let stored = db.record(id).unwrap().unwrap();
        assert_eq!(stored.id, id);
        assert_eq!(stored.start_time, start);
        assert_eq!(stored.duration_seconds, 269);
        assert_eq!(stored.cost, 20.0);
        assert_eq!(stored.pricing_rule_id, Some(1));
        assert!(db.record(id + 1).unwrap().is_none());
    }

    #[test]
    fn ranges_are_half_open() {
        let db = Database::open_memory().unwrap();
        let base = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        db.insert_record(&record_at(base - Duration::milliseconds(1), 60, 5.0)).unwrap();
        db.insert_record(&record_at(base, 60, 10.0)).unwrap();
        db.insert_record(&record_at(base + Duration::hours(23), 60, 20.0)).unwrap();
        db.insert_record(&record_at(base + Duration::days(1), 60, 40.0)).unwrap();

        let end = base + Duration::days(1);
        assert_eq!(db.cost_in_range(base, end).unwrap(), 30.0);
        let records = db.records_in_range(base, end).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].start_time > records[1].start_time);
    }

    #[test]
    fn summary_groups_by_local_calendar() {
        let db = Database::open_memory().unwrap();
        let now = Local::now();
        let now_utc = now.with_timezone(&Utc);
        db.insert_record(&record_at(now_utc, 60, 10.0)).unwrap();
        db.insert_record(&record_at(now_utc - Duration::days(400), 60, 99.0)).unwrap();

        let summary = db.history_summary(now).unwrap();
        assert_eq!(summary.today_cost, 10.0);
        assert!(summary.week_cost >= 10.0);
        assert!(summary.month_cost >= 10.0);
        assert_eq!(summary.total_count, 2);
    }

    #[test]
    fn list_and_delete_records() {
        let db = Database::open_memory().unwrap();
        let start = Utc::now();
        let first = db.insert_record(&record_at(start, 60, 5.0)).unwrap();
        db.insert_record(&record_at(start + Duration::minutes(5), 60, 5.0)).unwrap();
        db.insert_record(&record_at(start + Duration::minutes(10), 60, 5.0)).unwrap();

        let latest = db.list_records(2).unwrap();
        assert_eq!(latest.len(), 2);
        assert!(latest[0].start_time > latest[1].start_time);

        db.delete_record(first).unwrap();
        assert!(db.delete_record(first).is_err());
        assert_eq!(db.delete_all_records().unwrap(), 2);
        assert_eq!(db.total_count().unwrap(), 0);
    }

    #[test]
    fn open_at_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let db = Database::open_at(&path).unwrap();
            db.seed_default_rules().unwrap();
        }
        let reopened = Database::open_at(&path).unwrap();
        assert_eq!(reopened.list_rules().unwrap().len(), 3);
    }
}
