//! Database repository layer
//!
//! Provides the SQLite-backed implementation of the [`MetricsQuery`] and
//! [`SnapshotStore`] capabilities, plus the write operations the bot-facing
//! side of the application uses to record activity.

use crate::error::Result;
use crate::store::{
    AliasEventKind, EventCollection, EventFilter, MetricsQuery, SnapshotStore,
};
use crate::types::Snapshot;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Database handle (single connection behind a mutex)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // WAL mode so the snapshot job can run beside the bot's writers
        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    // ============================================
    // Write operations (bot-facing)
    // ============================================

    /// Set a lifetime counter to an absolute value
    pub fn set_counter(&self, key: &str, value: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO counters (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Record that a user ran a command at `at`
    pub fn touch_user_activity(&self, user_id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO user_activity (user_id, last_command_time) VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET last_command_time = excluded.last_command_time
            "#,
            params![user_id, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Record that a command was run in a guild at `at`
    pub fn touch_guild_activity(&self, guild_id: &str, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO guild_activity (guild_id, last_command_time) VALUES (?1, ?2)
            ON CONFLICT(guild_id) DO UPDATE SET last_command_time = excluded.last_command_time
            "#,
            params![guild_id, at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Record one alias/snippet invocation
    pub fn record_alias_event(&self, kind: AliasEventKind, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO alias_events (type, timestamp) VALUES (?1, ?2)",
            params![kind.as_str(), at.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Insert or update a character record
    pub fn upsert_character(&self, id: &str, owner_id: &str, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO characters (id, owner_id, name, created_at) VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET owner_id = excluded.owner_id, name = excluded.name
            "#,
            params![id, owner_id, name, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Set the lifetime invocation count for one command
    pub fn set_command_invocations(&self, name: &str, num_invocations: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO command_activity (name, num_invocations) VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET num_invocations = excluded.num_invocations
            "#,
            params![name, num_invocations],
        )?;
        Ok(())
    }
}

// ============================================
// Metrics query capability
// ============================================

impl MetricsQuery for Database {
    fn count(&self, collection: EventCollection, filter: &EventFilter) -> Result<i64> {
        let conn = self.conn.lock().unwrap();

        let ts_col = collection.timestamp_column();
        let mut sql = format!("SELECT COUNT(*) FROM {} WHERE 1=1", collection.table());
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![];

        if let Some(kind) = filter.kind {
            sql.push_str(" AND type = ?");
            params.push(Box::new(kind.as_str().to_string()));
        }

        if let Some(after) = filter.after {
            sql.push_str(&format!(" AND {} > ?", ts_col));
            params.push(Box::new(after.to_rfc3339()));
        }

        if let Some(through) = filter.through {
            sql.push_str(&format!(" AND {} <= ?", ts_col));
            params.push(Box::new(through.to_rfc3339()));
        }

        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn.query_row(&sql, params_refs.as_slice(), |r| r.get(0))?;
        Ok(count)
    }

    fn counter_value(&self, key: &str) -> Result<Option<i64>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row("SELECT value FROM counters WHERE key = ?", [key], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn estimated_character_count(&self) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        // MAX(rowid) is an O(1) estimate that ignores deletions, standing in
        // for the source's estimated document count. It must stay a fast
        // approximation; an exact COUNT(*) here would change the contract.
        let count: i64 = conn.query_row(
            "SELECT COALESCE(MAX(rowid), 0) FROM characters",
            [],
            |r| r.get(0),
        )?;
        Ok(count)
    }

    fn command_invocations(&self) -> Result<BTreeMap<String, i64>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT name, num_invocations FROM command_activity")?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        Ok(rows)
    }
}

// ============================================
// Snapshot store capability
// ============================================

impl SnapshotStore for Database {
    fn insert(&self, snapshot: &Snapshot) -> Result<()> {
        let data = serde_json::to_string(snapshot)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO daily_snapshots (timestamp, data) VALUES (?1, ?2)",
            params![snapshot.timestamp.to_rfc3339(), data],
        )?;
        Ok(())
    }

    fn most_recent_before_or_at(&self, instant: DateTime<Utc>) -> Result<Option<Snapshot>> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                r#"
                SELECT data FROM daily_snapshots
                WHERE timestamp <= ?1
                ORDER BY timestamp DESC
                LIMIT 1
                "#,
                [instant.to_rfc3339()],
                |r| r.get(0),
            )
            .optional()?;

        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    fn delete_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<u64> {
        let conn = self.conn.lock().unwrap();
        let removed = conn.execute(
            "DELETE FROM daily_snapshots WHERE timestamp >= ?1 AND timestamp <= ?2",
            params![start.to_rfc3339(), end.to_rfc3339()],
        )?;
        Ok(removed as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CallStats, ToDateTotals, WindowCounts};
    use chrono::TimeZone;

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn snapshot_at(timestamp: DateTime<Utc>, num_commands: i64) -> Snapshot {
        Snapshot {
            timestamp,
            num_commands,
            num_characters: 0,
            num_active_users: WindowCounts::default(),
            num_active_guilds: WindowCounts::default(),
            num_alias_calls: CallStats::default(),
            num_servalias_calls: CallStats::default(),
            num_snippet_calls: CallStats::default(),
            num_servsnippet_calls: CallStats::default(),
            num_workshop_alias_calls: CallStats::default(),
            num_workshop_servalias_calls: CallStats::default(),
            num_workshop_snippet_calls: CallStats::default(),
            num_workshop_servsnippet_calls: CallStats::default(),
            command_activity: None,
            to_date: ToDateTotals::default(),
        }
    }

    #[test]
    fn test_counter_absent_is_none() {
        let db = test_db();
        assert_eq!(db.counter_value("commands_used_life").unwrap(), None);

        db.set_counter("commands_used_life", 137).unwrap();
        assert_eq!(db.counter_value("commands_used_life").unwrap(), Some(137));
    }

    #[test]
    fn test_count_alias_events_by_kind_and_bounds() {
        let db = test_db();
        db.record_alias_event(AliasEventKind::Alias, at(1, 12)).unwrap();
        db.record_alias_event(AliasEventKind::Alias, at(2, 12)).unwrap();
        db.record_alias_event(AliasEventKind::Snippet, at(2, 12)).unwrap();

        let all_aliases = db
            .count(
                EventCollection::AliasEvents,
                &EventFilter {
                    kind: Some(AliasEventKind::Alias),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(all_aliases, 2);

        // Lower bound is exclusive, upper bound inclusive.
        let bounded = db
            .count(
                EventCollection::AliasEvents,
                &EventFilter {
                    kind: Some(AliasEventKind::Alias),
                    after: Some(at(1, 12)),
                    through: Some(at(2, 12)),
                },
            )
            .unwrap();
        assert_eq!(bounded, 1);
    }

    #[test]
    fn test_activity_upsert_keeps_one_row_per_user() {
        let db = test_db();
        db.touch_user_activity("u1", at(1, 0)).unwrap();
        db.touch_user_activity("u1", at(2, 0)).unwrap();

        let total = db
            .count(EventCollection::UserActivity, &EventFilter::default())
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_estimated_character_count() {
        let db = test_db();
        assert_eq!(db.estimated_character_count().unwrap(), 0);

        for i in 0..3 {
            db.upsert_character(&format!("c{i}"), "owner", "Char").unwrap();
        }
        assert_eq!(db.estimated_character_count().unwrap(), 3);
    }

    #[test]
    fn test_command_invocations_map() {
        let db = test_db();
        db.set_command_invocations("roll", 40).unwrap();
        db.set_command_invocations("attack", 2).unwrap();

        let map = db.command_invocations().unwrap();
        assert_eq!(map.get("roll"), Some(&40));
        assert_eq!(map.get("attack"), Some(&2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_most_recent_before_or_at() {
        let db = test_db();
        assert!(db.most_recent_before_or_at(at(9, 0)).unwrap().is_none());

        db.insert(&snapshot_at(at(1, 0), 1)).unwrap();
        db.insert(&snapshot_at(at(2, 0), 2)).unwrap();
        db.insert(&snapshot_at(at(3, 0), 3)).unwrap();

        // Descending-order retrieval: the latest at-or-before wins.
        let latest = db.most_recent_before_or_at(at(9, 0)).unwrap().unwrap();
        assert_eq!(latest.num_commands, 3);

        // An exactly-matching timestamp is included.
        let second = db.most_recent_before_or_at(at(2, 0)).unwrap().unwrap();
        assert_eq!(second.num_commands, 2);

        // Nothing at or before the earliest minus a tick.
        let before_all = db
            .most_recent_before_or_at(at(1, 0) - chrono::Duration::seconds(1))
            .unwrap();
        assert!(before_all.is_none());
    }

    #[test]
    fn test_delete_range_is_inclusive() {
        let db = test_db();
        for day in 1..=4 {
            db.insert(&snapshot_at(at(day, 0), day as i64)).unwrap();
        }

        let removed = db.delete_range(at(2, 0), at(3, 0)).unwrap();
        assert_eq!(removed, 2);

        let latest = db.most_recent_before_or_at(at(3, 12)).unwrap().unwrap();
        assert_eq!(latest.num_commands, 1);
        let newest = db.most_recent_before_or_at(at(9, 0)).unwrap().unwrap();
        assert_eq!(newest.num_commands, 4);
    }
}
