//! SQLite-backed replay store.
//!
//! Two tables: `replays` holds one row per cached demo file with the full
//! record as JSON plus the columns queries filter on, and `replay_errors`
//! holds the tombstones of files that failed to decode. A file name is in
//! at most one of the two.

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use sdfz_demo::{GameId, ReplayRecord};

use crate::error::StoreError;

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS replays (\
    file_name TEXT PRIMARY KEY,\
    game_id TEXT NOT NULL,\
    engine_version TEXT NOT NULL,\
    game_version TEXT NOT NULL,\
    map_spring_name TEXT NOT NULL,\
    start_time TEXT NOT NULL,\
    duration_ms INTEGER NOT NULL,\
    ended_normally INTEGER NOT NULL,\
    record TEXT NOT NULL\
);\
CREATE INDEX IF NOT EXISTS replays_game_id ON replays(game_id);\
CREATE TABLE IF NOT EXISTS replay_errors (\
    file_name TEXT PRIMARY KEY\
);";

/// Persistent replay cache. Owned by a single writer.
pub struct ReplayStore {
    conn: Connection,
}

impl std::fmt::Debug for ReplayStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayStore")
            .field("path", &self.conn.path())
            .finish()
    }
}

fn decode(json: String) -> Result<ReplayRecord, StoreError> {
    Ok(serde_json::from_str(&json)?)
}

impl ReplayStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        Self::init(conn)
    }

    /// A store that lives only as long as the value.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert or replace the row for `record.file_name` and drop any
    /// tombstone for that file, atomically.
    pub fn upsert(&mut self, record: &ReplayRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(record)?;
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO replays (file_name, game_id, engine_version, game_version, \
             map_spring_name, start_time, duration_ms, ended_normally, record) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9) \
             ON CONFLICT(file_name) DO UPDATE SET \
             game_id = excluded.game_id, engine_version = excluded.engine_version, \
             game_version = excluded.game_version, map_spring_name = excluded.map_spring_name, \
             start_time = excluded.start_time, duration_ms = excluded.duration_ms, \
             ended_normally = excluded.ended_normally, record = excluded.record",
            params![
                record.file_name,
                record.game_id.to_hex(),
                record.engine_version,
                record.game_version,
                record.map_spring_name,
                record.start_time.to_rfc3339(),
                i64::try_from(record.duration_ms).unwrap_or(i64::MAX),
                record.ended_normally,
                json,
            ],
        )?;
        tx.execute(
            "DELETE FROM replay_errors WHERE file_name = ?1",
            params![record.file_name],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Tombstone `file_name` and drop any cached row for it.
    ///
    /// Returns whether the tombstone is new.
    pub fn mark_error(&mut self, file_name: &str) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO replay_errors (file_name) VALUES (?1)",
            params![file_name],
        )?;
        tx.execute("DELETE FROM replays WHERE file_name = ?1", params![file_name])?;
        tx.commit()?;
        Ok(inserted > 0)
    }

    /// The cached record of `file_name`.
    pub fn get_by_file_name(&self, file_name: &str) -> Result<Option<ReplayRecord>, StoreError> {
        self.conn
            .query_row(
                "SELECT record FROM replays WHERE file_name = ?1",
                params![file_name],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .map(decode)
            .transpose()
    }

    /// Every cached capture of one match, by file name.
    pub fn get_by_game_id(&self, game_id: &GameId) -> Result<Vec<ReplayRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT record FROM replays WHERE game_id = ?1 ORDER BY file_name")?;
        let rows = stmt.query_map(params![game_id.to_hex()], |row| row.get::<_, String>(0))?;
        rows.map(|json| decode(json?)).collect()
    }

    /// All cached records, oldest match first.
    pub fn all(&self) -> Result<Vec<ReplayRecord>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT record FROM replays ORDER BY start_time, file_name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.map(|json| decode(json?)).collect()
    }

    /// Delete the cached row of `file_name`. Returns whether one existed.
    pub fn delete(&mut self, file_name: &str) -> Result<bool, StoreError> {
        let n = self
            .conn
            .execute("DELETE FROM replays WHERE file_name = ?1", params![file_name])?;
        Ok(n > 0)
    }

    /// Drop everything known about `file_name`: its row and its
    /// tombstone. Returns whether a cached row existed.
    pub fn forget(&mut self, file_name: &str) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        let n = tx.execute("DELETE FROM replays WHERE file_name = ?1", params![file_name])?;
        tx.execute(
            "DELETE FROM replay_errors WHERE file_name = ?1",
            params![file_name],
        )?;
        tx.commit()?;
        Ok(n > 0)
    }

    fn count_of(&self, sql: &str) -> Result<u64, StoreError> {
        let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n.max(0) as u64)
    }

    /// Number of cached records.
    pub fn count(&self) -> Result<u64, StoreError> {
        self.count_of("SELECT COUNT(*) FROM replays")
    }

    /// Number of tombstones.
    pub fn error_count(&self) -> Result<u64, StoreError> {
        self.count_of("SELECT COUNT(*) FROM replay_errors")
    }

    /// Whether `file_name` is tombstoned.
    pub fn is_errored(&self, file_name: &str) -> Result<bool, StoreError> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM replay_errors WHERE file_name = ?1)",
            params![file_name],
            |row| row.get(0),
        )?)
    }

    /// Whether `file_name` is cached or tombstoned.
    pub fn is_known(&self, file_name: &str) -> Result<bool, StoreError> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM replays WHERE file_name = ?1) \
             OR EXISTS(SELECT 1 FROM replay_errors WHERE file_name = ?1)",
            params![file_name],
            |row| row.get(0),
        )?)
    }

    /// Whether `file_name` is cached from a demo that was not finalized.
    pub fn is_unfinished(&self, file_name: &str) -> Result<bool, StoreError> {
        Ok(self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM replays WHERE file_name = ?1 AND ended_normally = 0)",
            params![file_name],
            |row| row.get(0),
        )?)
    }

    /// Names of cached and tombstoned files.
    pub fn known_file_names(&self) -> Result<BTreeSet<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_name FROM replays UNION SELECT file_name FROM replay_errors")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Names of cached files, sorted.
    pub fn cached_file_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT file_name FROM replays ORDER BY file_name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<_, _>>()?)
    }

    /// Drop every tombstone so failed files are retried. Returns how many
    /// were dropped.
    pub fn clear_errors(&mut self) -> Result<u64, StoreError> {
        Ok(self.conn.execute("DELETE FROM replay_errors", [])? as u64)
    }

    /// Drop every row and tombstone.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.conn
            .execute_batch("DELETE FROM replays; DELETE FROM replay_errors;")?;
        Ok(())
    }
}
