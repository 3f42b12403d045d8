//! SQLite-backed persistence.
//!
//! One database file holds everything durable:
//! - accounts and their password hashes
//! - server-side session tokens (digests only)
//! - per-user progress counters and the current garden
//!
//! Progress writes are transactional: the counters row and the plant rows
//! for a user change together or not at all.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{CoreError, DatabaseError};
use crate::progress::{Plant, PlantKind, ProgressState, ProgressStore, UserId};

use super::data_dir;

/// SQLite database. The connection sits behind a mutex so the handle is
/// shareable across threads; per-user write ordering is the progress
/// engine's job, not this layer's.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/verdant/verdant.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("verdant.db");
        Self::open_at(&path)
    }

    /// Open a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(path),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    #[cfg(test)]
    pub fn open_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(|source| DatabaseError::OpenFailed {
            path: PathBuf::from(":memory:"),
            source,
        })?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;

            CREATE TABLE IF NOT EXISTS users (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                username      TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at    TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                token_digest TEXT PRIMARY KEY,
                user_id      INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at   TEXT NOT NULL,
                expires_at   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS progress (
                user_id         INTEGER PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                level           INTEGER NOT NULL DEFAULT 1,
                completed       INTEGER NOT NULL DEFAULT 0,
                total_completed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS plants (
                id      INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                level   INTEGER NOT NULL,
                kind    TEXT NOT NULL,
                x       REAL NOT NULL,
                y       REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_plants_user ON plants(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id);",
        )
        .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    // ── Accounts ─────────────────────────────────────────────────────

    /// Insert a new user; the returned rowid is the user's stable identity.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<UserId, DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![username, password_hash, Utc::now().to_rfc3339()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Look up a user and their password hash by username.
    pub fn user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<(UserId, String)>, DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.query_row(
            "SELECT id, password_hash FROM users WHERE username = ?1",
            params![username],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn username(&self, user: UserId) -> Result<Option<String>, DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.query_row(
            "SELECT username FROM users WHERE id = ?1",
            params![user],
            |row| row.get(0),
        )
        .optional()
        .map_err(Into::into)
    }

    // ── Sessions ─────────────────────────────────────────────────────

    pub fn insert_session(
        &self,
        token_digest: &str,
        user: UserId,
        expires_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute(
            "INSERT INTO sessions (token_digest, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                token_digest,
                user,
                Utc::now().to_rfc3339(),
                expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Resolve a session digest to its user and expiry.
    pub fn session(
        &self,
        token_digest: &str,
    ) -> Result<Option<(UserId, DateTime<Utc>)>, DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        let row = conn
            .query_row(
                "SELECT user_id, expires_at FROM sessions WHERE token_digest = ?1",
                params![token_digest],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((user, expires)) => {
                let expires = DateTime::parse_from_rfc3339(&expires)
                    .map_err(|e| DatabaseError::QueryFailed(format!("bad expires_at: {e}")))?
                    .with_timezone(&Utc);
                Ok(Some((user, expires)))
            }
        }
    }

    pub fn delete_session(&self, token_digest: &str) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        conn.execute(
            "DELETE FROM sessions WHERE token_digest = ?1",
            params![token_digest],
        )?;
        Ok(())
    }
}

fn kind_str(kind: PlantKind) -> &'static str {
    match kind {
        PlantKind::Potato => "potato",
        PlantKind::Berry => "berry",
        PlantKind::Sunflower => "sunflower",
        PlantKind::Dandelion => "dandelion",
        PlantKind::Rose => "rose",
    }
}

fn parse_kind(s: &str) -> Result<PlantKind, DatabaseError> {
    match s {
        "potato" => Ok(PlantKind::Potato),
        "berry" => Ok(PlantKind::Berry),
        "sunflower" => Ok(PlantKind::Sunflower),
        "dandelion" => Ok(PlantKind::Dandelion),
        "rose" => Ok(PlantKind::Rose),
        other => Err(DatabaseError::QueryFailed(format!(
            "unknown plant kind '{other}'"
        ))),
    }
}

impl ProgressStore for Database {
    fn user_exists(&self, user: UserId) -> Result<bool, DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        let found = conn
            .query_row("SELECT 1 FROM users WHERE id = ?1", params![user], |_| {
                Ok(())
            })
            .optional()?;
        Ok(found.is_some())
    }

    fn load(&self, user: UserId) -> Result<Option<ProgressState>, DatabaseError> {
        let conn = self.conn.lock().expect("lock poisoned");
        let counters = conn
            .query_row(
                "SELECT level, completed, total_completed FROM progress WHERE user_id = ?1",
                params![user],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u64>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((level, completed_in_level, total_completed)) = counters else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT kind, x, y FROM plants WHERE user_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![user], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })?;

        let mut plants = Vec::new();
        for row in rows {
            let (kind, x, y) = row?;
            plants.push(Plant {
                kind: parse_kind(&kind)?,
                x,
                y,
            });
        }

        Ok(Some(ProgressState {
            level,
            completed_in_level,
            total_completed,
            plants,
        }))
    }

    fn save(&self, user: UserId, state: &ProgressState) -> Result<(), DatabaseError> {
        let mut conn = self.conn.lock().expect("lock poisoned");
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO progress (user_id, level, completed, total_completed)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                 level = excluded.level,
                 completed = excluded.completed,
                 total_completed = excluded.total_completed",
            params![user, state.level, state.completed_in_level, state.total_completed],
        )?;

        tx.execute("DELETE FROM plants WHERE user_id = ?1", params![user])?;
        for plant in &state.plants {
            tx.execute(
                "INSERT INTO plants (user_id, level, kind, x, y) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user, state.level, kind_str(plant.kind), plant.x, plant.y],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}
