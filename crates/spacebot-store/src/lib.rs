//! # Spacebot Store
//!
//! SQLite persistence behind the bot's three lookup surfaces:
//! - member/space directory (spaces, members, memberships)
//! - notification registry (notifications, tagged members)
//! - received-message ledger (one acknowledgment row per (notification, member))
//!
//! One connection behind a mutex, WAL mode. Every operation is a single
//! keyed read or a keyed upsert; the unique constraint on
//! `received_messages(notification_id, member_id)` is the serialization
//! point for concurrent acknowledgments.

pub mod directory;
pub mod ledger;
pub mod notifications;

pub use directory::{Member, Space};
pub use ledger::ReceivedMessage;
pub use notifications::Notification;

use rusqlite::Connection;
use spacebot_core::error::{Result, SpacebotError};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Persistent store shared by the scheduler and the event correlator.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .map_err(|e| SpacebotError::Storage(format!("DB open: {e}")))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .ok();
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SpacebotError::Storage(format!("DB open: {e}")))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;").ok();
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SpacebotError::Storage(format!("Lock: {e}")))
    }

    /// Run schema migrations.
    fn migrate(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS spaces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL DEFAULT '',
                is_enabled INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS members (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                display_name TEXT NOT NULL DEFAULT '',
                email TEXT,
                image_url TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS memberships (
                space_id INTEGER NOT NULL,
                member_id INTEGER NOT NULL,
                role TEXT NOT NULL DEFAULT 'MEMBER',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (space_id, member_id),
                FOREIGN KEY (space_id) REFERENCES spaces(id) ON DELETE CASCADE,
                FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                space_id INTEGER NOT NULL,
                kind TEXT NOT NULL DEFAULT 'NORMAL',
                schedule TEXT NOT NULL,
                message TEXT NOT NULL DEFAULT '',
                thread_id TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                FOREIGN KEY (space_id) REFERENCES spaces(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS tagged_members (
                notification_id INTEGER NOT NULL,
                member_id INTEGER NOT NULL,
                PRIMARY KEY (notification_id, member_id),
                FOREIGN KEY (notification_id) REFERENCES notifications(id) ON DELETE CASCADE,
                FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE CASCADE
            );

            -- The UNIQUE pair key makes the acknowledgment upsert atomic:
            -- two near-simultaneous acknowledgments cannot produce two rows.
            CREATE TABLE IF NOT EXISTS received_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                notification_id INTEGER NOT NULL,
                member_id INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                received_at TEXT NOT NULL,
                UNIQUE (notification_id, member_id),
                FOREIGN KEY (notification_id) REFERENCES notifications(id) ON DELETE CASCADE,
                FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE CASCADE
            );
            ",
        )
        .map_err(|e| SpacebotError::Storage(format!("Migration: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_is_idempotent() {
        let dir = std::env::temp_dir().join("spacebot-store-migrate-test");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("test.db");
        {
            let store = Store::open(&path).unwrap();
            store.add_space("spaces/s1", "Team").unwrap();
        }
        let store = Store::open(&path).unwrap();
        assert!(store.find_space_by_name("spaces/s1").unwrap().is_some());
        std::fs::remove_dir_all(&dir).ok();
    }
}
