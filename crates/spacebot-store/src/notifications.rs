//! Notification registry — configured notifications and their tagged
//! member sets.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use spacebot_core::error::{Result, SpacebotError};
use spacebot_core::types::NotificationKind;

use crate::directory::Member;
use crate::Store;

/// A configured recurring notification, tied to a space and (once one
/// exists) a message thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub space_id: i64,
    pub kind: NotificationKind,
    /// 5-field cron expression.
    pub schedule: String,
    /// Announcement text delivered on each tick.
    pub message: String,
    /// Platform thread the notification lives in; bound on first delivery.
    pub thread_id: Option<String>,
}

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get(0)?,
        space_id: row.get(1)?,
        kind: NotificationKind::from_tag(&row.get::<_, String>(2)?),
        schedule: row.get(3)?,
        message: row.get(4)?,
        thread_id: row.get(5)?,
    })
}

const NOTIFICATION_COLS: &str = "id, space_id, kind, schedule, message, thread_id";

impl Store {
    /// Create a notification for a space.
    pub fn add_notification(
        &self,
        space_id: i64,
        kind: NotificationKind,
        schedule: &str,
        message: &str,
    ) -> Result<Notification> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO notifications (space_id, kind, schedule, message) VALUES (?1, ?2, ?3, ?4)",
            params![space_id, kind.as_str(), schedule, message],
        )
        .map_err(|e| SpacebotError::Storage(format!("Add notification: {e}")))?;
        Ok(Notification {
            id: conn.last_insert_rowid(),
            space_id,
            kind,
            schedule: schedule.to_string(),
            message: message.to_string(),
            thread_id: None,
        })
    }

    /// All notifications configured for a space.
    pub fn notifications_by_space(&self, space_id: i64) -> Result<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NOTIFICATION_COLS} FROM notifications WHERE space_id = ?1 ORDER BY id"
            ))
            .map_err(|e| SpacebotError::Storage(format!("List notifications: {e}")))?;
        let rows = stmt
            .query_map(params![space_id], row_to_notification)
            .map_err(|e| SpacebotError::Storage(format!("List notifications: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// All notifications across all spaces (admin listing).
    pub fn all_notifications(&self) -> Result<Vec<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NOTIFICATION_COLS} FROM notifications ORDER BY id"
            ))
            .map_err(|e| SpacebotError::Storage(format!("List notifications: {e}")))?;
        let rows = stmt
            .query_map([], row_to_notification)
            .map_err(|e| SpacebotError::Storage(format!("List notifications: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Resolve a message thread to the notification bound to it. Most
    /// threads belong to no tracked notification; that is a None, not an
    /// error.
    pub fn notification_by_thread(&self, thread_id: &str) -> Result<Option<Notification>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NOTIFICATION_COLS} FROM notifications WHERE thread_id = ?1"
            ))
            .map_err(|e| SpacebotError::Storage(format!("Find notification: {e}")))?;
        let notification = stmt.query_row(params![thread_id], row_to_notification).ok();
        Ok(notification)
    }

    /// Bind a notification to the thread its messages land in.
    pub fn bind_thread(&self, notification_id: i64, thread_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE notifications SET thread_id = ?1 WHERE id = ?2",
            params![thread_id, notification_id],
        )
        .map_err(|e| SpacebotError::Storage(format!("Bind thread: {e}")))?;
        Ok(())
    }

    // ─── Tagged members ──────────────────────────────────────

    /// Tag a member as expected to acknowledge a notification.
    pub fn tag_member(&self, notification_id: i64, member_id: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO tagged_members (notification_id, member_id) VALUES (?1, ?2)",
            params![notification_id, member_id],
        )
        .map_err(|e| SpacebotError::Storage(format!("Tag member: {e}")))?;
        Ok(())
    }

    /// The members a notification tracks for acknowledgment.
    pub fn tagged_members(&self, notification_id: i64) -> Result<Vec<Member>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT m.id, m.name, m.display_name, m.email, m.image_url
                 FROM tagged_members t JOIN members m ON m.id = t.member_id
                 WHERE t.notification_id = ?1 ORDER BY m.id",
            )
            .map_err(|e| SpacebotError::Storage(format!("Tagged members: {e}")))?;
        let rows = stmt
            .query_map(params![notification_id], |row| {
                Ok(Member {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    display_name: row.get(2)?,
                    email: row.get(3)?,
                    image_url: row.get(4)?,
                })
            })
            .map_err(|e| SpacebotError::Storage(format!("Tagged members: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}
