//! Received-message ledger — the latest acknowledging message per
//! (notification, member).
//!
//! Absence of a row means "has not acknowledged"; the ledger keeps no
//! history, only the most recent message identifier and timestamp.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use spacebot_core::error::{Result, SpacebotError};

use crate::Store;

/// The recorded acknowledgment of one member for one notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceivedMessage {
    pub id: i64,
    pub notification_id: i64,
    pub member_id: i64,
    /// Platform identifier of the latest acknowledging message.
    pub message_id: String,
    pub received_at: DateTime<Utc>,
}

impl Store {
    /// Look up the acknowledgment row for (notification, member).
    pub fn find_received_message(
        &self,
        notification_id: i64,
        member_id: i64,
    ) -> Result<Option<ReceivedMessage>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, notification_id, member_id, message_id, received_at
                 FROM received_messages WHERE notification_id = ?1 AND member_id = ?2",
            )
            .map_err(|e| SpacebotError::Storage(format!("Find received message: {e}")))?;
        let row = stmt
            .query_row(params![notification_id, member_id], |row| {
                let received_at: String = row.get(4)?;
                Ok(ReceivedMessage {
                    id: row.get(0)?,
                    notification_id: row.get(1)?,
                    member_id: row.get(2)?,
                    message_id: row.get(3)?,
                    received_at: DateTime::parse_from_rfc3339(&received_at)
                        .map(|d| d.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                })
            })
            .ok();
        Ok(row)
    }

    /// Record an acknowledgment: insert when absent, otherwise replace the
    /// stored message identifier and timestamp in place. The unique pair
    /// key keeps this to one row no matter how the calls race.
    pub fn record_received_message(
        &self,
        notification_id: i64,
        member_id: i64,
        message_id: &str,
        received_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO received_messages (notification_id, member_id, message_id, received_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (notification_id, member_id)
             DO UPDATE SET message_id = excluded.message_id,
                           received_at = excluded.received_at",
            params![
                notification_id,
                member_id,
                message_id,
                received_at.to_rfc3339()
            ],
        )
        .map_err(|e| SpacebotError::Storage(format!("Record received message: {e}")))?;
        Ok(())
    }

    /// Members of a notification whose acknowledgment falls at or after
    /// `since` — the reminder tick subtracts these from the tagged set.
    pub fn acknowledged_member_ids(
        &self,
        notification_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<i64>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT member_id FROM received_messages
                 WHERE notification_id = ?1 AND received_at >= ?2",
            )
            .map_err(|e| SpacebotError::Storage(format!("Acknowledged members: {e}")))?;
        let rows = stmt
            .query_map(params![notification_id, since.to_rfc3339()], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(|e| SpacebotError::Storage(format!("Acknowledged members: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Count of ledger rows, used by tests asserting "no mutation".
    pub fn received_message_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row("SELECT COUNT(*) FROM received_messages", [], |r| r.get(0))
            .map_err(|e| SpacebotError::Storage(format!("Count received messages: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spacebot_core::types::NotificationKind;

    fn seeded() -> (Store, i64, i64) {
        let store = Store::open_in_memory().unwrap();
        let space = store.add_space("spaces/s1", "Team").unwrap();
        let n = store
            .add_notification(space.id, NotificationKind::Reminder, "0 9 * * *", "standup")
            .unwrap();
        let m = store.add_member("users/1", "Alice", None, None).unwrap();
        (store, n.id, m.id)
    }

    #[test]
    fn test_second_acknowledgment_updates_in_place() {
        let (store, n, m) = seeded();

        store
            .record_received_message(n, m, "messages/m1", Utc::now())
            .unwrap();
        store
            .record_received_message(n, m, "messages/m2", Utc::now())
            .unwrap();

        assert_eq!(store.received_message_count().unwrap(), 1);
        let row = store.find_received_message(n, m).unwrap().unwrap();
        assert_eq!(row.message_id, "messages/m2");
    }

    #[test]
    fn test_acknowledged_since_window() {
        let (store, n, m) = seeded();
        let before = Utc::now() - chrono::Duration::hours(2);
        store.record_received_message(n, m, "messages/m1", before).unwrap();

        let cutoff = Utc::now() - chrono::Duration::hours(1);
        assert!(store.acknowledged_member_ids(n, cutoff).unwrap().is_empty());

        store.record_received_message(n, m, "messages/m2", Utc::now()).unwrap();
        assert_eq!(store.acknowledged_member_ids(n, cutoff).unwrap(), vec![m]);
    }
}
