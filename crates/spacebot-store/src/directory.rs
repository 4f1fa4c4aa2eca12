//! Member/space directory — spaces, members, and membership rows.
//!
//! Lookups are keyed by the platform identifiers (`spaces.name`,
//! `members.name`); mutations are keyed inserts or in-place updates.

use rusqlite::params;
use serde::{Deserialize, Serialize};
use spacebot_core::error::{Result, SpacebotError};
use spacebot_core::types::MemberRole;

use crate::Store;

/// A chat space the bot participates in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    pub id: i64,
    /// Platform-assigned identifier, the stable external key.
    pub name: String,
    pub display_name: String,
    /// Flipped false on REMOVED_FROM_SPACE, true again on re-add.
    pub is_enabled: bool,
}

/// A known member. Contact fields stay null until an "update" command
/// supplies them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    /// Platform-assigned identifier, unique across spaces.
    pub name: String,
    pub display_name: String,
    pub email: Option<String>,
    pub image_url: Option<String>,
}

impl Member {
    /// Whether both contact fields are already known.
    pub fn has_contact_info(&self) -> bool {
        self.email.is_some() && self.image_url.is_some()
    }
}

impl Store {
    // ─── Spaces ──────────────────────────────────────

    /// Find a space by its platform identifier.
    pub fn find_space_by_name(&self, name: &str) -> Result<Option<Space>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT id, name, display_name, is_enabled FROM spaces WHERE name = ?1")
            .map_err(|e| SpacebotError::Storage(format!("Find space: {e}")))?;
        let space = stmt
            .query_row(params![name], |row| {
                Ok(Space {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    display_name: row.get(2)?,
                    is_enabled: row.get::<_, i64>(3)? != 0,
                })
            })
            .ok();
        Ok(space)
    }

    /// Create a space. New spaces start enabled.
    pub fn add_space(&self, name: &str, display_name: &str) -> Result<Space> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO spaces (name, display_name, is_enabled) VALUES (?1, ?2, 1)",
            params![name, display_name],
        )
        .map_err(|e| SpacebotError::Storage(format!("Add space: {e}")))?;
        Ok(Space {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            is_enabled: true,
        })
    }

    /// Enable or disable a space. History is kept either way.
    pub fn set_space_enabled(&self, space_id: i64, enabled: bool) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE spaces SET is_enabled = ?1 WHERE id = ?2",
            params![enabled as i64, space_id],
        )
        .map_err(|e| SpacebotError::Storage(format!("Update space status: {e}")))?;
        Ok(())
    }

    /// All currently enabled spaces, oldest first.
    pub fn enabled_spaces(&self) -> Result<Vec<Space>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, display_name, is_enabled FROM spaces
                 WHERE is_enabled = 1 ORDER BY id",
            )
            .map_err(|e| SpacebotError::Storage(format!("List spaces: {e}")))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Space {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    display_name: row.get(2)?,
                    is_enabled: row.get::<_, i64>(3)? != 0,
                })
            })
            .map_err(|e| SpacebotError::Storage(format!("List spaces: {e}")))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ─── Members ──────────────────────────────────────

    /// Find a member by its platform identifier.
    pub fn find_member_by_name(&self, name: &str) -> Result<Option<Member>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, name, display_name, email, image_url FROM members WHERE name = ?1",
            )
            .map_err(|e| SpacebotError::Storage(format!("Find member: {e}")))?;
        let member = stmt
            .query_row(params![name], |row| {
                Ok(Member {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    display_name: row.get(2)?,
                    email: row.get(3)?,
                    image_url: row.get(4)?,
                })
            })
            .ok();
        Ok(member)
    }

    /// Create a member. Contact fields may be unknown at first sighting.
    pub fn add_member(
        &self,
        name: &str,
        display_name: &str,
        email: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<Member> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO members (name, display_name, email, image_url) VALUES (?1, ?2, ?3, ?4)",
            params![name, display_name, email, image_url],
        )
        .map_err(|e| SpacebotError::Storage(format!("Add member: {e}")))?;
        Ok(Member {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            display_name: display_name.to_string(),
            email: email.map(str::to_string),
            image_url: image_url.map(str::to_string),
        })
    }

    /// Refresh the stored identifier/display-name binding of a known member.
    pub fn update_member_identity(
        &self,
        member_id: i64,
        name: &str,
        display_name: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE members SET name = ?1, display_name = ?2 WHERE id = ?3",
            params![name, display_name, member_id],
        )
        .map_err(|e| SpacebotError::Storage(format!("Update member: {e}")))?;
        Ok(())
    }

    /// Backfill both contact fields of a member.
    pub fn update_member_contact(
        &self,
        member_id: i64,
        email: Option<&str>,
        image_url: Option<&str>,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE members SET email = ?1, image_url = ?2 WHERE id = ?3",
            params![email, image_url, member_id],
        )
        .map_err(|e| SpacebotError::Storage(format!("Update member contact: {e}")))?;
        Ok(())
    }

    // ─── Memberships ──────────────────────────────────────

    /// Create or refresh the membership row for (space, member).
    pub fn upsert_membership(&self, space_id: i64, member_id: i64, role: MemberRole) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO memberships (space_id, member_id, role) VALUES (?1, ?2, ?3)
             ON CONFLICT (space_id, member_id) DO UPDATE SET role = excluded.role",
            params![space_id, member_id, role.as_str()],
        )
        .map_err(|e| SpacebotError::Storage(format!("Upsert membership: {e}")))?;
        Ok(())
    }

    /// Role of a member in a space, when a membership exists.
    pub fn membership_role(&self, space_id: i64, member_id: i64) -> Result<Option<MemberRole>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT role FROM memberships WHERE space_id = ?1 AND member_id = ?2")
            .map_err(|e| SpacebotError::Storage(format!("Find membership: {e}")))?;
        let role = stmt
            .query_row(params![space_id, member_id], |row| {
                row.get::<_, String>(0)
            })
            .ok();
        Ok(role.map(|r| MemberRole::from_tag(&r)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_disable_reenable_keeps_one_row() {
        let store = Store::open_in_memory().unwrap();
        let space = store.add_space("spaces/s1", "Team").unwrap();
        assert!(space.is_enabled);

        store.set_space_enabled(space.id, false).unwrap();
        let found = store.find_space_by_name("spaces/s1").unwrap().unwrap();
        assert!(!found.is_enabled);
        assert_eq!(found.id, space.id);

        store.set_space_enabled(space.id, true).unwrap();
        assert_eq!(store.enabled_spaces().unwrap().len(), 1);
    }

    #[test]
    fn test_member_contact_backfill() {
        let store = Store::open_in_memory().unwrap();
        let m = store.add_member("users/1", "Alice", None, None).unwrap();
        assert!(!m.has_contact_info());

        store
            .update_member_contact(m.id, Some("alice@x.vn"), Some("http://img"))
            .unwrap();
        let m = store.find_member_by_name("users/1").unwrap().unwrap();
        assert!(m.has_contact_info());
        assert_eq!(m.email.as_deref(), Some("alice@x.vn"));
    }

    #[test]
    fn test_membership_upsert_refreshes_role() {
        let store = Store::open_in_memory().unwrap();
        let space = store.add_space("spaces/s1", "Team").unwrap();
        let m = store.add_member("users/1", "Alice", None, None).unwrap();

        store
            .upsert_membership(space.id, m.id, MemberRole::Member)
            .unwrap();
        store
            .upsert_membership(space.id, m.id, MemberRole::Owner)
            .unwrap();

        assert_eq!(
            store.membership_role(space.id, m.id).unwrap(),
            Some(MemberRole::Owner)
        );
    }
}
