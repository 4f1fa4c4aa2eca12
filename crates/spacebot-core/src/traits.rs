//! Collaborator traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{SentMessage, SpaceMember};

/// Outbound chat platform client.
///
/// Delivery is best-effort: callers catch and log errors, they never let a
/// failed send abort a handler or deregister a timer.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a text message. `target` is a space name or a thread name; the
    /// platform routes accordingly.
    async fn send_text(&self, target: &str, text: &str) -> Result<SentMessage>;

    /// Enumerate the current members of a space. Used once, when a space is
    /// first created.
    async fn list_space_members(&self, space_name: &str) -> Result<Vec<SpaceMember>>;
}
