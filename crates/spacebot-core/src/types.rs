//! Wire types and closed domain enums.
//!
//! The webhook event shape is the one wire contract the bot has with the
//! chat platform. Event and notification tags are closed enums so dispatch
//! is exhaustively checked instead of falling through on unknown strings.

use serde::{Deserialize, Serialize};

/// Webhook event type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "ADDED_TO_SPACE")]
    AddedToSpace,
    #[serde(rename = "MESSAGE")]
    Message,
    #[serde(rename = "REMOVED_FROM_SPACE")]
    RemovedFromSpace,
}

/// An inbound webhook event from the chat platform.
///
/// `space`/`user`/`message` are optional so a structurally incomplete
/// payload still deserializes; handlers fail closed on missing parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub space: Option<EventSpace>,
    #[serde(default)]
    pub user: Option<EventUser>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

/// The space an event originated from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSpace {
    /// Platform-assigned identifier, the stable external key.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// The acting/sending user of an event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventUser {
    /// Platform-assigned identifier, unique across spaces.
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Message payload of a MESSAGE event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    /// Platform identifier of the message itself.
    #[serde(default)]
    pub name: String,
    /// Message text with any bot mention stripped by the platform.
    #[serde(default)]
    pub argument_text: String,
    pub thread: EventThread,
}

/// Thread reference inside a message event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventThread {
    pub name: String,
}

/// Outbound reply to ADDED_TO_SPACE / MESSAGE events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventResponse {
    pub text: String,
}

/// One roster entry from the platform's member enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpaceMember {
    pub member: MemberRef,
}

/// Identifier + display name pair as the platform reports members.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRef {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
}

/// Result of a delivered chat message.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Platform identifier of the created message.
    pub name: String,
    /// Thread the message landed in, when the platform reports one.
    pub thread: Option<String>,
}

/// Notification behavior on each timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// Announce to all tagged members on every tick.
    #[serde(rename = "NORMAL")]
    Normal,
    /// Re-notify only members who have not acknowledged this cycle.
    #[serde(rename = "REMINDER")]
    Reminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Normal => "NORMAL",
            NotificationKind::Reminder => "REMINDER",
        }
    }

    /// Parse a stored tag; unknown tags fall back to NORMAL.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "REMINDER" => NotificationKind::Reminder,
            _ => NotificationKind::Normal,
        }
    }
}

/// Membership role inside a space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    /// Reserved for the member who added the bot.
    #[serde(rename = "OWNER")]
    Owner,
    #[serde(rename = "MEMBER")]
    Member,
}

impl MemberRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberRole::Owner => "OWNER",
            MemberRole::Member => "MEMBER",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "OWNER" => MemberRole::Owner,
            _ => MemberRole::Member,
        }
    }
}
