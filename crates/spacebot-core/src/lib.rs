//! # Spacebot Core
//!
//! Shared foundation for the Spacebot workspace: configuration, the error
//! type, the webhook wire model, and the `ChatClient` trait the scheduler
//! and event correlator talk to the chat platform through.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::SpacebotConfig;
pub use error::{Result, SpacebotError};
pub use traits::ChatClient;
pub use types::{
    EventMessage, EventResponse, EventSpace, EventThread, EventType, EventUser, MemberRole,
    NotificationKind, SentMessage, SpaceMember, WebhookEvent,
};
