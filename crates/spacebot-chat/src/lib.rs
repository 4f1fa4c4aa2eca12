//! # Spacebot Chat
//! Chat platform REST client — message delivery and space member
//! enumeration via the platform HTTP API.

pub mod client;

pub use client::RestChatClient;
