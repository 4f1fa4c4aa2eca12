//! # Spacebot Gateway
//! HTTP surface of the bot: the webhook events endpoint (dispatched by the
//! event correlator) and a small admin API over notifications and armed
//! scheduler jobs.

pub mod correlator;
pub mod routes;
pub mod server;

pub use server::{AppState, build_router, start};
