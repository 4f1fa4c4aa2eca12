//! # Spacebot Scheduler
//!
//! One recurring timer per active notification, rebuilt from storage at
//! process start.
//!
//! ```text
//! NotificationScheduler
//!   ├── start(): enabled spaces → notifications → arm each
//!   ├── arm(): one tokio loop per (space, notification)
//!   │     select! { stop.notified() | sleep_until(next cron fire) }
//!   ├── NORMAL tick   → send to everyone tagged
//!   └── REMINDER tick → send only to members unacknowledged this cycle
//!                       (empty subset = suppressed, not an error)
//! ```
//!
//! A failed delivery is logged and the loop keeps ticking; nothing short
//! of a replacing re-arm stops a registered timer.

pub mod cron;
pub mod engine;
pub mod jobs;

pub use cron::CronSchedule;
pub use engine::NotificationScheduler;
pub use jobs::{JobInfo, JobKey, JobRegistry};
