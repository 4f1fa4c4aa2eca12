//! In-memory registry of armed notification jobs.
//!
//! Job identity is always (space, notification). Registering a key that is
//! already armed stops and replaces the previous timer, so re-arming is
//! idempotent and duplicates cannot stack.

use serde::Serialize;
use spacebot_core::types::NotificationKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Identity of one armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub space_id: i64,
    pub notification_id: i64,
}

/// Stop signal + display metadata for an armed timer.
pub struct JobHandle {
    pub space_name: String,
    pub kind: NotificationKind,
    pub schedule: String,
    stop: Arc<Notify>,
}

impl JobHandle {
    pub fn new(space_name: &str, kind: NotificationKind, schedule: &str, stop: Arc<Notify>) -> Self {
        Self {
            space_name: space_name.to_string(),
            kind,
            schedule: schedule.to_string(),
            stop,
        }
    }
}

/// Serializable view of an armed job, for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub space_id: i64,
    pub notification_id: i64,
    pub space_name: String,
    pub kind: NotificationKind,
    pub schedule: String,
}

/// Map of armed timers, shared between the scheduler and the gateway.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobKey, JobHandle>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm `key`, replacing and stopping any previously registered timer.
    pub fn replace(&self, key: JobKey, handle: JobHandle) {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(prev) = jobs.insert(key, handle) {
            prev.stop.notify_one();
            tracing::debug!(
                "Replaced timer for notification {} in space {}",
                key.notification_id,
                key.space_id
            );
        }
    }

    /// Signal a job's loop to stop and forget it. Returns false when the
    /// key was not armed.
    pub fn stop(&self, key: JobKey) -> bool {
        let mut jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        match jobs.remove(&key) {
            Some(handle) => {
                handle.stop.notify_one();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all armed jobs.
    pub fn snapshot(&self) -> Vec<JobInfo> {
        let jobs = self.jobs.lock().unwrap_or_else(|e| e.into_inner());
        let mut infos: Vec<JobInfo> = jobs
            .iter()
            .map(|(key, handle)| JobInfo {
                space_id: key.space_id,
                notification_id: key.notification_id,
                space_name: handle.space_name.clone(),
                kind: handle.kind,
                schedule: handle.schedule.clone(),
            })
            .collect();
        infos.sort_by_key(|info| (info.space_id, info.notification_id));
        infos
    }
}
