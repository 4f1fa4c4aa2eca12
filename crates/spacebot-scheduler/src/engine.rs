//! Notification scheduler engine — arms one timer loop per notification
//! and drives NORMAL/REMINDER ticks.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use spacebot_core::config::SchedulerConfig;
use spacebot_core::error::Result;
use spacebot_core::traits::ChatClient;
use spacebot_core::types::NotificationKind;
use spacebot_store::{Member, Notification, Store};
use tokio::sync::Notify;

use crate::cron::CronSchedule;
use crate::jobs::{JobHandle, JobKey, JobRegistry};

/// The scheduler — owns the job registry and arms timers from storage.
pub struct NotificationScheduler {
    store: Arc<Store>,
    chat: Arc<dyn ChatClient>,
    registry: Arc<JobRegistry>,
    lookahead_hours: u32,
}

impl NotificationScheduler {
    pub fn new(store: Arc<Store>, chat: Arc<dyn ChatClient>, config: &SchedulerConfig) -> Self {
        Self {
            store,
            chat,
            registry: Arc::new(JobRegistry::new()),
            lookahead_hours: config.lookahead_hours,
        }
    }

    /// The shared registry of armed jobs.
    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    /// Startup reconciliation: arm every notification of every enabled
    /// space. Returns how many timers were armed.
    pub async fn start(&self) -> Result<usize> {
        let mut armed = 0;
        for space in self.store.enabled_spaces()? {
            for notification in self.store.notifications_by_space(space.id)? {
                let tagged = self.store.tagged_members(notification.id)?;
                if self.arm(&space.name, notification, tagged) {
                    armed += 1;
                }
            }
        }
        tracing::info!("⏰ Scheduler armed {armed} notification timer(s)");
        Ok(armed)
    }

    /// Register exactly one recurring timer for `notification`. Arming an
    /// already-armed notification replaces its timer. Returns false when
    /// the schedule does not parse (the notification is skipped, not
    /// fatal).
    pub fn arm(&self, space_name: &str, notification: Notification, tagged: Vec<Member>) -> bool {
        let schedule: CronSchedule = match notification.schedule.parse() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!("⚠️ Not arming notification {}: {e}", notification.id);
                return false;
            }
        };

        let key = JobKey {
            space_id: notification.space_id,
            notification_id: notification.id,
        };
        let stop = Arc::new(Notify::new());
        self.registry.replace(
            key,
            JobHandle::new(space_name, notification.kind, &notification.schedule, stop.clone()),
        );
        tracing::info!(
            "📅 Armed {} notification {} for {} ({})",
            notification.kind.as_str(),
            notification.id,
            space_name,
            notification.schedule
        );

        let ctx = JobContext {
            store: self.store.clone(),
            chat: self.chat.clone(),
            space_name: space_name.to_string(),
            tagged,
            schedule,
            lookahead_hours: self.lookahead_hours,
            stop,
        };
        tokio::spawn(run_job_loop(ctx, notification));
        true
    }
}

/// Everything a job loop needs, detached from the scheduler's lifetime.
struct JobContext {
    store: Arc<Store>,
    chat: Arc<dyn ChatClient>,
    space_name: String,
    tagged: Vec<Member>,
    schedule: CronSchedule,
    lookahead_hours: u32,
    stop: Arc<Notify>,
}

/// One timer loop: sleep until the next cron fire, tick, repeat.
/// A tick failure is logged and the loop continues; only the stop signal
/// (a replacing re-arm) or an unschedulable cron ends it.
async fn run_job_loop(ctx: JobContext, mut notification: Notification) {
    // Cycle boundary for reminder deduplication: acknowledgments at or
    // after this instant count for the upcoming tick. Starts at arm time,
    // advances to the fire time on every tick.
    let mut cycle_start = Utc::now();

    loop {
        let now = Utc::now();
        let Some(next) = ctx.schedule.next_after(now, ctx.lookahead_hours) else {
            tracing::warn!(
                "Schedule '{}' of notification {} has no upcoming fire time; timer stopped",
                notification.schedule,
                notification.id
            );
            break;
        };
        let delay = (next - now).to_std().unwrap_or_default();

        tokio::select! {
            _ = ctx.stop.notified() => {
                tracing::debug!("Timer for notification {} stopped", notification.id);
                break;
            }
            _ = tokio::time::sleep(delay) => {
                let result = match notification.kind {
                    NotificationKind::Normal => fire_normal(&ctx, &mut notification).await,
                    NotificationKind::Reminder => {
                        fire_reminder(&ctx, &mut notification, cycle_start).await
                    }
                };
                if let Err(e) = result {
                    tracing::warn!("⚠️ Tick failed for notification {}: {e}", notification.id);
                }
                cycle_start = next;
            }
        }
    }
}

/// NORMAL tick: announce to every tagged member, prior acknowledgments
/// notwithstanding.
async fn fire_normal(ctx: &JobContext, notification: &mut Notification) -> Result<()> {
    let text = compose(&ctx.tagged, &notification.message);
    deliver(ctx, notification, &text).await
}

/// REMINDER tick: re-notify only the tagged members without an
/// acknowledgment in the current cycle. An empty subset sends nothing.
async fn fire_reminder(
    ctx: &JobContext,
    notification: &mut Notification,
    cycle_start: DateTime<Utc>,
) -> Result<()> {
    let acked = ctx
        .store
        .acknowledged_member_ids(notification.id, cycle_start)?;
    let pending: Vec<Member> = ctx
        .tagged
        .iter()
        .filter(|m| !acked.contains(&m.id))
        .cloned()
        .collect();

    if pending.is_empty() {
        tracing::debug!(
            "All tagged members acknowledged notification {}; reminder suppressed",
            notification.id
        );
        return Ok(());
    }

    let text = compose(&pending, &notification.message);
    deliver(ctx, notification, &text).await
}

/// Send `text` into the notification's thread (or its space while no
/// thread exists yet), binding the thread on first delivery.
async fn deliver(ctx: &JobContext, notification: &mut Notification, text: &str) -> Result<()> {
    let target = notification
        .thread_id
        .clone()
        .unwrap_or_else(|| ctx.space_name.clone());
    let sent = ctx.chat.send_text(&target, text).await?;
    tracing::info!("📣 Notification {} delivered to {}", notification.id, target);

    if notification.thread_id.is_none()
        && let Some(thread) = sent.thread
    {
        ctx.store.bind_thread(notification.id, &thread)?;
        notification.thread_id = Some(thread);
    }
    Ok(())
}

/// Mention line + announcement text.
fn compose(members: &[Member], message: &str) -> String {
    if members.is_empty() {
        return message.to_string();
    }
    let mentions: Vec<String> = members.iter().map(|m| format!("<{}>", m.name)).collect();
    format!("{} {}", mentions.join(" "), message)
}
