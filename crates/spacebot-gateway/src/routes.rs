//! API route handlers for the gateway.

use axum::{Json, extract::State};
use spacebot_core::types::{NotificationKind, WebhookEvent};
use std::sync::Arc;

use super::correlator;
use super::server::AppState;

/// Health check endpoint.
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "spacebot-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Platform webhook endpoint. Always answers 200: a recognized event gets
/// its correlator response, everything else an empty object. A payload the
/// bot cannot act on must not bounce back to the platform as an error.
pub async fn webhook_events(
    State(state): State<Arc<AppState>>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let event: WebhookEvent = match serde_json::from_value(body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Ignoring malformed webhook event: {e}");
            return Json(serde_json::json!({}));
        }
    };

    match correlator::handle_event(&state, &event).await {
        Ok(Some(response)) => Json(serde_json::json!({ "text": response.text })),
        Ok(None) => Json(serde_json::json!({})),
        Err(e) => {
            tracing::error!("Event handling failed: {e}");
            Json(serde_json::json!({}))
        }
    }
}

/// List all configured notifications.
pub async fn list_notifications(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    match state.store.all_notifications() {
        Ok(notifications) => Json(serde_json::json!({
            "ok": true,
            "notifications": notifications,
        })),
        Err(e) => Json(serde_json::json!({"ok": false, "error": e.to_string()})),
    }
}

/// Create a notification and arm it on the live scheduler.
///
/// Body: `{"space_name": "...", "kind": "NORMAL"|"REMINDER",
///         "schedule": "0 9 * * *", "message": "...",
///         "tagged": ["users/...", ...]}`
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    Json(req): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let space_name = req["space_name"].as_str().unwrap_or("").trim();
    let schedule = req["schedule"].as_str().unwrap_or("").trim();
    if space_name.is_empty() || schedule.is_empty() {
        return Json(
            serde_json::json!({"ok": false, "error": "space_name and schedule are required"}),
        );
    }
    let kind = NotificationKind::from_tag(req["kind"].as_str().unwrap_or("NORMAL"));
    let message = req["message"].as_str().unwrap_or("");

    let space = match state.store.find_space_by_name(space_name) {
        Ok(Some(space)) => space,
        Ok(None) => {
            return Json(
                serde_json::json!({"ok": false, "error": format!("Unknown space: {space_name}")}),
            );
        }
        Err(e) => return Json(serde_json::json!({"ok": false, "error": e.to_string()})),
    };

    let notification = match state.store.add_notification(space.id, kind, schedule, message) {
        Ok(n) => n,
        Err(e) => return Json(serde_json::json!({"ok": false, "error": e.to_string()})),
    };

    // Tag the requested members; names that resolve to no known member are
    // reported back rather than failing the whole request.
    let mut unknown = Vec::new();
    if let Some(tagged) = req["tagged"].as_array() {
        for name in tagged.iter().filter_map(|v| v.as_str()) {
            match state.store.find_member_by_name(name) {
                Ok(Some(member)) => {
                    if let Err(e) = state.store.tag_member(notification.id, member.id) {
                        tracing::warn!("Tagging {name} failed: {e}");
                    }
                }
                _ => unknown.push(name.to_string()),
            }
        }
    }

    let tagged = state
        .store
        .tagged_members(notification.id)
        .unwrap_or_default();
    let armed = state.scheduler.arm(&space.name, notification.clone(), tagged);

    Json(serde_json::json!({
        "ok": true,
        "notification": notification,
        "armed": armed,
        "unknown_members": unknown,
    }))
}

/// Snapshot of armed scheduler jobs.
pub async fn scheduler_jobs(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let jobs = state.scheduler.registry().snapshot();
    Json(serde_json::json!({
        "ok": true,
        "count": jobs.len(),
        "jobs": jobs,
    }))
}
