//! Event correlator — maps inbound webhook events to directory and ledger
//! updates.
//!
//! Dispatch is an exhaustive match on `EventType`. Lookup misses branch to
//! a creation path or drop the event; they never raise. Chat API failures
//! are caught here, logged, and the handler carries on.

use chrono::Utc;
use spacebot_core::error::Result;
use spacebot_core::types::{
    EventMessage, EventResponse, EventSpace, EventType, EventUser, MemberRole, WebhookEvent,
};
use spacebot_store::Store;

use crate::server::AppState;

/// Handle one webhook event. `Some(response)` is returned to the platform
/// as `{"text": ...}`; `None` means no body.
pub async fn handle_event(state: &AppState, event: &WebhookEvent) -> Result<Option<EventResponse>> {
    match event.event_type {
        EventType::AddedToSpace => handle_added_to_space(state, event).await,
        EventType::Message => handle_message(state, event).await,
        EventType::RemovedFromSpace => {
            handle_removed_from_space(state, event)?;
            Ok(None)
        }
    }
}

/// ADDED_TO_SPACE: re-enable a known space, or register a new one and
/// enroll its current roster (the acting user becomes OWNER).
async fn handle_added_to_space(
    state: &AppState,
    event: &WebhookEvent,
) -> Result<Option<EventResponse>> {
    let Some(space_evt) = event.space.as_ref() else {
        return Ok(None);
    };
    let welcome = EventResponse {
        text: format!("Thank for adding me to space {}", space_evt.display_name),
    };

    if let Some(existing) = state.store.find_space_by_name(&space_evt.name)? {
        state.store.set_space_enabled(existing.id, true)?;
        tracing::info!("🔄 Space {} re-enabled", space_evt.name);
        return Ok(Some(welcome));
    }

    let space = state
        .store
        .add_space(&space_evt.name, &space_evt.display_name)?;
    tracing::info!("✅ Space {} ({}) registered", space.name, space.display_name);

    let roster = match state.chat.list_space_members(&space.name).await {
        Ok(roster) => roster,
        Err(e) => {
            tracing::warn!("⚠️ Member enumeration for {} failed: {e}", space.name);
            Vec::new()
        }
    };

    for entry in &roster {
        // The acting user keeps the display name the event carried; everyone
        // else gets the one the enumeration reported.
        let acting = event.user.as_ref().filter(|u| u.name == entry.member.name);
        let (display_name, role) = match acting {
            Some(user) => (user.display_name.as_str(), MemberRole::Owner),
            None => (entry.member.display_name.as_str(), MemberRole::Member),
        };
        add_member_to_space(&state.store, space.id, &entry.member.name, display_name, role)?;
    }

    Ok(Some(welcome))
}

/// REMOVED_FROM_SPACE: disable the space. Timers stay armed; delivery to a
/// space the bot left fails at the platform and is only logged.
fn handle_removed_from_space(state: &AppState, event: &WebhookEvent) -> Result<()> {
    let Some(space_evt) = event.space.as_ref() else {
        return Ok(());
    };
    if let Some(space) = state.store.find_space_by_name(&space_evt.name)? {
        state.store.set_space_enabled(space.id, false)?;
        tracing::info!("Space {} disabled", space_evt.name);
    }
    Ok(())
}

/// MESSAGE: the text-command sub-protocol. Commands are matched verbatim
/// after trimming; anything else is a candidate acknowledgment.
async fn handle_message(
    state: &AppState,
    event: &WebhookEvent,
) -> Result<Option<EventResponse>> {
    let Some(message) = event.message.as_ref() else {
        return Ok(None);
    };

    match message.argument_text.trim() {
        "update" => {
            let Some(user) = event.user.as_ref() else {
                return Ok(None);
            };
            handle_update_command(state, event.space.as_ref(), user)
        }
        "thread" => Ok(Some(EventResponse {
            text: format!("ThreadID của thread này là: {}", message.thread.name),
        })),
        _ => handle_acknowledgment(state, event.user.as_ref(), message),
    }
}

/// "update": register an unknown sender, or backfill a known member's
/// contact fields. A fully registered member is a strict no-op.
fn handle_update_command(
    state: &AppState,
    space_evt: Option<&EventSpace>,
    user: &EventUser,
) -> Result<Option<EventResponse>> {
    match state.store.find_member_by_name(&user.name)? {
        None => {
            let member = state.store.add_member(
                &user.name,
                &user.display_name,
                user.email.as_deref(),
                user.avatar_url.as_deref(),
            )?;
            if let Some(space_evt) = space_evt
                && let Some(space) = state.store.find_space_by_name(&space_evt.name)?
            {
                state
                    .store
                    .upsert_membership(space.id, member.id, MemberRole::Member)?;
            }
            Ok(None)
        }
        Some(member) if member.has_contact_info() => Ok(None),
        Some(member) => {
            state.store.update_member_contact(
                member.id,
                user.email.as_deref(),
                user.avatar_url.as_deref(),
            )?;
            Ok(Some(EventResponse {
                text: format!("<{}> cập nhật thành công", user.name),
            }))
        }
    }
}

/// Any other message text: record it as the latest acknowledgment when the
/// thread belongs to a tracked notification and the sender is known.
fn handle_acknowledgment(
    state: &AppState,
    user: Option<&EventUser>,
    message: &EventMessage,
) -> Result<Option<EventResponse>> {
    let Some(notification) = state.store.notification_by_thread(&message.thread.name)? else {
        // Most threads belong to no tracked notification.
        return Ok(None);
    };
    let Some(user) = user else {
        return Ok(None);
    };
    let Some(member) = state.store.find_member_by_name(&user.name)? else {
        tracing::debug!(
            "Acknowledgment on {} from unknown sender {} dropped",
            message.thread.name,
            user.name
        );
        return Ok(None);
    };

    state
        .store
        .record_received_message(notification.id, member.id, &message.name, Utc::now())?;
    tracing::debug!(
        "Acknowledgment of notification {} by member {} recorded",
        notification.id,
        member.id
    );
    Ok(None)
}

/// Add one enumerated member to a space: create it on first sighting,
/// otherwise refresh its stored identity, then create/refresh the
/// membership row with the given role.
fn add_member_to_space(
    store: &Store,
    space_id: i64,
    name: &str,
    display_name: &str,
    role: MemberRole,
) -> Result<()> {
    match store.find_member_by_name(name)? {
        None => {
            let member = store.add_member(name, display_name, None, None)?;
            store.upsert_membership(space_id, member.id, role)
        }
        Some(member) => {
            store.update_member_identity(member.id, name, display_name)?;
            store.upsert_membership(space_id, member.id, role)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use spacebot_core::config::{GatewayConfig, SchedulerConfig};
    use spacebot_core::error::SpacebotError;
    use spacebot_core::traits::ChatClient;
    use spacebot_core::types::{EventThread, NotificationKind, SentMessage, SpaceMember};
    use spacebot_scheduler::NotificationScheduler;
    use std::sync::{Arc, Mutex};

    /// Chat double: serves a fixed roster, records every call.
    struct FakeChat {
        roster: Vec<SpaceMember>,
        list_calls: Mutex<usize>,
    }

    impl FakeChat {
        fn with_roster(entries: &[(&str, &str)]) -> Arc<Self> {
            let roster = entries
                .iter()
                .map(|(name, display_name)| {
                    serde_json::from_value(serde_json::json!({
                        "member": {"name": name, "displayName": display_name}
                    }))
                    .unwrap()
                })
                .collect();
            Arc::new(Self {
                roster,
                list_calls: Mutex::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatClient for FakeChat {
        async fn send_text(&self, _target: &str, _text: &str) -> spacebot_core::Result<SentMessage> {
            Err(SpacebotError::Chat("not under test".into()))
        }

        async fn list_space_members(
            &self,
            _space_name: &str,
        ) -> spacebot_core::Result<Vec<SpaceMember>> {
            *self.list_calls.lock().unwrap() += 1;
            Ok(self.roster.clone())
        }
    }

    fn state_with(chat: Arc<FakeChat>) -> AppState {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let scheduler = Arc::new(NotificationScheduler::new(
            store.clone(),
            chat.clone(),
            &SchedulerConfig::default(),
        ));
        AppState {
            gateway_config: GatewayConfig::default(),
            store,
            chat,
            scheduler,
            start_time: std::time::Instant::now(),
        }
    }

    fn added_event(space_name: &str, display_name: &str, user: &str, user_display: &str) -> WebhookEvent {
        WebhookEvent {
            event_type: EventType::AddedToSpace,
            space: Some(EventSpace {
                name: space_name.into(),
                display_name: display_name.into(),
            }),
            user: Some(EventUser {
                name: user.into(),
                display_name: user_display.into(),
                email: None,
                avatar_url: None,
            }),
            message: None,
        }
    }

    fn message_event(user: Option<EventUser>, text: &str, thread: &str) -> WebhookEvent {
        WebhookEvent {
            event_type: EventType::Message,
            space: Some(EventSpace {
                name: "s1".into(),
                display_name: "Team".into(),
            }),
            user,
            message: Some(EventMessage {
                name: "s1/messages/m1".into(),
                argument_text: text.into(),
                thread: EventThread {
                    name: thread.into(),
                },
            }),
        }
    }

    fn known_user(name: &str) -> EventUser {
        EventUser {
            name: name.into(),
            display_name: "Alice".into(),
            email: Some("alice@x.vn".into()),
            avatar_url: Some("http://img/a".into()),
        }
    }

    #[tokio::test]
    async fn test_added_to_space_enrolls_roster_with_roles() {
        let chat = FakeChat::with_roster(&[("u1", "Alice"), ("u2", "Bob")]);
        let state = state_with(chat);
        let event = added_event("s1", "Team", "u1", "Alice");

        let response = handle_event(&state, &event).await.unwrap().unwrap();
        assert_eq!(response.text, "Thank for adding me to space Team");

        let space = state.store.find_space_by_name("s1").unwrap().unwrap();
        assert!(space.is_enabled);

        let u1 = state.store.find_member_by_name("u1").unwrap().unwrap();
        let u2 = state.store.find_member_by_name("u2").unwrap().unwrap();
        assert_eq!(
            state.store.membership_role(space.id, u1.id).unwrap(),
            Some(MemberRole::Owner)
        );
        assert_eq!(
            state.store.membership_role(space.id, u2.id).unwrap(),
            Some(MemberRole::Member)
        );
        assert_eq!(u2.display_name, "Bob");
    }

    #[tokio::test]
    async fn test_readd_reenables_without_duplicate_space() {
        let chat = FakeChat::with_roster(&[("u1", "Alice")]);
        let state = state_with(chat.clone());

        let added = added_event("s1", "Team", "u1", "Alice");
        handle_event(&state, &added).await.unwrap();
        let original = state.store.find_space_by_name("s1").unwrap().unwrap();

        let removed = WebhookEvent {
            event_type: EventType::RemovedFromSpace,
            ..added.clone()
        };
        assert!(handle_event(&state, &removed).await.unwrap().is_none());
        assert!(!state.store.find_space_by_name("s1").unwrap().unwrap().is_enabled);

        let response = handle_event(&state, &added).await.unwrap().unwrap();
        assert_eq!(response.text, "Thank for adding me to space Team");
        let readded = state.store.find_space_by_name("s1").unwrap().unwrap();
        assert_eq!(readded.id, original.id);
        assert!(readded.is_enabled);
        // The roster is enumerated only when the space is first created.
        assert_eq!(*chat.list_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_removed_from_unknown_space_is_ignored() {
        let state = state_with(FakeChat::with_roster(&[]));
        let event = WebhookEvent {
            event_type: EventType::RemovedFromSpace,
            space: Some(EventSpace {
                name: "nowhere".into(),
                display_name: String::new(),
            }),
            user: None,
            message: None,
        };
        assert!(handle_event(&state, &event).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_thread_command_replies_without_mutating() {
        let state = state_with(FakeChat::with_roster(&[]));
        let event = message_event(Some(known_user("u1")), " thread ", "t1");

        let response = handle_event(&state, &event).await.unwrap().unwrap();
        assert_eq!(response.text, "ThreadID của thread này là: t1");
        assert_eq!(state.store.received_message_count().unwrap(), 0);
        assert!(state.store.find_member_by_name("u1").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_registers_unknown_sender_silently() {
        let chat = FakeChat::with_roster(&[("u1", "Alice")]);
        let state = state_with(chat);
        handle_event(&state, &added_event("s1", "Team", "owner", "Owner"))
            .await
            .unwrap();

        let event = message_event(Some(known_user("u9")), "update", "t1");
        assert!(handle_event(&state, &event).await.unwrap().is_none());

        let member = state.store.find_member_by_name("u9").unwrap().unwrap();
        assert!(member.has_contact_info());
        let space = state.store.find_space_by_name("s1").unwrap().unwrap();
        assert_eq!(
            state.store.membership_role(space.id, member.id).unwrap(),
            Some(MemberRole::Member)
        );
    }

    #[tokio::test]
    async fn test_update_backfills_contact_and_confirms() {
        let state = state_with(FakeChat::with_roster(&[]));
        state.store.add_member("u1", "Alice", None, None).unwrap();

        let event = message_event(Some(known_user("u1")), "update", "t1");
        let response = handle_event(&state, &event).await.unwrap().unwrap();
        assert_eq!(response.text, "<u1> cập nhật thành công");

        let member = state.store.find_member_by_name("u1").unwrap().unwrap();
        assert_eq!(member.email.as_deref(), Some("alice@x.vn"));
        assert_eq!(member.image_url.as_deref(), Some("http://img/a"));
    }

    #[tokio::test]
    async fn test_update_is_idempotent_once_registered() {
        let state = state_with(FakeChat::with_roster(&[]));
        state
            .store
            .add_member("u1", "Alice", Some("alice@x.vn"), Some("http://img/a"))
            .unwrap();

        let event = message_event(Some(known_user("u1")), "update", "t1");
        assert!(handle_event(&state, &event).await.unwrap().is_none());
        assert!(handle_event(&state, &event).await.unwrap().is_none());

        let member = state.store.find_member_by_name("u1").unwrap().unwrap();
        assert_eq!(member.email.as_deref(), Some("alice@x.vn"));
    }

    #[tokio::test]
    async fn test_acknowledgment_inserts_then_updates_in_place() {
        let state = state_with(FakeChat::with_roster(&[]));
        let space = state.store.add_space("s1", "Team").unwrap();
        let n = state
            .store
            .add_notification(space.id, NotificationKind::Reminder, "0 9 * * *", "standup")
            .unwrap();
        state.store.bind_thread(n.id, "t1").unwrap();
        let member = state.store.add_member("u1", "Alice", None, None).unwrap();

        let mut event = message_event(Some(known_user("u1")), "done, shipping today", "t1");
        handle_event(&state, &event).await.unwrap();
        let row = state.store.find_received_message(n.id, member.id).unwrap().unwrap();
        assert_eq!(row.message_id, "s1/messages/m1");

        event.message.as_mut().unwrap().name = "s1/messages/m2".into();
        handle_event(&state, &event).await.unwrap();
        assert_eq!(state.store.received_message_count().unwrap(), 1);
        let row = state.store.find_received_message(n.id, member.id).unwrap().unwrap();
        assert_eq!(row.message_id, "s1/messages/m2");
    }

    #[tokio::test]
    async fn test_acknowledgment_from_unknown_sender_is_dropped() {
        let state = state_with(FakeChat::with_roster(&[]));
        let space = state.store.add_space("s1", "Team").unwrap();
        let n = state
            .store
            .add_notification(space.id, NotificationKind::Reminder, "0 9 * * *", "standup")
            .unwrap();
        state.store.bind_thread(n.id, "t1").unwrap();

        let event = message_event(Some(known_user("stranger")), "on it", "t1");
        assert!(handle_event(&state, &event).await.unwrap().is_none());
        assert_eq!(state.store.received_message_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_message_on_untracked_thread_is_ignored() {
        let state = state_with(FakeChat::with_roster(&[]));
        state.store.add_member("u1", "Alice", None, None).unwrap();

        let event = message_event(Some(known_user("u1")), "hello all", "t-free");
        assert!(handle_event(&state, &event).await.unwrap().is_none());
        assert_eq!(state.store.received_message_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_message_event_without_payload_fails_closed() {
        let state = state_with(FakeChat::with_roster(&[]));
        let event = WebhookEvent {
            event_type: EventType::Message,
            space: None,
            user: None,
            message: None,
        };
        assert!(handle_event(&state, &event).await.unwrap().is_none());
    }
}
