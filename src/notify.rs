use crate::api::CourseApi;
use crate::models::{
    ChannelPreferences, Notification, NotificationChannel, SessionPreferences,
};
use indexmap::IndexMap;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Connection state of the push transport. The transport library owns
/// reconnection; this component only tracks and logs transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// An event delivered by the external push transport.
#[derive(Debug)]
pub enum PushEvent {
    /// The transport finished its handshake.
    Connected,
    Notification(Notification),
    TransportError(String),
}

/// Live notification feed plus user preference filtering.
///
/// Two kinds of preferences are deliberately kept apart:
/// * [`ChannelPreferences`] (email/push/in-app toggles) are persisted on the
///   backend, one record per channel.
/// * [`SessionPreferences`] (enrolled-courses-only, type and priority
///   allowlists) live only in this object for the session and are lost on
///   reload.
///
/// Archived state is likewise local-only: the backend has no archive
/// endpoint, so `archive` does not survive a reload either.
pub struct NotificationCenter<G> {
    api: G,
    channels: ChannelPreferences,
    session: SessionPreferences,
    archived: HashSet<String>,
    /// Notifications that arrived over push and may not be fetchable yet.
    pushed: IndexMap<String, Notification>,
    connection: ConnectionState,
}

impl<G: CourseApi> NotificationCenter<G> {
    pub fn new(api: G) -> Self {
        Self {
            api,
            channels: ChannelPreferences::default(),
            session: SessionPreferences::default(),
            archived: HashSet::new(),
            pushed: IndexMap::new(),
            connection: ConnectionState::Disconnected,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    pub fn channel_preferences(&self) -> ChannelPreferences {
        self.channels
    }

    pub fn session_preferences(&self) -> &SessionPreferences {
        &self.session
    }

    pub fn set_session_preferences(&mut self, session: SessionPreferences) {
        self.session = session;
    }

    /// Load channel toggles from the backend. Any failure falls back to the
    /// hardcoded defaults (all channels on, all types and priorities enabled,
    /// enrolled-courses-only on) instead of blocking the caller.
    pub async fn load_preferences(&mut self) {
        match self.api.channel_preferences().await {
            Ok(prefs) => self.channels = prefs,
            Err(e) => {
                warn!(error = %e, "preference load failed, using defaults");
                self.channels = ChannelPreferences::default();
                self.session = SessionPreferences::default();
            }
        }
    }

    /// Persist channel toggles, one backend call per changed channel, and
    /// adopt the new session filters locally. Session filters are never sent
    /// to the backend. On any channel-update failure the whole preference
    /// set, session filters included, reverts to the hardcoded defaults
    /// rather than being left half-applied.
    pub async fn save_preferences(
        &mut self,
        channels: ChannelPreferences,
        session: SessionPreferences,
    ) -> bool {
        let updates = [
            (NotificationChannel::Email, channels.email),
            (NotificationChannel::Push, channels.push),
            (NotificationChannel::InApp, channels.in_app),
        ];

        let mut ok = true;
        for (channel, enabled) in updates {
            if self.channels.get(channel) == enabled {
                continue;
            }
            if let Err(e) = self.api.update_channel_preference(channel, enabled).await {
                warn!(?channel, error = %e, "channel preference update failed");
                ok = false;
            }
        }

        if ok {
            self.channels = channels;
            self.session = session;
        } else {
            self.channels = ChannelPreferences::default();
            self.session = SessionPreferences::default();
        }
        ok
    }

    /// Fetch the feed and apply the session filters, AND-combined:
    /// (a) enrolled-courses-only: notifications referencing a course the
    /// user is not enrolled in are dropped, but notifications with no course
    /// reference always pass; (b) type allowlist; (c) priority allowlist.
    /// Locally archived notifications are omitted. A fetch failure degrades
    /// to the pushed-only feed.
    pub async fn list_notifications(
        &self,
        enrolled_course_ids: &HashSet<String>,
    ) -> Vec<Notification> {
        let mut feed: IndexMap<String, Notification> = IndexMap::new();
        match self.api.notifications().await {
            Ok(fetched) => {
                for n in fetched {
                    feed.insert(n.id.clone(), n);
                }
            }
            Err(e) => {
                warn!(error = %e, "notification fetch failed, showing pushed feed only");
            }
        }
        for (id, n) in &self.pushed {
            feed.entry(id.clone()).or_insert_with(|| n.clone());
        }

        feed.into_values()
            .filter(|n| !self.archived.contains(&n.id))
            .filter(|n| self.passes_filters(n, enrolled_course_ids))
            .collect()
    }

    fn passes_filters(&self, n: &Notification, enrolled: &HashSet<String>) -> bool {
        if self.session.enrolled_courses_only {
            if let Some(course_id) = n.course_id() {
                if !enrolled.contains(course_id) {
                    return false;
                }
            }
            // No course reference: system notification, always passes.
        }
        self.session.enabled_types.contains(&n.notification_type)
            && self.session.enabled_priorities.contains(&n.priority)
    }

    pub async fn mark_read(&mut self, id: &str) -> bool {
        match self.api.mark_notification_read(id).await {
            Ok(()) => {
                if let Some(n) = self.pushed.get_mut(id) {
                    n.read = true;
                }
                true
            }
            Err(e) => {
                warn!(id, error = %e, "mark-read failed");
                false
            }
        }
    }

    pub async fn mark_all_read(&mut self) -> bool {
        match self.api.mark_all_notifications_read().await {
            Ok(()) => {
                for n in self.pushed.values_mut() {
                    n.read = true;
                }
                true
            }
            Err(e) => {
                warn!(error = %e, "mark-all-read failed");
                false
            }
        }
    }

    /// Archive a notification locally. There is no backend support for this:
    /// archived state is lost on reload.
    pub fn archive(&mut self, id: &str) {
        self.archived.insert(id.to_string());
    }

    /// Drive the push connection: `Disconnected -> Connecting -> Connected`,
    /// then back to `Disconnected` when the transport errors or closes the
    /// channel. The connection stays `Connecting` until the transport
    /// confirms its handshake (or implicitly, by delivering an event).
    /// Errors are logged, not retried here.
    pub async fn run_push_loop(&mut self, mut events: mpsc::Receiver<PushEvent>) {
        self.begin_connect();

        while let Some(event) = events.recv().await {
            if !self.apply_push_event(event) {
                break;
            }
        }

        self.connection = ConnectionState::Disconnected;
    }

    fn begin_connect(&mut self) {
        self.connection = ConnectionState::Connecting;
        debug!("push transport connecting");
    }

    /// Apply one transport event; returns false when the connection should
    /// be torn down.
    fn apply_push_event(&mut self, event: PushEvent) -> bool {
        match event {
            PushEvent::Connected => {
                debug!("push transport connected");
                self.connection = ConnectionState::Connected;
                true
            }
            PushEvent::Notification(n) => {
                // A delivered notification proves the transport is up even
                // if the handshake event was missed.
                self.connection = ConnectionState::Connected;
                debug!(id = %n.id, "push notification received");
                self.pushed.insert(n.id.clone(), n);
                true
            }
            PushEvent::TransportError(message) => {
                warn!(message, "push transport error, disconnecting");
                false
            }
        }
    }
}
