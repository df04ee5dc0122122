use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use diffhub_types::{Connection, ConnectionId, MessageType, PushMessage, Subscription};

use crate::config::NotifyConfig;
use crate::error::{NotifyError, NotifyResult};
use crate::sink::{ChannelSink, ConnectionSink, MessageStream};

/// Which connections a published message goes to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Every connection whose subscription contains the channel.
    Channel(String),
    /// One specific connection.
    Connection(ConnectionId),
    /// Every connection of a user.
    User(String),
    /// Every active connection.
    Broadcast,
}

/// Outcome of a publish: where delivery succeeded and where it failed.
#[derive(Debug, Default)]
pub struct PublishReport {
    pub delivered: Vec<ConnectionId>,
    pub failed: Vec<NotifyError>,
}

impl PublishReport {
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    /// `true` when no connection was resolved at all.
    pub fn is_empty(&self) -> bool {
        self.delivered.is_empty() && self.failed.is_empty()
    }
}

/// Acknowledgement of a heartbeat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatAck {
    pub connection_id: ConnectionId,
    pub server_time: DateTime<Utc>,
}

/// A registered connection with its sink and its (at most one) subscription.
struct Entry {
    connection: Connection,
    sink: Arc<dyn ConnectionSink>,
    subscription: Option<Subscription>,
}

type Slot = Arc<Mutex<Entry>>;

fn lock(slot: &Mutex<Entry>) -> MutexGuard<'_, Entry> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Connection/subscription registry and message publisher.
///
/// Each connection's record, sink, and subscription live in one map entry,
/// so removing a connection removes its subscription in the same step.
/// Entries carry their own mutex: the map lock is taken for writing only to
/// add or remove connections. Publishing resolves targets under the read
/// lock, then delivers without holding any lock.
pub struct NotificationFanout {
    entries: RwLock<HashMap<ConnectionId, Slot>>,
    config: NotifyConfig,
}

impl NotificationFanout {
    pub fn new(config: NotifyConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &NotifyConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConnectionId, Slot>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConnectionId, Slot>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, connection_id: &ConnectionId) -> Option<Slot> {
        self.read().get(connection_id).cloned()
    }

    /// Register a connection that receives messages through `sink`.
    pub fn add_connection(&self, connection: Connection, sink: Arc<dyn ConnectionSink>) -> NotifyResult<()> {
        let id = connection.connection_id;
        let mut entries = self.write();
        if entries.contains_key(&id) {
            return Err(NotifyError::AlreadyConnected(id));
        }
        info!(connection_id = %id, user_id = %connection.user_id, "connection added");
        entries.insert(
            id,
            Arc::new(Mutex::new(Entry {
                connection,
                sink,
                subscription: None,
            })),
        );
        Ok(())
    }

    /// Open a connection for `user_id` backed by a [`ChannelSink`], and push
    /// the initial `Connected` message carrying its id.
    pub fn connect(&self, user_id: impl Into<String>) -> NotifyResult<(Connection, MessageStream)> {
        let connection = Connection::new(user_id);
        let id = connection.connection_id;
        let (sink, stream) = ChannelSink::new(self.config.connection_buffer);
        self.add_connection(connection.clone(), Arc::new(sink))?;

        let hello = PushMessage::new(
            MessageType::Connected,
            serde_json::json!({ "connectionId": id }),
        );
        self.publish(Target::Connection(id), &hello);
        Ok((connection, stream))
    }

    /// Drop a connection and the subscription bound to it.
    pub fn remove_connection(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let slot = self.write().remove(connection_id)?;
        let entry = lock(&slot);
        info!(
            connection_id = %connection_id,
            had_subscription = entry.subscription.is_some(),
            "connection removed"
        );
        let connection = entry.connection.clone();
        Some(connection)
    }

    /// Create or replace the subscription of `connection_id`.
    pub fn subscribe<I, S>(&self, user_id: &str, connection_id: ConnectionId, channels: I) -> NotifyResult<Subscription>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slot = self
            .slot(&connection_id)
            .ok_or(NotifyError::UnknownConnection(connection_id))?;
        let mut entry = lock(&slot);
        if entry.connection.user_id != user_id {
            return Err(NotifyError::NotOwner {
                connection_id,
                owner: entry.connection.user_id.clone(),
                user_id: user_id.to_string(),
            });
        }

        let subscription = Subscription::new(user_id, connection_id, channels);
        debug!(
            connection_id = %connection_id,
            channels = subscription.channels.len(),
            replaced = entry.subscription.is_some(),
            "subscribed"
        );
        entry.connection.touch(Utc::now());
        entry.subscription = Some(subscription.clone());
        Ok(subscription)
    }

    /// Remove the subscription of `connection_id`. Returns whether one existed.
    pub fn unsubscribe(&self, connection_id: &ConnectionId) -> bool {
        let Some(slot) = self.slot(connection_id) else {
            return false;
        };
        let removed = lock(&slot).subscription.take();
        removed.is_some()
    }

    /// Deliver `message` to every connection `target` resolves to.
    ///
    /// Never fails as a whole: each delivery is independent, and failures are
    /// logged and returned in the report. A connection whose sink has closed
    /// is marked inactive.
    pub fn publish(&self, target: Target, message: &PushMessage) -> PublishReport {
        let recipients = self.resolve(&target);
        let mut report = PublishReport::default();
        let mut closed = Vec::new();

        for (connection_id, sink) in recipients {
            match sink.deliver(connection_id, message) {
                Ok(()) => report.delivered.push(connection_id),
                Err(e) => {
                    warn!(%connection_id, message_type = %message.message_type, error = %e, "delivery failed");
                    if sink.is_closed() {
                        closed.push(connection_id);
                    }
                    report.failed.push(e);
                }
            }
        }

        for id in closed {
            if let Some(slot) = self.slot(&id) {
                lock(&slot).connection.is_active = false;
            }
        }

        debug!(
            ?target,
            message_type = %message.message_type,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "published"
        );
        report
    }

    fn resolve(&self, target: &Target) -> Vec<(ConnectionId, Arc<dyn ConnectionSink>)> {
        let entries = self.read();
        entries
            .iter()
            .filter_map(|(id, slot)| {
                let e = lock(slot);
                let selected = e.connection.is_active
                    && match target {
                        Target::Channel(channel) => e
                            .subscription
                            .as_ref()
                            .is_some_and(|s| s.contains(channel)),
                        Target::Connection(wanted) => id == wanted,
                        Target::User(user) => e.connection.user_id == *user,
                        Target::Broadcast => true,
                    };
                if selected {
                    Some((*id, Arc::clone(&e.sink)))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Record activity on a connection and acknowledge it.
    pub fn heartbeat(&self, connection_id: &ConnectionId) -> NotifyResult<HeartbeatAck> {
        let now = Utc::now();
        let slot = self
            .slot(connection_id)
            .ok_or(NotifyError::UnknownConnection(*connection_id))?;
        lock(&slot).connection.touch(now);
        Ok(HeartbeatAck {
            connection_id: *connection_id,
            server_time: now,
        })
    }

    /// Remove connections inactive or idle for longer than `max_idle`,
    /// together with their subscriptions.
    pub fn prune_idle(&self, max_idle: Duration) -> Vec<ConnectionId> {
        let cutoff = chrono::Duration::from_std(max_idle)
            .ok()
            .and_then(|d| Utc::now().checked_sub_signed(d));
        let mut entries = self.write();
        let stale: Vec<ConnectionId> = entries
            .iter()
            .filter(|(_, slot)| {
                let e = lock(slot);
                !e.connection.is_active
                    || e.sink.is_closed()
                    || cutoff.is_some_and(|c| e.connection.last_activity_at < c)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            entries.remove(id);
        }
        if !stale.is_empty() {
            info!(count = stale.len(), "pruned idle connections");
        }
        stale
    }

    pub fn connection(&self, connection_id: &ConnectionId) -> Option<Connection> {
        let slot = self.slot(connection_id)?;
        let connection = lock(&slot).connection.clone();
        Some(connection)
    }

    pub fn subscription(&self, connection_id: &ConnectionId) -> Option<Subscription> {
        let slot = self.slot(connection_id)?;
        let subscription = lock(&slot).subscription.clone();
        subscription
    }

    pub fn connection_count(&self) -> usize {
        self.read().len()
    }

    pub fn subscription_count(&self) -> usize {
        self.read()
            .values()
            .filter(|slot| lock(slot).subscription.is_some())
            .count()
    }
}

impl Default for NotificationFanout {
    fn default() -> Self {
        Self::new(NotifyConfig::default())
    }
}

impl std::fmt::Debug for NotificationFanout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationFanout")
            .field("connections", &self.connection_count())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffhub_types::{comparison_channel, RequestId};
    use tokio::sync::mpsc::error::TryRecvError;

    fn notice(text: &str) -> PushMessage {
        PushMessage::new(MessageType::Notice, serde_json::json!({ "text": text }))
    }

    /// Connect and discard the initial `Connected` message.
    fn open(fanout: &NotificationFanout, user: &str) -> (ConnectionId, MessageStream) {
        let (conn, mut stream) = fanout.connect(user).unwrap();
        let hello = stream.try_recv().unwrap();
        assert_eq!(hello.message_type, MessageType::Connected);
        assert_eq!(hello.payload["connectionId"], conn.connection_id.to_string());
        (conn.connection_id, stream)
    }

    #[test]
    fn channel_publish_reaches_only_subscribers() {
        let fanout = NotificationFanout::default();
        let channel = comparison_channel(&RequestId::new());

        let (a, mut a_rx) = open(&fanout, "alice");
        let (b, mut b_rx) = open(&fanout, "bob");
        let (_c, mut c_rx) = open(&fanout, "carol");
        fanout.subscribe("alice", a, [channel.clone()]).unwrap();
        fanout.subscribe("bob", b, [channel.clone()]).unwrap();

        let message = notice("done");
        let report = fanout.publish(Target::Channel(channel), &message);
        assert_eq!(report.delivered_count(), 2);
        assert!(report.failed.is_empty());

        assert_eq!(a_rx.try_recv().unwrap().message_id, message.message_id);
        assert_eq!(b_rx.try_recv().unwrap().message_id, message.message_id);
        assert!(matches!(c_rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn unsubscribed_connection_receives_nothing() {
        let fanout = NotificationFanout::default();
        let (a, mut a_rx) = open(&fanout, "alice");
        fanout.subscribe("alice", a, ["news"]).unwrap();

        assert!(fanout.unsubscribe(&a));
        assert!(!fanout.unsubscribe(&a));

        let report = fanout.publish(Target::Channel("news".into()), &notice("x"));
        assert!(report.is_empty());
        assert!(a_rx.try_recv().is_err());
    }

    #[test]
    fn resubscribe_replaces_channels() {
        let fanout = NotificationFanout::default();
        let (a, mut rx) = open(&fanout, "alice");
        fanout.subscribe("alice", a, ["one", "two"]).unwrap();
        fanout.subscribe("alice", a, ["three"]).unwrap();

        assert_eq!(fanout.subscription_count(), 1);
        assert!(fanout.publish(Target::Channel("one".into()), &notice("x")).is_empty());
        assert_eq!(fanout.publish(Target::Channel("three".into()), &notice("y")).delivered_count(), 1);
        assert_eq!(rx.try_recv().unwrap().payload["text"], "y");
    }

    #[test]
    fn removing_connection_drops_subscription() {
        let fanout = NotificationFanout::default();
        let (a, _rx) = open(&fanout, "alice");
        fanout.subscribe("alice", a, ["c"]).unwrap();

        assert!(fanout.remove_connection(&a).is_some());
        assert!(fanout.subscription(&a).is_none());
        assert_eq!(fanout.connection_count(), 0);
        assert!(fanout.remove_connection(&a).is_none());
    }

    #[test]
    fn subscribe_requires_known_connection_and_owner() {
        let fanout = NotificationFanout::default();
        assert!(matches!(
            fanout.subscribe("alice", ConnectionId::new(), ["c"]),
            Err(NotifyError::UnknownConnection(_))
        ));

        let (a, _rx) = open(&fanout, "alice");
        assert!(matches!(
            fanout.subscribe("mallory", a, ["c"]),
            Err(NotifyError::NotOwner { .. })
        ));
    }

    #[test]
    fn user_and_broadcast_targets() {
        let fanout = NotificationFanout::default();
        let (_a1, mut a1) = open(&fanout, "alice");
        let (_a2, mut a2) = open(&fanout, "alice");
        let (_b, mut b) = open(&fanout, "bob");

        assert_eq!(fanout.publish(Target::User("alice".into()), &notice("u")).delivered_count(), 2);
        assert!(a1.try_recv().is_ok());
        assert!(a2.try_recv().is_ok());
        assert!(b.try_recv().is_err());

        assert_eq!(fanout.publish(Target::Broadcast, &notice("all")).delivered_count(), 3);
    }

    #[test]
    fn dead_connection_does_not_fail_publish() {
        let fanout = NotificationFanout::default();
        let (a, a_rx) = open(&fanout, "alice");
        let (b, mut b_rx) = open(&fanout, "bob");
        fanout.subscribe("alice", a, ["c"]).unwrap();
        fanout.subscribe("bob", b, ["c"]).unwrap();
        drop(a_rx);

        let report = fanout.publish(Target::Channel("c".into()), &notice("x"));
        assert_eq!(report.delivered, vec![b]);
        assert_eq!(report.failed.len(), 1);
        assert!(b_rx.try_recv().is_ok());

        assert!(!fanout.connection(&a).unwrap().is_active);
        assert_eq!(fanout.prune_idle(Duration::from_secs(3600)), vec![a]);
    }

    #[test]
    fn full_buffer_reports_transport_error() {
        let fanout = NotificationFanout::new(NotifyConfig {
            connection_buffer: 1,
            ..NotifyConfig::default()
        });
        // The Connected message fills the single slot.
        let (conn, _rx) = fanout.connect("alice").unwrap();
        let report = fanout.publish(Target::Connection(conn.connection_id), &notice("x"));
        assert!(matches!(report.failed[0], NotifyError::Transport { .. }));
        assert!(fanout.connection(&conn.connection_id).unwrap().is_active);
    }

    #[test]
    fn heartbeat_touches_connection() {
        let fanout = NotificationFanout::default();
        let (a, _rx) = open(&fanout, "alice");
        let before = fanout.connection(&a).unwrap().last_activity_at;

        let ack = fanout.heartbeat(&a).unwrap();
        assert_eq!(ack.connection_id, a);
        assert!(fanout.connection(&a).unwrap().last_activity_at >= before);
        assert!(fanout.heartbeat(&ConnectionId::new()).is_err());
    }

    #[test]
    fn prune_idle_removes_stale_connections() {
        let fanout = NotificationFanout::default();
        let (a, _rx) = open(&fanout, "alice");
        fanout.subscribe("alice", a, ["c"]).unwrap();

        assert!(fanout.prune_idle(Duration::from_secs(3600)).is_empty());
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(fanout.prune_idle(Duration::ZERO), vec![a]);
        assert_eq!(fanout.subscription_count(), 0);
    }

    #[test]
    fn busy_connection_does_not_block_others() {
        let fanout = NotificationFanout::default();
        let (a, _rx_a) = open(&fanout, "alice");
        let (b, mut rx_b) = open(&fanout, "bob");

        let slot = fanout.slot(&a).unwrap();
        let held = lock(&slot);
        fanout.subscribe("bob", b, ["c"]).unwrap();
        fanout.heartbeat(&b).unwrap();
        assert!(fanout.unsubscribe(&b));
        fanout.subscribe("bob", b, ["c"]).unwrap();
        drop(held);

        let report = fanout.publish(Target::Channel("c".into()), &notice("hi"));
        assert_eq!(report.delivered, vec![b]);
        assert_eq!(rx_b.try_recv().unwrap().payload["text"], "hi");
    }
}
