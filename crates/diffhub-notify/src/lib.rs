//! Notification fan-out for diffhub.
//!
//! Tracks live client connections and their channel subscriptions, and
//! pushes [`diffhub_types::PushMessage`]s to the connections an event
//! targets. Delivery is best-effort: each connection is attempted
//! independently, failures are logged, and nothing is retried. Clients that
//! miss an event recover by polling the result endpoint.
//!
//! # Key Types
//!
//! - [`NotificationFanout`] -- connection/subscription registry and publisher
//! - [`Target`] -- channel, connection, user, or broadcast addressing
//! - [`ConnectionSink`] / [`ChannelSink`] -- per-connection delivery
//! - [`MessageBus`] / [`BroadcastBus`] -- typed cross-service eventing

pub mod bus;
pub mod config;
pub mod error;
pub mod fanout;
pub mod sink;

pub use bus::{BroadcastBus, BusMessage, BusStream, MessageBus};
pub use config::NotifyConfig;
pub use error::{NotifyError, NotifyResult};
pub use fanout::{HeartbeatAck, NotificationFanout, PublishReport, Target};
pub use sink::{ChannelSink, ConnectionSink, MessageStream};
