//! Foundation types for diffhub.
//!
//! This crate provides the data model shared by every other diffhub crate:
//! identifiers, the comparison request lifecycle, structured diff results, and
//! the connection/subscription records used by the notification fan-out.
//!
//! # Key Types
//!
//! - [`RequestId`] / [`ConnectionId`] / [`SubscriptionId`] / [`MessageId`]: UUID v7 identifiers
//! - [`ComparisonRequest`] / [`ComparisonStatus`]: request record and its lifecycle
//! - [`DiffResult`] / [`FileDiff`] / [`LineDiff`]: computed comparison output
//! - [`Connection`] / [`Subscription`]: live client sessions and channel interest
//! - [`PushMessage`]: envelope pushed to subscribed connections

pub mod connection;
pub mod diff;
pub mod error;
pub mod id;
pub mod message;
pub mod request;

pub use connection::{comparison_channel, Connection, Subscription, COMPARISON_CHANNEL_PREFIX};
pub use diff::{ChangeType, DiffResult, FileDiff, LineDiff, LineType};
pub use error::TypeError;
pub use id::{ConnectionId, MessageId, RequestId, SubscriptionId};
pub use message::{MessageType, PushMessage};
pub use request::{ComparisonRequest, ComparisonStatus};
