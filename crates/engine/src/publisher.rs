//! Real-time push seam.
//!
//! The engine persists notifications itself and then hands the event to a
//! [`Publisher`]. Implementations decide the transport (in-process
//! broadcast, websocket broker, message queue); delivery is best-effort
//! and a failed publish never fails the calling operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Notification, ResourceType};

/// Payload pushed over the real-time channel as the `"notification"` event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub message: String,
    #[serde(rename = "resourceType")]
    pub resource_type: ResourceType,
    #[serde(rename = "resourceId")]
    pub resource_id: String,
    pub household: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&Notification> for NotificationEvent {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id,
            message: notification.message.clone(),
            resource_type: notification.resource_type,
            resource_id: notification.resource_id.clone(),
            household: notification.household_id.clone(),
            timestamp: notification.created_at,
        }
    }
}

/// Capability for pushing a notification to a recipient's live connection.
pub trait Publisher: Send + Sync + std::fmt::Debug {
    /// Pushes `event` to `recipient` if they are currently connected.
    ///
    /// Returns `Err` only for transport faults; "recipient not connected"
    /// is a successful no-op.
    fn publish(&self, recipient: &str, event: &NotificationEvent) -> Result<(), String>;
}

/// Default publisher that drops every event. Used by tests and by
/// deployments without a real-time channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPublisher;

impl Publisher for NoopPublisher {
    fn publish(&self, _recipient: &str, _event: &NotificationEvent) -> Result<(), String> {
        Ok(())
    }
}
