//! In-process real-time channel.
//!
//! One broadcast channel per recipient, created lazily on first
//! subscription. Publishing to a recipient without subscribers is a
//! successful no-op, matching the engine's "not connected" contract.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::broadcast;

use engine::{NotificationEvent, Publisher};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
pub struct ChannelPublisher {
    channels: RwLock<HashMap<String, broadcast::Sender<NotificationEvent>>>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a live subscription for `recipient`, creating the channel if
    /// this is the first one.
    pub fn subscribe(&self, recipient: &str) -> broadcast::Receiver<NotificationEvent> {
        // Recover from poisoning: the map stays usable either way.
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        channels
            .entry(recipient.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }
}

impl Publisher for ChannelPublisher {
    fn publish(&self, recipient: &str, event: &NotificationEvent) -> Result<(), String> {
        let channels = self
            .channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = channels.get(recipient) {
            // send only errors when every receiver is gone, which is the
            // same as nobody being connected.
            let _ = sender.send(event.clone());
        }
        Ok(())
    }
}
