//! Notification bus
//!
//! A tokio broadcast channel. Services publish through the [`Notifier`]
//! port; delivery workers (mail gateway, log sink) subscribe.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use uuid::Uuid;

use crate::domain::ports::{Notification, Notifier, NotifyError};

const BUS_CAPACITY: usize = 1024;

/// What a subscriber receives: the notification plus a delivery id
#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub notification: Notification,
}

impl From<Notification> for NotificationMessage {
    fn from(notification: Notification) -> Self {
        NotificationMessage {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            notification,
        }
    }
}

pub struct EventBus {
    tx: broadcast::Sender<NotificationMessage>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventBus { tx }
    }

    /// Fan out to current subscribers. Nobody listening is not an error;
    /// the message is simply dropped.
    pub fn publish(&self, notification: Notification) -> usize {
        let message = NotificationMessage::from(notification);
        let delivered = self.tx.send(message).unwrap_or(0);
        debug!("Notification fanned out to {} subscriber(s)", delivered);
        delivered
    }

    pub fn subscribe(&self) -> EventSubscriber {
        EventSubscriber {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct EventSubscriber {
    rx: broadcast::Receiver<NotificationMessage>,
}

impl EventSubscriber {
    /// Next message, or `None` once the bus is gone. A slow subscriber
    /// skips what it missed and carries on.
    pub async fn recv(&mut self) -> Option<NotificationMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Some(message),
                Err(RecvError::Lagged(missed)) => {
                    warn!("Notification subscriber fell behind, {} dropped", missed)
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Whatever is queued right now, without waiting
    pub fn try_recv(&mut self) -> Option<NotificationMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => return Some(message),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

pub type SharedEventBus = Arc<EventBus>;

pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new(BUS_CAPACITY))
}

/// [`Notifier`] that publishes onto the bus
#[derive(Clone)]
pub struct EventBusNotifier {
    bus: SharedEventBus,
}

impl EventBusNotifier {
    pub fn new(bus: SharedEventBus) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl Notifier for EventBusNotifier {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        self.bus.publish(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn created() -> Notification {
        Notification::ReservationCreated {
            user_id: "cust-1".into(),
            reservation_id: 1,
            vehicle_id: 2,
        }
    }

    #[tokio::test]
    async fn notifier_reaches_every_subscriber() {
        let bus = create_event_bus();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        EventBusNotifier::new(bus.clone()).notify(created()).await.unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_millis(100), first.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.notification.recipient(), "cust-1");
        assert_eq!(second.try_recv().unwrap().id, received.id);
        assert!(second.try_recv().is_none());
    }

    #[test]
    fn publishing_without_listeners_is_fine() {
        let bus = EventBus::new(4);
        assert_eq!(bus.publish(created()), 0);

        let sub = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn lagging_subscriber_keeps_latest() {
        let bus = EventBus::new(2);
        let mut sub = bus.subscribe();
        for id in 1..=3 {
            bus.publish(Notification::ReservationCreated {
                user_id: "cust-1".into(),
                reservation_id: id,
                vehicle_id: 2,
            });
        }
        let first = sub.try_recv().unwrap();
        assert!(matches!(
            first.notification,
            Notification::ReservationCreated { reservation_id: 2, .. }
        ));
    }

    #[test]
    fn message_serializes_with_kind_tag() {
        let json = serde_json::to_value(NotificationMessage::from(created())).unwrap();
        assert_eq!(json["kind"], "reservation_created");
        assert_eq!(json["reservation_id"], 1);
        assert!(json["id"].is_string());
    }
}
