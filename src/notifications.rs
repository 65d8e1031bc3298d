//! Real-time fan-out of domain events.
//!
//! Every event goes to the rooms of its audiences (`vendor-{id}`,
//! `user-{id}` or the shared `products` feed) and, when a NATS client is
//! configured, to the subject `marketplace.<event>`. Delivery is best
//! effort: rooms nobody listens to are skipped and lagging sockets lose the
//! oldest messages.

use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::events::{Audience, DomainEvent};

pub const PRODUCTS_ROOM: &str = "products";
pub const ROOM_CAPACITY: usize = 256;
pub const SUBJECT_PREFIX: &str = "marketplace";

/// Frame pushed to socket clients.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Notification {
    pub event: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl Notification {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self { event: event.into(), data }
    }
}

impl From<&DomainEvent> for Notification {
    fn from(event: &DomainEvent) -> Self {
        Self::new(event.name(), event.payload())
    }
}

pub fn vendor_room(vendor_id: Uuid) -> String { format!("vendor-{vendor_id}") }
pub fn user_room(user_id: Uuid) -> String { format!("user-{user_id}") }

pub fn room_for(audience: Audience) -> String {
    match audience {
        Audience::Vendor(id) => vendor_room(id),
        Audience::Customer(id) => user_room(id),
        Audience::Everyone => PRODUCTS_ROOM.to_string(),
    }
}

/// NATS subject for an event name; `/` becomes a subject separator.
pub fn subject_for(event: &str) -> String {
    format!("{SUBJECT_PREFIX}.{}", event.replace('/', "."))
}

/// Named broadcast channels, created on first subscription.
#[derive(Clone)]
pub struct Rooms {
    rooms: Arc<DashMap<String, broadcast::Sender<Arc<Notification>>>>,
    capacity: usize,
}

impl Rooms {
    pub fn new(capacity_per_room: usize) -> Self {
        Self { rooms: Arc::new(DashMap::new()), capacity: capacity_per_room }
    }

    pub fn subscribe(&self, name: &str) -> broadcast::Receiver<Arc<Notification>> {
        self.rooms
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// One stream over several rooms. Lagged receivers skip ahead.
    pub fn subscribe_all(&self, names: &[String]) -> BoxStream<'static, Arc<Notification>> {
        let streams = names.iter().map(|name| {
            stream::unfold(self.subscribe(name), |mut rx| async move {
                loop {
                    match rx.recv().await {
                        Ok(n) => return Some((n, rx)),
                        Err(RecvError::Lagged(skipped)) => debug!(skipped, "subscriber lagged"),
                        Err(RecvError::Closed) => return None,
                    }
                }
            })
            .boxed()
        });
        stream::select_all(streams).boxed()
    }

    /// Sends to a room and returns how many subscribers received it.
    pub fn send(&self, name: &str, notification: Arc<Notification>) -> usize {
        self.rooms.get(name).map_or(0, |tx| tx.send(notification).unwrap_or(0))
    }

    /// Drops rooms that no longer have subscribers.
    pub fn prune(&self, names: &[String]) {
        for name in names {
            self.rooms.remove_if(name, |_, tx| tx.receiver_count() == 0);
        }
    }

    pub fn len(&self) -> usize { self.rooms.len() }
    pub fn is_empty(&self) -> bool { self.rooms.is_empty() }
}

impl Default for Rooms {
    fn default() -> Self { Self::new(ROOM_CAPACITY) }
}

#[derive(Clone, Default)]
pub struct Notifier {
    rooms: Rooms,
    nats: Option<async_nats::Client>,
}

impl Notifier {
    pub fn new(nats: Option<async_nats::Client>) -> Self {
        Self { rooms: Rooms::default(), nats }
    }

    pub fn rooms(&self) -> &Rooms { &self.rooms }

    pub async fn dispatch(&self, events: Vec<DomainEvent>) {
        for event in events {
            let notification = Arc::new(Notification::from(&event));
            for audience in event.audiences() {
                let room = room_for(audience);
                let delivered = self.rooms.send(&room, notification.clone());
                debug!(event = event.name(), %room, delivered, "notification sent");
            }
            if let Some(nats) = &self.nats {
                self.publish(nats, &notification).await;
            }
        }
    }

    async fn publish(&self, nats: &async_nats::Client, notification: &Notification) {
        let subject = subject_for(&notification.event);
        let payload = match serde_json::to_vec(&notification.data) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, %subject, "failed to encode event");
                return;
            }
        };
        if let Err(e) = nats.publish(subject.clone(), payload.into()).await {
            warn!(error = %e, %subject, "failed to publish event");
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier").field("rooms", &self.rooms.len()).field("nats", &self.nats.is_some()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{OrderEvent, ProductEvent};
    use crate::domain::aggregates::OrderStatus;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_room_names() {
        let id = Uuid::now_v7();
        assert_eq!(room_for(Audience::Vendor(id)), format!("vendor-{id}"));
        assert_eq!(room_for(Audience::Customer(id)), format!("user-{id}"));
        assert_eq!(room_for(Audience::Everyone), "products");
        assert_eq!(subject_for("products/update"), "marketplace.products.update");
        assert_eq!(subject_for("new-order"), "marketplace.new-order");
    }

    #[test]
    fn test_send_without_subscribers_is_dropped() {
        let rooms = Rooms::default();
        assert_eq!(rooms.send("vendor-x", Arc::new(Notification::new("new-order", json!({})))), 0);
        assert!(rooms.is_empty());
    }

    #[tokio::test]
    async fn test_status_change_reaches_vendor_and_customer() {
        let notifier = Notifier::default();
        let (vendor, customer) = (Uuid::now_v7(), Uuid::now_v7());
        let mut vendor_rx = notifier.rooms().subscribe(&vendor_room(vendor));
        let mut customer_rx = notifier.rooms().subscribe(&user_room(customer));
        let mut other_rx = notifier.rooms().subscribe(&vendor_room(Uuid::now_v7()));

        notifier
            .dispatch(vec![DomainEvent::Order(OrderEvent::StatusChanged {
                order_id: Uuid::now_v7(), vendor_id: vendor, customer_id: customer,
                status: OrderStatus::Shipped, at: Utc::now(),
            })])
            .await;

        assert_eq!(vendor_rx.recv().await.unwrap().event, "order-update");
        assert_eq!(customer_rx.recv().await.unwrap().data["status"], "shipped");
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribe_all_merges_rooms() {
        let rooms = Rooms::default();
        let names = vec!["user-a".to_string(), PRODUCTS_ROOM.to_string()];
        let mut stream = rooms.subscribe_all(&names);
        rooms.send("user-a", Arc::new(Notification::new("order-update", Value::Null)));
        rooms.send(PRODUCTS_ROOM, Arc::new(Notification::from(&DomainEvent::Product(ProductEvent::Deleted { product_id: Uuid::nil() }))));
        let mut events = vec![stream.next().await.unwrap().event.clone(), stream.next().await.unwrap().event.clone()];
        events.sort();
        assert_eq!(events, ["order-update", "products/update"]);
        drop(stream);
        rooms.prune(&names);
        assert!(rooms.is_empty());
    }

    #[test]
    fn test_pong_frame_omits_data() {
        let frame = serde_json::to_value(Notification::new("pong", Value::Null)).unwrap();
        assert_eq!(frame, json!({ "event": "pong" }));
    }
}
