//! Domain events
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use uuid::Uuid;
use crate::domain::aggregates::{Order, OrderStatus, Product};

#[derive(Clone, Debug)]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug)]
pub enum ProductEvent {
    Created(Box<Product>),
    Updated(Box<Product>),
    Deleted { product_id: Uuid },
}

#[derive(Clone, Debug)]
pub enum OrderEvent {
    Created { order: Box<Order>, at: DateTime<Utc> },
    StatusChanged { order_id: Uuid, vendor_id: Uuid, customer_id: Uuid, status: OrderStatus, at: DateTime<Utc> },
}

/// Who should hear about an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Vendor(Uuid),
    Customer(Uuid),
    Everyone,
}

impl DomainEvent {
    /// Event name as seen by socket clients.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Product(_) => "products/update",
            Self::Order(OrderEvent::Created { .. }) => "new-order",
            Self::Order(OrderEvent::StatusChanged { .. }) => "order-update",
        }
    }

    pub fn audiences(&self) -> Vec<Audience> {
        match self {
            Self::Product(_) => vec![Audience::Everyone],
            Self::Order(OrderEvent::Created { order, .. }) => vec![Audience::Vendor(order.vendor_id)],
            Self::Order(OrderEvent::StatusChanged { vendor_id, customer_id, .. }) => {
                vec![Audience::Vendor(*vendor_id), Audience::Customer(*customer_id)]
            }
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::Product(ProductEvent::Created(p)) => json!({ "action": "create", "product": p }),
            Self::Product(ProductEvent::Updated(p)) => json!({ "action": "update", "product": p }),
            Self::Product(ProductEvent::Deleted { product_id }) => json!({ "action": "delete", "productId": product_id }),
            Self::Order(OrderEvent::Created { order, at }) => json!({ "order": order, "timestamp": at }),
            Self::Order(OrderEvent::StatusChanged { order_id, status, at, .. }) => {
                json!({ "orderId": order_id, "status": status, "timestamp": at })
            }
        }
    }
}
