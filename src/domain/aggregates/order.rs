//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{ensure_non_negative, max_amount};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub public_id: Option<String>,
    pub customer_id: Uuid,
    pub vendor_id: Uuid,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub shipping_address: Option<Address>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    /// SKU of the embedded variant, when a specific configuration was bought.
    pub variant_sku: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
}

impl OrderItem {
    pub fn line_total(&self) -> Option<Decimal> { self.price.checked_mul(Decimal::from(self.quantity)) }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: Option<String>,
    pub zip_code: String,
    pub country: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

impl OrderStatus {
    pub fn is_terminal(self) -> bool { matches!(self, Self::Cancelled) }
}

impl Order {
    /// Places an order for one vendor. Raises `OrderEvent::Created`.
    pub fn place(customer_id: Uuid, vendor_id: Uuid, items: Vec<OrderItem>, shipping_address: Option<Address>) -> Result<Self, OrderError> {
        if items.is_empty() { return Err(OrderError::NoItems); }
        for item in &items {
            if item.quantity == 0 { return Err(OrderError::InvalidQuantity); }
            ensure_non_negative(item.price).map_err(|_| OrderError::NegativePrice)?;
        }
        let now = Utc::now();
        let total_amount = items
            .iter()
            .try_fold(Decimal::ZERO, |total, item| item.line_total().and_then(|line| total.checked_add(line)))
            .filter(|total| *total <= max_amount())
            .ok_or(OrderError::AmountOverflow)?;
        let mut order = Self {
            id: Uuid::now_v7(), public_id: None, customer_id, vendor_id, items, total_amount,
            status: OrderStatus::Pending, shipping_address, payment_status: PaymentStatus::Pending,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Created { order: Box::new(order.clone()), at: now }));
        Ok(order)
    }

    /// Rebuilds an order read back from storage.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: Uuid, public_id: Option<String>, customer_id: Uuid, vendor_id: Uuid, items: Vec<OrderItem>,
        total_amount: Decimal, status: OrderStatus, shipping_address: Option<Address>,
        payment_status: PaymentStatus, created_at: DateTime<Utc>, updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id, public_id, customer_id, vendor_id, items, total_amount, status, shipping_address,
            payment_status, created_at, updated_at, events: vec![],
        }
    }

    pub fn update_status(&mut self, status: OrderStatus) -> Result<(), OrderError> {
        if self.status.is_terminal() && status != self.status { return Err(OrderError::AlreadyCancelled); }
        if self.status == OrderStatus::Delivered && status == OrderStatus::Cancelled { return Err(OrderError::CannotCancel); }
        self.status = status;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged {
            order_id: self.id, vendor_id: self.vendor_id, customer_id: self.customer_id, status, at: self.updated_at,
        }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Quantity must be at least 1")]
    InvalidQuantity,
    #[error("Price must not be negative")]
    NegativePrice,
    #[error("Order total is too large")]
    AmountOverflow,
    #[error("Delivered orders cannot be cancelled")]
    CannotCancel,
    #[error("Order is cancelled")]
    AlreadyCancelled,
}
