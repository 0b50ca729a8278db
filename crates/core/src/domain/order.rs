// Order Domain Model

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::entity::{ensure_id, ensure_not_blank, Entity, EntityId};
use super::error::{DomainError, Result};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Allowed forward transitions. Delivered and Cancelled are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Shipped)
                | (Confirmed, Cancelled)
                | (Shipped, Delivered)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Confirmed => write!(f, "Confirmed"),
            OrderStatus::Shipped => write!(f, "Shipped"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Confirmed" => Ok(OrderStatus::Confirmed),
            "Shipped" => Ok(OrderStatus::Shipped),
            "Delivered" => Ok(OrderStatus::Delivered),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Line item owned by an order (no identity of its own)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: EntityId,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: f64,
}

impl OrderItem {
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: f64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> f64 {
        self.quantity as f64 * self.unit_price
    }
}

/// Customer order with its owned line items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: EntityId,
    pub customer_id: EntityId,
    pub order_date: i64, // epoch ms
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub total_amount: f64,

    pub created_at: i64,
    pub updated_at: Option<i64>,
}

impl Order {
    pub fn new(
        id: impl Into<String>,
        customer_id: impl Into<String>,
        order_date: i64,
        items: Vec<OrderItem>,
    ) -> Self {
        let mut order = Self {
            id: id.into(),
            customer_id: customer_id.into(),
            order_date,
            status: OrderStatus::Pending,
            items,
            total_amount: 0.0,
            created_at: 0,
            updated_at: None,
        };
        order.recalculate_total();
        order
    }

    /// Recompute `total_amount` from the line items
    pub fn recalculate_total(&mut self) {
        self.total_amount = self.items.iter().map(OrderItem::line_total).sum();
    }

    /// Move to `next` if the lifecycle allows it
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        Ok(())
    }
}

impl Entity for Order {
    const KIND: &'static str = "order";
    // items are an owned collection and not addressable by predicates
    const FIELDS: &'static [&'static str] = &[
        "id",
        "customerId",
        "orderDate",
        "status",
        "totalAmount",
        "createdAt",
        "updatedAt",
    ];
    const TEXT_FIELDS: &'static [&'static str] = &["id", "customerId", "status"];

    fn id(&self) -> &str {
        &self.id
    }

    fn created_at(&self) -> i64 {
        self.created_at
    }

    fn updated_at(&self) -> Option<i64> {
        self.updated_at
    }

    fn stamp_created(&mut self, now_millis: i64) {
        self.created_at = now_millis;
        self.updated_at = None;
    }

    fn stamp_updated(&mut self, now_millis: i64) {
        self.updated_at = Some(now_millis);
    }

    fn validate(&self) -> Result<()> {
        ensure_id(&self.id)?;
        ensure_not_blank("customerId", &self.customer_id)?;
        for item in &self.items {
            ensure_not_blank("productId", &item.product_id)?;
            if item.quantity <= 0 {
                return Err(DomainError::ValidationError(format!(
                    "quantity for product {} must be positive",
                    item.product_id
                )));
            }
            if !item.unit_price.is_finite() || item.unit_price < 0.0 {
                return Err(DomainError::ValidationError(format!(
                    "unitPrice for product {} must be non-negative",
                    item.product_id
                )));
            }
        }
        Ok(())
    }
}
