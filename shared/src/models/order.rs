//! Storefront Order Model

use serde::{Deserialize, Serialize};

/// Customer order status
///
/// `partially_shipped`, `shipped` and `delivered` are aggregates derived
/// from the order's fulfillment orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OrderStatus {
    AwaitingPayment,
    Paid,
    PartiallyShipped,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingPayment => "awaiting_payment",
            Self::Paid => "paid",
            Self::PartiallyShipped => "partially_shipped",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Customer order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub id: i64,
    /// Human-readable order number (unique, shown to customers)
    pub order_number: String,
    pub customer_email: Option<String>,
    pub total_cents: i64,
    /// Packaging cost booked against this order
    pub packaging_cents: i64,
    /// Outbound shipping cost booked against this order
    pub shipping_cents: i64,
    /// Customs and duties booked against this order
    pub customs_cents: i64,
    pub status: OrderStatus,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    /// Gateway payment reference (payment intent id)
    pub payment_ref: Option<String>,
    pub created_at: i64,
    pub paid_at: Option<i64>,
    pub updated_at: i64,

    #[cfg_attr(feature = "db", sqlx(skip))]
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

/// Order line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub producer_id: i64,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// What the producer charges us per unit
    pub unit_cost_cents: i64,
}

/// Create order payload (storefront checkout)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCreate {
    pub order_number: String,
    pub customer_email: Option<String>,
    #[serde(default)]
    pub packaging_cents: i64,
    #[serde(default)]
    pub shipping_cents: i64,
    #[serde(default)]
    pub customs_cents: i64,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub items: Vec<OrderItemCreate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemCreate {
    pub producer_id: i64,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub unit_cost_cents: i64,
}

impl OrderCreate {
    /// Order total is always derived from the lines
    pub fn total_cents(&self) -> i64 {
        self.items
            .iter()
            .map(|i| i.quantity * i.unit_price_cents)
            .sum()
    }
}
