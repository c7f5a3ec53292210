//! Order domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use tsitsi_core::{Email, OrderId, OrderItemId, OrderNumber, OrderStatus, ProductId, UserId};

/// Shipping details captured at checkout.
#[derive(Debug, Clone, Serialize)]
pub struct ShippingDetails {
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: Email,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub order_note: String,
}

impl ShippingDetails {
    /// Recipient name.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Non-empty address parts joined with ", ".
    #[must_use]
    pub fn full_address(&self) -> String {
        [
            &self.address_line_1,
            &self.address_line_2,
            &self.city,
            &self.state,
            &self.country,
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

/// A placed order.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: OrderNumber,
    pub user_id: Option<UserId>,
    pub shipping: ShippingDetails,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub order_total: Decimal,
    pub status: OrderStatus,
    pub ip: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One line of a placed order, with the unit price paid.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub size: String,
    pub quantity: i32,
    pub product_price: Decimal,
}

impl OrderItem {
    /// `quantity * product_price`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        tsitsi_core::pricing::line_total(self.product_price, self.quantity)
    }
}

/// An order with its lines.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderWithItems {
    /// Whether `user` may view this order. Guests are checked separately
    /// against the order numbers held in their session.
    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.order.user_id == Some(user)
    }
}
