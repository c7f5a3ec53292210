//! Checkout: turning a cart into an order.
//!
//! Order creation, every stock decrement and clearing the cart happen in a
//! single transaction. A line that cannot be fulfilled rolls the whole
//! order back and leaves the cart untouched.

use chrono::Utc;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use tsitsi_core::pricing::{TaxRate, Totals};
use tsitsi_core::{CartId, Email, OrderId, OrderNumber, ProductId, UserId};

use crate::db::carts::CartRepository;
use crate::db::orders::{NewOrder, OrderRepository};
use crate::db::RepositoryError;
use crate::models::cart::CartLine;
use crate::models::order::ShippingDetails;
use crate::models::user::{Profile, User};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to order.
    #[error("your cart is empty")]
    EmptyCart,

    /// A line asks for more units than are in stock.
    #[error("insufficient stock for {product}")]
    InsufficientStock { product: String },

    /// A product was withdrawn from sale after it was added to the cart.
    #[error("{product} is no longer available")]
    ProductUnavailable { product: String },

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Submitted checkout form. Kept as raw strings so it can be shown again
/// with errors.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ShippingForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub order_note: String,
}

impl ShippingForm {
    /// Prefill from the logged-in user and their saved address.
    #[must_use]
    pub fn prefilled(user: &User, profile: &Profile) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone_number.clone().unwrap_or_default(),
            email: user.email.to_string(),
            address_line_1: profile.address_line_1.clone(),
            address_line_2: profile.address_line_2.clone(),
            city: profile.city.clone(),
            state: profile.state.clone(),
            country: profile.country.clone(),
            order_note: String::new(),
        }
    }

    /// Check required fields and the email address.
    ///
    /// # Errors
    ///
    /// Returns one message per invalid field.
    pub fn validate(&self) -> Result<ShippingDetails, Vec<String>> {
        let mut errors = Vec::new();

        for (value, label) in [
            (&self.first_name, "First name"),
            (&self.last_name, "Last name"),
            (&self.phone, "Phone"),
            (&self.address_line_1, "Address line 1"),
            (&self.city, "City"),
            (&self.country, "Country"),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{label} is required."));
            }
        }

        let email = match Email::parse(&self.email) {
            Ok(email) => Some(email),
            Err(e) => {
                errors.push(format!("Email: {e}."));
                None
            }
        };

        match email {
            Some(email) if errors.is_empty() => Ok(ShippingDetails {
                first_name: self.first_name.trim().to_owned(),
                last_name: self.last_name.trim().to_owned(),
                phone: self.phone.trim().to_owned(),
                email,
                address_line_1: self.address_line_1.trim().to_owned(),
                address_line_2: self.address_line_2.trim().to_owned(),
                city: self.city.trim().to_owned(),
                state: self.state.trim().to_owned(),
                country: self.country.trim().to_owned(),
                order_note: self.order_note.trim().to_owned(),
            }),
            _ => Err(errors),
        }
    }
}

/// A committed order.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order_id: OrderId,
    pub order_number: OrderNumber,
    pub totals: Totals,
}

/// Places orders.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
    tax_rate: TaxRate,
}

impl<'a> CheckoutService<'a> {
    /// Create a checkout service charging `tax_rate`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, tax_rate: TaxRate) -> Self {
        Self { pool, tax_rate }
    }

    /// Place an order for everything in `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart`, `CheckoutError::ProductUnavailable`
    /// or `CheckoutError::InsufficientStock` without changing anything, or
    /// `CheckoutError::Repository` on database failure.
    #[instrument(skip(self, shipping, ip), fields(cart_id = %cart_id))]
    pub async fn place_order(
        &self,
        cart_id: CartId,
        user_id: Option<UserId>,
        shipping: &ShippingDetails,
        ip: Option<&str>,
    ) -> Result<PlacedOrder, CheckoutError> {
        let mut tx = self.pool.begin().await?;

        let mut lines = CartRepository::lines_for_update(&mut tx, cart_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let product_ids = sort_for_locking(&mut lines);
        OrderRepository::lock_products_in(&mut tx, &product_ids).await?;

        if let Some(line) = lines.iter().find(|l| !l.is_available) {
            return Err(CheckoutError::ProductUnavailable {
                product: line.product_name.clone(),
            });
        }

        let totals = Totals::compute(
            lines.iter().map(|l| (l.unit_price, l.quantity)),
            self.tax_rate,
        );
        let order_number = OrderNumber::generate(Utc::now(), user_id, &random_suffix());

        let order_id = OrderRepository::insert_in(
            &mut tx,
            &NewOrder {
                order_number: &order_number,
                user_id,
                shipping,
                subtotal: totals.subtotal,
                tax: totals.tax,
                order_total: totals.total,
                ip,
            },
        )
        .await?;

        for line in &lines {
            OrderRepository::insert_item_in(
                &mut tx,
                order_id,
                line.product_id,
                &line.product_name,
                line.size.as_str(),
                line.quantity,
                line.unit_price,
            )
            .await?;

            if !OrderRepository::reserve_stock_in(&mut tx, line.product_id, line.quantity).await? {
                // Dropping `tx` rolls back the order and earlier decrements.
                return Err(CheckoutError::InsufficientStock {
                    product: line.product_name.clone(),
                });
            }
        }

        CartRepository::clear_in(&mut tx, cart_id).await?;
        tx.commit().await?;

        tracing::info!(
            order_number = %order_number,
            total = %totals.total,
            lines = lines.len(),
            "Order placed"
        );

        Ok(PlacedOrder {
            order_id,
            order_number,
            totals,
        })
    }
}

/// Order lines by product id and return the distinct ids in that order.
///
/// Stock is reserved line by line in this order, the same order in which
/// every checkout locks its products.
fn sort_for_locking(lines: &mut [CartLine]) -> Vec<ProductId> {
    lines.sort_by_key(|l| (l.product_id.as_i32(), l.id.as_i32()));
    let mut ids: Vec<ProductId> = lines.iter().map(|l| l.product_id).collect();
    ids.dedup();
    ids
}

/// Four random alphanumerics for the order number.
fn random_suffix() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(4)
        .map(char::from)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_form() -> ShippingForm {
        ShippingForm {
            first_name: "Hery".into(),
            last_name: "Rakoto".into(),
            phone: "+261 34 00 000 00".into(),
            email: "hery@example.mg".into(),
            address_line_1: "Lot II A 12".into(),
            city: "Antananarivo".into(),
            country: "Madagascar".into(),
            ..ShippingForm::default()
        }
    }

    #[test]
    fn test_valid_form_produces_trimmed_details() {
        let mut form = valid_form();
        form.city = "  Antananarivo ".into();
        let details = form.validate().unwrap();
        assert_eq!(details.city, "Antananarivo");
        assert_eq!(details.email.as_str(), "hery@example.mg");
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let form = ShippingForm {
            email: "nope".into(),
            ..ShippingForm::default()
        };
        let errors = form.validate().unwrap_err();
        // Six required fields plus the email.
        assert_eq!(errors.len(), 7);
        assert!(errors.iter().any(|e| e.starts_with("Email")));
    }

    #[test]
    fn test_optional_fields_may_be_empty() {
        let form = valid_form();
        assert!(form.address_line_2.is_empty());
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_random_suffix_shape() {
        let suffix = random_suffix();
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    fn line(item: i32, product: i32) -> CartLine {
        CartLine {
            id: tsitsi_core::CartItemId::new(item),
            cart_id: CartId::new(1),
            product_id: ProductId::new(product),
            product_name: format!("product {product}"),
            product_url: String::new(),
            image: String::new(),
            size: tsitsi_core::Size::one_size(),
            quantity: 1,
            unit_price: rust_decimal::Decimal::ONE,
            line_total: rust_decimal::Decimal::ONE,
            stock: 10,
            is_available: true,
        }
    }

    #[test]
    fn test_lines_are_locked_in_product_order() {
        // Cart insertion order: product 9, then 3, then 9 in another size.
        let mut lines = vec![line(1, 9), line(2, 3), line(3, 9)];
        let ids = sort_for_locking(&mut lines);

        assert_eq!(ids, vec![ProductId::new(3), ProductId::new(9)]);
        let order: Vec<_> = lines.iter().map(|l| l.id.as_i32()).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn test_opposite_carts_share_one_lock_order() {
        let mut first = vec![line(1, 4), line(2, 7)];
        let mut second = vec![line(3, 7), line(4, 4)];
        assert_eq!(sort_for_locking(&mut first), sort_for_locking(&mut second));
    }
}
