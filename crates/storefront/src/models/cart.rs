//! Cart domain types.

use rust_decimal::Decimal;
use serde::Serialize;

use tsitsi_core::pricing::{TaxRate, Totals};
use tsitsi_core::{CartId, CartItemId, ProductId, Size, UserId};

/// Who a cart belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOwner {
    /// An anonymous visitor, identified by the key stored in their session.
    Session(String),
    /// A logged-in user.
    User(UserId),
}

/// One line of a cart, joined with its product.
#[derive(Debug, Clone, Serialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_url: String,
    pub image: String,
    pub size: Size,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    /// Current stock, used to cap increments.
    pub stock: i32,
    pub is_available: bool,
}

/// A cart with its lines and totals.
#[derive(Debug, Clone, Serialize)]
pub struct CartContents {
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLine>,
    pub totals: Totals,
}

impl CartContents {
    /// A cart that does not exist yet.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            cart_id: None,
            lines: Vec::new(),
            totals: Totals::default(),
        }
    }

    /// Build from lines, pricing each at the product's current price.
    #[must_use]
    pub fn from_lines(cart_id: CartId, lines: Vec<CartLine>, rate: TaxRate) -> Self {
        let totals = Totals::compute(lines.iter().map(|l| (l.unit_price, l.quantity)), rate);
        Self {
            cart_id: Some(cart_id),
            lines,
            totals,
        }
    }

    /// Whether there is nothing to check out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Whether the product is in the cart in any size.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }
}

/// Result of a "+1" from the cart page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    /// Quantity went up.
    Incremented,
    /// Quantity already equals the product's stock.
    AtStockLimit,
}

/// Result of a "-1" from the cart page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// Quantity went down.
    Decremented,
    /// The line held one unit and was removed.
    Removed,
}

/// The cart owner for this request, if the visitor has a cart at all.
///
/// Logged-in users own their cart directly; guests are identified by a key
/// kept in their session.
pub async fn current_owner(
    session: &tower_sessions::Session,
    user: Option<&super::CurrentUser>,
) -> Option<CartOwner> {
    if let Some(user) = user {
        return Some(CartOwner::User(user.id));
    }
    session
        .get::<String>(super::session_keys::CART_KEY)
        .await
        .ok()
        .flatten()
        .map(CartOwner::Session)
}

/// Like [`current_owner`], but gives a guest a new session cart key.
///
/// # Errors
///
/// Returns an error if the session cannot be written.
pub async fn ensure_owner(
    session: &tower_sessions::Session,
    user: Option<&super::CurrentUser>,
) -> Result<CartOwner, tower_sessions::session::Error> {
    if let Some(owner) = current_owner(session, user).await {
        return Ok(owner);
    }
    let key = uuid::Uuid::new_v4().to_string();
    session
        .insert(super::session_keys::CART_KEY, &key)
        .await?;
    Ok(CartOwner::Session(key))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tower_sessions::{MemoryStore, Session};
    use tsitsi_core::Email;

    use super::*;
    use crate::models::CurrentUser;

    fn line(id: i32, product: i32, price: i64, quantity: i32) -> CartLine {
        CartLine {
            id: CartItemId::new(id),
            cart_id: CartId::new(1),
            product_id: ProductId::new(product),
            product_name: format!("Product {product}"),
            product_url: String::new(),
            image: String::new(),
            size: Size::one_size(),
            quantity,
            unit_price: Decimal::new(price, 0),
            line_total: Decimal::new(price * i64::from(quantity), 0),
            stock: 10,
            is_available: true,
        }
    }

    #[test]
    fn test_contents_totals_and_membership() {
        let contents = CartContents::from_lines(
            CartId::new(1),
            vec![line(1, 7, 10_000, 2), line(2, 9, 5_000, 1)],
            TaxRate::default(),
        );
        assert_eq!(contents.totals.subtotal, Decimal::new(25_000, 0));
        assert_eq!(contents.totals.tax, Decimal::new(4_500, 0));
        assert_eq!(contents.totals.total, Decimal::new(29_500, 0));
        assert_eq!(contents.totals.item_count, 3);
        assert!(contents.contains(ProductId::new(9)));
        assert!(!contents.contains(ProductId::new(8)));
        assert!(CartContents::empty().is_empty());
    }

    #[tokio::test]
    async fn test_guest_gets_stable_session_key() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        assert!(current_owner(&session, None).await.is_none());

        let first = ensure_owner(&session, None).await.unwrap();
        let second = ensure_owner(&session, None).await.unwrap();
        assert_eq!(first, second);
        assert!(matches!(first, CartOwner::Session(_)));
    }

    #[tokio::test]
    async fn test_logged_in_user_owns_cart() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let user = CurrentUser {
            id: UserId::new(42),
            username: "hery".into(),
            email: Email::parse("hery@example.mg").unwrap(),
            first_name: "Hery".into(),
            is_staff: false,
        };
        assert_eq!(
            ensure_owner(&session, Some(&user)).await.unwrap(),
            CartOwner::User(UserId::new(42))
        );
    }
}
