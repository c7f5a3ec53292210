//! Session-related types.
//!
//! Types stored in the session for authentication and cart state.

use serde::{Deserialize, Serialize};

use tsitsi_core::{Email, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
/// Staff rights are re-read from the database on dashboard requests, so a
/// demotion takes effect without waiting for the session to expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Login name.
    pub username: String,
    /// User's email address.
    pub email: Email,
    /// First name, for greetings.
    pub first_name: String,
    /// Whether the user could reach the dashboard at login time.
    pub is_staff: bool,
}

impl From<&super::user::User> for CurrentUser {
    fn from(user: &super::user::User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            is_staff: user.is_staff,
        }
    }
}

impl CurrentUser {
    /// Name shown in the header.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the anonymous cart key (a UUID).
    pub const CART_KEY: &str = "cart_key";

    /// Key for pending flash messages.
    pub const FLASH: &str = "flash";

    /// Key for order numbers placed by this session, so guests can view their
    /// confirmation page.
    pub const PLACED_ORDERS: &str = "placed_orders";
}
