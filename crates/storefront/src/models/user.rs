//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use tsitsi_core::{Email, UserId};

/// A storefront account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Unique login name.
    pub username: String,
    /// Unique email address.
    pub email: Email,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact phone number.
    pub phone_number: Option<String>,
    /// Inactive accounts cannot log in.
    pub is_active: bool,
    /// Staff can use the dashboard.
    pub is_staff: bool,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// First and last name, or the username when both are blank.
    #[must_use]
    pub fn full_name(&self) -> String {
        let name = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let name = name.trim();
        if name.is_empty() {
            self.username.clone()
        } else {
            name.to_owned()
        }
    }
}

/// Address and picture kept alongside every account.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Profile {
    pub user_id: Option<UserId>,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub country: String,
    /// Path under the media directory.
    pub profile_picture: Option<String>,
}

impl Profile {
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

/// Fields a user may change on their profile page.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub address_line_1: String,
    pub address_line_2: String,
    pub city: String,
    pub state: String,
    pub country: String,
    /// New picture path; `None` keeps the current one.
    pub profile_picture: Option<String>,
}

/// Data needed to create an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub is_staff: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_address_skips_blank_parts() {
        let profile = Profile {
            address_line_1: "Lot II M 85".to_owned(),
            address_line_2: "  ".to_owned(),
            city: "Antananarivo".to_owned(),
            country: "Madagascar".to_owned(),
            ..Profile::default()
        };
        assert_eq!(
            profile.full_address(),
            "Lot II M 85, Antananarivo, Madagascar"
        );
    }

    #[test]
    fn test_full_address_empty() {
        assert_eq!(Profile::default().full_address(), "");
    }
}
