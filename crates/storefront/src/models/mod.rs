//! Domain models for the storefront.
//!
//! These are validated domain types, separate from the `FromRow` row structs
//! in [`crate::db`].

pub mod about;
pub mod cart;
pub mod catalog;
pub mod flash;
pub mod order;
pub mod report;
pub mod review;
pub mod session;
pub mod user;

pub use session::{CurrentUser, keys as session_keys};
