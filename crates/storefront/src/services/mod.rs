//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Registration and password login
//! - `checkout` - Turning a cart into an order in one transaction
//! - `email` - Order confirmation and contact form mail over SMTP
//! - `media` - Validating and storing uploaded pictures

pub mod auth;
pub mod checkout;
pub mod email;
pub mod media;
