//! Tsitsi Core - Shared types library.
//!
//! This crate provides the domain types used across all Tsitsi components:
//! - `storefront` - Public e-commerce site and staff dashboard
//! - `cli` - Command-line tools for migrations, staff accounts and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Anything that needs a clock or randomness takes it
//! as an argument so the logic stays deterministic under test.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, ratings, statuses
//! - [`pricing`] - Cart and order totals, tax rounding
//! - [`pagination`] - Page clamping for catalog listings
//! - [`slug`] - URL slug generation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pagination;
pub mod pricing;
pub mod slug;
pub mod types;

pub use types::*;
