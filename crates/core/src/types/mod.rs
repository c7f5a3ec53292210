//! Core types for Tsitsi.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod order_number;
pub mod period;
pub mod price;
pub mod rating;
pub mod size;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use order_number::OrderNumber;
pub use period::{Granularity, ParsePeriodError, ReportPeriod};
pub use price::{CurrencyCode, Price};
pub use rating::{Rating, RatingError};
pub use size::Size;
pub use status::*;
