//! Core types for Urban Shoes.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod money;
pub mod product;

pub use id::*;
pub use money::{CurrencyCode, Money};
pub use product::ProductRecord;
