//! Cartwright Core - Shared cart types library.
//!
//! This crate provides the types used across all Cartwright components:
//! - `storefront` - Cart service and JSON API
//! - `cli` - Command-line tools for migrations and cart inspection
//!
//! # Architecture
//!
//! The core crate contains only types and pure transitions - no I/O, no
//! database access, no HTTP clients. Every cart operation is expressed here as
//! a function from the current [`Cart`] (plus a lookup result) to either a new
//! cart or a [`CartError`]. The storefront decides when to call the lookups and
//! when to persist.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs and display prices
//! - [`cart`] - Line items, stock records, and cart transitions
//! - [`error`] - Cart error taxonomy and user-facing notification text

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod error;
pub mod types;

pub use cart::{Cart, InvalidCart, LineItem, Product, StockRecord};
pub use error::{CartError, CartOperation};
pub use types::*;
