//! Cartwright Storefront library.
//!
//! This crate provides the cart service as a library, allowing it to be
//! tested and reused. The binary in `main.rs` wires it to the environment.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
