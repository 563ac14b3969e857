//! TableCRM POS Core - Shared domain types.
//!
//! This crate provides the types the point-of-sale engine and its
//! presentation layers agree on:
//! - customers (persisted or walk-in), products and reference entities
//! - type-safe ids for every remote collection
//! - phone number validation and formatting
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. This keeps it lightweight and usable from any
//! presentation layer.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, phone numbers, customers, catalog entities

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
