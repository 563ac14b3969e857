//! Core types for the TableCRM point-of-sale engine.
//!
//! This module provides type-safe wrappers for the remote backend's entities.

pub mod customer;
pub mod decimal;
pub mod id;
pub mod lenient;
pub mod phone;
pub mod product;
pub mod reference;

pub use customer::{Customer, KnownCustomer, WalkInCustomer};
pub use decimal::price_or_zero;
pub use id::*;
pub use phone::{PhoneError, PhoneNumber};
pub use product::Product;
pub use reference::{Organization, Paybox, PriceType, ReferenceEntity, Warehouse};
