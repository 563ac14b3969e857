//! Reference entities: the fixed vocabularies an order is placed against.
//!
//! Warehouses, payment accounts ("payboxes"), organizations and price types
//! are fetched once per session and never mutated. Selection state compares
//! them by id only.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::decimal::deserialize_lenient;
use super::id::{OrganizationId, PayboxId, PriceTypeId, WarehouseId};
use super::lenient::{lenient_text, null_as_default};

/// Common view over the four reference entity kinds.
pub trait ReferenceEntity {
    /// Id type of this entity kind.
    type Id: Copy + Eq + core::fmt::Debug;

    /// Backend id.
    fn id(&self) -> Self::Id;

    /// Display name.
    fn name(&self) -> &str;
}

macro_rules! impl_reference_entity {
    ($ty:ty, $id:ty) => {
        impl ReferenceEntity for $ty {
            type Id = $id;

            fn id(&self) -> Self::Id {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

/// A warehouse goods are shipped from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub address: Option<String>,
}

/// A payment account the sale is booked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paybox {
    pub id: PayboxId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub balance: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub currency: Option<String>,
}

/// The legal entity selling the goods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_text")]
    pub kind: Option<String>,
    /// Taxpayer identification number.
    #[serde(default, deserialize_with = "lenient_text")]
    pub inn: Option<String>,
}

/// A price list (retail, wholesale, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceType {
    pub id: PriceTypeId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl_reference_entity!(Warehouse, WarehouseId);
impl_reference_entity!(Paybox, PayboxId);
impl_reference_entity!(Organization, OrganizationId);
impl_reference_entity!(PriceType, PriceTypeId);
