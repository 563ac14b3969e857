//! Catalog products (TableCRM "nomenclature").

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::decimal::{deserialize_lenient, price_or_zero};
use super::id::ProductId;
use super::lenient::{lenient_text, null_as_default};

/// A product snapshot taken when the catalog was fetched.
///
/// Price and stock may be stale by the time the order is submitted; the
/// engine never re-checks them against the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub article: Option<String>,
    /// Unit price, `None` when the backend sent nothing usable.
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub price: Option<Decimal>,
    /// Stock on hand, advisory only.
    #[serde(default, rename = "quantity", deserialize_with = "deserialize_lenient")]
    pub stock: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub unit: Option<String>,
}

impl Product {
    /// Create a product with a known price and no stock information.
    #[must_use]
    pub fn new(id: ProductId, name: impl Into<String>, price: Option<Decimal>) -> Self {
        Self {
            id,
            name: name.into(),
            article: None,
            price,
            stock: None,
            unit: None,
        }
    }

    /// Price used for totals and the sale payload.
    #[must_use]
    pub fn price_or_zero(&self) -> Decimal {
        price_or_zero(self.price)
    }

    /// `false` only when the backend reported no stock at all.
    #[must_use]
    pub fn is_in_stock(&self) -> bool {
        self.stock.is_none_or(|stock| stock > Decimal::ZERO)
    }
}
