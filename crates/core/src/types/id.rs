//! Newtype IDs for type-safe references to backend records.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally passing a warehouse id where a paybox id is expected.

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `i64` (TableCRM ids are JSON integers) with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_i64()`
/// - `From<i64>` and `Into<i64>` implementations
///
/// # Example
///
/// ```rust
/// # use tablecrm_pos_core::define_id;
/// define_id!(WarehouseId);
/// define_id!(PayboxId);
///
/// let warehouse = WarehouseId::new(1);
/// let paybox = PayboxId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: WarehouseId = paybox;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Create a new ID from an i64 value.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the underlying i64 value.
            #[must_use]
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Remote collections (contragents, warehouses, payboxes, organizations,
// price_types, nomenclature)
define_id!(CustomerId);
define_id!(WarehouseId);
define_id!(PayboxId);
define_id!(OrganizationId);
define_id!(PriceTypeId);
define_id!(ProductId);
