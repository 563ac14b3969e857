//! Customers ("contragents") an order can be placed for.
//!
//! A customer is either a record the backend already knows about, or a
//! walk-in buyer identified only by the phone number the cashier typed.
//! The two are kept apart by the [`Customer`] variant rather than by any id
//! range, so a walk-in can never be mistaken for a stored record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::CustomerId;
use super::lenient::{lenient_text, null_as_default};
use super::phone::PhoneNumber;

/// Name prefix for customers synthesized from a phone number.
pub const WALK_IN_NAME_PREFIX: &str = "Клиент";

/// A customer record fetched from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownCustomer {
    pub id: CustomerId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
}

impl KnownCustomer {
    /// Whether the stored phone contains `digits` as a substring.
    ///
    /// The stored phone is compared as-is, exactly as the backend returned it.
    #[must_use]
    pub fn phone_contains(&self, digits: &str) -> bool {
        !digits.is_empty()
            && self
                .phone
                .as_deref()
                .is_some_and(|phone| phone.contains(digits))
    }
}

/// A walk-in customer that exists only inside the current draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkInCustomer {
    /// Random id, unique per synthesized customer.
    pub temp_id: Uuid,
    pub name: String,
    pub phone: PhoneNumber,
}

impl WalkInCustomer {
    /// Synthesize a walk-in customer named after its phone number.
    #[must_use]
    pub fn from_phone(phone: PhoneNumber) -> Self {
        Self {
            temp_id: Uuid::new_v4(),
            name: format!("{WALK_IN_NAME_PREFIX} {phone}"),
            phone,
        }
    }
}

/// The buyer attached to an order draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Customer {
    /// A record stored in the backend.
    Persisted(KnownCustomer),
    /// A buyer synthesized from a typed phone number.
    Ephemeral(WalkInCustomer),
}

impl Customer {
    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Persisted(c) => &c.name,
            Self::Ephemeral(c) => &c.name,
        }
    }

    /// Phone number for display, if any.
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        match self {
            Self::Persisted(c) => c.phone.as_deref(),
            Self::Ephemeral(c) => Some(c.phone.as_str()),
        }
    }

    /// Email address, known only for persisted customers.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        match self {
            Self::Persisted(c) => c.email.as_deref(),
            Self::Ephemeral(_) => None,
        }
    }

    /// Backend id, `None` for walk-in customers.
    #[must_use]
    pub const fn persisted_id(&self) -> Option<CustomerId> {
        match self {
            Self::Persisted(c) => Some(c.id),
            Self::Ephemeral(_) => None,
        }
    }

    #[must_use]
    pub const fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Ephemeral(_))
    }
}

impl From<KnownCustomer> for Customer {
    fn from(customer: KnownCustomer) -> Self {
        Self::Persisted(customer)
    }
}

impl From<WalkInCustomer> for Customer {
    fn from(customer: WalkInCustomer) -> Self {
        Self::Ephemeral(customer)
    }
}
