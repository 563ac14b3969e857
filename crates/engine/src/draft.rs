//! The order being composed.

use rust_decimal::Decimal;
use tablecrm_pos_core::{Customer, Organization, Paybox, PriceType, Warehouse};

use crate::cart::{Cart, OrderItem};
use crate::error::ValidationError;

/// Customer, the four reference selections and the cart.
///
/// Created empty, filled in over the first three wizard steps and reset to
/// empty after a successful submission or a logout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderDraft {
    pub customer: Option<Customer>,
    pub warehouse: Option<Warehouse>,
    pub paybox: Option<Paybox>,
    pub organization: Option<Organization>,
    pub price_type: Option<PriceType>,
    pub cart: Cart,
}

impl OrderDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn has_customer(&self) -> bool {
        self.customer.is_some()
    }

    /// First missing reference selection, in screen order.
    #[must_use]
    pub const fn missing_parameter(&self) -> Option<ValidationError> {
        if self.warehouse.is_none() {
            Some(ValidationError::MissingWarehouse)
        } else if self.paybox.is_none() {
            Some(ValidationError::MissingPaybox)
        } else if self.organization.is_none() {
            Some(ValidationError::MissingOrganization)
        } else if self.price_type.is_none() {
            Some(ValidationError::MissingPriceType)
        } else {
            None
        }
    }

    /// Whether warehouse, paybox, organization and price type are all set.
    #[must_use]
    pub const fn parameters_complete(&self) -> bool {
        self.missing_parameter().is_none()
    }

    #[must_use]
    pub fn has_items(&self) -> bool {
        !self.cart.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.cart.total()
    }

    /// Check that everything a sale needs is present and take a snapshot.
    ///
    /// # Errors
    ///
    /// Returns the first missing piece: customer, then each reference
    /// selection, then an empty cart. A total too large to represent is
    /// `TotalOutOfRange`.
    pub fn validate_for_submission(&self) -> Result<ReadyOrder, ValidationError> {
        let customer = self.customer.clone().ok_or(ValidationError::MissingCustomer)?;
        let warehouse = self.warehouse.clone().ok_or(ValidationError::MissingWarehouse)?;
        let paybox = self.paybox.clone().ok_or(ValidationError::MissingPaybox)?;
        let organization = self
            .organization
            .clone()
            .ok_or(ValidationError::MissingOrganization)?;
        let price_type = self
            .price_type
            .clone()
            .ok_or(ValidationError::MissingPriceType)?;
        if self.cart.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        let total = self
            .cart
            .checked_total()
            .ok_or(ValidationError::TotalOutOfRange)?;

        Ok(ReadyOrder {
            customer,
            warehouse,
            paybox,
            organization,
            price_type,
            items: self.cart.items().to_vec(),
            total,
        })
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// A complete draft, ready to be turned into a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyOrder {
    pub customer: Customer,
    pub warehouse: Warehouse,
    pub paybox: Paybox,
    pub organization: Organization,
    pub price_type: PriceType,
    /// Never empty.
    pub items: Vec<OrderItem>,
    total: Decimal,
}

impl ReadyOrder {
    /// Exact order total, checked when the order was validated.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tablecrm_pos_core::{
        CustomerId, KnownCustomer, OrganizationId, PayboxId, PriceTypeId, Product, ProductId,
        WarehouseId,
    };

    /// A draft with every field filled in and one line in the cart.
    pub(crate) fn complete_draft() -> OrderDraft {
        let mut draft = OrderDraft {
            customer: Some(Customer::Persisted(KnownCustomer {
                id: CustomerId::new(1),
                name: "Ivan".to_string(),
                phone: Some("+79991234567".to_string()),
                email: None,
            })),
            warehouse: Some(Warehouse {
                id: WarehouseId::new(10),
                name: "Main".to_string(),
                address: None,
            }),
            paybox: Some(Paybox {
                id: PayboxId::new(20),
                name: "Cash".to_string(),
                balance: None,
                currency: None,
            }),
            organization: Some(Organization {
                id: OrganizationId::new(30),
                name: "LLC".to_string(),
                kind: None,
                inn: None,
            }),
            price_type: Some(PriceType {
                id: PriceTypeId::new(40),
                name: "Retail".to_string(),
                tags: None,
            }),
            cart: Cart::new(),
        };
        draft.cart.add(&Product::new(
            ProductId::new(7),
            "Coffee",
            Some(Decimal::from(150)),
        ));
        draft
    }

    #[test]
    fn test_complete_draft_validates() {
        let draft = complete_draft();
        let ready = draft.validate_for_submission().expect("complete draft");
        assert_eq!(ready.items.len(), 1);
        assert_eq!(ready.total(), Decimal::from(150));
    }

    #[test]
    fn test_validation_reports_first_missing_piece() {
        let mut draft = complete_draft();
        draft.paybox = None;
        draft.price_type = None;
        assert_eq!(
            draft.validate_for_submission(),
            Err(ValidationError::MissingPaybox)
        );
        assert_eq!(draft.missing_parameter(), Some(ValidationError::MissingPaybox));

        draft.customer = None;
        assert_eq!(
            draft.validate_for_submission(),
            Err(ValidationError::MissingCustomer)
        );
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let mut draft = complete_draft();
        draft.cart.clear();
        assert!(draft.parameters_complete());
        assert_eq!(
            draft.validate_for_submission(),
            Err(ValidationError::EmptyCart)
        );
    }

    #[test]
    fn test_oversized_total_is_rejected() {
        let mut draft = complete_draft();
        let id = ProductId::new(7);
        draft.cart.remove(id);
        draft.cart.add(&Product::new(
            id,
            "Gold",
            Some(Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0)),
        ));
        draft.cart.set_quantity(id, 1_000_000_000);

        assert_eq!(
            draft.validate_for_submission(),
            Err(ValidationError::TotalOutOfRange)
        );
        assert_eq!(draft.total(), Decimal::MAX);
    }

    #[test]
    fn test_reset() {
        let mut draft = complete_draft();
        draft.reset();
        assert_eq!(draft, OrderDraft::new());
        assert!(!draft.has_customer());
        assert!(!draft.has_items());
    }
}
