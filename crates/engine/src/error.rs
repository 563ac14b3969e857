//! Engine-level errors.
//!
//! [`ValidationError`] covers everything detected locally, before any
//! request is made. [`SaleError`] is what a submission attempt can fail
//! with, and renders the message shown to the cashier.

use thiserror::Error;

use crate::api::ApiError;

/// An order or action rejected locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("select a customer")]
    MissingCustomer,

    #[error("select a warehouse")]
    MissingWarehouse,

    #[error("select a payment account")]
    MissingPaybox,

    #[error("select an organization")]
    MissingOrganization,

    #[error("select a price type")]
    MissingPriceType,

    #[error("add at least one product")]
    EmptyCart,

    #[error("the order total is too large")]
    TotalOutOfRange,

    #[error("reference data has not been loaded")]
    ReferenceDataNotLoaded,

    #[error("access token was rejected, log in again")]
    AuthenticationFailed,

    #[error("the order can only be submitted from the confirmation step")]
    NotAtConfirmation,

    #[error("the order cannot be changed on the confirmation step")]
    DraftLocked,

    #[error("the selected item is not in the loaded list")]
    UnknownSelection,
}

/// A failed sale creation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SaleError {
    /// The draft was incomplete; nothing was sent.
    #[error("Failed to create sale: {0}")]
    Invalid(#[from] ValidationError),

    /// The backend refused the sale or could not be reached.
    #[error("Failed to create sale: {0}")]
    Remote(#[from] ApiError),
}

impl SaleError {
    /// Message for the notification shown to the cashier.
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

/// Errors from persisting the access token.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("token storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("access token cannot be empty")]
    EmptyToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FieldProblem;

    #[test]
    fn test_user_message_for_validation_detail() {
        let error = SaleError::from(ApiError::Validation(vec![FieldProblem {
            message: "field required".to_string(),
            location: vec!["body".to_string(), "0".to_string(), "paybox".to_string()],
        }]));
        assert_eq!(
            error.user_message(),
            "Failed to create sale: 1. field required (field: body.0.paybox)"
        );
    }

    #[test]
    fn test_user_message_for_local_validation() {
        let error = SaleError::from(ValidationError::EmptyCart);
        assert_eq!(
            error.user_message(),
            "Failed to create sale: add at least one product"
        );
    }

    #[test]
    fn test_user_message_for_connectivity() {
        let error = SaleError::from(ApiError::Connectivity("connection refused".to_string()));
        assert_eq!(
            error.user_message(),
            "Failed to create sale: could not reach the server: connection refused"
        );
    }
}
