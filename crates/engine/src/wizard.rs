//! The four-step order wizard.
//!
//! Steps are strictly linear. Moving forward requires the current step to
//! be complete; moving back is always allowed.

use serde::{Deserialize, Serialize};

use crate::catalog::ReferenceData;
use crate::draft::OrderDraft;
use crate::error::ValidationError;

/// A wizard step, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Customer,
    Parameters,
    Items,
    Confirmation,
}

impl WizardStep {
    /// Zero-based position.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Customer => 0,
            Self::Parameters => 1,
            Self::Items => 2,
            Self::Confirmation => 3,
        }
    }

    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Customer => Some(Self::Parameters),
            Self::Parameters => Some(Self::Items),
            Self::Items => Some(Self::Confirmation),
            Self::Confirmation => None,
        }
    }

    #[must_use]
    pub const fn previous(self) -> Option<Self> {
        match self {
            Self::Customer => None,
            Self::Parameters => Some(Self::Customer),
            Self::Items => Some(Self::Parameters),
            Self::Confirmation => Some(Self::Items),
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Customer => "Customer",
            Self::Parameters => "Parameters",
            Self::Items => "Items",
            Self::Confirmation => "Confirmation",
        }
    }
}

impl std::fmt::Display for WizardStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Current wizard step plus the rules for leaving it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepGate {
    step: WizardStep,
}

impl StepGate {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            step: WizardStep::Customer,
        }
    }

    #[must_use]
    pub const fn step(&self) -> WizardStep {
        self.step
    }

    /// Check whether the current step is complete.
    ///
    /// # Errors
    ///
    /// Returns what is still missing. On the customer step a rejected token
    /// is reported before anything else and stays reported until the
    /// session is re-authenticated.
    pub fn check(&self, draft: &OrderDraft, reference: &ReferenceData) -> Result<(), ValidationError> {
        match self.step {
            WizardStep::Customer => {
                if reference.is_auth_failed() {
                    return Err(ValidationError::AuthenticationFailed);
                }
                if !reference.token_validated() {
                    return Err(ValidationError::ReferenceDataNotLoaded);
                }
                if !draft.has_customer() {
                    return Err(ValidationError::MissingCustomer);
                }
                Ok(())
            }
            WizardStep::Parameters => draft.missing_parameter().map_or(Ok(()), Err),
            WizardStep::Items => {
                if !draft.has_items() {
                    Err(ValidationError::EmptyCart)
                } else if draft.cart.checked_total().is_none() {
                    Err(ValidationError::TotalOutOfRange)
                } else {
                    Ok(())
                }
            }
            WizardStep::Confirmation => Ok(()),
        }
    }

    /// Advance one step if the current one is complete.
    ///
    /// Staying on the confirmation step is not an error.
    ///
    /// # Errors
    ///
    /// Returns what is still missing on the current step.
    pub fn next(
        &mut self,
        draft: &OrderDraft,
        reference: &ReferenceData,
    ) -> Result<WizardStep, ValidationError> {
        self.check(draft, reference)?;
        if let Some(next) = self.step.next() {
            self.step = next;
        }
        Ok(self.step)
    }

    /// Go back one step. No-op on the first step.
    pub fn back(&mut self) -> WizardStep {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
        }
        self.step
    }

    pub fn reset(&mut self) {
        self.step = WizardStep::Customer;
    }

    /// Check that a submission may start from here.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotAtConfirmation`] on any other step.
    pub const fn ensure_confirmation(&self) -> Result<(), ValidationError> {
        match self.step {
            WizardStep::Confirmation => Ok(()),
            _ => Err(ValidationError::NotAtConfirmation),
        }
    }
}
