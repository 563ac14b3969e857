//! Decides which customer a typed phone number or a list pick refers to.
//!
//! Typed input is re-evaluated on every change. A valid phone binds the
//! first loaded customer whose stored phone contains the typed digits;
//! otherwise a walk-in customer is synthesized for it.

use tablecrm_pos_core::{Customer, KnownCustomer, PhoneError, PhoneNumber, WalkInCustomer};

/// Outcome of feeding input to the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The draft's customer should become this one.
    Bound(Customer),
    /// The draft's walk-in customer should be removed.
    Cleared,
    /// Leave the draft's customer as it is.
    Unchanged,
    /// The input is not a valid phone yet; nothing changes.
    Invalid(PhoneError),
}

/// State of the phone field on the customer step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerResolver {
    phone_input: String,
    phone_error: Option<PhoneError>,
}

impl CustomerResolver {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phone_input: String::new(),
            phone_error: None,
        }
    }

    /// Text currently in the phone field.
    #[must_use]
    pub fn phone_input(&self) -> &str {
        &self.phone_input
    }

    /// Why the current input is not a valid phone, if it isn't.
    #[must_use]
    pub const fn phone_error(&self) -> Option<&PhoneError> {
        self.phone_error.as_ref()
    }

    /// Record new phone field text and resolve it.
    ///
    /// `known` is searched in order; the first match wins.
    pub fn type_phone(
        &mut self,
        input: &str,
        known: &[KnownCustomer],
        current: Option<&Customer>,
    ) -> Resolution {
        self.phone_input = input.to_string();

        if input.trim().is_empty() {
            self.phone_error = None;
            return match current {
                Some(Customer::Ephemeral(_)) => Resolution::Cleared,
                _ => Resolution::Unchanged,
            };
        }

        let phone = match PhoneNumber::parse(input) {
            Ok(phone) => phone,
            Err(error) => {
                self.phone_error = Some(error.clone());
                return Resolution::Invalid(error);
            }
        };
        self.phone_error = None;

        Self::resolve(phone, known, current)
    }

    /// Bind a customer picked from a list and back-fill the phone field.
    pub fn select(&mut self, customer: KnownCustomer) -> Customer {
        if let Some(phone) = &customer.phone {
            self.phone_input.clone_from(phone);
            self.phone_error = None;
        }
        Customer::Persisted(customer)
    }

    /// Empty the phone field.
    pub fn clear(&mut self) {
        self.phone_input.clear();
        self.phone_error = None;
    }

    fn resolve(phone: PhoneNumber, known: &[KnownCustomer], current: Option<&Customer>) -> Resolution {
        if let Some(found) = known.iter().find(|c| c.phone_contains(phone.digits())) {
            if current.and_then(Customer::persisted_id) == Some(found.id) {
                return Resolution::Unchanged;
            }
            return Resolution::Bound(Customer::Persisted(found.clone()));
        }

        if let Some(Customer::Ephemeral(bound)) = current
            && bound.phone.same_number(&phone)
        {
            return Resolution::Unchanged;
        }

        Resolution::Bound(Customer::Ephemeral(WalkInCustomer::from_phone(phone)))
    }
}
