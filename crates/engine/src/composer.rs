//! The order composition facade a presentation layer drives.
//!
//! [`OrderComposer`] wires the catalogs, the customer resolver, the draft,
//! the step gate and the submission coordinator together. Every operation
//! takes the state lock only for synchronous work; network calls run with
//! no lock held, and their results are dropped if the session was logged
//! out while they were in flight.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tablecrm_pos_core::{
    Customer, CustomerId, KnownCustomer, OrganizationId, PayboxId, PhoneError, PriceTypeId,
    Product, ProductId, ReferenceEntity, WarehouseId,
};
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, CommerceApi, TableCrmClient};
use crate::catalog::{Catalog, CustomerDirectory, ReferenceData, ReferenceStatus, Searchable};
use crate::config::PosConfig;
use crate::draft::OrderDraft;
use crate::error::{SaleError, StorageError, ValidationError};
use crate::resolver::{CustomerResolver, Resolution};
use crate::session::{DraftStore, TokenStore};
use crate::submission::{send_sale, ConfirmDialog, PendingAction, Submission, SubmissionCoordinator};
use crate::telemetry;
use crate::wizard::{StepGate, WizardStep};

/// Drives one cashier session.
///
/// Cheap to clone; clones share the same session.
pub struct OrderComposer<A> {
    inner: Arc<ComposerInner<A>>,
}

impl<A> Clone for OrderComposer<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> std::fmt::Debug for OrderComposer<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderComposer")
            .field("tokens", &self.inner.tokens)
            .field("submitting", &self.inner.coordinator.is_submitting())
            .finish_non_exhaustive()
    }
}

struct ComposerInner<A> {
    api: A,
    tokens: TokenStore,
    draft: DraftStore,
    coordinator: SubmissionCoordinator,
    state: Mutex<ComposerState>,
}

struct ComposerState {
    /// Bumped on logout; results started under an older value are dropped.
    generation: u64,
    gate: StepGate,
    reference: ReferenceData,
    customers: CustomerDirectory,
    products: Catalog<Product>,
    resolver: CustomerResolver,
    dialog: ConfirmDialog,
}

impl ComposerState {
    fn new(customer_page_size: u32) -> Self {
        Self {
            generation: 0,
            gate: StepGate::new(),
            reference: ReferenceData::default(),
            customers: CustomerDirectory::new(customer_page_size),
            products: Catalog::default(),
            resolver: CustomerResolver::new(),
            dialog: ConfirmDialog::default(),
        }
    }

    const fn ensure_editable(&self) -> Result<(), ValidationError> {
        match self.gate.step() {
            WizardStep::Confirmation => Err(ValidationError::DraftLocked),
            _ => Ok(()),
        }
    }
}

impl OrderComposer<TableCrmClient> {
    /// Build a composer talking to the configured backend. Returns `None`
    /// when nobody is logged in.
    ///
    /// Every request uses the token `tokens` holds when it is sent, so after
    /// [`OrderComposer::logout`] and a new [`TokenStore::login`] the same
    /// composer carries on with the new token.
    #[must_use]
    pub fn connect(config: &PosConfig, tokens: TokenStore, draft: DraftStore) -> Option<Self> {
        if !tokens.is_authenticated() {
            return None;
        }
        let api = TableCrmClient::with_session(config.api_url.clone(), tokens.clone());
        Some(Self::new(api, tokens, draft, config))
    }
}

impl<A: CommerceApi> OrderComposer<A> {
    #[must_use]
    pub fn new(api: A, tokens: TokenStore, draft: DraftStore, config: &PosConfig) -> Self {
        Self {
            inner: Arc::new(ComposerInner {
                api,
                tokens,
                draft,
                coordinator: SubmissionCoordinator::new(),
                state: Mutex::new(ComposerState::new(config.customer_page_size)),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, ComposerState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.state().generation
    }

    fn ensure_session(&self) -> Result<(), ApiError> {
        if self.inner.tokens.is_authenticated() {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load warehouses, payment accounts, organizations and price types.
    ///
    /// The warehouses request goes first and doubles as the token probe: if
    /// it is rejected every list is emptied and the customer step stays
    /// blocked until the next login. Only after it succeeds are the other
    /// three lists requested, concurrently. Other failures keep whatever
    /// was loaded before.
    #[instrument(skip(self))]
    pub async fn load_reference_data(&self) -> ReferenceStatus {
        let generation = {
            let mut state = self.state();
            if self.ensure_session().is_err() {
                state.reference.reject_token();
                return state.reference.status().clone();
            }
            state.reference.mark_loading();
            state.generation
        };

        let probe = self.inner.api.list_warehouses().await;
        {
            let mut state = self.state();
            if state.generation != generation {
                debug!("Session changed during token probe, discarding result");
                return state.reference.status().clone();
            }
            match probe {
                Ok(warehouses) => state.reference.accept_probe(warehouses),
                Err(ApiError::Unauthorized) => {
                    warn!("Access token rejected by the backend");
                    state.reference.reject_token();
                    return ReferenceStatus::AuthFailed;
                }
                Err(error) => {
                    state.reference.mark_failed(error.to_string());
                    return state.reference.status().clone();
                }
            }
        }

        let api = &self.inner.api;
        let (payboxes, organizations, price_types) = tokio::join!(
            api.list_payboxes(),
            api.list_organizations(),
            api.list_price_types()
        );

        let mut state = self.state();
        if state.generation != generation {
            debug!("Session changed while loading reference data, discarding result");
            return state.reference.status().clone();
        }

        let mut failure: Option<ApiError> = None;
        match payboxes {
            Ok(rows) => state.reference.payboxes.replace(rows),
            Err(error) => failure = failure.or(Some(error)),
        }
        match organizations {
            Ok(rows) => state.reference.organizations.replace(rows),
            Err(error) => failure = failure.or(Some(error)),
        }
        match price_types {
            Ok(rows) => state.reference.price_types.replace(rows),
            Err(error) => failure = failure.or(Some(error)),
        }

        match failure {
            None => {
                info!(
                    warehouses = state.reference.warehouses.len(),
                    payboxes = state.reference.payboxes.len(),
                    organizations = state.reference.organizations.len(),
                    price_types = state.reference.price_types.len(),
                    "Reference data loaded"
                );
                state.reference.mark_ready();
            }
            Some(error) => {
                warn!(error = %error, "Reference data partially loaded");
                state.reference.mark_failed(error.to_string());
            }
        }
        state.reference.status().clone()
    }

    /// Load the first customer page, replacing any loaded customers.
    ///
    /// # Errors
    ///
    /// Returns the API error; loaded customers are kept.
    #[instrument(skip(self))]
    pub async fn load_customers(&self) -> Result<(), ApiError> {
        self.ensure_session()?;
        let (generation, page_size) = {
            let state = self.state();
            (state.generation, state.customers.page_size())
        };

        let page = self.inner.api.list_customers(1, page_size).await?;

        let mut state = self.state();
        if state.generation == generation {
            state.customers.replace_with_first_page(page);
        }
        Ok(())
    }

    /// Append the next customer page.
    ///
    /// Returns `Ok(false)` when nothing was requested, because a load is
    /// already running or the last page is loaded.
    ///
    /// # Errors
    ///
    /// Returns the API error; loaded customers are kept.
    #[instrument(skip(self))]
    pub async fn load_more_customers(&self) -> Result<bool, ApiError> {
        self.ensure_session()?;
        let (generation, page, page_size) = {
            let mut state = self.state();
            let Some(page) = state.customers.begin_load_more() else {
                return Ok(false);
            };
            (state.generation, page, state.customers.page_size())
        };

        let result = self.inner.api.list_customers(page, page_size).await;

        let mut state = self.state();
        if state.generation != generation {
            return Ok(false);
        }
        match result {
            Ok(loaded) => {
                state.customers.finish_load_more(Some(loaded));
                Ok(true)
            }
            Err(error) => {
                state.customers.finish_load_more(None);
                Err(error)
            }
        }
    }

    /// Load the product catalog.
    ///
    /// # Errors
    ///
    /// Returns the API error; the previous catalog is kept.
    #[instrument(skip(self))]
    pub async fn load_products(&self) -> Result<(), ApiError> {
        self.ensure_session()?;
        let generation = self.generation();

        let products = self.inner.api.list_products().await?;

        let mut state = self.state();
        if state.generation == generation {
            debug!(count = products.len(), "Product catalog loaded");
            state.products.replace(products);
        }
        Ok(())
    }

    // =========================================================================
    // Filters and views
    // =========================================================================

    pub fn set_customer_filter(&self, filter: &str) {
        self.state().customers.set_filter(filter);
    }

    pub fn set_product_filter(&self, filter: &str) {
        self.state().products.set_filter(filter);
    }

    /// Run `f` over the customer list.
    pub fn with_customers<R>(&self, f: impl FnOnce(&CustomerDirectory) -> R) -> R {
        f(&self.state().customers)
    }

    /// Run `f` over the product catalog.
    pub fn with_products<R>(&self, f: impl FnOnce(&Catalog<Product>) -> R) -> R {
        f(&self.state().products)
    }

    /// Run `f` over the reference lists.
    pub fn with_reference<R>(&self, f: impl FnOnce(&ReferenceData) -> R) -> R {
        f(&self.state().reference)
    }

    /// Customers shown under the phone field.
    #[must_use]
    pub fn quick_picks(&self, expanded: bool) -> Vec<KnownCustomer> {
        self.with_customers(|customers| {
            customers
                .quick_picks(expanded)
                .into_iter()
                .cloned()
                .collect()
        })
    }

    #[must_use]
    pub fn reference_status(&self) -> ReferenceStatus {
        self.state().reference.status().clone()
    }

    /// A copy of the current draft.
    #[must_use]
    pub fn draft(&self) -> OrderDraft {
        self.inner.draft.snapshot()
    }

    #[must_use]
    pub fn total(&self) -> Decimal {
        self.inner.draft.read(OrderDraft::total)
    }

    #[must_use]
    pub fn step(&self) -> WizardStep {
        self.state().gate.step()
    }

    #[must_use]
    pub fn phone_input(&self) -> String {
        self.state().resolver.phone_input().to_string()
    }

    #[must_use]
    pub fn phone_error(&self) -> Option<PhoneError> {
        self.state().resolver.phone_error().cloned()
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.inner.coordinator.is_submitting()
    }

    #[must_use]
    pub fn pending_action(&self) -> Option<PendingAction> {
        self.state().dialog.pending()
    }

    // =========================================================================
    // Customer step
    // =========================================================================

    /// Handle a change of the phone field.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DraftLocked` on the confirmation step.
    pub fn type_phone(&self, input: &str) -> Result<Resolution, ValidationError> {
        let mut state = self.state();
        state.ensure_editable()?;

        let current = self.inner.draft.read(|draft| draft.customer.clone());
        let ComposerState {
            resolver,
            customers,
            ..
        } = &mut *state;
        let resolution = resolver.type_phone(input, customers.customers(), current.as_ref());

        match &resolution {
            Resolution::Bound(customer) => {
                debug!(ephemeral = customer.is_ephemeral(), "Customer bound from phone");
                let customer = customer.clone();
                self.inner
                    .draft
                    .update(|draft| draft.customer = Some(customer));
            }
            Resolution::Cleared => self.inner.draft.update(|draft| draft.customer = None),
            Resolution::Unchanged | Resolution::Invalid(_) => {}
        }
        Ok(resolution)
    }

    /// Bind a customer picked from the list.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownSelection` if the customer is not
    /// loaded, or `DraftLocked` on the confirmation step.
    pub fn select_customer(&self, id: CustomerId) -> Result<Customer, ValidationError> {
        let mut state = self.state();
        state.ensure_editable()?;

        let known = state
            .customers
            .customer(id)
            .cloned()
            .ok_or(ValidationError::UnknownSelection)?;
        let customer = state.resolver.select(known);
        let bound = customer.clone();
        self.inner
            .draft
            .update(|draft| draft.customer = Some(bound));

        telemetry::add_breadcrumb("customer", "Customer selected", &[("id", id.to_string())]);
        Ok(customer)
    }

    /// Unbind the customer and empty the phone field.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DraftLocked` on the confirmation step.
    pub fn clear_customer(&self) -> Result<(), ValidationError> {
        let mut state = self.state();
        state.ensure_editable()?;
        state.resolver.clear();
        self.inner.draft.update(|draft| draft.customer = None);
        Ok(())
    }

    // =========================================================================
    // Parameters step
    // =========================================================================

    fn select_reference<T>(
        &self,
        catalog: impl FnOnce(&ReferenceData) -> &Catalog<T>,
        id: T::Id,
        apply: impl FnOnce(&mut OrderDraft, T),
    ) -> Result<(), ValidationError>
    where
        T: ReferenceEntity + Searchable + Clone,
    {
        let state = self.state();
        state.ensure_editable()?;
        let entity = ReferenceData::lookup(catalog(&state.reference), id)
            .cloned()
            .ok_or(ValidationError::UnknownSelection)?;
        self.inner.draft.update(|draft| apply(draft, entity));
        Ok(())
    }

    /// Select the warehouse.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSelection` for an id not in the loaded list, or
    /// `DraftLocked` on the confirmation step.
    pub fn select_warehouse(&self, id: WarehouseId) -> Result<(), ValidationError> {
        self.select_reference(
            |r| &r.warehouses,
            id,
            |draft, warehouse| draft.warehouse = Some(warehouse),
        )
    }

    /// Select the payment account.
    ///
    /// # Errors
    ///
    /// See [`OrderComposer::select_warehouse`].
    pub fn select_paybox(&self, id: PayboxId) -> Result<(), ValidationError> {
        self.select_reference(|r| &r.payboxes, id, |draft, paybox| draft.paybox = Some(paybox))
    }

    /// Select the organization.
    ///
    /// # Errors
    ///
    /// See [`OrderComposer::select_warehouse`].
    pub fn select_organization(&self, id: OrganizationId) -> Result<(), ValidationError> {
        self.select_reference(
            |r| &r.organizations,
            id,
            |draft, organization| draft.organization = Some(organization),
        )
    }

    /// Select the price type.
    ///
    /// # Errors
    ///
    /// See [`OrderComposer::select_warehouse`].
    pub fn select_price_type(&self, id: PriceTypeId) -> Result<(), ValidationError> {
        self.select_reference(
            |r| &r.price_types,
            id,
            |draft, price_type| draft.price_type = Some(price_type),
        )
    }

    // =========================================================================
    // Items step
    // =========================================================================

    /// Add one unit of a catalog product. Returns the new line quantity.
    ///
    /// # Errors
    ///
    /// Returns `UnknownSelection` for a product not in the catalog, or
    /// `DraftLocked` on the confirmation step.
    pub fn add_product(&self, id: ProductId) -> Result<u32, ValidationError> {
        let state = self.state();
        state.ensure_editable()?;
        let product = state
            .products
            .product(id)
            .ok_or(ValidationError::UnknownSelection)?;
        Ok(self.inner.draft.update(|draft| {
            draft.cart.add(product);
            draft.cart.quantity_of(id)
        }))
    }

    /// Set a line's quantity; zero or less removes the line.
    ///
    /// Returns `false` when the product is not in the cart.
    ///
    /// # Errors
    ///
    /// Returns `DraftLocked` on the confirmation step.
    pub fn set_quantity(&self, id: ProductId, quantity: i64) -> Result<bool, ValidationError> {
        self.state().ensure_editable()?;
        Ok(self
            .inner
            .draft
            .update(|draft| draft.cart.set_quantity(id, quantity)))
    }

    /// Change a line's quantity by `delta`.
    ///
    /// # Errors
    ///
    /// Returns `DraftLocked` on the confirmation step.
    pub fn step_quantity(&self, id: ProductId, delta: i64) -> Result<bool, ValidationError> {
        self.state().ensure_editable()?;
        Ok(self
            .inner
            .draft
            .update(|draft| draft.cart.step_quantity(id, delta)))
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `DraftLocked` on the confirmation step.
    pub fn remove_item(&self, id: ProductId) -> Result<(), ValidationError> {
        self.state().ensure_editable()?;
        self.inner.draft.update(|draft| draft.cart.remove(id));
        Ok(())
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// What is still missing before the current step can be left.
    ///
    /// # Errors
    ///
    /// Returns the first missing piece.
    pub fn can_advance(&self) -> Result<(), ValidationError> {
        let state = self.state();
        self.inner
            .draft
            .read(|draft| state.gate.check(draft, &state.reference))
    }

    /// Move to the next step.
    ///
    /// # Errors
    ///
    /// Returns what is missing on the current step; the step is unchanged.
    pub fn next(&self) -> Result<WizardStep, ValidationError> {
        let mut state = self.state();
        let ComposerState { gate, reference, .. } = &mut *state;
        let step = self.inner.draft.read(|draft| gate.next(draft, reference))?;

        telemetry::add_breadcrumb("wizard", "Step advanced", &[("step", step.to_string())]);
        Ok(step)
    }

    /// Move to the previous step.
    pub fn back(&self) -> WizardStep {
        let step = self.state().gate.back();
        telemetry::add_breadcrumb("wizard", "Step back", &[("step", step.to_string())]);
        step
    }

    // =========================================================================
    // Submission
    // =========================================================================

    /// Open the confirmation dialog for `action`.
    ///
    /// # Errors
    ///
    /// Returns `NotAtConfirmation` on any step but the last.
    pub fn request_submit(&self, action: PendingAction) -> Result<(), ValidationError> {
        let mut state = self.state();
        state.gate.ensure_confirmation()?;
        if !self.inner.coordinator.is_submitting() {
            state.dialog.open(action);
        }
        Ok(())
    }

    /// Close the confirmation dialog. Ignored while a submission runs.
    pub fn cancel_submit(&self) {
        if !self.inner.coordinator.is_submitting() {
            self.state().dialog.close();
        }
    }

    /// Submit with the action chosen in the dialog, then close it.
    ///
    /// Does nothing when the dialog is not open or a submission is
    /// already in flight.
    ///
    /// # Errors
    ///
    /// See [`OrderComposer::submit`].
    pub async fn confirm_submit(&self) -> Result<Submission, SaleError> {
        let Some(action) = self.pending_action() else {
            return Ok(Submission::Ignored);
        };

        let result = self.submit(action.conduct()).await;
        if !matches!(result, Ok(Submission::Ignored)) {
            self.state().dialog.close();
        }
        result
    }

    /// Create the sale from the current draft.
    ///
    /// On success the draft is reset and the wizard returns to the
    /// customer step; on failure nothing changes and the call can be
    /// retried. A call while another submission is in flight returns
    /// `Submission::Ignored` without contacting the backend.
    ///
    /// # Errors
    ///
    /// Returns `SaleError::Invalid` when not on the confirmation step or
    /// the draft is incomplete, `SaleError::Remote` when the backend fails.
    #[instrument(skip(self))]
    pub async fn submit(&self, conduct: bool) -> Result<Submission, SaleError> {
        let Some(guard) = self.inner.coordinator.try_begin() else {
            debug!("Submission already in flight, ignoring");
            return Ok(Submission::Ignored);
        };

        let generation = {
            let state = self.state();
            state.gate.ensure_confirmation()?;
            state.generation
        };

        let confirmation = send_sale(&guard, &self.inner.api, &self.inner.draft, conduct).await?;

        let mut state = self.state();
        if state.generation == generation {
            state.gate.reset();
            state.resolver.clear();
        }
        drop(state);
        drop(guard);

        info!(conduct, "Order submitted");
        Ok(Submission::Completed(confirmation))
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// End the session: forget the token, the draft and every loaded list.
    ///
    /// Requests still in flight finish, but their results are discarded.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the saved token cannot be removed; the
    /// session is cleared regardless.
    pub fn logout(&self) -> Result<(), StorageError> {
        {
            let mut state = self.state();
            let generation = state.generation.wrapping_add(1);
            let page_size = state.customers.page_size();
            *state = ComposerState::new(page_size);
            state.generation = generation;
        }
        self.inner.draft.reset();
        telemetry::add_breadcrumb("session", "Logged out", &[]);
        self.inner.tokens.logout()
    }
}
