//! Turning a complete draft into a sale, at most one attempt at a time.
//!
//! The coordinator's guard moves `Idle -> Submitting` with a single
//! compare-and-swap before anything else happens, and a drop guard moves it
//! back on every exit path. A submit while another is in flight is
//! [`Submission::Ignored`]: no request, no error.

use std::sync::atomic::{AtomicU8, Ordering};

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{info, instrument, warn};

use crate::api::{
    ApiError, CommerceApi, SALE_LINE_UNIT, SALE_OPERATION, SaleConfirmation, SaleDocument,
    SaleLine,
};
use crate::draft::ReadyOrder;
use crate::error::SaleError;
use crate::session::DraftStore;
use crate::telemetry;

const IDLE: u8 = 0;
const SUBMITTING: u8 = 1;

/// Result of a submit call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The sale was created and the draft reset.
    Completed(SaleConfirmation),
    /// Another submission was already in flight; nothing was sent.
    Ignored,
}

/// Which button opened the confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Create the sale and leave it open.
    Create,
    /// Create the sale and conduct it immediately.
    CreateAndConduct,
}

impl PendingAction {
    /// Value of the sale's `status` flag.
    #[must_use]
    pub const fn conduct(self) -> bool {
        matches!(self, Self::CreateAndConduct)
    }
}

/// The "are you sure?" dialog in front of submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfirmDialog {
    pending: Option<PendingAction>,
}

impl ConfirmDialog {
    #[must_use]
    pub const fn pending(&self) -> Option<PendingAction> {
        self.pending
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn open(&mut self, action: PendingAction) {
        self.pending = Some(action);
    }

    pub fn close(&mut self) {
        self.pending = None;
    }
}

/// Proof that this caller owns the in-flight slot. Releases it on drop.
#[derive(Debug)]
pub struct SubmissionGuard<'a> {
    state: &'a AtomicU8,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.state.store(IDLE, Ordering::Release);
    }
}

/// Guarantees at most one sale creation in flight.
#[derive(Debug, Default)]
pub struct SubmissionCoordinator {
    state: AtomicU8,
}

impl SubmissionCoordinator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.state.load(Ordering::Acquire) == SUBMITTING
    }

    /// Claim the in-flight slot, `None` if it is taken.
    #[must_use]
    pub fn try_begin(&self) -> Option<SubmissionGuard<'_>> {
        self.state
            .compare_exchange(IDLE, SUBMITTING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionGuard { state: &self.state })
    }

    /// Validate the draft, create the sale and reset the draft on success.
    ///
    /// # Errors
    ///
    /// Returns `SaleError::Invalid` for an incomplete draft (nothing is
    /// sent) and `SaleError::Remote` when the backend fails. The draft is
    /// left untouched on error.
    pub async fn submit<A: CommerceApi>(
        &self,
        api: &A,
        draft: &DraftStore,
        conduct: bool,
    ) -> Result<Submission, SaleError> {
        let Some(guard) = self.try_begin() else {
            warn!("Submission already in flight, ignoring");
            return Ok(Submission::Ignored);
        };
        send_sale(&guard, api, draft, conduct)
            .await
            .map(Submission::Completed)
    }
}

/// Create the sale for the current draft while holding the in-flight slot.
///
/// # Errors
///
/// See [`SubmissionCoordinator::submit`].
#[instrument(skip_all, fields(conduct = conduct))]
pub async fn send_sale<A: CommerceApi>(
    _guard: &SubmissionGuard<'_>,
    api: &A,
    draft: &DraftStore,
    conduct: bool,
) -> Result<SaleConfirmation, SaleError> {
    let order = draft.read(crate::draft::OrderDraft::validate_for_submission)?;
    let documents = build_sale_payload(&order, conduct, chrono::Utc::now().timestamp());

    telemetry::add_breadcrumb(
        "submission",
        "Creating sale",
        &[
            ("paid_rubles", format_paid_rubles(order.total())),
            ("lines", order.items.len().to_string()),
            ("conduct", conduct.to_string()),
        ],
    );

    match api.create_sale(&documents).await {
        Ok(confirmation) => {
            draft.reset();
            info!(document_ids = ?confirmation.document_ids, "Sale created, draft reset");
            Ok(confirmation)
        }
        Err(error) => {
            if matches!(error, ApiError::Remote { .. }) {
                telemetry::capture_error(&error);
            }
            Err(SaleError::Remote(error))
        }
    }
}

/// Order total rounded half away from zero to kopecks, as `"300.00"`.
#[must_use]
pub fn format_paid_rubles(total: Decimal) -> String {
    let rounded = total.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{rounded:.2}")
}

/// Build the one-element sale document array for `order`.
///
/// `dated` is the document timestamp in Unix seconds.
#[must_use]
pub fn build_sale_payload(order: &ReadyOrder, conduct: bool, dated: i64) -> Vec<SaleDocument> {
    let goods = order
        .items
        .iter()
        .map(|item| SaleLine {
            price: item.product.price_or_zero(),
            quantity: item.quantity,
            unit: SALE_LINE_UNIT,
            discount: 0,
            sum_discounted: 0,
            nomenclature: item.product.id,
        })
        .collect();

    vec![SaleDocument {
        priority: 0,
        dated,
        operation: SALE_OPERATION.to_string(),
        tax_included: true,
        tax_active: true,
        goods,
        settings: serde_json::Map::new(),
        warehouse: order.warehouse.id,
        contragent: order.customer.persisted_id(),
        paybox: order.paybox.id,
        organization: order.organization.id,
        status: conduct,
        paid_rubles: format_paid_rubles(order.total()),
        paid_lt: 0,
    }]
}
