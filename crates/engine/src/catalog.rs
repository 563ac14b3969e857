//! In-memory views over fetched backend lists.
//!
//! A [`Catalog`] keeps the fetched rows untouched and layers a
//! case-insensitive substring filter over them for display. Customers are
//! paginated through [`CustomerDirectory`]; the four reference lists are
//! fetched once per session into [`ReferenceData`].

use tablecrm_pos_core::{
    CustomerId, KnownCustomer, Organization, Paybox, PriceType, Product, ProductId,
    ReferenceEntity, Warehouse,
};

use crate::api::CustomerPage;

/// Customers shown in the collapsed quick-pick list.
pub const QUICK_PICKS_COLLAPSED: usize = 3;

/// Customers shown in the expanded quick-pick list.
pub const QUICK_PICKS_EXPANDED: usize = 10;

/// Rows that can be matched against a display filter.
pub trait Searchable {
    /// Whether any searchable field contains `needle`, which is already
    /// lowercased and non-empty.
    fn matches(&self, needle: &str) -> bool;
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn opt_contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| contains_ci(h, needle))
}

impl Searchable for KnownCustomer {
    fn matches(&self, needle: &str) -> bool {
        contains_ci(&self.name, needle)
            || opt_contains_ci(self.phone.as_deref(), needle)
            || opt_contains_ci(self.email.as_deref(), needle)
    }
}

impl Searchable for Product {
    fn matches(&self, needle: &str) -> bool {
        contains_ci(&self.name, needle) || opt_contains_ci(self.article.as_deref(), needle)
    }
}

macro_rules! searchable_by_name {
    ($($ty:ty),+) => {
        $(
            impl Searchable for $ty {
                fn matches(&self, needle: &str) -> bool {
                    contains_ci(self.name(), needle)
                }
            }
        )+
    };
}

searchable_by_name!(Warehouse, Paybox, Organization, PriceType);

/// Fetched rows plus the current display filter.
#[derive(Debug, Clone)]
pub struct Catalog<T> {
    items: Vec<T>,
    filter: String,
}

impl<T> Default for Catalog<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            filter: String::new(),
        }
    }
}

impl<T: Searchable> Catalog<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            filter: String::new(),
        }
    }

    /// Every fetched row, in fetch order, regardless of the filter.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Replace all rows. The filter is kept.
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Append rows without deduplication.
    pub fn extend(&mut self, items: Vec<T>) {
        self.items.extend(items);
    }

    /// Drop all rows and the filter.
    pub fn clear(&mut self) {
        self.items.clear();
        self.filter.clear();
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
    }

    /// Rows matching the filter, in fetch order. A blank filter matches all.
    pub fn visible(&self) -> impl Iterator<Item = &T> {
        let needle = self.filter.trim().to_lowercase();
        self.items
            .iter()
            .filter(move |item| needle.is_empty() || item.matches(&needle))
    }

    /// First row satisfying `predicate`, ignoring the filter.
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<&T> {
        self.items.iter().find(|item| predicate(item))
    }
}

impl Catalog<Product> {
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.find(|p| p.id == id)
    }
}

/// Paginated customer list.
#[derive(Debug, Clone)]
pub struct CustomerDirectory {
    customers: Catalog<KnownCustomer>,
    page_size: u32,
    /// Last page appended, 0 before the first load.
    page: u32,
    total: u64,
    has_more: bool,
    loading_more: bool,
}

impl CustomerDirectory {
    #[must_use]
    pub fn new(page_size: u32) -> Self {
        Self {
            customers: Catalog::default(),
            page_size: page_size.max(1),
            page: 0,
            total: 0,
            has_more: false,
            loading_more: false,
        }
    }

    #[must_use]
    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    #[must_use]
    pub const fn is_loading_more(&self) -> bool {
        self.loading_more
    }

    /// Every loaded customer, in fetch order.
    #[must_use]
    pub fn customers(&self) -> &[KnownCustomer] {
        self.customers.items()
    }

    #[must_use]
    pub fn customer(&self, id: CustomerId) -> Option<&KnownCustomer> {
        self.customers.find(|c| c.id == id)
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.customers.set_filter(filter);
    }

    #[must_use]
    pub fn filter(&self) -> &str {
        self.customers.filter()
    }

    /// Loaded customers matching the filter.
    pub fn visible(&self) -> impl Iterator<Item = &KnownCustomer> {
        self.customers.visible()
    }

    /// The short list shown under the phone field.
    #[must_use]
    pub fn quick_picks(&self, expanded: bool) -> Vec<&KnownCustomer> {
        let limit = if expanded {
            QUICK_PICKS_EXPANDED
        } else {
            QUICK_PICKS_COLLAPSED
        };
        self.visible().take(limit).collect()
    }

    /// Install the first page, discarding anything loaded before.
    pub fn replace_with_first_page(&mut self, page: CustomerPage) {
        self.apply_page(page, false);
    }

    /// Reserve the next page for a "load more" request.
    ///
    /// Returns `None` while another load is running or when the last page
    /// has already been loaded.
    pub fn begin_load_more(&mut self) -> Option<u32> {
        if self.loading_more || !self.has_more {
            return None;
        }
        self.loading_more = true;
        Some(self.page + 1)
    }

    /// Finish a "load more" request. A failed load keeps the loaded rows.
    pub fn finish_load_more(&mut self, page: Option<CustomerPage>) {
        self.loading_more = false;
        if let Some(page) = page {
            self.apply_page(page, true);
        }
    }

    fn apply_page(&mut self, page: CustomerPage, append: bool) {
        self.has_more = page.has_more();
        self.total = page.total;
        self.page = page.page;
        if append {
            self.customers.extend(page.items);
        } else {
            self.customers.replace(page.items);
        }
    }

    /// Forget every loaded customer.
    pub fn clear(&mut self) {
        *self = Self::new(self.page_size);
    }
}

/// Load state of the reference lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReferenceStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    Loading,
    Ready,
    /// The token probe was rejected; the lists were cleared.
    AuthFailed,
    /// A list could not be loaded; earlier lists were kept.
    Failed(String),
}

impl ReferenceStatus {
    /// Message for the customer step, `None` when there is nothing to show.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Idle | Self::Ready => None,
            Self::Loading => Some("Loading reference data…".to_string()),
            Self::AuthFailed => {
                Some("Access token is invalid or expired. Log in again.".to_string())
            }
            Self::Failed(reason) => Some(format!("Failed to load reference data: {reason}")),
        }
    }
}

/// Warehouses, payment accounts, organizations and price types.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub warehouses: Catalog<Warehouse>,
    pub payboxes: Catalog<Paybox>,
    pub organizations: Catalog<Organization>,
    pub price_types: Catalog<PriceType>,
    status: ReferenceStatus,
    /// Set once the token probe succeeded in this session.
    token_validated: bool,
}

impl ReferenceData {
    #[must_use]
    pub const fn status(&self) -> &ReferenceStatus {
        &self.status
    }

    #[must_use]
    pub const fn token_validated(&self) -> bool {
        self.token_validated
    }

    pub fn mark_loading(&mut self) {
        self.status = ReferenceStatus::Loading;
    }

    /// Record a successful token probe.
    pub fn accept_probe(&mut self, warehouses: Vec<Warehouse>) {
        self.warehouses.replace(warehouses);
        self.token_validated = true;
    }

    /// Record a rejected token: every list is emptied.
    pub fn reject_token(&mut self) {
        *self = Self {
            status: ReferenceStatus::AuthFailed,
            ..Self::default()
        };
    }

    pub fn mark_ready(&mut self) {
        self.status = ReferenceStatus::Ready;
    }

    /// Record a failure that leaves the loaded lists in place.
    pub fn mark_failed(&mut self, reason: String) {
        self.status = ReferenceStatus::Failed(reason);
    }

    /// Whether the token probe failed authentication.
    #[must_use]
    pub const fn is_auth_failed(&self) -> bool {
        matches!(self.status, ReferenceStatus::AuthFailed)
    }

    /// Look up an entity by id in one of the lists.
    #[must_use]
    pub fn lookup<T>(catalog: &Catalog<T>, id: T::Id) -> Option<&T>
    where
        T: ReferenceEntity + Searchable,
    {
        catalog.find(|entity| entity.id() == id)
    }
}
