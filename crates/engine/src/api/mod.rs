//! TableCRM remote API.
//!
//! The engine talks to the backend only through the [`CommerceApi`] trait,
//! so tests can substitute an in-memory fake. [`TableCrmClient`] is the real
//! implementation: JSON over HTTP(S), with the access token passed as the
//! `token` query parameter on every request.
//!
//! # Endpoints
//!
//! | Operation | Request |
//! |---|---|
//! | customers | `GET contragents/?limit=&offset=` or `?phone=` |
//! | warehouses | `GET warehouses/` |
//! | payment accounts | `GET payboxes/` |
//! | organizations | `GET organizations/` |
//! | price types | `GET price_types/` |
//! | products | `GET nomenclature/` |
//! | create sale | `POST docs_sales/` |

mod client;
mod error;
mod types;

use std::future::Future;

use tablecrm_pos_core::{KnownCustomer, Organization, Paybox, PriceType, Product, Warehouse};

pub use client::TableCrmClient;
pub use error::{ApiError, FieldProblem};
pub use types::{
    CustomerPage, ListEnvelope, SALE_LINE_UNIT, SALE_OPERATION, SaleConfirmation, SaleDocument,
    SaleLine,
};

/// Operations the engine needs from the commerce backend.
pub trait CommerceApi: Send + Sync {
    /// Fetch one page of customers (`page` is 1-based).
    fn list_customers(
        &self,
        page: u32,
        limit: u32,
    ) -> impl Future<Output = Result<CustomerPage, ApiError>> + Send;

    /// Look customers up by phone on the backend.
    fn search_customers(
        &self,
        phone: &str,
    ) -> impl Future<Output = Result<Vec<KnownCustomer>, ApiError>> + Send;

    /// Fetch all warehouses. Also serves as the access token probe.
    fn list_warehouses(&self) -> impl Future<Output = Result<Vec<Warehouse>, ApiError>> + Send;

    /// Fetch all payment accounts.
    fn list_payboxes(&self) -> impl Future<Output = Result<Vec<Paybox>, ApiError>> + Send;

    /// Fetch all organizations.
    fn list_organizations(
        &self,
    ) -> impl Future<Output = Result<Vec<Organization>, ApiError>> + Send;

    /// Fetch all price types.
    fn list_price_types(&self) -> impl Future<Output = Result<Vec<PriceType>, ApiError>> + Send;

    /// Fetch the product catalog.
    fn list_products(&self) -> impl Future<Output = Result<Vec<Product>, ApiError>> + Send;

    /// Create sale documents.
    fn create_sale(
        &self,
        documents: &[SaleDocument],
    ) -> impl Future<Output = Result<SaleConfirmation, ApiError>> + Send;
}
