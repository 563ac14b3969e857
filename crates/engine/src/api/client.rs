//! `reqwest` implementation of [`CommerceApi`].

use std::sync::Arc;

use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tablecrm_pos_core::{KnownCustomer, Organization, Paybox, PriceType, Product, Warehouse};
use tracing::{debug, error, instrument};
use url::Url;

use super::error::ApiError;
use crate::session::TokenStore;
use super::types::{CustomerPage, ListEnvelope, SaleConfirmation, SaleDocument};
use super::CommerceApi;

/// TableCRM HTTP client.
///
/// Either bound to one access token, or following a [`TokenStore`] so that
/// every request carries whatever token is current at the time it is sent.
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone)]
pub struct TableCrmClient {
    inner: Arc<TableCrmClientInner>,
}

struct TableCrmClientInner {
    client: Client,
    /// Base URL ending with `/`.
    base_url: Url,
    token: TokenSource,
}

enum TokenSource {
    Fixed(SecretString),
    Session(TokenStore),
}

impl std::fmt::Debug for TableCrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableCrmClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl TableCrmClient {
    /// Create a client for `base_url` authenticating with `token`.
    #[must_use]
    pub fn new(base_url: Url, token: SecretString) -> Self {
        Self::with_source(base_url, TokenSource::Fixed(token))
    }

    /// Create a client that reads the token from `tokens` on every request.
    ///
    /// Requests made while logged out fail with [`ApiError::Unauthorized`]
    /// without reaching the network.
    #[must_use]
    pub fn with_session(base_url: Url, tokens: TokenStore) -> Self {
        Self::with_source(base_url, TokenSource::Session(tokens))
    }

    fn with_source(base_url: Url, token: TokenSource) -> Self {
        Self {
            inner: Arc::new(TableCrmClientInner {
                client: Client::new(),
                base_url,
                token,
            }),
        }
    }

    fn token(&self) -> Result<SecretString, ApiError> {
        match &self.inner.token {
            TokenSource::Fixed(token) => Ok(token.clone()),
            TokenSource::Session(tokens) => tokens.token().ok_or(ApiError::Unauthorized),
        }
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ApiError::Connectivity(format!("invalid endpoint URL '{path}': {e}")))
    }

    /// Execute a GET request against a list endpoint.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<ListEnvelope<T>, ApiError> {
        let token = self.token()?;
        let response = self
            .inner
            .client
            .get(self.endpoint(path)?)
            .query(&[("token", token.expose_secret())])
            .query(params)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        handle_response(path, response).await
    }

    /// Execute a POST request with a JSON body.
    async fn post<T: DeserializeOwned, B: serde::Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let token = self.token()?;
        let response = self
            .inner
            .client
            .post(self.endpoint(path)?)
            .query(&[("token", token.expose_secret())])
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        handle_response(path, response).await
    }

    async fn get_all<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let rows = self.get_list::<T>(path, &[]).await?.into_items();
        debug!(path, count = rows.len(), "Fetched list");
        Ok(rows)
    }
}

/// Decode a successful response or classify a failed one.
async fn handle_response<T: DeserializeOwned>(
    path: &str,
    response: Response,
) -> Result<T, ApiError> {
    let status = response.status();

    if status.is_success() {
        return response.json().await.map_err(|e| ApiError::Remote {
            status: Some(status.as_u16()),
            message: format!("unreadable response: {e}"),
        });
    }

    let body = response.text().await.unwrap_or_default();
    let error = ApiError::from_response(status, &body);
    error!(path, status = status.as_u16(), error = %error, "TableCRM request failed");
    Err(error)
}

impl CommerceApi for TableCrmClient {
    #[instrument(skip(self))]
    async fn list_customers(&self, page: u32, limit: u32) -> Result<CustomerPage, ApiError> {
        let page = page.max(1);
        let offset = u64::from(page - 1) * u64::from(limit);
        let envelope = self
            .get_list::<KnownCustomer>(
                "contragents/",
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
            .await?;

        let total = envelope.total();
        let items = envelope.into_items();
        debug!(count = items.len(), total, "Fetched customer page");

        Ok(CustomerPage {
            items,
            total,
            page,
            limit,
        })
    }

    #[instrument(skip(self, phone))]
    async fn search_customers(&self, phone: &str) -> Result<Vec<KnownCustomer>, ApiError> {
        let rows = self
            .get_list::<KnownCustomer>("contragents/", &[("phone", phone.to_string())])
            .await?
            .into_items();
        debug!(count = rows.len(), "Phone lookup finished");
        Ok(rows)
    }

    #[instrument(skip(self))]
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, ApiError> {
        self.get_all("warehouses/").await
    }

    #[instrument(skip(self))]
    async fn list_payboxes(&self) -> Result<Vec<Paybox>, ApiError> {
        self.get_all("payboxes/").await
    }

    #[instrument(skip(self))]
    async fn list_organizations(&self) -> Result<Vec<Organization>, ApiError> {
        self.get_all("organizations/").await
    }

    #[instrument(skip(self))]
    async fn list_price_types(&self) -> Result<Vec<PriceType>, ApiError> {
        self.get_all("price_types/").await
    }

    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        self.get_all("nomenclature/").await
    }

    #[instrument(skip(self, documents), fields(documents = documents.len()))]
    async fn create_sale(&self, documents: &[SaleDocument]) -> Result<SaleConfirmation, ApiError> {
        let raw: serde_json::Value = self.post("docs_sales/", documents).await?;
        let confirmation = SaleConfirmation::from_response(raw);
        debug!(document_ids = ?confirmation.document_ids, "Sale created");
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_token() {
        let client = TableCrmClient::new(
            Url::parse("https://app.tablecrm.com/api/v1/").expect("valid url"),
            SecretString::from("super-secret-token".to_string()),
        );
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret-token"));
    }

    #[tokio::test]
    async fn test_session_client_refuses_when_logged_out() {
        let tokens = TokenStore::open(Arc::new(crate::session::MemoryTokenStorage::new()))
            .expect("open");
        // Nothing listens here; a request that went out would be a connectivity error.
        let client = TableCrmClient::with_session(
            Url::parse("http://127.0.0.1:9/").expect("valid url"),
            tokens.clone(),
        );

        assert_eq!(client.list_warehouses().await, Err(ApiError::Unauthorized));

        tokens.login("fresh").expect("login");
        assert_eq!(
            client.token().map(|t| t.expose_secret().to_string()),
            Ok("fresh".to_string())
        );
    }

    #[test]
    fn test_endpoint_joins_under_base_path() {
        let client = TableCrmClient::new(
            Url::parse("https://app.tablecrm.com/api/v1/").expect("valid url"),
            SecretString::from("t".to_string()),
        );
        assert_eq!(
            client.endpoint("docs_sales/").expect("endpoint").as_str(),
            "https://app.tablecrm.com/api/v1/docs_sales/"
        );
    }
}
