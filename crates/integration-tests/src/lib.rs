//! Integration tests for the TableCRM point-of-sale engine.
//!
//! The engine is exercised end to end against [`MockBackend`], an
//! in-process `axum` server that mimics the TableCRM endpoints the engine
//! uses and records every request it receives.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p tablecrm-pos-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tablecrm_pos::{DraftStore, MemoryTokenStorage, OrderComposer, PosConfig, TableCrmClient, TokenStore};
use tokio::sync::Notify;
use url::Url;

/// Token the mock backend accepts by default.
pub const VALID_TOKEN: &str = "valid-token";

/// Fixture data and canned answers for the mock backend.
#[derive(Debug, Clone)]
pub struct MockData {
    /// The only token accepted; anything else gets 401.
    pub token: String,
    pub customers: Vec<Value>,
    pub warehouses: Vec<Value>,
    pub payboxes: Vec<Value>,
    pub organizations: Vec<Value>,
    pub price_types: Vec<Value>,
    pub products: Vec<Value>,
    /// Envelope key list rows are returned under (`result` or `data`).
    pub envelope_key: &'static str,
    /// Status answered to sale creation.
    pub sale_status: u16,
    /// Body answered to sale creation.
    pub sale_body: Value,
}

impl MockData {
    /// One of each reference entity and a coffee priced at 150.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            token: VALID_TOKEN.to_string(),
            customers: Vec::new(),
            warehouses: vec![json!({"id": 1, "name": "Main warehouse", "address": "Lenina 1"})],
            payboxes: vec![json!({"id": 2, "name": "Cash desk", "balance": "0.00", "currency": "RUB"})],
            organizations: vec![json!({"id": 3, "name": "LLC Horns", "type": "ooo", "inn": "7701000000"})],
            price_types: vec![json!({"id": 4, "name": "Retail", "tags": null})],
            products: vec![
                json!({"id": 7, "name": "Coffee", "article": "CF-1", "price": 150, "quantity": 12, "unit": "pcs"}),
                json!({"id": 8, "name": "Sample", "price": null}),
            ],
            envelope_key: "result",
            sale_status: 200,
            sale_body: json!([{"id": 1001, "number": "1001"}]),
        }
    }

    /// `count` numbered customers with distinct phones.
    #[must_use]
    pub fn with_customers(mut self, count: i64) -> Self {
        self.customers = (1..=count)
            .map(|id| {
                json!({
                    "id": id,
                    "name": format!("Customer {id}"),
                    "phone": format!("+7900000{id:04}"),
                    "email": null
                })
            })
            .collect();
        self
    }
}

/// A request the mock backend received.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: &'static str,
    pub query: HashMap<String, String>,
    pub body: Option<Value>,
}

struct MockState {
    data: MockData,
    requests: Mutex<Vec<RecordedRequest>>,
    /// When set, sale creation waits for [`MockBackend::release_sale`].
    sale_gate: Option<Notify>,
}

impl MockState {
    fn record(&self, request: RecordedRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    fn authorized(&self, query: &HashMap<String, String>) -> bool {
        query.get("token") == Some(&self.data.token)
    }

    fn list(&self, path: &'static str, query: HashMap<String, String>, rows: &[Value]) -> Response {
        self.page(path, query, rows, rows.len())
    }

    fn page(
        &self,
        path: &'static str,
        query: HashMap<String, String>,
        rows: &[Value],
        count: usize,
    ) -> Response {
        let authorized = self.authorized(&query);
        self.record(RecordedRequest {
            method: "GET",
            path,
            query,
            body: None,
        });
        if !authorized {
            return unauthorized();
        }

        let mut envelope = serde_json::Map::new();
        envelope.insert(self.data.envelope_key.to_string(), Value::from(rows.to_vec()));
        envelope.insert("count".to_string(), json!(count));
        Json(Value::Object(envelope)).into_response()
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Not authenticated"})),
    )
        .into_response()
}

type Shared = State<Arc<MockState>>;
type Params = Query<HashMap<String, String>>;

async fn customers(State(state): Shared, Query(query): Params) -> Response {
    let rows: Vec<Value> = if let Some(phone) = query.get("phone") {
        state
            .data
            .customers
            .iter()
            .filter(|c| c["phone"].as_str().is_some_and(|p| p.contains(phone.as_str())))
            .cloned()
            .collect()
    } else {
        let offset = query.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
        let limit = query.get("limit").and_then(|v| v.parse().ok()).unwrap_or(usize::MAX);
        state.data.customers.iter().skip(offset).take(limit).cloned().collect()
    };

    let total = state.data.customers.len();
    state.page("/contragents/", query, &rows, total)
}

async fn warehouses(State(state): Shared, Query(query): Params) -> Response {
    state.list("/warehouses/", query, &state.data.warehouses)
}

async fn payboxes(State(state): Shared, Query(query): Params) -> Response {
    state.list("/payboxes/", query, &state.data.payboxes)
}

async fn organizations(State(state): Shared, Query(query): Params) -> Response {
    state.list("/organizations/", query, &state.data.organizations)
}

async fn price_types(State(state): Shared, Query(query): Params) -> Response {
    state.list("/price_types/", query, &state.data.price_types)
}

async fn nomenclature(State(state): Shared, Query(query): Params) -> Response {
    state.list("/nomenclature/", query, &state.data.products)
}

async fn create_sale(State(state): Shared, Query(query): Params, Json(body): Json<Value>) -> Response {
    let authorized = state.authorized(&query);
    state.record(RecordedRequest {
        method: "POST",
        path: "/docs_sales/",
        query,
        body: Some(body),
    });
    if !authorized {
        return unauthorized();
    }

    if let Some(gate) = &state.sale_gate {
        gate.notified().await;
    }

    let status = StatusCode::from_u16(state.data.sale_status).unwrap_or(StatusCode::OK);
    (status, Json(state.data.sale_body.clone())).into_response()
}

/// In-process stand-in for the TableCRM API, bound to an ephemeral port.
pub struct MockBackend {
    pub base_url: Url,
    state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend serving `data`.
    pub async fn start(data: MockData) -> Self {
        Self::spawn(data, false).await
    }

    /// Start a backend whose sale creation blocks until
    /// [`MockBackend::release_sale`] is called.
    pub async fn start_holding_sales(data: MockData) -> Self {
        Self::spawn(data, true).await
    }

    async fn spawn(data: MockData, hold_sales: bool) -> Self {
        let state = Arc::new(MockState {
            data,
            requests: Mutex::new(Vec::new()),
            sale_gate: hold_sales.then(Notify::new),
        });

        let app = Router::new()
            .route("/contragents/", get(customers))
            .route("/warehouses/", get(warehouses))
            .route("/payboxes/", get(payboxes))
            .route("/organizations/", get(organizations))
            .route("/price_types/", get(price_types))
            .route("/nomenclature/", get(nomenclature))
            .route("/docs_sales/", post(create_sale))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().expect("local address");
        let base_url = Url::parse(&format!("http://{addr}/")).expect("valid base url");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock backend crashed");
        });

        Self {
            base_url,
            state,
            handle,
        }
    }

    /// Let one held sale creation answer.
    pub fn release_sale(&self) {
        if let Some(gate) = &self.state.sale_gate {
            gate.notify_one();
        }
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Requests received for `path`.
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    /// Bodies of every sale creation received.
    #[must_use]
    pub fn sale_bodies(&self) -> Vec<Value> {
        self.requests_to("/docs_sales/")
            .into_iter()
            .filter_map(|r| r.body)
            .collect()
    }

    /// Engine configuration pointing at this backend.
    #[must_use]
    pub fn config(&self) -> PosConfig {
        PosConfig::new(self.base_url.clone())
    }

    /// A composer logged in with `token`.
    #[must_use]
    pub fn composer(&self, token: &str) -> OrderComposer<TableCrmClient> {
        composer_for(&self.config(), token)
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A composer for `config`, logged in with `token` over in-memory storage.
#[must_use]
pub fn composer_for(config: &PosConfig, token: &str) -> OrderComposer<TableCrmClient> {
    let tokens = TokenStore::open(Arc::new(MemoryTokenStorage::new())).expect("open token store");
    tokens.login(token).expect("login");
    OrderComposer::connect(config, tokens, DraftStore::new()).expect("logged in")
}

/// A base URL nothing listens on.
#[must_use]
pub fn closed_port_url() -> Url {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local address");
    drop(listener);
    Url::parse(&format!("http://{addr}/")).expect("valid base url")
}
