//! Request and response bodies of the TableCRM API.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tablecrm_pos_core::{CustomerId, KnownCustomer, OrganizationId, PayboxId, ProductId, WarehouseId};

/// Envelope wrapping every list endpoint.
///
/// The backend puts rows under `result` on most endpoints and under `data`
/// on a few; an envelope with neither holds no rows.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope<T> {
    result: Option<Vec<T>>,
    data: Option<Vec<T>>,
    /// Total rows available server-side, for paginated endpoints.
    count: Option<u64>,
}

impl<T> ListEnvelope<T> {
    /// Total row count, 0 when the backend did not send one.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.count.unwrap_or(0)
    }

    #[must_use]
    pub fn into_items(self) -> Vec<T> {
        self.result.or(self.data).unwrap_or_default()
    }
}

/// One page of the customer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerPage {
    pub items: Vec<KnownCustomer>,
    /// Total customers available server-side.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    pub limit: u32,
}

impl CustomerPage {
    /// Whether more pages exist past this one.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.total > u64::from(self.page) * u64::from(self.limit)
    }
}

/// Operation name the backend expects for point-of-sale orders.
pub const SALE_OPERATION: &str = "Заказ";

/// Measurement unit id sent for every sale line.
pub const SALE_LINE_UNIT: u32 = 116;

/// A sale document as posted to `/docs_sales/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleDocument {
    pub priority: u8,
    /// Unix timestamp in seconds.
    pub dated: i64,
    pub operation: String,
    pub tax_included: bool,
    pub tax_active: bool,
    pub goods: Vec<SaleLine>,
    pub settings: serde_json::Map<String, Value>,
    pub warehouse: WarehouseId,
    /// `None` for walk-in customers.
    pub contragent: Option<CustomerId>,
    pub paybox: PayboxId,
    pub organization: OrganizationId,
    /// Whether the sale is conducted (finalized) right away.
    pub status: bool,
    /// Order total rounded to kopecks, as a decimal string.
    pub paid_rubles: String,
    pub paid_lt: u8,
}

/// One goods line of a [`SaleDocument`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaleLine {
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    pub unit: u32,
    pub discount: u8,
    pub sum_discounted: u8,
    pub nomenclature: ProductId,
}

/// What the backend answered to a successful sale creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleConfirmation {
    /// Ids of the created documents, when the response listed them.
    pub document_ids: Vec<i64>,
    /// The response body as received.
    pub raw: Value,
}

impl SaleConfirmation {
    /// Extract created document ids from a response body.
    ///
    /// Accepts a bare array of documents, an envelope with `result`/`data`,
    /// or a single document object.
    #[must_use]
    pub fn from_response(raw: Value) -> Self {
        let rows: Vec<&Value> = match &raw {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => match map.get("result").or_else(|| map.get("data")) {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(single @ Value::Object(_)) => vec![single],
                _ => vec![&raw],
            },
            _ => Vec::new(),
        };

        let document_ids = rows
            .into_iter()
            .filter_map(|row| row.get("id").and_then(Value::as_i64))
            .collect();

        Self { document_ids, raw }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_prefers_result() {
        let envelope: ListEnvelope<i64> =
            serde_json::from_value(json!({"result": [1, 2], "data": [3], "count": 10}))
                .expect("deserialize");
        assert_eq!(envelope.total(), 10);
        assert_eq!(envelope.into_items(), vec![1, 2]);
    }

    #[test]
    fn test_envelope_falls_back_to_data() {
        let envelope: ListEnvelope<i64> =
            serde_json::from_value(json!({"data": [3]})).expect("deserialize");
        assert_eq!(envelope.total(), 0);
        assert_eq!(envelope.into_items(), vec![3]);
    }

    #[test]
    fn test_envelope_without_rows_is_empty() {
        let envelope: ListEnvelope<i64> =
            serde_json::from_value(json!({"status": "ok"})).expect("deserialize");
        assert!(envelope.into_items().is_empty());
    }

    #[test]
    fn test_customer_envelope_with_null_name_row() {
        let envelope: ListEnvelope<tablecrm_pos_core::KnownCustomer> = serde_json::from_value(json!({
            "result": [{"id": 1, "name": "A"}, {"id": 2, "name": null, "phone": "+79990000000"}],
            "count": 2
        }))
        .expect("deserialize");
        let rows = envelope.into_items();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "");
    }

    #[test]
    fn test_customer_page_has_more() {
        let page = CustomerPage {
            items: Vec::new(),
            total: 45,
            page: 2,
            limit: 20,
        };
        assert!(page.has_more());

        let last = CustomerPage { page: 3, ..page };
        assert!(!last.has_more());
    }

    #[test]
    fn test_sale_line_price_serializes_as_number() {
        let line = SaleLine {
            price: Decimal::new(1505, 1),
            quantity: 2,
            unit: SALE_LINE_UNIT,
            discount: 0,
            sum_discounted: 0,
            nomenclature: ProductId::new(7),
        };
        let value = serde_json::to_value(&line).expect("serialize");
        assert_eq!(value["price"], json!(150.5));
        assert_eq!(value["nomenclature"], json!(7));
    }

    #[test]
    fn test_confirmation_ids() {
        let bare = SaleConfirmation::from_response(json!([{"id": 11}, {"id": 12}]));
        assert_eq!(bare.document_ids, vec![11, 12]);

        let wrapped = SaleConfirmation::from_response(json!({"result": [{"id": 5}]}));
        assert_eq!(wrapped.document_ids, vec![5]);

        let single = SaleConfirmation::from_response(json!({"id": 9, "number": "A-9"}));
        assert_eq!(single.document_ids, vec![9]);

        let opaque = SaleConfirmation::from_response(json!("created"));
        assert!(opaque.document_ids.is_empty());
    }
}
