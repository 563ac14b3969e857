//! Integration tests for the happy path: composing and submitting orders.
//!
//! Every test runs the engine against an in-process mock backend and checks
//! both the engine state and the requests the backend received.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde_json::{Value, json};
use tablecrm_pos::catalog::ReferenceStatus;
use tablecrm_pos::{
    CommerceApi, OrderComposer, PendingAction, Resolution, Submission, TableCrmClient, WizardStep,
};
use tablecrm_pos_core::{
    Customer, CustomerId, OrganizationId, PayboxId, PriceTypeId, ProductId, WarehouseId,
};
use tablecrm_pos_integration_tests::{MockBackend, MockData, VALID_TOKEN};

/// Pick the only warehouse, paybox, organization and price type.
fn choose_parameters(composer: &OrderComposer<TableCrmClient>) {
    composer.select_warehouse(WarehouseId::new(1)).unwrap();
    composer.select_paybox(PayboxId::new(2)).unwrap();
    composer.select_organization(OrganizationId::new(3)).unwrap();
    composer.select_price_type(PriceTypeId::new(4)).unwrap();
}

#[tokio::test]
async fn test_walk_in_order_end_to_end() {
    let backend = MockBackend::start(MockData::standard()).await;
    let composer = backend.composer(VALID_TOKEN);

    assert_eq!(composer.load_reference_data().await, ReferenceStatus::Ready);
    composer.load_customers().await.unwrap();

    let resolution = composer.type_phone("+79991234567").unwrap();
    let Resolution::Bound(customer) = resolution else {
        panic!("expected a bound customer, got {resolution:?}");
    };
    assert!(customer.is_ephemeral());
    assert_eq!(customer.name(), "Клиент +7 (999) 123-45-67");
    assert_eq!(composer.next().unwrap(), WizardStep::Parameters);

    choose_parameters(&composer);
    assert_eq!(composer.next().unwrap(), WizardStep::Items);

    composer.load_products().await.unwrap();
    assert_eq!(composer.add_product(ProductId::new(7)).unwrap(), 1);
    assert_eq!(composer.add_product(ProductId::new(7)).unwrap(), 2);
    assert_eq!(composer.total(), Decimal::from(300));
    assert_eq!(composer.next().unwrap(), WizardStep::Confirmation);

    let submission = composer.submit(false).await.unwrap();
    let Submission::Completed(confirmation) = submission else {
        panic!("expected a completed submission");
    };
    assert_eq!(confirmation.document_ids, vec![1001]);

    assert_eq!(composer.step(), WizardStep::Customer);
    let draft = composer.draft();
    assert!(draft.customer.is_none());
    assert!(draft.warehouse.is_none());
    assert!(draft.cart.is_empty());
    assert!(composer.phone_input().is_empty());

    let sales = backend.requests_to("/docs_sales/");
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].query.get("token").map(String::as_str), Some(VALID_TOKEN));

    let body = sales[0].body.clone().expect("sale body");
    let documents = body.as_array().expect("array of documents");
    assert_eq!(documents.len(), 1);
    let document = &documents[0];
    assert_eq!(document["operation"], json!("Заказ"));
    assert_eq!(document["status"], json!(false));
    assert_eq!(document["paid_rubles"], json!("300.00"));
    assert_eq!(document["contragent"], Value::Null);
    assert_eq!(document["warehouse"], json!(1));
    assert_eq!(document["paybox"], json!(2));
    assert_eq!(document["organization"], json!(3));

    let goods = document["goods"].as_array().expect("goods");
    assert_eq!(goods.len(), 1);
    assert_eq!(goods[0]["nomenclature"], json!(7));
    assert_eq!(goods[0]["quantity"], json!(2));
    assert_eq!(goods[0]["price"].as_f64(), Some(150.0));
    assert_eq!(goods[0]["unit"], json!(116));
}

#[tokio::test]
async fn test_known_customer_conducted_through_dialog() {
    let mut data = MockData::standard();
    data.customers = vec![json!({
        "id": 55,
        "name": "Ivan Petrov",
        "phone": "+79991234567",
        "email": "ivan@example.com"
    })];
    let backend = MockBackend::start(data).await;
    let composer = backend.composer(VALID_TOKEN);

    composer.load_reference_data().await;
    composer.load_customers().await.unwrap();

    let resolution = composer.type_phone("+7 999 123 45 67").unwrap();
    let Resolution::Bound(Customer::Persisted(known)) = resolution else {
        panic!("expected the stored customer, got {resolution:?}");
    };
    assert_eq!(known.id, CustomerId::new(55));

    composer.next().unwrap();
    choose_parameters(&composer);
    composer.next().unwrap();
    composer.load_products().await.unwrap();
    composer.add_product(ProductId::new(7)).unwrap();
    composer.next().unwrap();

    composer.request_submit(PendingAction::CreateAndConduct).unwrap();
    assert_eq!(composer.pending_action(), Some(PendingAction::CreateAndConduct));

    let submission = composer.confirm_submit().await.unwrap();
    assert!(matches!(submission, Submission::Completed(_)));
    assert_eq!(composer.pending_action(), None);

    let bodies = backend.sale_bodies();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0][0]["contragent"], json!(55));
    assert_eq!(bodies[0][0]["status"], json!(true));
    assert_eq!(bodies[0][0]["paid_rubles"], json!("150.00"));
}

#[tokio::test]
async fn test_customer_list_pages_until_exhausted() {
    let backend = MockBackend::start(MockData::standard().with_customers(45)).await;
    let composer = backend.composer(VALID_TOKEN);

    composer.load_customers().await.unwrap();
    assert_eq!(composer.with_customers(|c| c.customers().len()), 20);
    assert!(composer.with_customers(|c| c.has_more()));

    assert!(composer.load_more_customers().await.unwrap());
    assert!(composer.load_more_customers().await.unwrap());
    assert_eq!(composer.with_customers(|c| c.customers().len()), 45);
    assert!(!composer.with_customers(|c| c.has_more()));

    assert!(!composer.load_more_customers().await.unwrap());

    let offsets: Vec<String> = backend
        .requests_to("/contragents/")
        .into_iter()
        .map(|r| {
            assert_eq!(r.query.get("limit").map(String::as_str), Some("20"));
            r.query.get("offset").cloned().unwrap_or_default()
        })
        .collect();
    assert_eq!(offsets, vec!["0", "20", "40"]);
}

#[tokio::test]
async fn test_phone_lookup_returns_matching_customers() {
    let mut data = MockData::standard().with_customers(3);
    data.customers.push(json!({
        "id": 90,
        "name": "Olga",
        "phone": "+79991234567",
        "email": null
    }));
    let backend = MockBackend::start(data).await;
    let client = TableCrmClient::new(
        backend.base_url.clone(),
        SecretString::from(VALID_TOKEN.to_string()),
    );

    let found = client.search_customers("9991234567").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, CustomerId::new(90));
    assert_eq!(found[0].name, "Olga");

    assert!(client.search_customers("5550000").await.unwrap().is_empty());

    let lookups = backend.requests_to("/contragents/");
    assert_eq!(lookups.len(), 2);
    assert_eq!(lookups[0].query.get("phone").map(String::as_str), Some("9991234567"));
    assert_eq!(lookups[0].query.get("token").map(String::as_str), Some(VALID_TOKEN));
    assert!(!lookups[0].query.contains_key("offset"));
}

#[tokio::test]
async fn test_quick_picks_and_filter() {
    let backend = MockBackend::start(MockData::standard().with_customers(12)).await;
    let composer = backend.composer(VALID_TOKEN);
    composer.load_customers().await.unwrap();

    assert_eq!(composer.quick_picks(false).len(), 3);
    assert_eq!(composer.quick_picks(true).len(), 10);

    composer.set_customer_filter("customer 1");
    let visible: Vec<i64> = composer.with_customers(|c| c.visible().map(|k| k.id.as_i64()).collect());
    assert_eq!(visible, vec![1, 10, 11, 12]);
}

#[tokio::test]
async fn test_lists_under_data_key() {
    let mut data = MockData::standard();
    data.envelope_key = "data";
    let backend = MockBackend::start(data).await;
    let composer = backend.composer(VALID_TOKEN);

    assert_eq!(composer.load_reference_data().await, ReferenceStatus::Ready);
    composer.load_products().await.unwrap();

    assert_eq!(composer.with_reference(|r| r.warehouses.len()), 1);
    assert_eq!(composer.with_products(|p| p.len()), 2);
}

#[tokio::test]
async fn test_reference_probe_precedes_other_lists() {
    let backend = MockBackend::start(MockData::standard()).await;
    let composer = backend.composer(VALID_TOKEN);

    composer.load_reference_data().await;

    let paths: Vec<&str> = backend.requests().iter().map(|r| r.path).collect();
    assert_eq!(paths.len(), 4);
    assert_eq!(paths[0], "/warehouses/");
    for path in ["/payboxes/", "/organizations/", "/price_types/"] {
        assert!(paths.contains(&path), "{path} was not requested");
    }
}
