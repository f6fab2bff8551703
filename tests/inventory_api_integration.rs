//! Integration tests for the catalog, stock and settings endpoints
//!
//! Covers CRUD round trips, the stock guard on sales and the mapping of
//! storage failures to HTTP status codes.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use pharmadash::config::{DisplayConfig, InventoryConfig};
use pharmadash::models::AppSettings;
use pharmadash::storage::{SqliteStorage, Storage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Helper to create test storage
async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn create_app(storage: &Arc<dyn Storage>) -> Router {
    pharmadash::api::create_api_router(
        Arc::clone(storage),
        DisplayConfig::default(),
        InventoryConfig::default(),
    )
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

/// Creates a drug and a pharmacy, returning their ids.
async fn create_drug_and_pharmacy(storage: &Arc<dyn Storage>) -> (i64, i64) {
    let (status, drug) = send(
        create_app(storage),
        Method::POST,
        "/api/drugs",
        Some(json!({
            "name": "Paracetamol",
            "manufacturer": "Uzpharma",
            "country": "Uzbekistan",
            "atxCode": "N02BE01",
            "form": "Tablets"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, pharmacy) = send(
        create_app(storage),
        Method::POST,
        "/api/pharmacies",
        Some(json!({ "name": "Central", "region": "Tashkent" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    (drug["id"].as_i64().unwrap(), pharmacy["id"].as_i64().unwrap())
}

async fn create_stock(
    storage: &Arc<dyn Storage>,
    drug_id: i64,
    pharmacy_id: i64,
    quantity: i64,
) -> Value {
    let (status, item) = send(
        create_app(storage),
        Method::POST,
        "/api/inventory",
        Some(json!({
            "drugId": drug_id,
            "pharmacyId": pharmacy_id,
            "quantity": quantity,
            "purchasePriceUZS": 1000.0,
            "salePriceUZS": 1500.0,
            "minStock": 5,
            "invoiceNumber": "PO-1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    item
}

#[tokio::test]
async fn test_health_check() {
    let storage = create_test_storage().await;
    let (status, json) = send(create_app(&storage), Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_drug_crud_round_trip() {
    let storage = create_test_storage().await;
    let (drug_id, _) = create_drug_and_pharmacy(&storage).await;

    let (status, drug) = send(
        create_app(&storage),
        Method::GET,
        &format!("/api/drugs/{drug_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(drug["name"], "Paracetamol");
    assert_eq!(drug["atxCode"], "N02BE01");
    assert_eq!(drug["prescription"], false);

    let (status, updated) = send(
        create_app(&storage),
        Method::PUT,
        &format!("/api/drugs/{drug_id}"),
        Some(json!({ "name": "Paracetamol Forte", "manufacturer": "Sandoz" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Paracetamol Forte");
    assert_eq!(updated["manufacturer"], "Sandoz");

    let (status, list) =
        send(create_app(&storage), Method::GET, "/api/drugs?search=forte", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let (status, _) = send(
        create_app(&storage),
        Method::DELETE,
        &format!("/api/drugs/{drug_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        create_app(&storage),
        Method::GET,
        &format!("/api/drugs/{drug_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_drug_requires_name() {
    let storage = create_test_storage().await;
    let (status, body) = send(
        create_app(&storage),
        Method::POST,
        "/api/drugs",
        Some(json!({ "name": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "name is required");
}

#[tokio::test]
async fn test_inventory_create_records_purchase() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;

    let item = create_stock(&storage, drug_id, pharmacy_id, 40).await;
    assert_eq!(item["quantity"], 40);
    assert_eq!(item["drugName"], "Paracetamol");
    assert_eq!(item["stockStatus"], "ok");

    let (status, list) = send(
        create_app(&storage),
        Method::GET,
        "/api/transactions?type=PURCHASE",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["transactions"][0]["quantity"], 40);
    assert_eq!(list["transactions"][0]["totalAmountUZS"], 40_000.0);
    assert_eq!(list["transactions"][0]["invoiceNumber"], "PO-1");
}

#[tokio::test]
async fn test_inventory_unknown_drug_is_bad_request() {
    let storage = create_test_storage().await;
    let (_, pharmacy_id) = create_drug_and_pharmacy(&storage).await;

    let (status, _) = send(
        create_app(&storage),
        Method::POST,
        "/api/inventory",
        Some(json!({
            "drugId": 9999,
            "pharmacyId": pharmacy_id,
            "quantity": 1,
            "purchasePriceUZS": 1.0,
            "salePriceUZS": 2.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_sale_decrements_stock() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;
    let item = create_stock(&storage, drug_id, pharmacy_id, 10).await;

    let (status, tx) = send(
        create_app(&storage),
        Method::POST,
        "/api/transactions",
        Some(json!({
            "type": "SALE",
            "drugId": drug_id,
            "pharmacyId": pharmacy_id,
            "quantity": 7,
            "unitPriceUZS": 1500.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(tx["totalAmountUZS"], 10_500.0);
    assert_eq!(tx["type"], "SALE");

    let (_, item) = send(
        create_app(&storage),
        Method::GET,
        &format!("/api/inventory/{}", item["id"]),
        None,
    )
    .await;
    assert_eq!(item["quantity"], 3);
    assert_eq!(item["stockStatus"], "low");
}

#[tokio::test]
async fn test_sale_beyond_stock_is_conflict() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;
    let item = create_stock(&storage, drug_id, pharmacy_id, 5).await;

    let (status, body) = send(
        create_app(&storage),
        Method::POST,
        "/api/transactions",
        Some(json!({
            "type": "SALE",
            "drugId": drug_id,
            "pharmacyId": pharmacy_id,
            "quantity": 6,
            "unitPriceUZS": 1500.0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Insufficient stock");
    assert_eq!(body["details"], "5 available");

    // Nothing changed
    let (_, item) = send(
        create_app(&storage),
        Method::GET,
        &format!("/api/inventory/{}", item["id"]),
        None,
    )
    .await;
    assert_eq!(item["quantity"], 5);

    let (_, list) =
        send(create_app(&storage), Method::GET, "/api/transactions?type=SALE", None).await;
    assert_eq!(list["total"], 0);
}

#[tokio::test]
async fn test_sale_without_inventory_is_not_found() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;

    let (status, _) = send(
        create_app(&storage),
        Method::POST,
        "/api/transactions",
        Some(json!({
            "type": "SALE",
            "drugId": drug_id,
            "pharmacyId": pharmacy_id,
            "quantity": 1
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_transaction_rejects_non_positive_quantity() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;

    let (status, _) = send(
        create_app(&storage),
        Method::POST,
        "/api/transactions",
        Some(json!({
            "type": "PURCHASE",
            "drugId": drug_id,
            "pharmacyId": pharmacy_id,
            "quantity": 0
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transaction_list_rejects_unknown_type() {
    let storage = create_test_storage().await;
    let (status, _) = send(
        create_app(&storage),
        Method::GET,
        "/api/transactions?type=GIFT",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_inventory_low_stock_filter() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;
    create_stock(&storage, drug_id, pharmacy_id, 3).await;
    create_stock(&storage, drug_id, pharmacy_id, 50).await;

    let (status, list) = send(
        create_app(&storage),
        Method::GET,
        "/api/inventory?lowStock=true",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["items"][0]["quantity"], 3);

    let (_, all) = send(
        create_app(&storage),
        Method::GET,
        &format!("/api/inventory?drugId={drug_id}"),
        None,
    )
    .await;
    assert_eq!(all["total"], 2);
}

#[tokio::test]
async fn test_inventory_update_keeps_absent_fields() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;
    let item = create_stock(&storage, drug_id, pharmacy_id, 10).await;

    let (status, updated) = send(
        create_app(&storage),
        Method::PUT,
        &format!("/api/inventory/{}", item["id"]),
        Some(json!({ "location": "Shelf A" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["location"], "Shelf A");
    assert_eq!(updated["quantity"], 10);
    assert_eq!(updated["salePriceUZS"], 1500.0);
}

#[tokio::test]
async fn test_delete_referenced_pharmacy_is_conflict() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;
    create_stock(&storage, drug_id, pharmacy_id, 10).await;

    let (status, _) = send(
        create_app(&storage),
        Method::DELETE,
        &format!("/api/pharmacies/{pharmacy_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_delete_missing_supplier_is_not_found() {
    let storage = create_test_storage().await;
    let (status, _) = send(create_app(&storage), Method::DELETE, "/api/suppliers/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_atx_falls_back_to_builtin_table() {
    let storage = create_test_storage().await;

    let (status, list) = send(create_app(&storage), Method::GET, "/api/atx", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 14);
    assert_eq!(list[0]["code"], "A");

    let (_, level2) =
        send(create_app(&storage), Method::GET, "/api/atx?level=2&parent=n", None).await;
    assert!(level2
        .as_array()
        .unwrap()
        .iter()
        .all(|c| c["code"].as_str().unwrap().starts_with('N')));
}

#[tokio::test]
async fn test_settings_round_trip() {
    let storage = create_test_storage().await;

    let (status, defaults) = send(create_app(&storage), Method::GET, "/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["display"]["usdRate"], 12850.0);
    assert_eq!(defaults["expiryAlertDays"], 90);

    let (status, saved) = send(
        create_app(&storage),
        Method::PUT,
        "/api/settings",
        Some(json!({ "organizationName": "PharmaCentral", "usdRate": 13000.0, "expiryAlertDays": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["settings"]["organizationName"], "PharmaCentral");
    assert_eq!(saved["display"]["usdRate"], 13000.0);
    assert_eq!(saved["expiryAlertDays"], 30);

    let (status, _) = send(
        create_app(&storage),
        Method::PUT,
        "/api/settings",
        Some(json!({ "usdRate": -1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_settings_rejects_out_of_range_expiry_window() {
    let storage = create_test_storage().await;

    let (status, json) = send(
        create_app(&storage),
        Method::PUT,
        "/api/settings",
        Some(json!({ "expiryAlertDays": 200_000_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "expiryAlertDays must be between 0 and 36500");

    let (_, settings) = send(create_app(&storage), Method::GET, "/api/settings", None).await;
    assert_eq!(settings["expiryAlertDays"], 90);
}

#[tokio::test]
async fn test_stored_huge_expiry_window_still_serves() {
    let storage = create_test_storage().await;
    let (drug_id, pharmacy_id) = create_drug_and_pharmacy(&storage).await;

    let (status, _) = send(
        create_app(&storage),
        Method::POST,
        "/api/inventory",
        Some(json!({
            "drugId": drug_id,
            "pharmacyId": pharmacy_id,
            "quantity": 20,
            "purchasePriceUZS": 1000.0,
            "salePriceUZS": 1500.0,
            "expiryDate": "2030-01-01"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Written before the range check existed
    let legacy = AppSettings {
        expiry_alert_days: Some(200_000_000),
        ..Default::default()
    };
    storage.save_settings(&legacy.to_pairs()).await.unwrap();

    let (status, list) = send(
        create_app(&storage),
        Method::GET,
        "/api/inventory?expiring=true",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);

    let (status, dashboard) = send(create_app(&storage), Method::GET, "/api/dashboard", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dashboard["stats"]["expiringCount"], 1);
}

#[tokio::test]
async fn test_malformed_query_is_json_error() {
    let storage = create_test_storage().await;

    let (status, json) = send(
        create_app(&storage),
        Method::GET,
        "/api/top-sales?limit=abc",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid query parameters");
    assert!(json["details"].is_string());

    let (status, json) = send(
        create_app(&storage),
        Method::GET,
        "/api/inventory?pharmacyId=first",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid query parameters");
}
