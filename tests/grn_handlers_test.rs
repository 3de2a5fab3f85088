mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, json_body, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use uuid::Uuid;

async fn create_grn(app: &TestApp, product: Uuid, expected: u32, received: u32, reason: &str) -> String {
    let response = app
        .request(
            Method::POST,
            "/api/v1/grns",
            Some(json!({
                "received_date": "2024-03-15",
                "notes": "  morning truck  ",
                "lines": [{
                    "product_id": product,
                    "qty_expected": expected,
                    "qty_received": received,
                    "discrepancy_reason": reason,
                }]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert!(body["data"]["grn_number"]
        .as_str()
        .unwrap()
        .starts_with("GRN-20240315-"));
    body["data"]["grn_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn full_receiving_flow_over_http() {
    let app = TestApp::new().await;
    let product = app.seed_product("AMX-500", "Amoxicillin 500mg", Some(dec!(10))).await;

    let grn_id = create_grn(&app, product, 100, 85, "shortage").await;

    let response = app
        .request(Method::GET, &format!("/api/v1/grns/{grn_id}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "DRAFT");
    assert_eq!(body["data"]["notes"], "morning truck");
    assert_eq!(body["data"]["has_discrepancy"], true);
    assert_eq!(decimal(&body["data"]["lines"][0]["variance"]), dec!(-15));

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/grns/{grn_id}/post"),
            Some(json!({ "posted_by": "dock.a" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["lines_processed"], 1);
    assert_eq!(body["data"]["products_updated"], 1);
    assert_eq!(body["data"]["movements_inserted"], 1);
    assert_eq!(body["data"]["posted_by"], "dock.a");
    assert_eq!(body["data"]["status"], "POSTED");

    let response = app
        .request(Method::GET, "/api/v1/discrepancies?status=pending", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let reports = body["data"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["review_status"], "pending");
    assert_eq!(reports[0]["grn"]["id"], grn_id.as_str());

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/grns/{grn_id}/status"),
            Some(json!({ "status": "approved", "reviewed_by": "qa.lead" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["review_status"], "approved");

    let response = app
        .request(Method::GET, "/api/v1/discrepancies/summary", None)
        .await;
    let body = json_body(response).await;
    assert_eq!(body["data"], json!({ "pending": 0, "approved": 1, "rejected": 0 }));
}

#[tokio::test]
async fn validation_failures_name_the_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("VAL-1", "Validation", None).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/grns",
            Some(json!({
                "received_date": "2024-03-15",
                "lines": [
                    { "product_id": product, "qty_expected": 5, "qty_received": 5 },
                    { "product_id": product, "qty_expected": 5, "qty_received": 3 }
                ]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .ends_with("Line 2: Discrepancy reason is required"));

    let response = app
        .request(
            Method::POST,
            "/api/v1/grns",
            Some(json!({ "received_date": "2024-03-15", "lines": [] })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .ends_with("At least one line item is required"));
    assert_eq!(app.header_count().await, 0);
}

#[tokio::test]
async fn posting_twice_conflicts_unless_the_key_repeats() {
    let app = TestApp::new().await;
    let product = app.seed_product("IDK-1", "Idempotency", None).await;
    let grn_id = create_grn(&app, product, 4, 4, "").await;
    let key = Uuid::new_v4().to_string();
    let uri = format!("/api/v1/grns/{grn_id}/post");

    let first = app
        .request_with_headers(Method::POST, &uri, Some(json!({})), &[("Idempotency-Key", &key)])
        .await;
    assert_eq!(first.status(), StatusCode::OK);

    let replay = app
        .request_with_headers(Method::POST, &uri, Some(json!({})), &[("Idempotency-Key", &key)])
        .await;
    assert_eq!(replay.status(), StatusCode::OK);
    let body = json_body(replay).await;
    assert_eq!(body["data"]["replayed"], true);
    assert_eq!(body["data"]["posted_by"], "warehouse_operator");

    let again = app.request(Method::POST, &uri, Some(json!({}))).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let bad_key = app
        .request_with_headers(Method::POST, &uri, Some(json!({})), &[("Idempotency-Key", "nope")])
        .await;
    assert_eq!(bad_key.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.movements(grn_id.parse().unwrap()).await.len(), 1);
}

#[tokio::test]
async fn review_errors_map_to_status_codes() {
    let app = TestApp::new().await;
    let product = app.seed_product("REV-1", "Review errors", None).await;
    let grn_id = create_grn(&app, product, 4, 4, "").await;

    // Still a draft
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/grns/{grn_id}/status"),
            Some(json!({ "status": "rejected" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/grns/{}/status", Uuid::new_v4()),
            Some(json!({ "status": "approved" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(Method::GET, "/api/v1/discrepancies?status=archived", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn products_health_and_docs() {
    let app = TestApp::new().await;
    app.seed_product("AMX-500", "Amoxicillin 500mg", Some(dec!(600))).await;
    app.seed_product("CET-10", "Cetirizine 10mg", None).await;

    let response = app
        .request(Method::GET, "/api/v1/products?search=amox", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let products = body["data"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["sku"], "AMX-500");
    assert_eq!(products[0]["status"], "normal");
    assert_eq!(decimal(&products[0]["on_hand_qty"]), dec!(600));

    let response = app
        .request(Method::GET, "/api/v1/products/by-sku/CET-10", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["status"], "zero");

    let response = app
        .request_with_headers(Method::GET, "/health", None, &[("x-request-id", "health-1")])
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "health-1"
    );
    let body = json_body(response).await;
    assert_eq!(body["database"]["status"], "up");

    let response = app.request(Method::GET, "/api-docs/openapi.json", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert!(body["paths"]["/api/v1/grns"].is_object());
}
