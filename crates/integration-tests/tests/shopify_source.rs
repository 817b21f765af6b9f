//! Shopify order source against a mock Admin REST API.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use geosheet::shopify::{OrderSource, OrderSourceError, ShopifyOrderSource};
use geosheet::testing::{CountingPacer, RecordingSink, fixture_orders};
use geosheet::{ErrorKind, SyncDriver, SyncError, SyncSettings};
use geosheet_core::{Order, OrderId};
use geosheet_integration_tests::{BASIC_AUTH, shopify_config, spawn};
use serde_json::json;

/// A request seen by the mock store.
#[derive(Debug, Clone)]
struct Seen {
    path: &'static str,
    query: HashMap<String, String>,
    authorization: Option<String>,
}

#[derive(Clone)]
struct MockStore {
    orders: Arc<Vec<Order>>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockStore {
    fn new(orders: Vec<Order>) -> Self {
        Self {
            orders: Arc::new(orders),
            seen: Arc::default(),
        }
    }

    fn record(&self, path: &'static str, query: HashMap<String, String>, headers: &HeaderMap) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.seen.lock().unwrap().push(Seen {
            path,
            query,
            authorization,
        });
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

async fn count(
    State(store): State<MockStore>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    store.record("count", query, &headers);
    Json(json!({ "count": store.orders.len() })).into_response()
}

async fn list(
    State(store): State<MockStore>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    store.record("list", query.clone(), &headers);

    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(50);
    let since_id: Option<i64> = query.get("since_id").and_then(|s| s.parse().ok());

    let orders: Vec<&Order> = store
        .orders
        .iter()
        .filter(|order| since_id.is_none_or(|since| order.id.as_i64() > since))
        .take(limit)
        .collect();
    Json(json!({ "orders": orders })).into_response()
}

async fn store_router(orders: Vec<Order>) -> (MockStore, String) {
    let store = MockStore::new(orders);
    let router = Router::new()
        .route("/admin/api/2021-01/orders/count.json", get(count))
        .route("/admin/api/2021-01/orders.json", get(list))
        .with_state(store.clone());
    let origin = spawn(router).await;
    (store, origin)
}

fn source(origin: &str, order_status: Option<&str>) -> ShopifyOrderSource {
    ShopifyOrderSource::with_origin(reqwest::Client::new(), origin, &shopify_config(order_status))
        .unwrap()
}

// ============================================================================
// Requests
// ============================================================================

#[tokio::test]
async fn test_count_and_first_page() {
    let (store, origin) = store_router(fixture_orders(3)).await;
    let source = source(&origin, None);

    assert_eq!(source.count().await.unwrap(), 3);
    let page = source.fetch_page(None, 250).await.unwrap();

    assert_eq!(page.len(), 3);
    assert_eq!(page.get(0).unwrap().id, OrderId::new(1000));
    assert_eq!(
        page.get(2).unwrap().shipping_address.city.as_deref(),
        Some("City 2")
    );

    let seen = store.seen();
    assert_eq!(seen.len(), 2);
    for request in &seen {
        assert_eq!(request.authorization.as_deref(), Some(BASIC_AUTH));
        assert!(!request.query.contains_key("status"));
    }

    let list = &seen[1];
    assert_eq!(list.path, "list");
    assert_eq!(list.query["limit"], "250");
    assert_eq!(list.query["fields"], "id,shipping_address");
    assert!(!list.query.contains_key("since_id"));
}

#[tokio::test]
async fn test_cursor_is_sent_as_since_id() {
    let (store, origin) = store_router(fixture_orders(5)).await;
    let source = source(&origin, None);

    let page = source.fetch_page(Some(OrderId::new(1002)), 2).await.unwrap();

    let ids: Vec<i64> = page.orders().iter().map(|o| o.id.as_i64()).collect();
    assert_eq!(ids, vec![1003, 1004]);
    assert_eq!(store.seen()[0].query["since_id"], "1002");
    assert_eq!(store.seen()[0].query["limit"], "2");
}

#[tokio::test]
async fn test_order_status_filter_on_every_call() {
    let (store, origin) = store_router(fixture_orders(1)).await;
    let source = source(&origin, Some("any"));

    source.count().await.unwrap();
    source.fetch_page(None, 250).await.unwrap();

    for request in store.seen() {
        assert_eq!(request.query["status"], "any", "{}", request.path);
    }
}

#[tokio::test]
async fn test_cursor_past_the_end_is_empty_page() {
    let (_store, origin) = store_router(fixture_orders(2)).await;
    let source = source(&origin, None);

    let page = source.fetch_page(Some(OrderId::new(5000)), 250).await.unwrap();

    assert!(page.is_empty());
}

#[tokio::test]
async fn test_out_of_order_page_is_passed_through() {
    let mut orders = fixture_orders(3);
    orders.swap(0, 2);
    let (_store, origin) = store_router(orders).await;

    let page = source(&origin, None).fetch_page(None, 250).await.unwrap();

    assert!(!page.is_ascending());
    let ids: Vec<i64> = page.orders().iter().map(|o| o.id.as_i64()).collect();
    assert_eq!(ids, vec![1002, 1001, 1000]);
    assert_eq!(page.last_id(), Some(OrderId::new(1000)));
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_unauthorized_is_status_error() {
    let router = Router::new().route(
        "/admin/api/2021-01/orders/count.json",
        get(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"errors": "[API] Invalid API key or access token"})),
            )
        }),
    );
    let origin = spawn(router).await;

    let err = source(&origin, None).count().await.unwrap_err();

    assert!(matches!(err, OrderSourceError::Status { status: 401, ref body } if body.contains("Invalid API key")));
    assert_eq!(SyncError::from(err).kind(), ErrorKind::SourceUnavailable);
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let router = Router::new().route(
        "/admin/api/2021-01/orders.json",
        get(|| async { Json(json!({"orders": [{"id": "not-a-number"}]})) }),
    );
    let origin = spawn(router).await;

    let err = source(&origin, None).fetch_page(None, 250).await.unwrap_err();

    assert!(matches!(err, OrderSourceError::Decode(_)));
    assert_eq!(SyncError::from(err).kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_unreachable_store_is_unavailable() {
    // Bind then drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let origin = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = source(&origin, None).count().await.unwrap_err();

    assert!(matches!(err, OrderSourceError::Unavailable(_)));
}

// ============================================================================
// End to end
// ============================================================================

#[tokio::test]
async fn test_driver_over_http_source() {
    let orders = fixture_orders(260);
    let (store, origin) = store_router(orders.clone()).await;

    let driver = SyncDriver::new(
        source(&origin, None),
        RecordingSink::new(),
        CountingPacer::new(),
        SyncSettings::default(),
    );

    let report = driver.run().await.unwrap();

    assert_eq!(report.rows_written, 260);
    assert_eq!(report.pages_fetched, 2);

    let lists: Vec<Seen> = store.seen().into_iter().filter(|s| s.path == "list").collect();
    assert_eq!(lists.len(), 2);
    assert_eq!(lists[1].query["since_id"], orders[248].id.to_string());

    let last = driver.sink().rows().pop().unwrap();
    assert_eq!(last.row().get(), 261);
    assert_eq!(last.cells()[2].to_string(), "City 259");
}
