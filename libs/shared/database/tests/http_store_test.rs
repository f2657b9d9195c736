// libs/shared/database/tests/http_store_test.rs
use assert_matches::assert_matches;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::AppConfig;
use shared_database::{HttpStore, Query, RecordStore, StoreError};

fn store_for(server: &MockServer) -> HttpStore {
    HttpStore::new(&AppConfig {
        store_url: server.uri(),
        store_api_key: "test-key".to_string(),
    })
}

#[tokio::test]
async fn create_maps_unique_key_conflict_to_already_exists() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/reservation_markers"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "message": "duplicate key value" })),
        )
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let result = store
        .create(
            "reservation_markers",
            "2024-01-10_09:00",
            json!({ "slot_key": "2024-01-10_09:00" }),
        )
        .await;

    assert_matches!(result, Err(StoreError::AlreadyExists));
}

#[tokio::test]
async fn create_posts_the_document_with_its_key() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/reservation_markers"))
        .and(wiremock::matchers::body_partial_json(json!({
            "key": "2024-01-10_09:00",
            "slot_key": "2024-01-10_09:00"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            { "key": "2024-01-10_09:00", "slot_key": "2024-01-10_09:00" }
        ])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let result = store
        .create(
            "reservation_markers",
            "2024-01-10_09:00",
            json!({ "slot_key": "2024-01-10_09:00" }),
        )
        .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn get_returns_the_first_matching_row() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinic_settings"))
        .and(query_param("key", "eq.default"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "key": "default", "slot_minutes": 15 }
        ])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let record = store.get("clinic_settings", "default").await.unwrap();

    assert_eq!(record.unwrap()["slot_minutes"], 15);
}

#[tokio::test]
async fn get_maps_an_empty_result_to_none() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/reservation_markers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let record = store.get("reservation_markers", "2024-01-10_09:00").await.unwrap();

    assert!(record.is_none());
}

#[tokio::test]
async fn get_many_enforces_the_arity_cap_before_any_call() {
    // No mock mounted: an HTTP request would fail loudly.
    let mock_server = MockServer::start().await;
    let store = store_for(&mock_server);

    let keys: Vec<String> = (0..11).map(|i| format!("k{}", i)).collect();
    let result = store.get_many("reservation_markers", &keys).await;

    assert_matches!(result, Err(StoreError::Backend(_)));
}

#[tokio::test]
async fn query_encodes_membership_and_ordering_filters() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("slot_key", "in.(2024-01-10_09:00,2024-01-10_09:15)"))
        .and(query_param("status", "in.(booked,completed)"))
        .and(query_param("order", "start_time.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "slot_key": "2024-01-10_09:00", "status": "booked" }
        ])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let query = Query::new()
        .filter_in(
            "slot_key",
            vec!["2024-01-10_09:00".to_string(), "2024-01-10_09:15".to_string()],
        )
        .filter_in("status", vec!["booked".to_string(), "completed".to_string()])
        .order_asc("start_time");

    let rows = store.query("appointments", &query).await.unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn update_on_a_missing_record_is_not_found() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let result = store
        .update("appointments", "missing", json!({ "status": "cancelled" }))
        .await;

    assert_matches!(result, Err(StoreError::NotFound));
}

#[tokio::test]
async fn server_failures_surface_as_backend_errors() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&mock_server)
        .await;

    let store = store_for(&mock_server);
    let result = store.get("appointments", "some-id").await;

    assert_matches!(result, Err(StoreError::Backend(_)));
}
