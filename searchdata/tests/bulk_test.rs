//! Bulk batching, per-item correlation and failure reporting

mod common;

use common::{store, MockEngine};
use searchdata::bulk::{
    parse_bulk_requests, BulkOperation, BulkRequest, BulkResultSet, OperationType,
};
use searchdata::transport::NDJSON_CONTENT_TYPE;
use serde_json::{json, Value};

const PREFIX: &str = "services/search-data-service/v1/search";

fn doc_url(index: &str, id: &str) -> String {
    format!("{}/indexes/{}/documents/{}", PREFIX, index, id)
}

fn result_set(result: &searchdata::OperationResult) -> BulkResultSet {
    serde_json::from_str(result.result().expect("bulk result has no body")).unwrap()
}

#[test]
fn test_operation_type_and_url_tokens() {
    let create = BulkRequest::create(BulkOperation::new("/test/indexes/index1", Some(json!({}))));
    assert_eq!(create.operation_type(), Some(OperationType::Create));
    assert_eq!(create.index().as_deref(), Some("index1"));

    let delete = BulkRequest::delete(BulkOperation::new("/test/documents/document1", None));
    assert_eq!(delete.operation_type(), Some(OperationType::Delete));
    assert_eq!(delete.id().as_deref(), Some("document1"));

    assert_eq!(BulkRequest::default().operation_type(), None);
}

#[test]
fn test_parse_wire_requests() {
    let json = r#"[
        {"create": {"metaData": {"url": "/indexes/o/documents/1"}, "document": {"a": 1}}},
        {"update": {"metaData": {"url": "/indexes/o/documents/2", "etag": "4"}, "document": {"a": 2}}},
        {"delete": {"metaData": {"url": "/indexes/o/documents/3", "etag": "1"}}}
    ]"#;
    let requests = parse_bulk_requests(json).unwrap();
    let types: Vec<_> = requests.iter().map(|r| r.operation_type().unwrap()).collect();
    assert_eq!(
        types,
        vec![OperationType::Create, OperationType::Update, OperationType::Delete]
    );
    assert_eq!(
        requests[1].operation().unwrap().meta_data.etag.as_deref(),
        Some("4")
    );
}

#[tokio::test]
async fn test_mixed_batch_all_succeed() {
    let engine = MockEngine::new();
    engine.reply(
        200,
        json!({
            "took": 12,
            "errors": false,
            "items": [
                {"create": {"_index": "orders", "_id": "1", "_version": 1, "status": 201}},
                {"index": {"_index": "orders", "_id": "2", "_version": 5, "status": 200}},
                {"delete": {"_index": "orders", "_id": "3", "_version": 2, "status": 200}}
            ]
        })
        .to_string(),
    );

    let requests = vec![
        BulkRequest::create(BulkOperation::new(doc_url("orders", "1"), Some(json!({"n": 1})))),
        BulkRequest::update(
            BulkOperation::new(doc_url("orders", "2"), Some(json!({"n": 2}))).with_etag("4"),
        ),
        BulkRequest::delete(BulkOperation::new(doc_url("orders", "3"), None).with_etag("1")),
    ];
    let result = store(&engine).perform_bulk_operations(&requests).await;
    assert_eq!(result.result_code(), 200);
    assert!(result.failure_cause().is_none());

    let set = result_set(&result);
    assert_eq!(set.total_operations, 3);
    assert_eq!(set.total_success, 3);
    assert_eq!(set.results[0].operation, OperationType::Create);
    assert_eq!(set.results[0].url, doc_url("orders", "1"));
    assert_eq!(set.results[0].status_code, "201");
    assert_eq!(set.results[0].status_message, "OK");
    assert_eq!(set.results[1].etag.as_deref(), Some("5"));
    assert!(set.results[2].etag.is_none());

    let raw: Value = serde_json::from_str(result.result().unwrap()).unwrap();
    assert!(raw["results"][2].get("etag").is_none());
    assert_eq!(raw["results"][0]["etag"], "1");

    let request = engine.last_request();
    assert_eq!(request.path, "_bulk");
    assert_eq!(request.content_type, NDJSON_CONTENT_TYPE);
    let body = request.body.unwrap();
    assert_eq!(body.lines().count(), 5);
    assert!(body.ends_with('\n'));
}

#[tokio::test]
async fn test_partial_failure_reports_each_item() {
    let engine = MockEngine::new();
    engine.reply(
        200,
        json!({
            "took": 4,
            "errors": true,
            "items": [
                {"create": {"_index": "orders", "_id": "1", "_version": 1, "status": 201}},
                {"index": {"_index": "orders", "_id": "2", "status": 409,
                           "error": {"type": "version_conflict_engine_exception",
                                     "reason": "[2]: version conflict"}}},
                {"delete": {"_index": "orders", "_id": "3", "status": 404, "result": "not_found"}}
            ]
        })
        .to_string(),
    );

    let requests = vec![
        BulkRequest::create(BulkOperation::new(doc_url("orders", "1"), Some(json!({})))),
        BulkRequest::update(
            BulkOperation::new(doc_url("orders", "2"), Some(json!({}))).with_etag("1"),
        ),
        BulkRequest::delete(BulkOperation::new(doc_url("orders", "3"), None)),
    ];
    let result = store(&engine).perform_bulk_operations(&requests).await;
    assert_eq!(result.result_code(), 409);
    assert_eq!(
        result.failure_cause(),
        Some("1 of 3 bulk operations succeeded")
    );

    let set = result_set(&result);
    assert!(set.results[0].is_success());
    assert_eq!(set.results[1].status_code, "409");
    assert_eq!(set.results[1].status_message, "[2]: version conflict");
    assert_eq!(set.results[2].status_code, "404");
    assert_eq!(set.results[2].status_message, "");
}

#[tokio::test]
async fn test_undefined_request_aborts_before_network() {
    let engine = MockEngine::new();
    let requests = vec![
        BulkRequest::create(BulkOperation::new(doc_url("orders", "1"), Some(json!({})))),
        BulkRequest::default(),
    ];

    let result = store(&engine).perform_bulk_operations(&requests).await;
    assert_eq!(result.result_code(), 400);
    assert!(result.failure_cause().unwrap().contains("undefined bulk operation"));
    assert!(engine.requests().is_empty());
}

#[tokio::test]
async fn test_malformed_url_fails_only_that_entry() {
    let engine = MockEngine::new();
    engine.reply(
        200,
        r#"{"took":1,"errors":false,"items":[{"create":{"_index":"orders","_id":"1","_version":1,"status":201}}]}"#,
    );

    let requests = vec![
        BulkRequest::update(BulkOperation::new("/orders/17", Some(json!({})))),
        BulkRequest::create(BulkOperation::new(doc_url("orders", "1"), Some(json!({})))),
    ];
    let result = store(&engine).perform_bulk_operations(&requests).await;
    assert_eq!(result.result_code(), 400);

    let set = result_set(&result);
    assert_eq!(set.total_success, 1);
    assert_eq!(set.results[0].status_code, "400");
    assert_eq!(set.results[0].url, "/orders/17");
    assert!(set.results[1].is_success());

    let body = engine.last_request().body.unwrap();
    assert_eq!(body.lines().count(), 2);
    assert!(!body.contains("\"17\""));
}

#[tokio::test]
async fn test_engine_rejecting_whole_batch() {
    let engine = MockEngine::new();
    engine.reply(
        400,
        r#"{"error":{"type":"illegal_argument_exception","reason":"Malformed action/metadata line [1]"},"status":400}"#,
    );
    let requests = vec![BulkRequest::delete(BulkOperation::new(doc_url("o", "1"), None))];

    let result = store(&engine).perform_bulk_operations(&requests).await;
    assert_eq!(result.result_code(), 400);
    assert_eq!(
        result.failure_cause(),
        Some("Malformed action/metadata line [1]")
    );
}

#[tokio::test]
async fn test_item_count_mismatch_is_an_engine_error() {
    let engine = MockEngine::new();
    engine.reply(200, r#"{"took":1,"errors":false,"items":[]}"#);
    let requests = vec![BulkRequest::delete(BulkOperation::new(doc_url("o", "1"), None))];

    let result = store(&engine).perform_bulk_operations(&requests).await;
    assert_eq!(result.result_code(), 502);
}

#[tokio::test]
async fn test_empty_batch_sends_nothing() {
    let engine = MockEngine::new();
    let result = store(&engine).perform_bulk_operations(&[]).await;
    assert!(result.is_success());
    assert_eq!(result_set(&result).total_operations, 0);
    assert!(engine.requests().is_empty());
}
