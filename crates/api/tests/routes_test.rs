//! Router tests over the in-memory store.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use http_body_util::BodyExt;
use residia_api::{AppState, create_router, middleware::INTERNAL_KEY_HEADER};
use residia_core::billing::{BillingRecord, BillingStatus};
use residia_core::community::{Community, CommunityKind, RateConfiguration, Unit};
use residia_core::ledger::{ExpenseRecord, ExpenseStatus};
use residia_core::store::MemoryStore;
use residia_shared::types::{
    BillingRecordId, CommunityId, ExpenseId, RateConfigurationId, UnitId, UserId,
};
use residia_shared::{ApiConfig, BillingConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tower::ServiceExt;

const KEY: &str = "test-internal-key";

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn app(store: &Arc<MemoryStore>, key: Option<&str>) -> Router {
    let api = ApiConfig {
        internal_api_key: key.map(str::to_string),
        ..ApiConfig::default()
    };
    let state = AppState::new(
        store.clone(),
        store.clone(),
        &BillingConfig::default(),
        &api,
    );
    create_router(state)
}

/// Rate-based community at 2 per area unit with one 800-area unit from January 2024.
fn seed(store: &MemoryStore) -> (CommunityId, UnitId) {
    let community_id = CommunityId::new();
    store.add_community(Community {
        id: community_id,
        name: "Maple Court".to_string(),
        kind: CommunityKind::RateBased,
        flat_amount: None,
        fixed_amount: None,
        opening_balance: Some(dec!(1000)),
        is_active: true,
    });
    store.add_rate(RateConfiguration {
        id: RateConfigurationId::new(),
        community_id,
        effective_date: date(2024, 1, 1),
        rate_per_area: dec!(2),
        fixed_amount: Decimal::ZERO,
    });
    let unit_id = UnitId::new();
    store.add_unit(Unit {
        id: unit_id,
        community_id,
        user_id: UserId::new(),
        flat_size: Some(dec!(800)),
        maintenance_start_date: Some(date(2024, 1, 1)),
    });
    (community_id, unit_id)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(INTERNAL_KEY_HEADER, KEY)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(INTERNAL_KEY_HEADER, KEY)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn run(store: &Arc<MemoryStore>, body: &Value) -> (StatusCode, Value) {
    send(app(store, Some(KEY)), post_json("/api/v1/billing/runs", body)).await
}

fn decimal(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_health_needs_no_key() {
    let store = Arc::new(MemoryStore::new());
    let request = Request::builder()
        .uri("/api/v1/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app(&store, None), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_internal_routes_require_key() {
    let store = Arc::new(MemoryStore::new());
    let (community_id, _) = seed(&store);
    let uri = format!("/api/v1/communities/{community_id}/ledger?month=2024-02");

    let missing = Request::builder().uri(&uri).body(Body::empty()).unwrap();
    let (status, body) = send(app(&store, Some(KEY)), missing).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let wrong = Request::builder()
        .uri(&uri)
        .header(INTERNAL_KEY_HEADER, "not-the-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(&store, Some(KEY)), wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(app(&store, None), get(&uri)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_billing_run_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    seed(&store);
    let body = serde_json::json!({ "as_of": "2024-03-15" });

    let (status, first) = run(&store, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["records_created"], 3);
    assert_eq!(first["communities_processed"], 1);

    let (status, second) = run(&store, &body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["records_created"], 0);
    assert_eq!(second["periods_already_billed"], 3);
    assert_eq!(store.records().len(), 3);
}

#[tokio::test]
async fn test_billing_dry_run_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    seed(&store);
    let body = serde_json::json!({ "as_of": "2024-03-15", "dry_run": true });

    let (status, report) = run(&store, &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["records_planned"], 3);
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_billing_run_past_current_month_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    seed(&store);
    let body = serde_json::json!({ "as_of": "2999-01-01" });

    let (status, body) = run(&store, &body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert!(store.records().is_empty());
}

#[tokio::test]
async fn test_billing_run_for_unknown_community() {
    let store = Arc::new(MemoryStore::new());
    seed(&store);
    let body = serde_json::json!({
        "as_of": "2024-03-15",
        "community_id": CommunityId::new(),
    });

    let (status, body) = run(&store, &body).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_unavailable_store_answers_503() {
    let store = Arc::new(MemoryStore::new());
    seed(&store);
    store.set_unavailable(true);
    let body = serde_json::json!({ "as_of": "2024-03-15" });

    let (status, body) = run(&store, &body).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["message"], "Service temporarily unavailable");
}

#[tokio::test]
async fn test_unit_schedule_preview() {
    let store = Arc::new(MemoryStore::new());
    let (community_id, unit_id) = seed(&store);
    let uri = format!(
        "/api/v1/communities/{community_id}/units/{unit_id}/schedule?as_of=2024-03-01"
    );

    let (status, body) = send(app(&store, Some(KEY)), get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    let periods = body["periods"].as_array().unwrap();
    assert_eq!(periods.len(), 3);
    assert_eq!(periods[0]["period_date"], "2024-01-01");
    assert_eq!(periods[0]["disposition"], "billable");
    assert_eq!(decimal(&periods[0]["amount"]), dec!(1600));
    assert_eq!(periods[0]["rate_source"]["kind"], "versioned");
    assert!(store.records().is_empty());
}

fn seed_ledger(store: &MemoryStore) -> CommunityId {
    let (community_id, unit_id) = seed(store);
    let record = |period_date, amount, status| BillingRecord {
        id: BillingRecordId::new(),
        unit_id,
        user_id: UserId::new(),
        community_id,
        period_date,
        amount: Some(amount),
        status,
    };
    store.add_record(record(date(2024, 1, 1), dec!(400), BillingStatus::Paid));
    store.add_record(record(date(2024, 2, 1), dec!(500), BillingStatus::Paid));
    store.add_record(record(date(2024, 3, 1), dec!(300), BillingStatus::Pending));
    store.add_expense(ExpenseRecord {
        id: ExpenseId::new(),
        community_id,
        amount: Some(dec!(200)),
        date: date(2024, 2, 10),
        status: ExpenseStatus::Approved,
    });
    store.add_expense(ExpenseRecord {
        id: ExpenseId::new(),
        community_id,
        amount: Some(dec!(999)),
        date: date(2024, 2, 12),
        status: ExpenseStatus::Rejected,
    });
    community_id
}

#[tokio::test]
async fn test_ledger_summary() {
    let store = Arc::new(MemoryStore::new());
    let community_id = seed_ledger(&store);
    let uri = format!("/api/v1/communities/{community_id}/ledger?month=2024-02");

    let (status, body) = send(app(&store, Some(KEY)), get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["month"], "2024-02-01");
    assert_eq!(decimal(&body["previous_balance"]), dec!(1400));
    assert_eq!(decimal(&body["collected_this_month"]), dec!(500));
    assert_eq!(decimal(&body["expenses_this_month"]), dec!(200));
    assert_eq!(decimal(&body["closing_balance"]), dec!(1700));
}

#[tokio::test]
async fn test_ledger_summary_with_opening_override() {
    let store = Arc::new(MemoryStore::new());
    let community_id = seed_ledger(&store);
    let uri = format!(
        "/api/v1/communities/{community_id}/ledger?month=2024-03&opening_balance=0"
    );

    let (status, body) = send(app(&store, Some(KEY)), get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["opening_balance"]), dec!(0));
    assert_eq!(decimal(&body["previous_balance"]), dec!(700));
    assert_eq!(decimal(&body["pending_this_month"]), dec!(300));
    assert_eq!(decimal(&body["closing_balance"]), dec!(700));
}

#[tokio::test]
async fn test_ledger_rejects_bad_input() {
    let store = Arc::new(MemoryStore::new());
    let community_id = seed_ledger(&store);

    let uri = format!("/api/v1/communities/{community_id}/ledger?month=2024-13");
    let (status, body) = send(app(&store, Some(KEY)), get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");

    let uri = format!(
        "/api/v1/communities/{community_id}/ledger?month=2024-02&opening_balance=lots"
    );
    let (status, _) = send(app(&store, Some(KEY)), get(&uri)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/v1/communities/{}/ledger?month=2024-02", CommunityId::new());
    let (status, _) = send(app(&store, Some(KEY)), get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ledger_statement() {
    let store = Arc::new(MemoryStore::new());
    let community_id = seed_ledger(&store);
    let uri = format!(
        "/api/v1/communities/{community_id}/ledger/statement?from=2024-01&to=2024-03"
    );

    let (status, body) = send(app(&store, Some(KEY)), get(&uri)).await;

    assert_eq!(status, StatusCode::OK);
    let months = body["months"].as_array().unwrap();
    assert_eq!(months.len(), 3);
    assert_eq!(decimal(&months[0]["closing_balance"]), dec!(1400));
    assert_eq!(decimal(&months[1]["closing_balance"]), dec!(1700));
    assert_eq!(decimal(&months[2]["closing_balance"]), dec!(1700));

    let too_long = format!(
        "/api/v1/communities/{community_id}/ledger/statement?from=2019-01&to=2024-03"
    );
    let (status, _) = send(app(&store, Some(KEY)), get(&too_long)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
