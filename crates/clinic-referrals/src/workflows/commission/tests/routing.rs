use super::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::commission::router::{commission_router, tier_admin_router};
use crate::workflows::commission::service::CommissionService;
use crate::workflows::commission::tiers::{CommissionTierProvider, SharedTierTable};

fn approve_request(id: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/v1/referrals/{id}/approve"))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn put_tiers(body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/api/v1/commission/tiers")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

#[tokio::test]
async fn approve_route_returns_outcome() {
    let store = march_scenario_store();
    let (service, _) = service(Arc::clone(&store), Some(two_step_tiers()));
    let app = commission_router(Arc::new(service));

    let response = app
        .oneshot(approve_request(
            "r-3",
            json!({ "treatment_amount": 50_000, "treatment_month": "2024-03" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["rate_source"], "global_tier");
    assert_eq!(body["commission_delta"], 7_500);
    assert_eq!(body["referral"]["status"], "completed");
    assert_eq!(body["referral"]["treatment_month"], "2024-03");
}

#[tokio::test]
async fn approve_route_maps_errors_to_statuses() {
    let store = march_scenario_store();
    let (service, _) = service(store, None);
    let app = commission_router(Arc::new(service));

    let missing = app
        .clone()
        .oneshot(approve_request(
            "r-404",
            json!({ "treatment_amount": 1, "treatment_month": "2024-03" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let negative = app
        .oneshot(approve_request(
            "r-3",
            json!({ "treatment_amount": -5, "treatment_month": "2024-03" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(negative.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(negative).await;
    assert_eq!(body["referral_id"], "r-3");
}

#[tokio::test]
async fn approve_route_reports_unavailable_store() {
    let shared = Arc::new(SharedTierTable::default());
    let service = CommissionService::new(Arc::new(UnavailableStore), shared);
    let app = commission_router(Arc::new(service));

    let response = app
        .oneshot(approve_request(
            "r-1",
            json!({ "treatment_amount": 1, "treatment_month": "2024-03" }),
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn tier_admin_replaces_validates_and_clears() {
    let shared = Arc::new(SharedTierTable::default());
    let app = tier_admin_router(Arc::clone(&shared));

    let accepted = app
        .clone()
        .oneshot(put_tiers(
            r#"{"version":1,"tiers":[{"min_monthly_revenue":0,"commission_rate":10},{"min_monthly_revenue":250000,"commission_rate":15}]}"#,
        ))
        .await
        .expect("router responds");
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(shared.current().map(|table| table.rate_for(300_000)), Some(15.0));

    let duplicate = app
        .clone()
        .oneshot(put_tiers(
            r#"{"tiers":[{"min_monthly_revenue":0,"commission_rate":10},{"min_monthly_revenue":0,"commission_rate":15}]}"#,
        ))
        .await
        .expect("router responds");
    assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(shared.current().is_some(), "invalid table must not replace the active one");

    let cleared = app.oneshot(put_tiers("null")).await.expect("router responds");
    assert_eq!(cleared.status(), StatusCode::OK);
    assert!(shared.current().is_none());
}
