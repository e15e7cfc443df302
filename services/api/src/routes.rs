use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use clinic_referrals::workflows::commission::{
    commission_router, tier_admin_router, CommissionService, CommissionTierProvider,
    ReferralStore, SharedTierTable,
};
use clinic_referrals::workflows::intake::{intake_router, ReportDeduplicator, ReportIntakeService};
use clinic_referrals::workflows::payout::{payout_router, PayoutService};
use serde_json::json;
use std::sync::Arc;

/// Services backing the HTTP surface, sharing one referral store.
pub(crate) struct ServiceSet<S, T, D> {
    pub(crate) commission: Arc<CommissionService<S, T>>,
    pub(crate) intake: Arc<ReportIntakeService<S, D>>,
    pub(crate) payout: Arc<PayoutService<S>>,
    pub(crate) tiers: Arc<SharedTierTable>,
}

pub(crate) fn with_service_routes<S, T, D>(services: ServiceSet<S, T, D>) -> Router
where
    S: ReferralStore + 'static,
    T: CommissionTierProvider + 'static,
    D: ReportDeduplicator + 'static,
{
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .merge(intake_router(services.intake))
        .merge(commission_router(services.commission))
        .merge(tier_admin_router(services.tiers))
        .merge(payout_router(services.payout))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
