use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Router,
};
use serde_json::json;
use tracing::{info, warn};

use super::domain::ReferralId;
use super::repository::{ReferralStore, StoreError};
use super::service::{ApprovalError, ApprovalRequest, CommissionService};
use super::tiers::{CommissionTierProvider, CommissionTierTable, SharedTierTable};

/// Router exposing the approval workflow.
pub fn commission_router<S, T>(service: Arc<CommissionService<S, T>>) -> Router
where
    S: ReferralStore + 'static,
    T: CommissionTierProvider + 'static,
{
    Router::new()
        .route(
            "/api/v1/referrals/:referral_id/approve",
            post(approve_handler::<S, T>),
        )
        .with_state(service)
}

/// Admin router replacing the global tier table wholesale.
pub fn tier_admin_router(tiers: Arc<SharedTierTable>) -> Router {
    Router::new()
        .route("/api/v1/commission/tiers", put(replace_tiers_handler))
        .with_state(tiers)
}

pub(crate) async fn approve_handler<S, T>(
    State(service): State<Arc<CommissionService<S, T>>>,
    Path(referral_id): Path<String>,
    axum::Json(request): axum::Json<ApprovalRequest>,
) -> Response
where
    S: ReferralStore + 'static,
    T: CommissionTierProvider + 'static,
{
    let id = ReferralId(referral_id);
    match service.approve(&id, request) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => {
            let status = match &error {
                ApprovalError::InvalidAmount(_)
                | ApprovalError::MissingTreatmentMonth
                | ApprovalError::UnknownClinic(_) => StatusCode::UNPROCESSABLE_ENTITY,
                ApprovalError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
                ApprovalError::Store(StoreError::NegativeEarnings { .. }) => StatusCode::CONFLICT,
                ApprovalError::Store(StoreError::Unavailable(_)) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            let payload = json!({
                "referral_id": id.0,
                "error": error.to_string(),
            });
            (status, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn replace_tiers_handler(
    State(tiers): State<Arc<SharedTierTable>>,
    body: String,
) -> Response {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        tiers.replace(None);
        info!("global commission tiers cleared");
        return (StatusCode::OK, axum::Json(json!({ "tiers": [] }))).into_response();
    }

    match CommissionTierTable::from_json(trimmed) {
        Ok(table) => {
            info!(
                version = table.version(),
                tiers = table.tiers().len(),
                "global commission tiers replaced"
            );
            let payload = json!({ "version": table.version(), "tiers": table.tiers() });
            tiers.replace(Some(table));
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            warn!(error = %error, "rejected commission tier table");
            let payload = json!({ "error": error.to_string() });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
    }
}
