use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::{PayoutError, PayoutService};
use crate::workflows::commission::domain::{AgentId, SelfEmployment};
use crate::workflows::commission::repository::{ReferralStore, StoreError};

#[derive(Debug, Deserialize)]
pub(crate) struct QuotePayload {
    #[serde(default)]
    agent_id: Option<AgentId>,
    treatment_amount: i64,
    commission_rate: f64,
    #[serde(default)]
    self_employment: SelfEmployment,
}

pub fn payout_router<S>(service: Arc<PayoutService<S>>) -> Router
where
    S: ReferralStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/agents/:agent_id/payout-eligibility",
            get(eligibility_handler::<S>),
        )
        .route("/api/v1/payouts/quote", post(quote_handler::<S>))
        .with_state(service)
}

pub(crate) async fn eligibility_handler<S>(
    State(service): State<Arc<PayoutService<S>>>,
    Path(agent_id): Path<String>,
) -> Response
where
    S: ReferralStore + 'static,
{
    match service.eligibility(&AgentId(agent_id)) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn quote_handler<S>(
    State(service): State<Arc<PayoutService<S>>>,
    axum::Json(payload): axum::Json<QuotePayload>,
) -> Response
where
    S: ReferralStore + 'static,
{
    match service.quote(
        payload.agent_id.as_ref(),
        payload.treatment_amount,
        payload.commission_rate,
        payload.self_employment,
    ) {
        Ok(breakdown) => (StatusCode::OK, axum::Json(breakdown)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: PayoutError) -> Response {
    let status = match &error {
        PayoutError::InvalidAmount(_) | PayoutError::InvalidRate(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        PayoutError::UnknownAgent(_) | PayoutError::Store(StoreError::NotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        PayoutError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, axum::Json(json!({ "error": error.to_string() }))).into_response()
}
