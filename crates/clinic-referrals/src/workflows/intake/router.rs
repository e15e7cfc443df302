use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::Utc;
use serde_json::json;

use super::dedup::ReportDeduplicator;
use super::{IncomingReport, IntakeError, ReportIntakeService, VisitReportImporter};
use crate::workflows::commission::repository::ReferralStore;

/// Router exposing report matching for single reports and CSV batches.
pub fn intake_router<S, D>(service: Arc<ReportIntakeService<S, D>>) -> Router
where
    S: ReferralStore + 'static,
    D: ReportDeduplicator + 'static,
{
    Router::new()
        .route("/api/v1/reports/match", post(match_handler::<S, D>))
        .route("/api/v1/reports/import", post(import_handler::<S, D>))
        .with_state(service)
}

pub(crate) async fn match_handler<S, D>(
    State(service): State<Arc<ReportIntakeService<S, D>>>,
    axum::Json(report): axum::Json<IncomingReport>,
) -> Response
where
    S: ReferralStore + 'static,
    D: ReportDeduplicator + 'static,
{
    match service.propose(report, Utc::now()) {
        Ok(proposal) => (StatusCode::OK, axum::Json(proposal)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn import_handler<S, D>(
    State(service): State<Arc<ReportIntakeService<S, D>>>,
    body: String,
) -> Response
where
    S: ReferralStore + 'static,
    D: ReportDeduplicator + 'static,
{
    let reports = match VisitReportImporter::from_reader(Cursor::new(body.into_bytes())) {
        Ok(reports) => reports,
        Err(error) => return error_response(error),
    };

    match service.propose_batch(reports, Utc::now()) {
        Ok(proposals) => (StatusCode::OK, axum::Json(proposals)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: IntakeError) -> Response {
    let status = match error {
        IntakeError::Csv(_) => StatusCode::BAD_REQUEST,
        IntakeError::Io(_) | IntakeError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
