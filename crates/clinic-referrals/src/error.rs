use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::commission::{ApprovalError, StoreError, TierTableError};
use crate::workflows::intake::IntakeError;
use crate::workflows::payout::PayoutError;

/// Failures surfaced by the service binary and its CLI.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Intake(IntakeError),
    Approval(ApprovalError),
    Payout(PayoutError),
    Store(StoreError),
    Tiers(TierTableError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Intake(err) => write!(f, "report intake error: {}", err),
            AppError::Approval(err) => write!(f, "approval error: {}", err),
            AppError::Payout(err) => write!(f, "payout error: {}", err),
            AppError::Store(err) => write!(f, "store error: {}", err),
            AppError::Tiers(err) => write!(f, "commission tier error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Intake(err) => Some(err),
            AppError::Approval(err) => Some(err),
            AppError::Payout(err) => Some(err),
            AppError::Store(err) => Some(err),
            AppError::Tiers(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Intake(IntakeError::Csv(_))
            | AppError::Approval(ApprovalError::InvalidAmount(_))
            | AppError::Approval(ApprovalError::MissingTreatmentMonth)
            | AppError::Payout(PayoutError::InvalidAmount(_))
            | AppError::Payout(PayoutError::InvalidRate(_))
            | AppError::Tiers(_) => StatusCode::BAD_REQUEST,
            AppError::Approval(ApprovalError::UnknownClinic(_))
            | AppError::Payout(PayoutError::UnknownAgent(_))
            | AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<IntakeError> for AppError {
    fn from(value: IntakeError) -> Self {
        Self::Intake(value)
    }
}

impl From<ApprovalError> for AppError {
    fn from(value: ApprovalError) -> Self {
        Self::Approval(value)
    }
}

impl From<PayoutError> for AppError {
    fn from(value: PayoutError) -> Self {
        Self::Payout(value)
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<TierTableError> for AppError {
    fn from(value: TierTableError) -> Self {
        Self::Tiers(value)
    }
}
