use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::domain::{
    commission_for, Clinic, ClinicId, Referral, ReferralId, ReferralStatus, TreatmentMonth,
};
use super::locks::AgentMonthLocks;
use super::recalculation::{MonthlyRecalculationEngine, RecalculationReport};
use super::repository::{ReferralStore, StoreError, TreatmentUpdate};
use super::tiers::CommissionTierProvider;

/// Rate used when neither a global tier nor the clinic supplies one.
pub const DEFAULT_COMMISSION_RATE: f64 = 10.0;

/// Reviewer decision binding a visit report to a referral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub treatment_amount: i64,
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    /// Takes precedence over the month derived from `visit_date`.
    #[serde(default)]
    pub treatment_month: Option<TreatmentMonth>,
    #[serde(default)]
    pub clinic_id: Option<ClinicId>,
}

impl ApprovalRequest {
    fn month(&self) -> Result<TreatmentMonth, ApprovalError> {
        self.treatment_month
            .or_else(|| self.visit_date.map(TreatmentMonth::from_date))
            .ok_or(ApprovalError::MissingTreatmentMonth)
    }
}

/// Where the applied commission rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    GlobalTier,
    Clinic,
    Default,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalOutcome {
    pub referral: Referral,
    pub commission_rate: f64,
    pub rate_source: RateSource,
    /// Change applied to the approved referral's own commission.
    pub commission_delta: i64,
    pub recalculations: Vec<RecalculationReport>,
}

/// Approval workflow: records the treatment, prices the referral and converges the month.
pub struct CommissionService<S, T> {
    store: Arc<S>,
    engine: MonthlyRecalculationEngine<S, T>,
    locks: Arc<AgentMonthLocks>,
    default_rate: f64,
}

impl<S, T> CommissionService<S, T>
where
    S: ReferralStore + 'static,
    T: CommissionTierProvider + 'static,
{
    pub fn new(store: Arc<S>, tiers: Arc<T>) -> Self {
        Self::with_default_rate(store, tiers, DEFAULT_COMMISSION_RATE)
    }

    pub fn with_default_rate(store: Arc<S>, tiers: Arc<T>, default_rate: f64) -> Self {
        let locks = Arc::new(AgentMonthLocks::default());
        let engine = MonthlyRecalculationEngine::new(Arc::clone(&store), tiers, Arc::clone(&locks));
        Self {
            store,
            engine,
            locks,
            default_rate,
        }
    }

    pub fn engine(&self) -> &MonthlyRecalculationEngine<S, T> {
        &self.engine
    }

    /// Approve a visit for `referral_id`. Every referral of the affected agent-month is
    /// re-priced afterwards because the approval can move the agent into another tier.
    pub fn approve(
        &self,
        referral_id: &ReferralId,
        request: ApprovalRequest,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        if request.treatment_amount < 0 {
            return Err(ApprovalError::InvalidAmount(request.treatment_amount));
        }
        let month = request.month()?;

        loop {
            let referral = self.fetch_referral(referral_id)?;
            let mut months = vec![month];
            months.extend(referral.treatment_month.filter(|previous| *previous != month));

            let attempt = self.locks.run_exclusive(
                &referral.agent_id,
                &months,
                || -> Result<Option<ApprovalOutcome>, ApprovalError> {
                    // The referral may have been re-attributed while we waited for the locks.
                    let current = self.fetch_referral(referral_id)?;
                    match current.treatment_month {
                        Some(previous) if !months.contains(&previous) => Ok(None),
                        _ => self.approve_locked(current, &request, month).map(Some),
                    }
                },
            );

            if let Some(outcome) = attempt? {
                return Ok(outcome);
            }
        }
    }

    fn approve_locked(
        &self,
        referral: Referral,
        request: &ApprovalRequest,
        month: TreatmentMonth,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let clinic = self.bound_clinic(&referral, request.clinic_id.as_ref())?;
        let previous_month = referral.treatment_month.filter(|previous| *previous != month);

        let (commission_rate, rate_source) = match self.engine.resolver().resolve_with_treatment(
            &referral.agent_id,
            &month,
            &referral.id,
            request.treatment_amount,
        )? {
            Some(rate) => (rate, RateSource::GlobalTier),
            None => match clinic.as_ref().and_then(|clinic| clinic.commission_rate) {
                Some(rate) => (rate, RateSource::Clinic),
                None => (self.default_rate, RateSource::Default),
            },
        };
        let commission_delta = commission_for(request.treatment_amount, commission_rate)
            - referral.commission_amount.unwrap_or(0);

        let update = TreatmentUpdate {
            clinic: clinic
                .as_ref()
                .map(|clinic| clinic.name.clone())
                .or_else(|| referral.clinic.clone()),
            clinic_id: clinic
                .as_ref()
                .map(|clinic| clinic.id.clone())
                .or_else(|| referral.clinic_id.clone()),
            treatment_amount: request.treatment_amount,
            treatment_month: month,
            status: ReferralStatus::Completed,
        };
        self.store
            .settle_treatment(&referral.id, update, commission_delta)?;

        let mut recalculations = vec![self.engine.recalculate_locked(&referral.agent_id, &month)?];
        if let Some(previous) = previous_month {
            recalculations.push(
                self.engine
                    .recalculate_locked(&referral.agent_id, &previous)?,
            );
        }

        let referral = self.fetch_referral(&referral.id)?;
        info!(
            referral = %referral.id,
            agent = %referral.agent_id,
            month = %month,
            commission_rate,
            ?rate_source,
            commission_delta,
            "referral approved"
        );

        Ok(ApprovalOutcome {
            referral,
            commission_rate,
            rate_source,
            commission_delta,
            recalculations,
        })
    }

    fn fetch_referral(&self, id: &ReferralId) -> Result<Referral, StoreError> {
        self.store
            .referral(id)?
            .ok_or_else(|| StoreError::NotFound(format!("referral {id}")))
    }

    fn bound_clinic(
        &self,
        referral: &Referral,
        requested: Option<&ClinicId>,
    ) -> Result<Option<Clinic>, ApprovalError> {
        match requested {
            Some(id) => self
                .store
                .clinic(id)?
                .map(Some)
                .ok_or_else(|| ApprovalError::UnknownClinic(id.clone())),
            None => match &referral.clinic_id {
                Some(id) => Ok(self.store.clinic(id)?),
                None => Ok(None),
            },
        }
    }
}

/// Error raised by the approval workflow.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    #[error("treatment amount {0} must not be negative")]
    InvalidAmount(i64),
    #[error("either treatment_month or visit_date is required")]
    MissingTreatmentMonth,
    #[error("clinic {0} is not known")]
    UnknownClinic(ClinicId),
    #[error(transparent)]
    Store(#[from] StoreError),
}
