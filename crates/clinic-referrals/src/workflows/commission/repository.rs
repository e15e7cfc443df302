use serde::{Deserialize, Serialize};

use super::domain::{
    Agent, AgentId, Clinic, ClinicId, Referral, ReferralId, ReferralStatus, TreatmentMonth,
};

/// Fields the approval workflow is allowed to write on a referral. Commission is not among
/// them: it only ever moves by signed deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentUpdate {
    pub clinic: Option<String>,
    pub clinic_id: Option<ClinicId>,
    pub treatment_amount: i64,
    pub treatment_month: TreatmentMonth,
    pub status: ReferralStatus,
}

/// Storage abstraction so the commission workflow can be exercised in isolation.
///
/// Earnings aggregates can only be moved by signed deltas; there is no way to overwrite
/// `Agent::total_earnings`.
pub trait ReferralStore: Send + Sync {
    fn referral(&self, id: &ReferralId) -> Result<Option<Referral>, StoreError>;
    fn agent(&self, id: &AgentId) -> Result<Option<Agent>, StoreError>;
    fn clinic(&self, id: &ClinicId) -> Result<Option<Clinic>, StoreError>;
    fn clinics(&self) -> Result<Vec<Clinic>, StoreError>;
    fn open_referrals(&self) -> Result<Vec<Referral>, StoreError>;
    fn referrals_for_month(
        &self,
        agent: &AgentId,
        month: &TreatmentMonth,
    ) -> Result<Vec<Referral>, StoreError>;
    fn referral_count(&self, agent: &AgentId) -> Result<usize, StoreError>;
    /// Write the treatment and apply `commission_delta` to the referral and its agent as one
    /// unit. When the delta is rejected nothing is written.
    fn settle_treatment(
        &self,
        id: &ReferralId,
        update: TreatmentUpdate,
        commission_delta: i64,
    ) -> Result<Referral, StoreError>;
    /// Add `delta` to the referral's commission and to its agent's earnings as one unit.
    fn apply_commission_delta(&self, id: &ReferralId, delta: i64) -> Result<(), StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("delta {delta} would take earnings of agent {agent} below zero (balance {balance})")]
    NegativeEarnings {
        agent: AgentId,
        balance: i64,
        delta: i64,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
