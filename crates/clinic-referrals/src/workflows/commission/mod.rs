//! Tiered commission: approval of visits, tier resolution and monthly convergence of
//! stored commissions and agent earnings.

pub mod domain;
pub mod locks;
pub mod memory;
pub mod recalculation;
pub mod repository;
pub mod router;
pub mod service;
pub mod tiers;

#[cfg(test)]
mod tests;

pub use domain::{
    commission_for, gross_for, rate_basis_points, Agent, AgentId, Clinic, ClinicId, Referral,
    ReferralId, ReferralStatus, SelfEmployment, TreatmentMonth, TreatmentMonthError,
};
pub use locks::AgentMonthLocks;
pub use memory::MemoryReferralStore;
pub use recalculation::{CommissionAdjustment, MonthlyRecalculationEngine, RecalculationReport};
pub use repository::{ReferralStore, StoreError, TreatmentUpdate};
pub use router::{commission_router, tier_admin_router};
pub use service::{
    ApprovalError, ApprovalOutcome, ApprovalRequest, CommissionService, RateSource,
    DEFAULT_COMMISSION_RATE,
};
pub use tiers::{
    CommissionTier, CommissionTierProvider, CommissionTierResolver, CommissionTierTable,
    SharedTierTable, TierTableError,
};
