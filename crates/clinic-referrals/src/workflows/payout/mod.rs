//! Agent payouts: withholding of tax and contributions, and the bonus withdrawal gate.

pub mod calculator;
pub mod eligibility;
pub mod router;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::workflows::commission::domain::{AgentId, SelfEmployment};
use crate::workflows::commission::repository::{ReferralStore, StoreError};

pub use calculator::{
    calculate_payout, PayoutBreakdown, PayoutRequest, INCOME_TAX_PERCENT,
    SOCIAL_CONTRIBUTIONS_PERCENT,
};
pub use eligibility::{can_request_payout, PayoutEligibility, MIN_REFERRALS_FOR_BONUS_PAYOUT};
pub use router::payout_router;

#[derive(Debug, Error)]
pub enum PayoutError {
    #[error("treatment amount must not be negative, got {0}")]
    InvalidAmount(i64),
    #[error("commission rate must be within 0..=100, got {0}")]
    InvalidRate(f64),
    #[error("agent {0} not found")]
    UnknownAgent(AgentId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Eligibility snapshot for one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentEligibility {
    pub agent_id: AgentId,
    pub total_referrals: usize,
    pub bonus_points: i64,
    pub eligibility: PayoutEligibility,
}

pub struct PayoutService<S> {
    store: Arc<S>,
}

impl<S> PayoutService<S>
where
    S: ReferralStore,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn eligibility(&self, agent_id: &AgentId) -> Result<AgentEligibility, PayoutError> {
        let agent = self
            .store
            .agent(agent_id)?
            .ok_or_else(|| PayoutError::UnknownAgent(agent_id.clone()))?;
        let total_referrals = self.store.referral_count(agent_id)?;

        Ok(AgentEligibility {
            agent_id: agent.id,
            total_referrals,
            bonus_points: agent.bonus_points,
            eligibility: can_request_payout(total_referrals, agent.bonus_points),
        })
    }

    /// Quotes a payout, taking the self-employment status from the agent when one is named.
    pub fn quote(
        &self,
        agent_id: Option<&AgentId>,
        treatment_amount: i64,
        commission_rate: f64,
        self_employment: SelfEmployment,
    ) -> Result<PayoutBreakdown, PayoutError> {
        if treatment_amount < 0 {
            return Err(PayoutError::InvalidAmount(treatment_amount));
        }
        if !(0.0..=100.0).contains(&commission_rate) {
            return Err(PayoutError::InvalidRate(commission_rate));
        }

        let self_employment = match agent_id {
            Some(id) => {
                self.store
                    .agent(id)?
                    .ok_or_else(|| PayoutError::UnknownAgent(id.clone()))?
                    .self_employment
            }
            None => self_employment,
        };

        Ok(calculate_payout(&PayoutRequest {
            treatment_amount,
            self_employment,
            commission_rate,
        }))
    }
}
