use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::domain::{commission_for, AgentId, ReferralId, TreatmentMonth};
use super::locks::AgentMonthLocks;
use super::repository::{ReferralStore, StoreError};
use super::tiers::{CommissionTierProvider, CommissionTierResolver};

/// Single commission correction applied during a recalculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommissionAdjustment {
    pub referral_id: ReferralId,
    pub previous: i64,
    pub updated: i64,
    pub delta: i64,
}

/// What a recalculation pass changed. `commission_rate` is `None` when no global tiers were
/// configured and nothing was touched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecalculationReport {
    pub agent_id: AgentId,
    pub treatment_month: TreatmentMonth,
    pub commission_rate: Option<f64>,
    pub adjustments: Vec<CommissionAdjustment>,
}

impl RecalculationReport {
    pub fn total_delta(&self) -> i64 {
        self.adjustments.iter().map(|adjustment| adjustment.delta).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.adjustments.is_empty()
    }
}

/// Re-prices every referral of an agent-month at the tier rate the month's revenue earns.
///
/// Stored commissions and the agent aggregate only move by the difference between the stored
/// and the re-priced commission, so a second pass over unchanged data applies nothing.
///
/// Built by [`CommissionService`](super::service::CommissionService) and reached through
/// its `engine()`, so recalculations and approvals share one lock table.
pub struct MonthlyRecalculationEngine<S, T> {
    store: Arc<S>,
    resolver: CommissionTierResolver<S, T>,
    locks: Arc<AgentMonthLocks>,
}

impl<S, T> MonthlyRecalculationEngine<S, T>
where
    S: ReferralStore,
    T: CommissionTierProvider,
{
    pub(crate) fn new(store: Arc<S>, tiers: Arc<T>, locks: Arc<AgentMonthLocks>) -> Self {
        let resolver = CommissionTierResolver::new(Arc::clone(&store), tiers);
        Self {
            store,
            resolver,
            locks,
        }
    }

    pub fn resolver(&self) -> &CommissionTierResolver<S, T> {
        &self.resolver
    }

    pub fn recalculate(
        &self,
        agent: &AgentId,
        month: &TreatmentMonth,
    ) -> Result<RecalculationReport, StoreError> {
        self.locks
            .run_exclusive(agent, &[*month], || self.recalculate_locked(agent, month))
    }

    /// Caller must hold the agent-month lock for `month`.
    pub(crate) fn recalculate_locked(
        &self,
        agent: &AgentId,
        month: &TreatmentMonth,
    ) -> Result<RecalculationReport, StoreError> {
        let mut report = RecalculationReport {
            agent_id: agent.clone(),
            treatment_month: *month,
            commission_rate: None,
            adjustments: Vec::new(),
        };

        let Some(rate) = self.resolver.resolve(agent, month)? else {
            debug!(agent = %agent, month = %month, "no global tiers configured, skipping recalculation");
            return Ok(report);
        };
        report.commission_rate = Some(rate);

        for referral in self.store.referrals_for_month(agent, month)? {
            let Some(amount) = referral.treatment_amount else {
                continue;
            };

            let previous = referral.commission_amount.unwrap_or(0);
            let updated = commission_for(amount, rate);
            let delta = updated - previous;
            if delta == 0 {
                continue;
            }

            if let Err(err) = self.store.apply_commission_delta(&referral.id, delta) {
                warn!(
                    agent = %agent,
                    month = %month,
                    referral = %referral.id,
                    delta,
                    error = %err,
                    "commission adjustment rejected"
                );
                return Err(err);
            }

            debug!(referral = %referral.id, previous, updated, delta, "commission adjusted");
            report.adjustments.push(CommissionAdjustment {
                referral_id: referral.id,
                previous,
                updated,
                delta,
            });
        }

        if !report.is_noop() {
            info!(
                agent = %agent,
                month = %month,
                rate,
                adjusted = report.adjustments.len(),
                total_delta = report.total_delta(),
                "monthly commissions recalculated"
            );
        }

        Ok(report)
    }
}
