use super::common::*;
use crate::workflows::commission::domain::{AgentId, ReferralStatus};
use crate::workflows::commission::tiers::{CommissionTierResolver, SharedTierTable};
use std::sync::Arc;

#[test]
fn resolves_rate_from_monthly_revenue() {
    let ladder = tiers(&[(0, 5.0), (100_000, 8.0), (500_000, 12.0)]);
    let store = store_with(vec![
        approved_referral("r-1", 150_000, 0, MARCH),
        approved_referral("r-2", 100_000, 0, MARCH),
        approved_referral("r-3", 900_000, 0, APRIL),
    ]);
    let resolver =
        CommissionTierResolver::new(Arc::clone(&store), Arc::new(SharedTierTable::new(Some(ladder))));

    assert_eq!(
        resolver
            .monthly_revenue(&agent_id(), &month(MARCH))
            .expect("revenue"),
        250_000
    );
    assert_eq!(
        resolver.resolve(&agent_id(), &month(MARCH)).expect("resolves"),
        Some(8.0)
    );
    assert_eq!(
        resolver.resolve(&agent_id(), &month(APRIL)).expect("resolves"),
        Some(12.0)
    );
    assert_eq!(
        resolver
            .resolve(&agent_id(), &month("2024-05"))
            .expect("resolves"),
        Some(5.0)
    );
}

#[test]
fn revenue_ignores_status_but_not_agent() {
    let mut cancelled = approved_referral("r-1", 300_000, 0, MARCH);
    cancelled.status = ReferralStatus::Cancelled;
    let store = store_with(vec![cancelled]);
    let resolver = CommissionTierResolver::new(
        Arc::clone(&store),
        Arc::new(SharedTierTable::new(Some(two_step_tiers()))),
    );

    assert_eq!(
        resolver.resolve(&agent_id(), &month(MARCH)).expect("resolves"),
        Some(15.0)
    );
    assert_eq!(
        resolver
            .monthly_revenue(&AgentId("someone-else".to_string()), &month(MARCH))
            .expect("revenue"),
        0
    );
}

#[test]
fn missing_table_signals_clinic_default() {
    let store = march_scenario_store();
    let resolver = CommissionTierResolver::new(store, Arc::new(SharedTierTable::default()));
    assert_eq!(
        resolver.resolve(&agent_id(), &month(MARCH)).expect("resolves"),
        None
    );
}
