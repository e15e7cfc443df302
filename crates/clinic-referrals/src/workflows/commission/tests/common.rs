use std::sync::Arc;

use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::workflows::commission::domain::{
    Agent, AgentId, Clinic, ClinicId, Referral, ReferralId, ReferralStatus, SelfEmployment,
    TreatmentMonth,
};
use crate::workflows::commission::memory::MemoryReferralStore;
use crate::workflows::commission::repository::{ReferralStore, StoreError, TreatmentUpdate};
use crate::workflows::commission::service::CommissionService;
use crate::workflows::commission::tiers::{CommissionTier, CommissionTierTable, SharedTierTable};

pub(super) const AGENT: &str = "agent-1";
pub(super) const MARCH: &str = "2024-03";
pub(super) const APRIL: &str = "2024-04";

pub(super) fn agent_id() -> AgentId {
    AgentId(AGENT.to_string())
}

pub(super) fn referral_id(raw: &str) -> ReferralId {
    ReferralId(raw.to_string())
}

pub(super) fn month(raw: &str) -> TreatmentMonth {
    raw.parse().expect("valid month")
}

pub(super) fn tiers(ladder: &[(i64, f64)]) -> CommissionTierTable {
    CommissionTierTable::new(
        ladder
            .iter()
            .map(|(min_monthly_revenue, commission_rate)| CommissionTier {
                min_monthly_revenue: *min_monthly_revenue,
                commission_rate: *commission_rate,
            })
            .collect(),
    )
    .expect("valid tier table")
}

/// Ladder used by the end-to-end scenarios: 10% up to 250 000, 15% from there.
pub(super) fn two_step_tiers() -> CommissionTierTable {
    tiers(&[(0, 10.0), (250_000, 15.0)])
}

pub(super) fn clinic(id: &str, name: &str, rate: Option<f64>) -> Clinic {
    Clinic {
        id: ClinicId(id.to_string()),
        name: name.to_string(),
        commission_rate: rate,
    }
}

pub(super) fn open_referral(id: &str, patient: &str) -> Referral {
    Referral {
        id: referral_id(id),
        agent_id: agent_id(),
        patient_full_name: patient.to_string(),
        clinic: None,
        clinic_id: None,
        status: ReferralStatus::Scheduled,
        treatment_amount: None,
        commission_amount: None,
        treatment_month: None,
        created_at: Utc
            .with_ymd_and_hms(2024, 2, 20, 12, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

pub(super) fn approved_referral(id: &str, amount: i64, commission: i64, raw_month: &str) -> Referral {
    Referral {
        clinic: Some("Здоровье".to_string()),
        clinic_id: Some(ClinicId("c-plain".to_string())),
        status: ReferralStatus::Completed,
        treatment_amount: Some(amount),
        commission_amount: Some(commission),
        treatment_month: Some(month(raw_month)),
        ..open_referral(id, "Пациент")
    }
}

/// Store with one agent whose earnings equal the seeded commissions.
pub(super) fn store_with(referrals: Vec<Referral>) -> Arc<MemoryReferralStore> {
    let total_earnings = referrals
        .iter()
        .filter_map(|referral| referral.commission_amount)
        .sum();

    let store = MemoryReferralStore::default();
    store
        .insert_agent(Agent {
            id: agent_id(),
            total_earnings,
            self_employment: SelfEmployment::Yes,
            bonus_points: 0,
        })
        .expect("agent seeded");
    store
        .insert_clinic(clinic("c-dream", "ООО «Клиника Мечта»", Some(12.0)))
        .expect("clinic seeded");
    store
        .insert_clinic(clinic("c-plain", "Здоровье", None))
        .expect("clinic seeded");
    for referral in referrals {
        store.insert_referral(referral).expect("referral seeded");
    }
    Arc::new(store)
}

/// The two March referrals from the tier-crossing scenario, priced at the 10% clinic
/// default, plus an open third referral.
pub(super) fn march_scenario_store() -> Arc<MemoryReferralStore> {
    store_with(vec![
        approved_referral("r-1", 100_000, 10_000, MARCH),
        approved_referral("r-2", 200_000, 20_000, MARCH),
        open_referral("r-3", "Смирнова Анна"),
    ])
}

pub(super) fn service(
    store: Arc<MemoryReferralStore>,
    table: Option<CommissionTierTable>,
) -> (
    CommissionService<MemoryReferralStore, SharedTierTable>,
    Arc<SharedTierTable>,
) {
    let shared = Arc::new(SharedTierTable::new(table));
    (CommissionService::new(store, Arc::clone(&shared)), shared)
}

pub(super) fn earnings(store: &MemoryReferralStore) -> i64 {
    store
        .agent(&agent_id())
        .expect("agent lookup")
        .expect("agent present")
        .total_earnings
}

pub(super) fn commission_of(store: &MemoryReferralStore, id: &str) -> Option<i64> {
    store
        .referral(&referral_id(id))
        .expect("referral lookup")
        .expect("referral present")
        .commission_amount
}

pub(super) fn commissions_sum(store: &MemoryReferralStore) -> i64 {
    ["r-1", "r-2", "r-3"]
        .iter()
        .filter_map(|id| store.referral(&referral_id(id)).expect("lookup"))
        .filter_map(|referral| referral.commission_amount)
        .sum()
}

/// Store that fails every call, for error-path routing.
pub(super) struct UnavailableStore;

impl ReferralStore for UnavailableStore {
    fn referral(&self, _id: &ReferralId) -> Result<Option<Referral>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn agent(&self, _id: &AgentId) -> Result<Option<Agent>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn clinic(&self, _id: &ClinicId) -> Result<Option<Clinic>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn clinics(&self) -> Result<Vec<Clinic>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn open_referrals(&self) -> Result<Vec<Referral>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn referrals_for_month(
        &self,
        _agent: &AgentId,
        _month: &TreatmentMonth,
    ) -> Result<Vec<Referral>, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn referral_count(&self, _agent: &AgentId) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn settle_treatment(
        &self,
        _id: &ReferralId,
        _update: TreatmentUpdate,
        _commission_delta: i64,
    ) -> Result<Referral, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }

    fn apply_commission_delta(&self, _id: &ReferralId, _delta: i64) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
