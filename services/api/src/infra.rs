use chrono::NaiveDate;
use clinic_referrals::error::AppError;
use clinic_referrals::workflows::commission::{
    Agent, Clinic, MemoryReferralStore, Referral, TreatmentMonth,
};
use clinic_referrals::workflows::intake::parse_visit_date;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Snapshot of agents, clinics and referrals used to hydrate the in-memory store.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StoreSeed {
    #[serde(default)]
    pub(crate) agents: Vec<Agent>,
    #[serde(default)]
    pub(crate) clinics: Vec<Clinic>,
    #[serde(default)]
    pub(crate) referrals: Vec<Referral>,
}

impl StoreSeed {
    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)?;
        serde_json::from_str(&raw)
            .map_err(|err| AppError::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
    }

    pub(crate) fn into_store(self) -> Result<MemoryReferralStore, AppError> {
        let store = MemoryReferralStore::default();
        let (agents, clinics, referrals) =
            (self.agents.len(), self.clinics.len(), self.referrals.len());

        for agent in self.agents {
            store.insert_agent(agent)?;
        }
        for clinic in self.clinics {
            store.insert_clinic(clinic)?;
        }
        for referral in self.referrals {
            store.insert_referral(referral)?;
        }

        info!(agents, clinics, referrals, "referral store hydrated");
        Ok(store)
    }
}

pub(crate) fn load_store(seed: Option<&Path>) -> Result<MemoryReferralStore, AppError> {
    match seed {
        Some(path) => StoreSeed::from_path(path)?.into_store(),
        None => Ok(MemoryReferralStore::default()),
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_visit_date(raw)
        .ok_or_else(|| format!("failed to parse '{raw}' as YYYY-MM-DD or DD.MM.YYYY"))
}

pub(crate) fn parse_month(raw: &str) -> Result<TreatmentMonth, String> {
    raw.trim()
        .parse::<TreatmentMonth>()
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinic_referrals::workflows::commission::{AgentId, ReferralStore};

    #[test]
    fn seed_hydrates_store() {
        let seed: StoreSeed = serde_json::from_str(
            r#"{
                "agents": [{"id": "agent-1", "self_employment": "yes"}],
                "clinics": [{"id": "c-1", "name": "Здоровье", "commission_rate": 12}],
                "referrals": [{
                    "id": "r-1",
                    "agent_id": "agent-1",
                    "patient_full_name": "Иванов Иван",
                    "status": "new",
                    "created_at": "2024-02-01T09:00:00Z"
                }]
            }"#,
        )
        .expect("seed parses");

        let store = seed.into_store().expect("store hydrates");
        let agent_id = AgentId("agent-1".to_string());
        assert_eq!(store.referral_count(&agent_id).expect("count"), 1);
        let agent = store.agent(&agent_id).expect("lookup").expect("agent");
        assert_eq!(agent.total_earnings, 0);
        assert!(agent.self_employment.is_self_employed());
    }

    #[test]
    fn seed_rejects_referral_of_unknown_agent() {
        let seed: StoreSeed = serde_json::from_str(
            r#"{"referrals": [{
                "id": "r-1",
                "agent_id": "ghost",
                "patient_full_name": "Петров Пётр",
                "status": "new",
                "created_at": "2024-02-01T09:00:00Z"
            }]}"#,
        )
        .expect("seed parses");

        assert!(matches!(seed.into_store(), Err(AppError::Store(_))));
    }

    #[test]
    fn cli_values_parse() {
        assert_eq!(
            parse_date("15.03.2024"),
            Ok(NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date"))
        );
        assert!(parse_date("someday").is_err());
        assert_eq!(parse_month("2024-03").map(|m| m.month()), Ok(3));
        assert!(parse_month("2024-3").is_err());
    }
}
