use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::domain::{Agent, AgentId, Clinic, ClinicId, Referral, ReferralId, TreatmentMonth};
use super::repository::{ReferralStore, StoreError, TreatmentUpdate};

#[derive(Debug, Default)]
struct Tables {
    agents: HashMap<AgentId, Agent>,
    clinics: HashMap<ClinicId, Clinic>,
    referrals: HashMap<ReferralId, Referral>,
}

/// Process-local store backing the service binary and the tests.
#[derive(Debug, Default)]
pub struct MemoryReferralStore {
    tables: Mutex<Tables>,
}

impl MemoryReferralStore {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn insert_agent(&self, agent: Agent) -> Result<(), StoreError> {
        self.lock()?.agents.insert(agent.id.clone(), agent);
        Ok(())
    }

    pub fn insert_clinic(&self, clinic: Clinic) -> Result<(), StoreError> {
        self.lock()?.clinics.insert(clinic.id.clone(), clinic);
        Ok(())
    }

    pub fn insert_referral(&self, referral: Referral) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.agents.contains_key(&referral.agent_id) {
            return Err(StoreError::NotFound(format!("agent {}", referral.agent_id)));
        }
        tables.referrals.insert(referral.id.clone(), referral);
        Ok(())
    }
}

fn checked_balance(agent: &Agent, delta: i64) -> Result<i64, StoreError> {
    let balance = agent.total_earnings;
    let next_balance = balance + delta;
    if next_balance < 0 {
        return Err(StoreError::NegativeEarnings {
            agent: agent.id.clone(),
            balance,
            delta,
        });
    }
    Ok(next_balance)
}

fn sorted_by_creation(mut referrals: Vec<Referral>) -> Vec<Referral> {
    referrals.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    referrals
}

impl ReferralStore for MemoryReferralStore {
    fn referral(&self, id: &ReferralId) -> Result<Option<Referral>, StoreError> {
        Ok(self.lock()?.referrals.get(id).cloned())
    }

    fn agent(&self, id: &AgentId) -> Result<Option<Agent>, StoreError> {
        Ok(self.lock()?.agents.get(id).cloned())
    }

    fn clinic(&self, id: &ClinicId) -> Result<Option<Clinic>, StoreError> {
        Ok(self.lock()?.clinics.get(id).cloned())
    }

    fn clinics(&self) -> Result<Vec<Clinic>, StoreError> {
        let mut clinics: Vec<Clinic> = self.lock()?.clinics.values().cloned().collect();
        clinics.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(clinics)
    }

    fn open_referrals(&self) -> Result<Vec<Referral>, StoreError> {
        let tables = self.lock()?;
        let open = tables
            .referrals
            .values()
            .filter(|referral| referral.status.is_open())
            .cloned()
            .collect();
        Ok(sorted_by_creation(open))
    }

    fn referrals_for_month(
        &self,
        agent: &AgentId,
        month: &TreatmentMonth,
    ) -> Result<Vec<Referral>, StoreError> {
        let tables = self.lock()?;
        let matching = tables
            .referrals
            .values()
            .filter(|referral| {
                &referral.agent_id == agent && referral.treatment_month.as_ref() == Some(month)
            })
            .cloned()
            .collect();
        Ok(sorted_by_creation(matching))
    }

    fn referral_count(&self, agent: &AgentId) -> Result<usize, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .referrals
            .values()
            .filter(|referral| &referral.agent_id == agent)
            .count())
    }

    fn settle_treatment(
        &self,
        id: &ReferralId,
        update: TreatmentUpdate,
        commission_delta: i64,
    ) -> Result<Referral, StoreError> {
        let mut tables = self.lock()?;
        let Tables {
            agents, referrals, ..
        } = &mut *tables;

        let referral = referrals
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("referral {id}")))?;
        let agent = agents
            .get_mut(&referral.agent_id)
            .ok_or_else(|| StoreError::NotFound(format!("agent {}", referral.agent_id)))?;
        let next_balance = checked_balance(agent, commission_delta)?;

        agent.total_earnings = next_balance;
        referral.commission_amount =
            Some(referral.commission_amount.unwrap_or(0) + commission_delta);
        referral.clinic = update.clinic;
        referral.clinic_id = update.clinic_id;
        referral.treatment_amount = Some(update.treatment_amount);
        referral.treatment_month = Some(update.treatment_month);
        referral.status = update.status;
        Ok(referral.clone())
    }

    fn apply_commission_delta(&self, id: &ReferralId, delta: i64) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let Tables {
            agents, referrals, ..
        } = &mut *tables;

        let referral = referrals
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("referral {id}")))?;
        let agent = agents
            .get_mut(&referral.agent_id)
            .ok_or_else(|| StoreError::NotFound(format!("agent {}", referral.agent_id)))?;

        let next_balance = checked_balance(agent, delta)?;

        agent.total_earnings = next_balance;
        referral.commission_amount = Some(referral.commission_amount.unwrap_or(0) + delta);
        Ok(())
    }
}
