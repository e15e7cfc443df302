use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::domain::{AgentId, ReferralId, TreatmentMonth};
use super::repository::{ReferralStore, StoreError};

pub const TIER_TABLE_VERSION: u32 = 1;

/// One rung of the global commission ladder.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionTier {
    pub min_monthly_revenue: i64,
    pub commission_rate: f64,
}

#[derive(Debug, Deserialize)]
struct RawTierTable {
    #[serde(default = "default_version")]
    version: u32,
    tiers: Vec<CommissionTier>,
}

fn default_version() -> u32 {
    TIER_TABLE_VERSION
}

/// Validated tier ladder, kept sorted by descending threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommissionTierTable {
    version: u32,
    tiers: Vec<CommissionTier>,
}

impl CommissionTierTable {
    pub fn new(tiers: Vec<CommissionTier>) -> Result<Self, TierTableError> {
        Self::with_version(TIER_TABLE_VERSION, tiers)
    }

    fn with_version(version: u32, mut tiers: Vec<CommissionTier>) -> Result<Self, TierTableError> {
        if version != TIER_TABLE_VERSION {
            return Err(TierTableError::UnsupportedVersion(version));
        }
        if tiers.is_empty() {
            return Err(TierTableError::Empty);
        }

        for tier in &tiers {
            if tier.min_monthly_revenue < 0 {
                return Err(TierTableError::NegativeThreshold(tier.min_monthly_revenue));
            }
            if !tier.commission_rate.is_finite() || !(0.0..=100.0).contains(&tier.commission_rate)
            {
                return Err(TierTableError::RateOutOfRange(tier.commission_rate));
            }
        }

        tiers.sort_by(|a, b| b.min_monthly_revenue.cmp(&a.min_monthly_revenue));
        if let Some(pair) = tiers
            .windows(2)
            .find(|pair| pair[0].min_monthly_revenue == pair[1].min_monthly_revenue)
        {
            return Err(TierTableError::DuplicateThreshold(pair[0].min_monthly_revenue));
        }

        Ok(Self { version, tiers })
    }

    /// Parse the admin-supplied JSON document, e.g.
    /// `{"version":1,"tiers":[{"min_monthly_revenue":0,"commission_rate":10}]}`.
    pub fn from_json(raw: &str) -> Result<Self, TierTableError> {
        let parsed: RawTierTable = serde_json::from_str(raw)?;
        Self::with_version(parsed.version, parsed.tiers)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Tiers in descending threshold order.
    pub fn tiers(&self) -> &[CommissionTier] {
        &self.tiers
    }

    /// Rate of the highest threshold not above `monthly_revenue`; the lowest tier acts as a
    /// floor when revenue is below every threshold.
    pub fn rate_for(&self, monthly_revenue: i64) -> f64 {
        self.tiers
            .iter()
            .find(|tier| tier.min_monthly_revenue <= monthly_revenue)
            .or_else(|| self.tiers.last())
            .map(|tier| tier.commission_rate)
            .unwrap_or_default()
    }
}

impl<'de> Deserialize<'de> for CommissionTierTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawTierTable::deserialize(deserializer)?;
        Self::with_version(raw.version, raw.tiers).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TierTableError {
    #[error("tier table must contain at least one tier")]
    Empty,
    #[error("tier table version {0} is not supported")]
    UnsupportedVersion(u32),
    #[error("duplicate tier threshold {0}")]
    DuplicateThreshold(i64),
    #[error("tier threshold {0} must not be negative")]
    NegativeThreshold(i64),
    #[error("commission rate {0} must be between 0 and 100")]
    RateOutOfRange(f64),
    #[error("malformed tier table: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Source of the currently active global tier table.
pub trait CommissionTierProvider: Send + Sync {
    fn current(&self) -> Option<Arc<CommissionTierTable>>;
}

/// Tier table replaced wholesale by an admin action.
#[derive(Debug, Default)]
pub struct SharedTierTable {
    table: RwLock<Option<Arc<CommissionTierTable>>>,
}

impl SharedTierTable {
    pub fn new(table: Option<CommissionTierTable>) -> Self {
        Self {
            table: RwLock::new(table.map(Arc::new)),
        }
    }

    pub fn replace(&self, table: Option<CommissionTierTable>) {
        let mut guard = match self.table.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = table.map(Arc::new);
    }
}

impl CommissionTierProvider for SharedTierTable {
    fn current(&self) -> Option<Arc<CommissionTierTable>> {
        match self.table.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Resolves an agent's effective rate for a month from the global tier table.
pub struct CommissionTierResolver<S, T> {
    store: Arc<S>,
    tiers: Arc<T>,
}

impl<S, T> CommissionTierResolver<S, T>
where
    S: ReferralStore,
    T: CommissionTierProvider,
{
    pub fn new(store: Arc<S>, tiers: Arc<T>) -> Self {
        Self { store, tiers }
    }

    /// `None` means no global tiers are configured and the clinic's own rate applies.
    pub fn resolve(
        &self,
        agent: &AgentId,
        month: &TreatmentMonth,
    ) -> Result<Option<f64>, StoreError> {
        let Some(table) = self.tiers.current() else {
            return Ok(None);
        };

        let revenue = self.monthly_revenue(agent, month)?;
        Ok(Some(table.rate_for(revenue)))
    }

    /// Rate the month would resolve to once `referral` carries `treatment_amount`, read
    /// before anything is written.
    pub fn resolve_with_treatment(
        &self,
        agent: &AgentId,
        month: &TreatmentMonth,
        referral: &ReferralId,
        treatment_amount: i64,
    ) -> Result<Option<f64>, StoreError> {
        let Some(table) = self.tiers.current() else {
            return Ok(None);
        };

        let others: i64 = self
            .store
            .referrals_for_month(agent, month)?
            .iter()
            .filter(|candidate| &candidate.id != referral)
            .filter_map(|candidate| candidate.treatment_amount)
            .sum();
        Ok(Some(table.rate_for(others + treatment_amount)))
    }

    /// Sum of treatment amounts attributed to the month, regardless of status.
    pub fn monthly_revenue(
        &self,
        agent: &AgentId,
        month: &TreatmentMonth,
    ) -> Result<i64, StoreError> {
        let referrals = self.store.referrals_for_month(agent, month)?;
        Ok(referrals
            .iter()
            .filter_map(|referral| referral.treatment_amount)
            .sum())
    }
}
