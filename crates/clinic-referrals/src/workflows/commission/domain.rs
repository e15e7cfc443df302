use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for referrals.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReferralId(pub String);

/// Identifier wrapper for partner clinics.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClinicId(pub String);

/// Identifier wrapper for referring agents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub String);

impl fmt::Display for ReferralId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ClinicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Calendar month a treatment is attributed to, written as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TreatmentMonth {
    year: i32,
    month: u32,
}

impl TreatmentMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, TreatmentMonthError> {
        if !(1..=12).contains(&month) || !(1..=9999).contains(&year) {
            return Err(TreatmentMonthError(format!("{year:04}-{month:02}")));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub const fn year(self) -> i32 {
        self.year
    }

    pub const fn month(self) -> u32 {
        self.month
    }
}

impl fmt::Display for TreatmentMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for TreatmentMonth {
    type Err = TreatmentMonthError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let invalid = || TreatmentMonthError(raw.to_string());

        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

impl TryFrom<String> for TreatmentMonth {
    type Error = TreatmentMonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TreatmentMonth> for String {
    fn from(value: TreatmentMonth) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid YYYY-MM treatment month")]
pub struct TreatmentMonthError(pub String);

/// Referral lifecycle, in the order a referral normally moves through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    New,
    InProgress,
    Contacted,
    Scheduled,
    Visited,
    Completed,
    Cancelled,
}

impl ReferralStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ReferralStatus::New => "new",
            ReferralStatus::InProgress => "in_progress",
            ReferralStatus::Contacted => "contacted",
            ReferralStatus::Scheduled => "scheduled",
            ReferralStatus::Visited => "visited",
            ReferralStatus::Completed => "completed",
            ReferralStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses a visit report may still be matched against.
    pub const fn is_open(self) -> bool {
        matches!(
            self,
            ReferralStatus::New
                | ReferralStatus::InProgress
                | ReferralStatus::Contacted
                | ReferralStatus::Scheduled
                | ReferralStatus::Visited
        )
    }
}

/// A patient referral made by an agent. Amounts are in minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub agent_id: AgentId,
    pub patient_full_name: String,
    pub clinic: Option<String>,
    pub clinic_id: Option<ClinicId>,
    pub status: ReferralStatus,
    pub treatment_amount: Option<i64>,
    pub commission_amount: Option<i64>,
    pub treatment_month: Option<TreatmentMonth>,
    pub created_at: DateTime<Utc>,
}

/// Partner clinic; `commission_rate` is a percentage used when no global tier applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clinic {
    pub id: ClinicId,
    pub name: String,
    pub commission_rate: Option<f64>,
}

/// Whether the platform withholds taxes for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfEmployment {
    Yes,
    No,
    #[default]
    Unknown,
}

impl SelfEmployment {
    pub const fn is_self_employed(self) -> bool {
        matches!(self, SelfEmployment::Yes)
    }
}

impl From<Option<bool>> for SelfEmployment {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => SelfEmployment::Yes,
            Some(false) => SelfEmployment::No,
            None => SelfEmployment::Unknown,
        }
    }
}

/// Referring agent with the running earnings aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    #[serde(default)]
    pub total_earnings: i64,
    #[serde(default)]
    pub self_employment: SelfEmployment,
    #[serde(default)]
    pub bonus_points: i64,
}

const BASIS_POINTS_PER_UNIT: i128 = 10_000;

/// Percentage rate in basis points, so `5.1` becomes `510`. Finer fractions than a basis
/// point round to the nearest one.
pub fn rate_basis_points(rate: f64) -> i64 {
    (rate * 100.0).round() as i64
}

/// `round(amount * rate / 100)` in minor units, halves rounded up. Integer arithmetic only.
pub fn commission_for(treatment_amount: i64, commission_rate: f64) -> i64 {
    let scaled = i128::from(treatment_amount) * i128::from(rate_basis_points(commission_rate));
    (scaled + BASIS_POINTS_PER_UNIT / 2).div_euclid(BASIS_POINTS_PER_UNIT) as i64
}

/// `floor(amount * rate / 100)` in minor units.
pub fn gross_for(treatment_amount: i64, commission_rate: f64) -> i64 {
    let scaled = i128::from(treatment_amount) * i128::from(rate_basis_points(commission_rate));
    scaled.div_euclid(BASIS_POINTS_PER_UNIT) as i64
}
