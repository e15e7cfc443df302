//! Intake of clinic visit reports: deduplication, matching against open referrals and
//! proposals for the human reviewer. Nothing here writes to the store.

pub mod dedup;
mod parser;
pub mod router;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::workflows::commission::domain::{Clinic, ClinicId, Referral, ReferralId};
use crate::workflows::commission::repository::{ReferralStore, StoreError};
use crate::workflows::matching::{MatchingConfig, ReferralMatcher};

pub use dedup::{
    DedupOutcome, ReportDeduplicator, ReportFingerprint, TtlDeduplicator, DEFAULT_DEDUP_TTL_SECS,
};
pub use parser::parse_visit_date;
pub use router::intake_router;

/// Visit report received from a clinic. Ephemeral: it is matched, reviewed and then drives
/// an approval, but never stored as a referral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingReport {
    pub patient_name: String,
    #[serde(default)]
    pub clinic_name: Option<String>,
    #[serde(default)]
    pub visit_date: Option<NaiveDate>,
    #[serde(default)]
    pub treatment_amount: Option<i64>,
}

impl IncomingReport {
    pub fn fingerprint(&self) -> ReportFingerprint {
        ReportFingerprint::new(
            &self.patient_name,
            self.clinic_name.as_deref(),
            self.visit_date,
        )
    }
}

/// Matcher suggestion for one report, awaiting human approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchProposal {
    pub report: IncomingReport,
    pub referral_id: Option<ReferralId>,
    pub clinic_id: Option<ClinicId>,
    pub confidence: u8,
    pub duplicate: bool,
}

/// Parses CSV visit exports into reports.
pub struct VisitReportImporter;

impl VisitReportImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<IncomingReport>, IntakeError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<IncomingReport>, IntakeError> {
        Ok(parser::parse_reports(reader)?)
    }
}

/// Matches incoming reports against the store's open referrals.
pub struct ReportIntakeService<S, D> {
    store: Arc<S>,
    dedup: Arc<D>,
    matcher: ReferralMatcher,
}

impl<S, D> ReportIntakeService<S, D>
where
    S: ReferralStore + 'static,
    D: ReportDeduplicator + 'static,
{
    pub fn new(store: Arc<S>, dedup: Arc<D>) -> Self {
        Self::with_matching(store, dedup, MatchingConfig::default())
    }

    pub fn with_matching(store: Arc<S>, dedup: Arc<D>, config: MatchingConfig) -> Self {
        Self {
            store,
            dedup,
            matcher: ReferralMatcher::new(config),
        }
    }

    pub fn propose(
        &self,
        report: IncomingReport,
        now: DateTime<Utc>,
    ) -> Result<MatchProposal, IntakeError> {
        let pool = self.candidate_pool(now)?;
        let proposal = self.match_report(report, now, &pool);
        debug!(
            referral = ?proposal.referral_id,
            clinic = ?proposal.clinic_id,
            confidence = proposal.confidence,
            duplicate = proposal.duplicate,
            "visit report matched"
        );
        Ok(proposal)
    }

    /// Match a batch against one snapshot of the candidate pool.
    pub fn propose_batch(
        &self,
        reports: Vec<IncomingReport>,
        now: DateTime<Utc>,
    ) -> Result<Vec<MatchProposal>, IntakeError> {
        let pool = self.candidate_pool(now)?;
        let proposals: Vec<MatchProposal> = reports
            .into_iter()
            .map(|report| self.match_report(report, now, &pool))
            .collect();

        let matched = proposals
            .iter()
            .filter(|proposal| proposal.referral_id.is_some())
            .count();
        info!(
            reports = proposals.len(),
            matched,
            candidates = pool.referrals.len(),
            "visit report batch matched"
        );

        Ok(proposals)
    }

    fn candidate_pool(&self, now: DateTime<Utc>) -> Result<CandidatePool, IntakeError> {
        let expired = self.dedup.sweep(now);
        if expired > 0 {
            debug!(expired, "expired report fingerprints swept");
        }

        Ok(CandidatePool {
            referrals: self.store.open_referrals()?,
            clinics: self.store.clinics()?,
        })
    }

    fn match_report(
        &self,
        report: IncomingReport,
        now: DateTime<Utc>,
        pool: &CandidatePool,
    ) -> MatchProposal {
        let duplicate = self.dedup.observe(&report.fingerprint(), now).is_duplicate();
        let result = self.matcher.find_match(
            &report.patient_name,
            report.clinic_name.as_deref(),
            report.visit_date,
            &pool.referrals,
            &pool.clinics,
        );

        MatchProposal {
            report,
            referral_id: result.referral_id,
            clinic_id: result.clinic_id,
            confidence: result.confidence,
            duplicate,
        }
    }
}

struct CandidatePool {
    referrals: Vec<Referral>,
    clinics: Vec<Clinic>,
}

/// Error raised by report intake.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("failed to read visit export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid visit export: {0}")]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}
