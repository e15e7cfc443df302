use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::workflows::matching::{normalize_clinic_name, normalize_name};

/// Default window in which a repeated report counts as a duplicate.
pub const DEFAULT_DEDUP_TTL_SECS: i64 = 24 * 60 * 60;

/// Identity of a report for deduplication: normalized patient, clinic and visit date.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReportFingerprint(String);

impl ReportFingerprint {
    pub fn new(patient_name: &str, clinic_name: Option<&str>, visit_date: Option<NaiveDate>) -> Self {
        let clinic = clinic_name.map(normalize_clinic_name).unwrap_or_default();
        let date = visit_date.map(|date| date.to_string()).unwrap_or_default();
        Self(format!("{}|{}|{}", normalize_name(patient_name), clinic, date))
    }
}

impl fmt::Display for ReportFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    Fresh,
    Duplicate { first_seen: DateTime<Utc> },
}

impl DedupOutcome {
    pub fn is_duplicate(self) -> bool {
        matches!(self, DedupOutcome::Duplicate { .. })
    }
}

/// Injected dedup state; callers own its lifecycle and call `sweep` explicitly.
pub trait ReportDeduplicator: Send + Sync {
    fn observe(&self, fingerprint: &ReportFingerprint, now: DateTime<Utc>) -> DedupOutcome;
    /// Drop entries older than the TTL, returning how many were removed.
    fn sweep(&self, now: DateTime<Utc>) -> usize;
}

/// In-memory deduplicator with a fixed time-to-live per fingerprint.
#[derive(Debug)]
pub struct TtlDeduplicator {
    ttl: Duration,
    seen: Mutex<HashMap<ReportFingerprint, DateTime<Utc>>>,
}

impl TtlDeduplicator {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TtlDeduplicator {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_DEDUP_TTL_SECS))
    }
}

// The map only caches observations, so a poisoned lock is taken over rather than failing
// intake.
impl ReportDeduplicator for TtlDeduplicator {
    fn observe(&self, fingerprint: &ReportFingerprint, now: DateTime<Utc>) -> DedupOutcome {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        match seen.get(fingerprint) {
            Some(first_seen) if now - *first_seen < self.ttl => DedupOutcome::Duplicate {
                first_seen: *first_seen,
            },
            _ => {
                seen.insert(fingerprint.clone(), now);
                DedupOutcome::Fresh
            }
        }
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);
        let before = seen.len();
        seen.retain(|_, first_seen| now - *first_seen < self.ttl);
        before - seen.len()
    }
}
