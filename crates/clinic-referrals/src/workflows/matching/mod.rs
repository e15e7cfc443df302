//! Fuzzy identity resolution of free-text visit reports against open referrals.
//!
//! Scores are integers on a 0..=100 scale. A zero-confidence result means "no usable
//! match" and is handed to a human reviewer rather than treated as an error.

mod normalizer;
mod similarity;

pub use normalizer::normalize_name;
pub use similarity::{
    char_similarity, clinic_similarity, levenshtein_distance, name_similarity,
    name_similarity_with_threshold, TOKEN_ACCEPTANCE_THRESHOLD,
};

pub(crate) use normalizer::normalize_clinic_name;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::workflows::commission::domain::{Clinic, ClinicId, Referral, ReferralId};

/// Tunable matching constants. The defaults were tuned against production reports and
/// should only be changed together with the expectations in the tests below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Per-token score required for a token pairing to count.
    pub token_acceptance_threshold: u8,
    /// Best clinic score below this leaves the report without a clinic binding.
    pub clinic_binding_threshold: u8,
    /// The referral's own clinic must score strictly above this to earn the boost.
    pub clinic_consistency_threshold: u8,
    pub clinic_consistency_boost: u8,
    /// Visits this many days or fewer after referral creation earn the date boost.
    pub visit_window_days: i64,
    pub visit_window_boost: u8,
    /// Applied when the visit predates the referral.
    pub early_visit_penalty: u8,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            token_acceptance_threshold: TOKEN_ACCEPTANCE_THRESHOLD,
            clinic_binding_threshold: 50,
            clinic_consistency_threshold: 60,
            clinic_consistency_boost: 10,
            visit_window_days: 90,
            visit_window_boost: 5,
            early_visit_penalty: 20,
        }
    }
}

/// Outcome of matching one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub referral_id: Option<ReferralId>,
    pub clinic_id: Option<ClinicId>,
    pub confidence: u8,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            referral_id: None,
            clinic_id: None,
            confidence: 0,
        }
    }
}

/// Stateless matcher; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct ReferralMatcher {
    config: MatchingConfig,
}

impl ReferralMatcher {
    pub fn new(config: MatchingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchingConfig {
        &self.config
    }

    /// Pick the referral from `candidates` that best explains the report. The candidate
    /// pool is trusted as given; callers restrict it to open referrals.
    pub fn find_match(
        &self,
        patient_name: &str,
        clinic_name: Option<&str>,
        visit_date: Option<NaiveDate>,
        candidates: &[Referral],
        clinics: &[Clinic],
    ) -> MatchResult {
        if normalize_name(patient_name).is_empty() {
            return MatchResult::no_match();
        }

        let clinic_name = clinic_name.filter(|name| !name.trim().is_empty());
        let clinic_id = clinic_name.and_then(|name| self.resolve_clinic(name, clinics));

        let mut best: Option<(&Referral, u8)> = None;
        for referral in candidates {
            let score = self.score_referral(patient_name, clinic_name, visit_date, referral);
            debug!(referral = %referral.id, score, "scored referral candidate");

            let current_best = best.map(|(_, score)| score).unwrap_or(0);
            if score > current_best {
                best = Some((referral, score));
            }
        }

        match best {
            Some((referral, confidence)) => MatchResult {
                referral_id: Some(referral.id.clone()),
                clinic_id,
                confidence,
            },
            None => MatchResult {
                referral_id: None,
                clinic_id,
                confidence: 0,
            },
        }
    }

    fn resolve_clinic(&self, clinic_name: &str, clinics: &[Clinic]) -> Option<ClinicId> {
        let mut best: Option<(&Clinic, u8)> = None;
        for clinic in clinics {
            let score = clinic_similarity(clinic_name, &clinic.name);
            if best.map(|(_, current)| score > current).unwrap_or(true) {
                best = Some((clinic, score));
            }
        }

        best.filter(|(_, score)| *score >= self.config.clinic_binding_threshold)
            .map(|(clinic, _)| clinic.id.clone())
    }

    fn score_referral(
        &self,
        patient_name: &str,
        clinic_name: Option<&str>,
        visit_date: Option<NaiveDate>,
        referral: &Referral,
    ) -> u8 {
        let config = &self.config;
        let mut score = name_similarity_with_threshold(
            patient_name,
            &referral.patient_full_name,
            config.token_acceptance_threshold,
        );

        if let (Some(reported), Some(own)) = (clinic_name, referral.clinic.as_deref()) {
            if clinic_similarity(reported, own) > config.clinic_consistency_threshold {
                score = score.saturating_add(config.clinic_consistency_boost).min(100);
            }
        }

        if let Some(visit_date) = visit_date {
            let days_diff = (visit_date - referral.created_at.date_naive()).num_days();
            if days_diff < 0 {
                score = score.saturating_sub(config.early_visit_penalty);
            } else if days_diff <= config.visit_window_days {
                score = score.saturating_add(config.visit_window_boost).min(100);
            }
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::commission::domain::{AgentId, ReferralStatus};
    use chrono::{TimeZone, Utc};

    fn referral(id: &str, patient: &str, clinic: Option<&str>, created: (i32, u32, u32)) -> Referral {
        Referral {
            id: ReferralId(id.to_string()),
            agent_id: AgentId("agent-1".to_string()),
            patient_full_name: patient.to_string(),
            clinic: clinic.map(str::to_string),
            clinic_id: None,
            status: ReferralStatus::New,
            treatment_amount: None,
            commission_amount: None,
            treatment_month: None,
            created_at: Utc
                .with_ymd_and_hms(created.0, created.1, created.2, 9, 30, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn clinic(id: &str, name: &str) -> Clinic {
        Clinic {
            id: ClinicId(id.to_string()),
            name: name.to_string(),
            commission_rate: Some(10.0),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn empty_patient_name_never_matches() {
        let matcher = ReferralMatcher::default();
        let candidates = vec![referral("r-1", "Иванов Иван", None, (2024, 3, 1))];
        let result = matcher.find_match("   ", Some("Мечта"), None, &candidates, &[]);
        assert_eq!(result, MatchResult::no_match());
    }

    #[test]
    fn picks_best_name_and_binds_clinic() {
        let matcher = ReferralMatcher::default();
        let candidates = vec![
            referral("r-1", "Петров Пётр", None, (2024, 3, 1)),
            referral("r-2", "Иван Иванов", None, (2024, 3, 1)),
        ];
        let clinics = vec![clinic("c-1", "ООО «Клиника Мечта»"), clinic("c-2", "Здоровье")];

        let result = matcher.find_match("Иванов Иван", Some("Мечта"), None, &candidates, &clinics);

        assert_eq!(result.referral_id, Some(ReferralId("r-2".to_string())));
        assert_eq!(result.clinic_id, Some(ClinicId("c-1".to_string())));
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn weak_clinic_match_leaves_clinic_unbound() {
        let matcher = ReferralMatcher::default();
        let candidates = vec![referral("r-1", "Иванов Иван", None, (2024, 3, 1))];
        let clinics = vec![clinic("c-1", "Здоровье")];

        let result = matcher.find_match("Иванов Иван", Some("Мечта"), None, &candidates, &clinics);

        assert_eq!(result.referral_id, Some(ReferralId("r-1".to_string())));
        assert!(result.clinic_id.is_none());
    }

    #[test]
    fn clinic_consistency_and_visit_window_boost_score() {
        let matcher = ReferralMatcher::default();
        // "Иванов Иван" against "Иван Иванович Иванов" scores 67 on names alone.
        let candidates = vec![referral(
            "r-1",
            "Иван Иванович Иванов",
            Some("Мечта"),
            (2024, 3, 1),
        )];

        let plain = matcher.find_match("Иванов Иван", None, None, &candidates, &[]);
        assert_eq!(plain.confidence, 67);

        let with_clinic =
            matcher.find_match("Иванов Иван", Some("клиника Мечта"), None, &candidates, &[]);
        assert_eq!(with_clinic.confidence, 77);

        let with_both = matcher.find_match(
            "Иванов Иван",
            Some("клиника Мечта"),
            Some(date(2024, 3, 20)),
            &candidates,
            &[],
        );
        assert_eq!(with_both.confidence, 82);

        let outside_window = matcher.find_match(
            "Иванов Иван",
            None,
            Some(date(2024, 9, 1)),
            &candidates,
            &[],
        );
        assert_eq!(outside_window.confidence, 67);
    }

    #[test]
    fn visit_before_referral_is_penalised() {
        let matcher = ReferralMatcher::default();
        let candidates = vec![
            referral("r-early", "Иванов Иван", None, (2024, 3, 10)),
            referral("r-late", "Иван Иванов", None, (2024, 2, 1)),
        ];

        let result = matcher.find_match(
            "Иванов Иван",
            None,
            Some(date(2024, 3, 5)),
            &candidates,
            &[],
        );

        assert_eq!(result.referral_id, Some(ReferralId("r-late".to_string())));
        assert_eq!(result.confidence, 100);

        let only_early = matcher.find_match(
            "Иванов Иван",
            None,
            Some(date(2024, 3, 5)),
            &candidates[..1],
            &[],
        );
        assert_eq!(only_early.confidence, 80);
    }

    #[test]
    fn boosts_are_capped_at_full_confidence() {
        let matcher = ReferralMatcher::default();
        let candidates = vec![referral("r-1", "Анна Смирнова", Some("Мечта"), (2024, 3, 1))];
        let result = matcher.find_match(
            "Смирнова Анна",
            Some("Мечта"),
            Some(date(2024, 3, 2)),
            &candidates,
            &[],
        );
        assert_eq!(result.confidence, 100);
    }

    #[test]
    fn no_candidates_yields_zero_confidence() {
        let matcher = ReferralMatcher::default();
        let clinics = vec![clinic("c-1", "Мечта")];
        let result = matcher.find_match("Иванов Иван", Some("Мечта"), None, &[], &clinics);
        assert!(result.referral_id.is_none());
        assert_eq!(result.clinic_id, Some(ClinicId("c-1".to_string())));
        assert_eq!(result.confidence, 0);
    }

    #[test]
    fn custom_config_changes_thresholds() {
        let matcher = ReferralMatcher::new(MatchingConfig {
            clinic_binding_threshold: 95,
            ..MatchingConfig::default()
        });
        let clinics = vec![clinic("c-1", "Мечта Плюс")];
        let result = matcher.find_match("Иванов Иван", Some("Мечта"), None, &[], &clinics);
        assert!(result.clinic_id.is_none());
    }
}
