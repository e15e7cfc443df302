use serde::Serialize;

/// Own referrals an agent needs before bonus points can be withdrawn.
pub const MIN_REFERRALS_FOR_BONUS_PAYOUT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PayoutEligibility {
    Eligible,
    NoBonusPoints,
    InsufficientReferrals { required: usize, actual: usize },
}

impl PayoutEligibility {
    pub fn is_allowed(self) -> bool {
        matches!(self, PayoutEligibility::Eligible)
    }
}

pub fn can_request_payout(total_referrals: usize, bonus_points: i64) -> PayoutEligibility {
    if bonus_points <= 0 {
        return PayoutEligibility::NoBonusPoints;
    }
    if total_referrals < MIN_REFERRALS_FOR_BONUS_PAYOUT {
        return PayoutEligibility::InsufficientReferrals {
            required: MIN_REFERRALS_FOR_BONUS_PAYOUT,
            actual: total_referrals,
        };
    }
    PayoutEligibility::Eligible
}
