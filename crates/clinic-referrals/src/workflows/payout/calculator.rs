use serde::{Deserialize, Serialize};

use crate::workflows::commission::domain::{gross_for, SelfEmployment};

/// Personal income tax withheld for agents who are not self-employed.
pub const INCOME_TAX_PERCENT: i64 = 13;
/// Social contributions paid on top for agents who are not self-employed.
pub const SOCIAL_CONTRIBUTIONS_PERCENT: i64 = 30;

/// Inputs are validated by the caller; a negative or out-of-range `treatment_amount` is a
/// caller error and is not handled here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub treatment_amount: i64,
    #[serde(default)]
    pub self_employment: SelfEmployment,
    pub commission_rate: f64,
}

/// Payout amounts in minor units. `details` is a human-readable summary only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutBreakdown {
    pub gross_amount: i64,
    pub net_amount: i64,
    pub tax_amount: i64,
    pub social_contributions: i64,
    pub details: String,
}

/// Self-employed agents are paid gross and settle their own tax; everyone else, including
/// agents whose status is still unknown, has tax and contributions withheld.
pub fn calculate_payout(request: &PayoutRequest) -> PayoutBreakdown {
    let gross_amount = gross_for(request.treatment_amount, request.commission_rate);

    if request.self_employment.is_self_employed() {
        return PayoutBreakdown {
            gross_amount,
            net_amount: gross_amount,
            tax_amount: 0,
            social_contributions: 0,
            details: format!(
                "commission {}% of {}: {}; self-employed, paid gross",
                request.commission_rate,
                format_minor(request.treatment_amount),
                format_minor(gross_amount)
            ),
        };
    }

    let tax_amount = gross_amount * INCOME_TAX_PERCENT / 100;
    let social_contributions = gross_amount * SOCIAL_CONTRIBUTIONS_PERCENT / 100;
    let net_amount = gross_amount - tax_amount - social_contributions;

    PayoutBreakdown {
        gross_amount,
        net_amount,
        tax_amount,
        social_contributions,
        details: format!(
            "commission {}% of {}: {}; income tax {}%: {}; social contributions {}%: {}; net {}",
            request.commission_rate,
            format_minor(request.treatment_amount),
            format_minor(gross_amount),
            INCOME_TAX_PERCENT,
            format_minor(tax_amount),
            SOCIAL_CONTRIBUTIONS_PERCENT,
            format_minor(social_contributions),
            format_minor(net_amount)
        ),
    }
}

fn format_minor(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let absolute = amount.unsigned_abs();
    format!("{sign}{}.{:02}", absolute / 100, absolute % 100)
}
