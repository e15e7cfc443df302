use crate::infra::{load_store, parse_date, parse_month};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Args, ValueEnum};
use clinic_referrals::error::AppError;
use clinic_referrals::workflows::commission::{
    Agent, AgentId, ApprovalOutcome, ApprovalRequest, Clinic, ClinicId, CommissionService,
    CommissionTier, CommissionTierTable, MemoryReferralStore, Referral, ReferralId,
    ReferralStatus, ReferralStore, SelfEmployment, SharedTierTable, StoreError, TreatmentMonth,
};
use clinic_referrals::workflows::intake::{
    IncomingReport, MatchProposal, ReportIntakeService, TtlDeduplicator, VisitReportImporter,
};
use clinic_referrals::workflows::payout::{calculate_payout, PayoutRequest, PayoutService};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct MatchArgs {
    /// CSV export with Patient, Clinic, Visit Date and Amount columns
    #[arg(long)]
    pub(crate) csv: PathBuf,
    /// JSON snapshot of agents, clinics and referrals to match against
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub(crate) enum EmploymentArg {
    Yes,
    No,
    #[default]
    Unknown,
}

impl From<EmploymentArg> for SelfEmployment {
    fn from(value: EmploymentArg) -> Self {
        match value {
            EmploymentArg::Yes => SelfEmployment::Yes,
            EmploymentArg::No => SelfEmployment::No,
            EmploymentArg::Unknown => SelfEmployment::Unknown,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct PayoutArgs {
    /// Treatment amount in minor units
    #[arg(long)]
    pub(crate) amount: i64,
    /// Commission rate in percent
    #[arg(long, default_value_t = 10.0)]
    pub(crate) rate: f64,
    /// Whether the agent is registered as self-employed
    #[arg(long, value_enum, default_value_t = EmploymentArg::Unknown)]
    pub(crate) self_employed: EmploymentArg,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Month the demo treatments are attributed to (YYYY-MM). Defaults to 2024-03.
    #[arg(long, value_parser = parse_month)]
    pub(crate) month: Option<TreatmentMonth>,
    /// Visit date used for the demo reports (YYYY-MM-DD). Defaults to the 15th of the month.
    #[arg(long, value_parser = parse_date)]
    pub(crate) visit_date: Option<NaiveDate>,
    /// Skip the visit report matching portion of the demo.
    #[arg(long)]
    pub(crate) skip_matching: bool,
}

pub(crate) fn run_match(args: MatchArgs) -> Result<(), AppError> {
    let store = Arc::new(load_store(args.seed.as_deref())?);
    let reports = VisitReportImporter::from_path(&args.csv)?;
    let service = ReportIntakeService::new(store, Arc::new(TtlDeduplicator::default()));

    let proposals = service.propose_batch(reports, Utc::now())?;
    println!("Matched {} visit reports", proposals.len());
    for proposal in &proposals {
        render_proposal(proposal);
    }
    Ok(())
}

pub(crate) fn run_payout_quote(args: PayoutArgs) -> Result<(), AppError> {
    let service = PayoutService::new(Arc::new(MemoryReferralStore::default()));
    let breakdown = service.quote(None, args.amount, args.rate, args.self_employed.into())?;

    println!("Payout quote");
    println!("- gross: {}", breakdown.gross_amount);
    println!("- income tax withheld: {}", breakdown.tax_amount);
    println!("- social contributions: {}", breakdown.social_contributions);
    println!("- net: {}", breakdown.net_amount);
    println!("  {}", breakdown.details);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let month = args
        .month
        .unwrap_or_else(|| TreatmentMonth::from_date(demo_date(2024, 3, 1)));
    let visit_date = args
        .visit_date
        .unwrap_or_else(|| demo_date(month.year(), month.month(), 15));

    let store = Arc::new(demo_store()?);
    let tiers = Arc::new(SharedTierTable::new(Some(CommissionTierTable::new(vec![
        CommissionTier {
            min_monthly_revenue: 0,
            commission_rate: 10.0,
        },
        CommissionTier {
            min_monthly_revenue: 250_000,
            commission_rate: 15.0,
        },
    ])?)));

    println!("Clinic referral commission demo ({month})");

    if !args.skip_matching {
        let intake = ReportIntakeService::new(store.clone(), Arc::new(TtlDeduplicator::default()));
        let reports = vec![
            demo_report("Иванов Иван", 100_000, visit_date),
            demo_report("Смирнова Анна Петровна", 100_000, visit_date),
            demo_report("Кузнецов Олег", 80_000, visit_date),
            demo_report("Иванов Иван", 100_000, visit_date),
        ];
        println!("\nVisit reports from «Клиника Мечта»");
        for proposal in intake.propose_batch(reports, Utc::now())? {
            render_proposal(&proposal);
        }
    }

    let service = CommissionService::new(store.clone(), tiers);
    println!("\nApprovals");
    for (id, amount) in [("r-1", 100_000), ("r-2", 100_000), ("r-3", 80_000)] {
        let outcome = service.approve(
            &ReferralId(id.to_string()),
            ApprovalRequest {
                treatment_amount: amount,
                visit_date: Some(visit_date),
                treatment_month: Some(month),
                clinic_id: Some(ClinicId("c-dream".to_string())),
            },
        )?;
        render_outcome(&outcome);
    }

    let agent = store
        .agent(&demo_agent_id())?
        .ok_or_else(|| AppError::Store(missing_agent()))?;
    println!("\nAgent {} total earnings: {}", agent.id, agent.total_earnings);

    let payout = calculate_payout(&PayoutRequest {
        treatment_amount: 80_000,
        self_employment: agent.self_employment,
        commission_rate: 15.0,
    });
    println!("Payout for the last visit: {}", payout.details);

    let eligibility = PayoutService::new(store).eligibility(&agent.id)?;
    println!(
        "Bonus withdrawal: {:?} ({} referrals, {} points)",
        eligibility.eligibility, eligibility.total_referrals, eligibility.bonus_points
    );
    Ok(())
}

fn render_proposal(proposal: &MatchProposal) {
    let referral = proposal
        .referral_id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let clinic = proposal
        .clinic_id
        .as_ref()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "- {} -> referral {} clinic {} ({}%){}",
        proposal.report.patient_name,
        referral,
        clinic,
        proposal.confidence,
        if proposal.duplicate {
            " [duplicate]"
        } else {
            ""
        }
    );
}

fn render_outcome(outcome: &ApprovalOutcome) {
    println!(
        "- {} approved at {}% ({:?}): commission {} (delta {})",
        outcome.referral.id,
        outcome.commission_rate,
        outcome.rate_source,
        outcome.referral.commission_amount.unwrap_or_default(),
        outcome.commission_delta
    );
    for report in outcome.recalculations.iter().filter(|report| !report.is_noop()) {
        for adjustment in &report.adjustments {
            println!(
                "    {} recalculated {} -> {} ({:+})",
                adjustment.referral_id, adjustment.previous, adjustment.updated, adjustment.delta
            );
        }
    }
}

fn demo_report(patient: &str, amount: i64, visit_date: NaiveDate) -> IncomingReport {
    IncomingReport {
        patient_name: patient.to_string(),
        clinic_name: Some("Клиника Мечта".to_string()),
        visit_date: Some(visit_date),
        treatment_amount: Some(amount),
    }
}

fn demo_agent_id() -> AgentId {
    AgentId("agent-demo".to_string())
}

fn missing_agent() -> StoreError {
    StoreError::NotFound(format!("agent {}", demo_agent_id()))
}

fn demo_date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

fn demo_store() -> Result<MemoryReferralStore, AppError> {
    let store = MemoryReferralStore::default();
    store.insert_agent(Agent {
        id: demo_agent_id(),
        total_earnings: 0,
        self_employment: SelfEmployment::No,
        bonus_points: 0,
    })?;
    store.insert_clinic(Clinic {
        id: ClinicId("c-dream".to_string()),
        name: "ООО «Клиника Мечта»".to_string(),
        commission_rate: Some(12.0),
    })?;

    let created_at = Utc
        .with_ymd_and_hms(2024, 2, 20, 9, 0, 0)
        .single()
        .unwrap_or_default();
    for (id, patient) in [
        ("r-1", "Иванов Иван Иванович"),
        ("r-2", "Смирнова Анна"),
        ("r-3", "Кузнецов Олег Павлович"),
    ] {
        store.insert_referral(Referral {
            id: ReferralId(id.to_string()),
            agent_id: demo_agent_id(),
            patient_full_name: patient.to_string(),
            clinic: Some("Мечта".to_string()),
            clinic_id: None,
            status: ReferralStatus::Scheduled,
            treatment_amount: None,
            commission_amount: None,
            treatment_month: None,
            created_at,
        })?;
    }
    Ok(store)
}
