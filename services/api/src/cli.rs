use crate::demo::{run_demo, run_match, run_payout_quote, DemoArgs, MatchArgs, PayoutArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use clinic_referrals::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Clinic Referrals",
    about = "Run the clinic referral commission service or its workflows from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Match a CSV export of clinic visits against open referrals
    Match(MatchArgs),
    /// Quote an agent payout for a treatment amount
    Payout(PayoutArgs),
    /// Walk through a month of approvals with tiered commission recalculation
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// JSON snapshot of agents, clinics and referrals to preload
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Match(args) => run_match(args),
        Command::Payout(args) => run_payout_quote(args),
        Command::Demo(args) => run_demo(args),
    }
}
