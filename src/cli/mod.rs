//! CLI command definitions and handlers

pub mod capital;
pub mod context;
pub mod login;
pub mod logout;
pub mod register;
pub mod status;
pub mod summary;
pub mod transactions;
pub mod transfers;
pub mod wallet;

pub use context::AppContext;

use clap::{Args, Parser, Subcommand};

use crate::chart::TimeFilter;
use crate::dashboard::DEFAULT_RECENT_LIMIT;

const LONG_ABOUT: &str = r#"
Terminal client for the finboard financial dashboard.

QUICK START:
    1. finboard login          Sign in (prompts for email and password)
    2. finboard summary        Balance, spending and savings at a glance
    3. finboard capital        Income vs. expenses per month

DATA:
    finboard transactions -n 5    Most recent transactions
    finboard wallet               Cards in your wallet
    finboard transfers            Upcoming scheduled transfers
    finboard capital --range 3    Last 3 months of working capital

SESSION:
    finboard status            Who is signed in
    finboard logout            Sign out and forget the stored session

Every data command accepts --json for scripting.

ENVIRONMENT:
    FINBOARD_API_URL    Backend base URL (default http://localhost:5000/api)
    FINBOARD_HOME       Config and session directory
    FINBOARD_LOG        Log filter, e.g. finboard=debug
"#;

/// Financial dashboard client
#[derive(Parser, Debug)]
#[command(name = "finboard")]
#[command(author, version)]
#[command(about = "Financial dashboard client")]
#[command(long_about = LONG_ABOUT)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in with email and password
    Login(login::LoginArgs),

    /// Create an account and sign in
    Register(register::RegisterArgs),

    /// Sign out and clear the stored session
    Logout,

    /// Show the current session
    Status(OutputArgs),

    /// Total balance, spending and savings
    #[command(visible_alias = "s")]
    Summary(OutputArgs),

    /// Recent transactions
    #[command(visible_alias = "tx")]
    Transactions(TransactionsArgs),

    /// Working capital: income vs. expenses per period
    Capital(CapitalArgs),

    /// Cards in the wallet
    Wallet(OutputArgs),

    /// Scheduled transfers
    Transfers(OutputArgs),
}

/// Shared `--json` flag
#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// JSON output
    #[arg(long)]
    pub json: bool,
}

impl OutputArgs {
    pub fn format(&self) -> OutputFormat {
        if self.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    finboard transactions            Last 20 transactions
    finboard transactions -n 5       Last 5
    finboard transactions --json     JSON output")]
pub struct TransactionsArgs {
    /// Max transactions
    #[arg(short = 'n', long, default_value_t = DEFAULT_RECENT_LIMIT)]
    pub limit: usize,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
#[command(after_help = "EXAMPLES:
    finboard capital                 Last 6 months
    finboard capital --range 3       Last 3 months
    finboard capital --range all     Everything")]
pub struct CapitalArgs {
    /// Range: 3, 6 or all
    #[arg(short, long, default_value = "6")]
    pub range: TimeFilter,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}
