//! finboard CLI entry point

use anyhow::Context;
use clap::Parser;
use colored::Colorize;
use finboard::cli::{self, Cli, Commands};
use finboard::core::error::{AuthError, Error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_env("FINBOARD_LOG"))
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{} {:#}", "error:".red().bold(), err);
        if let Some(Error::Auth(AuthError::SessionExpired)) = err.downcast_ref::<Error>() {
            eprintln!("Session expired, run `finboard login`");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Login(args) => cli::login::run(args).await.context("sign-in failed")?,
        Commands::Register(args) => cli::register::run(args).await.context("sign-up failed")?,
        Commands::Logout => cli::logout::run().await?,
        Commands::Status(args) => cli::status::run(args)?,
        Commands::Summary(args) => cli::summary::run(args).await?,
        Commands::Transactions(args) => cli::transactions::run(args).await?,
        Commands::Capital(args) => cli::capital::run(args).await?,
        Commands::Wallet(args) => cli::wallet::run(args).await?,
        Commands::Transfers(args) => cli::transfers::run(args).await?,
    }
    Ok(())
}
