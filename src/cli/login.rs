//! Login command implementation

use clap::Parser;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Password};
use tracing::info;

use crate::cli::AppContext;
use crate::core::error::{Error, Result};

/// Arguments for the login command
#[derive(Parser, Debug)]
pub struct LoginArgs {
    /// Account email (prompted when omitted)
    #[arg(short, long)]
    pub email: Option<String>,

    /// Password (prompted when omitted)
    #[arg(short, long)]
    pub password: Option<String>,
}

pub async fn run(args: LoginArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let theme = ColorfulTheme::default();

    let email = match args.email {
        Some(email) => email,
        None => Input::with_theme(&theme)
            .with_prompt("Email")
            .interact_text()
            .map_err(prompt_error)?,
    };
    let password = match args.password {
        Some(password) => password,
        None => Password::with_theme(&theme)
            .with_prompt("Password")
            .interact()
            .map_err(prompt_error)?,
    };

    let session = ctx.session.sign_in(&email, &password).await?;
    if let Some(user) = &session.user {
        info!(email = %user.email, "Signed in");
        println!("{} Welcome back, {}", "✓".green(), user.full_name.bold());
    }
    Ok(())
}

pub(crate) fn prompt_error(e: dialoguer::Error) -> Error {
    match e {
        dialoguer::Error::IO(io) => Error::Io(io),
    }
}
