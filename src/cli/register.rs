//! Register command implementation

use clap::Parser;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Input, Password};

use crate::cli::login::prompt_error;
use crate::cli::AppContext;
use crate::core::error::Result;

/// Arguments for the register command
#[derive(Parser, Debug)]
pub struct RegisterArgs {
    /// Full name (prompted when omitted)
    #[arg(long)]
    pub name: Option<String>,

    /// Account email (prompted when omitted)
    #[arg(short, long)]
    pub email: Option<String>,

    /// Password (prompted when omitted)
    #[arg(short, long)]
    pub password: Option<String>,
}

pub async fn run(args: RegisterArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let theme = ColorfulTheme::default();

    let name = match args.name {
        Some(name) => name,
        None => Input::with_theme(&theme)
            .with_prompt("Full name")
            .interact_text()
            .map_err(prompt_error)?,
    };
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
            .with_confirmation("Confirm password", "Passwords do not match")
            .interact()
            .map_err(prompt_error)?,
    };

    let session = ctx.session.sign_up(&name, &email, &password).await?;
    if let Some(user) = &session.user {
        println!("{} Account created, signed in as {}", "✓".green(), user.email.bold());
    }
    Ok(())
}
