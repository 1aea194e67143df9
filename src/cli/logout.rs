use colored::Colorize;

use crate::cli::AppContext;
use crate::core::error::Result;

pub async fn run() -> Result<()> {
    let ctx = AppContext::load()?;
    if !ctx.session.state().is_authenticated() {
        println!("Not signed in");
        return Ok(());
    }

    ctx.session.sign_out().await;
    println!("{} Signed out", "✓".green());
    Ok(())
}
