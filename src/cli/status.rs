use crate::cli::{AppContext, OutputArgs};
use crate::core::error::Result;
use crate::output::{human, render};

/// Show the restored session without contacting the server
pub fn run(args: OutputArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let session = ctx.session.snapshot();
    print!("{}", render(&session, args.format(), human::session));
    Ok(())
}
