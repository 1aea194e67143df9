use crate::cli::{AppContext, OutputArgs};
use crate::core::error::Result;
use crate::output::{human, render};

pub async fn run(args: OutputArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let summary = ctx.resolve(ctx.dashboard.summary().await)?;
    print!("{}", render(&*summary, args.format(), human::summary));
    Ok(())
}
