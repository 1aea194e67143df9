use crate::cli::{AppContext, OutputArgs};
use crate::core::error::Result;
use crate::output::{human, render};

pub async fn run(args: OutputArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let transfers = ctx.resolve(ctx.dashboard.scheduled_transfers().await)?;
    print!("{}", render(transfers.as_slice(), args.format(), human::transfers));
    Ok(())
}
