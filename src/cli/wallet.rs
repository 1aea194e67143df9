use crate::cli::{AppContext, OutputArgs};
use crate::core::error::Result;
use crate::output::{human, render};

pub async fn run(args: OutputArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let cards = ctx.resolve(ctx.dashboard.wallet_cards().await)?;
    print!("{}", render(cards.as_slice(), args.format(), human::wallet));
    Ok(())
}
