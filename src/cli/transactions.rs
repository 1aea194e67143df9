use chrono::Utc;

use crate::cli::{AppContext, TransactionsArgs};
use crate::core::error::Result;
use crate::output::{human, render};

pub async fn run(args: TransactionsArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let transactions = ctx.resolve(ctx.dashboard.recent_transactions(args.limit).await)?;
    let now = Utc::now();
    print!(
        "{}",
        render(transactions.as_slice(), args.output.format(), |txs| {
            human::transactions(txs, now)
        })
    );
    Ok(())
}
