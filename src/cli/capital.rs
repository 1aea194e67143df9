use serde::Serialize;

use crate::chart::{axis_max, ChartDataPoint, TimeFilter};
use crate::cli::{AppContext, CapitalArgs};
use crate::core::error::Result;
use crate::output::{human, render};

/// The filtered series plus the axis the chart would draw
#[derive(Serialize)]
struct CapitalView<'a> {
    range: TimeFilter,
    currency: &'a str,
    axis_max: f64,
    data: &'a [ChartDataPoint],
}

pub async fn run(args: CapitalArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let capital = ctx.resolve(ctx.dashboard.working_capital().await)?;

    let points = args.range.apply(&capital.data);
    let view = CapitalView {
        range: args.range,
        currency: &capital.currency,
        axis_max: axis_max(points),
        data: points,
    };
    print!(
        "{}",
        render(&view, args.output.format(), |v| {
            human::capital(v.data, v.currency, v.range)
        })
    );
    Ok(())
}
