//! Working-capital chart logic, independent of any renderer
//!
//! - `interaction`: which series is highlighted and when a touch tooltip
//!   goes away
//! - `placement`: which side of the pointer the detail card sits on
//! - `series`: filtering, axis scaling and tooltip content

mod interaction;
mod placement;
mod series;

pub use interaction::{
    ChartInteractionController, DeviceKind, InteractionState, SeriesKey, Tooltip,
    DEFAULT_DISMISS_DELAY, MOBILE_BREAKPOINT,
};
pub use placement::{Align, Placement, Point, Quadrant, Side, Viewport};
pub use series::{
    axis_max, axis_ticks, cursor_band_width, format_axis_tick, ChartDataPoint, TimeFilter,
    TooltipDetail,
};
