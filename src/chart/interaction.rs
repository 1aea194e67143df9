//! Hover/tap state machine for the working-capital chart
//!
//! ```text
//! Idle ──enter──▶ Active(series) ──leave (pointer)──▶ Idle
//!                      │
//!                      └──leave (touch)──▶ PendingDismiss ──delay──▶ Idle
//!                                               │
//!                                               └──enter──▶ Active(series)
//! ```
//!
//! The controller owns no timers. Callers pass `now` into every transition
//! and drive expiry with [`ChartInteractionController::poll`], using
//! [`ChartInteractionController::next_deadline`] to know when.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::trace;

use super::placement::{Placement, Point, Quadrant, Viewport};
use super::series::{ChartDataPoint, TooltipDetail};
use crate::core::config::ChartConfig;

pub const DEFAULT_DISMISS_DELAY: Duration = Duration::from_millis(2000);
pub const MOBILE_BREAKPOINT: u32 = 768;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKey {
    Income,
    Expense,
}

impl SeriesKey {
    pub fn label(&self) -> &'static str {
        match self {
            SeriesKey::Income => "Income",
            SeriesKey::Expense => "Expenses",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Pointer,
    Touch,
}

impl DeviceKind {
    /// Narrow viewports (at or below `breakpoint`) are touch devices
    pub fn from_viewport_width(width: u32, breakpoint: u32) -> Self {
        if width <= breakpoint {
            DeviceKind::Touch
        } else {
            DeviceKind::Pointer
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionState {
    Idle,
    Active(SeriesKey),
    /// Touch lifted; the tooltip stays until `dismiss_at`
    PendingDismiss {
        series: SeriesKey,
        dismiss_at: Instant,
    },
}

impl InteractionState {
    /// Series whose point is highlighted, if any
    pub fn series(&self) -> Option<SeriesKey> {
        match self {
            InteractionState::Idle => None,
            InteractionState::Active(series) => Some(*series),
            InteractionState::PendingDismiss { series, .. } => Some(*series),
        }
    }
}

/// Tooltip content plus where to put it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub detail: TooltipDetail,
    pub placement: Placement,
}

#[derive(Debug, Clone)]
pub struct ChartInteractionController {
    state: InteractionState,
    device: DeviceKind,
    dismiss_delay: Duration,
    viewport: Viewport,
    pointer: Option<Point>,
}

impl ChartInteractionController {
    pub fn new(device: DeviceKind) -> Self {
        Self {
            state: InteractionState::Idle,
            device,
            dismiss_delay: DEFAULT_DISMISS_DELAY,
            viewport: Viewport::default(),
            pointer: None,
        }
    }

    pub fn from_config(config: &ChartConfig, viewport_width: u32) -> Self {
        let device = DeviceKind::from_viewport_width(viewport_width, config.mobile_breakpoint);
        Self::new(device)
            .with_dismiss_delay(Duration::from_millis(config.dismiss_delay_ms))
            .with_viewport(Viewport::new(config.default_width, config.default_height))
    }

    pub fn with_dismiss_delay(mut self, delay: Duration) -> Self {
        self.dismiss_delay = delay;
        self
    }

    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn device(&self) -> DeviceKind {
        self.device
    }

    pub fn active_series(&self) -> Option<SeriesKey> {
        self.state.series()
    }

    /// Pointer or finger entered a point's hit region. Replaces whatever was
    /// active in one step and cancels a pending dismissal.
    pub fn enter_point(&mut self, series: SeriesKey) {
        trace!(?series, "chart point entered");
        self.state = InteractionState::Active(series);
    }

    pub fn leave_point(&mut self, now: Instant) {
        self.state = match (self.state, self.device) {
            (InteractionState::Active(_), DeviceKind::Pointer) => InteractionState::Idle,
            (InteractionState::Active(series), DeviceKind::Touch) => {
                match now.checked_add(self.dismiss_delay) {
                    Some(dismiss_at) => InteractionState::PendingDismiss { series, dismiss_at },
                    // Delay past the clock's range: dismiss now
                    None => InteractionState::Idle,
                }
            }
            // A second lift keeps the first deadline
            (state, _) => state,
        };
    }

    /// Touch devices treat leaving the chart like leaving a point
    pub fn leave_chart(&mut self, now: Instant) {
        match self.device {
            DeviceKind::Pointer => {
                self.state = InteractionState::Idle;
                self.pointer = None;
            }
            DeviceKind::Touch => self.leave_point(now),
        }
    }

    pub fn pointer_moved(&mut self, point: Point) {
        self.pointer = Some(point);
    }

    /// Apply an expired dismissal. Returns whether the state changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.state {
            InteractionState::PendingDismiss { dismiss_at, .. } if now >= dismiss_at => {
                trace!("chart tooltip dismissed");
                self.state = InteractionState::Idle;
                true
            }
            _ => false,
        }
    }

    /// When [`poll`](Self::poll) should next be called
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            InteractionState::PendingDismiss { dismiss_at, .. } => Some(dismiss_at),
            _ => None,
        }
    }

    pub fn set_device(&mut self, device: DeviceKind) {
        self.device = device;
    }

    /// Resize: re-derive the device kind from the new width
    pub fn resize(&mut self, viewport_width: u32, breakpoint: u32) {
        self.device = DeviceKind::from_viewport_width(viewport_width, breakpoint);
    }

    /// Chart area reported by the renderer; unusable sizes use the default
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn placement(&self) -> Placement {
        Quadrant::locate(self.pointer, self.viewport).placement()
    }

    /// Detail card for the hovered period
    pub fn tooltip(&self, point: &ChartDataPoint) -> Tooltip {
        Tooltip {
            detail: TooltipDetail::new(point, self.active_series()),
            placement: self.placement(),
        }
    }
}
