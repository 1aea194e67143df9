//! Where the detail card goes relative to the pointer

use serde::Serialize;

pub const DEFAULT_WIDTH: f64 = 600.0;
pub const DEFAULT_HEIGHT: f64 = 280.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Non-positive or non-finite dimensions fall back to the defaults
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width: usable(width).unwrap_or(DEFAULT_WIDTH),
            height: usable(height).unwrap_or(DEFAULT_HEIGHT),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

fn usable(value: f64) -> Option<f64> {
    (value.is_finite() && value > 0.0).then_some(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Which half of the chart the pointer is in, on each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Quadrant {
    pub is_left_half: bool,
    pub is_top_half: bool,
}

impl Quadrant {
    /// With no coordinate both flags are false
    pub fn locate(coordinate: Option<Point>, viewport: Viewport) -> Self {
        match coordinate {
            Some(p) => Self {
                is_left_half: p.x < viewport.width / 2.0,
                is_top_half: p.y < viewport.height / 2.0,
            },
            None => Self::default(),
        }
    }

    pub fn placement(&self) -> Placement {
        Placement {
            side: if self.is_left_half {
                Side::Right
            } else {
                Side::Left
            },
            align: if self.is_top_half {
                Align::Top
            } else {
                Align::Bottom
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Top,
    Bottom,
}

/// Card anchored on the side away from the pointer, aligned with its half
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    pub side: Side,
    pub align: Align,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadrants() {
        let vp = Viewport::default();

        let top_left = Quadrant::locate(Some(Point::new(100.0, 50.0)), vp);
        assert_eq!(
            top_left.placement(),
            Placement {
                side: Side::Right,
                align: Align::Top
            }
        );

        let bottom_right = Quadrant::locate(Some(Point::new(450.0, 200.0)), vp);
        assert_eq!(
            bottom_right.placement(),
            Placement {
                side: Side::Left,
                align: Align::Bottom
            }
        );
    }

    #[test]
    fn test_midline_counts_as_right_and_bottom() {
        let q = Quadrant::locate(Some(Point::new(300.0, 140.0)), Viewport::default());
        assert!(!q.is_left_half);
        assert!(!q.is_top_half);
    }

    #[test]
    fn test_missing_coordinate() {
        let q = Quadrant::locate(None, Viewport::default());
        assert_eq!(q, Quadrant::default());
        assert_eq!(q.placement().side, Side::Left);
    }

    #[test]
    fn test_viewport_fallback() {
        assert_eq!(Viewport::new(0.0, f64::NAN), Viewport::default());
        assert_eq!(Viewport::new(1200.0, 400.0).width, 1200.0);
    }
}
