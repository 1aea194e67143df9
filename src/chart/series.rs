//! Working-capital series: filtering, axis scaling and tooltip detail

use serde::{Deserialize, Serialize};

use super::interaction::SeriesKey;

/// Axis ceiling for an empty series
pub const EMPTY_AXIS_MAX: f64 = 10_000.0;

/// Axis maxima are rounded up to a multiple of this
pub const AXIS_STEP: f64 = 1_000.0;

pub const AXIS_TICK_COUNT: usize = 5;

/// One period of income and expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDataPoint {
    #[serde(rename = "month")]
    pub period_label: String,
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub expense: f64,
}

impl ChartDataPoint {
    pub fn new(period_label: impl Into<String>, income: f64, expense: f64) -> Self {
        Self {
            period_label: period_label.into(),
            income,
            expense,
        }
    }

    /// Negative or non-finite amounts are clamped to zero
    pub fn sanitize(&mut self) {
        self.income = clamp_amount(self.income);
        self.expense = clamp_amount(self.expense);
    }

    pub fn net_flow(&self) -> f64 {
        self.income - self.expense
    }

    pub fn value(&self, series: SeriesKey) -> f64 {
        match series {
            SeriesKey::Income => self.income,
            SeriesKey::Expense => self.expense,
        }
    }
}

fn clamp_amount(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Trailing window shown by the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeFilter {
    LastThreeMonths,
    #[default]
    LastSixMonths,
    AllTime,
}

impl TimeFilter {
    pub const ALL: [TimeFilter; 3] = [
        TimeFilter::LastThreeMonths,
        TimeFilter::LastSixMonths,
        TimeFilter::AllTime,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeFilter::LastThreeMonths => "Last 3 months",
            TimeFilter::LastSixMonths => "Last 6 months",
            TimeFilter::AllTime => "All time",
        }
    }

    /// Number of trailing points kept, `None` for everything
    pub fn months(&self) -> Option<usize> {
        match self {
            TimeFilter::LastThreeMonths => Some(3),
            TimeFilter::LastSixMonths => Some(6),
            TimeFilter::AllTime => None,
        }
    }

    pub fn apply<'a>(&self, points: &'a [ChartDataPoint]) -> &'a [ChartDataPoint] {
        match self.months() {
            Some(n) if points.len() > n => &points[points.len() - n..],
            _ => points,
        }
    }
}

impl std::str::FromStr for TimeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "3" | "3m" => Ok(TimeFilter::LastThreeMonths),
            "6" | "6m" => Ok(TimeFilter::LastSixMonths),
            "all" | "0" => Ok(TimeFilter::AllTime),
            other => Err(format!("unknown range '{}', expected 3, 6 or all", other)),
        }
    }
}

/// Largest income or expense, rounded up to the next thousand
pub fn axis_max(points: &[ChartDataPoint]) -> f64 {
    if points.is_empty() {
        return EMPTY_AXIS_MAX;
    }
    let max = points
        .iter()
        .map(|p| p.income.max(p.expense))
        .fold(0.0_f64, f64::max);
    (max / AXIS_STEP).ceil() * AXIS_STEP
}

/// Evenly spaced ticks from zero to `max`, inclusive
pub fn axis_ticks(max: f64) -> Vec<f64> {
    let step = max / (AXIS_TICK_COUNT - 1) as f64;
    (0..AXIS_TICK_COUNT).map(|i| step * i as f64).collect()
}

pub fn format_axis_tick(value: f64) -> String {
    if value == 0.0 {
        "0K".to_string()
    } else if value >= AXIS_STEP {
        format!("{}K", (value / AXIS_STEP).round() as i64)
    } else {
        value.to_string()
    }
}

/// Width of the highlight band drawn under the cursor
pub fn cursor_band_width(chart_width: f64, points: usize) -> f64 {
    if points == 0 {
        return 0.0;
    }
    chart_width / (points * 5) as f64
}

/// What the detail card shows for one hovered period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipDetail {
    pub period_label: String,
    pub income: f64,
    pub expense: f64,
    pub net_flow: f64,
    /// Series whose value is highlighted; income when no point is active
    pub hovered: SeriesKey,
    pub hovered_value: f64,
}

impl TooltipDetail {
    pub fn new(point: &ChartDataPoint, active: Option<SeriesKey>) -> Self {
        let hovered = active.unwrap_or(SeriesKey::Income);
        Self {
            period_label: point.period_label.clone(),
            income: point.income,
            expense: point.expense,
            net_flow: point.net_flow(),
            hovered,
            hovered_value: point.value(hovered),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn months(n: usize) -> Vec<ChartDataPoint> {
        (1..=n)
            .map(|i| ChartDataPoint::new(format!("M{}", i), i as f64 * 1000.0, 500.0))
            .collect()
    }

    #[test]
    fn test_time_filter_keeps_trailing_points() {
        let points = months(12);
        let last3 = TimeFilter::LastThreeMonths.apply(&points);
        assert_eq!(last3.len(), 3);
        assert_eq!(last3[0].period_label, "M10");
        assert_eq!(TimeFilter::default().apply(&points).len(), 6);
        assert_eq!(TimeFilter::AllTime.apply(&points).len(), 12);
        assert_eq!(TimeFilter::LastSixMonths.apply(&points[..2]).len(), 2);
    }

    #[test]
    fn test_axis_max_rounds_up() {
        let points = vec![
            ChartDataPoint::new("Jan", 4200.0, 3100.0),
            ChartDataPoint::new("Feb", 3900.0, 5001.0),
        ];
        assert_eq!(axis_max(&points), 6000.0);
        assert_eq!(axis_max(&[]), EMPTY_AXIS_MAX);
    }

    #[test]
    fn test_axis_ticks_and_labels() {
        let ticks = axis_ticks(6000.0);
        assert_eq!(ticks, vec![0.0, 1500.0, 3000.0, 4500.0, 6000.0]);
        let labels: Vec<String> = ticks.into_iter().map(format_axis_tick).collect();
        assert_eq!(labels, vec!["0K", "2K", "3K", "5K", "6K"]);
        assert_eq!(format_axis_tick(250.0), "250");
    }

    #[test]
    fn test_sanitize_clamps() {
        let mut point = ChartDataPoint::new("Mar", -5.0, f64::NAN);
        point.sanitize();
        assert_eq!(point.income, 0.0);
        assert_eq!(point.expense, 0.0);
    }

    #[test]
    fn test_tooltip_detail_defaults_to_income() {
        let point = ChartDataPoint::new("Apr", 5000.0, 3200.0);
        let detail = TooltipDetail::new(&point, None);
        assert_eq!(detail.hovered, SeriesKey::Income);
        assert_eq!(detail.hovered_value, 5000.0);
        assert_eq!(detail.net_flow, 1800.0);

        let detail = TooltipDetail::new(&point, Some(SeriesKey::Expense));
        assert_eq!(detail.hovered_value, 3200.0);
    }

    #[test]
    fn test_cursor_band_width() {
        assert_eq!(cursor_band_width(600.0, 6), 20.0);
        assert_eq!(cursor_band_width(600.0, 0), 0.0);
    }

    #[test]
    fn test_parse_range() {
        assert_eq!("3".parse::<TimeFilter>(), Ok(TimeFilter::LastThreeMonths));
        assert_eq!("ALL".parse::<TimeFilter>(), Ok(TimeFilter::AllTime));
        assert!("12".parse::<TimeFilter>().is_err());
    }
}
