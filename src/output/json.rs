//! JSON output formatting

use serde::Serialize;

/// Format any response as pretty JSON
pub fn format<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "Failed to serialize output: {}"}}"#, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartDataPoint;

    #[test]
    fn test_chart_point_uses_wire_names() {
        let out = format(&ChartDataPoint::new("Jan", 1.0, 2.0));
        assert!(out.contains(r#""month": "Jan""#));
    }
}
