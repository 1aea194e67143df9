//! Output formatting

pub mod human;
pub mod json;

use serde::Serialize;

use crate::cli::OutputFormat;

/// Render `value` as pretty JSON or through its human formatter
pub fn render<T: Serialize + ?Sized>(
    value: &T,
    format: OutputFormat,
    human: impl FnOnce(&T) -> String,
) -> String {
    match format {
        OutputFormat::Human => human(value),
        OutputFormat::Json => json::format(value),
    }
}
