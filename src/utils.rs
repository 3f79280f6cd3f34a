//! # Utility Functions and Helper Module
//!
//! Formatting and validation helpers shared by the report renderers and the
//! command-line front end.
//!
//! ## Key Functionality Categories
//!
//! - **Formatting**: Human-readable display of millisecond latencies, ratios and rates
//! - **Validation**: Chart dimensions and percentile lists, with clear error messages
//! - **Table Helpers**: Markdown table rows for the summary table format
//!
//! ## Usage Examples
//!
//! ```rust
//! use k6_report::utils::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! assert_eq!(format_duration_ms(250.0), "250.00ms");
//! assert_eq!(format_duration_ms(1500.0), "1.50s");
//!
//! validate_chart_dimensions(60, 20)?; // OK
//! # Ok(())
//! # }
//! ```

use anyhow::Result;

/// Upper bound on chart columns, keeps a rendered line pasteable
pub const MAX_CHART_WIDTH: usize = 400;

/// Upper bound on chart rows
pub const MAX_CHART_HEIGHT: usize = 200;

/// Format a millisecond latency for display
///
/// Values of one second or more switch to seconds so long-running requests
/// stay readable next to fast ones.
///
/// ## Unit Selection
///
/// - **Milliseconds**: < 1000 ms (e.g., "250.00ms")
/// - **Seconds**: ≥ 1000 ms (e.g., "1.50s")
///
/// Both units use two decimal places.
///
/// ## Examples
///
/// ```rust
/// # use k6_report::utils::format_duration_ms;
/// assert_eq!(format_duration_ms(0.5), "0.50ms");
/// assert_eq!(format_duration_ms(999.994), "999.99ms");
/// assert_eq!(format_duration_ms(2500.0), "2.50s");
/// ```
pub fn format_duration_ms(ms: f64) -> String {
    if ms.abs() >= 1000.0 {
        format!("{:.2}s", ms / 1000.0)
    } else {
        format!("{:.2}ms", ms)
    }
}

/// Format an optional latency, `N/A` when absent
pub fn format_optional_ms(ms: Option<f64>) -> String {
    ms.map_or_else(|| "N/A".to_string(), format_duration_ms)
}

/// Format `failed/total` with a percentage when there were samples
///
/// ```rust
/// # use k6_report::utils::format_failures;
/// assert_eq!(format_failures(1, 4), "1/4 (25.00%)");
/// assert_eq!(format_failures(0, 0), "0/0");
/// ```
pub fn format_failures(failed: usize, total: usize) -> String {
    if total == 0 {
        format!("{}/{}", failed, total)
    } else {
        format!(
            "{}/{} ({:.2}%)",
            failed,
            total,
            failed as f64 / total as f64 * 100.0
        )
    }
}

/// Format a request rate
pub fn format_request_rate(requests_per_second: f64) -> String {
    if requests_per_second < 1000.0 {
        format!("{:.2} req/s", requests_per_second)
    } else {
        format!("{:.2}K req/s", requests_per_second / 1000.0)
    }
}

/// Format a percentile level as a column label (`p90`, `p99.9`)
pub fn percentile_label(percentile: f64) -> String {
    if percentile.fract() == 0.0 {
        format!("p{}", percentile as u64)
    } else {
        format!("p{}", percentile)
    }
}

/// Validate chart dimensions
///
/// ## Validation Rules
///
/// - **Width**: 1 to [`MAX_CHART_WIDTH`] columns
/// - **Height**: 1 to [`MAX_CHART_HEIGHT`] rows
///
/// A zero-sized grid has no cells to draw and a huge one is unreadable in a
/// chat client, so both are rejected before any rendering happens.
pub fn validate_chart_dimensions(width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        anyhow::bail!(
            "Chart dimensions must be at least 1x1 (got {}x{})",
            width,
            height
        );
    }

    if width > MAX_CHART_WIDTH {
        anyhow::bail!(
            "Chart width {} is too large (maximum {} columns)",
            width,
            MAX_CHART_WIDTH
        );
    }

    if height > MAX_CHART_HEIGHT {
        anyhow::bail!(
            "Chart height {} is too large (maximum {} rows)",
            height,
            MAX_CHART_HEIGHT
        );
    }

    Ok(())
}

/// Validate a percentile list
///
/// Every level must be a finite number in `(0, 100]`. An empty list is
/// allowed; the report then shows only average, min, max and median.
pub fn validate_percentiles(percentiles: &[f64]) -> Result<()> {
    for &p in percentiles {
        if !p.is_finite() || p <= 0.0 || p > 100.0 {
            anyhow::bail!("Percentile {} is out of range (expected 0 < p <= 100)", p);
        }
    }
    Ok(())
}

/// Build one markdown table row
///
/// ```rust
/// # use k6_report::utils::markdown_row;
/// assert_eq!(markdown_row(&["a", "b"]), "| a | b |");
/// ```
pub fn markdown_row<S: AsRef<str>>(columns: &[S]) -> String {
    let mut row = String::from("|");
    for column in columns {
        row.push(' ');
        row.push_str(column.as_ref());
        row.push_str(" |");
    }
    row
}

/// Markdown header separator for `columns` columns
pub fn markdown_separator(columns: usize) -> String {
    let mut row = String::from("|");
    for _ in 0..columns {
        row.push_str("---|");
    }
    row
}
