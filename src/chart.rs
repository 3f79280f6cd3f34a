//! # Dual-Axis Text Charts
//!
//! Rasterizes a latency series onto a fixed `width` x `height` character grid
//! and overlays request throughput on the same columns, so the result can be
//! pasted into any monospace, plaintext channel.
//!
//! ## Bucketing
//!
//! The observed time span `[min(ts), max(ts)]` is split into `width` equal
//! buckets. A sample lands in `floor((t - start) / bucket_secs)`, clamped to
//! the last column, so the sum of bucket occupancies always equals the number
//! of input samples. Each bucket keeps:
//!
//! - its sample count (occupancy is never inferred from the value),
//! - its peak latency,
//! - its density in samples per second.
//!
//! An empty bucket is drawn at the series minimum so it shows up as the
//! baseline instead of a gap.
//!
//! ## Degenerate inputs
//!
//! - No samples: [`render_chart`] returns a "no data" placeholder.
//! - Zero duration (one sample, or all samples coincident): everything falls
//!   in the first bucket, densities are zero and the throughput overlay stays
//!   empty. The time axis reads `0s`.
//! - Flat values (`min == max`): every row label shows that value and only
//!   the baseline row is marked.
//!
//! None of these paths divide by zero, so no `NaN` or `inf` reaches a label.

use crate::error::ChartError;
use crate::series::Series;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Glyph for a cell reached by the latency bar only
pub const LATENCY_GLYPH: char = '█';
/// Glyph for a cell reached by the throughput bar only
pub const THROUGHPUT_GLYPH: char = '░';
/// Glyph for a cell reached by both bars
pub const OVERLAY_GLYPH: char = '▓';

const LABEL_WIDTH: usize = 12;

/// Grid size and overlay switch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub width: usize,
    pub height: usize,
    /// Overlay requests/s on the latency chart
    pub show_throughput: bool,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: crate::defaults::CHART_WIDTH,
            height: crate::defaults::CHART_HEIGHT,
            show_throughput: true,
        }
    }
}

/// Content of a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Latency,
    Throughput,
    Both,
}

impl Cell {
    fn from_marks(latency: bool, throughput: bool) -> Self {
        match (latency, throughput) {
            (true, true) => Cell::Both,
            (true, false) => Cell::Latency,
            (false, true) => Cell::Throughput,
            (false, false) => Cell::Empty,
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Cell::Empty => ' ',
            Cell::Latency => LATENCY_GLYPH,
            Cell::Throughput => THROUGHPUT_GLYPH,
            Cell::Both => OVERLAY_GLYPH,
        }
    }
}

/// One time slice of the chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub samples: usize,
    /// Highest value seen in the slice
    pub peak: Option<f64>,
    /// Samples per second, zero when the slice has no width
    pub density: f64,
}

impl Bucket {
    pub fn is_occupied(&self) -> bool {
        self.samples > 0
    }
}

/// Rasterized chart plus the axes it was drawn against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartGrid {
    pub width: usize,
    pub height: usize,
    /// Rows top-down, `width` cells each
    pub cells: Vec<Vec<Cell>>,
    /// Latency threshold per row, top-down
    pub latency_axis: Vec<f64>,
    /// Throughput threshold per row, top-down; `None` when the overlay is off
    pub throughput_axis: Option<Vec<f64>>,
    pub buckets: Vec<Bucket>,
    pub duration_secs: f64,
    pub bucket_secs: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub max_density: f64,
}

impl ChartGrid {
    /// Build the grid for parallel `values` / `timestamps`.
    ///
    /// Returns `Ok(None)` when there are no samples.
    pub fn build(
        values: &[f64],
        timestamps: &[DateTime<Utc>],
        config: &ChartConfig,
    ) -> Result<Option<Self>, ChartError> {
        if config.width == 0 || config.height == 0 {
            return Err(ChartError::InvalidDimensions {
                width: config.width,
                height: config.height,
            });
        }
        if values.len() != timestamps.len() {
            return Err(ChartError::LengthMismatch {
                values: values.len(),
                timestamps: timestamps.len(),
            });
        }

        let (Some(start), Some(end)) = (timestamps.iter().min(), timestamps.iter().max()) else {
            return Ok(None);
        };

        let width = config.width;
        let height = config.height;
        let duration_secs = seconds_between(*start, *end);
        let bucket_secs = duration_secs / width as f64;

        let mut buckets = vec![Bucket::default(); width];
        for (&value, &timestamp) in values.iter().zip(timestamps) {
            let offset = seconds_between(*start, timestamp);
            let bucket = &mut buckets[bucket_index(offset, bucket_secs, width)];
            bucket.samples += 1;
            bucket.peak = Some(bucket.peak.map_or(value, |peak| peak.max(value)));
        }
        if bucket_secs > 0.0 {
            for bucket in &mut buckets {
                bucket.density = bucket.samples as f64 / bucket_secs;
            }
        }

        let min_value = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let max_density = buckets.iter().map(|b| b.density).fold(0.0, f64::max);
        let flat = max_value <= min_value;

        let mut cells = Vec::with_capacity(height);
        let mut latency_axis = Vec::with_capacity(height);
        let mut throughput_axis = Vec::with_capacity(height);

        for row_from_top in 0..height {
            let level = height - 1 - row_from_top;
            let latency_threshold = if height == 1 || flat {
                min_value
            } else {
                let fraction = level as f64 / (height - 1) as f64;
                min_value * (1.0 - fraction) + max_value * fraction
            };
            let throughput_threshold = max_density * ((level + 1) as f64 / height as f64);

            let row = buckets
                .iter()
                .map(|bucket| {
                    let representative = bucket.peak.unwrap_or(min_value);
                    let latency = if flat {
                        level == 0
                    } else {
                        representative >= latency_threshold
                    };
                    let throughput = config.show_throughput
                        && max_density > 0.0
                        && bucket.is_occupied()
                        && bucket.density >= throughput_threshold;
                    Cell::from_marks(latency, throughput)
                })
                .collect();

            cells.push(row);
            latency_axis.push(latency_threshold);
            throughput_axis.push(throughput_threshold);
        }

        Ok(Some(Self {
            width,
            height,
            cells,
            latency_axis,
            throughput_axis: config.show_throughput.then_some(throughput_axis),
            buckets,
            duration_secs,
            bucket_secs,
            min_value,
            max_value,
            max_density,
        }))
    }

    /// Build the grid for a series' values and timestamps
    pub fn from_series(series: &Series, config: &ChartConfig) -> Result<Option<Self>, ChartError> {
        Self::build(series.values(), series.timestamps(), config)
    }

    /// Total samples across all buckets
    pub fn sample_count(&self) -> usize {
        self.buckets.iter().map(|b| b.samples).sum()
    }

    /// Render the grid with axes, labels and a legend
    pub fn render(&self, title: &str) -> String {
        let mut out = String::new();
        let pad = " ".repeat(LABEL_WIDTH + 2);

        let _ = writeln!(out, "{}", title);
        let _ = writeln!(out);
        if self.throughput_axis.is_some() {
            let _ = writeln!(
                out,
                "{:>w$}{}{}",
                "Latency (ms)",
                " ".repeat(self.width + 4),
                "Requests/s",
                w = LABEL_WIDTH
            );
        } else {
            let _ = writeln!(out, "{:>w$}", "Latency (ms)", w = LABEL_WIDTH);
        }

        for (row_index, row) in self.cells.iter().enumerate() {
            let cells: String = row.iter().map(|cell| cell.glyph()).collect();
            let _ = write!(
                out,
                "{:>w$.2} │{}│",
                self.latency_axis[row_index],
                cells,
                w = LABEL_WIDTH
            );
            if let Some(axis) = &self.throughput_axis {
                let _ = write!(out, " {:.2}", axis[row_index]);
            }
            out.push('\n');
        }

        let _ = writeln!(out, "{}└{}┘", &pad[1..], "─".repeat(self.width));

        let end_label = format!("{}s", self.duration_secs.round() as u64);
        let gap = self.width.saturating_sub(2 + end_label.len()).max(1);
        let _ = writeln!(out, "{}0s{}{}", pad, " ".repeat(gap), end_label);

        let _ = writeln!(
            out,
            "{}{} samples, {:.2}s per column",
            pad,
            self.sample_count(),
            self.bucket_secs
        );
        if self.throughput_axis.is_some() {
            let _ = write!(
                out,
                "{} peak latency   {} requests/s   {} both",
                LATENCY_GLYPH, THROUGHPUT_GLYPH, OVERLAY_GLYPH
            );
        } else {
            let _ = write!(out, "{} peak latency", LATENCY_GLYPH);
        }
        out.push('\n');

        out
    }
}

/// Placeholder returned for an empty series
pub fn no_data_placeholder(title: &str) -> String {
    format!("No data available for {}\n", title)
}

/// Render a chart, or the placeholder when there are no samples
pub fn render_chart(
    values: &[f64],
    timestamps: &[DateTime<Utc>],
    title: &str,
    config: &ChartConfig,
) -> Result<String, ChartError> {
    Ok(match ChartGrid::build(values, timestamps, config)? {
        Some(grid) => grid.render(title),
        None => no_data_placeholder(title),
    })
}

/// Render a series' chart, or the placeholder when it is empty
pub fn render_series(series: &Series, title: &str, config: &ChartConfig) -> Result<String, ChartError> {
    render_chart(series.values(), series.timestamps(), title, config)
}

fn seconds_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}

fn bucket_index(offset_secs: f64, bucket_secs: f64, width: usize) -> usize {
    if bucket_secs <= 0.0 {
        return 0;
    }
    ((offset_secs / bucket_secs).floor().max(0.0) as usize).min(width - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_714_557_600, 0).unwrap() + Duration::milliseconds(millis)
    }

    fn config(width: usize, height: usize) -> ChartConfig {
        ChartConfig {
            width,
            height,
            show_throughput: true,
        }
    }

    /// Test the four cell states on a small hand-computed grid
    #[test]
    fn test_grid_cells_dual_axis() {
        let values = [100.0, 200.0, 50.0, 300.0];
        let timestamps = [at(0), at(0), at(1_000), at(4_000)];

        let grid = ChartGrid::build(&values, &timestamps, &config(4, 2))
            .unwrap()
            .unwrap();

        use Cell::*;
        assert_eq!(grid.cells[0], vec![Throughput, Empty, Empty, Latency]);
        assert_eq!(grid.cells[1], vec![Both, Both, Latency, Both]);
        assert_eq!(grid.latency_axis, vec![300.0, 50.0]);
        assert_eq!(grid.throughput_axis, Some(vec![2.0, 1.0]));
        assert_eq!(grid.duration_secs, 4.0);
        assert_eq!(grid.max_density, 2.0);
    }

    /// Test that empty buckets are tracked apart from zero-valued samples
    #[test]
    fn test_empty_bucket_is_not_zero_sample() {
        let values = [0.0, 10.0];
        let timestamps = [at(0), at(3_000)];

        let grid = ChartGrid::build(&values, &timestamps, &config(3, 4))
            .unwrap()
            .unwrap();

        assert!(grid.buckets[0].is_occupied());
        assert_eq!(grid.buckets[0].peak, Some(0.0));
        assert!(!grid.buckets[1].is_occupied());
        assert_eq!(grid.buckets[1].peak, None);
        assert_eq!(grid.buckets[1].density, 0.0);
        // Unoccupied columns never carry throughput
        assert!(grid.cells.iter().all(|row| !matches!(row[1], Cell::Throughput | Cell::Both)));
    }

    /// Test that bucket occupancy always sums to the sample count
    #[test]
    fn test_bucket_occupancy_sums_to_samples() {
        let offsets: Vec<i64> = vec![0, 13, 13, 250, 999, 1_000, 1_001, 4_321, 7_777, 9_999, 10_000];
        let timestamps: Vec<DateTime<Utc>> = offsets.iter().rev().map(|&ms| at(ms)).collect();
        let values: Vec<f64> = (0..timestamps.len()).map(|i| i as f64 * 1.5).collect();

        for width in 1..=64 {
            let grid = ChartGrid::build(&values, &timestamps, &config(width, 5))
                .unwrap()
                .unwrap();
            assert_eq!(grid.sample_count(), values.len(), "width {}", width);
            assert_eq!(grid.buckets.len(), width);
        }
    }

    /// Test a single sample renders a zero-duration chart without NaN
    #[test]
    fn test_single_sample_chart() {
        let rendered = render_chart(&[42.0], &[at(0)], "Single", &config(30, 20)).unwrap();

        assert!(rendered.starts_with("Single\n"));
        assert!(rendered.contains("42.00 │"));
        assert!(rendered.contains("0s"));
        assert!(!rendered.contains("NaN"));
        assert!(!rendered.contains("inf"));

        let grid = ChartGrid::build(&[42.0], &[at(0)], &config(30, 20))
            .unwrap()
            .unwrap();
        assert_eq!(grid.duration_secs, 0.0);
        assert_eq!(grid.buckets[0].samples, 1);
        assert_eq!(grid.max_density, 0.0);
        // Flat line on the baseline only
        assert!(grid.cells[..19]
            .iter()
            .all(|row| row.iter().all(|&c| c == Cell::Empty)));
        assert!(grid.cells[19].iter().all(|&c| c == Cell::Latency));
    }

    /// Test coincident timestamps with varying values
    #[test]
    fn test_coincident_timestamps() {
        let values = [5.0, 15.0, 10.0];
        let timestamps = [at(500), at(500), at(500)];

        let grid = ChartGrid::build(&values, &timestamps, &config(10, 3))
            .unwrap()
            .unwrap();
        assert_eq!(grid.buckets[0].samples, 3);
        assert_eq!(grid.buckets[0].peak, Some(15.0));
        assert_eq!(grid.bucket_secs, 0.0);
        assert_eq!(grid.throughput_axis, Some(vec![0.0, 0.0, 0.0]));
        assert_eq!(grid.cells[0][0], Cell::Latency);
    }

    /// Test that the renderer is a pure function of its inputs
    #[test]
    fn test_rendering_is_deterministic() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 + 0.5).collect();
        let timestamps: Vec<DateTime<Utc>> = (0..200).map(|i| at((i * 7919) % 30_000)).collect();

        let first = render_chart(&values, &timestamps, "Deterministic", &config(60, 20)).unwrap();
        let second = render_chart(&values, &timestamps, "Deterministic", &config(60, 20)).unwrap();
        assert_eq!(first, second);
    }

    /// Test the placeholder and input validation
    #[test]
    fn test_empty_and_invalid_inputs() {
        assert_eq!(
            render_chart(&[], &[], "Process", &config(60, 20)).unwrap(),
            "No data available for Process\n"
        );
        assert_eq!(
            ChartGrid::build(&[1.0], &[], &config(60, 20)),
            Err(ChartError::LengthMismatch {
                values: 1,
                timestamps: 0
            })
        );
        assert_eq!(
            ChartGrid::build(&[1.0], &[at(0)], &config(0, 20)),
            Err(ChartError::InvalidDimensions {
                width: 0,
                height: 20
            })
        );
    }

    /// Test the single-axis variant has no throughput marks or labels
    #[test]
    fn test_latency_only_chart() {
        let values = [100.0, 200.0, 50.0, 300.0];
        let timestamps = [at(0), at(0), at(1_000), at(4_000)];
        let cfg = ChartConfig {
            show_throughput: false,
            ..config(4, 2)
        };

        let grid = ChartGrid::build(&values, &timestamps, &cfg).unwrap().unwrap();
        assert_eq!(grid.throughput_axis, None);
        assert!(grid
            .cells
            .iter()
            .flatten()
            .all(|c| matches!(c, Cell::Latency | Cell::Empty)));

        let rendered = grid.render("Latency only");
        assert!(!rendered.contains("Requests/s"));
        assert!(!rendered.contains(THROUGHPUT_GLYPH));
    }

    /// Test axis line layout
    #[test]
    fn test_rendered_axis_layout() {
        let values = [1.0, 2.0];
        let timestamps = [at(0), at(29_600)];

        let rendered = render_chart(&values, &timestamps, "Axis", &config(10, 2)).unwrap();
        let lines: Vec<&str> = rendered.lines().collect();

        assert_eq!(lines[2], format!("{:>12}{}Requests/s", "Latency (ms)", " ".repeat(14)));
        assert!(lines[3].starts_with("        2.00 │"));
        assert!(lines[4].starts_with("        1.00 │"));
        assert_eq!(lines[5], format!("{}└{}┘", " ".repeat(13), "─".repeat(10)));
        assert_eq!(lines[6], format!("{}0s{}30s", " ".repeat(14), " ".repeat(5)));
    }
}
