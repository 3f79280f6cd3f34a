//! # k6 Report Library
//!
//! Turns the newline-delimited JSON written by `k6 run --out json=<file>`
//! into per-endpoint latency statistics and dual-axis text charts (latency
//! and request rate) that can be posted into a plaintext channel.
//!
//! ## Pipeline
//!
//! Each run is a pure function of one input stream:
//!
//! 1. **Ingest** (`ingest`): parse every line, drop the smoke-test phase,
//!    classify HTTP samples into endpoint series
//! 2. **Statistics** (`stats`): average, min, max, median and nearest-rank
//!    percentiles per series, plus failure counts
//! 3. **Charts** (`chart`): bucket samples over time and rasterize latency
//!    and throughput onto a fixed character grid
//! 4. **Report** (`report`): assemble everything into text, markdown or JSON
//!
//! ## Usage Example
//!
//! ```rust
//! use k6_report::{generate_report, ReportConfig, ReportFormat};
//!
//! # fn main() -> anyhow::Result<()> {
//! let input = r#"{"type":"Point","metric":"http_req_duration","data":{"time":"2024-05-01T10:00:00Z","value":120.5,"tags":{"name":"http://localhost:3000/process"}}}"#;
//!
//! let report = generate_report(input, &ReportConfig::default())?;
//! assert_eq!(report.totals.requests, 1);
//!
//! let summary = report.render(ReportFormat::Text)?;
//! assert!(summary.contains("• Avg: 120.50ms"));
//! # Ok(())
//! # }
//! ```

/// Dual-axis text chart rendering
///
/// Buckets a latency series over its time span, keeps per-bucket peak and
/// density, and rasterizes both onto a `width` x `height` grid. Empty and
/// degenerate series produce placeholders or flat lines, never `NaN`.
pub mod chart;

/// Command-line interface and configuration
///
/// Argument parsing with clap and the conversion of CLI options into the
/// `ReportConfig` consumed by the pipeline.
pub mod cli;

/// Typed ingestion and chart errors
pub mod error;

/// NDJSON parsing, smoke-test exclusion and endpoint classification
pub mod ingest;

/// Tracing subscriber setup
pub mod logging;

/// Report assembly and output
///
/// Composes ingestion, statistics and charts into a `LoadTestReport`, renders
/// it as text, markdown or JSON, and writes it to a file or stdout.
pub mod report;

/// Series and observation types shared by every stage
pub mod series;

/// Summary statistics over a series
///
/// Exact (non-histogram) statistics: mean, extrema, median and nearest-rank
/// percentiles, plus failure-flag aggregation.
pub mod stats;

pub mod utils;

pub use chart::{render_chart, ChartConfig, ChartGrid};
pub use cli::{Args, ReportConfig, ReportFormat};
pub use error::{ChartError, IngestError};
pub use ingest::{ingest, Classifier, EndpointPattern, IngestResult};
pub use report::{LoadTestReport, ReportWriter};
pub use series::{MetricKind, Observation, Series};
pub use stats::{FailureSummary, SummaryStatistics};

/// The current version of the crate, recorded in report metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Ingest `input` and build a report with `config`.
///
/// Fails on the first malformed record or on an invalid configuration; no
/// partial report is produced.
pub fn generate_report(input: &str, config: &ReportConfig) -> anyhow::Result<LoadTestReport> {
    config.validate()?;
    let ingested = config.classifier().ingest(input)?;
    LoadTestReport::build(&ingested, config)
}

/// Default configuration values
pub mod defaults {
    /// Default input file, as written by `k6 run --out json=k6-results.json`
    pub const INPUT_FILE: &str = "k6-results.json";

    /// Default chart width in columns
    pub const CHART_WIDTH: usize = 60;

    /// Default chart height in rows
    pub const CHART_HEIGHT: usize = 20;

    /// Percentiles reported unless overridden
    pub const PERCENTILES: &[f64] = &[90.0, 95.0];

    /// Scenario name of the main phase; earlier records are the smoke test
    pub const MAIN_SCENARIO: &str = "main";

    /// Name-tag substring for the process endpoint
    pub const PROCESS_PATTERN: &str = "/process";

    /// Name-tag substring for the finalize endpoint
    pub const FINALIZE_PATTERN: &str = "/finalize";
}
