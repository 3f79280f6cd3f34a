use crate::{
    chart::{self, ChartConfig},
    cli::{ReportConfig, ReportFormat},
    error::ChartError,
    ingest::{EndpointSeries, IngestResult, IngestSummary},
    stats::{FailureSummary, GaugeRange, SummaryStatistics},
    utils::{
        format_duration_ms, format_failures, format_optional_ms, format_request_rate,
        markdown_row, markdown_separator, percentile_label,
    },
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

/// Statistics and chart for one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointReport {
    pub endpoint: String,
    /// `None` when the endpoint saw no duration samples
    pub latency: Option<SummaryStatistics>,
    pub failures: FailureSummary,
    pub chart: String,
}

impl EndpointReport {
    /// Summarize and chart one endpoint's series
    pub fn build(
        series: &EndpointSeries,
        percentiles: &[f64],
        chart_config: &ChartConfig,
    ) -> Result<Self, ChartError> {
        let title = chart_title(&series.endpoint);
        Ok(Self {
            endpoint: series.endpoint.clone(),
            latency: SummaryStatistics::from_series(&series.durations, percentiles),
            failures: FailureSummary::from_series(&series.failures),
            chart: chart::render_series(&series.durations, &title, chart_config)?,
        })
    }

    pub fn requests(&self) -> usize {
        self.latency.as_ref().map_or(0, |l| l.count)
    }
}

/// Totals across every endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTotals {
    pub requests: usize,
    pub failures: FailureSummary,
    /// Statistics over the union of all endpoint durations
    pub latency: Option<SummaryStatistics>,
    /// Seconds between the first and last request sample
    pub duration_secs: Option<f64>,
    /// Requests per second over `duration_secs`
    pub request_rate: Option<f64>,
}

/// Report metadata for reproducibility
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub version: String,
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub ingest: IngestSummary,
}

/// Complete report for one k6 run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTestReport {
    pub metadata: ReportMetadata,
    pub smoke_test_excluded: bool,
    pub percentiles: Vec<f64>,
    pub endpoints: Vec<EndpointReport>,
    pub totals: RequestTotals,
    pub iterations: Option<SummaryStatistics>,
    pub vus: Option<GaugeRange>,
}

impl LoadTestReport {
    /// Build a report from an ingestion result.
    ///
    /// Endpoints are summarized in parallel; they share no state and the
    /// output keeps the classifier's endpoint order.
    pub fn build(ingest: &IngestResult, config: &ReportConfig) -> Result<Self> {
        let endpoints = ingest
            .endpoints
            .par_iter()
            .map(|series| EndpointReport::build(series, &config.percentiles, &config.chart))
            .collect::<Result<Vec<_>, ChartError>>()
            .context("Failed to render endpoint charts")?;

        let totals = Self::calculate_totals(ingest, &endpoints, &config.percentiles);
        debug!(
            "Report totals: {} requests, {} failed",
            totals.requests, totals.failures.failed
        );

        Ok(Self {
            metadata: ReportMetadata {
                version: crate::VERSION.to_string(),
                report_id: Uuid::new_v4(),
                generated_at: Utc::now(),
                ingest: ingest.summary.clone(),
            },
            smoke_test_excluded: ingest.smoke_test_excluded(),
            percentiles: config.percentiles.clone(),
            endpoints,
            totals,
            iterations: SummaryStatistics::from_series(&ingest.iterations, &[]),
            vus: GaugeRange::from_values(ingest.vus.values()),
        })
    }

    fn calculate_totals(
        ingest: &IngestResult,
        endpoints: &[EndpointReport],
        percentiles: &[f64],
    ) -> RequestTotals {
        let requests = endpoints.iter().map(EndpointReport::requests).sum::<usize>();
        let failures = endpoints
            .iter()
            .map(|e| e.failures)
            .fold(FailureSummary::default(), FailureSummary::merge);

        let all_durations: Vec<f64> = ingest
            .endpoints
            .iter()
            .flat_map(|e| e.durations.values().iter().copied())
            .collect();

        let span = ingest
            .endpoints
            .iter()
            .filter_map(|e| e.durations.time_span())
            .reduce(|(s1, e1), (s2, e2)| (s1.min(s2), e1.max(e2)));
        let duration_secs =
            span.map(|(start, end)| (end - start).num_milliseconds() as f64 / 1_000.0);
        let request_rate = duration_secs
            .filter(|&secs| secs > 0.0)
            .map(|secs| requests as f64 / secs);

        RequestTotals {
            requests,
            failures,
            latency: SummaryStatistics::from_values(&all_durations, percentiles),
            duration_secs,
            request_rate,
        }
    }

    /// Render in the requested format
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Text => Ok(self.to_text()),
            ReportFormat::Markdown => Ok(self.to_markdown()),
            ReportFormat::Json => {
                serde_json::to_string_pretty(self).context("Failed to serialize report")
            }
        }
    }

    /// Bullet summary suitable for a chat message, followed by the charts
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "K6 Load Test Summary");
        if self.smoke_test_excluded {
            let _ = writeln!(
                out,
                "(Excluding {} smoke-test samples)",
                self.metadata.ingest.excluded_samples
            );
        }

        let _ = writeln!(out, "\nTest Results");
        let _ = writeln!(
            out,
            "• Total Requests: {} ({})",
            self.totals.requests,
            self.per_endpoint(|e| e.requests().to_string())
        );
        let _ = writeln!(
            out,
            "• Failed Requests: {} ({})",
            format_failures(self.totals.failures.failed, self.totals.failures.total),
            self.per_endpoint(|e| format!("{}/{}", e.failures.failed, e.failures.total))
        );
        if let Some(rate) = self.totals.request_rate {
            let _ = writeln!(out, "• Request Rate: {}", format_request_rate(rate));
        }
        let _ = writeln!(
            out,
            "• Iterations: {}",
            self.iterations.as_ref().map_or(0, |i| i.count)
        );

        let _ = writeln!(out, "\nHTTP Request Duration");
        for endpoint in &self.endpoints {
            let _ = writeln!(out, "{}:", endpoint.endpoint);
            match &endpoint.latency {
                Some(latency) => {
                    let _ = writeln!(out, "• Avg: {}", format_duration_ms(latency.average));
                    let _ = writeln!(out, "• Min: {}", format_duration_ms(latency.min));
                    let _ = writeln!(out, "• Max: {}", format_duration_ms(latency.max));
                    let _ = writeln!(out, "• Median: {}", format_duration_ms(latency.median));
                    for pv in &latency.percentiles {
                        let _ = writeln!(
                            out,
                            "• {}: {}",
                            percentile_label(pv.percentile),
                            format_duration_ms(pv.value)
                        );
                    }
                }
                None => {
                    let _ = writeln!(out, "• No data");
                }
            }
        }

        let _ = writeln!(out, "\nAdditional Metrics");
        match &self.iterations {
            Some(iterations) => {
                let _ = writeln!(
                    out,
                    "• Iteration Duration: Avg: {}, Min: {}, Max: {}, Median: {}",
                    format_duration_ms(iterations.average),
                    format_duration_ms(iterations.min),
                    format_duration_ms(iterations.max),
                    format_duration_ms(iterations.median)
                );
            }
            None => {
                let _ = writeln!(out, "• Iteration Duration: N/A");
            }
        }
        let _ = writeln!(out, "• Virtual Users (VUs): {}", self.vus_label());

        self.append_charts(&mut out);
        out
    }

    /// Markdown summary tables, followed by the charts
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let mut header = vec!["Metric".to_string(), "Total".to_string()];
        header.extend(self.endpoints.iter().map(|e| e.endpoint.clone()));

        let _ = writeln!(out, "# K6 Load Test Summary Statistics");
        if self.smoke_test_excluded {
            let _ = writeln!(out, "\n_Excluding the smoke-test phase._");
        }

        let _ = writeln!(out, "\n## Test Results");
        let _ = writeln!(out, "{}", markdown_row(&header));
        let _ = writeln!(out, "{}", markdown_separator(header.len()));

        let mut row = vec!["http_reqs".to_string(), self.totals.requests.to_string()];
        row.extend(self.endpoints.iter().map(|e| e.requests().to_string()));
        let _ = writeln!(out, "{}", markdown_row(&row));

        let mut row = vec![
            "http_req_failed".to_string(),
            format_failures(self.totals.failures.failed, self.totals.failures.total),
        ];
        row.extend(
            self.endpoints
                .iter()
                .map(|e| format_failures(e.failures.failed, e.failures.total)),
        );
        let _ = writeln!(out, "{}", markdown_row(&row));

        let mut lines = vec![
            DurationRow::Average,
            DurationRow::Min,
            DurationRow::Max,
            DurationRow::Median,
        ];
        lines.extend(self.percentiles.iter().map(|&p| DurationRow::Percentile(p)));

        for (index, line) in lines.iter().enumerate() {
            let metric = if index == 0 { "http_req_duration" } else { "" };
            let cell = |stats: &Option<SummaryStatistics>| {
                format!(
                    "{}: {}",
                    line.label(),
                    format_optional_ms(stats.as_ref().and_then(|s| line.pick(s)))
                )
            };
            let mut row = vec![metric.to_string(), cell(&self.totals.latency)];
            row.extend(self.endpoints.iter().map(|e| cell(&e.latency)));
            let _ = writeln!(out, "{}", markdown_row(&row));
        }

        let _ = writeln!(out, "\n## Additional Metrics");
        let _ = writeln!(out, "{}", markdown_row(&["Metric", "Value"]));
        let _ = writeln!(out, "{}", markdown_separator(2));
        let iterations = &self.iterations;
        let _ = writeln!(
            out,
            "{}",
            markdown_row(&[
                "iterations".to_string(),
                iterations.as_ref().map_or(0, |i| i.count).to_string()
            ])
        );
        for (label, value) in [
            ("Avg", iterations.as_ref().map(|i| i.average)),
            ("Min", iterations.as_ref().map(|i| i.min)),
            ("Max", iterations.as_ref().map(|i| i.max)),
            ("Med", iterations.as_ref().map(|i| i.median)),
        ] {
            let metric = if label == "Avg" { "iteration_duration" } else { "" };
            let _ = writeln!(
                out,
                "{}",
                markdown_row(&[metric.to_string(), format!("{}: {}", label, format_optional_ms(value))])
            );
        }
        let _ = writeln!(out, "{}", markdown_row(&["vus".to_string(), self.vus_label()]));

        self.append_charts(&mut out);
        out
    }

    fn per_endpoint<F>(&self, value: F) -> String
    where
        F: Fn(&EndpointReport) -> String,
    {
        self.endpoints
            .iter()
            .map(|e| format!("{}: {}", e.endpoint, value(e)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn vus_label(&self) -> String {
        match self.vus {
            Some(range) => format!("Min: {}, Max: {}", range.min, range.max),
            None => "N/A".to_string(),
        }
    }

    fn append_charts(&self, out: &mut String) {
        for endpoint in &self.endpoints {
            let _ = write!(out, "\n```\n{}```\n", endpoint.chart);
        }
    }
}

/// One latency row of the markdown duration table
enum DurationRow {
    Average,
    Min,
    Max,
    Median,
    Percentile(f64),
}

impl DurationRow {
    fn label(&self) -> String {
        match self {
            DurationRow::Average => "Avg".to_string(),
            DurationRow::Min => "Min".to_string(),
            DurationRow::Max => "Max".to_string(),
            DurationRow::Median => "Med".to_string(),
            DurationRow::Percentile(p) => percentile_label(*p),
        }
    }

    fn pick(&self, stats: &SummaryStatistics) -> Option<f64> {
        match self {
            DurationRow::Average => Some(stats.average),
            DurationRow::Min => Some(stats.min),
            DurationRow::Max => Some(stats.max),
            DurationRow::Median => Some(stats.median),
            DurationRow::Percentile(p) => stats.percentile(*p),
        }
    }
}

/// Writes rendered reports to a file or stdout, and charts to a directory
pub struct ReportWriter {
    output_file: Option<PathBuf>,
    chart_dir: Option<PathBuf>,
}

impl ReportWriter {
    /// Create a writer; `None` writes the summary to stdout
    pub fn new(output_file: Option<&Path>) -> Self {
        Self {
            output_file: output_file.map(Path::to_path_buf),
            chart_dir: None,
        }
    }

    /// Also write each endpoint chart to `<dir>/<endpoint>_chart.txt`
    pub fn with_chart_dir(mut self, chart_dir: Option<&Path>) -> Self {
        self.chart_dir = chart_dir.map(Path::to_path_buf);
        self
    }

    /// Render and write the report
    pub fn write(&self, report: &LoadTestReport, format: ReportFormat) -> Result<()> {
        let rendered = report.render(format)?;

        match &self.output_file {
            Some(path) => {
                std::fs::write(path, &rendered)
                    .with_context(|| format!("Failed to write report to {:?}", path))?;
                info!("Report written to: {:?}", path);
            }
            None => {
                let stdout = std::io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(rendered.as_bytes())
                    .context("Failed to write report to stdout")?;
                handle.flush()?;
            }
        }

        if let Some(dir) = &self.chart_dir {
            self.write_charts(report, dir)?;
        }

        Ok(())
    }

    fn write_charts(&self, report: &LoadTestReport, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create chart directory {:?}", dir))?;

        for endpoint in &report.endpoints {
            let path = dir.join(chart_file_name(&endpoint.endpoint));
            std::fs::write(&path, &endpoint.chart)
                .with_context(|| format!("Failed to write chart to {:?}", path))?;
            info!("Chart for '{}' written to: {:?}", endpoint.endpoint, path);
        }

        Ok(())
    }
}

/// "process" -> "Process Request Duration"
fn chart_title(endpoint: &str) -> String {
    let mut chars = endpoint.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{} Request Duration", capitalized)
}

/// File name for an endpoint chart, with anything outside `[A-Za-z0-9_-]` replaced
fn chart_file_name(endpoint: &str) -> String {
    let stem: String = endpoint
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_chart.txt", stem)
}
