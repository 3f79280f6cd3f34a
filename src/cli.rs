use crate::chart::ChartConfig;
use crate::ingest::{Classifier, EndpointPattern};
use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// k6 Report - summary statistics and text charts from k6 JSON output
#[derive(Parser, Debug, Clone, Default)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// k6 NDJSON results file (`k6 run --out json=<file>`), or "-" for stdin
    #[clap(default_value = crate::defaults::INPUT_FILE)]
    pub input: PathBuf,

    /// Write the summary to this file instead of stdout
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Also write one `<endpoint>_chart.txt` per endpoint into this directory
    #[clap(long)]
    pub chart_dir: Option<PathBuf>,

    /// Summary format
    #[clap(short = 'f', long, value_enum, default_value_t = ReportFormat::Text, help_heading = "Report Options")]
    pub format: ReportFormat,

    /// Chart width in columns (time buckets)
    #[clap(short = 'w', long, default_value_t = crate::defaults::CHART_WIDTH, help_heading = "Report Options")]
    pub width: usize,

    /// Chart height in rows
    #[clap(short = 'H', long, default_value_t = crate::defaults::CHART_HEIGHT, help_heading = "Report Options")]
    pub height: usize,

    /// Percentiles to report for latency series, comma-separated or repeated
    #[clap(long, value_delimiter = ',', default_values_t = crate::defaults::PERCENTILES.to_vec(), help_heading = "Report Options")]
    pub percentiles: Vec<f64>,

    /// Draw latency only, without the requests/s overlay
    #[clap(long, default_value_t = false, help_heading = "Report Options")]
    pub no_throughput: bool,

    /// Endpoint classification as NAME=PATTERN, matched as a substring of the request name tag (repeatable)
    #[clap(short = 'e', long = "endpoint", value_name = "NAME=PATTERN", default_values = ["process=/process", "finalize=/finalize"], help_heading = "Ingest Options")]
    pub endpoints: Vec<EndpointPattern>,

    /// Scenario name marking the main phase; records before its first sample are dropped
    #[clap(long, default_value = crate::defaults::MAIN_SCENARIO, help_heading = "Ingest Options")]
    pub main_scenario: String,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Write logs to this file instead of stderr
    #[clap(long)]
    pub log_file: Option<PathBuf>,
}

/// Available summary formats
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Bullet summary for chat channels, followed by the charts
    #[default]
    #[clap(name = "text")]
    Text,

    /// Markdown summary tables, followed by the charts
    #[clap(name = "markdown")]
    Markdown,

    /// Machine-readable JSON including every statistic
    #[clap(name = "json")]
    Json,
}

impl std::fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportFormat::Text => write!(f, "text"),
            ReportFormat::Markdown => write!(f, "markdown"),
            ReportFormat::Json => write!(f, "json"),
        }
    }
}

/// Configuration for building a report
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub chart: ChartConfig,
    pub percentiles: Vec<f64>,
    pub format: ReportFormat,
    pub endpoints: Vec<EndpointPattern>,
    pub main_scenario: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            chart: ChartConfig::default(),
            percentiles: crate::defaults::PERCENTILES.to_vec(),
            format: ReportFormat::default(),
            endpoints: Classifier::default().endpoints().to_vec(),
            main_scenario: crate::defaults::MAIN_SCENARIO.to_string(),
        }
    }
}

impl From<&Args> for ReportConfig {
    fn from(args: &Args) -> Self {
        Self {
            chart: ChartConfig {
                width: args.width,
                height: args.height,
                show_throughput: !args.no_throughput,
            },
            percentiles: args.percentiles.clone(),
            format: args.format,
            endpoints: args.endpoints.clone(),
            main_scenario: args.main_scenario.clone(),
        }
    }
}

impl ReportConfig {
    /// Reject configurations that cannot produce a report
    pub fn validate(&self) -> Result<()> {
        crate::utils::validate_chart_dimensions(self.chart.width, self.chart.height)?;
        crate::utils::validate_percentiles(&self.percentiles)?;
        if self.endpoints.is_empty() {
            anyhow::bail!("At least one endpoint pattern is required");
        }
        Ok(())
    }

    /// Classifier for these endpoint patterns and main scenario
    pub fn classifier(&self) -> Classifier {
        Classifier::new(self.endpoints.clone()).with_main_scenario(self.main_scenario.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test clap defaults line up with the library defaults
    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["k6-report"]);

        assert_eq!(args.input, PathBuf::from(crate::defaults::INPUT_FILE));
        assert_eq!(args.format, ReportFormat::Text);
        assert_eq!(args.width, 60);
        assert_eq!(args.height, 20);
        assert_eq!(args.percentiles, vec![90.0, 95.0]);
        assert_eq!(args.main_scenario, "main");
        assert!(!args.no_throughput);

        let config = ReportConfig::from(&args);
        assert_eq!(config, ReportConfig::default());
    }

    /// Test overriding options from the command line
    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "k6-report",
            "results.json",
            "--format",
            "markdown",
            "-w",
            "30",
            "-H",
            "10",
            "--percentiles",
            "50,99",
            "--no-throughput",
            "-e",
            "upload=/upload",
        ]);

        let config = ReportConfig::from(&args);
        assert_eq!(args.input, PathBuf::from("results.json"));
        assert_eq!(config.format, ReportFormat::Markdown);
        assert_eq!(config.chart.width, 30);
        assert_eq!(config.chart.height, 10);
        assert!(!config.chart.show_throughput);
        assert_eq!(config.percentiles, vec![50.0, 99.0]);
        assert_eq!(config.endpoints, vec![EndpointPattern::new("upload", "/upload")]);
        assert!(config.validate().is_ok());
    }

    /// Test that percentiles do not consume the positional input path
    #[test]
    fn test_percentiles_before_input_path() {
        let args = Args::parse_from(["k6-report", "--percentiles", "90,95", "results.json"]);
        assert_eq!(args.percentiles, vec![90.0, 95.0]);
        assert_eq!(args.input, PathBuf::from("results.json"));

        let args = Args::parse_from([
            "k6-report",
            "--percentiles",
            "50",
            "--percentiles",
            "99.9",
            "results.json",
        ]);
        assert_eq!(args.percentiles, vec![50.0, 99.9]);
        assert_eq!(args.input, PathBuf::from("results.json"));
    }

    /// Test configuration validation
    #[test]
    fn test_report_config_validate() {
        let mut config = ReportConfig::default();
        assert!(config.validate().is_ok());

        config.chart.width = 0;
        assert!(config.validate().is_err());

        let config = ReportConfig {
            percentiles: vec![101.0],
            ..ReportConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ReportConfig {
            endpoints: Vec::new(),
            ..ReportConfig::default()
        };
        assert!(config.validate().is_err());
    }

    /// Test format display names
    #[test]
    fn test_report_format_display() {
        assert_eq!(ReportFormat::Text.to_string(), "text");
        assert_eq!(ReportFormat::Markdown.to_string(), "markdown");
        assert_eq!(ReportFormat::Json.to_string(), "json");
    }
}
