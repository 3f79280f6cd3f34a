//! # k6 Report - Main Entry Point
//!
//! Reads the NDJSON stream written by `k6 run --out json=<file>` and prints a
//! summary with one latency/throughput chart per endpoint.
//!
//! ## Flow
//!
//! 1. **Parse arguments**: clap derive, converted into a `ReportConfig`
//! 2. **Initialize logging**: tracing to stderr, or to `--log-file`
//! 3. **Read input**: the results file, or stdin for `-`
//! 4. **Build report**: ingest, statistics and charts
//! 5. **Write output**: summary to stdout or `--output`, charts to `--chart-dir`
//!
//! Any malformed record aborts the run with a non-zero exit status and the
//! offending line number; no partial report is written.

use anyhow::{Context, Result};
use clap::Parser;
use k6_report::{cli::Args, logging::init_logging, LoadTestReport, ReportConfig, ReportWriter};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

fn main() -> Result<()> {
    let args = Args::parse();

    // Hold the guard until exit so the file writer flushes.
    let _log_guard = init_logging(args.verbose, args.log_file.as_deref())?;

    info!("Starting k6 report v{}", k6_report::VERSION);
    debug!("Configuration: {:?}", args);

    let config = ReportConfig::from(&args);
    config.validate()?;

    let input = read_input(&args.input)?;
    let ingested = config
        .classifier()
        .ingest(&input)
        .with_context(|| format!("Failed to parse k6 results from {:?}", args.input))?;

    let report = LoadTestReport::build(&ingested, &config)?;

    ReportWriter::new(args.output.as_deref())
        .with_chart_dir(args.chart_dir.as_deref())
        .write(&report, config.format)?;

    info!("Report {} completed", report.metadata.report_id);
    Ok(())
}

/// Read the whole input stream; `-` means stdin
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        std::io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read k6 results from stdin")?;
        return Ok(input);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read k6 results from {:?}", path))
}
