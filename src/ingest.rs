//! # Record Ingestion and Classification
//!
//! Turns the newline-delimited JSON emitted by `k6 run --out json=...` into
//! typed [`Series`]. Every non-blank line must be valid JSON; the first bad
//! line aborts the whole pass so downstream stages never see a partially
//! consistent dataset.
//!
//! Only `Point` records for the recognized metrics are kept. HTTP samples are
//! routed to an endpoint by substring match on their `name` tag, using the
//! [`Classifier`]'s patterns in order (first match wins). When some record
//! carries `data.tags.scenario == "main"`, everything before the first such
//! record belongs to the smoke-test phase and is excluded. Streams without
//! the marker are ingested in full.

use crate::error::IngestError;
use crate::series::{MetricKind, Observation, Series};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::{debug, info};

/// Record type carrying metric samples
pub const POINT_RECORD_TYPE: &str = "Point";

/// Maps a name-tag substring onto a named endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointPattern {
    pub name: String,
    pub pattern: String,
}

impl EndpointPattern {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }

    /// Substring containment on the request's `name` tag
    pub fn matches(&self, name_tag: &str) -> bool {
        name_tag.contains(&self.pattern)
    }
}

/// Parses `NAME=PATTERN`, or a bare `PATTERN` whose name is the pattern
/// without its leading slashes (`/process` becomes `process`).
impl FromStr for EndpointPattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, pattern) = match s.split_once('=') {
            Some((name, pattern)) => (name.trim(), pattern.trim()),
            None => (s.trim_start_matches('/'), s),
        };

        if name.is_empty() || pattern.is_empty() {
            return Err(format!(
                "Invalid endpoint '{}': expected NAME=PATTERN or /PATTERN",
                s
            ));
        }

        Ok(Self::new(name, pattern))
    }
}

/// Endpoint patterns plus the scenario name that marks the main phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classifier {
    endpoints: Vec<EndpointPattern>,
    main_scenario: String,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(vec![
            EndpointPattern::new("process", crate::defaults::PROCESS_PATTERN),
            EndpointPattern::new("finalize", crate::defaults::FINALIZE_PATTERN),
        ])
    }
}

impl Classifier {
    pub fn new(endpoints: Vec<EndpointPattern>) -> Self {
        Self {
            endpoints,
            main_scenario: crate::defaults::MAIN_SCENARIO.to_string(),
        }
    }

    /// Override the scenario name used for smoke-test exclusion
    pub fn with_main_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.main_scenario = scenario.into();
        self
    }

    pub fn endpoints(&self) -> &[EndpointPattern] {
        &self.endpoints
    }

    /// Index of the first endpoint whose pattern occurs in `name_tag`
    pub fn classify(&self, name_tag: &str) -> Option<usize> {
        self.endpoints.iter().position(|e| e.matches(name_tag))
    }

    /// Ingest a whole NDJSON stream
    pub fn ingest(&self, input: &str) -> Result<IngestResult, IngestError> {
        ingest(input, self)
    }

    fn is_main_marker(&self, record: &Value) -> bool {
        record
            .pointer("/data/tags/scenario")
            .and_then(Value::as_str)
            .map_or(false, |scenario| scenario == self.main_scenario)
    }
}

/// Duration and failure series for one endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSeries {
    pub endpoint: String,
    pub durations: Series,
    pub failures: Series,
}

impl EndpointSeries {
    fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            durations: Series::new(format!("{}-duration", endpoint), MetricKind::Duration),
            failures: Series::new(format!("{}-failure", endpoint), MetricKind::Failure),
        }
    }
}

/// Counters describing what the ingestion pass saw
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    /// Non-blank lines parsed
    pub lines: usize,
    /// `Point` records considered after smoke-test exclusion
    pub points: usize,
    /// Scenario-tagged `Point` records dropped because they precede the
    /// main-scenario marker
    pub excluded_samples: usize,
    /// HTTP samples whose name matched no endpoint
    pub unclassified: usize,
    /// `Point` records for metrics this crate does not track
    pub unrecognized: usize,
    /// 1-based line of the first main-scenario record, if any
    pub main_marker_line: Option<usize>,
}

/// Immutable output of one ingestion pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResult {
    pub endpoints: Vec<EndpointSeries>,
    pub iterations: Series,
    pub vus: Series,
    pub summary: IngestSummary,
}

impl IngestResult {
    /// Look up an endpoint's series by name
    pub fn endpoint(&self, name: &str) -> Option<&EndpointSeries> {
        self.endpoints.iter().find(|e| e.endpoint == name)
    }

    /// Whether smoke-test samples preceding the main-scenario marker were dropped
    pub fn smoke_test_excluded(&self) -> bool {
        self.summary.excluded_samples > 0
    }
}

struct ParsedLine<'a> {
    line_number: usize,
    raw: &'a str,
    record: Value,
}

/// Where the main phase starts and how many samples precede it
struct MainMarker {
    line_number: usize,
    excluded_samples: usize,
}

/// Ingest a whole NDJSON stream with the given classifier.
///
/// Returns one [`EndpointSeries`] per classifier endpoint (in classifier
/// order) plus the iteration-duration and VU series. Records are parsed one
/// line at a time; only the extracted series are retained.
pub fn ingest(input: &str, classifier: &Classifier) -> Result<IngestResult, IngestError> {
    let marker = find_main_marker(input, classifier)?;

    let mut summary = IngestSummary {
        lines: non_blank_lines(input).count(),
        ..IngestSummary::default()
    };

    let start_line = match &marker {
        Some(marker) => {
            summary.main_marker_line = Some(marker.line_number);
            summary.excluded_samples = marker.excluded_samples;
            info!(
                "Main scenario starts at line {}, excluding {} smoke-test samples",
                marker.line_number, marker.excluded_samples
            );
            marker.line_number
        }
        None => {
            debug!("No '{}' scenario marker found, keeping all records", classifier.main_scenario);
            1
        }
    };

    let mut endpoints: Vec<EndpointSeries> = classifier
        .endpoints
        .iter()
        .map(|e| EndpointSeries::new(&e.name))
        .collect();
    let mut iterations = Series::new("iteration-duration", MetricKind::IterationDuration);
    let mut vus = Series::new("vus", MetricKind::ActiveWorkers);

    for (line_number, raw) in non_blank_lines(input).skip_while(|(n, _)| *n < start_line) {
        let line = parse_line(line_number, raw)?;
        if !is_point(&line.record) {
            continue;
        }
        summary.points += 1;

        let metric = line.record.get("metric").and_then(Value::as_str);
        let Some(kind) = metric.and_then(MetricKind::from_metric_name) else {
            summary.unrecognized += 1;
            continue;
        };

        let observation = extract_observation(&line, kind)?;

        match kind {
            MetricKind::Duration | MetricKind::Failure => {
                let name_tag = observation.endpoint.as_deref().unwrap_or_default();
                let Some(index) = classifier.classify(name_tag) else {
                    debug!("Dropping {} sample for unclassified name '{}'", kind, name_tag);
                    summary.unclassified += 1;
                    continue;
                };
                let target = &mut endpoints[index];
                if kind == MetricKind::Duration {
                    target.durations.push_observation(&observation);
                } else {
                    target.failures.push_observation(&observation);
                }
            }
            MetricKind::IterationDuration => iterations.push_observation(&observation),
            MetricKind::ActiveWorkers => vus.push_observation(&observation),
        }
    }

    for endpoint in &endpoints {
        info!(
            "Endpoint '{}': {} durations, {} failure flags",
            endpoint.endpoint,
            endpoint.durations.len(),
            endpoint.failures.len()
        );
    }
    debug!(
        "Ingested {} iterations, {} VU samples ({} unrecognized points)",
        iterations.len(),
        vus.len(),
        summary.unrecognized
    );

    Ok(IngestResult {
        endpoints,
        iterations,
        vus,
        summary,
    })
}

/// Scan for the first main-scenario record without retaining parsed lines.
///
/// Every line up to the marker is validated here, so a malformed smoke-test
/// line still aborts the pass. Only scenario-tagged points count as excluded
/// samples; metric declarations and untagged gauges do not.
fn find_main_marker(input: &str, classifier: &Classifier) -> Result<Option<MainMarker>, IngestError> {
    let mut excluded_samples = 0;
    for (line_number, raw) in non_blank_lines(input) {
        let line = parse_line(line_number, raw)?;
        if classifier.is_main_marker(&line.record) {
            return Ok(Some(MainMarker {
                line_number,
                excluded_samples,
            }));
        }
        if is_point(&line.record) && line.record.pointer("/data/tags/scenario").is_some() {
            excluded_samples += 1;
        }
    }
    Ok(None)
}

/// Non-blank lines with their 1-based line numbers
fn non_blank_lines(input: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    input
        .lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(index, raw)| (index + 1, raw))
}

fn parse_line(line_number: usize, raw: &str) -> Result<ParsedLine<'_>, IngestError> {
    serde_json::from_str(raw)
        .map(|record| ParsedLine {
            line_number,
            raw,
            record,
        })
        .map_err(|source| IngestError::InvalidJson {
            line_number,
            line: raw.to_string(),
            source,
        })
}

fn is_point(record: &Value) -> bool {
    record.get("type").and_then(Value::as_str) == Some(POINT_RECORD_TYPE)
}

fn extract_observation(line: &ParsedLine<'_>, kind: MetricKind) -> Result<Observation, IngestError> {
    let missing = |field: &'static str| IngestError::MissingField {
        line_number: line.line_number,
        field,
        line: line.raw.to_string(),
    };
    let invalid = |field: &'static str, reason: String| IngestError::InvalidField {
        line_number: line.line_number,
        field,
        reason,
        line: line.raw.to_string(),
    };

    let time = line
        .record
        .pointer("/data/time")
        .ok_or_else(|| missing("data.time"))?
        .as_str()
        .ok_or_else(|| invalid("data.time", "expected a string".to_string()))?;
    let timestamp = DateTime::parse_from_rfc3339(time)
        .map_err(|e| invalid("data.time", e.to_string()))?
        .with_timezone(&Utc);

    let value = line
        .record
        .pointer("/data/value")
        .ok_or_else(|| missing("data.value"))?
        .as_f64()
        .ok_or_else(|| invalid("data.value", "expected a number".to_string()))?;

    let endpoint = match line.record.pointer("/data/tags/name") {
        Some(name) => Some(
            name.as_str()
                .ok_or_else(|| invalid("data.tags.name", "expected a string".to_string()))?
                .to_string(),
        ),
        None if kind.is_endpoint_tagged() => return Err(missing("data.tags.name")),
        None => None,
    };

    Ok(Observation {
        kind,
        endpoint,
        value,
        timestamp,
    })
}
