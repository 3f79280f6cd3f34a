use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric kinds recognized in the k6 output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// `http_req_duration`, milliseconds
    Duration,
    /// `http_req_failed`, 0 or 1
    Failure,
    /// `iteration_duration`, milliseconds
    IterationDuration,
    /// `vus`, active virtual users
    ActiveWorkers,
}

impl MetricKind {
    /// Map a k6 metric name onto a recognized kind
    pub fn from_metric_name(name: &str) -> Option<Self> {
        match name {
            "http_req_duration" => Some(MetricKind::Duration),
            "http_req_failed" => Some(MetricKind::Failure),
            "iteration_duration" => Some(MetricKind::IterationDuration),
            "vus" => Some(MetricKind::ActiveWorkers),
            _ => None,
        }
    }

    /// The k6 metric name for this kind
    pub fn metric_name(&self) -> &'static str {
        match self {
            MetricKind::Duration => "http_req_duration",
            MetricKind::Failure => "http_req_failed",
            MetricKind::IterationDuration => "iteration_duration",
            MetricKind::ActiveWorkers => "vus",
        }
    }

    /// Whether samples of this kind carry an endpoint `name` tag
    pub fn is_endpoint_tagged(&self) -> bool {
        matches!(self, MetricKind::Duration | MetricKind::Failure)
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.metric_name())
    }
}

/// One measured sample taken from a `Point` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: MetricKind,
    pub endpoint: Option<String>,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// Named sequence of observations sharing one classification.
///
/// Values and timestamps are stored side by side and always have the same
/// length; index `i` of one corresponds to index `i` of the other. The fields
/// are private so every mutation goes through methods that keep them aligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    name: String,
    kind: MetricKind,
    values: Vec<f64>,
    timestamps: Vec<DateTime<Utc>>,
}

impl Series {
    /// Create an empty series
    pub fn new(name: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            kind,
            values: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    /// Build a series from already-paired samples
    pub fn from_samples<I>(name: impl Into<String>, kind: MetricKind, samples: I) -> Self
    where
        I: IntoIterator<Item = (f64, DateTime<Utc>)>,
    {
        let mut series = Self::new(name, kind);
        for (value, timestamp) in samples {
            series.push(value, timestamp);
        }
        series
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Append one sample
    pub fn push(&mut self, value: f64, timestamp: DateTime<Utc>) {
        self.values.push(value);
        self.timestamps.push(timestamp);
    }

    /// Append an observation's value and timestamp
    pub fn push_observation(&mut self, observation: &Observation) {
        self.push(observation.value, observation.timestamp);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Earliest and latest timestamp, regardless of arrival order
    pub fn time_span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.timestamps.iter().min()?;
        let end = self.timestamps.iter().max()?;
        Some((*start, *end))
    }

    /// Number of truthy samples (value != 0), used for failure flags
    pub fn truthy_count(&self) -> usize {
        self.values.iter().filter(|&&v| v != 0.0).count()
    }
}
