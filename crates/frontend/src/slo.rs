//! Per-tenant query SLO accounting
//!
//! Every query increments `query_frontend_queries_total`; queries that meet
//! the configured SLO also increment
//! `query_frontend_queries_within_slo_total`. The two metrics carry the
//! same `tenant`/`op` labels so budget-burn calculations can align them.
//! Throughput is additionally observed in the
//! `query_frontend_bytes_processed_per_second` histogram.
//!
//! A query is within SLO when:
//! - it failed because the caller went away or was rate-limited
//!   (cancellation, resource exhausted), or
//! - it succeeded below 500, and either no SLO bound is configured or at
//!   least one of the latency/throughput bounds passes.

use std::time::Duration;

use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};

pub const QUERIES_TOTAL: &str = "query_frontend_queries_total";
pub const QUERIES_WITHIN_SLO_TOTAL: &str = "query_frontend_queries_within_slo_total";
pub const BYTES_PROCESSED_PER_SECOND: &str = "query_frontend_bytes_processed_per_second";

/// The query operation being accounted, used as the `op` metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    /// Trace-by-id lookups
    Traces,
    /// TraceQL / tag search
    Search,
}

impl QueryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOp::Traces => "traces",
            QueryOp::Search => "search",
        }
    }
}

/// SLO bounds for one query operation. Zero disables a bound.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SloConfig {
    /// Latency bound, in whole seconds.
    #[serde(default, with = "duration_secs")]
    pub duration_slo: Duration,
    /// Throughput bound in bytes per second.
    #[serde(default)]
    pub throughput_bytes_slo: f64,
}

/// Durations serialized as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

/// Error classification for SLO purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The tenant was rate-limited (HTTP 429 / gRPC resource-exhausted).
    ResourceExhausted,
    /// The caller cancelled the query.
    Cancelled,
    /// Anything else.
    Other(String),
}

impl From<&traceql::Error> for QueryError {
    fn from(err: &traceql::Error) -> Self {
        match err {
            traceql::Error::Cancelled => QueryError::Cancelled,
            other => QueryError::Other(other.to_string()),
        }
    }
}

/// The observable outcome of one query.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub status_code: u16,
    pub bytes_processed: u64,
    pub latency: Duration,
    pub error: Option<QueryError>,
}

/// Records one finished query against the per-tenant counters.
pub fn record_query(cfg: &SloConfig, op: QueryOp, tenant: &str, outcome: &QueryOutcome) {
    counter!(QUERIES_TOTAL, "tenant" => tenant.to_string(), "op" => op.as_str()).increment(1);

    if cfg.throughput_bytes_slo > 0.0 && outcome.error.is_none() && outcome.status_code < 500 {
        histogram!(
            BYTES_PROCESSED_PER_SECOND,
            "tenant" => tenant.to_string(),
            "op" => op.as_str()
        )
        .record(throughput(outcome));
    }

    if within_slo(cfg, outcome) {
        counter!(
            QUERIES_WITHIN_SLO_TOTAL,
            "tenant" => tenant.to_string(),
            "op" => op.as_str()
        )
        .increment(1);
    }
}

fn throughput(outcome: &QueryOutcome) -> f64 {
    let seconds = outcome.latency.as_secs_f64();
    if seconds > 0.0 {
        outcome.bytes_processed as f64 / seconds
    } else {
        0.0
    }
}

/// The SLO decision, separated from metric emission so it can be tested
/// and reused.
pub fn within_slo(cfg: &SloConfig, outcome: &QueryOutcome) -> bool {
    // Most errors are SLO violations, but rate-limiting and caller
    // cancellation are not the server's miss.
    if let Some(err) = &outcome.error {
        return matches!(
            err,
            QueryError::ResourceExhausted | QueryError::Cancelled
        );
    }

    // 200s/300s/400s count as success; 500s never meet the SLO.
    if outcome.status_code >= 500 {
        return false;
    }

    let passed_throughput =
        cfg.throughput_bytes_slo > 0.0 && throughput(outcome) >= cfg.throughput_bytes_slo;
    let passed_duration =
        cfg.duration_slo > Duration::ZERO && outcome.latency < cfg.duration_slo;

    // Latency and throughput are evaluated simultaneously: either passing
    // suffices, and both only gate when at least one is configured.
    let has_configured_slo =
        cfg.duration_slo > Duration::ZERO || cfg.throughput_bytes_slo > 0.0;
    if !passed_duration && !passed_throughput && has_configured_slo {
        return false;
    }

    true
}
