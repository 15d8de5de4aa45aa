//! Query-frontend operational accounting for tracelake.
//!
//! The engine itself stays metric-free; the frontend wraps each query and
//! records the per-tenant query/SLO counters and throughput histogram
//! defined here.

pub mod slo;

pub use slo::{
    record_query, within_slo, QueryError, QueryOp, QueryOutcome, SloConfig,
    BYTES_PROCESSED_PER_SECOND, QUERIES_TOTAL, QUERIES_WITHIN_SLO_TOTAL,
};
