//! # vparquet - TraceQL Execution over Columnar Trace Blocks
//!
//! This crate is the serving path of a trace search: given a structured
//! condition list and a time window, it scans one vParquet block and emits
//! one [`traceql::Spanset`] per matching trace, without materializing whole
//! traces.
//!
//! The execution model is a hierarchy of synchronized column iterators
//! (see [`parquetquery`]): conditions compile to predicates pushed down to
//! their columns, and collectors at the span, resource, and trace levels
//! assemble attributes, spans, and spansets as the joined groups stream by.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use storage::{LocalBackend, BlockBackend, SearchOptions};
//! use tokio_util::sync::CancellationToken;
//! use traceql::SpansetIterator;
//! use vparquet::BackendBlock;
//!
//! # fn main() -> traceql::Result<()> {
//! let backend = Arc::new(LocalBackend::new("/var/tracelake"));
//! let meta = backend
//!     .block_meta("single-tenant", uuid::Uuid::new_v4())
//!     .map_err(|e| traceql::Error::Storage(e.to_string()))?;
//! let block = BackendBlock::new(meta, backend)?;
//!
//! let req = traceql::FetchSpansRequest::default();
//! let mut resp = block.fetch(CancellationToken::new(), &req, SearchOptions::all_pages())?;
//! while let Some(spanset) = resp.results.next()? {
//!     println!("trace {:x?}: {} spans", spanset.trace_id, spanset.spans.len());
//! }
//! println!("read {} bytes", (resp.bytes)());
//! # Ok(())
//! # }
//! ```

pub mod block;
pub mod collectors;
pub mod fetch;
pub mod predicate;
pub mod schema;
pub mod wellknown;

pub use block::{check_conditions, BackendBlock};
pub use schema::VERSION;

/// Maps iterator-level errors onto the fetch error taxonomy.
pub(crate) fn to_fetch_error(err: parquetquery::Error) -> traceql::Error {
    match err {
        parquetquery::Error::Cancelled => traceql::Error::Cancelled,
        parquetquery::Error::Internal(msg) => traceql::Error::Internal(msg),
        other => traceql::Error::Storage(other.to_string()),
    }
}
