//! Fetch request/response types and the spanset result stream

use std::collections::HashMap;

use crate::attribute::Attribute;
use crate::condition::Condition;
use crate::error::Result;
use crate::static_value::Static;

/// A request to fetch matching spansets from a block.
///
/// `start_time_unix_nanos`/`end_time_unix_nanos` bound the span time window;
/// both must be non-zero for the window to apply. With `all_conditions` set,
/// every condition must match (AND semantics); otherwise a span matching any
/// condition is returned.
#[derive(Debug, Clone, Default)]
pub struct FetchSpansRequest {
    pub start_time_unix_nanos: u64,
    pub end_time_unix_nanos: u64,
    pub conditions: Vec<Condition>,
    pub all_conditions: bool,
}

/// One span as returned inside a [`Spanset`].
///
/// Intrinsics (`name`, `status`, `duration`) appear as attribute entries
/// keyed by their intrinsic attribute.
#[derive(Debug, Clone, Default)]
pub struct Span {
    pub id: Vec<u8>,
    pub start_time_unix_nanos: u64,
    pub end_time_unix_nanos: u64,
    pub attributes: HashMap<Attribute, Static>,
}

/// The per-trace result unit: trace identity plus the matched spans.
#[derive(Debug, Clone, Default)]
pub struct Spanset {
    pub trace_id: Vec<u8>,
    pub start_time_unix_nanos: u64,
    pub duration_nanos: u64,
    pub root_span_name: String,
    pub root_service_name: String,
    pub spans: Vec<Span>,
}

/// A pull-based stream of spansets, one per matching trace, in block row
/// order. `Ok(None)` signals end of stream.
pub trait SpansetIterator: Send {
    fn next(&mut self) -> Result<Option<Spanset>>;
}

/// The result of a block fetch: the lazy result stream plus an accounting
/// closure reporting the bytes read from backing storage so far.
pub struct FetchSpansResponse {
    pub results: Box<dyn SpansetIterator>,
    pub bytes: Box<dyn Fn() -> u64 + Send + Sync>,
}

impl std::fmt::Debug for FetchSpansResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchSpansResponse").finish()
    }
}

/// Iterates through a list of spanset iterators, exhausting each in order.
///
/// Used by callers that fetch from several blocks and want one stream.
pub struct MergeSpansetIterator {
    iters: Vec<Box<dyn SpansetIterator>>,
    cur: usize,
}

impl MergeSpansetIterator {
    pub fn new(iters: Vec<Box<dyn SpansetIterator>>) -> Self {
        Self { iters, cur: 0 }
    }
}

impl SpansetIterator for MergeSpansetIterator {
    fn next(&mut self) -> Result<Option<Spanset>> {
        while self.cur < self.iters.len() {
            match self.iters[self.cur].next()? {
                Some(spanset) => return Ok(Some(spanset)),
                None => self.cur += 1,
            }
        }
        Ok(None)
    }
}
