//! Block fetch entry point
//!
//! A [`BackendBlock`] ties a block's metadata to the backend that can open
//! it. [`BackendBlock::fetch`] validates the request, opens the data file,
//! builds the iterator tree, and returns a lazy spanset stream plus a
//! bytes-read accounting closure.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use parquet::file::footer;
use storage::{BlockBackend, BlockMeta, SearchOptions};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use traceql::{
    Condition, Error, FetchSpansRequest, FetchSpansResponse, Operator, Result, Spanset,
    SpansetIterator,
};

use crate::collectors::GroupValue;
use crate::fetch::{create_fetch_iterator, IterFactory, PqIter};
use crate::schema;
use crate::to_fetch_error;
use crate::wellknown::ColumnMapping;

/// One block opened for querying.
pub struct BackendBlock {
    meta: BlockMeta,
    backend: Arc<dyn BlockBackend>,
}

impl std::fmt::Debug for BackendBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendBlock").field("meta", &self.meta).finish()
    }
}

impl BackendBlock {
    /// Wraps a block for fetching. Refuses blocks whose format version this
    /// engine does not implement.
    pub fn new(meta: BlockMeta, backend: Arc<dyn BlockBackend>) -> Result<Self> {
        if meta.version != schema::VERSION {
            return Err(Error::UnsupportedBlock {
                found: meta.version,
                expected: schema::VERSION.to_string(),
            });
        }
        Ok(Self { meta, backend })
    }

    pub fn meta(&self) -> &BlockMeta {
        &self.meta
    }

    /// Fetches spansets matching the request. The request is checked for
    /// internal consistency first: operand count matches the operator and
    /// all operands in each condition share one type.
    pub fn fetch(
        &self,
        cancel: CancellationToken,
        req: &FetchSpansRequest,
        opts: SearchOptions,
    ) -> Result<FetchSpansResponse> {
        check_conditions(&req.conditions)?;
        let mapping = ColumnMapping::for_block(&self.meta)?;

        let reader = self
            .backend
            .open_block_for_search(&self.meta)
            .map_err(|e| Error::Storage(e.to_string()))?;
        let counter = reader.counter();
        let reader = Arc::new(reader);

        #[allow(deprecated)]
        let metadata = footer::parse_metadata(reader.as_ref())
            .map_err(|e| Error::Storage(e.to_string()))?;
        let metadata = Arc::new(metadata);

        // Narrow to the requested row-group range. Sharding calculations
        // upstream are estimates, so clamp to what the file actually has.
        let total_row_groups = metadata.num_row_groups();
        let row_groups: Vec<usize> = if opts.total_pages > 0 {
            let start = opts.start_page.min(total_row_groups);
            let end = (opts.start_page + opts.total_pages).min(total_row_groups);
            (start..end).collect()
        } else {
            (0..total_row_groups).collect()
        };

        debug!(
            block_id = %self.meta.block_id,
            conditions = req.conditions.len(),
            all_conditions = req.all_conditions,
            row_groups = row_groups.len(),
            "fetching spansets"
        );

        let factory = IterFactory {
            cancel,
            reader,
            metadata,
            row_groups,
        };
        let iter = create_fetch_iterator(&factory, &mapping, req)?;

        Ok(FetchSpansResponse {
            results: Box::new(SpansetFetchIterator { iter }),
            bytes: Box::new(move || counter.load(Ordering::Relaxed)),
        })
    }
}

/// Validates condition arity and operand-type homogeneity before any I/O.
pub fn check_conditions(conditions: &[Condition]) -> Result<()> {
    for cond in conditions {
        let op_count = cond.operands.len();

        match cond.op {
            Operator::None => {
                if op_count != 0 {
                    return Err(Error::Validation(format!(
                        "operator none must have 0 arguments: {}",
                        cond
                    )));
                }
            }
            Operator::Equal
            | Operator::NotEqual
            | Operator::Greater
            | Operator::GreaterEqual
            | Operator::Less
            | Operator::LessEqual
            | Operator::Regex => {
                if op_count != 1 {
                    return Err(Error::Validation(format!(
                        "operator {} must have exactly 1 argument: {}",
                        cond.op, cond
                    )));
                }
            }
        }

        // All operands must share one type.
        if let Some(first) = cond.operands.first() {
            for operand in &cond.operands[1..] {
                if operand.static_type() != first.static_type() {
                    return Err(Error::Validation(format!(
                        "operands must be of the same type: {}",
                        cond
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Drives the trace iterator and unwraps the final spanset of each group.
struct SpansetFetchIterator {
    iter: PqIter,
}

impl SpansetIterator for SpansetFetchIterator {
    fn next(&mut self) -> Result<Option<Spanset>> {
        match self.iter.next().map_err(to_fetch_error)? {
            None => Ok(None),
            Some(mut result) => match result.other_entries.pop() {
                Some((_, GroupValue::Spanset(spanset))) => Ok(Some(*spanset)),
                _ => Err(Error::Internal(
                    "trace iterator emitted a group without a spanset".to_string(),
                )),
            },
        }
    }
}
