//! TraceQL condition model and fetch surface.
//!
//! This crate defines the structured form of a TraceQL query as consumed by
//! the block engine: typed [`Static`] literals, [`Attribute`] references with
//! scope and intrinsic routing, [`Condition`]s, and the
//! [`FetchSpansRequest`]/[`FetchSpansResponse`] surface through which
//! callers stream matching [`Spanset`]s out of a block.
//!
//! Parsing TraceQL source text is a frontend concern; the engine takes the
//! already-structured condition list.

pub mod attribute;
pub mod condition;
pub mod error;
pub mod fetch;
pub mod static_value;

pub use attribute::{Attribute, AttributeScope, Intrinsic};
pub use condition::{Condition, Operator};
pub use error::{Error, Result};
pub use fetch::{
    FetchSpansRequest, FetchSpansResponse, MergeSpansetIterator, Span, Spanset, SpansetIterator,
};
pub use static_value::{Static, StaticType, Status};
