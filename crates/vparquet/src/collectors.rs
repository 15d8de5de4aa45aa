//! Group collectors
//!
//! Collectors are the [`GroupPredicate`]s attached to each join level.
//! They turn raw column entries into domain objects and pass them upward
//! through the typed `other_entries` side channel: attribute groups become
//! `(key, Static)` pairs, span groups become [`Span`]s, batch groups become
//! [`Spanset`]s, and the trace group merges everything into the final
//! spanset.

use std::collections::HashMap;
use std::time::Duration;

use parquetquery::{CellValue, GroupPredicate, IntPredicate, IteratorResult};
use traceql::{Attribute, AttributeScope, Intrinsic, Span, Spanset, Static, Status};

use crate::schema;

/// Composite values passed upward between join levels.
#[derive(Debug)]
pub enum GroupValue {
    /// A resolved attribute value, keyed by attribute name.
    Static(Static),
    /// A span assembled by the span collector.
    Span(Box<Span>),
    /// A spanset assembled by the batch collector.
    Spanset(Box<Spanset>),
}

fn new_span_attr(name: &str) -> Attribute {
    Attribute::scoped(AttributeScope::Span, name)
}

fn new_resource_attr(name: &str) -> Attribute {
    Attribute::scoped(AttributeScope::Resource, name)
}

fn static_from_cell(value: &CellValue) -> Option<Static> {
    match value {
        CellValue::Bool(b) => Some(Static::Bool(*b)),
        CellValue::Int64(v) => Some(Static::Int(*v)),
        CellValue::Double(v) => Some(Static::Float(*v)),
        CellValue::Bytes(_) => Some(Static::String(
            value.as_str().unwrap_or_default().to_string(),
        )),
        CellValue::Null => None,
    }
}

/// Collapses one generic-attribute-table group into a single
/// `(key, typed value)` pair. Null value columns are skipped; a key with no
/// surviving typed value emits `(key, Nil)`, which is filtered downstream.
pub struct AttributeCollector;

impl GroupPredicate<GroupValue> for AttributeCollector {
    fn keep_group(&mut self, result: &mut IteratorResult<GroupValue>) -> bool {
        let mut key = String::new();
        let mut value = Static::Nil;

        for entry in &result.entries {
            // Ignore nulls. This leaves `value` as the found typed value,
            // or Nil if the key matched but no value column did.
            if entry.value.is_null() {
                continue;
            }
            match entry.key.as_ref() {
                "key" => key = entry.value.as_str().unwrap_or_default().to_string(),
                "string" => {
                    value = Static::String(entry.value.as_str().unwrap_or_default().to_string())
                }
                "int" => value = Static::Int(entry.value.as_i64().unwrap_or_default()),
                "float" => value = Static::Float(entry.value.as_f64().unwrap_or_default()),
                "bool" => value = Static::Bool(entry.value.as_bool().unwrap_or_default()),
                _ => {}
            }
        }

        result.entries.clear();
        result.other_entries.clear();
        result.append_other_value(key, GroupValue::Static(value));

        true
    }
}

/// Turns one span-level group into a [`Span`].
pub struct SpanCollector {
    /// Minimum number of non-nil attributes a span must carry to be kept.
    pub min_attributes: usize,
    /// Duration-intrinsic predicates, evaluated against end - start.
    pub duration_filters: Vec<Option<IntPredicate>>,
}

impl GroupPredicate<GroupValue> for SpanCollector {
    fn keep_group(&mut self, result: &mut IteratorResult<GroupValue>) -> bool {
        let mut span = Span::default();

        for (key, value) in result.other_entries.drain(..) {
            if let GroupValue::Static(s) = value {
                span.attributes.insert(new_span_attr(&key), s);
            }
        }

        // Merge the individual columns into the span.
        for entry in &result.entries {
            match entry.key.as_ref() {
                schema::span::ID => {
                    span.id = entry.value.as_bytes().unwrap_or_default().to_vec();
                }
                schema::span::START_UNIX_NANOS => {
                    span.start_time_unix_nanos = entry.value.as_u64().unwrap_or_default();
                }
                schema::span::END_UNIX_NANOS => {
                    span.end_time_unix_nanos = entry.value.as_u64().unwrap_or_default();
                }
                schema::span::NAME => {
                    span.attributes.insert(
                        Attribute::intrinsic(Intrinsic::Name),
                        Static::String(entry.value.as_str().unwrap_or_default().to_string()),
                    );
                }
                schema::span::STATUS_CODE => {
                    let status = Status::from_code(entry.value.as_i64().unwrap_or_default());
                    span.attributes.insert(
                        Attribute::intrinsic(Intrinsic::Status),
                        Static::Status(status),
                    );
                }
                // Span-level dedicated columns land here with their
                // attribute name as the key.
                _ => {
                    if let Some(s) = static_from_cell(&entry.value) {
                        span.attributes.insert(new_span_attr(&entry.key), s);
                    }
                }
            }
        }

        // The duration intrinsic is computed, not stored: attach it when at
        // least one filter passes (or a filter-less duration condition was
        // present).
        if !self.duration_filters.is_empty() {
            let duration = span
                .end_time_unix_nanos
                .saturating_sub(span.start_time_unix_nanos);
            for filter in &self.duration_filters {
                if filter.as_ref().map_or(true, |f| f.matches(&(duration as i64))) {
                    span.attributes.insert(
                        Attribute::intrinsic(Intrinsic::Duration),
                        Static::Duration(Duration::from_nanos(duration)),
                    );
                    break;
                }
            }
        }

        if self.min_attributes > 0 {
            let count = span.attributes.values().filter(|v| !v.is_nil()).count();
            if count < self.min_attributes {
                return false;
            }
        }

        result.entries.clear();
        result.append_other_value("span", GroupValue::Span(Box::new(span)));

        true
    }
}

/// Turns one resource-spans group into a [`Spanset`]: separates the spans
/// from resolved resource attributes, propagates the attributes onto the
/// spans, and filters spans that matched nothing.
pub struct BatchCollector {
    /// True whenever the query has at least one condition: spans must then
    /// carry at least one attribute to be returned.
    pub require_at_least_one_match_overall: bool,
    /// Minimum number of resource attributes the batch must resolve.
    pub min_attributes: usize,
}

impl GroupPredicate<GroupValue> for BatchCollector {
    fn keep_group(&mut self, result: &mut IteratorResult<GroupValue>) -> bool {
        let mut resource_attrs: HashMap<Attribute, Static> = HashMap::new();
        let mut spans: Vec<Span> = Vec::with_capacity(result.other_entries.len());

        for (key, value) in result.other_entries.drain(..) {
            match value {
                GroupValue::Span(span) => spans.push(*span),
                GroupValue::Static(s) => {
                    resource_attrs.insert(new_resource_attr(&key), s);
                }
                GroupValue::Spanset(_) => {}
            }
        }

        // Throw out batches without any spans.
        if spans.is_empty() {
            return false;
        }

        // Gather attributes from dedicated resource-level columns.
        for entry in &result.entries {
            match &entry.value {
                CellValue::Int64(v) => {
                    resource_attrs.insert(new_resource_attr(&entry.key), Static::Int(*v));
                }
                CellValue::Bytes(_) => {
                    resource_attrs.insert(
                        new_resource_attr(&entry.key),
                        Static::String(entry.value.as_str().unwrap_or_default().to_string()),
                    );
                }
                _ => {}
            }
        }

        if self.min_attributes > 0 && resource_attrs.len() < self.min_attributes {
            return false;
        }

        // Copy resource-level attributes onto the spans. Span-scoped
        // attributes shadow resource attributes of the same key.
        for (attr, value) in &resource_attrs {
            for span in &mut spans {
                if !span.attributes.contains_key(attr) {
                    span.attributes.insert(attr.clone(), value.clone());
                }
            }
        }

        // Remove attributes whose key matched but whose value did not.
        for span in &mut spans {
            span.attributes.retain(|_, v| !v.is_nil());
        }

        let kept: Vec<Span> = if self.require_at_least_one_match_overall {
            spans
                .into_iter()
                .filter(|s| !s.attributes.is_empty())
                .collect()
        } else {
            spans
        };

        if kept.is_empty() {
            return false;
        }

        let spanset = Spanset {
            spans: kept,
            ..Default::default()
        };

        result.entries.clear();
        result.append_other_value("spanset", GroupValue::Spanset(Box::new(spanset)));

        true
    }
}

/// Merges the batch spansets of one trace into the final [`Spanset`] and
/// stamps the trace-level identity columns onto it.
pub struct TraceCollector;

impl GroupPredicate<GroupValue> for TraceCollector {
    fn keep_group(&mut self, result: &mut IteratorResult<GroupValue>) -> bool {
        let mut spanset = Spanset::default();

        for entry in &result.entries {
            match entry.key.as_ref() {
                schema::trace::TRACE_ID => {
                    spanset.trace_id = entry.value.as_bytes().unwrap_or_default().to_vec();
                }
                schema::trace::START_TIME_UNIX_NANO => {
                    spanset.start_time_unix_nanos = entry.value.as_u64().unwrap_or_default();
                }
                schema::trace::DURATION_NANOS => {
                    spanset.duration_nanos = entry.value.as_u64().unwrap_or_default();
                }
                schema::trace::ROOT_SPAN_NAME => {
                    spanset.root_span_name =
                        entry.value.as_str().unwrap_or_default().to_string();
                }
                schema::trace::ROOT_SERVICE_NAME => {
                    spanset.root_service_name =
                        entry.value.as_str().unwrap_or_default().to_string();
                }
                _ => {}
            }
        }

        for (_, value) in result.other_entries.drain(..) {
            if let GroupValue::Spanset(batch) = value {
                spanset.spans.extend(batch.spans);
            }
        }

        result.entries.clear();
        result.append_other_value("spanset", GroupValue::Spanset(Box::new(spanset)));

        true
    }
}
