//! Query planning: building the three-level iterator tree
//!
//! Conditions are pushed down to matching columns as predicates and the
//! columns are iterated together, collecting results at each level into
//! attributes, spans, and spansets:
//!
//! - span-level columns and the span attribute table join at the span
//!   definition level into a `SpanCollector`
//! - resource-level columns, the resource attribute table, and the span
//!   iterator join at the resource-spans level into a `BatchCollector`
//! - trace identity columns and the resource iterator join at the trace
//!   level into a `TraceCollector`, yielding one spanset per trace

use std::collections::HashMap;
use std::fs::File;
use std::sync::Arc;

use parquet::file::metadata::ParquetMetaData;
use parquetquery::{
    or_predicates, ColumnIterator, GroupIterator, IntPredicate, JoinIterator, LeftJoinIterator,
    PredicateBox, StringInPredicate, UnionIterator,
};
use storage::CountingReader;
use tokio_util::sync::CancellationToken;
use traceql::{
    AttributeScope, Condition, Error, FetchSpansRequest, Intrinsic, Operator, Result,
};

use crate::collectors::{
    AttributeCollector, BatchCollector, GroupValue, SpanCollector, TraceCollector,
};
use crate::predicate::{
    create_int_predicate, create_predicate, create_status_predicate, create_string_predicate,
    operand_type,
};
use crate::schema;
use crate::to_fetch_error;
use crate::wellknown::ColumnMapping;

pub(crate) type PqIter = Box<dyn GroupIterator<GroupValue>>;

/// Constructs column iterators over one opened block, abstracting away the
/// reader, metadata, and row-group selection.
pub(crate) struct IterFactory {
    pub cancel: CancellationToken,
    pub reader: Arc<CountingReader<File>>,
    pub metadata: Arc<ParquetMetaData>,
    pub row_groups: Vec<usize>,
}

impl IterFactory {
    fn make_iter(
        &self,
        column_path: &str,
        predicate: Option<PredicateBox>,
        select_as: &str,
    ) -> Result<PqIter> {
        let iter = ColumnIterator::new(
            self.cancel.clone(),
            Arc::clone(&self.reader),
            Arc::clone(&self.metadata),
            self.row_groups.clone(),
            column_path,
            predicate,
            select_as,
        )
        .map_err(to_fetch_error)?;
        Ok(Box::new(iter))
    }
}

/// The effective scope of a condition: unscoped intrinsics plan at span
/// level, everything else keeps its declared scope.
fn effective_scope(cond: &Condition) -> AttributeScope {
    match (cond.attribute.scope, cond.attribute.intrinsic) {
        (AttributeScope::None, Some(_)) => AttributeScope::Span,
        (scope, _) => scope,
    }
}

/// Builds the full iterator tree for one request.
pub(crate) fn create_fetch_iterator(
    factory: &IterFactory,
    mapping: &ColumnMapping,
    req: &FetchSpansRequest,
) -> Result<PqIter> {
    // Categorize conditions into span-level or resource-level. Unscoped
    // conditions are mingled: they go to both plans and disable the
    // all-conditions fast path, since either level can satisfy them.
    let mut mingled_conditions = false;
    let mut span_conditions = Vec::new();
    let mut resource_conditions = Vec::new();

    for cond in &req.conditions {
        match effective_scope(cond) {
            AttributeScope::None => {
                mingled_conditions = true;
                span_conditions.push(cond.clone());
                resource_conditions.push(cond.clone());
            }
            AttributeScope::Span => span_conditions.push(cond.clone()),
            AttributeScope::Resource => resource_conditions.push(cond.clone()),
        }
    }

    // Span-filtering behavior changes depending on the resource filtering
    // in effect, and vice versa: { span.a=1 } must return only matching
    // spans, but { span.a=1 || resource.b=2 } must surface every span of a
    // batch that matched on the resource side.
    let span_require_at_least_one_match =
        !span_conditions.is_empty() && resource_conditions.is_empty();
    let batch_require_at_least_one_match =
        span_conditions.is_empty() && !resource_conditions.is_empty();
    let batch_require_at_least_one_match_overall = !req.conditions.is_empty();
    let all_conditions = req.all_conditions && !mingled_conditions;

    let span_iter = create_span_iterator(
        factory,
        mapping,
        &span_conditions,
        req.start_time_unix_nanos,
        req.end_time_unix_nanos,
        span_require_at_least_one_match,
        all_conditions,
    )?;

    let resource_iter = create_resource_iterator(
        factory,
        mapping,
        span_iter,
        &resource_conditions,
        batch_require_at_least_one_match,
        batch_require_at_least_one_match_overall,
        all_conditions,
    )?;

    create_trace_iterator(factory, resource_iter)
}

fn distinct_condition_names(conditions: &[Condition]) -> usize {
    let mut names: Vec<&str> = conditions.iter().map(|c| c.attribute.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    names.len()
}

/// Creates a column iterator per span-level condition, returning the
/// iterators plus the deferred duration predicates.
fn create_span_column_iterators(
    factory: &IterFactory,
    mapping: &ColumnMapping,
    conditions: &[Condition],
) -> Result<(Vec<PqIter>, Vec<Option<IntPredicate>>)> {
    let mut column_select_as: HashMap<String, String> = HashMap::new();
    let mut column_predicates: HashMap<String, Vec<Option<PredicateBox>>> = HashMap::new();
    let mut iters: Vec<PqIter> = Vec::new();
    let mut generic_conditions: Vec<&Condition> = Vec::new();
    let mut duration_predicates: Vec<Option<IntPredicate>> = Vec::new();

    for cond in conditions {
        // Intrinsic?
        match cond.attribute.intrinsic {
            Some(Intrinsic::Name) => {
                let pred = create_string_predicate(cond.op, &cond.operands)?;
                column_predicates
                    .entry(schema::span::NAME.to_string())
                    .or_default()
                    .push(pred);
                column_select_as.insert(
                    schema::span::NAME.to_string(),
                    schema::span::NAME.to_string(),
                );
                continue;
            }
            Some(Intrinsic::Duration) => {
                duration_predicates.push(create_int_predicate(cond.op, &cond.operands)?);
                continue;
            }
            Some(Intrinsic::Status) => {
                let pred = create_status_predicate(cond.op, &cond.operands)?;
                column_predicates
                    .entry(schema::span::STATUS_CODE.to_string())
                    .or_default()
                    .push(pred.map(|p| Box::new(p) as PredicateBox));
                column_select_as.insert(
                    schema::span::STATUS_CODE.to_string(),
                    schema::span::STATUS_CODE.to_string(),
                );
                continue;
            }
            None => {}
        }

        // Well-known attribute with a dedicated span-level column?
        if let Some(entry) = mapping.lookup(&cond.attribute.name) {
            if entry.scope != AttributeScope::Resource {
                if cond.op == Operator::None {
                    column_predicates
                        .entry(entry.column_path.clone())
                        .or_default()
                        .push(None);
                    column_select_as
                        .insert(entry.column_path.clone(), cond.attribute.name.clone());
                    continue;
                }
                if entry.static_type == operand_type(&cond.operands) {
                    let pred = create_predicate(cond.op, &cond.operands)?;
                    column_predicates
                        .entry(entry.column_path.clone())
                        .or_default()
                        .push(pred);
                    column_select_as
                        .insert(entry.column_path.clone(), cond.attribute.name.clone());
                    continue;
                }
            }
        }

        // Else: generic attribute lookup.
        generic_conditions.push(cond);
    }

    let attr_iter = create_attribute_iterator(
        factory,
        &generic_conditions,
        schema::DEFINITION_LEVEL_RESOURCE_SPANS_ILS_SPAN_ATTRS,
        schema::span::ATTR_KEY,
        schema::span::ATTR_STRING,
        schema::span::ATTR_INT,
        schema::span::ATTR_DOUBLE,
        schema::span::ATTR_BOOL,
    )?;
    if let Some(attr_iter) = attr_iter {
        iters.push(attr_iter);
    }

    for (column_path, predicates) in column_predicates {
        let select_as = column_select_as
            .get(&column_path)
            .cloned()
            .unwrap_or_else(|| column_path.clone());
        iters.push(factory.make_iter(&column_path, or_predicates(predicates), &select_as)?);
    }

    Ok((iters, duration_predicates))
}

/// Iterates through all span-level columns and groups them into rows
/// representing one span each.
fn create_span_iterator(
    factory: &IterFactory,
    mapping: &ColumnMapping,
    conditions: &[Condition],
    start: u64,
    end: u64,
    require_at_least_one_match: bool,
    all_conditions: bool,
) -> Result<PqIter> {
    let (mut iters, duration_predicates) =
        create_span_column_iterators(factory, mapping, conditions)?;

    // Time range filtering: a span overlaps the window when
    // span start <= req.end && span end >= req.start.
    let mut start_filter: Option<PredicateBox> = None;
    let mut end_filter: Option<PredicateBox> = None;
    if start > 0 && end > 0 {
        start_filter = Some(Box::new(parquetquery::new_int_between_predicate(
            0,
            end as i64,
        )));
        end_filter = Some(Box::new(parquetquery::new_int_between_predicate(
            start as i64,
            i64::MAX,
        )));
    }

    let mut min_count = 0;
    if require_at_least_one_match {
        min_count = 1;
    }
    if all_conditions {
        // The final number of expected attributes.
        min_count = distinct_condition_names(conditions);
    }
    let span_collector = SpanCollector {
        min_attributes: min_count,
        duration_filters: duration_predicates,
    };
    let has_duration_filters = !span_collector.duration_filters.is_empty();

    let mut required: Vec<PqIter> = Vec::new();

    // When every span condition must be met, all condition iterators become
    // required.
    if all_conditions {
        required.append(&mut iters);
    }

    // When any one span condition suffices and nothing else gates the span,
    // wrap the condition iterators in a union and require that. Not
    // possible with duration filters, which are computed from start/end
    // after the scan.
    if require_at_least_one_match && !iters.is_empty() && !has_duration_filters {
        required.push(Box::new(UnionIterator::new(
            factory.cancel.clone(),
            schema::DEFINITION_LEVEL_RESOURCE_SPANS_ILS_SPAN,
            std::mem::take(&mut iters),
            None,
        )));
    }

    // Static columns that are always loaded. They are last so they are only
    // read once the condition iterators have matched.
    required.push(factory.make_iter(
        schema::span::START_UNIX_NANOS,
        start_filter,
        schema::span::START_UNIX_NANOS,
    )?);
    required.push(factory.make_iter(
        schema::span::END_UNIX_NANOS,
        end_filter,
        schema::span::END_UNIX_NANOS,
    )?);
    required.push(factory.make_iter(schema::span::ID, None, schema::span::ID)?);

    // Left join: id/start/end are required, remaining conditions are
    // optional; whatever matches is attached to the span.
    let join = LeftJoinIterator::new(
        factory.cancel.clone(),
        schema::DEFINITION_LEVEL_RESOURCE_SPANS_ILS_SPAN,
        required,
        iters,
        Some(Box::new(span_collector)),
    )
    .map_err(to_fetch_error)?;
    Ok(Box::new(join))
}

/// Creates a column iterator per resource-level condition.
fn create_resource_column_iterators(
    factory: &IterFactory,
    mapping: &ColumnMapping,
    conditions: &[Condition],
) -> Result<Vec<PqIter>> {
    let mut column_select_as: HashMap<String, String> = HashMap::new();
    let mut column_predicates: HashMap<String, Vec<Option<PredicateBox>>> = HashMap::new();
    let mut iters: Vec<PqIter> = Vec::new();
    let mut generic_conditions: Vec<&Condition> = Vec::new();

    for cond in conditions {
        // Well-known attribute with a dedicated resource-level column?
        if let Some(entry) = mapping.lookup(&cond.attribute.name) {
            if entry.scope != AttributeScope::Span {
                if cond.op == Operator::None {
                    column_predicates
                        .entry(entry.column_path.clone())
                        .or_default()
                        .push(None);
                    column_select_as
                        .insert(entry.column_path.clone(), cond.attribute.name.clone());
                    continue;
                }
                if entry.static_type == operand_type(&cond.operands) {
                    let pred = create_predicate(cond.op, &cond.operands)?;
                    column_predicates
                        .entry(entry.column_path.clone())
                        .or_default()
                        .push(pred);
                    column_select_as
                        .insert(entry.column_path.clone(), cond.attribute.name.clone());
                    continue;
                }
            }
        }

        // Else: generic attribute lookup.
        generic_conditions.push(cond);
    }

    let attr_iter = create_attribute_iterator(
        factory,
        &generic_conditions,
        schema::DEFINITION_LEVEL_RESOURCE_ATTRS,
        schema::resource::ATTR_KEY,
        schema::resource::ATTR_STRING,
        schema::resource::ATTR_INT,
        schema::resource::ATTR_DOUBLE,
        schema::resource::ATTR_BOOL,
    )?;
    if let Some(attr_iter) = attr_iter {
        iters.push(attr_iter);
    }

    for (column_path, predicates) in column_predicates {
        let select_as = column_select_as
            .get(&column_path)
            .cloned()
            .unwrap_or_else(|| column_path.clone());
        iters.push(factory.make_iter(&column_path, or_predicates(predicates), &select_as)?);
    }

    Ok(iters)
}

/// Iterates through resource-spans-level columns, grouping them into rows
/// representing one batch each, with the span iterator plugged in as a
/// required child so a batch is only considered once spans matched in it.
#[allow(clippy::too_many_arguments)]
fn create_resource_iterator(
    factory: &IterFactory,
    mapping: &ColumnMapping,
    span_iterator: PqIter,
    conditions: &[Condition],
    require_at_least_one_match: bool,
    require_at_least_one_match_overall: bool,
    all_conditions: bool,
) -> Result<PqIter> {
    let mut column_iters = create_resource_column_iterators(factory, mapping, conditions)?;

    let mut min_count = 0;
    if require_at_least_one_match {
        min_count = 1;
    }
    if all_conditions {
        min_count = distinct_condition_names(conditions);
    }
    let batch_collector = BatchCollector {
        require_at_least_one_match_overall,
        min_attributes: min_count,
    };

    let mut required: Vec<PqIter> = Vec::new();

    if all_conditions {
        required.append(&mut column_iters);
    }

    if require_at_least_one_match && !column_iters.is_empty() {
        required.push(Box::new(UnionIterator::new(
            factory.cancel.clone(),
            schema::DEFINITION_LEVEL_RESOURCE_SPANS,
            std::mem::take(&mut column_iters),
            None,
        )));
    }

    // The span iterator is last, so it is only read when the resource
    // conditions are met.
    required.push(span_iterator);

    let join = LeftJoinIterator::new(
        factory.cancel.clone(),
        schema::DEFINITION_LEVEL_RESOURCE_SPANS,
        required,
        column_iters,
        Some(Box::new(batch_collector)),
    )
    .map_err(to_fetch_error)?;
    Ok(Box::new(join))
}

/// The final join: matching resources are required, trace identity columns
/// are stamped onto the merged spanset.
fn create_trace_iterator(factory: &IterFactory, resource_iter: PqIter) -> Result<PqIter> {
    let iters: Vec<PqIter> = vec![
        resource_iter,
        factory.make_iter(schema::trace::TRACE_ID, None, schema::trace::TRACE_ID)?,
        factory.make_iter(
            schema::trace::START_TIME_UNIX_NANO,
            None,
            schema::trace::START_TIME_UNIX_NANO,
        )?,
        factory.make_iter(
            schema::trace::DURATION_NANOS,
            None,
            schema::trace::DURATION_NANOS,
        )?,
        factory.make_iter(
            schema::trace::ROOT_SPAN_NAME,
            None,
            schema::trace::ROOT_SPAN_NAME,
        )?,
        factory.make_iter(
            schema::trace::ROOT_SERVICE_NAME,
            None,
            schema::trace::ROOT_SERVICE_NAME,
        )?,
    ];

    let join = JoinIterator::new(
        factory.cancel.clone(),
        schema::DEFINITION_LEVEL_TRACE,
        iters,
        Some(Box::new(TraceCollector)),
    )
    .map_err(to_fetch_error)?;
    Ok(Box::new(join))
}

/// Builds the sub-plan for conditions that fall through to the generic
/// attribute table: one shared key iterator filtered to the queried names,
/// one value iterator per typed column that any condition touches, and a
/// left join collapsing each group to a `(key, value)` pair.
#[allow(clippy::too_many_arguments)]
fn create_attribute_iterator(
    factory: &IterFactory,
    conditions: &[&Condition],
    definition_level: usize,
    key_path: &str,
    string_path: &str,
    int_path: &str,
    float_path: &str,
    bool_path: &str,
) -> Result<Option<PqIter>> {
    let mut attr_keys: Vec<String> = Vec::new();
    let mut string_preds: Vec<Option<PredicateBox>> = Vec::new();
    let mut int_preds: Vec<Option<PredicateBox>> = Vec::new();
    let mut float_preds: Vec<Option<PredicateBox>> = Vec::new();
    let mut bool_preds: Vec<Option<PredicateBox>> = Vec::new();

    for cond in conditions {
        attr_keys.push(cond.attribute.name.clone());

        if cond.op == Operator::None {
            // We have to scan all values; the type is unknown.
            string_preds.push(None);
            int_preds.push(None);
            float_preds.push(None);
            bool_preds.push(None);
            continue;
        }

        match operand_type(&cond.operands) {
            traceql::StaticType::String => {
                string_preds.push(create_string_predicate(cond.op, &cond.operands)?);
            }
            traceql::StaticType::Int => {
                int_preds.push(
                    create_int_predicate(cond.op, &cond.operands)?
                        .map(|p| Box::new(p) as PredicateBox),
                );
            }
            traceql::StaticType::Float => {
                float_preds.push(crate::predicate::create_float_predicate(
                    cond.op,
                    &cond.operands,
                )?);
            }
            traceql::StaticType::Boolean => {
                bool_preds.push(crate::predicate::create_bool_predicate(
                    cond.op,
                    &cond.operands,
                )?);
            }
            other => {
                return Err(Error::Validation(format!(
                    "attribute conditions cannot have operands of type {}",
                    other
                )))
            }
        }
    }

    let mut value_iters: Vec<PqIter> = Vec::new();
    if !string_preds.is_empty() {
        value_iters.push(factory.make_iter(string_path, or_predicates(string_preds), "string")?);
    }
    if !int_preds.is_empty() {
        value_iters.push(factory.make_iter(int_path, or_predicates(int_preds), "int")?);
    }
    if !float_preds.is_empty() {
        value_iters.push(factory.make_iter(float_path, or_predicates(float_preds), "float")?);
    }
    if !bool_preds.is_empty() {
        value_iters.push(factory.make_iter(bool_path, or_predicates(bool_preds), "bool")?);
    }

    if value_iters.is_empty() {
        return Ok(None);
    }

    // Left join: only rows whose key is one we want, bringing in whichever
    // typed values are present.
    let key_iter = factory.make_iter(
        key_path,
        Some(Box::new(StringInPredicate::new(&attr_keys))),
        "key",
    )?;
    let join = LeftJoinIterator::new(
        factory.cancel.clone(),
        definition_level,
        vec![key_iter],
        value_iters,
        Some(Box::new(AttributeCollector)),
    )
    .map_err(to_fetch_error)?;
    Ok(Some(Box::new(join)))
}
