//! Combinator semantics over synthetic iterators

use std::cmp::Ordering;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use parquetquery::{
    CellValue, Entry, Error, GroupIterator, GroupPredicate, IteratorResult, JoinIterator,
    LeftJoinIterator, Result, RowNumber, UnionIterator,
};

/// An iterator over a fixed list of results, for driving the combinators
/// without a file.
struct TestIterator {
    results: Vec<IteratorResult<String>>,
    pos: usize,
}

impl TestIterator {
    /// One single-entry result per (row number, key, value).
    fn new(rows: Vec<(RowNumber, &str, i64)>) -> Self {
        let results = rows
            .into_iter()
            .map(|(rn, key, value)| {
                let mut res = IteratorResult::new(rn);
                res.entries.push(Entry {
                    key: Arc::from(key),
                    value: CellValue::Int64(value),
                    repetition_level: 0,
                    definition_level: 0,
                });
                res
            })
            .collect();
        Self { results, pos: 0 }
    }
}

impl GroupIterator<String> for TestIterator {
    fn next(&mut self) -> Result<Option<IteratorResult<String>>> {
        if self.pos >= self.results.len() {
            return Ok(None);
        }
        let res = &self.results[self.pos];
        let mut out = IteratorResult::new(res.row_number);
        out.entries = res.entries.clone();
        self.pos += 1;
        Ok(Some(out))
    }

    fn seek_to(
        &mut self,
        to: &RowNumber,
        definition_level: usize,
    ) -> Result<Option<IteratorResult<String>>> {
        while self.pos < self.results.len()
            && self.results[self.pos]
                .row_number
                .compare(to, definition_level)
                == Ordering::Less
        {
            self.pos += 1;
        }
        self.next()
    }
}

fn row(r: i64) -> RowNumber {
    RowNumber::from([r, -1, -1, -1, -1, -1])
}

fn nested(r: i64, sub: i64) -> RowNumber {
    RowNumber::from([r, sub, -1, -1, -1, -1])
}

fn boxed(rows: Vec<(RowNumber, &str, i64)>) -> Box<dyn GroupIterator<String>> {
    Box::new(TestIterator::new(rows))
}

fn drain(iter: &mut dyn GroupIterator<String>) -> Vec<IteratorResult<String>> {
    let mut out = Vec::new();
    while let Some(res) = iter.next().unwrap() {
        out.push(res);
    }
    out
}

#[test]
fn test_join_requires_all_children() {
    let a = boxed(vec![(row(0), "a", 1), (row(2), "a", 2), (row(3), "a", 3)]);
    let b = boxed(vec![(row(0), "b", 10), (row(3), "b", 30), (row(4), "b", 40)]);

    let mut join = JoinIterator::new(CancellationToken::new(), 0, vec![a, b], None).unwrap();
    let results = drain(&mut join);

    let rows: Vec<i64> = results.iter().map(|r| r.row_number.row()).collect();
    assert_eq!(rows, vec![0, 3]);
    // Entries from both children are merged per group.
    assert_eq!(results[0].entries.len(), 2);
}

#[test]
fn test_join_ends_when_any_child_ends() {
    let a = boxed(vec![(row(0), "a", 1), (row(1), "a", 2)]);
    let b = boxed(vec![(row(0), "b", 1)]);

    let mut join = JoinIterator::new(CancellationToken::new(), 0, vec![a, b], None).unwrap();
    let results = drain(&mut join);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].row_number.row(), 0);
}

#[test]
fn test_join_groups_multiple_entries() {
    // Child entries at a deeper level group together under level 0.
    let a = boxed(vec![
        (nested(0, 0), "a", 1),
        (nested(0, 1), "a", 2),
        (nested(1, 0), "a", 3),
    ]);
    let b = boxed(vec![(row(0), "b", 10), (row(1), "b", 20)]);

    let mut join = JoinIterator::new(CancellationToken::new(), 0, vec![a, b], None).unwrap();
    let results = drain(&mut join);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].entries.len(), 3);
    assert_eq!(results[1].entries.len(), 2);
}

#[test]
fn test_left_join_optional_attachment() {
    let required = boxed(vec![(row(0), "req", 1), (row(1), "req", 2), (row(3), "req", 3)]);
    // Optional present for rows 1 and 2: row 2 is optional-only and skipped.
    let optional = boxed(vec![(row(1), "opt", 10), (row(2), "opt", 20)]);

    let mut join = LeftJoinIterator::new(
        CancellationToken::new(),
        0,
        vec![required],
        vec![optional],
        None,
    )
    .unwrap();
    let results = drain(&mut join);

    let rows: Vec<i64> = results.iter().map(|r| r.row_number.row()).collect();
    assert_eq!(rows, vec![0, 1, 3]);
    assert_eq!(results[0].entries.len(), 1);
    assert_eq!(results[1].entries.len(), 2);
    assert_eq!(results[2].entries.len(), 1);
}

#[test]
fn test_left_join_requires_required() {
    let empty: Vec<Box<dyn GroupIterator<String>>> = Vec::new();
    let err = LeftJoinIterator::new(
        CancellationToken::new(),
        0,
        empty,
        vec![boxed(vec![(row(0), "opt", 1)])],
        None,
    );
    assert!(err.is_err());
}

#[test]
fn test_union_emits_any_child() {
    let a = boxed(vec![(row(0), "a", 1), (row(2), "a", 2)]);
    let b = boxed(vec![(row(1), "b", 10), (row(2), "b", 20)]);

    let mut union = UnionIterator::new(CancellationToken::new(), 0, vec![a, b], None);
    let results = drain(&mut union);

    let rows: Vec<i64> = results.iter().map(|r| r.row_number.row()).collect();
    assert_eq!(rows, vec![0, 1, 2]);
    // Row 2 exists in both children and is emitted once with both entries.
    assert_eq!(results[2].entries.len(), 2);
}

struct RewritingCollector;

impl GroupPredicate<String> for RewritingCollector {
    fn keep_group(&mut self, result: &mut IteratorResult<String>) -> bool {
        // Reject groups whose entry sum is odd; rewrite the rest into the
        // side channel.
        let total: i64 = result.entries.iter().filter_map(|e| e.value.as_i64()).sum();
        if total % 2 != 0 {
            return false;
        }
        result.entries.clear();
        result.append_other_value("sum", total.to_string());
        true
    }
}

#[test]
fn test_group_predicate_filters_and_rewrites() {
    let a = boxed(vec![(row(0), "a", 1), (row(1), "a", 2), (row(2), "a", 4)]);

    let mut join = JoinIterator::new(
        CancellationToken::new(),
        0,
        vec![a],
        Some(Box::new(RewritingCollector)),
    )
    .unwrap();
    let results = drain(&mut join);

    assert_eq!(results.len(), 2);
    for res in &results {
        assert!(res.entries.is_empty());
        assert_eq!(res.other_entries.len(), 1);
        assert_eq!(res.other_entries[0].0.as_ref(), "sum");
    }
    assert_eq!(results[0].other_entries[0].1, "2");
    assert_eq!(results[1].other_entries[0].1, "4");
}

#[test]
fn test_cancellation_between_groups() {
    let cancel = CancellationToken::new();
    let a = boxed(vec![(row(0), "a", 1), (row(1), "a", 2)]);
    let mut join = JoinIterator::new(cancel.clone(), 0, vec![a], None).unwrap();

    assert!(join.next().unwrap().is_some());
    cancel.cancel();
    assert!(matches!(join.next(), Err(Error::Cancelled)));
    // Cancellation is sticky.
    assert!(matches!(join.next(), Err(Error::Cancelled)));
}

#[test]
fn test_seek_to_skips_ahead() {
    let a = boxed(vec![(row(0), "a", 1), (row(5), "a", 2), (row(9), "a", 3)]);
    let mut join = JoinIterator::new(CancellationToken::new(), 0, vec![a], None).unwrap();

    let res = join.seek_to(&row(4), 0).unwrap().unwrap();
    assert_eq!(res.row_number.row(), 5);
    let res = join.next().unwrap().unwrap();
    assert_eq!(res.row_number.row(), 9);
}
