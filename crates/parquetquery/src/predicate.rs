//! Value predicates pushed down into column scans
//!
//! A [`Predicate`] is consulted twice: once per column chunk with the
//! chunk's min/max statistics (`keep_page`), and once per decoded value
//! (`keep_value`). `keep_page` may return true conservatively; returning
//! false asserts that no value in the chunk can satisfy the predicate.
//!
//! "No predicate" is expressed as `Option::None` on the iterator, never as
//! a predicate instance; constructors here collapse accordingly (an `Or`
//! with an accept-all child is itself accept-all).

use bytes::Bytes;
use regex::Regex;

use crate::error::{Error, Result};
use crate::value::CellValue;

/// A pure filter over column values and chunk statistics.
///
/// Instances must not carry mutable state: the same predicate may be
/// consulted for statistics and values in any order, but never concurrently
/// within a single fetch.
pub trait Predicate: Send + Sync {
    /// May the chunk with the given min/max contain a matching value?
    fn keep_page(&self, min: &CellValue, max: &CellValue) -> bool;

    /// Does this value match?
    fn keep_value(&self, value: &CellValue) -> bool;
}

/// Boxed predicate, `None` meaning "accept everything".
pub type PredicateBox = Box<dyn Predicate>;

/// Accepts when every child accepts.
pub struct AndPredicate {
    preds: Vec<PredicateBox>,
}

impl AndPredicate {
    pub fn new(preds: Vec<PredicateBox>) -> Self {
        Self { preds }
    }
}

impl Predicate for AndPredicate {
    fn keep_page(&self, min: &CellValue, max: &CellValue) -> bool {
        self.preds.iter().all(|p| p.keep_page(min, max))
    }

    fn keep_value(&self, value: &CellValue) -> bool {
        self.preds.iter().all(|p| p.keep_value(value))
    }
}

/// Accepts when any child accepts.
pub struct OrPredicate {
    preds: Vec<PredicateBox>,
}

impl OrPredicate {
    pub fn new(preds: Vec<PredicateBox>) -> Self {
        Self { preds }
    }
}

impl Predicate for OrPredicate {
    fn keep_page(&self, min: &CellValue, max: &CellValue) -> bool {
        self.preds.iter().any(|p| p.keep_page(min, max))
    }

    fn keep_value(&self, value: &CellValue) -> bool {
        self.preds.iter().any(|p| p.keep_value(value))
    }
}

/// Combines per-condition predicates for one column. A `None` child means
/// that condition selects every value, which makes the whole disjunction
/// accept-all, expressed by returning `None`.
pub fn or_predicates(preds: Vec<Option<PredicateBox>>) -> Option<PredicateBox> {
    let mut flat = Vec::with_capacity(preds.len());
    for p in preds {
        match p {
            Some(p) => flat.push(p),
            None => return None,
        }
    }
    match flat.len() {
        0 => None,
        1 => Some(flat.into_iter().next().expect("len checked")),
        _ => Some(Box::new(OrPredicate::new(flat))),
    }
}

/// Exact membership in a string set; chunks are pruned by lexicographic
/// bound check.
pub struct StringInPredicate {
    values: Vec<Bytes>,
}

impl StringInPredicate {
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        Self {
            values: values
                .iter()
                .map(|s| Bytes::copy_from_slice(s.as_ref().as_bytes()))
                .collect(),
        }
    }
}

impl Predicate for StringInPredicate {
    fn keep_page(&self, min: &CellValue, max: &CellValue) -> bool {
        match (min.as_bytes(), max.as_bytes()) {
            (Some(min), Some(max)) => self
                .values
                .iter()
                .any(|v| min <= v.as_ref() && v.as_ref() <= max),
            // Statistics of an unexpected type: keep conservatively.
            _ => true,
        }
    }

    fn keep_value(&self, value: &CellValue) -> bool {
        match value.as_bytes() {
            Some(b) => self.values.iter().any(|v| v.as_ref() == b),
            None => false,
        }
    }
}

/// Matches any of a set of regular expressions, compiled once at plan time.
/// Statistics cannot prune a regex, so every chunk is kept.
pub struct RegexInPredicate {
    regexes: Vec<Regex>,
}

impl RegexInPredicate {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let regexes = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Internal(format!("invalid regex: {}", e)))?;
        Ok(Self { regexes })
    }
}

impl Predicate for RegexInPredicate {
    fn keep_page(&self, _min: &CellValue, _max: &CellValue) -> bool {
        true
    }

    fn keep_value(&self, value: &CellValue) -> bool {
        match value.as_str() {
            Some(s) => self.regexes.iter().any(|r| r.is_match(s)),
            None => false,
        }
    }
}

/// Matches one boolean value.
pub struct BoolPredicate {
    want: bool,
}

impl BoolPredicate {
    pub fn new(want: bool) -> Self {
        Self { want }
    }
}

impl Predicate for BoolPredicate {
    fn keep_page(&self, min: &CellValue, max: &CellValue) -> bool {
        match (min.as_bool(), max.as_bool()) {
            (Some(min), Some(max)) => min == self.want || max == self.want,
            _ => true,
        }
    }

    fn keep_value(&self, value: &CellValue) -> bool {
        value.as_bool() == Some(self.want)
    }
}

/// The fallback predicate: caller supplies the value test, the min/max
/// range test, and the decoder from raw column values.
pub struct GenericPredicate<T> {
    keep: Box<dyn Fn(&T) -> bool + Send + Sync>,
    range: Box<dyn Fn(&T, &T) -> bool + Send + Sync>,
    decode: Box<dyn Fn(&CellValue) -> Option<T> + Send + Sync>,
}

impl<T> GenericPredicate<T> {
    pub fn new(
        keep: impl Fn(&T) -> bool + Send + Sync + 'static,
        range: impl Fn(&T, &T) -> bool + Send + Sync + 'static,
        decode: impl Fn(&CellValue) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        Self {
            keep: Box::new(keep),
            range: Box::new(range),
            decode: Box::new(decode),
        }
    }

    /// Evaluates the value test directly on an already-decoded value. Used
    /// for filters applied after the scan, like computed span durations.
    pub fn matches(&self, value: &T) -> bool {
        (self.keep)(value)
    }
}

impl<T: Send + Sync> Predicate for GenericPredicate<T> {
    fn keep_page(&self, min: &CellValue, max: &CellValue) -> bool {
        match ((self.decode)(min), (self.decode)(max)) {
            (Some(min), Some(max)) => (self.range)(&min, &max),
            _ => true,
        }
    }

    fn keep_value(&self, value: &CellValue) -> bool {
        match (self.decode)(value) {
            Some(v) => (self.keep)(&v),
            None => false,
        }
    }
}

/// Predicate over int64 columns.
pub type IntPredicate = GenericPredicate<i64>;

/// Predicate over float64 columns.
pub type FloatPredicate = GenericPredicate<f64>;

pub fn new_int_predicate(
    keep: impl Fn(&i64) -> bool + Send + Sync + 'static,
    range: impl Fn(&i64, &i64) -> bool + Send + Sync + 'static,
) -> IntPredicate {
    GenericPredicate::new(keep, range, |v| v.as_i64())
}

pub fn new_float_predicate(
    keep: impl Fn(&f64) -> bool + Send + Sync + 'static,
    range: impl Fn(&f64, &f64) -> bool + Send + Sync + 'static,
) -> FloatPredicate {
    GenericPredicate::new(keep, range, |v| v.as_f64())
}

/// Keeps values in the closed range `[min, max]`.
pub fn new_int_between_predicate(min: i64, max: i64) -> IntPredicate {
    new_int_predicate(
        move |v| min <= *v && *v <= max,
        move |page_min, page_max| *page_min <= max && min <= *page_max,
    )
}
