//! Synchronized group combinators
//!
//! All combinators advance a set of child iterators in lock-step on row
//! numbers truncated to a definition level. A *group* is the maximal run of
//! consecutive entries across children sharing that prefix:
//!
//! - [`JoinIterator`] emits a group only when every child produced at least
//!   one entry for it.
//! - [`LeftJoinIterator`] is driven by its required children; optional
//!   entries sharing the group prefix are attached when present.
//! - [`UnionIterator`] emits a group when any child produced an entry.
//!
//! Each can carry a [`GroupPredicate`] that filters or rewrites the
//! collected group before it is passed upward. Cancellation is checked
//! between group emissions.

use std::cmp::Ordering;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::iterator::{GroupIterator, GroupPredicate, IteratorResult};
use crate::row_number::RowNumber;

/// Child iterators with one-result lookahead.
struct Children<O> {
    iters: Vec<Box<dyn GroupIterator<O>>>,
    peeks: Vec<Option<IteratorResult<O>>>,
    exhausted: Vec<bool>,
}

impl<O> Children<O> {
    fn new(iters: Vec<Box<dyn GroupIterator<O>>>) -> Self {
        let n = iters.len();
        Self {
            iters,
            peeks: (0..n).map(|_| None).collect(),
            exhausted: vec![false; n],
        }
    }

    fn len(&self) -> usize {
        self.iters.len()
    }

    /// Current head of child `i`, pulling one result if needed.
    fn peek(&mut self, i: usize) -> Result<Option<&IteratorResult<O>>> {
        if self.peeks[i].is_none() && !self.exhausted[i] {
            match self.iters[i].next()? {
                Some(result) => self.peeks[i] = Some(result),
                None => self.exhausted[i] = true,
            }
        }
        Ok(self.peeks[i].as_ref())
    }

    /// Advances child `i` so its head is at or after `to` (compared at
    /// `definition_level`), and returns the head.
    fn seek(
        &mut self,
        i: usize,
        to: &RowNumber,
        definition_level: usize,
    ) -> Result<Option<&IteratorResult<O>>> {
        let peek_is_at_or_after = match &self.peeks[i] {
            Some(peek) => peek.row_number.compare(to, definition_level) != Ordering::Less,
            None => false,
        };
        if peek_is_at_or_after {
            return Ok(self.peeks[i].as_ref());
        }
        self.peeks[i] = None;
        if self.exhausted[i] {
            return Ok(None);
        }
        match self.iters[i].seek_to(to, definition_level)? {
            Some(result) => self.peeks[i] = Some(result),
            None => self.exhausted[i] = true,
        }
        Ok(self.peeks[i].as_ref())
    }

    /// Drains all results of child `i` belonging to the group at `target`
    /// into `into`.
    fn collect_at(
        &mut self,
        i: usize,
        target: &RowNumber,
        definition_level: usize,
        into: &mut IteratorResult<O>,
    ) -> Result<()> {
        loop {
            let in_group = match self.peek(i)? {
                Some(peek) => peek.row_number.compare(target, definition_level) == Ordering::Equal,
                None => false,
            };
            if !in_group {
                return Ok(());
            }
            let mut result = self.peeks[i].take().expect("peeked above");
            into.append(&mut result);
        }
    }
}

/// Emits a group only when every child produced at least one entry for it.
/// Any child finishing ends the stream.
pub struct JoinIterator<O> {
    cancel: CancellationToken,
    definition_level: usize,
    children: Children<O>,
    group_predicate: Option<Box<dyn GroupPredicate<O>>>,
    done: bool,
}

impl<O: 'static> JoinIterator<O> {
    pub fn new(
        cancel: CancellationToken,
        definition_level: usize,
        iters: Vec<Box<dyn GroupIterator<O>>>,
        group_predicate: Option<Box<dyn GroupPredicate<O>>>,
    ) -> Result<Self> {
        if iters.is_empty() {
            return Err(Error::Internal("join requires at least one iterator".into()));
        }
        Ok(Self {
            cancel,
            definition_level,
            children: Children::new(iters),
            group_predicate,
            done: false,
        })
    }
}

impl<O: Send + 'static> GroupIterator<O> for JoinIterator<O> {
    fn next(&mut self) -> Result<Option<IteratorResult<O>>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            // The join target is the highest group any child points at:
            // there can be no complete group before it.
            let mut target: Option<RowNumber> = None;
            for i in 0..self.children.len() {
                match self.children.peek(i)? {
                    None => {
                        self.done = true;
                        return Ok(None);
                    }
                    Some(result) => {
                        let t = result.row_number.truncate(self.definition_level);
                        target = Some(match target {
                            None => t,
                            Some(cur)
                                if t.compare(&cur, self.definition_level) == Ordering::Greater =>
                            {
                                t
                            }
                            Some(cur) => cur,
                        });
                    }
                }
            }
            let target = target.expect("at least one child");

            let mut aligned = true;
            for i in 0..self.children.len() {
                match self.children.seek(i, &target, self.definition_level)? {
                    None => {
                        self.done = true;
                        return Ok(None);
                    }
                    Some(result) => {
                        if result.row_number.compare(&target, self.definition_level)
                            != Ordering::Equal
                        {
                            aligned = false;
                        }
                    }
                }
            }
            if !aligned {
                continue;
            }

            let mut result = IteratorResult::new(target);
            for i in 0..self.children.len() {
                self.children
                    .collect_at(i, &target, self.definition_level, &mut result)?;
            }

            if let Some(pred) = &mut self.group_predicate {
                if !pred.keep_group(&mut result) {
                    continue;
                }
            }
            return Ok(Some(result));
        }
    }

    fn seek_to(
        &mut self,
        to: &RowNumber,
        definition_level: usize,
    ) -> Result<Option<IteratorResult<O>>> {
        if self.done {
            return Ok(None);
        }
        for i in 0..self.children.len() {
            if self.children.seek(i, to, definition_level)?.is_none() {
                self.done = true;
                return Ok(None);
            }
        }
        self.next()
    }
}

/// Driven by its required children; optional children contribute whatever
/// they have for the group. Optional-only groups are skipped.
pub struct LeftJoinIterator<O> {
    cancel: CancellationToken,
    definition_level: usize,
    required: Children<O>,
    optional: Children<O>,
    group_predicate: Option<Box<dyn GroupPredicate<O>>>,
    done: bool,
}

impl<O: 'static> LeftJoinIterator<O> {
    pub fn new(
        cancel: CancellationToken,
        definition_level: usize,
        required: Vec<Box<dyn GroupIterator<O>>>,
        optional: Vec<Box<dyn GroupIterator<O>>>,
        group_predicate: Option<Box<dyn GroupPredicate<O>>>,
    ) -> Result<Self> {
        if required.is_empty() {
            return Err(Error::Internal(
                "left join requires at least one required iterator".into(),
            ));
        }
        Ok(Self {
            cancel,
            definition_level,
            required: Children::new(required),
            optional: Children::new(optional),
            group_predicate,
            done: false,
        })
    }
}

impl<O: Send + 'static> GroupIterator<O> for LeftJoinIterator<O> {
    fn next(&mut self) -> Result<Option<IteratorResult<O>>> {
        if self.done {
            return Ok(None);
        }

        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let mut target: Option<RowNumber> = None;
            for i in 0..self.required.len() {
                match self.required.peek(i)? {
                    None => {
                        self.done = true;
                        return Ok(None);
                    }
                    Some(result) => {
                        let t = result.row_number.truncate(self.definition_level);
                        target = Some(match target {
                            None => t,
                            Some(cur)
                                if t.compare(&cur, self.definition_level) == Ordering::Greater =>
                            {
                                t
                            }
                            Some(cur) => cur,
                        });
                    }
                }
            }
            let target = target.expect("at least one required child");

            let mut aligned = true;
            for i in 0..self.required.len() {
                match self.required.seek(i, &target, self.definition_level)? {
                    None => {
                        self.done = true;
                        return Ok(None);
                    }
                    Some(result) => {
                        if result.row_number.compare(&target, self.definition_level)
                            != Ordering::Equal
                        {
                            aligned = false;
                        }
                    }
                }
            }
            if !aligned {
                continue;
            }

            let mut result = IteratorResult::new(target);
            for i in 0..self.required.len() {
                self.required
                    .collect_at(i, &target, self.definition_level, &mut result)?;
            }
            for i in 0..self.optional.len() {
                self.optional.seek(i, &target, self.definition_level)?;
                self.optional
                    .collect_at(i, &target, self.definition_level, &mut result)?;
            }

            if let Some(pred) = &mut self.group_predicate {
                if !pred.keep_group(&mut result) {
                    continue;
                }
            }
            return Ok(Some(result));
        }
    }

    fn seek_to(
        &mut self,
        to: &RowNumber,
        definition_level: usize,
    ) -> Result<Option<IteratorResult<O>>> {
        if self.done {
            return Ok(None);
        }
        for i in 0..self.required.len() {
            if self.required.seek(i, to, definition_level)?.is_none() {
                self.done = true;
                return Ok(None);
            }
        }
        self.next()
    }
}

/// Emits a group when any child produced an entry for it. Ends when every
/// child is exhausted.
pub struct UnionIterator<O> {
    cancel: CancellationToken,
    definition_level: usize,
    children: Children<O>,
    group_predicate: Option<Box<dyn GroupPredicate<O>>>,
}

impl<O: 'static> UnionIterator<O> {
    pub fn new(
        cancel: CancellationToken,
        definition_level: usize,
        iters: Vec<Box<dyn GroupIterator<O>>>,
        group_predicate: Option<Box<dyn GroupPredicate<O>>>,
    ) -> Self {
        Self {
            cancel,
            definition_level,
            children: Children::new(iters),
            group_predicate,
        }
    }
}

impl<O: Send + 'static> GroupIterator<O> for UnionIterator<O> {
    fn next(&mut self) -> Result<Option<IteratorResult<O>>> {
        loop {
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let mut lowest: Option<RowNumber> = None;
            for i in 0..self.children.len() {
                if let Some(result) = self.children.peek(i)? {
                    let t = result.row_number.truncate(self.definition_level);
                    lowest = Some(match lowest {
                        None => t,
                        Some(cur) if t.compare(&cur, self.definition_level) == Ordering::Less => t,
                        Some(cur) => cur,
                    });
                }
            }
            let target = match lowest {
                Some(t) => t,
                None => return Ok(None),
            };

            let mut result = IteratorResult::new(target);
            for i in 0..self.children.len() {
                self.children
                    .collect_at(i, &target, self.definition_level, &mut result)?;
            }

            if let Some(pred) = &mut self.group_predicate {
                if !pred.keep_group(&mut result) {
                    continue;
                }
            }
            return Ok(Some(result));
        }
    }

    fn seek_to(
        &mut self,
        to: &RowNumber,
        definition_level: usize,
    ) -> Result<Option<IteratorResult<O>>> {
        for i in 0..self.children.len() {
            self.children.seek(i, to, definition_level)?;
        }
        self.next()
    }
}
