//! Column iterators and the synchronized-iterator contract
//!
//! A [`ColumnIterator`] scans one leaf column of a Parquet file in row
//! order, yielding one entry per leaf position together with its
//! [`RowNumber`]. Chunk statistics are checked against the predicate before
//! any page of the chunk is decoded; values are checked individually after
//! decoding. Combinators in [`crate::join`] synchronize several iterators
//! on row numbers truncated to a definition level.

use std::cmp::Ordering;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use parquet::column::reader::{get_column_reader, ColumnReader};
use parquet::file::metadata::ParquetMetaData;
use parquet::file::reader::ChunkReader;
use parquet::file::serialized_reader::SerializedPageReader;
use parquet::file::statistics::Statistics;
use parquet::schema::types::ColumnDescPtr;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::predicate::Predicate;
use crate::row_number::RowNumber;
use crate::value::CellValue;

const READ_BATCH_SIZE: usize = 1024;

/// One (column, value) pair produced for a leaf position.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The name this column was selected as.
    pub key: Arc<str>,
    pub value: CellValue,
    pub repetition_level: i16,
    pub definition_level: i16,
}

/// A group of entries sharing a row-number prefix.
///
/// `other_entries` is the side channel collectors use to pass composite
/// values (spans, spansets, resolved attributes) upward; its payload type
/// is chosen by the caller so no downcasting is involved.
#[derive(Debug)]
pub struct IteratorResult<O> {
    pub row_number: RowNumber,
    pub entries: Vec<Entry>,
    pub other_entries: Vec<(Arc<str>, O)>,
}

impl<O> IteratorResult<O> {
    pub fn new(row_number: RowNumber) -> Self {
        Self {
            row_number,
            entries: Vec::new(),
            other_entries: Vec::new(),
        }
    }

    /// Moves all entries of `other` into this result.
    pub fn append(&mut self, other: &mut IteratorResult<O>) {
        self.entries.append(&mut other.entries);
        self.other_entries.append(&mut other.other_entries);
    }

    pub fn append_other_value(&mut self, key: impl Into<Arc<str>>, value: O) {
        self.other_entries.push((key.into(), value));
    }
}

/// A row-ordered stream of [`IteratorResult`]s that supports seeking.
///
/// `seek_to` returns the first result at or after `to` when compared up to
/// `definition_level`, consuming everything before it.
pub trait GroupIterator<O>: Send {
    fn next(&mut self) -> Result<Option<IteratorResult<O>>>;

    fn seek_to(
        &mut self,
        to: &RowNumber,
        definition_level: usize,
    ) -> Result<Option<IteratorResult<O>>>;
}

/// Inspects a completed group and decides whether to keep it. May rewrite
/// the result's entries, typically collapsing them into one value pushed
/// onto `other_entries`.
pub trait GroupPredicate<O>: Send {
    fn keep_group(&mut self, result: &mut IteratorResult<O>) -> bool;
}

/// Converts chunk statistics into min/max cell values; `None` when the
/// statistics are absent or of a physical type the engine does not prune.
fn statistics_min_max(stats: &Statistics) -> Option<(CellValue, CellValue)> {
    match stats {
        Statistics::Boolean(s) => match (s.min_opt(), s.max_opt()) {
            (Some(min), Some(max)) => Some((CellValue::Bool(*min), CellValue::Bool(*max))),
            _ => None,
        },
        Statistics::Int32(s) => match (s.min_opt(), s.max_opt()) {
            (Some(min), Some(max)) => {
                Some((CellValue::Int64(*min as i64), CellValue::Int64(*max as i64)))
            }
            _ => None,
        },
        Statistics::Int64(s) => match (s.min_opt(), s.max_opt()) {
            (Some(min), Some(max)) => Some((CellValue::Int64(*min), CellValue::Int64(*max))),
            _ => None,
        },
        Statistics::Float(s) => match (s.min_opt(), s.max_opt()) {
            (Some(min), Some(max)) => {
                Some((CellValue::Double(*min as f64), CellValue::Double(*max as f64)))
            }
            _ => None,
        },
        Statistics::Double(s) => match (s.min_opt(), s.max_opt()) {
            (Some(min), Some(max)) => Some((CellValue::Double(*min), CellValue::Double(*max))),
            _ => None,
        },
        Statistics::ByteArray(s) => match (s.min_opt(), s.max_opt()) {
            (Some(min), Some(max)) => Some((
                CellValue::Bytes(Bytes::copy_from_slice(min.data())),
                CellValue::Bytes(Bytes::copy_from_slice(max.data())),
            )),
            _ => None,
        },
        Statistics::FixedLenByteArray(s) => match (s.min_opt(), s.max_opt()) {
            (Some(min), Some(max)) => Some((
                CellValue::Bytes(Bytes::copy_from_slice(min.data())),
                CellValue::Bytes(Bytes::copy_from_slice(max.data())),
            )),
            _ => None,
        },
        Statistics::Int96(_) => None,
    }
}

/// Forward iterator over one leaf column.
///
/// Fresh iterators are constructed per fetch; there is no rewind. The
/// cancellation token is checked on every `next`.
pub struct ColumnIterator<R: ChunkReader + 'static, O> {
    cancel: CancellationToken,
    reader: Arc<R>,
    metadata: Arc<ParquetMetaData>,
    descr: ColumnDescPtr,
    column_index: usize,
    select_as: Arc<str>,
    predicate: Option<Box<dyn Predicate>>,

    /// Row-group indices to scan, and the absolute first-row offset of each
    /// within the selection.
    row_groups: Vec<usize>,
    rg_row_offsets: Vec<i64>,

    max_def: i16,
    max_rep: i16,

    cur_group: usize,
    current: Option<ColumnReader>,
    row_number: RowNumber,
    done: bool,

    def_levels: Vec<i16>,
    rep_levels: Vec<i16>,
    values: Vec<CellValue>,
    buf_len: usize,
    buf_pos: usize,
    value_pos: usize,

    _payload: PhantomData<fn() -> O>,
}

impl<R: ChunkReader + 'static, O> ColumnIterator<R, O> {
    pub fn new(
        cancel: CancellationToken,
        reader: Arc<R>,
        metadata: Arc<ParquetMetaData>,
        row_groups: Vec<usize>,
        column_path: &str,
        predicate: Option<Box<dyn Predicate>>,
        select_as: &str,
    ) -> Result<Self> {
        let schema = metadata.file_metadata().schema_descr();
        let mut column_index = None;
        for i in 0..schema.num_columns() {
            if schema.column(i).path().string() == column_path {
                column_index = Some(i);
                break;
            }
        }
        let column_index =
            column_index.ok_or_else(|| Error::MissingColumn(column_path.to_string()))?;
        let descr = schema.column(column_index);

        let mut rg_row_offsets = Vec::with_capacity(row_groups.len());
        let mut offset = 0i64;
        for &rg in &row_groups {
            rg_row_offsets.push(offset);
            offset += metadata.row_group(rg).num_rows();
        }

        Ok(Self {
            cancel,
            reader,
            max_def: descr.max_def_level(),
            max_rep: descr.max_rep_level(),
            descr,
            column_index,
            select_as: Arc::from(select_as),
            predicate,
            row_groups,
            rg_row_offsets,
            metadata,
            cur_group: 0,
            current: None,
            row_number: RowNumber::empty(),
            done: false,
            def_levels: Vec::new(),
            rep_levels: Vec::new(),
            values: Vec::new(),
            buf_len: 0,
            buf_pos: 0,
            value_pos: 0,
            _payload: PhantomData,
        })
    }

    /// Opens the next unpruned row-group chunk, or returns false at end.
    fn open_next_chunk(&mut self) -> Result<bool> {
        while self.cur_group < self.row_groups.len() {
            let rg_index = self.row_groups[self.cur_group];
            let rg_meta = self.metadata.row_group(rg_index);
            let chunk_meta = rg_meta.column(self.column_index);

            if let Some(pred) = &self.predicate {
                if let Some(stats) = chunk_meta.statistics() {
                    if let Some((min, max)) = statistics_min_max(stats) {
                        if !pred.keep_page(&min, &max) {
                            let last_row =
                                self.rg_row_offsets[self.cur_group] + rg_meta.num_rows() - 1;
                            self.row_number.skip_to_row(last_row);
                            self.cur_group += 1;
                            continue;
                        }
                    }
                }
            }

            let page_reader = SerializedPageReader::new(
                Arc::clone(&self.reader),
                chunk_meta,
                rg_meta.num_rows() as usize,
                None,
            )?;
            self.current = Some(get_column_reader(
                Arc::clone(&self.descr),
                Box::new(page_reader),
            ));
            return Ok(true);
        }
        Ok(false)
    }

    /// Refills the level/value buffers; returns false at end of column.
    fn fill_buffer(&mut self) -> Result<bool> {
        loop {
            if self.current.is_none() && !self.open_next_chunk()? {
                return Ok(false);
            }

            self.def_levels.clear();
            self.rep_levels.clear();
            self.values.clear();
            self.buf_pos = 0;
            self.value_pos = 0;

            let def_buf = if self.max_def > 0 {
                Some(&mut self.def_levels)
            } else {
                None
            };
            let rep_buf = if self.max_rep > 0 {
                Some(&mut self.rep_levels)
            } else {
                None
            };

            let reader = match self.current.as_mut() {
                Some(r) => r,
                None => return Ok(false),
            };

            let values_read = match reader {
                ColumnReader::BoolColumnReader(r) => {
                    let mut vals = Vec::with_capacity(READ_BATCH_SIZE);
                    let (_, values_read, _) =
                        r.read_records(READ_BATCH_SIZE, def_buf, rep_buf, &mut vals)?;
                    self.values.extend(vals.into_iter().map(CellValue::Bool));
                    values_read
                }
                ColumnReader::Int32ColumnReader(r) => {
                    let mut vals = Vec::with_capacity(READ_BATCH_SIZE);
                    let (_, values_read, _) =
                        r.read_records(READ_BATCH_SIZE, def_buf, rep_buf, &mut vals)?;
                    self.values
                        .extend(vals.into_iter().map(|v| CellValue::Int64(v as i64)));
                    values_read
                }
                ColumnReader::Int64ColumnReader(r) => {
                    let mut vals = Vec::with_capacity(READ_BATCH_SIZE);
                    let (_, values_read, _) =
                        r.read_records(READ_BATCH_SIZE, def_buf, rep_buf, &mut vals)?;
                    self.values.extend(vals.into_iter().map(CellValue::Int64));
                    values_read
                }
                ColumnReader::FloatColumnReader(r) => {
                    let mut vals = Vec::with_capacity(READ_BATCH_SIZE);
                    let (_, values_read, _) =
                        r.read_records(READ_BATCH_SIZE, def_buf, rep_buf, &mut vals)?;
                    self.values
                        .extend(vals.into_iter().map(|v| CellValue::Double(v as f64)));
                    values_read
                }
                ColumnReader::DoubleColumnReader(r) => {
                    let mut vals = Vec::with_capacity(READ_BATCH_SIZE);
                    let (_, values_read, _) =
                        r.read_records(READ_BATCH_SIZE, def_buf, rep_buf, &mut vals)?;
                    self.values.extend(vals.into_iter().map(CellValue::Double));
                    values_read
                }
                ColumnReader::ByteArrayColumnReader(r) => {
                    let mut vals = Vec::with_capacity(READ_BATCH_SIZE);
                    let (_, values_read, _) =
                        r.read_records(READ_BATCH_SIZE, def_buf, rep_buf, &mut vals)?;
                    self.values.extend(
                        vals.into_iter()
                            .map(|v| CellValue::Bytes(Bytes::copy_from_slice(v.data()))),
                    );
                    values_read
                }
                ColumnReader::FixedLenByteArrayColumnReader(r) => {
                    let mut vals = Vec::with_capacity(READ_BATCH_SIZE);
                    let (_, values_read, _) =
                        r.read_records(READ_BATCH_SIZE, def_buf, rep_buf, &mut vals)?;
                    self.values.extend(
                        vals.into_iter()
                            .map(|v| CellValue::Bytes(Bytes::copy_from_slice(v.data()))),
                    );
                    values_read
                }
                ColumnReader::Int96ColumnReader(_) => {
                    return Err(Error::Internal(format!(
                        "unsupported physical type Int96 for column {}",
                        self.select_as
                    )))
                }
            };

            // Leaf positions in this batch: level entries when the column
            // has levels, one per value otherwise.
            self.buf_len = if self.max_def > 0 || self.max_rep > 0 {
                self.def_levels.len().max(self.rep_levels.len())
            } else {
                values_read
            };

            if self.buf_len == 0 {
                // Chunk exhausted, move on.
                self.current = None;
                self.cur_group += 1;
                continue;
            }
            return Ok(true);
        }
    }
}

impl<R: ChunkReader + 'static, O: 'static> GroupIterator<O> for ColumnIterator<R, O> {
    fn next(&mut self) -> Result<Option<IteratorResult<O>>> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if self.done {
            return Ok(None);
        }

        loop {
            if self.buf_pos >= self.buf_len {
                if !self.fill_buffer()? {
                    self.done = true;
                    return Ok(None);
                }
            }

            let def = if self.max_def > 0 {
                self.def_levels[self.buf_pos]
            } else {
                0
            };
            let rep = if self.max_rep > 0 {
                self.rep_levels[self.buf_pos]
            } else {
                0
            };
            self.buf_pos += 1;
            self.row_number.next(rep as usize, def as usize);

            let value = if def == self.max_def {
                let v = std::mem::replace(&mut self.values[self.value_pos], CellValue::Null);
                self.value_pos += 1;
                v
            } else {
                CellValue::Null
            };

            if let Some(pred) = &self.predicate {
                if !pred.keep_value(&value) {
                    continue;
                }
            }

            let mut result = IteratorResult::new(self.row_number);
            result.entries.push(Entry {
                key: Arc::clone(&self.select_as),
                value,
                repetition_level: rep,
                definition_level: def,
            });
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

        // Whole row groups strictly before the target row can be skipped
        // without decoding, but only between chunks.
        while self.current.is_none()
            && self.buf_pos >= self.buf_len
            && self.cur_group < self.row_groups.len()
        {
            let rg_index = self.row_groups[self.cur_group];
            let rg_rows = self.metadata.row_group(rg_index).num_rows();
            let last_row = self.rg_row_offsets[self.cur_group] + rg_rows - 1;
            if last_row < to.row() {
                self.row_number.skip_to_row(last_row);
                self.cur_group += 1;
            } else {
                break;
            }
        }

        loop {
            match self.next()? {
                None => return Ok(None),
                Some(result) => {
                    if result.row_number.compare(to, definition_level) != Ordering::Less {
                        return Ok(Some(result));
                    }
                }
            }
        }
    }
}
