//! Column cell values
//!
//! Parquet physical types are normalized into a small tagged value: both
//! int widths become `Int64`, both float widths become `Double`, and byte
//! arrays (plain and fixed-length) become `Bytes`. A position where the
//! definition level is below the column's maximum is `Null`.

use bytes::Bytes;

/// A single decoded column value.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int64(i64),
    Double(f64),
    Bytes(Bytes),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Unsigned view of an integer column (time columns are u64 unix-nanos
    /// stored as int64).
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            CellValue::Int64(v) => Some(*v as u64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CellValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// UTF-8 view of a byte-array column.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}
