//! Block metadata
//!
//! One `meta.json` is stored next to each block's data file. The engine
//! consumes the `version` string (to gate the encoding) and the
//! dedicated-column configuration; the remaining fields serve compaction,
//! retention, and sharding decisions made elsewhere.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The type of the values in a dedicated attribute column. Only `string`
/// is supported; other type names are carried through so the engine can
/// reject them with a useful error when the block is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DedicatedColumnType(String);

impl DedicatedColumnType {
    pub fn new(column_type: impl Into<String>) -> Self {
        Self(column_type.into())
    }

    /// The only supported column type.
    pub fn string() -> Self {
        Self("string".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_string(&self) -> bool {
        self.0 == "string"
    }
}

/// The scope of the attribute stored in a dedicated column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DedicatedColumnScope {
    #[serde(rename = "resource")]
    Resource,
    #[serde(rename = "span")]
    Span,
}

/// Configuration for a single attribute stored in a dedicated column
/// instead of the generic attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedicatedColumn {
    pub scope: DedicatedColumnScope,
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: DedicatedColumnType,
}

/// The metadata stored for each individual block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Indicates the block format, including how indexes and data are laid
    /// out. A reader refuses blocks whose version it does not implement.
    #[serde(rename = "format")]
    pub version: String,
    #[serde(rename = "blockID")]
    pub block_id: Uuid,
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    /// Smallest object id stored in this block.
    #[serde(rename = "minID", default)]
    pub min_id: Vec<u8>,
    /// Largest object id stored in this block.
    #[serde(rename = "maxID", default)]
    pub max_id: Vec<u8>,
    /// Roughly when the first object was written to this block.
    #[serde(rename = "startTime", default)]
    pub start_time: Option<DateTime<Utc>>,
    /// Roughly when the last object was written to this block.
    #[serde(rename = "endTime", default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(rename = "totalObjects", default)]
    pub total_objects: u64,
    /// Size of the block data file in bytes.
    #[serde(default)]
    pub size: u64,
    /// Number of times this block has been compacted.
    #[serde(rename = "compactionLevel", default)]
    pub compaction_level: u8,
    /// Size of the file footer in bytes.
    #[serde(rename = "footerSize", default)]
    pub footer_size: u32,
    /// Dedicated-column configuration for attributes.
    #[serde(rename = "dedicatedColumns", default, skip_serializing_if = "Vec::is_empty")]
    pub dedicated_columns: Vec<DedicatedColumn>,
}

impl BlockMeta {
    pub fn new(tenant_id: impl Into<String>, block_id: Uuid, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            block_id,
            tenant_id: tenant_id.into(),
            min_id: Vec::new(),
            max_id: Vec::new(),
            start_time: None,
            end_time: None,
            total_objects: 0,
            size: 0,
            compaction_level: 0,
            footer_size: 0,
            dedicated_columns: Vec::new(),
        }
    }

    pub fn with_dedicated_columns(mut self, columns: Vec<DedicatedColumn>) -> Self {
        self.dedicated_columns = columns;
        self
    }

    /// Updates id and time bookkeeping for an added object. `start`/`end`
    /// are unix epoch seconds; zero leaves the corresponding bound alone.
    pub fn object_added(&mut self, id: &[u8], start: u32, end: u32) {
        if start > 0 {
            let start_time = Utc.timestamp_opt(start as i64, 0).single();
            if let Some(start_time) = start_time {
                if self.start_time.map_or(true, |cur| start_time < cur) {
                    self.start_time = Some(start_time);
                }
            }
        }

        if end > 0 {
            let end_time = Utc.timestamp_opt(end as i64, 0).single();
            if let Some(end_time) = end_time {
                if self.end_time.map_or(true, |cur| end_time > cur) {
                    self.end_time = Some(end_time);
                }
            }
        }

        if self.min_id.is_empty() || id < self.min_id.as_slice() {
            self.min_id = id.to_vec();
        }
        if self.max_id.is_empty() || id > self.max_id.as_slice() {
            self.max_id = id.to_vec();
        }

        self.total_objects += 1;
    }
}
