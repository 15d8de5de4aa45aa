//! Backend collaborator interfaces for tracelake.
//!
//! This crate defines what the query engine needs from the world around
//! it: block metadata ([`BlockMeta`]), a backend that can locate and open
//! blocks ([`BlockBackend`]), per-tenant limits ([`Overrides`]), search
//! options, and the byte-counting reader that feeds `bytesRead`
//! accounting.

pub mod backend;
pub mod block_meta;
pub mod counting_reader;
pub mod error;
pub mod options;
pub mod overrides;

pub use backend::{write_block_meta, BlockBackend, LocalBackend};
pub use block_meta::{BlockMeta, DedicatedColumn, DedicatedColumnScope, DedicatedColumnType};
pub use counting_reader::{CountingRead, CountingReader};
pub use error::{Result, StorageError};
pub use options::SearchOptions;
pub use overrides::{Overrides, StaticOverrides};
