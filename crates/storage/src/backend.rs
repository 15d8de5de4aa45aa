//! Block backend interface and the local-filesystem implementation
//!
//! A backend serves block metadata and random-access reads over block data
//! files. Blocks live at `<tenant>/<block_id>/data.parquet` with a
//! `meta.json` sibling.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::block_meta::BlockMeta;
use crate::counting_reader::CountingReader;
use crate::error::{Result, StorageError};

/// Serves block metadata and opens blocks for searching.
///
/// `open_block_for_search` hands back a byte-counting reader over the
/// block's data file; the caller owns it for the duration of one fetch.
pub trait BlockBackend: Send + Sync {
    fn block_meta(&self, tenant: &str, block_id: Uuid) -> Result<BlockMeta>;

    fn open_block_for_search(&self, meta: &BlockMeta) -> Result<CountingReader<File>>;
}

/// A backend over a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
}

impl LocalBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn block_dir(&self, tenant: &str, block_id: Uuid) -> PathBuf {
        self.root.join(tenant).join(block_id.to_string())
    }

    /// Path of the data file for this block.
    pub fn data_path(&self, meta: &BlockMeta) -> PathBuf {
        self.block_dir(&meta.tenant_id, meta.block_id)
            .join("data.parquet")
    }
}

impl BlockBackend for LocalBackend {
    fn block_meta(&self, tenant: &str, block_id: Uuid) -> Result<BlockMeta> {
        let meta_path = self.block_dir(tenant, block_id).join("meta.json");
        let contents = match std::fs::read(&meta_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound {
                    tenant: tenant.to_string(),
                    block_id,
                })
            }
            Err(e) => return Err(e.into()),
        };
        let meta: BlockMeta = serde_json::from_slice(&contents)?;
        debug!(%block_id, tenant, version = %meta.version, "loaded block meta");
        Ok(meta)
    }

    fn open_block_for_search(&self, meta: &BlockMeta) -> Result<CountingReader<File>> {
        let path = self.data_path(meta);
        let file = File::open(&path)?;
        debug!(path = %path.display(), "opened block for search");
        Ok(CountingReader::new(file))
    }
}

/// Writes a block's meta.json, used by block producers and test fixtures.
pub fn write_block_meta(dir: &Path, meta: &BlockMeta) -> Result<()> {
    let contents = serde_json::to_vec_pretty(meta)?;
    std::fs::write(dir.join("meta.json"), contents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_backend_round_trip() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());

        let block_id = Uuid::new_v4();
        let meta = BlockMeta::new("tenant-a", block_id, "vParquet");

        let dir = root.path().join("tenant-a").join(block_id.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        write_block_meta(&dir, &meta).unwrap();

        let loaded = backend.block_meta("tenant-a", block_id).unwrap();
        assert_eq!(loaded.block_id, block_id);
        assert_eq!(loaded.version, "vParquet");
    }

    #[test]
    fn test_local_backend_not_found() {
        let root = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(root.path());

        let err = backend.block_meta("tenant-a", Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }
}
