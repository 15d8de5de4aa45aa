//! Byte-counting wrapper around a Parquet `ChunkReader`
//!
//! Every fetch reports how many bytes it pulled from backing storage; the
//! frontend feeds that into throughput SLO accounting. The counter covers
//! footer, page, and dictionary reads alike because all of them go through
//! the wrapped reader.

use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parquet::errors::Result as ParquetResult;
use parquet::file::reader::{ChunkReader, Length};

/// Wraps a `ChunkReader` and counts the bytes handed out.
pub struct CountingReader<R> {
    inner: R,
    bytes_read: Arc<AtomicU64>,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The shared counter; clones observe all future reads.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.bytes_read)
    }
}

impl<R: Length> Length for CountingReader<R> {
    fn len(&self) -> u64 {
        self.inner.len()
    }
}

impl<R: ChunkReader> ChunkReader for CountingReader<R> {
    type T = CountingRead<R::T>;

    fn get_read(&self, start: u64) -> ParquetResult<Self::T> {
        Ok(CountingRead {
            inner: self.inner.get_read(start)?,
            bytes_read: Arc::clone(&self.bytes_read),
        })
    }

    fn get_bytes(&self, start: u64, length: usize) -> ParquetResult<bytes::Bytes> {
        let bytes = self.inner.get_bytes(start, length)?;
        self.bytes_read
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(bytes)
    }
}

/// Streaming read handle produced by [`CountingReader::get_read`].
pub struct CountingRead<T> {
    inner: T,
    bytes_read: Arc<AtomicU64>,
}

impl<T: Read> Read for CountingRead<T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}
