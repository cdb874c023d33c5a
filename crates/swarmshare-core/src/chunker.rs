//! Fixed-size chunking of outbound files.
//!
//! `FileChunker` reads one chunk at a time from disk, so sending holds at most
//! one chunk (plus its encoded frame) in memory regardless of file size.

use std::io::ErrorKind;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::{Error, Result};

/// Number of chunks for `len` bytes: `ceil(len / chunk_size)`, zero for an empty file.
pub fn chunk_count(len: u64, chunk_size: NonZeroUsize) -> u64 {
    len.div_ceil(chunk_size.get() as u64)
}

/// Split an in-memory buffer into `(index, payload)` pairs.
pub fn chunk_bytes(data: &[u8], chunk_size: NonZeroUsize) -> impl Iterator<Item = (u32, &[u8])> {
    data.chunks(chunk_size.get())
        .enumerate()
        .map(|(i, c)| (i as u32, c))
}

/// Lazily yields the chunks of a file on disk.
pub struct FileChunker {
    file: File,
    path: PathBuf,
    file_name: String,
    len: u64,
    chunk_size: NonZeroUsize,
    total: u32,
    next_index: u32,
}

impl FileChunker {
    /// Open `path` for chunking. Fails with `FileNotFound` for a missing path or
    /// anything that is not a regular file, and `EmptyFile` for zero length.
    pub async fn open(path: &Path, chunk_size: NonZeroUsize) -> Result<Self> {
        let read_failure = |source: std::io::Error| Error::ReadFailure {
            path: path.to_path_buf(),
            source,
        };

        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) if m.is_file() => m,
            Ok(_) => return Err(Error::FileNotFound(path.to_path_buf())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::FileNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(read_failure(e)),
        };

        let len = metadata.len();
        if len == 0 {
            return Err(Error::EmptyFile(path.to_path_buf()));
        }

        let total = u32::try_from(chunk_count(len, chunk_size)).map_err(|_| {
            read_failure(std::io::Error::other(format!(
                "{len} bytes needs more than {} chunks",
                u32::MAX
            )))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::FileNotFound(path.to_path_buf()))?;

        let file = File::open(path).await.map_err(read_failure)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            file_name,
            len,
            chunk_size,
            total,
            next_index: 0,
        })
    }

    /// Name sent on the wire: the final path component.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Read the next chunk, or `None` once all `total` chunks were produced.
    pub async fn next_chunk(&mut self) -> Result<Option<(u32, Bytes)>> {
        if self.next_index >= self.total {
            return Ok(None);
        }
        let size = self.chunk_size.get() as u64;
        let offset = u64::from(self.next_index) * size;
        let want = (self.len - offset).min(size) as usize;

        let mut buf = vec![0u8; want];
        self.file
            .read_exact(&mut buf)
            .await
            .map_err(|source| Error::ReadFailure {
                path: self.path.clone(),
                source,
            })?;

        let index = self.next_index;
        self.next_index += 1;
        Ok(Some((index, Bytes::from(buf))))
    }
}
