use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::config::SAVE_PREFIX;

/// Destination for completed transfers.
///
/// `parts` arrive already ordered by chunk index; the sink writes them back to
/// back and returns where the file ended up.
pub trait FileSink: Send + Sync {
    fn commit<'a>(&'a self, file_name: &'a str, parts: Vec<Bytes>) -> BoxFuture<'a, io::Result<PathBuf>>;
}

/// Reduce a peer-supplied name to a bare file name, or `None` if nothing
/// usable is left (`..`, `/`, empty).
pub fn sanitize_file_name(name: &str) -> Option<&str> {
    let base = Path::new(name).file_name()?.to_str()?;
    if base.is_empty() { None } else { Some(base) }
}

/// Writes completed files to `{dir}/received_{fileName}`.
///
/// An existing file at that path is overwritten without prompting.
pub struct DiskStorage {
    dir: PathBuf,
}

impl DiskStorage {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn save_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(format!("{SAVE_PREFIX}{file_name}"))
    }

    async fn write_parts(&self, file_name: &str, parts: Vec<Bytes>) -> io::Result<PathBuf> {
        let base = sanitize_file_name(file_name).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("unusable file name {file_name:?}"))
        })?;

        fs::create_dir_all(&self.dir).await?;
        let path = self.save_path(base);
        let mut file = fs::File::create(&path).await?;
        let mut written = 0usize;
        for part in &parts {
            file.write_all(part).await?;
            written += part.len();
        }
        file.flush().await?;

        debug!(path = %path.display(), bytes = written, "committed file");
        Ok(path)
    }
}

impl FileSink for DiskStorage {
    fn commit<'a>(&'a self, file_name: &'a str, parts: Vec<Bytes>) -> BoxFuture<'a, io::Result<PathBuf>> {
        self.write_parts(file_name, parts).boxed()
    }
}
