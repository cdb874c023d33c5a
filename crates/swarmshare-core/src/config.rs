use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default chunk size: 1 MiB of file data per frame (about 1.4 MB once base64 encoded).
pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(1024 * 1024) {
    Some(n) => n,
    None => unreachable!(),
};

/// Upper bound on chunk size. Keeps a single encoded frame under the transport's frame limit.
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Completed files are saved as `<save_dir>/received_<fileName>`.
pub const SAVE_PREFIX: &str = "received_";

/// Transfers with no new chunk for this long are abandoned.
pub const DEFAULT_TRANSFER_IDLE: Duration = Duration::from_secs(300);

/// How often idle transfers are swept.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub chunk_size: NonZeroUsize,
    pub save_dir: PathBuf,
    pub transfer_idle: Duration,
    pub cleanup_interval: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            save_dir: PathBuf::from("."),
            transfer_idle: DEFAULT_TRANSFER_IDLE,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl CoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size.get() > MAX_CHUNK_SIZE {
            return Err(Error::Config(format!(
                "chunk size {} exceeds maximum of {} bytes",
                self.chunk_size, MAX_CHUNK_SIZE
            )));
        }
        if self.transfer_idle.is_zero() {
            return Err(Error::Config("transfer idle timeout must be non-zero".into()));
        }
        if self.cleanup_interval.is_zero() {
            return Err(Error::Config("cleanup interval must be non-zero".into()));
        }
        Ok(())
    }
}
