//! Per-(peer, file) reassembly of inbound chunks.
//!
//! ```text
//! chunk --> validate --> TransferState (index -> payload) --> all present? --> FileSink
//!           (name, index, total)   count once per index          concat 0..total
//! ```
//!
//! Payloads are buffered in memory until the transfer completes, so the
//! memory ceiling per transfer is the size of the file being received.
//! Arrival order does not matter; the file is written once, in index order.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use swarmshare_types::{PeerId, ProtocolEvent};

use crate::error::{Error, Result};
use crate::events::EventSender;
use crate::storage::{FileSink, sanitize_file_name};

/// Transfers are keyed by who sent them and the name they gave the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferKey {
    pub peer: PeerId,
    pub file_name: String,
}

/// Chunks received so far for one transfer.
#[derive(Debug)]
pub struct TransferState {
    total: u32,
    chunks: BTreeMap<u32, Bytes>,
    completed: bool,
    last_activity: Instant,
}

impl TransferState {
    fn new(total: u32) -> Self {
        Self {
            total,
            chunks: BTreeMap::new(),
            completed: false,
            last_activity: Instant::now(),
        }
    }

    /// Store a payload. Returns true if the index was newly filled.
    fn insert(&mut self, index: u32, payload: Bytes) -> bool {
        self.last_activity = Instant::now();
        self.chunks.insert(index, payload).is_none()
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Number of distinct indices filled.
    pub fn received(&self) -> u32 {
        self.chunks.len() as u32
    }

    pub fn is_complete(&self) -> bool {
        self.received() == self.total
    }

    /// Drain payloads in index order. Only meaningful once complete, when the
    /// keys are exactly `0..total`.
    fn take_ordered(&mut self) -> Vec<Bytes> {
        std::mem::take(&mut self.chunks).into_values().collect()
    }
}

/// What happened to a single accepted chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// New index buffered; transfer still in progress.
    Stored { received: u32, total: u32 },
    /// Index already held; payload replaced, count unchanged.
    Duplicate { received: u32, total: u32 },
    /// Transfer already completed; chunk dropped.
    Ignored,
    /// Last missing index arrived and the file was written.
    Completed { save_path: PathBuf },
}

/// Owns every in-flight `TransferState`. Different keys live in different
/// shards of the map, so concurrent peers do not contend on one lock.
pub struct ReassemblyEngine {
    transfers: DashMap<TransferKey, TransferState>,
    sink: Arc<dyn FileSink>,
    events: EventSender,
}

impl ReassemblyEngine {
    pub fn new(sink: Arc<dyn FileSink>, events: EventSender) -> Self {
        Self {
            transfers: DashMap::new(),
            sink,
            events,
        }
    }

    /// Accept one chunk from `peer`.
    ///
    /// Errors are per chunk: a `ProtocolViolation` discards only this chunk
    /// and leaves the transfer as it was. An `IoFailure` means the transfer
    /// completed but could not be written; its state is gone either way.
    pub async fn on_chunk(
        &self,
        peer: &PeerId,
        file_name: &str,
        index: i64,
        total: i64,
        payload: Bytes,
    ) -> Result<ChunkOutcome> {
        let violation = |reason: String| Error::ProtocolViolation {
            peer: peer.clone(),
            file_name: file_name.to_owned(),
            reason,
        };

        if sanitize_file_name(file_name).is_none() {
            return Err(violation("file name has no usable final component".into()));
        }
        let total = u32::try_from(total)
            .ok()
            .filter(|t| *t >= 1)
            .ok_or_else(|| violation(format!("invalid chunk total {total}")))?;
        let index = u32::try_from(index)
            .ok()
            .filter(|i| *i < total)
            .ok_or_else(|| violation(format!("chunk index {index} outside 0..{total}")))?;

        let key = TransferKey {
            peer: peer.clone(),
            file_name: file_name.to_owned(),
        };

        let parts = {
            let mut state = self
                .transfers
                .entry(key.clone())
                .or_insert_with(|| TransferState::new(total));

            if state.completed {
                return Ok(ChunkOutcome::Ignored);
            }
            if state.total != total {
                return Err(violation(format!(
                    "chunk total {total} conflicts with recorded total {}",
                    state.total
                )));
            }

            let fresh = state.insert(index, payload);
            let received = state.received();
            if fresh {
                self.events.emit(ProtocolEvent::ChunkReceived {
                    peer: peer.clone(),
                    file_name: file_name.to_owned(),
                    index,
                    total,
                });
            }
            if !state.is_complete() {
                return Ok(if fresh {
                    ChunkOutcome::Stored { received, total }
                } else {
                    ChunkOutcome::Duplicate { received, total }
                });
            }

            // Stays in the map as completed until the write finishes, so
            // late duplicates are ignored instead of starting a new transfer.
            state.completed = true;
            state.take_ordered()
        };

        let result = self.sink.commit(file_name, parts).await;
        self.transfers.remove_if(&key, |_, s| s.completed);

        match result {
            Ok(save_path) => {
                self.events.emit(ProtocolEvent::TransferComplete {
                    peer: peer.clone(),
                    file_name: file_name.to_owned(),
                    save_path: save_path.clone(),
                });
                Ok(ChunkOutcome::Completed { save_path })
            }
            Err(source) => {
                self.events.emit(ProtocolEvent::TransferFailed {
                    peer: peer.clone(),
                    file_name: file_name.to_owned(),
                    reason: source.to_string(),
                });
                Err(Error::IoFailure {
                    peer: peer.clone(),
                    file_name: file_name.to_owned(),
                    source,
                })
            }
        }
    }

    /// Drop transfers that have not seen a chunk for `max_idle`, emitting
    /// `TransferAbandoned` for each. Returns how many were dropped.
    pub fn expire_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();
        self.transfers.retain(|key, state| {
            let idle = !state.completed && now.duration_since(state.last_activity) >= max_idle;
            if idle {
                expired.push((key.clone(), state.received(), state.total));
            }
            !idle
        });

        let count = expired.len();
        for (key, received, total) in expired {
            self.events.emit(ProtocolEvent::TransferAbandoned {
                peer: key.peer,
                file_name: key.file_name,
                received,
                total,
            });
        }
        count
    }

    /// `(received, total)` for an in-flight transfer.
    pub fn progress(&self, peer: &PeerId, file_name: &str) -> Option<(u32, u32)> {
        let key = TransferKey {
            peer: peer.clone(),
            file_name: file_name.to_owned(),
        };
        self.transfers
            .get(&key)
            .map(|s| (s.received(), s.total()))
    }

    pub fn in_flight(&self) -> usize {
        self.transfers.len()
    }
}
