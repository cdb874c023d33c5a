//! Outbound side: files, chat and direct messages to one or many peers.
//!
//! A broadcast targets a snapshot of the directory taken when the send starts.
//! Each peer's writes are independent. A peer whose write fails is dropped from
//! the rest of that transfer and reported once, and every other peer still
//! receives every chunk.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::future::join_all;
use swarmshare_types::{Message, PeerId};
use tracing::{info, warn};

use crate::chunker::FileChunker;
use crate::codec;
use crate::directory::PeerDirectory;
use crate::error::{Error, Result, TransportError};
use crate::transport::PeerTransport;

/// Who a send goes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSelector {
    /// Every peer connected when the send starts.
    All,
    /// One peer, by full id or short name.
    Named(String),
}

/// Per-peer result of a send.
#[derive(Debug, Default)]
pub struct SendReport {
    pub delivered: Vec<PeerId>,
    pub failed: Vec<(PeerId, TransportError)>,
}

impl SendReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Orchestrator {
    directory: PeerDirectory,
    transport: Arc<dyn PeerTransport>,
    chunk_size: NonZeroUsize,
}

impl Orchestrator {
    pub fn new(directory: PeerDirectory, transport: Arc<dyn PeerTransport>, chunk_size: NonZeroUsize) -> Self {
        Self {
            directory,
            transport,
            chunk_size,
        }
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        self.chunk_size
    }

    async fn targets(&self, selector: &PeerSelector) -> Result<Vec<PeerId>> {
        match selector {
            PeerSelector::All => Ok(self.directory.ids().await),
            PeerSelector::Named(name) => self
                .directory
                .resolve(name)
                .await
                .map(|id| vec![id])
                .ok_or_else(|| Error::PeerNotFound(name.clone())),
        }
    }

    /// Send `frame` to each target concurrently, splitting the targets into
    /// those that accepted it and those that failed.
    async fn fan_out(&self, targets: Vec<PeerId>, frame: Bytes) -> SendReport {
        let sends = targets.iter().map(|peer| self.transport.send(peer, frame.clone()));
        let results = join_all(sends).await;

        let mut report = SendReport::default();
        for (peer, result) in targets.into_iter().zip(results) {
            match result {
                Ok(()) => report.delivered.push(peer),
                Err(e) => report.failed.push((peer, e)),
            }
        }
        report
    }

    /// Chunk `path` and send it to every selected peer.
    ///
    /// The file is checked before anything is sent: `FileNotFound` and
    /// `EmptyFile` mean no peer saw a single chunk. A read error midway stops
    /// the transfer for everyone.
    pub async fn send_file(&self, selector: &PeerSelector, path: &Path) -> Result<SendReport> {
        let mut chunker = FileChunker::open(path, self.chunk_size).await?;
        let mut active = self.targets(selector).await?;
        let file_name = chunker.file_name().to_owned();
        let total = chunker.total();

        info!(
            file = %file_name,
            bytes = chunker.len(),
            chunks = total,
            peers = active.len(),
            "sending file"
        );

        let mut report = SendReport::default();
        while let Some((index, payload)) = chunker.next_chunk().await? {
            if active.is_empty() {
                break;
            }
            let frame = codec::encode_chunk(&file_name, index, total, payload)?;
            let round = self.fan_out(std::mem::take(&mut active), frame).await;
            for (peer, e) in round.failed {
                warn!(peer = %peer.short(), file = %file_name, chunk = index, "send failed: {e}");
                report.failed.push((peer, e));
            }
            active = round.delivered;
        }
        report.delivered = active;

        info!(
            "File \"{}\" sent to {} peer(s), {} failed.",
            file_name,
            report.delivered.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Broadcast a chat line to every connected peer.
    pub async fn send_chat(&self, message: &str) -> Result<SendReport> {
        let frame = codec::encode(&Message::Chat {
            message: message.to_owned(),
            timestamp: now_millis(),
        })?;
        let targets = self.directory.ids().await;
        let report = self.fan_out(targets, frame).await;
        for (peer, e) in &report.failed {
            warn!(peer = %peer.short(), "chat send failed: {e}");
        }
        Ok(report)
    }

    /// Send a direct message to one peer. Nothing is written if the name does
    /// not resolve.
    pub async fn send_direct(&self, peer_name: &str, message: &str) -> Result<PeerId> {
        let peer = self
            .directory
            .resolve(peer_name)
            .await
            .ok_or_else(|| Error::PeerNotFound(peer_name.to_owned()))?;
        let frame = codec::encode(&Message::DirectMessage {
            message: message.to_owned(),
            timestamp: now_millis(),
        })?;
        self.transport
            .send(&peer, frame)
            .await
            .map_err(|source| Error::PeerWriteFailure {
                peer: peer.clone(),
                source,
            })?;
        Ok(peer)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
