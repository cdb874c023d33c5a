//! TCP transport for the reference node.
//!
//! After connecting, each side writes its 32-byte public key and reads the
//! other's; the hex of that key is the remote `PeerId`. From then on every
//! frame is `[len: u32 BE][body]`, one `Message` per frame.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use swarmshare_core::{PeerEvent, PeerTransport, TransportError};
use swarmshare_types::PeerId;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

/// Capacity of each connection's outbound queue.
const PEER_CHANNEL_CAPACITY: usize = 256;

/// 4 MB socket buffers; chunk frames are large.
const SOCKET_BUF_SIZE: usize = 4 * 1024 * 1024;

/// Largest accepted frame. A 16 MiB chunk is about 22 MiB once base64 encoded.
pub const MAX_FRAME_SIZE: usize = 32 * 1024 * 1024;

pub const KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct TcpTransport {
    inner: Arc<TcpInner>,
}

struct TcpInner {
    public_key: [u8; KEY_LEN],
    local_id: PeerId,
    connections: RwLock<HashMap<PeerId, mpsc::Sender<Bytes>>>,
    events: mpsc::Sender<PeerEvent>,
}

impl TcpTransport {
    /// New transport with a random identity. Connection lifecycle and inbound
    /// frames are reported on `events`.
    pub fn new(events: mpsc::Sender<PeerEvent>) -> Self {
        Self::with_key(rand::random(), events)
    }

    pub fn with_key(public_key: [u8; KEY_LEN], events: mpsc::Sender<PeerEvent>) -> Self {
        Self {
            inner: Arc::new(TcpInner {
                public_key,
                local_id: PeerId::from_public_key(&public_key),
                connections: RwLock::new(HashMap::new()),
                events,
            }),
        }
    }

    pub fn local_id(&self) -> &PeerId {
        &self.inner.local_id
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.connections.read().await.len()
    }

    /// Accept connections until the task is cancelled.
    pub async fn listen(self, listener: TcpListener) {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "incoming connection");
                    let transport = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = transport.handle_connection(stream).await {
                            warn!(%addr, "connection error: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("accept error: {e}");
                }
            }
        }
    }

    /// Dial `addr`. The handshake and read loop continue in the background.
    pub async fn connect(&self, addr: SocketAddr) -> std::io::Result<()> {
        let stream = TcpStream::connect(addr).await?;
        info!(%addr, "connected");
        let transport = self.clone();
        tokio::spawn(async move {
            if let Err(e) = transport.handle_connection(stream).await {
                warn!(%addr, "connection error: {e}");
            }
        });
        Ok(())
    }

    async fn handle_connection(&self, stream: TcpStream) -> anyhow::Result<()> {
        let sock_ref = socket2::SockRef::from(&stream);
        sock_ref.set_nodelay(true)?;
        sock_ref.set_send_buffer_size(SOCKET_BUF_SIZE)?;
        sock_ref.set_recv_buffer_size(SOCKET_BUF_SIZE)?;

        let (mut reader, mut writer) = stream.into_split();

        writer.write_all(&self.inner.public_key).await?;
        let mut remote_key = [0u8; KEY_LEN];
        reader.read_exact(&mut remote_key).await?;
        let peer = PeerId::from_public_key(&remote_key);

        if peer == self.inner.local_id {
            warn!("refusing connection to self");
            return Ok(());
        }

        let (tx, mut rx) = mpsc::channel::<Bytes>(PEER_CHANNEL_CAPACITY);
        {
            let mut conns = self.inner.connections.write().await;
            if conns.contains_key(&peer) {
                warn!(peer = %peer.short(), "already connected, dropping duplicate");
                return Ok(());
            }
            conns.insert(peer.clone(), tx);
        }

        let write_handle = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                let len = frame.len() as u32;
                if writer.write_all(&len.to_be_bytes()).await.is_err() {
                    break;
                }
                if writer.write_all(&frame).await.is_err() {
                    break;
                }
            }
        });

        let _ = self.inner.events.send(PeerEvent::Connected(peer.clone())).await;
        let result = self.read_loop(&mut reader, &peer).await;

        write_handle.abort();
        self.inner.connections.write().await.remove(&peer);
        let _ = self.inner.events.send(PeerEvent::Disconnected(peer.clone())).await;
        debug!(peer = %peer.short(), "connection closed");

        result
    }

    async fn read_loop(&self, reader: &mut tokio::net::tcp::OwnedReadHalf, peer: &PeerId) -> anyhow::Result<()> {
        loop {
            let frame_len = match reader.read_u32().await {
                Ok(len) => len as usize,
                Err(_) => return Ok(()), // clean disconnect
            };

            if frame_len == 0 || frame_len > MAX_FRAME_SIZE {
                warn!(peer = %peer.short(), "invalid frame length {frame_len}, closing");
                return Ok(());
            }

            let mut frame = vec![0u8; frame_len];
            reader.read_exact(&mut frame).await?;

            if self
                .inner
                .events
                .send(PeerEvent::Data(peer.clone(), Bytes::from(frame)))
                .await
                .is_err()
            {
                return Ok(());
            }
        }
    }
}

impl PeerTransport for TcpTransport {
    fn send<'a>(&'a self, peer: &'a PeerId, frame: Bytes) -> BoxFuture<'a, Result<(), TransportError>> {
        async move {
            if frame.len() > MAX_FRAME_SIZE {
                return Err(TransportError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("frame of {} bytes exceeds {MAX_FRAME_SIZE}", frame.len()),
                )));
            }
            let tx = self
                .inner
                .connections
                .read()
                .await
                .get(peer)
                .cloned()
                .ok_or_else(|| TransportError::NotConnected(peer.clone()))?;
            tx.send(frame)
                .await
                .map_err(|_| TransportError::Closed(peer.clone()))
        }
        .boxed()
    }
}
