use std::sync::Arc;

use swarmshare_types::ProtocolEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cleanup::run_expiry_loop;
use crate::config::CoreConfig;
use crate::directory::PeerDirectory;
use crate::error::Result;
use crate::events::EventSender;
use crate::orchestrator::Orchestrator;
use crate::reassembly::ReassemblyEngine;
use crate::router::MessageRouter;
use crate::session::Session;
use crate::storage::FileSink;
use crate::transport::PeerTransport;

/// Everything one node needs, wired together around a transport and a sink.
///
/// The caller feeds transport events into [`session`](Self::session), drives
/// sends through [`orchestrator`](Self::orchestrator), and reads
/// `ProtocolEvent`s from the receiver returned by [`new`](Self::new).
pub struct SwarmCore {
    config: CoreConfig,
    directory: PeerDirectory,
    reassembly: Arc<ReassemblyEngine>,
    router: Arc<MessageRouter>,
    orchestrator: Arc<Orchestrator>,
}

impl SwarmCore {
    pub fn new(
        config: CoreConfig,
        transport: Arc<dyn PeerTransport>,
        sink: Arc<dyn FileSink>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ProtocolEvent>)> {
        config.validate()?;

        let (events, rx) = EventSender::channel();
        let directory = PeerDirectory::new(events.clone());
        let reassembly = Arc::new(ReassemblyEngine::new(sink, events.clone()));
        let router = Arc::new(MessageRouter::new(reassembly.clone(), events));
        let orchestrator = Arc::new(Orchestrator::new(directory.clone(), transport, config.chunk_size));

        Ok((
            Self {
                config,
                directory,
                reassembly,
                router,
                orchestrator,
            },
            rx,
        ))
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    pub fn reassembly(&self) -> &Arc<ReassemblyEngine> {
        &self.reassembly
    }

    pub fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    /// A fresh inbound session bound to this node's directory and router.
    pub fn session(&self) -> Session {
        Session::new(self.directory.clone(), self.router.clone())
    }

    /// Start the idle-transfer sweeper.
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        tokio::spawn(run_expiry_loop(
            self.reassembly.clone(),
            self.config.transfer_idle,
            self.config.cleanup_interval,
        ))
    }
}
