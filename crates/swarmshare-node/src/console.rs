//! Interactive console: stdin commands in, one line per event or result out.

use std::path::PathBuf;
use std::sync::Arc;

use swarmshare_core::{Orchestrator, PeerDirectory, PeerSelector, ProtocolEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::tcp::TcpTransport;

pub const HELP: &str = "\
Commands:
  /send <path>            send a file to every peer
  /send @<peer> <path>    send a file to one peer
  /chat <message>         message every peer
  /dm <peer> <message>    message one peer
  /peers                  list connected peers
  /help                   show this help
  /quit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send { target: PeerSelector, path: PathBuf },
    Chat(String),
    Direct { peer: String, message: String },
    Peers,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Invalid command \"{0}\". Use /help to list commands.")]
    Unknown(String),
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (cmd, rest) = match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    };

    let command = match cmd {
        "/send" => {
            let (target, path) = match rest.strip_prefix('@') {
                Some(directed) => match directed.split_once(char::is_whitespace) {
                    Some((peer, path)) if !peer.is_empty() => {
                        (PeerSelector::Named(peer.to_owned()), path.trim())
                    }
                    _ => return Err(CommandError::Usage("/send @<peer> <path>")),
                },
                None => (PeerSelector::All, rest),
            };
            if path.is_empty() {
                return Err(CommandError::Usage("/send <path>"));
            }
            Command::Send {
                target,
                path: PathBuf::from(path),
            }
        }
        "/chat" => {
            if rest.is_empty() {
                return Err(CommandError::Usage("/chat <message>"));
            }
            Command::Chat(rest.to_owned())
        }
        "/dm" => match rest.split_once(char::is_whitespace) {
            Some((peer, message)) if !message.trim().is_empty() => Command::Direct {
                peer: peer.to_owned(),
                message: message.trim().to_owned(),
            },
            _ => return Err(CommandError::Usage("/dm <peer> <message>")),
        },
        "/peers" => Command::Peers,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_owned())),
    };
    Ok(Some(command))
}

pub fn info_line(msg: impl std::fmt::Display) {
    println!("[info] {msg}");
}

pub fn error_line(msg: impl std::fmt::Display) {
    println!("[error] {msg}");
}

/// Print protocol events until the core shuts down.
pub async fn print_events(mut events: mpsc::UnboundedReceiver<ProtocolEvent>) {
    while let Some(event) = events.recv().await {
        if event.is_failure() {
            error_line(&event);
        } else {
            info_line(&event);
        }
    }
}

pub struct Console {
    orchestrator: Arc<Orchestrator>,
    directory: PeerDirectory,
    transport: TcpTransport,
}

impl Console {
    pub fn new(orchestrator: Arc<Orchestrator>, directory: PeerDirectory, transport: TcpTransport) -> Self {
        Self {
            orchestrator,
            directory,
            transport,
        }
    }

    /// Read commands from stdin until `/quit` or end of input.
    pub async fn run(self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            match parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(command).await,
                Ok(None) => {}
                Err(e) => error_line(e),
            }
        }
        Ok(())
    }

    async fn execute(&self, command: Command) {
        match command {
            Command::Send { target, path } => {
                // Large files take a while; keep reading commands meanwhile.
                let orchestrator = self.orchestrator.clone();
                tokio::spawn(async move {
                    match orchestrator.send_file(&target, &path).await {
                        Ok(report) => {
                            for (peer, e) in &report.failed {
                                error_line(format_args!("Could not send to {}: {e}", peer.short()));
                            }
                        }
                        Err(e) => error_line(e),
                    }
                });
            }
            Command::Chat(message) => match self.orchestrator.send_chat(&message).await {
                Ok(report) => {
                    for (peer, e) in &report.failed {
                        error_line(format_args!("Chat not delivered to {}: {e}", peer.short()));
                    }
                }
                Err(e) => error_line(e),
            },
            Command::Direct { peer, message } => {
                match self.orchestrator.send_direct(&peer, &message).await {
                    Ok(to) => info_line(format_args!("[dm to {}] {message}", to.short())),
                    Err(e) => error_line(e),
                }
            }
            Command::Peers => {
                let connections = self.transport.connection_count().await;
                info_line(format_args!("Number of connections is now {connections}"));
                for entry in self.directory.list().await {
                    println!(
                        "  {}  {}  since {}",
                        entry.name,
                        entry.id,
                        entry.connected_at.format("%H:%M:%S")
                    );
                }
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
        }
    }
}
