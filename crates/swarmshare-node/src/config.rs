use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgGroup, Parser};
use swarmshare_core::CoreConfig;
use swarmshare_core::config::MAX_CHUNK_SIZE;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:4977";

#[derive(Debug, Parser)]
#[command(name = "swarmshare")]
#[command(version, about = "Share files and chat with peers over TCP", long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).args(["create", "join"])))]
pub struct Cli {
    /// Start a new room and wait for peers to join
    #[arg(long)]
    pub create: bool,

    /// Join an existing room at ADDR (host:port)
    #[arg(long, value_name = "ADDR")]
    pub join: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Create,
    Join(String),
}

impl Cli {
    pub fn mode(&self) -> Mode {
        match &self.join {
            Some(addr) => Mode::Join(addr.clone()),
            None => Mode::Create,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub listen: SocketAddr,
    pub core: CoreConfig,
}

impl NodeConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = CoreConfig::default();

        let listen = lookup("SWARMSHARE_LISTEN")
            .unwrap_or_else(|| DEFAULT_LISTEN.into())
            .parse::<SocketAddr>()
            .context("SWARMSHARE_LISTEN must be host:port")?;

        let chunk_size = match lookup("SWARMSHARE_CHUNK_SIZE") {
            Some(raw) => {
                let n: usize = raw
                    .parse()
                    .with_context(|| format!("SWARMSHARE_CHUNK_SIZE: {raw:?} is not a byte count"))?;
                let Some(n) = NonZeroUsize::new(n) else {
                    bail!("SWARMSHARE_CHUNK_SIZE must be greater than zero");
                };
                if n.get() > MAX_CHUNK_SIZE {
                    bail!("SWARMSHARE_CHUNK_SIZE must be at most {MAX_CHUNK_SIZE}");
                }
                n
            }
            None => defaults.chunk_size,
        };

        let save_dir = lookup("SWARMSHARE_SAVE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.save_dir);

        let transfer_idle = secs(&lookup, "SWARMSHARE_TRANSFER_IDLE_SECS")?.unwrap_or(defaults.transfer_idle);
        let cleanup_interval =
            secs(&lookup, "SWARMSHARE_CLEANUP_INTERVAL_SECS")?.unwrap_or(defaults.cleanup_interval);

        let core = CoreConfig {
            chunk_size,
            save_dir,
            transfer_idle,
            cleanup_interval,
        };
        core.validate()?;
        Ok(Self { listen, core })
    }
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<Option<Duration>> {
    lookup(key)
        .map(|raw| {
            raw.parse::<u64>()
                .map(Duration::from_secs)
                .with_context(|| format!("{key}: {raw:?} is not a number of seconds"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<NodeConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NodeConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.listen, DEFAULT_LISTEN.parse().unwrap());
        assert_eq!(cfg.core.chunk_size.get(), 1024 * 1024);
        assert_eq!(cfg.core.save_dir, PathBuf::from("."));
        assert_eq!(cfg.core.transfer_idle, Duration::from_secs(300));
    }

    #[test]
    fn overrides() {
        let cfg = load(&[
            ("SWARMSHARE_LISTEN", "127.0.0.1:9000"),
            ("SWARMSHARE_CHUNK_SIZE", "16777216"),
            ("SWARMSHARE_SAVE_DIR", "/tmp/inbox"),
            ("SWARMSHARE_TRANSFER_IDLE_SECS", "60"),
            ("SWARMSHARE_CLEANUP_INTERVAL_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(cfg.listen.port(), 9000);
        assert_eq!(cfg.core.chunk_size.get(), MAX_CHUNK_SIZE);
        assert_eq!(cfg.core.save_dir, PathBuf::from("/tmp/inbox"));
        assert_eq!(cfg.core.transfer_idle, Duration::from_secs(60));
        assert_eq!(cfg.core.cleanup_interval, Duration::from_secs(5));
    }

    #[test]
    fn bad_values_fail() {
        assert!(load(&[("SWARMSHARE_CHUNK_SIZE", "0")]).is_err());
        assert!(load(&[("SWARMSHARE_CHUNK_SIZE", "lots")]).is_err());
        assert!(load(&[("SWARMSHARE_CHUNK_SIZE", "16777217")]).is_err());
        assert!(load(&[("SWARMSHARE_LISTEN", "nowhere")]).is_err());
        assert!(load(&[("SWARMSHARE_TRANSFER_IDLE_SECS", "0")]).is_err());
        assert!(load(&[("SWARMSHARE_CLEANUP_INTERVAL_SECS", "-1")]).is_err());
    }

    #[test]
    fn cli_requires_a_mode() {
        assert!(Cli::try_parse_from(["swarmshare"]).is_err());
        assert!(Cli::try_parse_from(["swarmshare", "--create", "--join", "x:1"]).is_err());
        assert_eq!(Cli::try_parse_from(["swarmshare", "--create"]).unwrap().mode(), Mode::Create);
        assert_eq!(
            Cli::try_parse_from(["swarmshare", "--join", "10.0.0.2:4977"]).unwrap().mode(),
            Mode::Join("10.0.0.2:4977".into())
        );
    }
}
