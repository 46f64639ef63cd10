//! Process configuration: CLI flags merged over an optional `dfs.toml`
//! file, via the standard `clap` + `serde` + `toml` trio.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "dfs-ss", about = "Storage server for the DFS cluster")]
pub struct Args {
    /// Root directory this storage server persists files under.
    #[arg(long, default_value = "storage-data")]
    pub storage_root: PathBuf,

    /// Name server host.
    #[arg(long, default_value = "127.0.0.1")]
    pub ns_host: Ipv4Addr,

    /// Name server port.
    #[arg(long, default_value_t = dfs_proto::NS_PORT)]
    pub ns_port: u16,

    /// Address this storage server advertises to the name server.
    #[arg(long, default_value = "127.0.0.1")]
    pub advertise_ip: Ipv4Addr,

    /// Path to an optional `dfs.toml` config file overlaying these defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the append-only log file (mirrors `storage<id>.log`, id
    /// filled in once registration completes).
    #[arg(long, default_value = "storage.log")]
    pub log_file: PathBuf,
}

/// The subset of [`Args`] a `dfs.toml` file may override. Every field is
/// optional; anything absent falls back to the CLI default.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub storage_root: Option<PathBuf>,
    pub ns_host: Option<Ipv4Addr>,
    pub ns_port: Option<u16>,
    pub advertise_ip: Option<Ipv4Addr>,
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Parses CLI args, then overlays any field a `dfs.toml` sets on top
    /// of the CLI defaults (clap's derive API can't tell an explicit flag
    /// apart from its default, so the file -- when given -- takes
    /// precedence over a bare default rather than the other way around).
    pub fn load() -> std::io::Result<Self> {
        let mut args = Self::parse();
        let Some(path) = args.config.clone() else {
            return Ok(args);
        };
        let text = std::fs::read_to_string(&path)?;
        let file: FileConfig = toml::from_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(v) = file.storage_root {
            args.storage_root = v;
        }
        if let Some(v) = file.ns_host {
            args.ns_host = v;
        }
        if let Some(v) = file.ns_port {
            args.ns_port = v;
        }
        if let Some(v) = file.advertise_ip {
            args.advertise_ip = v;
        }
        if let Some(v) = file.log_file {
            args.log_file = v;
        }
        Ok(args)
    }
}
