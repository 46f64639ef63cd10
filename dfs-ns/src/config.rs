//! Process configuration: CLI flags merged over an optional `dfs.toml`
//! file, mirroring `dfs-ss`'s `clap` + `serde` + `toml` trio.

use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "dfs-ns", about = "Name server for the DFS cluster")]
pub struct Args {
    /// Port the name server listens on for both clients and storage servers.
    #[arg(long, default_value_t = dfs_proto::NS_PORT)]
    pub port: u16,

    /// Path to the flat `user:pass` credential file.
    #[arg(long, default_value = "storage/users.txt")]
    pub users_file: PathBuf,

    /// Path to an optional `dfs.toml` config file overlaying these defaults.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Path to the append-only log file.
    #[arg(long, default_value = "nameserver.log")]
    pub log_file: PathBuf,

    /// Enables the EXEC command. Off by default: EXEC shells out to
    /// whatever a file's owner wrote into it, so it stays disabled unless
    /// an operator opts in.
    #[arg(long, default_value_t = false)]
    pub enable_exec: bool,
}

/// The subset of [`Args`] a `dfs.toml` file may override. Every field is
/// optional; anything absent falls back to the CLI default.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub users_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub enable_exec: Option<bool>,
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

        if let Some(v) = file.port {
            args.port = v;
        }
        if let Some(v) = file.users_file {
            args.users_file = v;
        }
        if let Some(v) = file.log_file {
            args.log_file = v;
        }
        if let Some(v) = file.enable_exec {
            args.enable_exec = v;
        }
        Ok(args)
    }
}
