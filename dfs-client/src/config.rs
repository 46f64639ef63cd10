//! Process configuration for the interactive client, mirroring `dfs-ns`'s
//! and `dfs-ss`'s `clap` derive (no config file here -- a client has no
//! persisted state worth overlaying).

use std::net::Ipv4Addr;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "dfs-client", about = "Interactive client for the DFS cluster")]
pub struct Args {
    /// Name server host.
    #[arg(long, default_value = "127.0.0.1")]
    pub ns_host: Ipv4Addr,

    /// Name server port.
    #[arg(long, default_value_t = dfs_proto::NS_PORT)]
    pub ns_port: u16,
}
