//! Registration handshake against the name server.

use std::net::Ipv4Addr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use dfs_proto::frame;

#[derive(Debug)]
pub enum Error {
    Connect(std::io::Error),
    Io(std::io::Error),
    Rejected,
    Malformed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Connect(e) => write!(f, "could not connect to name server: {e}"),
            Error::Io(e) => write!(f, "registration I/O error: {e}"),
            Error::Rejected => write!(f, "name server rejected registration (table full)"),
            Error::Malformed => write!(f, "name server sent a malformed SS_ID reply"),
        }
    }
}

impl std::error::Error for Error {}

/// Registers with the name server, reporting no locally-known files: a
/// storage server doesn't learn its own id (and therefore its on-disk
/// root) until this round trip completes, so the first registration is
/// always empty.
pub async fn register(ns_host: Ipv4Addr, ns_port: u16, advertise_ip: Ipv4Addr, client_port: u16) -> Result<u32, Error> {
    let stream = TcpStream::connect((ns_host, ns_port)).await.map_err(Error::Connect)?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let req = frame::Request::RegisterSs {
        ip: advertise_ip.to_string(),
        nm_port: ns_port,
        client_port,
        files: Vec::new(),
    };
    write_half.write_all(frame::encode_request(&req).as_bytes()).await.map_err(Error::Io)?;
    write_half.flush().await.map_err(Error::Io)?;

    let mut line = String::new();
    reader.read_line(&mut line).await.map_err(Error::Io)?;
    let id = frame::parse_register_reply(&line).ok_or(Error::Malformed)?;
    if id < 0 {
        return Err(Error::Rejected);
    }
    Ok(id as u32)
}
