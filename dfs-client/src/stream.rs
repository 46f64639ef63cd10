//! STREAM direct-connect: a client that wants to STREAM a file issues
//! `LOCATE` against the name server, then opens its own connection
//! straight to the owning storage server instead of routing the session
//! through the name server.

use std::net::Ipv4Addr;

use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use dfs_proto::frame;

/// Looks up `filename` via `LOCATE`, connects directly to the storage
/// server it names, issues `STREAM <filename>` there, and copies the
/// response straight to stdout as it arrives.
pub async fn run(ns_host: Ipv4Addr, ns_port: u16, user: &str, pass: &str, filename: &str) -> io::Result<()> {
    let (ss_host, ss_port) = match locate(ns_host, ns_port, filename).await? {
        Some(pair) => pair,
        None => {
            println!("ERROR: could not locate a storage server for '{filename}'");
            return Ok(());
        }
    };

    let mut stream = TcpStream::connect((ss_host.as_str(), ss_port)).await?;

    let cmd = format!("STREAM {filename}");
    let req = dfs_proto::frame::Request::Command { user: user.to_string(), pass: pass.to_string(), cmd };
    stream.write_all(frame::encode_request(&req).as_bytes()).await?;
    stream.flush().await?;

    let mut stdout = io::stdout();
    let (mut read_half, _write_half) = stream.into_split();
    io::copy(&mut read_half, &mut stdout).await?;
    println!();
    Ok(())
}

async fn locate(ns_host: Ipv4Addr, ns_port: u16, filename: &str) -> io::Result<Option<(String, u16)>> {
    let mut stream = TcpStream::connect((ns_host, ns_port)).await?;
    stream.write_all(format!("LOCATE {filename}\n").as_bytes()).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let mut first = String::new();
    reader.read_line(&mut first).await?;
    if first.starts_with("ERROR") {
        return Ok(None);
    }
    let mut second = String::new();
    reader.read_line(&mut second).await?;
    let combined = format!("{first}{second}");
    Ok(frame::parse_locate_reply(&combined))
}
