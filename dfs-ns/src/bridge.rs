//! The fan-out/proxy bridge between the name server and its storage
//! servers: one-shot request/collect, streamed forward-and-relay, and a
//! bidirectional proxy for WRITE.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use dfs_proto::frame::{self, Request};
use dfs_proto::FAN_OUT_TIMEOUT;

use crate::registry::SsDescriptor;

/// Fans `cmd` out to every server in `servers`, opening a fresh
/// connection per server and applying a [`FAN_OUT_TIMEOUT`] to the whole
/// exchange. Unreachable or slow servers are skipped silently.
pub async fn fan_out_view(servers: &[SsDescriptor], user: &str, pass: &str, cmd: &str) -> String {
    let mut aggregate = String::new();
    for desc in servers {
        let Ok(Ok(chunk)) = timeout(FAN_OUT_TIMEOUT, one_shot(desc, user, pass, cmd)).await else { continue };
        aggregate.push_str(&format!("\n--- StorageServer {} (port {}) ---\n", desc.id, desc.client_port));
        aggregate.push_str(&chunk);
    }
    if aggregate.is_empty() {
        "(No active storage servers or no data)\n".to_string()
    } else {
        aggregate
    }
}

async fn one_shot(desc: &SsDescriptor, user: &str, pass: &str, cmd: &str) -> io::Result<String> {
    let mut stream = TcpStream::connect((desc.ip, desc.client_port)).await?;
    let req = Request::Command { user: user.to_string(), pass: pass.to_string(), cmd: cmd.to_string() };
    stream.write_all(frame::encode_request(&req).as_bytes()).await?;
    stream.flush().await?;

    let mut out = Vec::new();
    let (mut read_half, _write_half) = stream.into_split();
    tokio::io::copy(&mut read_half, &mut out).await?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Connects to `desc`, forwards `cmd`, then copies the storage server's
/// response straight into `client_out` as it arrives until the storage
/// server closes its side. Used for every single-SS command that doesn't
/// need further input from the client (READ, CREATE, DELETE, STREAM,
/// UNDO, CHECKPOINT, …).
pub async fn forward_and_relay<W>(desc: &SsDescriptor, user: &str, pass: &str, cmd: &str, client_out: &mut W) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut stream = TcpStream::connect((desc.ip, desc.client_port)).await?;
    let req = Request::Command { user: user.to_string(), pass: pass.to_string(), cmd: cmd.to_string() };
    stream.write_all(frame::encode_request(&req).as_bytes()).await?;
    stream.flush().await?;

    let (mut read_half, _write_half) = stream.into_split();
    tokio::io::copy(&mut read_half, client_out).await?;
    Ok(())
}

/// Like [`forward_and_relay`] but returns the buffered response instead
/// of streaming it, for callers (EXEC, the post-registration refresh)
/// that need the whole payload before acting on it.
pub async fn forward_and_collect(desc: &SsDescriptor, user: &str, pass: &str, cmd: &str) -> io::Result<String> {
    one_shot(desc, user, pass, cmd).await
}

/// Opens a connection to `desc`, forwards `cmd`, then bridges `client`
/// bidirectionally with the storage-server connection until both sides
/// are closed. EOF on one side half-closes the write side of the peer;
/// any I/O error ends the relay for both directions.
pub async fn bidirectional_relay<C>(client: &mut C, desc: &SsDescriptor, user: &str, pass: &str, cmd: &str) -> io::Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let mut ss_stream = TcpStream::connect((desc.ip, desc.client_port)).await?;
    let req = Request::Command { user: user.to_string(), pass: pass.to_string(), cmd: cmd.to_string() };
    ss_stream.write_all(frame::encode_request(&req).as_bytes()).await?;
    ss_stream.flush().await?;

    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut ss_read, mut ss_write) = ss_stream.into_split();

    let client_to_ss = async {
        let r = tokio::io::copy(&mut client_read, &mut ss_write).await;
        let _ = ss_write.shutdown().await;
        r
    };
    let ss_to_client = async {
        let r = tokio::io::copy(&mut ss_read, &mut client_write).await;
        let _ = client_write.shutdown().await;
        r
    };

    let (a, b) = tokio::join!(client_to_ss, ss_to_client);
    a?;
    b?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn forward_and_relay_streams_ss_response_to_client() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let n = stream.read(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).contains("CMD:READ a.txt"));
            stream.write_all(b"hello world").await.unwrap();
        });

        let desc = SsDescriptor { id: 1, ip: Ipv4Addr::LOCALHOST, nm_port: 8080, client_port: port, last_seen: 0, active: true };
        let mut out = Vec::new();
        forward_and_relay(&desc, "alice", "hunter2", "READ a.txt", &mut out).await.unwrap();
        assert_eq!(out, b"hello world");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn fan_out_skips_unreachable_servers() {
        let desc = SsDescriptor { id: 7, ip: Ipv4Addr::LOCALHOST, nm_port: 8080, client_port: 1, last_seen: 0, active: true };
        let out = fan_out_view(&[desc], "alice", "hunter2", "VIEW").await;
        assert_eq!(out, "(No active storage servers or no data)\n");
    }
}
