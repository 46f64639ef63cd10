use std::net::Ipv4Addr;
use std::sync::Arc;

use dfs_ns::credentials::CredentialStore;
use dfs_ns::server as ns_server;
use dfs_ns::state::NsState;
use dfs_proto::frame::{self, Request};
use dfs_ss::engine::LocalEngine;
use dfs_ss::layout::Layout;
use dfs_ss::locks::LockTable;
use dfs_ss::server::{self as ss_server, Shared as SsShared};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A real storage server listening on an OS-assigned port, backed by its
/// own scratch `TempDir`.
pub struct StorageServer {
    pub tempdir: TempDir,
    pub addr: std::net::SocketAddr,
}

impl StorageServer {
    pub async fn spawn(id: u32) -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let layout = Layout::new(tempdir.path(), id);
        layout.ensure_dirs().await.expect("create storage directories");
        let shared = Arc::new(SsShared { engine: LocalEngine::new(layout.clone()), layout, locks: LockTable::new() });

        let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind ss listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                let shared = shared.clone();
                tokio::spawn(async move {
                    ss_server::handle_connection(stream, shared).await;
                });
            }
        });

        Self { tempdir, addr }
    }
}

/// A name server wired against a real credential file and a `TempDir`, with
/// zero or more real storage servers already registered.
pub struct Fixture {
    pub users_dir: TempDir,
    pub ns_addr: std::net::SocketAddr,
    pub storage: Vec<StorageServer>,
}

impl Fixture {
    pub async fn spawn(storage_count: usize) -> Self {
        let users_dir = TempDir::new().expect("create temp dir");
        let users_path = users_dir.path().join("users.txt");
        tokio::fs::write(&users_path, "alice:pw\nbob:pw\n").await.expect("write users file");

        let state = Arc::new(NsState::new(CredentialStore::new(users_path), false));

        let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind ns listener");
        let ns_addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                let state = state.clone();
                tokio::spawn(async move {
                    ns_server::handle_connection(stream, state).await;
                });
            }
        });

        let mut storage = Vec::new();
        for i in 0..storage_count {
            let ss = StorageServer::spawn((i + 1) as u32).await;
            register_ss(ns_addr, ss.addr).await;
            storage.push(ss);
        }

        Self { users_dir, ns_addr, storage }
    }

    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.ns_addr).await.expect("connect to name server")
    }

    pub async fn command(&self, user: &str, cmd: &str) -> String {
        let mut stream = self.connect().await;
        let req =
            Request::Command { user: user.to_string(), pass: "pw".to_string(), cmd: cmd.to_string() };
        stream.write_all(frame::encode_request(&req).as_bytes()).await.expect("write request");
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.expect("read reply");
        String::from_utf8_lossy(&out).into_owned()
    }
}

async fn register_ss(ns_addr: std::net::SocketAddr, ss_addr: std::net::SocketAddr) {
    let mut stream = TcpStream::connect(ns_addr).await.expect("connect to register");
    let req = Request::RegisterSs {
        ip: Ipv4Addr::LOCALHOST.to_string(),
        nm_port: ns_addr.port(),
        client_port: ss_addr.port(),
        files: Vec::new(),
    };
    stream.write_all(frame::encode_request(&req).as_bytes()).await.expect("write register request");
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.expect("read register reply");
    let reply = String::from_utf8_lossy(&out);
    let id = frame::parse_register_reply(reply.lines().next().unwrap_or(""));
    assert!(matches!(id, Some(n) if n >= 0), "registration failed: {reply}");
}
