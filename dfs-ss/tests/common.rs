use std::sync::Arc;

use dfs_ss::engine::LocalEngine;
use dfs_ss::layout::Layout;
use dfs_ss::locks::LockTable;
use dfs_ss::server::{self, Shared};
use dfs_proto::frame::{self, Request};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// One storage server wired up against a scratch `TempDir`, listening on an
/// OS-assigned port. Each test gets its own.
pub struct Fixture {
    pub tempdir: TempDir,
    pub addr: std::net::SocketAddr,
}

impl Fixture {
    pub async fn spawn() -> Self {
        let tempdir = TempDir::new().expect("create temp dir");
        let layout = Layout::new(tempdir.path(), 1);
        layout.ensure_dirs().await.expect("create storage directories");

        let shared = Arc::new(Shared { engine: LocalEngine::new(layout.clone()), layout, locks: LockTable::new() });

        let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind scratch listener");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => return,
                };
                let shared = shared.clone();
                tokio::spawn(async move {
                    server::handle_connection(stream, shared).await;
                });
            }
        });

        Self { tempdir, addr }
    }

    pub async fn connect(&self) -> TcpStream {
        TcpStream::connect(self.addr).await.expect("connect to storage server")
    }

    /// Sends one forwarded `Command` frame and reads back everything the
    /// server writes before closing its half (mirrors the name server's
    /// one-shot "forward and collect" bridge, minus the proxy itself).
    pub async fn command(&self, user: &str, cmd: &str) -> String {
        let mut stream = self.connect().await;
        let req =
            Request::Command { user: user.to_string(), pass: "irrelevant".to_string(), cmd: cmd.to_string() };
        stream.write_all(frame::encode_request(&req).as_bytes()).await.expect("write request");
        let mut out = Vec::new();
        stream.read_to_end(&mut out).await.expect("read reply");
        String::from_utf8_lossy(&out).into_owned()
    }
}
