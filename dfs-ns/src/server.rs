//! Per-connection entry point: reads the first frame off a socket and
//! branches on its shape. [`dfs_proto::frame::read_request`] already
//! distinguishes AUTH/REGISTER_SS/LOCATE/command frames, so there's no
//! need to peek at raw bytes before deciding how to parse.

use std::net::Ipv4Addr;
use std::sync::Arc;

use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{info, warn};

use dfs_proto::frame::{self, Request};

use crate::refresh;
use crate::router;
use crate::state::NsState;

pub async fn handle_connection(stream: TcpStream, state: Arc<NsState>) {
    let peer = stream.peer_addr().ok();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = match frame::read_request(&mut reader).await {
        Ok(Some(req)) => req,
        Ok(None) => return,
        Err(e) => {
            warn!(?peer, error = %e, "failed to read request frame");
            return;
        }
    };

    match request {
        Request::Auth { user, pass } => {
            let ok = state.credentials.authenticate(&user, &pass).await;
            info!(%user, ok, "authentication attempt");
            let _ = frame::write_line(&mut write_half, frame::encode_auth_reply(ok)).await;
        }
        Request::RegisterSs { ip, nm_port, client_port, files: _ } => {
            let Ok(ip): Result<Ipv4Addr, _> = ip.parse() else {
                let _ = frame::write_line(&mut write_half, &frame::encode_register_reply(-1)).await;
                return;
            };
            let id = state.register_ss(ip, nm_port, client_port).await;
            info!(?id, %ip, client_port, "storage server registration");
            let _ = frame::write_line(&mut write_half, &frame::encode_register_reply(id.map(|v| v as i32).unwrap_or(-1))).await;

            if let Some(id) = id {
                if let Some(desc) = state.descriptor(id).await {
                    refresh::refresh_from_ss(&state, &desc).await;
                }
            }
        }
        Request::Locate { file } => {
            let mut stream = tokio::io::join(tokio::io::empty(), write_half);
            router::dispatch(&state, "", "", &format!("LOCATE {file}"), &mut stream).await;
        }
        Request::Command { user, pass, cmd } => {
            if !state.credentials.authenticate(&user, &pass).await {
                warn!(%user, "rejected command from unauthenticated user");
                let _ = frame::write_line(&mut write_half, "Error: Authentication failed.\n").await;
                return;
            }
            let mut stream = tokio::io::join(reader, write_half);
            router::dispatch(&state, &user, &pass, &cmd, &mut stream).await;
        }
    }
}
