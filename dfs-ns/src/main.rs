use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, EnvFilter};

use dfs_ns::config::Args;
use dfs_ns::credentials::CredentialStore;
use dfs_ns::server;
use dfs_ns::state::NsState;

#[tokio::main]
async fn main() {
    let args = match Args::load() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    let file_appender = tracing_appender::rolling::never(
        args.log_file.parent().unwrap_or_else(|| std::path::Path::new(".")),
        args.log_file.file_name().unwrap_or_else(|| std::ffi::OsStr::new("nameserver.log")),
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking.and(std::io::stdout))
        .init();

    if args.enable_exec {
        tracing::warn!("EXEC is enabled: file owners can run allowlisted shell commands through this name server");
    }

    let listener = match TcpListener::bind(("0.0.0.0", args.port)).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, port = args.port, "failed to bind name server port");
            std::process::exit(1);
        }
    };
    info!(port = args.port, "name server listening");

    let state = Arc::new(NsState::new(CredentialStore::new(args.users_file), args.enable_exec));

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "accept failed");
                continue;
            }
        };
        let state = state.clone();
        tokio::spawn(async move {
            info!(?peer, "accepted connection");
            server::handle_connection(stream, state).await;
        });
    }
}
