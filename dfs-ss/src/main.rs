use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, EnvFilter};

use dfs_ss::config::Args;
use dfs_ss::engine::LocalEngine;
use dfs_ss::layout::Layout;
use dfs_ss::locks::LockTable;
use dfs_ss::registration;
use dfs_ss::server::{self, Shared};

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
        args.log_file.file_name().unwrap_or_else(|| std::ffi::OsStr::new("storage.log")),
    );
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking.and(std::io::stdout))
        .init();

    info!("starting storage server, registering with name server");

    // Advertise the base SS port as a placeholder; the name server rewrites
    // it to `base + id` once this registration is assigned an id.
    let placeholder_port = dfs_proto::ss_port(0);
    let id = match registration::register(args.ns_host, args.ns_port, args.advertise_ip, placeholder_port).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "registration failed");
            std::process::exit(1);
        }
    };
    info!(ss_id = id, "registered with name server");

    let layout = Layout::new(&args.storage_root, id);
    if let Err(e) = layout.ensure_dirs().await {
        error!(error = %e, "failed to create storage directories");
        std::process::exit(1);
    }

    let port = dfs_proto::ss_port(id);
    let listener = match TcpListener::bind(("0.0.0.0", port)).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, port, "failed to bind storage server port");
            std::process::exit(1);
        }
    };
    info!(port, "storage server listening");

    let shared = Arc::new(Shared {
        engine: LocalEngine::new(layout.clone()),
        layout,
        locks: LockTable::new(),
    });

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!(error = %e, "accept failed");
                continue;
            }
        };
        let shared = shared.clone();
        tokio::spawn(async move {
            info!(?peer, "accepted connection");
            server::handle_connection(stream, shared).await;
        });
    }
}
