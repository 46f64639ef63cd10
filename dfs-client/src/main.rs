mod auth;
mod banner;
mod config;
mod repl;
mod stream;
mod write_session;

use clap::Parser;
use tokio::io::{stdin, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use config::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    banner::print_welcome();

    let mut stdin = BufReader::new(stdin());

    let (user, pass) = match auth::authenticate(args.ns_host, args.ns_port, &mut stdin).await {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("failed to reach the name server: {e}");
            std::process::exit(1);
        }
    };

    banner::print_command_help();
    repl::run(args.ns_host, args.ns_port, &user, &pass, &mut stdin).await;
}
