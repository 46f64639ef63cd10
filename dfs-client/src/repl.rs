//! The main command loop: blank lines are no-ops, `EXIT`/`QUIT` (any
//! case) end the session, `STREAM` and `WRITE` are special-cased
//! (direct-connect and interactive sub-session respectively), everything
//! else is forwarded to the name server as a single `Command` frame and
//! its reply is streamed back until the name server closes its end.

use std::net::Ipv4Addr;

use tokio::io::{self, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use dfs_proto::frame::{self, Request};

use crate::{stream, write_session};

pub async fn run<R>(ns_host: Ipv4Addr, ns_port: u16, user: &str, pass: &str, stdin: &mut R)
where
    R: AsyncBufReadExt + Unpin,
{
    loop {
        print!("dfs> ");
        use std::io::Write;
        std::io::stdout().flush().ok();

        let mut line = String::new();
        match stdin.read_line(&mut line).await {
            Ok(0) => break,
            Err(e) => {
                println!("ERROR: failed to read input: {e}");
                break;
            }
            Ok(_) => {}
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let verb_upper = verb.to_ascii_uppercase();

        if verb_upper == "EXIT" || verb_upper == "QUIT" {
            println!("Goodbye.");
            break;
        }

        if verb_upper == "STREAM" {
            let filename = rest.trim();
            if filename.is_empty() {
                println!("Usage: STREAM <file>");
                continue;
            }
            if let Err(e) = stream::run(ns_host, ns_port, user, pass, filename).await {
                println!("ERROR: {e}");
            }
            continue;
        }

        if verb_upper == "WRITE" {
            let mut parts = rest.split_whitespace();
            let (Some(filename), Some(sentence)) = (parts.next(), parts.next()) else {
                println!("Usage: WRITE <file> <sentence_number>");
                continue;
            };
            match TcpStream::connect((ns_host, ns_port)).await {
                Ok(mut conn) => write_session::run(&mut conn, user, pass, filename, sentence, stdin).await,
                Err(e) => println!("ERROR: could not reach the name server: {e}"),
            }
            continue;
        }

        if let Err(e) = send_and_print(ns_host, ns_port, user, pass, line).await {
            println!("ERROR: {e}");
        }
    }
}

async fn send_and_print(ns_host: Ipv4Addr, ns_port: u16, user: &str, pass: &str, cmd: &str) -> io::Result<()> {
    let mut stream = TcpStream::connect((ns_host, ns_port)).await?;
    let req = Request::Command { user: user.to_string(), pass: pass.to_string(), cmd: cmd.to_string() };
    stream.write_all(frame::encode_request(&req).as_bytes()).await?;
    stream.flush().await?;

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await?;
    print!("{}", String::from_utf8_lossy(&out));
    io::stdout().flush().await
}
