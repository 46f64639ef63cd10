//! Authentication handshake against the name server: retries against a
//! fresh connection until the name server accepts the credentials.

use std::net::Ipv4Addr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use dfs_proto::frame::{self, Request};

/// Prompts for a username and password, retrying against a fresh
/// connection on every attempt until the name server accepts them.
/// Returns the credentials once authenticated -- they're resent with
/// every subsequent command, since there is no session token.
pub async fn authenticate<R>(ns_host: Ipv4Addr, ns_port: u16, stdin: &mut R) -> std::io::Result<(String, String)>
where
    R: AsyncBufReadExt + Unpin,
{
    loop {
        let user = prompt_line(stdin, "Username: ").await?;
        let pass = prompt_line(stdin, "Password: ").await?;

        match try_auth(ns_host, ns_port, &user, &pass).await {
            Ok(true) => {
                println!("\nAuthentication successful. Welcome, {user}!\n");
                return Ok((user, pass));
            }
            Ok(false) => {
                println!("\nAuthentication failed. Invalid username or password.");
                println!("Please try again.\n");
            }
            Err(e) => {
                println!("\nAuthentication failed: {e}");
                println!("Please try again.\n");
            }
        }
    }
}

async fn try_auth(ns_host: Ipv4Addr, ns_port: u16, user: &str, pass: &str) -> std::io::Result<bool> {
    let mut stream = TcpStream::connect((ns_host, ns_port)).await?;
    let req = Request::Auth { user: user.to_string(), pass: pass.to_string() };
    stream.write_all(frame::encode_request(&req).as_bytes()).await?;
    stream.flush().await?;

    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await?;
    Ok(frame::parse_auth_reply(&line))
}

async fn prompt_line<R>(stdin: &mut R, prompt: &str) -> std::io::Result<String>
where
    R: AsyncBufReadExt + Unpin,
{
    use std::io::Write;
    print!("{prompt}");
    std::io::stdout().flush().ok();

    let mut line = String::new();
    stdin.read_line(&mut line).await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
