//! Interactive WRITE session: the name server opens the lock and prints
//! the first reply immediately, then the client reads stdin line by
//! line, forwards each line to the name server (which bridges it
//! straight to the holding storage server), prints exactly one reply
//! line per input line, and stops as soon as the typed line's first word
//! is `ETIRW` (WRITE spelled backwards -- the end-of-session sentinel).

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use dfs_proto::frame::{self, Request};

pub async fn run<R>(stream: &mut TcpStream, user: &str, pass: &str, filename: &str, sentence: &str, stdin: &mut R)
where
    R: AsyncBufReadExt + Unpin,
{
    let cmd = format!("WRITE {filename} {sentence}");
    let req = Request::Command { user: user.to_string(), pass: pass.to_string(), cmd };
    if stream.write_all(frame::encode_request(&req).as_bytes()).await.is_err() {
        println!("ERROR: could not reach the storage server for '{filename}'");
        return;
    }
    if stream.flush().await.is_err() {
        return;
    }

    let mut first_reply = vec![0u8; 4096];
    let n = match stream.read(&mut first_reply).await {
        Ok(0) | Err(_) => {
            println!("ERROR: connection closed before the write session could start");
            return;
        }
        Ok(n) => n,
    };
    print!("{}", String::from_utf8_lossy(&first_reply[..n]));

    println!("Enter lines as '<word_index> <content>'. Type ETIRW to finish.");
    loop {
        let mut line = String::new();
        let read = stdin.read_line(&mut line).await;
        let line = match read {
            Ok(0) | Err(_) => break,
            Ok(_) => line.trim_end_matches(['\r', '\n']).to_string(),
        };

        let is_etirw = line.split_whitespace().next().map(|w| w.eq_ignore_ascii_case("ETIRW")).unwrap_or(false);

        if stream.write_all(format!("{line}\n").as_bytes()).await.is_err() {
            println!("ERROR: lost connection to the storage server mid-session");
            return;
        }
        if stream.flush().await.is_err() {
            return;
        }

        let mut reply = vec![0u8; 4096];
        match stream.read(&mut reply).await {
            Ok(0) | Err(_) => {
                println!("ERROR: connection closed mid-session");
                return;
            }
            Ok(n) => print!("{}", String::from_utf8_lossy(&reply[..n])),
        }

        if is_etirw {
            break;
        }
    }
    println!("Write session ended.");
}
