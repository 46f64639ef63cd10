//! Line-oriented wire framing shared by the name server, storage servers
//! and clients.
//!
//! Every message on the wire is UTF-8 text, newline separated `KEY:VALUE`
//! lines terminated by a bare `END` line. `LOCATE` is the one exception:
//! it travels as a single unframed line and gets a single unframed
//! reply, so a direct client can issue it without first building a full
//! envelope.

use std::collections::HashMap;
use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

/// Maximum number of bytes read while hunting for the terminating `END`
/// line.
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// A parsed request, already split into whichever shape the verb requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `TYPE:AUTH`, `USER:`, `PASS:`.
    Auth { user: String, pass: String },
    /// `TYPE:REGISTER_SS`, `IP:`, `NM_PORT:`, `CLIENT_PORT:`, `FILES:` (csv).
    RegisterSs { ip: String, nm_port: u16, client_port: u16, files: Vec<String> },
    /// `USER:`, `PASS:`, `CMD:<verb args...>`.
    Command { user: String, pass: String, cmd: String },
    /// Bare `LOCATE <file>` with no envelope.
    Locate { file: String },
}

/// Errors produced while reading or decoding a [`Request`].
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Eof,
    TooLarge,
    MissingField(&'static str),
    BadInteger(&'static str),
    UnknownFrame,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Eof => write!(f, "connection closed before a full frame arrived"),
            Error::TooLarge => write!(f, "frame exceeded {MAX_FRAME_BYTES} bytes"),
            Error::MissingField(name) => write!(f, "frame missing required field {name}"),
            Error::BadInteger(name) => write!(f, "field {name} was not a valid integer"),
            Error::UnknownFrame => write!(f, "frame had neither TYPE: nor CMD: set"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

/// Reads one frame from `reader`. Returns `Ok(None)` on a clean EOF before
/// any bytes were read (the normal way a connection ends between requests).
pub async fn read_request<R>(reader: &mut R) -> Result<Option<Request>, Error>
where
    R: AsyncBufReadExt + Unpin,
{
    let mut first = String::new();
    let n = reader.read_line(&mut first).await?;
    if n == 0 {
        return Ok(None);
    }
    let first_trimmed = first.trim_end_matches(['\r', '\n']);

    if let Some(file) = first_trimmed.strip_prefix("LOCATE ") {
        return Ok(Some(Request::Locate { file: file.trim().to_string() }));
    }

    let mut fields: HashMap<String, String> = HashMap::new();
    insert_field(&mut fields, first_trimmed);

    let mut total = first.len();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(Error::Eof);
        }
        total += line.len();
        if total > MAX_FRAME_BYTES {
            return Err(Error::TooLarge);
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "END" {
            break;
        }
        insert_field(&mut fields, trimmed);
    }

    decode_fields(fields)
}

fn insert_field(fields: &mut HashMap<String, String>, line: &str) {
    if let Some((key, value)) = line.split_once(':') {
        fields.insert(key.to_string(), value.to_string());
    }
}

fn decode_fields(mut fields: HashMap<String, String>) -> Result<Option<Request>, Error> {
    match fields.remove("TYPE").as_deref() {
        Some("AUTH") => {
            let user = fields.remove("USER").ok_or(Error::MissingField("USER"))?;
            let pass = fields.remove("PASS").ok_or(Error::MissingField("PASS"))?;
            Ok(Some(Request::Auth { user, pass }))
        }
        Some("REGISTER_SS") => {
            let ip = fields.remove("IP").ok_or(Error::MissingField("IP"))?;
            let nm_port = fields
                .remove("NM_PORT")
                .ok_or(Error::MissingField("NM_PORT"))?
                .parse()
                .map_err(|_| Error::BadInteger("NM_PORT"))?;
            let client_port = fields
                .remove("CLIENT_PORT")
                .ok_or(Error::MissingField("CLIENT_PORT"))?
                .parse()
                .map_err(|_| Error::BadInteger("CLIENT_PORT"))?;
            let files = fields
                .remove("FILES")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            Ok(Some(Request::RegisterSs { ip, nm_port, client_port, files }))
        }
        _ => {
            if let Some(cmd) = fields.remove("CMD") {
                let user = fields.remove("USER").ok_or(Error::MissingField("USER"))?;
                let pass = fields.remove("PASS").ok_or(Error::MissingField("PASS"))?;
                Ok(Some(Request::Command { user, pass, cmd }))
            } else {
                Err(Error::UnknownFrame)
            }
        }
    }
}

/// Serializes a [`Request`] the way [`read_request`] expects to parse it
/// back. Used by clients talking to the name server and by the name
/// server forwarding onward to a storage server.
pub fn encode_request(req: &Request) -> String {
    match req {
        Request::Auth { user, pass } => {
            format!("TYPE:AUTH\nUSER:{user}\nPASS:{pass}\nEND\n")
        }
        Request::RegisterSs { ip, nm_port, client_port, files } => {
            format!(
                "TYPE:REGISTER_SS\nIP:{ip}\nNM_PORT:{nm_port}\nCLIENT_PORT:{client_port}\nFILES:{}\nEND\n",
                files.join(",")
            )
        }
        Request::Command { user, pass, cmd } => {
            format!("USER:{user}\nPASS:{pass}\nCMD:{cmd}\nEND\n")
        }
        Request::Locate { file } => format!("LOCATE {file}\n"),
    }
}

/// Writes a pre-encoded frame and flushes it.
pub async fn write_line<W>(writer: &mut W, text: &str) -> io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    writer.write_all(text.as_bytes()).await?;
    writer.flush().await
}

/// `AUTH:SUCCESS` / `AUTH:FAILED` reply line.
pub fn encode_auth_reply(ok: bool) -> &'static str {
    if ok {
        "AUTH:SUCCESS\n"
    } else {
        "AUTH:FAILED\n"
    }
}

/// Parses an `AUTH:SUCCESS`/`AUTH:FAILED` reply.
pub fn parse_auth_reply(line: &str) -> bool {
    line.trim() == "AUTH:SUCCESS"
}

/// `SS_ID:<n>` reply line.
pub fn encode_register_reply(id: i32) -> String {
    format!("SS_ID:{id}\n")
}

/// Parses a `SS_ID:<n>` reply.
pub fn parse_register_reply(line: &str) -> Option<i32> {
    line.trim().strip_prefix("SS_ID:")?.parse().ok()
}

/// `SS_IP:<h>\nSS_PORT:<p>\n` reply.
pub fn encode_locate_reply(ip: &str, port: u16) -> String {
    format!("SS_IP:{ip}\nSS_PORT:{port}\n")
}

/// Parses a `SS_IP:`/`SS_PORT:` reply pair out of the two lines following a
/// successful `LOCATE`.
pub fn parse_locate_reply(text: &str) -> Option<(String, u16)> {
    let mut ip = None;
    let mut port = None;
    for line in text.lines() {
        if let Some(v) = line.strip_prefix("SS_IP:") {
            ip = Some(v.trim().to_string());
        } else if let Some(v) = line.strip_prefix("SS_PORT:") {
            port = v.trim().parse().ok();
        }
    }
    Some((ip?, port?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn parses_auth_frame() {
        let mut r = BufReader::new(Cursor::new(
            b"TYPE:AUTH\nUSER:alice\nPASS:hunter2\nEND\n".to_vec(),
        ));
        let req = read_request(&mut r).await.unwrap().unwrap();
        assert_eq!(req, Request::Auth { user: "alice".into(), pass: "hunter2".into() });
    }

    #[tokio::test]
    async fn parses_register_frame_with_files() {
        let mut r = BufReader::new(Cursor::new(
            b"TYPE:REGISTER_SS\nIP:127.0.0.1\nNM_PORT:8080\nCLIENT_PORT:8081\nFILES:a.txt,b.txt\nEND\n"
                .to_vec(),
        ));
        let req = read_request(&mut r).await.unwrap().unwrap();
        assert_eq!(
            req,
            Request::RegisterSs {
                ip: "127.0.0.1".into(),
                nm_port: 8080,
                client_port: 8081,
                files: vec!["a.txt".into(), "b.txt".into()],
            }
        );
    }

    #[tokio::test]
    async fn parses_command_frame() {
        let mut r = BufReader::new(Cursor::new(
            b"USER:alice\nPASS:hunter2\nCMD:READ hello.txt\nEND\n".to_vec(),
        ));
        let req = read_request(&mut r).await.unwrap().unwrap();
        assert_eq!(
            req,
            Request::Command { user: "alice".into(), pass: "hunter2".into(), cmd: "READ hello.txt".into() }
        );
    }

    #[tokio::test]
    async fn parses_bare_locate() {
        let mut r = BufReader::new(Cursor::new(b"LOCATE hello.txt\n".to_vec()));
        let req = read_request(&mut r).await.unwrap().unwrap();
        assert_eq!(req, Request::Locate { file: "hello.txt".into() });
    }

    #[tokio::test]
    async fn clean_eof_before_any_bytes_is_none() {
        let mut r = BufReader::new(Cursor::new(Vec::new()));
        assert!(read_request(&mut r).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncated_frame_is_an_error() {
        let mut r = BufReader::new(Cursor::new(b"USER:alice\nPASS:x\n".to_vec()));
        assert!(matches!(read_request(&mut r).await, Err(Error::Eof)));
    }

    #[test]
    fn round_trips_locate_reply() {
        let text = encode_locate_reply("10.0.0.5", 8082);
        assert_eq!(parse_locate_reply(&text), Some(("10.0.0.5".to_string(), 8082)));
    }

    #[test]
    fn round_trips_register_reply() {
        assert_eq!(parse_register_reply(&encode_register_reply(3)), Some(3));
        assert_eq!(parse_register_reply(&encode_register_reply(-1)), Some(-1));
    }
}
