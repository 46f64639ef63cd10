mod common;

use common::Fixture;
use dfs_proto::frame::{self, Request};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start_write(stream: &mut TcpStream, user: &str, filename: &str, sentence: usize) -> String {
    let req = Request::Command {
        user: user.to_string(),
        pass: "irrelevant".to_string(),
        cmd: format!("WRITE {filename} {sentence}"),
    };
    stream.write_all(frame::encode_request(&req).as_bytes()).await.expect("write request");
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await.expect("read first reply");
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

async fn send_line(stream: &mut TcpStream, line: &str) -> String {
    stream.write_all(format!("{line}\n").as_bytes()).await.expect("write line");
    let mut buf = vec![0u8; 4096];
    let n = stream.read(&mut buf).await.expect("read reply");
    String::from_utf8_lossy(&buf[..n]).into_owned()
}

/// Scenario 3: a second writer is locked out of a sentence another client
/// holds, and regains access only once the holder commits with `ETIRW`.
#[tokio::test]
async fn second_writer_is_locked_out_until_first_commits() {
    let fixture = Fixture::spawn().await;
    fixture.command("alice", "CREATE story.txt").await;

    let mut a = fixture.connect().await;
    let first = start_write(&mut a, "alice", "story.txt", 0).await;
    assert!(first.to_lowercase().contains("locked"), "unexpected first reply: {first}");

    let mut b = fixture.connect().await;
    let second = start_write(&mut b, "bob", "story.txt", 0).await;
    assert!(
        second.contains("is locked by another user"),
        "expected bob to be rejected while alice holds the lock, got: {second}"
    );

    let commit_reply = send_line(&mut a, "ETIRW").await;
    assert!(commit_reply.to_lowercase().contains("success"), "commit should succeed: {commit_reply}");

    let mut b2 = fixture.connect().await;
    let retry = start_write(&mut b2, "bob", "story.txt", 0).await;
    assert!(!retry.contains("is locked by another user"), "bob should be able to acquire the lock now: {retry}");
    send_line(&mut b2, "ETIRW").await;
}

/// Scenario 2: access must be denied until the owner grants it through
/// `ADDACCESS`, and granted access takes effect immediately.
#[tokio::test]
async fn read_access_is_gated_by_acl() {
    let fixture = Fixture::spawn().await;
    fixture.command("alice", "CREATE notes.txt").await;

    let denied = fixture.command("bob", "READ notes.txt").await;
    assert!(denied.contains("Access denied"), "expected bob to be denied before ADDACCESS: {denied}");

    let grant = fixture.command("alice", "ADDACCESS -R notes.txt bob").await;
    assert!(grant.to_lowercase().contains("success"), "grant should succeed: {grant}");

    let allowed = fixture.command("bob", "READ notes.txt").await;
    assert!(!allowed.contains("Access denied"), "bob should be able to read after ADDACCESS: {allowed}");
}

/// A single WRITE session can append a new sentence and have it survive a
/// subsequent READ.
#[tokio::test]
async fn write_session_appends_and_persists() {
    let fixture = Fixture::spawn().await;
    fixture.command("alice", "CREATE diary.txt").await;

    let mut stream = fixture.connect().await;
    start_write(&mut stream, "alice", "diary.txt", 0).await;
    send_line(&mut stream, "0 Hello").await;
    send_line(&mut stream, "1 world.").await;
    let commit = send_line(&mut stream, "ETIRW").await;
    assert!(commit.to_lowercase().contains("success"), "commit should succeed: {commit}");

    let contents = fixture.command("alice", "READ diary.txt").await;
    assert!(contents.contains("Hello world."), "expected persisted sentence, got: {contents}");
}
