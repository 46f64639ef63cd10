mod common;

use common::Fixture;

/// A tagged checkpoint can be reverted back to after later edits,
/// round-tripping through CHECKPOINT/WRITE/REVERT on real sockets.
#[tokio::test]
async fn checkpoint_then_revert_restores_earlier_contents() {
    let fixture = Fixture::spawn().await;
    fixture.command("alice", "CREATE log.txt").await;

    // Seed an initial sentence through a real WRITE session.
    {
        let mut stream = fixture.connect().await;
        write_sentence(&mut stream, "alice", "log.txt", 0, &["0 First.", "ETIRW"]).await;
    }
    let before = fixture.command("alice", "READ log.txt").await;
    assert!(before.contains("First."), "unexpected contents before checkpoint: {before}");

    let checkpoint = fixture.command("alice", "CHECKPOINT log.txt v1").await;
    assert!(checkpoint.starts_with("Success:"), "unexpected checkpoint reply: {checkpoint}");

    // Overwrite the sentence after the checkpoint was taken.
    {
        let mut stream = fixture.connect().await;
        write_sentence(&mut stream, "alice", "log.txt", 0, &["0 Second.", "ETIRW"]).await;
    }
    let after_edit = fixture.command("alice", "READ log.txt").await;
    assert!(after_edit.contains("Second."), "unexpected contents after edit: {after_edit}");

    let revert = fixture.command("alice", "REVERT log.txt v1").await;
    assert!(revert.starts_with("Success:"), "unexpected revert reply: {revert}");

    let restored = fixture.command("alice", "READ log.txt").await;
    assert!(restored.contains("First."), "expected checkpointed contents restored: {restored}");
}

/// A single UNDO reverts the most recent committed WRITE, and a second
/// UNDO swaps back -- the bistate undo behavior.
#[tokio::test]
async fn undo_swaps_between_the_two_most_recent_versions() {
    let fixture = Fixture::spawn().await;
    fixture.command("alice", "CREATE diary.txt").await;

    {
        let mut stream = fixture.connect().await;
        write_sentence(&mut stream, "alice", "diary.txt", 0, &["0 One.", "ETIRW"]).await;
    }
    {
        let mut stream = fixture.connect().await;
        write_sentence(&mut stream, "alice", "diary.txt", 0, &["0 Two.", "ETIRW"]).await;
    }
    let latest = fixture.command("alice", "READ diary.txt").await;
    assert!(latest.contains("Two."), "unexpected latest contents: {latest}");

    let undo_once = fixture.command("alice", "UNDO diary.txt").await;
    assert!(undo_once.starts_with("Success:"), "unexpected undo reply: {undo_once}");
    let reverted = fixture.command("alice", "READ diary.txt").await;
    assert!(reverted.contains("One."), "expected prior version after one UNDO: {reverted}");

    let undo_twice = fixture.command("alice", "UNDO diary.txt").await;
    assert!(undo_twice.starts_with("Success:"), "unexpected second undo reply: {undo_twice}");
    let back_to_latest = fixture.command("alice", "READ diary.txt").await;
    assert!(back_to_latest.contains("Two."), "expected double-UNDO to swap back: {back_to_latest}");
}

async fn write_sentence(
    stream: &mut tokio::net::TcpStream,
    user: &str,
    filename: &str,
    sentence: usize,
    lines: &[&str],
) {
    use dfs_proto::frame::{self, Request};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let req = Request::Command {
        user: user.to_string(),
        pass: "irrelevant".to_string(),
        cmd: format!("WRITE {filename} {sentence}"),
    };
    stream.write_all(frame::encode_request(&req).as_bytes()).await.expect("write request");
    let mut buf = vec![0u8; 4096];
    stream.read(&mut buf).await.expect("read first reply");

    for line in lines {
        stream.write_all(format!("{line}\n").as_bytes()).await.expect("write line");
        let mut reply = vec![0u8; 4096];
        stream.read(&mut reply).await.expect("read reply");
    }
}
