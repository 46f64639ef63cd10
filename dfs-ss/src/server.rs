//! Per-connection command dispatcher: parses a forwarded `Command` frame
//! and routes each verb to the storage/ACL/undo/checkpoint/write-coordinator
//! modules.
//!
//! Unlike the name server, a storage server never talks to the credential
//! oracle: the `USER` field in a forwarded command has already been
//! authenticated upstream, so it's trusted as-is for ACL checks.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tracing::{info, warn};

use dfs_proto::command::{split_first_token, split_verb};
use dfs_proto::frame::{self, Request};

use crate::acl_store::AclStore;
use crate::checkpoint::CheckpointEngine;
use crate::engine::{Engine, LocalEngine};
use crate::error::Error;
use crate::layout::Layout;
use crate::locks::LockTable;
use crate::undo::UndoEngine;
use crate::write_coord::{StartOutcome, WriteSession};

/// State shared by every connection handler on one storage server.
pub struct Shared {
    pub layout: Layout,
    pub engine: LocalEngine,
    pub locks: LockTable,
}

pub async fn handle_connection(stream: TcpStream, shared: Arc<Shared>) {
    let peer = stream.peer_addr().ok();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = match frame::read_request(&mut reader).await {
        Ok(Some(req)) => req,
        Ok(None) => return,
        Err(e) => {
            warn!(?peer, error = %e, "failed to read forwarded command frame");
            return;
        }
    };

    let Request::Command { user, cmd, .. } = request else {
        let _ = frame::write_line(&mut write_half, "Invalid command.\n").await;
        return;
    };

    let (verb, rest) = split_verb(&cmd);
    info!(%user, %verb, ?peer, "dispatching command");

    match verb {
        "VIEW" => {
            let reply = handle_view(&shared, rest).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "READ" => {
            let reply = handle_read(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "CREATE" => {
            let reply = handle_create(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "DELETE" => {
            let reply = handle_delete(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "INFO" => {
            let reply = handle_info(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "STREAM" => {
            handle_stream(&shared, rest, &user, &mut write_half).await;
        }
        "UNDO" => {
            let reply = handle_undo(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "CHECKPOINT" => {
            let reply = handle_checkpoint(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "VIEWCHECKPOINT" => {
            let reply = handle_view_checkpoint(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "REVERT" => {
            let reply = handle_revert(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "LISTCHECKPOINTS" => {
            let reply = handle_list_checkpoints(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "ADDACCESS" => {
            let reply = handle_addaccess(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "REMACCESS" => {
            let reply = handle_remaccess(&shared, rest, &user).await;
            let _ = frame::write_line(&mut write_half, &reply).await;
        }
        "WRITE" => {
            handle_write_session(&shared, rest, &user, &mut reader, &mut write_half).await;
        }
        _ => {
            let _ = frame::write_line(&mut write_half, "Invalid command.\n").await;
        }
    }
}

async fn handle_view(shared: &Shared, rest: &str) -> String {
    let show_all = rest.contains("-a") || rest.contains("-la") || rest.contains("-al");
    let show_long = rest.contains("-l") || rest.contains("-la") || rest.contains("-al");

    let mut entries = match tokio::fs::read_dir(shared.layout.files_dir()).await {
        Ok(e) => e,
        Err(_) => return "ERROR: Cannot open files directory.\n".to_string(),
    };

    let mut names = Vec::new();
    loop {
        let next = entries.next_entry().await;
        let Ok(Some(entry)) = next else { break };
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !show_all && name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();

    if names.is_empty() {
        return "(no files found or no access)\n".to_string();
    }

    if !show_long {
        let mut out = String::new();
        for name in &names {
            out.push_str(name);
            out.push('\n');
        }
        return out;
    }

    let store = AclStore::new(&shared.layout);
    let mut out = String::from("Name                 Words   Chars   Owner       Modified\n");
    for name in &names {
        let contents = tokio::fs::read_to_string(shared.layout.file_path(name)).await.unwrap_or_default();
        let words = contents.split_whitespace().count();
        let chars = contents.chars().count();
        let owner = store.read(name).await.map(|m| m.owner).unwrap_or_else(|_| "unknown".to_string());
        out.push_str(&format!("{name:<20} {words:>6} {chars:>6}  {owner:<10}\n"));
    }
    out.push_str(&format!("Total files: {}\n", names.len()));
    out
}

async fn handle_read(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        return "Error: Please specify a filename\n".to_string();
    }
    match shared.engine.read(filename, user).await {
        Ok(bytes) if bytes.is_empty() => format!("(File '{filename}' is empty)\n"),
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(Error::NotFound) => format!("Error: File '{filename}' not found or cannot be opened\n"),
        Err(Error::AccessDenied) => {
            format!("Error: Access denied. You do not have permission to read '{filename}'\n")
        }
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_create(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        return "Error: Please specify a filename\n".to_string();
    }
    match shared.engine.create(filename, user).await {
        Ok(()) => format!("Success: File '{filename}' created successfully\n"),
        Err(Error::Conflict) => format!("Error: File '{filename}' already exists\n"),
        Err(e) => format!("Error: Cannot create file '{filename}': {e}\n"),
    }
}

async fn handle_delete(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        return "Error: Please specify a filename\n".to_string();
    }
    match shared.engine.delete(filename, user).await {
        Ok(()) => format!("File '{filename}' deleted successfully\n"),
        Err(Error::AccessDenied) => {
            format!("Error: Access denied. You do not have permission to delete '{filename}'\n")
        }
        Err(Error::NotFound) => format!("Error: File '{filename}' not found\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_info(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        return "Error: Please specify a filename\n".to_string();
    }
    match shared.engine.info(filename, user).await {
        Ok(text) => text,
        Err(Error::AccessDenied) => {
            format!("ERROR: Access denied. You do not have permission to view info for '{filename}'.\n")
        }
        Err(Error::NotFound) => format!("ERROR: File '{filename}' not found or inaccessible.\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_stream(shared: &Shared, rest: &str, user: &str, out: &mut (dyn AsyncWrite + Unpin + Send)) {
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        let _ = frame::write_line(out, "Error: Please specify a filename\n").await;
        return;
    }
    if let Err(e) = shared.engine.stream(filename, user, out).await {
        let msg = match e {
            Error::NotFound => format!("ERROR: Cannot open file '{filename}'\n"),
            Error::AccessDenied => "ERROR: Access denied.\n".to_string(),
            other => format!("ERROR: {other}\n"),
        };
        let _ = frame::write_line(out, &msg).await;
    }
}

async fn handle_undo(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        return "Error: Please specify a filename\n".to_string();
    }
    let undo = UndoEngine::new(&shared.layout);
    match undo.undo(filename, user).await {
        Ok(()) => format!("Success: '{filename}' reverted to its previous version.\n"),
        Err(Error::NotFound) => format!("ERROR: No undo history for '{filename}'.\n"),
        Err(Error::AccessDenied) => format!("ERROR: Access denied for '{filename}'.\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_checkpoint(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, rest) = split_first_token(rest);
    let (tag, _) = split_first_token(rest);
    if filename.is_empty() || tag.is_empty() {
        return "Usage: CHECKPOINT <file> <tag>\n".to_string();
    }
    let ckpt = CheckpointEngine::new(&shared.layout);
    match ckpt.create(filename, tag, user).await {
        Ok(()) => format!("Success: Checkpoint '{tag}' created for '{filename}'.\n"),
        Err(Error::Conflict) => format!("ERROR: Checkpoint '{tag}' already exists for '{filename}'.\n"),
        Err(Error::NotFound) => format!("ERROR: File '{filename}' not found.\n"),
        Err(Error::AccessDenied) => format!("ERROR: Access denied for '{filename}'.\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_view_checkpoint(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, rest) = split_first_token(rest);
    let (tag, _) = split_first_token(rest);
    if filename.is_empty() || tag.is_empty() {
        return "Usage: VIEWCHECKPOINT <file> <tag>\n".to_string();
    }
    let ckpt = CheckpointEngine::new(&shared.layout);
    match ckpt.view(filename, tag, user).await {
        Ok(text) => text,
        Err(Error::NotFound) => format!("ERROR: No checkpoint '{tag}' for '{filename}'.\n"),
        Err(Error::AccessDenied) => format!("ERROR: Access denied for '{filename}'.\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_revert(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, rest) = split_first_token(rest);
    let (tag, _) = split_first_token(rest);
    if filename.is_empty() || tag.is_empty() {
        return "Usage: REVERT <file> <tag>\n".to_string();
    }
    let ckpt = CheckpointEngine::new(&shared.layout);
    match ckpt.revert(filename, tag, user).await {
        Ok(()) => format!("Success: '{filename}' reverted to checkpoint '{tag}'.\n"),
        Err(Error::NotFound) => format!("ERROR: No checkpoint '{tag}' for '{filename}'.\n"),
        Err(Error::AccessDenied) => format!("ERROR: Access denied for '{filename}'.\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_list_checkpoints(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        return "Error: Please specify a filename\n".to_string();
    }
    let ckpt = CheckpointEngine::new(&shared.layout);
    match ckpt.list(filename, user).await {
        Ok(rows) if rows.is_empty() => format!("No checkpoints for '{filename}'.\n"),
        Ok(rows) => {
            let mut out = String::from("Tag            Created              Size    By\n");
            for row in rows {
                out.push_str(&format!("{:<14} {:<20} {:>6}  {}\n", row.tag, row.created, row.size, row.created_by));
            }
            out
        }
        Err(Error::AccessDenied) => format!("ERROR: Access denied for '{filename}'.\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_addaccess(shared: &Shared, rest: &str, user: &str) -> String {
    let (flag, rest) = split_first_token(rest);
    let (filename, rest) = split_first_token(rest);
    let (target, _) = split_first_token(rest);
    if filename.is_empty() || target.is_empty() {
        return "Usage: ADDACCESS -R|-W <file> <user>\n".to_string();
    }

    let store = AclStore::new(&shared.layout);
    match store.check_write(filename, user).await {
        Ok(()) => {}
        Err(_) => {
            // Only the owner may grant access; `check_write` already
            // covers the owner, so anyone else reaching here lacks it.
            return format!("Error: Only the owner of '{filename}' may grant access.\n");
        }
    }

    let result = match flag {
        "-R" => store.add_read(filename, target).await,
        "-W" => store.add_write(filename, target).await,
        _ => return "Usage: ADDACCESS -R|-W <file> <user>\n".to_string(),
    };

    match result {
        Ok(()) if flag == "-R" => format!("Success: Read access granted to '{target}' for file '{filename}'\n"),
        Ok(()) => format!("Success: Write access granted to '{target}' for file '{filename}'\n"),
        Err(Error::NotFound) => format!("ERROR: File '{filename}' not found.\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_remaccess(shared: &Shared, rest: &str, user: &str) -> String {
    let (filename, rest) = split_first_token(rest);
    let (target, _) = split_first_token(rest);
    if filename.is_empty() || target.is_empty() {
        return "Usage: REMACCESS <file> <user>\n".to_string();
    }

    let store = AclStore::new(&shared.layout);
    if store.check_write(filename, user).await.is_err() {
        return format!("Error: Only the owner of '{filename}' may revoke access.\n");
    }

    match store.remove_all(filename, target).await {
        Ok(()) => format!("Success: Access revoked for '{target}' on file '{filename}'\n"),
        Err(Error::AccessDenied) => "Error: Cannot revoke the owner's own access.\n".to_string(),
        Err(Error::NotFound) => format!("ERROR: File '{filename}' not found.\n"),
        Err(e) => format!("ERROR: {e}\n"),
    }
}

async fn handle_write_session<R, W>(shared: &Shared, rest: &str, user: &str, reader: &mut R, out: &mut W)
where
    R: AsyncBufReadExt + Unpin,
    W: AsyncWrite + Unpin,
{
    let (filename, rest) = split_first_token(rest);
    let sentence_index: Option<usize> = split_first_token(rest).0.parse().ok();
    let (Some(sentence_index), false) = (sentence_index, filename.is_empty()) else {
        let _ = frame::write_line(out, "Usage: WRITE <filename> <sentence_number>\n").await;
        return;
    };

    let outcome = match WriteSession::start(&shared.layout, &shared.locks, filename, sentence_index, user).await {
        Ok(outcome) => outcome,
        Err(Error::AccessDenied) => {
            let _ = frame::write_line(out, "Error: Access denied.\n").await;
            return;
        }
        Err(Error::Range(msg)) => {
            let _ = frame::write_line(out, &format!("ERROR: {msg}\n")).await;
            return;
        }
        Err(e) => {
            let _ = frame::write_line(out, &format!("ERROR: {e}\n")).await;
            return;
        }
    };

    let mut session = match outcome {
        StartOutcome::AlreadyLocked => {
            let _ = frame::write_line(
                out,
                &format!("ERROR: Sentence {sentence_index} is locked by another user.\n"),
            )
            .await;
            return;
        }
        StartOutcome::Locked { session, ack } => {
            let _ = frame::write_line(out, &ack).await;
            session
        }
    };

    loop {
        let mut line = String::new();
        let n = match reader.read_line(&mut line).await {
            Ok(n) => n,
            Err(_) => {
                session.abort().await;
                return;
            }
        };
        if n == 0 {
            session.abort().await;
            return;
        }
        let trimmed = line.trim_end_matches(['\r', '\n']);

        if trimmed == "ETIRW" {
            match session.commit().await {
                Ok(msg) => {
                    let _ = frame::write_line(out, &msg).await;
                }
                Err(e) => {
                    let _ = frame::write_line(out, &format!("ERROR: Unable to save file: {e}\n")).await;
                }
            }
            return;
        }

        let (index_tok, content) = split_first_token(trimmed);
        let Ok(word_index) = index_tok.parse::<usize>() else {
            let _ = frame::write_line(out, "ERROR: Invalid format. Use '<word_index> <content>' or 'ETIRW'.\n").await;
            continue;
        };

        match session.apply_edit(word_index, content).await {
            Ok(msg) => {
                let _ = frame::write_line(out, &msg).await;
            }
            Err(Error::Range(msg)) => {
                let _ = frame::write_line(out, &format!("ERROR: {msg}\n")).await;
            }
            Err(e) => {
                let _ = frame::write_line(out, &format!("ERROR: {e}\n")).await;
            }
        }
    }
}
