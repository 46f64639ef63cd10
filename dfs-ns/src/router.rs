//! Command routing: dispatches each verb off a forwarded client command.
//!
//! Every file-scoped verb resolves a target storage server through
//! [`NsState::resolve_target`] and either forwards-and-relays the raw
//! response (`bridge::forward_and_relay`) or bridges bidirectionally for
//! WRITE. VIEW fans out, INFO is served from the index alone, and
//! ADDACCESS/REMACCESS mutate the index and then converge the owning
//! SS's own ACL sidecar before replying: the name server is the
//! authority, but a storage server enforces its own ACLs independently,
//! so a read immediately following a grant needs the SS synced first.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use dfs_proto::command::{split_first_token, split_verb};
use dfs_proto::frame;
use dfs_proto::meta::FileMeta;

use crate::bridge;
use crate::exec;
use crate::state::{MutateOutcome, NsState};

/// Verbs forwarded to a single SS and relayed back to the client
/// unmodified, once a target is resolved.
const SIMPLE_FILE_VERBS: &[&str] =
    &["READ", "STREAM", "UNDO", "CHECKPOINT", "VIEWCHECKPOINT", "REVERT", "LISTCHECKPOINTS"];

pub async fn dispatch<C>(state: &NsState, user: &str, pass: &str, cmd: &str, client: &mut C)
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let (verb, rest) = split_verb(cmd);
    info!(%user, %verb, "routing command");

    match verb {
        "VIEW" => handle_view(state, user, pass, rest, client).await,
        "LOCATE" => handle_locate(state, rest, client).await,
        "INFO" => handle_info(state, rest, client).await,
        "ADDACCESS" => handle_addaccess(state, user, pass, rest, client).await,
        "REMACCESS" => handle_remaccess(state, user, pass, rest, client).await,
        "CREATE" => handle_create(state, user, pass, rest, client).await,
        "DELETE" => handle_delete(state, user, pass, rest, client).await,
        "EXEC" => handle_exec(state, user, pass, rest, client).await,
        "WRITE" => handle_write(state, user, pass, rest, client).await,
        "LIST" => handle_list(state, client).await,
        verb if SIMPLE_FILE_VERBS.contains(&verb) => handle_simple_forward(state, user, pass, verb, rest, client).await,
        _ => {
            let _ = frame::write_line(client, "Invalid command.\n").await;
        }
    }
}

async fn handle_view<C>(state: &NsState, user: &str, pass: &str, flags: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let servers = state.active_servers().await;
    let cmd = if flags.is_empty() { "VIEW".to_string() } else { format!("VIEW {flags}") };
    let text = bridge::fan_out_view(&servers, user, pass, &cmd).await;
    let _ = frame::write_line(client, &text).await;
}

async fn handle_locate<C>(state: &NsState, rest: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let (filename, _) = split_first_token(rest);
    let reply = match state.file_meta(filename).await {
        Some(meta) => {
            let mut found = None;
            for ss_id in meta.ss_ids {
                if let Some(desc) = state.descriptor(ss_id).await {
                    found = Some(desc);
                    break;
                }
            }
            match found {
                Some(desc) => frame::encode_locate_reply(&desc.ip.to_string(), desc.client_port),
                None => "ERROR: File's storage server is not currently active.\n".to_string(),
            }
        }
        None => format!("ERROR: File '{filename}' not found.\n"),
    };
    let _ = frame::write_line(client, &reply).await;
}

fn format_info(meta: &FileMeta) -> String {
    let ss_ids = meta.ss_ids.iter().map(u32::to_string).collect::<Vec<_>>().join(",");
    format!(
        "------------------- FILE INFO -------------------\n\
         File Name      : {}\n\
         Owner          : {}\n\
         Created        : {}\n\
         Last Modified  : {}\n\
         Last Access    : {}\n\
         Read Access    : {}\n\
         Write Access   : {}\n\
         Storage Servers: {}\n\
         -------------------------------------------------\n",
        meta.name, meta.owner, meta.created, meta.modified, meta.accessed, meta.read_users, meta.write_users, ss_ids,
    )
}

async fn handle_info<C>(state: &NsState, rest: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let (filename, _) = split_first_token(rest);
    let reply = match state.file_meta(filename).await {
        Some(meta) => format_info(&meta),
        None => format!("ERROR: File '{filename}' not found.\n"),
    };
    let _ = frame::write_line(client, &reply).await;
}

/// Pushes a single ACL mutation onto the file's owning SS so a command
/// issued right after an ADDACCESS/REMACCESS observes the grant/revoke.
/// Converges eagerly, as part of handling the very command that changed
/// the index, rather than waiting for an unrelated SS-side command to
/// drag the sidecar into sync.
async fn sync_acl_to_ss(state: &NsState, owner: &str, filename: &str, cmd: &str) {
    let Some(target) = state.resolve_target(filename, false).await else { return };
    if let Err(e) = bridge::forward_and_collect(&target, owner, "", cmd).await {
        warn!(filename, cmd, error = %e, "failed to converge SS-side ACL");
    }
}

async fn handle_addaccess<C>(state: &NsState, user: &str, _pass: &str, rest: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let (flag, rest) = split_first_token(rest);
    let (filename, rest) = split_first_token(rest);
    let (target, _) = split_first_token(rest);
    if filename.is_empty() || target.is_empty() || (flag != "-R" && flag != "-W") {
        let _ = frame::write_line(client, "Usage: ADDACCESS -R|-W <file> <user>\n").await;
        return;
    }

    let outcome = state
        .mutate_access(filename, user, |meta| {
            if flag == "-R" {
                meta.read_users.insert(target);
            } else {
                meta.write_users.insert(target);
            }
        })
        .await;

    let reply = match outcome {
        None => format!("ERROR: File '{filename}' not found.\n"),
        Some(MutateOutcome::NotOwner) => format!("Error: Only the owner of '{filename}' may grant access.\n"),
        Some(MutateOutcome::Applied) => {
            sync_acl_to_ss(state, user, filename, &format!("ADDACCESS {flag} {filename} {target}")).await;
            if flag == "-R" {
                format!("Success: Read access granted to '{target}' for file '{filename}'\n")
            } else {
                format!("Success: Write access granted to '{target}' for file '{filename}'\n")
            }
        }
    };
    let _ = frame::write_line(client, &reply).await;
}

async fn handle_remaccess<C>(state: &NsState, user: &str, _pass: &str, rest: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let (filename, rest) = split_first_token(rest);
    let (target, _) = split_first_token(rest);
    if filename.is_empty() || target.is_empty() {
        let _ = frame::write_line(client, "Usage: REMACCESS <file> <user>\n").await;
        return;
    }

    let outcome = state
        .mutate_access(filename, user, |meta| {
            meta.read_users.remove(target);
            meta.write_users.remove(target);
        })
        .await;

    let reply = match outcome {
        None => format!("ERROR: File '{filename}' not found.\n"),
        Some(MutateOutcome::NotOwner) => format!("Error: Only the owner of '{filename}' may revoke access.\n"),
        Some(MutateOutcome::Applied) => {
            sync_acl_to_ss(state, user, filename, &format!("REMACCESS {filename} {target}")).await;
            format!("Success: Access revoked for '{target}' on file '{filename}'\n")
        }
    };
    let _ = frame::write_line(client, &reply).await;
}

async fn handle_create<C>(state: &NsState, user: &str, pass: &str, rest: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        let _ = frame::write_line(client, "Error: Please specify a filename\n").await;
        return;
    }

    let Some(target) = state.resolve_target(filename, true).await else {
        let _ = frame::write_line(client, "No storage server available\n").await;
        return;
    };

    let reply = match bridge::forward_and_collect(&target, user, pass, &format!("CREATE {filename}")).await {
        Ok(text) => text,
        Err(e) => format!("ERROR: transport error creating '{filename}': {e}\n"),
    };
    if reply.starts_with("Success:") {
        state.record_created(filename, user, target.id).await;
    }
    let _ = frame::write_line(client, &reply).await;
}

async fn handle_delete<C>(state: &NsState, user: &str, pass: &str, rest: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        let _ = frame::write_line(client, "Error: Please specify a filename\n").await;
        return;
    }

    let Some(target) = state.resolve_target(filename, false).await else {
        let _ = frame::write_line(client, "No storage server available\n").await;
        return;
    };

    let reply = match bridge::forward_and_collect(&target, user, pass, &format!("DELETE {filename}")).await {
        Ok(text) => text,
        Err(e) => format!("ERROR: transport error deleting '{filename}': {e}\n"),
    };
    if reply.contains("deleted successfully") {
        state.record_deleted(filename, target.id).await;
    }
    let _ = frame::write_line(client, &reply).await;
}

async fn handle_exec<C>(state: &NsState, user: &str, pass: &str, rest: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        let _ = frame::write_line(client, "Error: Please specify a filename\n").await;
        return;
    }
    if !state.enable_exec {
        let _ = frame::write_line(client, "ERROR: EXEC is disabled on this name server.\n").await;
        return;
    }
    let Some(target) = state.resolve_target(filename, false).await else {
        let _ = frame::write_line(client, "No storage server available\n").await;
        return;
    };
    exec::exec_file(&target, user, pass, filename, client).await;
}

async fn handle_simple_forward<C>(state: &NsState, user: &str, pass: &str, verb: &str, rest: &str, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        let _ = frame::write_line(client, "Error: Please specify a filename\n").await;
        return;
    }
    let Some(target) = state.resolve_target(filename, false).await else {
        let _ = frame::write_line(client, "No storage server available\n").await;
        return;
    };
    if let Err(e) = bridge::forward_and_relay(&target, user, pass, &format!("{verb} {rest}"), client).await {
        warn!(filename, %verb, error = %e, "transport error forwarding command");
        let _ = frame::write_line(client, &format!("ERROR: transport error: {e}\n")).await;
    }
}

async fn handle_write<C>(state: &NsState, user: &str, pass: &str, rest: &str, client: &mut C)
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let (filename, _) = split_first_token(rest);
    if filename.is_empty() {
        let _ = frame::write_line(client, "Usage: WRITE <filename> <sentence_number>\n").await;
        return;
    }
    let Some(target) = state.resolve_target(filename, false).await else {
        let _ = frame::write_line(client, "No storage server available\n").await;
        return;
    };
    if let Err(e) = bridge::bidirectional_relay(client, &target, user, pass, &format!("WRITE {rest}")).await {
        warn!(filename, error = %e, "transport error during WRITE bridge");
    }
}

async fn handle_list<C>(state: &NsState, client: &mut C)
where
    C: AsyncWrite + Unpin,
{
    let users = state.credentials.list_users().await;
    let mut out = String::from("Registered users:\n");
    for user in users {
        out.push_str(&user);
        out.push('\n');
    }
    let _ = frame::write_line(client, &out).await;
}
