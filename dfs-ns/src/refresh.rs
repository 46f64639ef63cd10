//! Post-registration file-index refresh: once a storage server
//! registers, the name server asks it what it already holds and merges
//! that into the index.
//!
//! A naive approach fetches a directory listing with `VIEW -al`, then
//! re-queries `INFO` per file impersonating some fixed account -- which
//! only works if that account happens to be granted access to every
//! file. A storage server enforces read access on `INFO` independent of
//! the name server (see `dfs-ss`'s `AclStore`), so a fixed impersonated
//! identity isn't actually guaranteed to see every file's full metadata.
//! Instead this impersonates each file's owner, read straight off
//! `VIEW -al`'s own Owner column, which is always allowed to see its own
//! file.

use tracing::warn;

use dfs_proto::meta::FileMeta;

use crate::bridge;
use crate::registry::SsDescriptor;
use crate::state::NsState;

/// Identity used only for the directory listing itself; `VIEW` doesn't
/// gate access per-user, so any string satisfies the forwarded
/// command's envelope.
const LISTING_IDENTITY: &str = "nameserver";

pub async fn refresh_from_ss(state: &NsState, desc: &SsDescriptor) {
    let listing = match bridge::forward_and_collect(desc, LISTING_IDENTITY, "", "VIEW -al").await {
        Ok(text) => text,
        Err(e) => {
            warn!(ss_id = desc.id, error = %e, "failed to fetch directory listing during refresh");
            return;
        }
    };

    for (name, owner) in parse_view_long(&listing) {
        let info = match bridge::forward_and_collect(desc, &owner, "", &format!("INFO {name}")).await {
            Ok(text) => text,
            Err(e) => {
                warn!(ss_id = desc.id, filename = %name, error = %e, "failed to fetch file info during refresh");
                continue;
            }
        };
        let Some(mut meta) = parse_info(&name, &info) else {
            warn!(ss_id = desc.id, filename = %name, "could not parse INFO response during refresh");
            continue;
        };
        meta.ss_ids.push(desc.id);
        state.refresh_meta(meta).await;
    }
}

/// Parses `VIEW -al`'s data rows (`name words chars owner`), skipping the
/// header and trailing `Total files:` line.
fn parse_view_long(text: &str) -> Vec<(String, String)> {
    text.lines()
        .filter(|line| !line.starts_with("Name") && !line.starts_with("Total files:") && !line.trim().is_empty())
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let name = cols.next()?.to_string();
            let _words = cols.next()?;
            let _chars = cols.next()?;
            let owner = cols.next()?.to_string();
            Some((name, owner))
        })
        .collect()
}

/// Parses the `LocalEngine::info` text block back into a [`FileMeta`].
fn parse_info(name: &str, text: &str) -> Option<FileMeta> {
    let mut owner = None;
    let mut created = None;
    let mut modified = None;
    let mut accessed = None;
    let mut read_users = None;
    let mut write_users = None;

    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else { continue };
        let value = value.trim();
        match key.trim() {
            "Owner" => owner = Some(value.to_string()),
            "Created" => created = value.parse().ok(),
            "Last Modified" => modified = value.parse().ok(),
            "Last Access" => accessed = value.parse().ok(),
            "Read Access" => read_users = Some(dfs_proto::acl::AccessList::from_csv(value)),
            "Write Access" => write_users = Some(dfs_proto::acl::AccessList::from_csv(value)),
            _ => {}
        }
    }

    Some(FileMeta {
        name: name.to_string(),
        owner: owner?,
        created: created?,
        modified: modified?,
        accessed: accessed?,
        read_users: read_users?,
        write_users: write_users?,
        ss_ids: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_view_long_rows() {
        let text = "Name                 Words   Chars   Owner       Modified\n\
                     a.txt                     3      12  alice     \n\
                     b.txt                     0       0  bob       \n\
                     Total files: 2\n";
        let rows = parse_view_long(text);
        assert_eq!(rows, vec![("a.txt".to_string(), "alice".to_string()), ("b.txt".to_string(), "bob".to_string())]);
    }

    #[test]
    fn parses_info_block() {
        let text = "------------------- FILE INFO -------------------\n\
                     File Name      : a.txt\n\
                     File Size      : 12 bytes\n\
                     Owner          : alice\n\
                     Created        : 100\n\
                     Last Modified  : 200\n\
                     Last Access    : 300\n\
                     Read Access    : alice,bob\n\
                     Write Access   : alice\n\
                     -------------------------------------------------\n";
        let meta = parse_info("a.txt", text).unwrap();
        assert_eq!(meta.owner, "alice");
        assert_eq!(meta.created, 100);
        assert_eq!(meta.modified, 200);
        assert_eq!(meta.accessed, 300);
        assert!(meta.can_read("bob"));
        assert!(!meta.can_write("bob"));
    }
}
