//! File metadata shared between the storage server's on-disk sidecar and
//! the name server's in-memory index mirror.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::acl::AccessList;

/// Maximum filename length: no path separators, at most this many bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Unix timestamp, seconds since the epoch. The sidecar format stores
/// this as a plain decimal integer.
pub type Timestamp = i64;

pub fn now() -> Timestamp {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

/// Authoritative-on-SS, mirrored-on-NS file metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub owner: String,
    pub created: Timestamp,
    pub modified: Timestamp,
    pub accessed: Timestamp,
    pub read_users: AccessList,
    pub write_users: AccessList,
    /// Owning storage-server ids. Always empty in the SS-local sidecar
    /// (a storage server doesn't need to name itself); populated on the
    /// name server's index mirror.
    pub ss_ids: Vec<u32>,
}

impl FileMeta {
    /// Builds the metadata for a brand-new file: owner is seeded into
    /// both access lists and every timestamp is "now".
    pub fn new_file(name: impl Into<String>, owner: impl Into<String>) -> Self {
        let owner = owner.into();
        let ts = now();
        let mut read_users = AccessList::new();
        read_users.insert(&owner);
        let mut write_users = AccessList::new();
        write_users.insert(&owner);
        Self {
            name: name.into(),
            owner,
            created: ts,
            modified: ts,
            accessed: ts,
            read_users,
            write_users,
            ss_ids: Vec::new(),
        }
    }

    pub fn can_read(&self, user: &str) -> bool {
        user == self.owner || self.read_users.contains(user)
    }

    pub fn can_write(&self, user: &str) -> bool {
        user == self.owner || self.write_users.contains(user)
    }
}

/// Validates a filename: non-empty, at most [`MAX_NAME_LEN`] bytes, and
/// no path separators (so no file can escape its storage root).
pub fn validate_filename(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        return Err("filename must not be empty");
    }
    if name.len() > MAX_NAME_LEN {
        return Err("filename too long");
    }
    if name.contains('/') || name.contains('\\') {
        return Err("filename must not contain path separators");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_seeds_owner_into_both_lists() {
        let meta = FileMeta::new_file("story.txt", "alice");
        assert!(meta.can_read("alice"));
        assert!(meta.can_write("alice"));
        assert!(!meta.can_read("bob"));
    }

    #[test]
    fn rejects_path_separators() {
        assert!(validate_filename("a/b").is_err());
        assert!(validate_filename("a\\b").is_err());
        assert!(validate_filename("ok.txt").is_ok());
    }
}
