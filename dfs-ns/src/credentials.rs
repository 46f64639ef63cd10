//! The credential oracle: a flat `user:pass` file read directly off disk
//! on every call.
//!
//! Re-reading the file per call (rather than caching it in memory) keeps
//! this a thin pass-through over an external store; it also means an
//! operator can edit `users.txt` without restarting the name server.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `true` iff `user:pass` appears verbatim (no trimming beyond the
    /// trailing newline) in the credential file.
    pub async fn authenticate(&self, user: &str, pass: &str) -> bool {
        let Ok(text) = tokio::fs::read_to_string(&self.path).await else {
            return false;
        };
        entries(&text).any(|(u, p)| u == user && p == pass)
    }

    /// Usernames in file order, for the `LIST` command.
    pub async fn list_users(&self) -> Vec<String> {
        let Ok(text) = tokio::fs::read_to_string(&self.path).await else {
            return Vec::new();
        };
        entries(&text).map(|(u, _)| u.to_string()).collect()
    }
}

/// Parses non-comment, non-blank `user:pass` lines out of a credential
/// file's contents.
fn entries(text: &str) -> impl Iterator<Item = (&str, &str)> {
    text.lines().filter_map(|line| {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        line.split_once(':')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn write_users(dir: &std::path::Path, contents: &str) -> CredentialStore {
        let path = dir.join("users.txt");
        tokio::fs::write(&path, contents).await.unwrap();
        CredentialStore::new(path)
    }

    #[tokio::test]
    async fn authenticates_matching_pair() {
        let dir = tempdir().unwrap();
        let store = write_users(dir.path(), "# comment\nalice:hunter2\nbob:swordfish\n").await;
        assert!(store.authenticate("alice", "hunter2").await);
        assert!(!store.authenticate("alice", "wrong").await);
        assert!(!store.authenticate("carol", "anything").await);
    }

    #[tokio::test]
    async fn missing_file_rejects_everyone() {
        let store = CredentialStore::new("/nonexistent/users.txt");
        assert!(!store.authenticate("alice", "hunter2").await);
    }

    #[tokio::test]
    async fn lists_usernames_skipping_comments() {
        let dir = tempdir().unwrap();
        let store = write_users(dir.path(), "#roster\nalice:a\nbob:b\n\n").await;
        assert_eq!(store.list_users().await, vec!["alice".to_string(), "bob".to_string()]);
    }
}
