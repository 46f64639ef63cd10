//! Write-session locking.
//!
//! Two distinct mechanisms cooperate here:
//!
//! - A **lock marker** is a filesystem entry at `<name>.<sentence>.lock`;
//!   its presence is the lock, and at most one WRITE session holds it
//!   for a given sentence at any instant.
//! - A per-file **write mutex**, held for the duration of a session,
//!   serializes the read-modify-write of the *whole* sentence array so
//!   that two sessions on different sentences of the same file can't
//!   race each other's file rewrite.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::layout::Layout;

#[derive(Default)]
pub struct LockTable {
    file_mutexes: DashMap<String, Arc<Mutex<()>>>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the per-file write mutex, held until the returned guard
    /// is dropped.
    pub async fn lock_file(&self, name: &str) -> OwnedMutexGuard<()> {
        let mutex = self
            .file_mutexes
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        mutex.lock_owned().await
    }
}

pub fn is_sentence_locked(layout: &Layout, name: &str, sentence: usize) -> bool {
    layout.lock_path(name, sentence).exists()
}

/// Creates the lock marker. Returns `false` (without creating it) if the
/// marker already existed, closing the race between two sessions that
/// both observed `is_sentence_locked == false`.
pub async fn try_create_lock(layout: &Layout, name: &str, sentence: usize) -> std::io::Result<bool> {
    let path = layout.lock_path(name, sentence);
    match tokio::fs::OpenOptions::new().write(true).create_new(true).open(&path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

pub async fn release_lock(layout: &Layout, name: &str, sentence: usize) {
    let _ = tokio::fs::remove_file(layout.lock_path(name, sentence)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn second_create_fails_while_locked() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), 1);
        tokio::fs::create_dir_all(layout.root()).await.unwrap();

        assert!(try_create_lock(&layout, "story.txt", 1).await.unwrap());
        assert!(!try_create_lock(&layout, "story.txt", 1).await.unwrap());

        release_lock(&layout, "story.txt", 1).await;
        assert!(try_create_lock(&layout, "story.txt", 1).await.unwrap());
    }

    #[tokio::test]
    async fn different_sentences_lock_independently() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), 1);
        tokio::fs::create_dir_all(layout.root()).await.unwrap();

        assert!(try_create_lock(&layout, "story.txt", 0).await.unwrap());
        assert!(try_create_lock(&layout, "story.txt", 1).await.unwrap());
    }
}
