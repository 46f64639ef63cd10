//! Undo: a single-slot bistate swap between the current file and its most
//! recent pre-mutation backup.
//!
//! Every mutating WRITE copies the current file into `undo/<name>`
//! before it edits anything (see `write_coord::WriteSession::begin`).
//! `undo()` then performs a three-step swap so that applying it twice is
//! the identity operation: `copy current -> swap; copy undo -> current;
//! rename swap -> undo`.

use crate::acl_store::AclStore;
use crate::error::{Error, Result};
use crate::layout::Layout;

pub struct UndoEngine<'a> {
    layout: &'a Layout,
}

impl<'a> UndoEngine<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Copies `current` into the undo slot. Called once, before the
    /// first edit of a WRITE session, or before any other mutation that
    /// wants to be undoable.
    pub async fn snapshot(&self, name: &str) -> Result<()> {
        let current = self.layout.file_path(name);
        let undo = self.layout.undo_path(name);
        tokio::fs::create_dir_all(self.layout.undo_dir()).await?;
        match tokio::fs::copy(&current, &undo).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Nothing to back up yet -- an empty undo slot still
                // counts as "has undo history" once the file exists.
                tokio::fs::write(&undo, b"").await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn undo(&self, name: &str, user: &str) -> Result<()> {
        let store = AclStore::new(self.layout);
        store.check_write(name, user).await?;

        let current = self.layout.file_path(name);
        if tokio::fs::metadata(&current).await.is_err() {
            return Err(Error::NotFound);
        }

        let undo_path = self.layout.undo_path(name);
        if tokio::fs::metadata(&undo_path).await.is_err() {
            return Err(Error::NotFound);
        }

        tokio::fs::create_dir_all(self.layout.swap_dir()).await?;
        let swap_path = self.layout.swap_path(name);

        // Step 1: current -> swap (becomes the new undo backup).
        tokio::fs::copy(&current, &swap_path).await?;
        // Step 2: undo -> current (restore the previous version).
        tokio::fs::copy(&undo_path, &current).await?;
        // Step 3: swap -> undo (swap the backups).
        tokio::fs::remove_file(&undo_path).await?;
        tokio::fs::rename(&swap_path, &undo_path).await?;

        store.touch_modified(name).await?;
        Ok(())
    }
}
