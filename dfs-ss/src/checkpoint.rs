//! Tagged file checkpoints: named, point-in-time snapshots of a file's
//! content that can be viewed, listed or reverted to later.

use tokio::io::AsyncWriteExt;

use dfs_proto::meta::{now, Timestamp};

use crate::acl_store::AclStore;
use crate::error::{Error, Result};
use crate::layout::Layout;

/// One row of `LISTCHECKPOINTS`.
pub struct CheckpointInfo {
    pub tag: String,
    pub created: Timestamp,
    pub size: u64,
    pub created_by: String,
}

pub struct CheckpointEngine<'a> {
    layout: &'a Layout,
}

impl<'a> CheckpointEngine<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    pub async fn create(&self, name: &str, tag: &str, user: &str) -> Result<()> {
        let store = AclStore::new(self.layout);
        store.check_read(name, user).await?;

        let file_path = self.layout.file_path(name);
        if tokio::fs::metadata(&file_path).await.is_err() {
            return Err(Error::NotFound);
        }

        tokio::fs::create_dir_all(self.layout.checkpoints_dir()).await?;
        let ckpt_path = self.layout.checkpoint_path(name, tag);
        if tokio::fs::metadata(&ckpt_path).await.is_ok() {
            return Err(Error::Conflict);
        }

        tokio::fs::copy(&file_path, &ckpt_path).await?;

        let meta_path = self.layout.checkpoint_meta_path(name, tag);
        let contents = format!("filename={name}\ntag={tag}\ntimestamp={}\ncreated_by={user}\n", now());
        let mut f = tokio::fs::File::create(&meta_path).await?;
        f.write_all(contents.as_bytes()).await?;
        Ok(())
    }

    /// Returns the checkpointed bytes, framed with the header/footer
    /// lines `VIEWCHECKPOINT` sends to the client.
    pub async fn view(&self, name: &str, tag: &str, user: &str) -> Result<String> {
        let store = AclStore::new(self.layout);
        store.check_read(name, user).await?;

        let ckpt_path = self.layout.checkpoint_path(name, tag);
        let contents = tokio::fs::read_to_string(&ckpt_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound
            } else {
                Error::Io(e.to_string())
            }
        })?;

        Ok(format!(
            "=== Content of checkpoint '{tag}' for file '{name}' ===\n{contents}\n=== End of checkpoint ===\n"
        ))
    }

    /// Reverts `name` to the content captured at `(name, tag)`. Copies
    /// the current file to a `.backup` sidecar first; on a copy failure
    /// during the restore, rolls back from that backup so the file is
    /// never left truncated.
    pub async fn revert(&self, name: &str, tag: &str, user: &str) -> Result<()> {
        let store = AclStore::new(self.layout);
        store.check_write(name, user).await?;

        let ckpt_path = self.layout.checkpoint_path(name, tag);
        if tokio::fs::metadata(&ckpt_path).await.is_err() {
            return Err(Error::NotFound);
        }

        let file_path = self.layout.file_path(name);
        let backup_path = self.layout.backup_path(name);

        if tokio::fs::metadata(&file_path).await.is_ok() {
            tokio::fs::copy(&file_path, &backup_path).await?;
        }

        match tokio::fs::copy(&ckpt_path, &file_path).await {
            Ok(_) => {
                let _ = tokio::fs::remove_file(&backup_path).await;
                store.touch_modified(name).await?;
                Ok(())
            }
            Err(e) => {
                if tokio::fs::metadata(&backup_path).await.is_ok() {
                    let _ = tokio::fs::copy(&backup_path, &file_path).await;
                    let _ = tokio::fs::remove_file(&backup_path).await;
                }
                Err(e.into())
            }
        }
    }

    pub async fn list(&self, name: &str, user: &str) -> Result<Vec<CheckpointInfo>> {
        let store = AclStore::new(self.layout);
        store.check_read(name, user).await?;

        let dir = self.layout.checkpoints_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(_) => return Ok(Vec::new()),
        };

        let prefix = format!("{}_", Layout::sanitize(name));
        let mut out = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let fname = entry.file_name();
            let fname = fname.to_string_lossy();
            let Some(rest) = fname.strip_prefix(&prefix) else { continue };
            let Some(tag) = rest.strip_suffix(".ckpt") else { continue };

            let size = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
            let (created, created_by) = self.read_checkpoint_meta(name, tag).await;
            out.push(CheckpointInfo { tag: tag.to_string(), created, size, created_by });
        }
        out.sort_by(|a, b| a.tag.cmp(&b.tag));
        Ok(out)
    }

    async fn read_checkpoint_meta(&self, name: &str, tag: &str) -> (Timestamp, String) {
        let meta_path = self.layout.checkpoint_meta_path(name, tag);
        let mut created = 0;
        let mut created_by = "Unknown".to_string();
        if let Ok(text) = tokio::fs::read_to_string(&meta_path).await {
            for line in text.lines() {
                if let Some(v) = line.strip_prefix("timestamp=") {
                    created = v.parse().unwrap_or(0);
                } else if let Some(v) = line.strip_prefix("created_by=") {
                    created_by = v.to_string();
                }
            }
        }
        (created, created_by)
    }
}
