//! Per-file ACL sidecar, persisted beside the file it describes.
//!
//! The sidecar is a flat `KEY:VALUE` text file: `OWNER:`/`CREATED:`/
//! `MODIFIED:`/`LAST_ACCESS:`/`READ_USERS:`/`WRITE_USERS:`.

use tokio::io::AsyncWriteExt;

use dfs_proto::acl::AccessList;
use dfs_proto::meta::{now, FileMeta, Timestamp};

use crate::error::{Error, Result};
use crate::layout::Layout;

pub struct AclStore<'a> {
    layout: &'a Layout,
}

impl<'a> AclStore<'a> {
    pub fn new(layout: &'a Layout) -> Self {
        Self { layout }
    }

    /// Writes a fresh sidecar for a newly created file, owner seeded into
    /// both access lists.
    pub async fn create(&self, name: &str, owner: &str) -> Result<FileMeta> {
        let meta = FileMeta::new_file(name, owner);
        self.write(&meta).await?;
        Ok(meta)
    }

    pub async fn read(&self, name: &str) -> Result<FileMeta> {
        let path = self.layout.meta_path(name);
        let text = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound
            } else {
                Error::Io(e.to_string())
            }
        })?;

        let mut owner = String::new();
        let mut created: Timestamp = 0;
        let mut modified: Timestamp = 0;
        let mut accessed: Timestamp = 0;
        let mut read_users = AccessList::new();
        let mut write_users = AccessList::new();

        for line in text.lines() {
            if let Some(v) = line.strip_prefix("OWNER:") {
                owner = v.to_string();
            } else if let Some(v) = line.strip_prefix("CREATED:") {
                created = v.parse().unwrap_or(0);
            } else if let Some(v) = line.strip_prefix("MODIFIED:") {
                modified = v.parse().unwrap_or(0);
            } else if let Some(v) = line.strip_prefix("LAST_ACCESS:") {
                accessed = v.parse().unwrap_or(0);
            } else if let Some(v) = line.strip_prefix("READ_USERS:") {
                read_users = AccessList::from_csv(v);
            } else if let Some(v) = line.strip_prefix("WRITE_USERS:") {
                write_users = AccessList::from_csv(v);
            }
        }

        Ok(FileMeta { name: name.to_string(), owner, created, modified, accessed, read_users, write_users, ss_ids: Vec::new() })
    }

    pub async fn write(&self, meta: &FileMeta) -> Result<()> {
        tokio::fs::create_dir_all(self.layout.meta_dir()).await?;
        let path = self.layout.meta_path(&meta.name);
        let contents = format!(
            "OWNER:{}\nCREATED:{}\nMODIFIED:{}\nLAST_ACCESS:{}\nREAD_USERS:{}\nWRITE_USERS:{}\n",
            meta.owner,
            meta.created,
            meta.modified,
            meta.accessed,
            meta.read_users,
            meta.write_users,
        );
        let mut f = tokio::fs::File::create(&path).await?;
        f.write_all(contents.as_bytes()).await?;
        Ok(())
    }

    pub async fn check_read(&self, name: &str, user: &str) -> Result<()> {
        let meta = self.read(name).await?;
        if meta.can_read(user) {
            Ok(())
        } else {
            Err(Error::AccessDenied)
        }
    }

    pub async fn check_write(&self, name: &str, user: &str) -> Result<()> {
        let meta = self.read(name).await?;
        if meta.can_write(user) {
            Ok(())
        } else {
            Err(Error::AccessDenied)
        }
    }

    pub async fn touch_accessed(&self, name: &str) -> Result<()> {
        let mut meta = self.read(name).await?;
        meta.accessed = now();
        self.write(&meta).await
    }

    pub async fn touch_modified(&self, name: &str) -> Result<()> {
        let mut meta = self.read(name).await?;
        meta.modified = now();
        self.write(&meta).await
    }

    pub async fn add_read(&self, name: &str, user: &str) -> Result<()> {
        let mut meta = self.read(name).await?;
        meta.read_users.insert(user);
        self.write(&meta).await
    }

    pub async fn add_write(&self, name: &str, user: &str) -> Result<()> {
        let mut meta = self.read(name).await?;
        meta.write_users.insert(user);
        self.write(&meta).await
    }

    /// Removes `user` from both lists. Rejects removing the owner's own
    /// access.
    pub async fn remove_all(&self, name: &str, user: &str) -> Result<()> {
        let mut meta = self.read(name).await?;
        if meta.owner == user {
            return Err(Error::AccessDenied);
        }
        meta.read_users.remove(user);
        meta.write_users.remove(user);
        self.write(&meta).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), 1);
        layout.ensure_dirs().await.unwrap();
        let store = AclStore::new(&layout);

        store.create("story.txt", "alice").await.unwrap();
        let meta = store.read("story.txt").await.unwrap();
        assert_eq!(meta.owner, "alice");
        assert!(meta.can_read("alice"));
        assert!(meta.can_write("alice"));
        assert!(!meta.can_read("bob"));
    }

    #[tokio::test]
    async fn add_read_grants_access() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), 1);
        layout.ensure_dirs().await.unwrap();
        let store = AclStore::new(&layout);

        store.create("secret.txt", "alice").await.unwrap();
        assert!(store.check_read("secret.txt", "bob").await.is_err());
        store.add_read("secret.txt", "bob").await.unwrap();
        assert!(store.check_read("secret.txt", "bob").await.is_ok());
    }

    #[tokio::test]
    async fn cannot_remove_owner_access() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), 1);
        layout.ensure_dirs().await.unwrap();
        let store = AclStore::new(&layout);

        store.create("f.txt", "alice").await.unwrap();
        assert_eq!(store.remove_all("f.txt", "alice").await, Err(Error::AccessDenied));
    }

    #[tokio::test]
    async fn missing_sidecar_is_not_found() {
        let dir = tempdir().unwrap();
        let layout = Layout::new(dir.path(), 1);
        layout.ensure_dirs().await.unwrap();
        let store = AclStore::new(&layout);
        assert_eq!(store.read("nope.txt").await, Err(Error::NotFound));
    }
}
