//! The storage engine: file CRUD, streaming reads and the `INFO` report,
//! backed directly by `tokio::fs` against a per-SS root.

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use dfs_proto::meta::validate_filename;

use crate::acl_store::AclStore;
use crate::error::{Error, Result};
use crate::layout::Layout;

#[async_trait]
pub trait Engine: Send + Sync {
    async fn read(&self, name: &str, user: &str) -> Result<Vec<u8>>;
    async fn create(&self, name: &str, user: &str) -> Result<()>;
    async fn delete(&self, name: &str, user: &str) -> Result<()>;
    async fn info(&self, name: &str, user: &str) -> Result<String>;
    async fn stream(&self, name: &str, user: &str, out: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<()>;
}

pub struct LocalEngine {
    layout: Layout,
}

impl LocalEngine {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

#[async_trait]
impl Engine for LocalEngine {
    async fn read(&self, name: &str, user: &str) -> Result<Vec<u8>> {
        validate_filename(name).map_err(|_| Error::NotFound)?;
        let store = AclStore::new(&self.layout);
        store.check_read(name, user).await?;

        let path = self.layout.file_path(name);
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound
            } else {
                Error::Io(e.to_string())
            }
        })?;
        store.touch_accessed(name).await?;
        Ok(bytes)
    }

    async fn create(&self, name: &str, user: &str) -> Result<()> {
        validate_filename(name).map_err(|_| Error::Range("invalid filename".to_string()))?;
        let path = self.layout.file_path(name);
        if tokio::fs::metadata(&path).await.is_ok() {
            return Err(Error::Conflict);
        }
        tokio::fs::create_dir_all(self.layout.files_dir()).await?;
        tokio::fs::File::create(&path).await?;

        let store = AclStore::new(&self.layout);
        store.create(name, user).await?;
        Ok(())
    }

    async fn delete(&self, name: &str, user: &str) -> Result<()> {
        let store = AclStore::new(&self.layout);
        store.check_write(name, user).await?;

        let path = self.layout.file_path(name);
        tokio::fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound
            } else {
                Error::Io(e.to_string())
            }
        })?;
        let _ = tokio::fs::remove_file(self.layout.meta_path(name)).await;
        Ok(())
    }

    async fn info(&self, name: &str, user: &str) -> Result<String> {
        let store = AclStore::new(&self.layout);
        store.check_read(name, user).await?;
        let meta = store.read(name).await?;
        let path = self.layout.file_path(name);
        let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);

        Ok(format!(
            "------------------- FILE INFO -------------------\n\
             File Name      : {}\n\
             File Size      : {} bytes\n\
             Owner          : {}\n\
             Created        : {}\n\
             Last Modified  : {}\n\
             Last Access    : {}\n\
             Read Access    : {}\n\
             Write Access   : {}\n\
             -------------------------------------------------\n",
            meta.name, size, meta.owner, meta.created, meta.modified, meta.accessed, meta.read_users, meta.write_users,
        ))
    }

    async fn stream(&self, name: &str, user: &str, out: &mut (dyn AsyncWrite + Unpin + Send)) -> Result<()> {
        let store = AclStore::new(&self.layout);
        store.check_read(name, user).await?;

        let path = self.layout.file_path(name);
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound
            } else {
                Error::Io(e.to_string())
            }
        })?;

        for token in contents.split_whitespace() {
            out.write_all(token.as_bytes()).await?;
            out.write_all(b" ").await?;
            tokio::time::sleep(dfs_proto::STREAM_TOKEN_PAUSE).await;
        }
        out.write_all(b"<<END_OF_STREAM>>\n").await?;
        store.touch_accessed(name).await?;
        Ok(())
    }
}
