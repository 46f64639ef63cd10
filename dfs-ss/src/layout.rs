//! On-disk layout for a storage server's slice of the namespace:
//!
//! ```text
//! <root>/storage<id>/
//!   files/<name>
//!   meta/<name>.meta
//!   undo/<name>
//!   swap/<name>.tmp
//!   checkpoints/<san>_<tag>.ckpt
//!   checkpoints/<san>_<tag>.meta
//!   <name>.<sentence>.lock
//! ```

use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(storage_root: impl Into<PathBuf>, id: u32) -> Self {
        Self { root: storage_root.into().join(format!("storage{id}")) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }

    pub fn meta_dir(&self) -> PathBuf {
        self.root.join("meta")
    }

    pub fn undo_dir(&self) -> PathBuf {
        self.root.join("undo")
    }

    pub fn swap_dir(&self) -> PathBuf {
        self.root.join("swap")
    }

    pub fn checkpoints_dir(&self) -> PathBuf {
        self.root.join("checkpoints")
    }

    pub fn file_path(&self, name: &str) -> PathBuf {
        self.files_dir().join(name)
    }

    pub fn meta_path(&self, name: &str) -> PathBuf {
        self.meta_dir().join(format!("{name}.meta"))
    }

    pub fn undo_path(&self, name: &str) -> PathBuf {
        self.undo_dir().join(name)
    }

    pub fn swap_path(&self, name: &str) -> PathBuf {
        self.swap_dir().join(format!("{name}.tmp"))
    }

    pub fn backup_path(&self, name: &str) -> PathBuf {
        self.files_dir().join(format!("{name}.backup"))
    }

    pub fn lock_path(&self, name: &str, sentence: usize) -> PathBuf {
        self.root.join(format!("{name}.{sentence}.lock"))
    }

    /// Replaces `/` and `\` with `_` so a filename can't escape the
    /// checkpoints directory via a path separator.
    pub fn sanitize(name: &str) -> String {
        name.chars().map(|c| if c == '/' || c == '\\' { '_' } else { c }).collect()
    }

    pub fn checkpoint_path(&self, name: &str, tag: &str) -> PathBuf {
        self.checkpoints_dir().join(format!("{}_{tag}.ckpt", Self::sanitize(name)))
    }

    pub fn checkpoint_meta_path(&self, name: &str, tag: &str) -> PathBuf {
        self.checkpoints_dir().join(format!("{}_{tag}.meta", Self::sanitize(name)))
    }

    pub async fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.files_dir(),
            self.meta_dir(),
            self.undo_dir(),
            self.swap_dir(),
            self.checkpoints_dir(),
        ] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }
}
