//! The name server's file index: one entry per filename, keyed by name,
//! with the set of storage-server ids hosting it.
//!
//! A `HashMap` gives `get`/`insert`/`remove` in O(1) average case, and
//! every filename still maps to exactly one entry, which is all the
//! index's invariant actually requires.

use std::collections::HashMap;

use dfs_proto::meta::FileMeta;

#[derive(Debug, Default)]
pub struct FileIndex {
    entries: HashMap<String, FileMeta>,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&FileMeta> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FileMeta> {
        self.entries.get_mut(name)
    }

    pub fn insert(&mut self, meta: FileMeta) {
        self.entries.insert(meta.name.clone(), meta);
    }

    /// Idempotent set-union of `ss_id` into `name`'s owning-ss list,
    /// creating a bare entry (no owner/ACLs known yet) if absent. Used by
    /// the post-registration index refresh to record which SS reported a
    /// file, mirroring `file_index_put`.
    pub fn put(&mut self, name: &str, ss_id: u32) {
        let entry = self.entries.entry(name.to_string()).or_insert_with(|| FileMeta::new_file(name, ""));
        if !entry.ss_ids.contains(&ss_id) {
            entry.ss_ids.push(ss_id);
        }
    }

    /// Drops `ss_id` from `name`'s owning-ss set; removes the entry
    /// entirely once the set is empty, mirroring `file_index_remove`.
    pub fn remove(&mut self, name: &str, ss_id: u32) {
        let Some(entry) = self.entries.get_mut(name) else { return };
        entry.ss_ids.retain(|id| *id != ss_id);
        if entry.ss_ids.is_empty() {
            self.entries.remove(name);
        }
    }

    /// Drops every index entry whose owning-ss set becomes empty after
    /// removing `ss_id`; used to forget files formerly hosted by an SS
    /// that the registration sweep just evicted.
    pub fn forget_ss(&mut self, ss_id: u32) {
        self.entries.retain(|_, meta| {
            meta.ss_ids.retain(|id| *id != ss_id);
            !meta.ss_ids.is_empty()
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileMeta> {
        self.entries.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_idempotent_set_union() {
        let mut index = FileIndex::new();
        index.put("a.txt", 1);
        index.put("a.txt", 1);
        index.put("a.txt", 2);
        assert_eq!(index.get("a.txt").unwrap().ss_ids, vec![1, 2]);
    }

    #[test]
    fn remove_drops_entry_once_empty() {
        let mut index = FileIndex::new();
        index.put("a.txt", 1);
        index.remove("a.txt", 1);
        assert!(index.get("a.txt").is_none());
    }

    #[test]
    fn forget_ss_only_removes_stale_entries() {
        let mut index = FileIndex::new();
        index.put("a.txt", 1);
        index.put("b.txt", 1);
        index.put("b.txt", 2);
        index.forget_ss(1);
        assert!(index.get("a.txt").is_none());
        assert_eq!(index.get("b.txt").unwrap().ss_ids, vec![2]);
    }
}
