//! Shared name-server state: handlers serialize on a single mutex
//! covering both the SS registry and the file index, since resolving a
//! target and mutating the index need to stay consistent with each other.
//!
//! `Inner` bundles the SS registry, the file index, and the CREATE
//! round-robin cursor behind one `tokio::sync::Mutex`; `NsState` adds the
//! read-only credential oracle and process configuration alongside it.

use std::net::Ipv4Addr;

use tokio::sync::Mutex;
use tracing::{info, warn};

use dfs_proto::meta::{now, FileMeta};

use crate::credentials::CredentialStore;
use crate::index::FileIndex;
use crate::registry::{SsDescriptor, SsRegistry};

struct Inner {
    registry: SsRegistry,
    index: FileIndex,
    round_robin: usize,
}

pub struct NsState {
    inner: Mutex<Inner>,
    pub credentials: CredentialStore,
    pub enable_exec: bool,
}

impl NsState {
    pub fn new(credentials: CredentialStore, enable_exec: bool) -> Self {
        Self {
            inner: Mutex::new(Inner { registry: SsRegistry::new(), index: FileIndex::new(), round_robin: 0 }),
            credentials,
            enable_exec,
        }
    }

    /// Runs the liveness sweep and assigns an id, forgetting any file-index
    /// entries that belonged solely to an evicted SS.
    pub async fn register_ss(&self, ip: Ipv4Addr, nm_port: u16, client_port: u16) -> Option<u32> {
        let mut inner = self.inner.lock().await;
        let (id, evicted) = inner.registry.register(ip, nm_port, client_port).await;
        for ss_id in evicted {
            warn!(ss_id, "evicting unreachable storage server");
            inner.index.forget_ss(ss_id);
        }
        id
    }

    pub async fn descriptor(&self, id: u32) -> Option<SsDescriptor> {
        self.inner.lock().await.registry.find(id).cloned()
    }

    pub async fn active_servers(&self) -> Vec<SsDescriptor> {
        self.inner.lock().await.registry.iter_active().cloned().collect()
    }

    /// Chooses the target SS for a file-scoped command: the file's
    /// recorded owner if known, else (only for CREATE) a round-robin pick
    /// among active servers, else the first active server.
    pub async fn resolve_target(&self, filename: &str, is_create: bool) -> Option<SsDescriptor> {
        let mut inner = self.inner.lock().await;
        if let Some(meta) = inner.index.get(filename) {
            for ss_id in meta.ss_ids.clone() {
                if let Some(desc) = inner.registry.find(ss_id) {
                    if desc.active {
                        return Some(desc.clone());
                    }
                }
            }
        }
        if is_create {
            let actives: Vec<SsDescriptor> = inner.registry.iter_active().cloned().collect();
            if actives.is_empty() {
                return None;
            }
            let idx = inner.round_robin % actives.len();
            inner.round_robin = (idx + 1) % actives.len();
            return Some(actives[idx].clone());
        }
        inner.registry.first_active().cloned()
    }

    pub async fn file_meta(&self, filename: &str) -> Option<FileMeta> {
        self.inner.lock().await.index.get(filename).cloned()
    }

    /// Records a brand-new file after a successful CREATE, owner seeded
    /// into both access lists.
    pub async fn record_created(&self, filename: &str, owner: &str, ss_id: u32) {
        let mut inner = self.inner.lock().await;
        let mut meta = FileMeta::new_file(filename, owner);
        meta.ss_ids.push(ss_id);
        inner.index.insert(meta);
        info!(filename, owner, ss_id, "indexed new file");
    }

    pub async fn record_deleted(&self, filename: &str, ss_id: u32) {
        self.inner.lock().await.index.remove(filename, ss_id);
    }

    /// Mutates read/write access in place, returning the pre-mutation
    /// owner for the caller's owner check, or `None` if the file isn't
    /// indexed.
    pub async fn mutate_access(
        &self,
        filename: &str,
        requester: &str,
        mutate: impl FnOnce(&mut FileMeta),
    ) -> Option<MutateOutcome> {
        let mut inner = self.inner.lock().await;
        let meta = inner.index.get_mut(filename)?;
        if meta.owner != requester {
            return Some(MutateOutcome::NotOwner);
        }
        mutate(meta);
        meta.modified = now();
        Some(MutateOutcome::Applied)
    }

    /// Replaces or inserts a file's full index entry, used by the
    /// post-registration refresh (`refresh.rs`) to seed metadata parsed
    /// off a live SS's VIEW/INFO responses.
    pub async fn refresh_meta(&self, meta: FileMeta) {
        self.inner.lock().await.index.insert(meta);
    }

    pub async fn index_snapshot(&self) -> Vec<FileMeta> {
        self.inner.lock().await.index.iter().cloned().collect()
    }
}

pub enum MutateOutcome {
    Applied,
    NotOwner,
}
