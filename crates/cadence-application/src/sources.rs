// SPDX-License-Identifier: GPL-3.0-or-later
use cadence_domain::{Source, SourceId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Lookup of the local source and known remote peers.
pub trait SourceRegistry: Send + Sync {
    fn local(&self) -> Arc<Source>;

    /// Id 0 resolves to the local source.
    fn get(&self, id: SourceId) -> Option<Arc<Source>>;

    fn get_by_user_name(&self, user_name: &str) -> Option<Arc<Source>>;
}

/// In-memory source registry.
#[derive(Debug)]
pub struct SourceList {
    local: Arc<Source>,
    remotes: RwLock<HashMap<SourceId, Arc<Source>>>,
}

impl SourceList {
    pub fn new(local: Arc<Source>) -> Self {
        Self {
            local,
            remotes: RwLock::new(HashMap::new()),
        }
    }

    /// Register a remote peer, replacing any previous source with the same id.
    ///
    /// Peers whose user name contains a tab are refused: their locators
    /// could not be parsed back.
    pub fn add(&self, source: Arc<Source>) {
        if source.is_local() {
            warn!(target: "sources", "ignoring attempt to register a second local source");
            return;
        }
        if source.user_name().contains('\t') {
            warn!(target: "sources", source_id = %source.id(), "ignoring source whose user name contains a tab");
            return;
        }
        info!(target: "sources", source_id = %source.id(), user = source.user_name(), "source added");
        self.remotes
            .write()
            .expect("Failed to acquire lock")
            .insert(source.id(), source);
    }

    pub fn remove(&self, id: SourceId) -> Option<Arc<Source>> {
        let removed = self
            .remotes
            .write()
            .expect("Failed to acquire lock")
            .remove(&id);
        if removed.is_some() {
            info!(target: "sources", source_id = %id, "source removed");
        }
        removed
    }

    /// Returns false when no such remote source is registered.
    pub fn set_online(&self, id: SourceId, online: bool) -> bool {
        match self.get(id) {
            Some(source) => {
                source.set_online(online);
                true
            }
            None => false,
        }
    }

    pub fn remote_count(&self) -> usize {
        self.remotes.read().expect("Failed to acquire lock").len()
    }
}

impl SourceRegistry for SourceList {
    fn local(&self) -> Arc<Source> {
        Arc::clone(&self.local)
    }

    fn get(&self, id: SourceId) -> Option<Arc<Source>> {
        if id.is_local() {
            return Some(self.local());
        }
        self.remotes
            .read()
            .expect("Failed to acquire lock")
            .get(&id)
            .cloned()
    }

    fn get_by_user_name(&self, user_name: &str) -> Option<Arc<Source>> {
        self.remotes
            .read()
            .expect("Failed to acquire lock")
            .values()
            .find(|source| source.user_name() == user_name)
            .cloned()
    }
}
