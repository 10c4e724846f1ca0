//! The analysis session (§5: "one instance per analysis session, owned by
//! the editor session"). Bundles the registries, the loaded IR arenas, the
//! declared-signature adapter, and the configuration knobs.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::adapter::SignatureProvider;
use crate::config::Config;
use crate::ir::{FileArena, FileId};
use crate::registry::Registries;
use crate::resolver::stats::Stats;
use crate::ty::AncestorProvider;

/// `dashmap`'s sharded-lock map, keyed the same way as everywhere else in
/// this crate: `rustc_hash::FxHashMap`'s hasher, not the default `ahash`
/// one. Mirrors `tinymist-std/src/hash.rs`'s `FxDashMap` alias.
type FxDashMap<K, V> = DashMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// One analysis session. Not `Clone`; constructed once and shared behind a
/// reference by request handlers (§9: no more singletons).
pub struct Engine {
    pub registries: Registries,
    arenas: RwLock<FxHashMap<FileId, Arc<FileArena>>>,
    pub adapter: Arc<dyn SignatureProvider>,
    pub config: Config,
    pub stats: Stats,
    /// Memoized `ancestors_of`, since the simplifier calls it on every
    /// union and the adapter is expected to be in-memory but not free.
    /// A `DashMap` rather than the `RwLock<FxHashMap<_>>` used elsewhere in
    /// `Engine`: entries here are independent (no operation ever needs to
    /// hold more than one class's ancestor chain at a time), so per-shard
    /// locking avoids contending a single lock across unrelated classes.
    ancestor_cache: FxDashMap<String, Vec<String>>,
}

impl Engine {
    pub fn new(adapter: Arc<dyn SignatureProvider>, config: Config) -> Self {
        Self {
            registries: Registries::new(),
            arenas: RwLock::new(FxHashMap::default()),
            adapter,
            config,
            stats: Stats::default(),
            ancestor_cache: FxDashMap::default(),
        }
    }

    /// Installs `arena` as the current IR for `file`, first clearing
    /// whatever the previous lowering of `file` registered (§3.2
    /// "Ownership": destroyed on file re-lowering).
    pub fn install_file(&self, file: FileId, arena: FileArena) {
        self.registries.locations.clear_file(&file);
        self.arenas.write().insert(file, Arc::new(arena));
    }

    pub fn arena(&self, file: &FileId) -> Option<Arc<FileArena>> {
        self.arenas.read().get(file).cloned()
    }

    /// The ancestry chain of `class`: the locally recorded superclass chain
    /// (for user-defined classes) followed by the declared-signature
    /// adapter's chain for whatever class tops it out (so a user class that
    /// subclasses a library class still resolves to the library's
    /// ancestors).
    pub fn ancestors_of(&self, class: &str) -> Vec<String> {
        if let Some(cached) = self.ancestor_cache.get(class) {
            return cached.clone();
        }

        let mut chain: Vec<String> = self
            .registries
            .classes
            .local_ancestors_of(class)
            .into_iter()
            .map(|n| n.to_string())
            .collect();

        let adapter_root = chain.last().cloned().unwrap_or_else(|| class.to_string());
        for ancestor in self.adapter.ancestors_of(&adapter_root) {
            if !chain.contains(&ancestor) {
                chain.push(ancestor);
            }
        }

        self.ancestor_cache.insert(class.to_string(), chain.clone());
        chain
    }
}

impl AncestorProvider for Engine {
    fn ancestors_of(&self, class: &str) -> Vec<String> {
        Engine::ancestors_of(self, class)
    }
}
