//! Ivar/cvar registries and the user-defined class hierarchy (§3.3).

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ir::GlobalNodeId;
use crate::ty::Name;

/// `class -> name -> write_nodes[]`, aggregated across files.
#[derive(Default)]
pub struct VarRegistry {
    writes: RwLock<FxHashMap<Name, FxHashMap<Name, Vec<GlobalNodeId>>>>,
}

impl VarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class: Name, name: Name, write: GlobalNodeId) {
        self.writes
            .write()
            .entry(class)
            .or_default()
            .entry(name)
            .or_default()
            .push(write);
    }

    pub fn writes_of(&self, class: &str, name: &str) -> Vec<GlobalNodeId> {
        self.writes
            .read()
            .get(class)
            .and_then(|m| m.get(name))
            .cloned()
            .unwrap_or_default()
    }
}

/// Records each user-defined class's superclass, so the simplifier's
/// ancestor walk (§4.3) and the method-call-set heuristic's inheritance
/// filter (§4.2) work for classes that never touch the declared-signature
/// adapter.
#[derive(Default)]
pub struct ClassRegistry {
    superclass: RwLock<FxHashMap<Name, Name>>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class: Name, superclass: Option<Name>) {
        if let Some(sup) = superclass {
            self.superclass.write().insert(class, sup);
        }
    }

    /// The ancestor chain of `class`, nearest-first, following recorded
    /// superclass links until one is unknown (at which point the adapter's
    /// declared-signature ancestry, if any, takes over).
    pub fn local_ancestors_of(&self, class: &str) -> Vec<Name> {
        let mut out = Vec::new();
        let table = self.superclass.read();
        let mut cur = class.to_string();
        let mut guard = 0;
        while let Some(sup) = table.get(cur.as_str()) {
            if out.iter().any(|n: &Name| n == sup) {
                break; // cycle guard
            }
            out.push(sup.clone());
            cur = sup.to_string();
            guard += 1;
            if guard > 64 {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_superclass_chain() {
        let reg = ClassRegistry::new();
        reg.register("Dog".into(), Some("Animal".into()));
        reg.register("Animal".into(), Some("Object".into()));
        assert_eq!(
            reg.local_ancestors_of("Dog"),
            vec![Name::from("Animal"), Name::from("Object")]
        );
    }
}
