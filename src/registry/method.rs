//! The method registry (§3.3): `class_scope -> method_name -> Def`. A
//! singleton method's `class_scope` is the encoded form
//! `Outer::<Class:Outer>` (`registry::singleton_class_scope_id`), so an
//! instance and a singleton method of the same name occupy distinct slots.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::ir::GlobalNodeId;
use crate::ty::Name;

/// The process-wide, mutex-protected method registry.
#[derive(Default)]
pub struct MethodRegistry {
    // class_scope -> method_name -> Def location
    methods: RwLock<FxHashMap<String, FxHashMap<Name, GlobalNodeId>>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, class_scope: &str, method: Name, def: GlobalNodeId) {
        self.methods
            .write()
            .entry(class_scope.to_string())
            .or_default()
            .insert(method, def);
    }

    pub fn lookup(&self, class_scope: &str, method: &str) -> Option<GlobalNodeId> {
        self.methods
            .read()
            .get(class_scope)
            .and_then(|m| m.get(method))
            .cloned()
    }

    /// All method names registered on `class_scope` (used by the method-call
    /// set heuristic, §4.2).
    pub fn method_names(&self, class_scope: &str) -> Vec<Name> {
        self.methods
            .read()
            .get(class_scope)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every class scope whose registered method set is a superset of
    /// `wanted` (§4.2 "ask the method registry for all user-defined classes
    /// whose method set contains every name"). Singleton-encoded scopes
    /// (`Outer::<Class:Inner>`) are excluded: the duck-typing heuristic this
    /// feeds guesses an *instance* type for an unknown receiver, and an
    /// encoded singleton scope is not a class name a `Ty::Instance` can
    /// carry.
    pub fn classes_with_all(&self, wanted: &[Name]) -> Vec<String> {
        self.methods
            .read()
            .iter()
            .filter(|(class, _)| !class.contains("<Class:"))
            .filter(|(_, methods)| wanted.iter().all(|m| methods.contains_key(m)))
            .map(|(class, _)| class.clone())
            .collect()
    }

    /// Removes every method registered under `class_scope` (used before
    /// re-registering a class's methods on re-lowering a file).
    pub fn clear_class(&self, class_scope: &str) {
        self.methods.write().remove(class_scope);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(offset: u32) -> GlobalNodeId {
        GlobalNodeId {
            file: "a.rb".into(),
            node: crate::ir::NodeId(offset),
        }
    }

    #[test]
    fn finds_classes_with_all_methods() {
        let reg = MethodRegistry::new();
        reg.register("Recipe", "ingredients".into(), def(0));
        reg.register("Recipe", "steps".into(), def(1));
        reg.register("Article", "content".into(), def(2));

        let wanted: Vec<Name> = vec!["ingredients".into(), "steps".into()];
        assert_eq!(reg.classes_with_all(&wanted), vec!["Recipe".to_string()]);
    }

    #[test]
    fn instance_and_singleton_methods_of_the_same_name_do_not_collide() {
        let reg = MethodRegistry::new();
        reg.register("Foo", "bar".into(), def(0));
        reg.register("Foo::<Class:Foo>", "bar".into(), def(1));

        assert_eq!(reg.lookup("Foo", "bar"), Some(def(0)));
        assert_eq!(reg.lookup("Foo::<Class:Foo>", "bar"), Some(def(1)));
    }

    #[test]
    fn classes_with_all_excludes_singleton_encoded_scopes() {
        let reg = MethodRegistry::new();
        reg.register("Foo", "bar".into(), def(0));
        reg.register("Foo::<Class:Foo>", "bar".into(), def(1));

        let wanted: Vec<Name> = vec!["bar".into()];
        assert_eq!(reg.classes_with_all(&wanted), vec!["Foo".to_string()]);
    }
}
