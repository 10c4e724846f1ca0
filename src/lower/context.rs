//! The lowering `Context` (§4.1 "Scoping").
//!
//! A context is cloned wholesale at each `fork`, rather than chained
//! through a parent pointer: a child starts as an exact copy of the parent
//! so reads fall through automatically, and after lowering a branch the
//! caller diffs the child's `variables` against the parent's to find the
//! names that branch rebound (`changed_since`) — the input a `Merge`
//! construction needs (§4.1 "if/unless"). This trades a per-fork clone for
//! a simpler diff than walking a live parent chain, which given this
//! crate's flat, non-concurrent lowering pass is the cheaper tradeoff (see
//! DESIGN.md).

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ir::NodeId;
use crate::registry::{class_scope_id, method_scope_id, ScopeType};
use crate::ty::{Name, Ty};

#[derive(Debug, Clone)]
pub struct Context {
    pub variables: FxHashMap<Name, NodeId>,
    /// Class-level instance variable bindings, consulted when a method
    /// context has no `narrowed_ivars` entry of its own.
    pub instance_variables: FxHashMap<Name, NodeId>,
    /// Per-method override of `instance_variables`, populated by ivar
    /// writes/narrows within the current method only.
    pub narrowed_ivars: FxHashMap<Name, NodeId>,
    /// Class-variable (`@@x`) bindings, shared across the whole class body
    /// (never narrowed per-method the way ivars are, §3.2).
    pub class_variables: FxHashMap<Name, NodeId>,
    pub constants: FxHashMap<Name, NodeId>,
    /// The last structurally-known type of a local, tracked independently
    /// of the resolver so container-mutation widening (§4.1) can decide
    /// `HashShape` vs `Hash` vs `Tuple` vs `Array` without running
    /// inference during lowering. Absent for any binding whose shape isn't
    /// a literal the lowerer can see directly (e.g. a call result) — those
    /// mutations fall back to an ordinary `Call(:[]=, ...)` with no
    /// widening.
    pub shapes: FxHashMap<Name, Ty>,
    /// Snapshot of the parent's variable names at the point a *block*
    /// scope was forked; used to tell an "outer" variable (mutated through
    /// a block) apart from one declared inside the block itself (§4.1
    /// "container mutation... inside a block scope"). `None` outside a
    /// block context.
    pub block_base_names: Option<FxHashSet<Name>>,
    pub scope_type: ScopeType,
    pub class_path: Vec<Name>,
    pub method_name: Option<Name>,
    pub singleton_method: bool,
}

impl Context {
    pub fn root() -> Self {
        Self {
            variables: FxHashMap::default(),
            instance_variables: FxHashMap::default(),
            narrowed_ivars: FxHashMap::default(),
            class_variables: FxHashMap::default(),
            constants: FxHashMap::default(),
            shapes: FxHashMap::default(),
            block_base_names: None,
            scope_type: ScopeType::TopLevel,
            class_path: Vec::new(),
            method_name: None,
            singleton_method: false,
        }
    }

    pub fn fork(&self, scope_type: ScopeType) -> Self {
        Self {
            variables: self.variables.clone(),
            instance_variables: self.instance_variables.clone(),
            narrowed_ivars: self.narrowed_ivars.clone(),
            class_variables: self.class_variables.clone(),
            constants: self.constants.clone(),
            shapes: self.shapes.clone(),
            block_base_names: None,
            scope_type,
            class_path: self.class_path.clone(),
            method_name: self.method_name.clone(),
            singleton_method: self.singleton_method,
        }
    }

    pub fn fork_block(&self) -> Self {
        let mut child = self.fork(ScopeType::Block);
        child.block_base_names = Some(self.variables.keys().cloned().collect());
        child
    }

    /// Whether `name` was already bound before the current block scope was
    /// entered (so a mutation through it must widen and propagate
    /// outward). `false` outside a block context.
    pub fn is_outer(&self, name: &Name) -> bool {
        self.block_base_names
            .as_ref()
            .is_some_and(|base| base.contains(name))
    }

    /// A fresh method-body context, entering a new method scope within the
    /// current class path; `narrowed_ivars` always starts empty for a new
    /// method (it never leaks across method boundaries).
    pub fn fork_method(&self, method_name: Name, singleton: bool) -> Self {
        let mut child = self.fork(ScopeType::Method);
        child.method_name = Some(method_name);
        child.singleton_method = singleton;
        child.narrowed_ivars.clear();
        child
    }

    pub fn fork_class(&self, class_name: Name) -> Self {
        let mut child = self.fork(ScopeType::Class);
        child.class_path.push(class_name);
        child.method_name = None;
        child.singleton_method = false;
        child
    }

    /// Resolves an ivar read: the method-local narrowed binding if present,
    /// else the class-level binding.
    pub fn ivar(&self, name: &Name) -> Option<NodeId> {
        self.narrowed_ivars
            .get(name)
            .or_else(|| self.instance_variables.get(name))
            .copied()
    }

    /// Names bound (or rebound) in `self` relative to `base`, i.e. the set
    /// a `Merge` must be synthesized for after joining a branch back into
    /// its parent.
    pub fn changed_locals_since(&self, base: &Context) -> Vec<Name> {
        let mut changed: Vec<Name> = self
            .variables
            .iter()
            .filter(|(name, node)| base.variables.get(*name) != Some(*node))
            .map(|(name, _)| name.clone())
            .collect();
        changed.sort();
        changed
    }

    pub fn changed_ivars_since(&self, base: &Context) -> Vec<Name> {
        let mut changed: Vec<Name> = self
            .narrowed_ivars
            .iter()
            .filter(|(name, node)| base.ivar(name).as_ref() != Some(*node))
            .map(|(name, _)| name.clone())
            .collect();
        changed.sort();
        changed
    }

    /// The location-index/method-registry scope id for the current
    /// position (§3.3): class scope inside a class body, method scope
    /// inside a method body, `<main>` at the top level.
    pub fn scope_id(&self) -> String {
        match &self.method_name {
            Some(name) => method_scope_id(&self.class_path, name, self.singleton_method),
            None if self.class_path.is_empty() => "<main>".to_string(),
            None => class_scope_id(&self.class_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_starts_as_an_exact_copy() {
        let mut root = Context::root();
        root.variables.insert("x".into(), NodeId(0));
        let child = root.fork(ScopeType::Block);
        assert_eq!(child.variables.get("x"), Some(&NodeId(0)));
    }

    #[test]
    fn changed_locals_detects_rebinding_only() {
        let mut root = Context::root();
        root.variables.insert("x".into(), NodeId(0));
        root.variables.insert("y".into(), NodeId(1));
        let mut child = root.fork(ScopeType::Block);
        child.variables.insert("x".into(), NodeId(2));
        assert_eq!(child.changed_locals_since(&root), vec![Name::from("x")]);
    }

    #[test]
    fn method_scope_id_matches_registry_convention() {
        let mut root = Context::root();
        root.class_path.push("Outer".into());
        let method_ctx = root.fork_method("bar".into(), false);
        assert_eq!(method_ctx.scope_id(), "Outer#bar");
    }
}
