//! Demand-driven type inference (§4.2).
//!
//! `Resolution` is the request-local resolver: one instance is built per
//! hover/query, walks the reverse-dependency graph backwards from a single
//! node, and is thrown away when the query returns. Its memo table and
//! cycle-detection stack never outlive that one call tree (§5: "the
//! memoization cache within one query is request-local; there is no shared
//! cross-request memo table").

pub mod engine;
mod heuristic;
mod overload;
mod provenance;
mod stats;

pub use engine::Engine;
pub use heuristic::infer_from_called_methods;
pub use overload::{choose_overload, score_overload, substitution_for_call, substituted_return};
pub use provenance::{InferenceResult, Provenance};
pub use stats::{Stats, StatsSnapshot};

use std::cell::RefCell;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::adapter::substitute;
use crate::ir::{FileId, NarrowKind, NodeId, NodeKind};
use crate::ty::{MethodSignature, Name, ParamType, Ty};

/// Infers the type of `node` in `file`, starting a fresh request-local
/// resolution. This is the entry point hover/coverage call into.
pub fn infer(engine: &Engine, file: &FileId, node: NodeId) -> InferenceResult {
    Resolution::new(engine).resolve(file, node)
}

/// One top-level resolution call tree: memo table, cycle stack, and the
/// provisional-entry bookkeeping the memoization rule requires (§4.2
/// "cache entries created while a cycle is in progress are marked
/// provisional and discarded").
struct Resolution<'e> {
    engine: &'e Engine,
    memo: RefCell<FxHashMap<(FileId, NodeId), InferenceResult>>,
    provisional: RefCell<FxHashSet<(FileId, NodeId)>>,
    stack: RefCell<Vec<(FileId, NodeId)>>,
}

impl<'e> Resolution<'e> {
    fn new(engine: &'e Engine) -> Self {
        Self {
            engine,
            memo: RefCell::new(FxHashMap::default()),
            provisional: RefCell::new(FxHashSet::default()),
            stack: RefCell::new(Vec::new()),
        }
    }

    fn resolve(&self, file: &FileId, node: NodeId) -> InferenceResult {
        self.resolve_at(file, node, 0)
    }

    fn resolve_at(&self, file: &FileId, node: NodeId, depth: usize) -> InferenceResult {
        let key = (file.clone(), node);

        if !self.provisional.borrow().contains(&key) {
            if let Some(cached) = self.memo.borrow().get(&key) {
                self.engine.stats.record_memo_hit();
                return cached.clone();
            }
        }

        if self.stack.borrow().iter().any(|k| k == &key) {
            self.engine.stats.record_cycle();
            for k in self.stack.borrow().iter() {
                self.provisional.borrow_mut().insert(k.clone());
            }
            return InferenceResult::unknown();
        }

        if depth > self.engine.config.max_depth {
            self.engine.stats.record_depth_limit();
            return InferenceResult::unknown();
        }

        self.engine.stats.record_memo_miss();
        self.stack.borrow_mut().push(key.clone());
        let result = self.infer_node(file, node, depth);
        self.stack.borrow_mut().pop();

        self.memo.borrow_mut().insert(key.clone(), result.clone());
        result
    }

    fn infer_node(&self, file: &FileId, id: NodeId, depth: usize) -> InferenceResult {
        let Some(arena) = self.engine.arena(file) else {
            return InferenceResult::unknown();
        };
        let kind = arena.get(id).kind.clone();

        match kind {
            NodeKind::Literal { ty, .. } => InferenceResult::new(ty, Provenance::Literal),

            NodeKind::LocalWrite { value, .. } => self.resolve_at(file, value, depth + 1),

            NodeKind::LocalRead {
                write,
                called_methods,
                ..
            } => match write {
                Some(w) => self.resolve_at(file, w, depth + 1),
                None => infer_from_called_methods(self.engine, &called_methods.borrow()),
            },

            NodeKind::IvarWrite { value, .. } => self.resolve_at(file, value, depth + 1),

            // No call-site tracking is recorded on ivar reads (only on
            // locals and params), so a writeless ivar read has nothing to
            // run the method-call-set heuristic over and falls straight to
            // `Unknown`.
            NodeKind::IvarRead { write, .. } => match write {
                Some(w) => self.resolve_at(file, w, depth + 1),
                None => InferenceResult::unknown(),
            },

            NodeKind::CvarWrite { value, .. } => self.resolve_at(file, value, depth + 1),

            NodeKind::CvarRead { write, .. } => match write {
                Some(w) => self.resolve_at(file, w, depth + 1),
                None => InferenceResult::unknown(),
            },

            NodeKind::Param {
                default,
                called_methods,
                ..
            } => match default {
                Some(d) => self.resolve_at(file, d, depth + 1),
                None => infer_from_called_methods(self.engine, &called_methods.borrow()),
            },

            NodeKind::BlockParamSlot { index, call } => {
                self.infer_block_param_slot(file, index, call, depth)
            }

            NodeKind::Call {
                method,
                receiver,
                args,
                block_body,
                has_block,
                ..
            } => self.infer_call(file, &method, receiver, &args, block_body, has_block, depth),

            NodeKind::Def {
                params,
                return_node,
                ..
            } => self.infer_def(file, &params, return_node, depth),

            NodeKind::Return { value } => match value {
                Some(v) => self.resolve_at(file, v, depth + 1),
                None => {
                    InferenceResult::new(Ty::Instance("NilClass".into()), Provenance::Literal)
                }
            },

            NodeKind::ClassModule { .. } => InferenceResult::unknown(),

            NodeKind::Constant { binding, .. } => self.infer_constant(file, binding, depth, 0),

            NodeKind::SelfNode {
                class,
                in_singleton,
            } => {
                let ty = if in_singleton {
                    Ty::Singleton(class)
                } else {
                    Ty::Instance(class)
                };
                InferenceResult::new(ty, Provenance::Literal)
            }

            NodeKind::Merge { branches } => self.infer_merge(file, &branches, depth),
            NodeKind::Or { lhs, rhs } => self.infer_or(file, lhs, rhs, depth),
            NodeKind::And { lhs, rhs } => self.infer_and(file, lhs, rhs, depth),
            NodeKind::Narrow { source, kind } => self.infer_narrow(file, source, kind, depth),
        }
    }

    fn infer_def(
        &self,
        file: &FileId,
        params: &[NodeId],
        return_node: Option<NodeId>,
        depth: usize,
    ) -> InferenceResult {
        let Some(arena) = self.engine.arena(file) else {
            return InferenceResult::unknown();
        };

        let param_types: Vec<ParamType> = params
            .iter()
            .map(|pid| {
                let ty = self.resolve_at(file, *pid, depth + 1).ty;
                match &arena.get(*pid).kind {
                    NodeKind::Param { name, kind, .. } => ParamType {
                        name: name.clone(),
                        kind: *kind,
                        ty,
                    },
                    _ => ParamType {
                        name: Name::from(""),
                        kind: crate::ty::ParamKind::Required,
                        ty,
                    },
                }
            })
            .collect();

        let return_ty = match return_node {
            Some(r) => self.resolve_at(file, r, depth + 1).ty,
            None => Ty::Unknown,
        };

        let sig = MethodSignature {
            params: param_types,
            return_ty,
            block: None,
        };
        InferenceResult::new(Ty::MethodSignature(Arc::new(sig)), Provenance::InferredCall)
    }

    fn infer_merge(&self, file: &FileId, branches: &[NodeId], depth: usize) -> InferenceResult {
        let types: Vec<Ty> = branches
            .iter()
            .map(|b| self.resolve_at(file, *b, depth + 1).ty)
            .collect();
        let merged = Ty::union(types);
        let simplified = crate::ty::simplify(merged, self.engine, self.engine.config.max_union);
        InferenceResult::new(simplified, Provenance::InferredCall)
    }

    fn infer_or(&self, file: &FileId, lhs: NodeId, rhs: NodeId, depth: usize) -> InferenceResult {
        let l = self.resolve_at(file, lhs, depth + 1).ty;
        let l_truthy = narrow_ty(l, NarrowKind::Truthy);
        let r = self.resolve_at(file, rhs, depth + 1).ty;
        let merged = Ty::union([l_truthy, r]);
        let simplified = crate::ty::simplify(merged, self.engine, self.engine.config.max_union);
        InferenceResult::new(simplified, Provenance::InferredCall)
    }

    /// Not spelled out explicitly (§4.2 only defines `Or`), but `&&`'s
    /// result type follows the same logic mirrored: the falsy half of `lhs`
    /// (the value actually returned when the right side never runs) unioned
    /// with `rhs`'s type.
    fn infer_and(&self, file: &FileId, lhs: NodeId, rhs: NodeId, depth: usize) -> InferenceResult {
        let l = self.resolve_at(file, lhs, depth + 1).ty;
        let l_falsy = narrow_ty(l, NarrowKind::Falsy);
        let r = self.resolve_at(file, rhs, depth + 1).ty;
        let merged = Ty::union([l_falsy, r]);
        let simplified = crate::ty::simplify(merged, self.engine, self.engine.config.max_union);
        InferenceResult::new(simplified, Provenance::InferredCall)
    }

    fn infer_narrow(
        &self,
        file: &FileId,
        source: NodeId,
        kind: NarrowKind,
        depth: usize,
    ) -> InferenceResult {
        let ty = self.resolve_at(file, source, depth + 1).ty;
        InferenceResult::new(narrow_ty(ty, kind), Provenance::InferredCall)
    }

    fn infer_constant(
        &self,
        file: &FileId,
        binding: Option<NodeId>,
        depth: usize,
        alias_depth: usize,
    ) -> InferenceResult {
        let Some(b) = binding else {
            return InferenceResult::unknown();
        };
        if alias_depth >= self.engine.config.max_alias_depth {
            return InferenceResult::unknown();
        }
        let Some(arena) = self.engine.arena(file) else {
            return InferenceResult::unknown();
        };
        if let NodeKind::Constant { binding: inner, .. } = &arena.get(b).kind {
            let inner = *inner;
            return self.infer_constant(file, inner, depth + 1, alias_depth + 1);
        }
        self.resolve_at(file, b, depth + 1)
    }

    fn infer_block_param_slot(
        &self,
        file: &FileId,
        index: usize,
        call: NodeId,
        depth: usize,
    ) -> InferenceResult {
        let Some(arena) = self.engine.arena(file) else {
            return InferenceResult::unknown();
        };
        let NodeKind::Call {
            method, receiver, ..
        } = arena.get(call).kind.clone()
        else {
            return InferenceResult::unknown();
        };

        let recv_ty = match receiver {
            Some(r) => self.resolve_at(file, r, depth + 1).ty,
            None => Ty::Unknown,
        };
        let Some((class, singleton)) = class_of(&recv_ty) else {
            return InferenceResult::unknown();
        };

        let overloads = self.engine.adapter.signatures_for(&class, &method, singleton);
        let Some(overload) = overloads.iter().find(|o| o.block.is_some()) else {
            return InferenceResult::unknown();
        };
        let sig = overload.to_signature();
        let Some(block) = sig.block else {
            return InferenceResult::unknown();
        };

        let subst = substitution_for_call(&recv_ty, None);
        match block.params.get(index) {
            Some(t) => InferenceResult::new(substitute(t, &subst), Provenance::Declared),
            None => InferenceResult::unknown(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn infer_call(
        &self,
        file: &FileId,
        method: &Name,
        receiver: Option<NodeId>,
        args: &[NodeId],
        block_body: Option<NodeId>,
        has_block: bool,
        depth: usize,
    ) -> InferenceResult {
        let recv_ty = match receiver {
            Some(r) => self.resolve_at(file, r, depth + 1).ty,
            None => Ty::Unknown,
        };
        self.resolve_call_steps(
            file, method, receiver, recv_ty, args, block_body, has_block, depth, true,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn resolve_call_steps(
        &self,
        file: &FileId,
        method: &Name,
        receiver: Option<NodeId>,
        recv_ty: Ty,
        args: &[NodeId],
        block_body: Option<NodeId>,
        has_block: bool,
        depth: usize,
        allow_heuristic_retry: bool,
    ) -> InferenceResult {
        if let Some((class, singleton)) = class_of(&recv_ty) {
            // Step 1: declared-signature adapter.
            let overloads = self.engine.adapter.signatures_for(&class, method, singleton);
            if !overloads.is_empty() {
                let arg_types: Vec<Ty> = args
                    .iter()
                    .map(|a| self.resolve_at(file, *a, depth + 1).ty)
                    .collect();
                let sigs: Vec<MethodSignature> =
                    overloads.iter().map(|o| o.to_signature()).collect();
                if let Some(chosen) = choose_overload(&sigs, &arg_types) {
                    let block_ty = if has_block {
                        block_body.map(|b| self.resolve_at(file, b, depth + 1).ty)
                    } else {
                        None
                    };
                    let subst = substitution_for_call(&recv_ty, block_ty.as_ref());
                    let ret = substituted_return(chosen, &subst);
                    if ret != Ty::Unknown {
                        return InferenceResult::new(ret, Provenance::Declared);
                    }
                }
            }

            // Step 2: user-defined method. A singleton receiver looks up
            // the encoded singleton scope (§3.3), never the plain class
            // scope an instance method is registered under.
            let method_scope = if singleton {
                crate::registry::singleton_class_scope_id(&class)
            } else {
                class.clone()
            };
            if let Some(global) = self.engine.registries.methods.lookup(&method_scope, method) {
                if let Some(def_arena) = self.engine.arena(&global.file) {
                    if let NodeKind::Def { return_node, .. } = &def_arena.get(global.node).kind {
                        let return_node = *return_node;
                        let ret = match return_node {
                            Some(r) => self.resolve_at(&global.file, r, depth + 1).ty,
                            None => Ty::Unknown,
                        };
                        return InferenceResult::new(
                            replace_self(ret, &recv_ty),
                            Provenance::InferredCall,
                        );
                    }
                }
            }
        }

        // Step 3: method-call-set heuristic on an Unknown receiver, then
        // retry steps 1-2 once with the guessed type.
        if allow_heuristic_retry && matches!(recv_ty, Ty::Unknown) {
            if let Some(r) = receiver {
                if let Some(called) = self.called_methods_of(file, r) {
                    let guessed = infer_from_called_methods(self.engine, &called);
                    if guessed.ty != Ty::Unknown {
                        return self.resolve_call_steps(
                            file,
                            method,
                            receiver,
                            guessed.ty,
                            args,
                            block_body,
                            has_block,
                            depth,
                            false,
                        );
                    }
                }
            }
        }

        InferenceResult::unknown()
    }

    fn called_methods_of(&self, file: &FileId, node: NodeId) -> Option<Vec<Name>> {
        let arena = self.engine.arena(file)?;
        match &arena.get(node).kind {
            NodeKind::LocalRead { called_methods, .. } | NodeKind::Param { called_methods, .. } => {
                Some(called_methods.borrow().clone())
            }
            _ => None,
        }
    }
}

fn class_of(ty: &Ty) -> Option<(String, bool)> {
    match ty {
        Ty::Instance(name) => Some((name.to_string(), false)),
        Ty::Singleton(name) => Some((name.to_string(), true)),
        _ => None,
    }
}

/// Replaces every `SelfTy` occurrence in `ty` with `recv`, applied to a
/// user-defined method's return type before handing it back to the call
/// site (§4.2 step 2: "substitute `Self` with `r`").
fn replace_self(ty: Ty, recv: &Ty) -> Ty {
    match ty {
        Ty::SelfTy => recv.clone(),
        Ty::Array(elem) => Ty::Array(Arc::new(replace_self((*elem).clone(), recv))),
        Ty::Hash(k, v) => Ty::Hash(
            Arc::new(replace_self((*k).clone(), recv)),
            Arc::new(replace_self((*v).clone(), recv)),
        ),
        Ty::Range(elem) => Ty::Range(Arc::new(replace_self((*elem).clone(), recv))),
        Ty::Tuple(elems) => Ty::Tuple(Arc::new(
            elems.iter().cloned().map(|t| replace_self(t, recv)).collect(),
        )),
        Ty::HashShape(fields) => Ty::HashShape(Arc::new(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), replace_self(v.clone(), recv)))
                .collect(),
        )),
        Ty::Union(members) => {
            Ty::union(members.iter().cloned().map(|t| replace_self(t, recv)))
        }
        other => other,
    }
}

/// `Narrow`'s truthy/falsy filtering (§4.2): drops (or keeps only)
/// `NilClass`/`FalseClass` members, collapsing the `bool` alias to whichever
/// half survives.
fn narrow_ty(ty: Ty, kind: NarrowKind) -> Ty {
    fn is_falsy_member(t: &Ty) -> bool {
        matches!(t, Ty::Instance(n) if n == "NilClass" || n == "FalseClass")
    }

    match kind {
        NarrowKind::Truthy => {
            if ty.is_bool_alias() {
                return Ty::Instance("TrueClass".into());
            }
            let kept: Vec<Ty> = ty
                .members()
                .into_iter()
                .cloned()
                .filter(|t| !is_falsy_member(t))
                .collect();
            if kept.is_empty() {
                Ty::Unknown
            } else {
                Ty::union(kept)
            }
        }
        NarrowKind::Falsy => {
            if ty.is_bool_alias() {
                return Ty::Instance("FalseClass".into());
            }
            let kept: Vec<Ty> = ty
                .members()
                .into_iter()
                .cloned()
                .filter(|t| is_falsy_member(t))
                .collect();
            if kept.is_empty() {
                Ty::Unknown
            } else {
                Ty::union(kept)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EmptySignatureProvider;
    use crate::config::Config;
    use crate::ir::FileArena;

    fn engine() -> Engine {
        Engine::new(Arc::new(EmptySignatureProvider), Config::default())
    }

    #[test]
    fn literal_resolves_to_its_precomputed_type() {
        let engine = engine();
        let mut arena = FileArena::new();
        let lit = arena.push(
            0,
            NodeKind::Literal {
                ty: Ty::Instance("Integer".into()),
                children: vec![],
            },
        );
        let file: FileId = "a.rb".into();
        engine.install_file(file.clone(), arena);

        let result = infer(&engine, &file, lit);
        assert_eq!(result.ty, Ty::Instance("Integer".into()));
        assert_eq!(result.provenance, Provenance::Literal);
    }

    #[test]
    fn local_read_follows_its_write() {
        let engine = engine();
        let mut arena = FileArena::new();
        let lit = arena.push(
            0,
            NodeKind::Literal {
                ty: Ty::Instance("String".into()),
                children: vec![],
            },
        );
        let called = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let write = arena.push(
            1,
            NodeKind::LocalWrite {
                name: "x".into(),
                value: lit,
                called_methods: called.clone(),
            },
        );
        let read = arena.push(
            2,
            NodeKind::LocalRead {
                name: "x".into(),
                write: Some(write),
                called_methods: called,
            },
        );
        let file: FileId = "a.rb".into();
        engine.install_file(file.clone(), arena);

        let result = infer(&engine, &file, read);
        assert_eq!(result.ty, Ty::Instance("String".into()));
    }

    #[test]
    fn cyclic_local_writes_resolve_to_unknown_not_a_stack_overflow() {
        let engine = engine();
        let mut arena = FileArena::new();
        let cm = || std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));

        // read_a(0) -> write_a(1) -> read_b(2) -> write_b(3) -> read_a(0):
        // a genuine cycle through two locals that alias each other.
        arena.push(
            0,
            NodeKind::LocalRead {
                name: "a".into(),
                write: Some(NodeId(1)),
                called_methods: cm(),
            },
        );
        arena.push(
            1,
            NodeKind::LocalWrite {
                name: "a".into(),
                value: NodeId(2),
                called_methods: cm(),
            },
        );
        arena.push(
            2,
            NodeKind::LocalRead {
                name: "b".into(),
                write: Some(NodeId(3)),
                called_methods: cm(),
            },
        );
        arena.push(
            3,
            NodeKind::LocalWrite {
                name: "b".into(),
                value: NodeId(0),
                called_methods: cm(),
            },
        );

        let file: FileId = "a.rb".into();
        engine.install_file(file.clone(), arena);
        let result = infer(&engine, &file, NodeId(0));
        assert_eq!(result.ty, Ty::Unknown);
    }

    #[test]
    fn merge_unions_and_simplifies_branches() {
        let engine = engine();
        let mut arena = FileArena::new();
        let a = arena.push(
            0,
            NodeKind::Literal {
                ty: Ty::Instance("Integer".into()),
                children: vec![],
            },
        );
        let b = arena.push(
            1,
            NodeKind::Literal {
                ty: Ty::Instance("Integer".into()),
                children: vec![],
            },
        );
        let merge = arena.push(2, NodeKind::Merge { branches: vec![a, b] });
        let file: FileId = "a.rb".into();
        engine.install_file(file.clone(), arena);

        let result = infer(&engine, &file, merge);
        assert_eq!(result.ty, Ty::Instance("Integer".into()));
    }

    #[test]
    fn or_narrows_lhs_truthy_before_unioning() {
        let engine = engine();
        let mut arena = FileArena::new();
        let lhs = arena.push(
            0,
            NodeKind::Literal {
                ty: Ty::union([
                    Ty::Instance("NilClass".into()),
                    Ty::Instance("String".into()),
                ]),
                children: vec![],
            },
        );
        let rhs = arena.push(
            1,
            NodeKind::Literal {
                ty: Ty::Instance("String".into()),
                children: vec![],
            },
        );
        let or_node = arena.push(2, NodeKind::Or { lhs, rhs });
        let file: FileId = "a.rb".into();
        engine.install_file(file.clone(), arena);

        let result = infer(&engine, &file, or_node);
        assert_eq!(result.ty, Ty::Instance("String".into()));
    }
}
