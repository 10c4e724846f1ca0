//! AST → IR lowering (§4.1).

pub mod ast;
mod assign;
mod class;
mod context;
mod control;
mod rescue;

pub use ast::{
    AssignTarget, Block, Expr, ExprKind, HashKey, MultiTarget, ParamSpec, RescueClause, Visibility,
    WhenClause,
};
pub use context::Context;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::ir::{CalledMethods, FileArena, FileId, NodeId, NodeKind};
use crate::registry::Registries;
use crate::ty::{Name, Ty};

/// Owns the arena being built for one file and a read-only handle to the
/// process-wide registries it writes declarations into as it goes.
pub struct Lowerer<'r> {
    pub file: FileId,
    pub arena: FileArena,
    pub registries: &'r Registries,
}

impl<'r> Lowerer<'r> {
    fn new(file: FileId, registries: &'r Registries) -> Self {
        Self {
            file,
            arena: FileArena::new(),
            registries,
        }
    }

    /// Pushes a node and immediately records it in the location index under
    /// `ctx`'s current scope (§3.3, §4.1).
    pub(crate) fn push(&mut self, ctx: &Context, offset: u32, kind: NodeKind) -> NodeId {
        let id = self.arena.push(offset, kind);
        self.registries
            .locations
            .register(&self.file, &ctx.scope_id(), offset, id);
        id
    }

    fn fresh_called_methods(&self) -> CalledMethods {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn called_methods_of(&self, node: NodeId) -> CalledMethods {
        match &self.arena.get(node).kind {
            NodeKind::LocalWrite { called_methods, .. }
            | NodeKind::LocalRead { called_methods, .. }
            | NodeKind::Param { called_methods, .. } => called_methods.clone(),
            _ => self.fresh_called_methods(),
        }
    }

    /// Lowers a sequence of statements, returning the last one's node (the
    /// implicit-return value). Non-returning statements (`raise`, guard
    /// clauses) don't change what "last" means structurally; they just
    /// contribute no value of their own.
    pub(crate) fn lower_body(&mut self, ctx: &mut Context, body: &[Expr]) -> NodeId {
        let mut last = None;
        for expr in body {
            last = Some(self.lower_expr(ctx, expr));
        }
        last.unwrap_or_else(|| {
            self.push(
                ctx,
                0,
                NodeKind::Literal {
                    ty: Ty::Instance("NilClass".into()),
                    children: vec![],
                },
            )
        })
    }

    pub(crate) fn lower_expr(&mut self, ctx: &mut Context, expr: &Expr) -> NodeId {
        match &expr.kind {
            ExprKind::IntLit => self.push(
                ctx,
                expr.offset,
                NodeKind::Literal {
                    ty: Ty::Instance("Integer".into()),
                    children: vec![],
                },
            ),
            ExprKind::FloatLit => self.push(
                ctx,
                expr.offset,
                NodeKind::Literal {
                    ty: Ty::Instance("Float".into()),
                    children: vec![],
                },
            ),
            ExprKind::StringLit => self.push(
                ctx,
                expr.offset,
                NodeKind::Literal {
                    ty: Ty::Instance("String".into()),
                    children: vec![],
                },
            ),
            ExprKind::SymbolLit(_) => self.push(
                ctx,
                expr.offset,
                NodeKind::Literal {
                    ty: Ty::Instance("Symbol".into()),
                    children: vec![],
                },
            ),
            ExprKind::NilLit => self.push(
                ctx,
                expr.offset,
                NodeKind::Literal {
                    ty: Ty::Instance("NilClass".into()),
                    children: vec![],
                },
            ),
            ExprKind::BoolLit(_) => self.push(
                ctx,
                expr.offset,
                NodeKind::Literal {
                    ty: Ty::union([
                        Ty::Instance("TrueClass".into()),
                        Ty::Instance("FalseClass".into()),
                    ]),
                    children: vec![],
                },
            ),

            ExprKind::ArrayLit(elems) => self.lower_array_lit(ctx, expr.offset, elems),
            ExprKind::HashLit(fields) => self.lower_hash_lit(ctx, expr.offset, fields),

            ExprKind::LocalRef(name) => self.lower_local_ref(ctx, expr.offset, name),
            ExprKind::IvarRef(name) => self.lower_ivar_ref(ctx, expr.offset, name),
            ExprKind::CvarRef(name) => self.lower_cvar_ref(ctx, expr.offset, name),
            ExprKind::ConstRef(name) => self.lower_const_ref(ctx, expr.offset, name),
            ExprKind::SelfExpr => self.push(
                ctx,
                expr.offset,
                NodeKind::SelfNode {
                    class: ctx.class_path.last().cloned().unwrap_or_default(),
                    in_singleton: ctx.singleton_method,
                },
            ),

            ExprKind::Assign { target, name, value } => {
                assign::lower_assign(self, ctx, expr.offset, *target, name, value)
            }
            ExprKind::OpAssign {
                target,
                name,
                op,
                logical_and,
                value,
            } => assign::lower_op_assign(
                self,
                ctx,
                expr.offset,
                *target,
                name,
                op.as_ref(),
                *logical_and,
                value,
            ),
            ExprKind::MultipleAssign { targets, value } => {
                assign::lower_multiple_assign(self, ctx, expr.offset, targets, value)
            }
            ExprKind::IndexAssign {
                receiver,
                index,
                value,
            } => assign::lower_index_assign(self, ctx, expr.offset, receiver, index, value),
            ExprKind::ShovelAssign { receiver, value } => {
                assign::lower_shovel_assign(self, ctx, expr.offset, receiver, value)
            }

            ExprKind::Call {
                receiver,
                method,
                args,
                block,
            } => self.lower_call(ctx, expr.offset, receiver.as_deref(), method, args, block.as_ref()),

            ExprKind::If {
                cond,
                then_body,
                else_body,
            } => control::lower_if(self, ctx, expr.offset, cond, then_body, else_body.as_deref()),
            ExprKind::Case {
                subject,
                whens,
                else_body,
            } => control::lower_case(
                self,
                ctx,
                expr.offset,
                subject.as_deref(),
                whens,
                else_body.as_deref(),
            ),
            ExprKind::GuardUnless { cond, .. } => {
                control::lower_guard_unless(self, ctx, expr.offset, cond)
            }
            ExprKind::NonReturning => self.push(
                ctx,
                expr.offset,
                NodeKind::Literal {
                    ty: Ty::Unknown,
                    children: vec![],
                },
            ),
            ExprKind::And(lhs, rhs) => control::lower_and(self, ctx, expr.offset, lhs, rhs),
            ExprKind::Or(lhs, rhs) => control::lower_or(self, ctx, expr.offset, lhs, rhs),

            ExprKind::Return(value) => {
                let value = value.as_ref().map(|v| self.lower_expr(ctx, v));
                self.push(ctx, expr.offset, NodeKind::Return { value })
            }

            ExprKind::Def {
                name,
                params,
                body,
                singleton,
                visibility,
            } => class::lower_def(self, ctx, expr.offset, name, params, body, *singleton, *visibility, false),
            ExprKind::ModuleFunction(inner) => class::lower_module_function(self, ctx, inner),
            ExprKind::ClassDef {
                name,
                superclass,
                members,
            } => class::lower_class_def(self, ctx, expr.offset, name, superclass.as_ref(), members),
            ExprKind::ModuleDef { name, members } => {
                class::lower_module_def(self, ctx, expr.offset, name, members)
            }

            ExprKind::Rescue { body, clauses } => {
                rescue::lower_rescue(self, ctx, expr.offset, body, clauses)
            }
        }
    }

    fn lower_array_lit(&mut self, ctx: &mut Context, offset: u32, elems: &[Expr]) -> NodeId {
        let children: Vec<NodeId> = elems.iter().map(|e| self.lower_expr(ctx, e)).collect();
        // Element types aren't known without the resolver; an array
        // literal's precomputed type is the tuple of each element's
        // lowering-time literal type where determinable, `Unknown`
        // otherwise -- the resolver re-derives the precise members from
        // `children` when asked (`Literal` carries both).
        let elem_tys: Vec<Ty> = children
            .iter()
            .map(|c| literal_ty_of(&self.arena, *c))
            .collect();
        let ty = Ty::Tuple(Arc::new(elem_tys));
        self.push(ctx, offset, NodeKind::Literal { ty, children })
    }

    fn lower_hash_lit(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        fields: &[(HashKey, Expr)],
    ) -> NodeId {
        let mut children = Vec::with_capacity(fields.len() * 2);
        let mut shape: BTreeMap<Name, Ty> = BTreeMap::new();
        let mut non_symbol = false;
        let mut key_ty = Ty::Unknown;
        let mut val_ty = Ty::Unknown;
        for (key, value) in fields {
            let value_id = self.lower_expr(ctx, value);
            children.push(value_id);
            let vty = literal_ty_of(&self.arena, value_id);
            match key {
                HashKey::Symbol(name) => {
                    shape.insert(name.clone(), vty.clone());
                    key_ty = Ty::union([key_ty, Ty::Instance("Symbol".into())]);
                    val_ty = Ty::union([val_ty, vty]);
                }
                HashKey::Other(key_expr) => {
                    non_symbol = true;
                    let key_id = self.lower_expr(ctx, key_expr);
                    children.push(key_id);
                    key_ty = Ty::union([key_ty, literal_ty_of(&self.arena, key_id)]);
                    val_ty = Ty::union([val_ty, vty]);
                }
            }
        }
        let ty = if non_symbol {
            Ty::Hash(Arc::new(key_ty), Arc::new(val_ty))
        } else {
            Ty::HashShape(Arc::new(shape))
        };
        self.push(ctx, offset, NodeKind::Literal { ty, children })
    }

    fn lower_local_ref(&mut self, ctx: &mut Context, offset: u32, name: &Name) -> NodeId {
        match ctx.variables.get(name).copied() {
            Some(write) => {
                let called_methods = self.called_methods_of(write);
                self.push(
                    ctx,
                    offset,
                    NodeKind::LocalRead {
                        name: name.clone(),
                        write: Some(write),
                        called_methods,
                    },
                )
            }
            None => self.push(
                ctx,
                offset,
                NodeKind::LocalRead {
                    name: name.clone(),
                    write: None,
                    called_methods: self.fresh_called_methods(),
                },
            ),
        }
    }

    fn lower_ivar_ref(&mut self, ctx: &mut Context, offset: u32, name: &Name) -> NodeId {
        let write = ctx.ivar(name);
        self.push(
            ctx,
            offset,
            NodeKind::IvarRead {
                class: ctx.class_path.last().cloned().unwrap_or_default(),
                name: name.clone(),
                write,
            },
        )
    }

    fn lower_cvar_ref(&mut self, ctx: &mut Context, offset: u32, name: &Name) -> NodeId {
        let write = ctx.class_variables.get(name).copied();
        self.push(ctx, offset, NodeKind::CvarRead { name: name.clone(), write })
    }

    fn lower_const_ref(&mut self, ctx: &mut Context, offset: u32, name: &Name) -> NodeId {
        let binding = ctx.constants.get(name).copied();
        self.push(ctx, offset, NodeKind::Constant { name: name.clone(), binding })
    }

    #[allow(clippy::too_many_arguments)]
    fn lower_call(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        receiver: Option<&Expr>,
        method: &Name,
        args: &[Expr],
        block: Option<&Block>,
    ) -> NodeId {
        let implicit_self = receiver.is_none();
        let receiver_id = receiver.map(|r| self.lower_expr(ctx, r));
        if let Some(r) = receiver_id {
            self.record_call_on_receiver(r, method);
        }

        let arg_ids: Vec<NodeId> = args.iter().map(|a| self.lower_expr(ctx, a)).collect();

        let mut slot_ids = Vec::new();
        let block_body = block.map(|b| {
            let mut block_ctx = ctx.fork_block();
            for (i, pname) in b.params.iter().enumerate() {
                // `call` is patched below once the `Call` node this slot
                // belongs to exists; a block parameter's type is derived
                // from *this same call's* resolved overload (§4.2), so the
                // slot necessarily forward-references it.
                let param_id = self.push(
                    &block_ctx,
                    offset,
                    NodeKind::BlockParamSlot { index: i, call: NodeId(0) },
                );
                slot_ids.push(param_id);
                block_ctx.variables.insert(pname.clone(), param_id);
            }
            let body_id = self.lower_body(&mut block_ctx, &b.body);
            self.propagate_block_writes(ctx, &block_ctx);
            body_id
        });

        let call_id = self.push(
            ctx,
            offset,
            NodeKind::Call {
                method: method.clone(),
                receiver: receiver_id,
                args: arg_ids,
                block_body,
                has_block: block.is_some(),
                implicit_self,
            },
        );

        for slot in slot_ids {
            if let NodeKind::BlockParamSlot { call, .. } = &mut self.arena.get_mut(slot).kind {
                *call = call_id;
            }
        }

        call_id
    }

    fn record_call_on_receiver(&mut self, receiver: NodeId, method: &Name) {
        match &self.arena.get(receiver).kind {
            NodeKind::LocalRead { called_methods, .. } | NodeKind::Param { called_methods, .. } => {
                called_methods.borrow_mut().push(method.clone());
            }
            _ => {}
        }
    }

    /// After lowering a block body, any *outer* local the block mutated is
    /// rebound in the caller's context directly (no `Merge`: a block may
    /// run zero or many times, so there is no two-way join the way
    /// if/else has) (§4.1 "container mutation... propagate the new write
    /// to the parent context").
    fn propagate_block_writes(&mut self, ctx: &mut Context, block_ctx: &Context) {
        for name in block_ctx.changed_locals_since(ctx) {
            if block_ctx.is_outer(&name) {
                if let Some(write) = block_ctx.variables.get(&name).copied() {
                    ctx.variables.insert(name.clone(), write);
                    if let Some(shape) = block_ctx.shapes.get(&name) {
                        ctx.shapes.insert(name, shape.clone());
                    }
                }
            }
        }
    }
}

/// Reads a node's own precomputed literal type back out of the arena, used
/// while lowering a container literal to derive the shape of its elements
/// without a resolver pass.
fn literal_ty_of(arena: &FileArena, id: NodeId) -> Ty {
    match &arena.get(id).kind {
        NodeKind::Literal { ty, .. } => ty.clone(),
        _ => Ty::Unknown,
    }
}

/// Builds a fresh `FileArena` for `program`, registering every declaration
/// into `registries` along the way. Does not clear previously-registered
/// location-index/method-registry entries for `file`; the caller decides
/// the re-lowering policy (`resolver::Engine::install_file` clears the
/// location index only, per §3.2's per-file IR ownership -- see
/// DESIGN.md).
pub fn lower_file(file: FileId, program: &[Expr], registries: &Registries) -> FileArena {
    let mut lowerer = Lowerer::new(file, registries);
    let mut ctx = Context::root();
    lowerer.lower_body(&mut ctx, program);
    lowerer.arena
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registries() -> Registries {
        Registries::new()
    }

    #[test]
    fn array_literal_lowers_to_tuple() {
        let regs = registries();
        let program = vec![Expr::new(0, ExprKind::ArrayLit(vec![
            Expr::new(1, ExprKind::IntLit),
            Expr::new(2, ExprKind::IntLit),
        ]))];
        let arena = lower_file("a.rb".into(), &program, &regs);
        let last = arena.len() - 1;
        match &arena.get(NodeId(last as u32)).kind {
            NodeKind::Literal { ty, .. } => assert_eq!(
                *ty,
                Ty::Tuple(Arc::new(vec![
                    Ty::Instance("Integer".into()),
                    Ty::Instance("Integer".into())
                ]))
            ),
            other => panic!("expected Literal, got {other:?}"),
        }
    }

    #[test]
    fn local_read_shares_called_methods_with_its_write() {
        let regs = registries();
        let program = vec![
            Expr::new(
                0,
                ExprKind::Assign {
                    target: AssignTarget::Local,
                    name: "x".into(),
                    value: Box::new(Expr::new(1, ExprKind::StringLit)),
                },
            ),
            Expr::new(
                2,
                ExprKind::Call {
                    receiver: Some(Box::new(Expr::new(3, ExprKind::LocalRef("x".into())))),
                    method: "upcase".into(),
                    args: vec![],
                    block: None,
                },
            ),
        ];
        let arena = lower_file("a.rb".into(), &program, &regs);
        let write_id = NodeId(0);
        match &arena.get(write_id).kind {
            NodeKind::LocalWrite { called_methods, .. } => {
                assert_eq!(called_methods.borrow().as_slice(), ["upcase"]);
            }
            other => panic!("expected LocalWrite, got {other:?}"),
        }
    }
}
