//! `begin ... rescue ... end` lowering (§4.1 "Rescue").
//!
//! A rescue clause can run instead of any partial prefix of the protected
//! body, so each clause forks from the pre-body context rather than the
//! body's post-execution context -- mirroring the same fork-then-merge shape
//! `control::lower_if` uses for its branches.

use crate::ir::{NodeId, NodeKind};
use crate::ty::{Name, Ty};

use super::ast::RescueClause;
use super::{Context, Expr, ExprKind, Lowerer};

fn branch_flows(body: &[Expr]) -> bool {
    !matches!(
        body.last().map(|e| &e.kind),
        Some(ExprKind::Return(_)) | Some(ExprKind::NonReturning)
    )
}

pub(super) fn lower_rescue(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    body: &[Expr],
    clauses: &[RescueClause],
) -> NodeId {
    let mut body_ctx = ctx.fork(crate::registry::ScopeType::Block);
    let body_last = lowerer.lower_body(&mut body_ctx, body);

    let mut clause_ctxs: Vec<(Context, NodeId, bool)> = Vec::with_capacity(clauses.len());
    for clause in clauses {
        let mut clause_ctx = ctx.fork(crate::registry::ScopeType::Block);
        if let Some(binding) = &clause.binding {
            bind_rescued_exception(lowerer, &mut clause_ctx, offset, binding, clause.exception_class.as_ref());
        }
        let clause_last = lowerer.lower_body(&mut clause_ctx, &clause.body);
        clause_ctxs.push((clause_ctx, clause_last, branch_flows(&clause.body)));
    }

    merge_rebound_locals(lowerer, ctx, offset, &body_ctx, &clause_ctxs);

    let mut flow_nodes = Vec::new();
    if branch_flows(body) {
        flow_nodes.push(body_last);
    }
    for (_, clause_last, flows) in &clause_ctxs {
        if *flows {
            flow_nodes.push(*clause_last);
        }
    }

    match flow_nodes.len() {
        0 => lowerer.push(ctx, offset, NodeKind::Literal { ty: Ty::Instance("NilClass".into()), children: vec![] }),
        1 => flow_nodes[0],
        _ => lowerer.push(ctx, offset, NodeKind::Merge { branches: flow_nodes }),
    }
}

/// Binds the `rescue Foo => e` capture to a fresh local holding an instance
/// of the named exception class, defaulting to the implicit base exception
/// class when the clause names none (a bare `rescue => e`).
fn bind_rescued_exception(
    lowerer: &mut Lowerer,
    clause_ctx: &mut Context,
    offset: u32,
    binding: &Name,
    exception_class: Option<&Name>,
) {
    let class = exception_class.cloned().unwrap_or_else(|| Name::from("StandardError"));
    let literal_id = lowerer.push(clause_ctx, offset, NodeKind::Literal { ty: Ty::Instance(class), children: vec![] });
    let called_methods = lowerer.fresh_called_methods();
    let write_id = lowerer.push(
        clause_ctx,
        offset,
        NodeKind::LocalWrite { name: binding.clone(), value: literal_id, called_methods },
    );
    clause_ctx.variables.insert(binding.clone(), write_id);
}

fn merge_rebound_locals(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    body_ctx: &Context,
    clause_ctxs: &[(Context, NodeId, bool)],
) {
    let mut changed: Vec<Name> = body_ctx.changed_locals_since(ctx);
    for (clause_ctx, _, _) in clause_ctxs {
        for name in clause_ctx.changed_locals_since(ctx) {
            if !changed.contains(&name) {
                changed.push(name);
            }
        }
    }
    changed.sort();

    for name in changed {
        let mut branches: Vec<NodeId> = Vec::new();
        if let Some(id) = body_ctx.variables.get(&name).copied() {
            branches.push(id);
        }
        for (clause_ctx, _, _) in clause_ctxs {
            if let Some(id) = clause_ctx.variables.get(&name).copied() {
                branches.push(id);
            }
        }

        let merge_id = lowerer.push(ctx, offset, NodeKind::Merge { branches });
        let write_id = lowerer.push(
            ctx,
            offset,
            NodeKind::LocalWrite { name: name.clone(), value: merge_id, called_methods: lowerer.fresh_called_methods() },
        );
        ctx.shapes.remove(&name);
        ctx.variables.insert(name, write_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registries;

    #[test]
    fn rescue_merges_body_and_clause_values() {
        let regs = Registries::new();
        let mut l = Lowerer::new("a.rb".into(), &regs);
        let mut ctx = Context::root();

        let body = vec![Expr::new(0, ExprKind::IntLit)];
        let clauses = vec![RescueClause {
            exception_class: Some("ArgumentError".into()),
            binding: Some("e".into()),
            body: vec![Expr::new(1, ExprKind::StringLit)],
        }];

        let result = lower_rescue(&mut l, &mut ctx, 2, &body, &clauses);
        match &l.arena.get(result).kind {
            NodeKind::Merge { branches } => assert_eq!(branches.len(), 2),
            other => panic!("expected Merge, got {other:?}"),
        }
    }

    #[test]
    fn rescue_binding_gets_exception_instance_type() {
        let regs = Registries::new();
        let mut l = Lowerer::new("a.rb".into(), &regs);
        let mut ctx = Context::root();

        let body = vec![Expr::new(0, ExprKind::IntLit)];
        let clauses = vec![RescueClause {
            exception_class: Some("ArgumentError".into()),
            binding: Some("e".into()),
            body: vec![Expr::new(1, ExprKind::LocalRef("e".into()))],
        }];

        lower_rescue(&mut l, &mut ctx, 2, &body, &clauses);

        let found = l.arena.iter().any(|(_, node)| {
            matches!(&node.kind, NodeKind::Literal { ty: Ty::Instance(name), .. } if name.as_str() == "ArgumentError")
        });
        assert!(found);
    }
}
