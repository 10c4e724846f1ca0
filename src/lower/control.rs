//! Control-flow lowering: conditionals, `case`/`when`, guard clauses, and
//! short-circuit boolean operators (§4.1 "if/unless", "case/when", §3.2
//! invariants 3-4).

use crate::ir::{NarrowKind, NodeId, NodeKind};
use crate::ty::{Name, Ty};

use super::{Context, Expr, ExprKind, Lowerer, WhenClause};

/// Whether a branch's last statement can fall through to the join point.
/// A bare `return`/`raise` (elided as `NonReturning`, §3.2 invariant 3)
/// never contributes a value to the branch's own result.
fn branch_flows(body: &[Expr]) -> bool {
    !matches!(
        body.last().map(|e| &e.kind),
        Some(ExprKind::Return(_)) | Some(ExprKind::NonReturning)
    )
}

/// Forks one context per branch body, lowers each, and merges every local
/// rebound in any branch back into `ctx` -- the shared shape behind both
/// `if/unless` and `case/when` (§4.1: "`case/when[/else]`: similar, one
/// branch context per `when`"). `has_default_branch` is `true` when the
/// caller already included a catch-all (an `else`, or an `if`'s required
/// `then`) in `bodies`; when `false`, an implicit untouched/nil branch is
/// added to represent "no branch matched" (§4.1: "nil added for one-branch
/// modifier forms").
fn lower_branch_merge(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    bodies: &[&[Expr]],
    has_default_branch: bool,
) -> NodeId {
    let mut fork_ctxs = Vec::with_capacity(bodies.len() + 1);
    let mut branch_results = Vec::with_capacity(bodies.len());
    for body in bodies {
        let mut branch_ctx = ctx.fork(crate::registry::ScopeType::Block);
        let last = lowerer.lower_body(&mut branch_ctx, body);
        branch_results.push((last, branch_flows(body)));
        fork_ctxs.push(branch_ctx);
    }
    if !has_default_branch {
        // Represents "no `when`/`then` matched": an untouched clone of
        // `ctx`, so the merge below joins every rebound local against the
        // pre-statement binding for this path too (§3.2 invariant 4).
        fork_ctxs.push(ctx.fork(crate::registry::ScopeType::Block));
    }

    // Merge every local rebound in any branch back into `ctx`, joining
    // against the pre-statement binding for whichever branch left it
    // untouched.
    let mut changed: Vec<Name> = Vec::new();
    for fork_ctx in &fork_ctxs {
        for name in fork_ctx.changed_locals_since(ctx) {
            if !changed.contains(&name) {
                changed.push(name);
            }
        }
    }
    changed.sort();

    for name in changed {
        // Each fork started as a full clone of `ctx`, so a branch that
        // never reassigned `name` still carries the original pre-statement
        // write here -- exactly the join the `Merge` needs.
        let branches: Vec<NodeId> = fork_ctxs
            .iter()
            .filter_map(|fork_ctx| fork_ctx.variables.get(&name).copied())
            .collect();
        let merge_id = lowerer.push(ctx, offset, NodeKind::Merge { branches });
        let write_id = lowerer.push(
            ctx,
            offset,
            NodeKind::LocalWrite {
                name: name.clone(),
                value: merge_id,
                called_methods: lowerer.fresh_called_methods(),
            },
        );
        // The merged value's structural shape isn't statically known at
        // lowering time (it depends on which branch ran); stop tracking it
        // rather than keep a stale pre-statement shape around.
        ctx.shapes.remove(&name);
        ctx.variables.insert(name, write_id);
    }

    // The statement's own value: the branches that actually flow through to
    // the join point, nil-augmented when there is no catch-all branch.
    let mut flow_nodes: Vec<NodeId> = branch_results
        .into_iter()
        .filter_map(|(last, flows)| flows.then_some(last))
        .collect();
    if !has_default_branch {
        let nil = lowerer.push(
            ctx,
            offset,
            NodeKind::Literal {
                ty: Ty::Instance("NilClass".into()),
                children: vec![],
            },
        );
        flow_nodes.push(nil);
    }

    match flow_nodes.len() {
        0 => lowerer.push(
            ctx,
            offset,
            NodeKind::Literal {
                ty: Ty::Instance("NilClass".into()),
                children: vec![],
            },
        ),
        1 => flow_nodes[0],
        _ => lowerer.push(ctx, offset, NodeKind::Merge { branches: flow_nodes }),
    }
}

pub(super) fn lower_if(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    cond: &Expr,
    then_body: &[Expr],
    else_body: Option<&[Expr]>,
) -> NodeId {
    lowerer.lower_expr(ctx, cond);

    let mut bodies: Vec<&[Expr]> = vec![then_body];
    if let Some(body) = else_body {
        bodies.push(body);
    }
    lower_branch_merge(lowerer, ctx, offset, &bodies, else_body.is_some())
}

/// `case subject; when v1, v2; ...; else; ...; end` (§4.1 "case/when"): the
/// subject and every `when` value are lowered against `ctx` up front (they
/// run before any branch is chosen), then each `when`'s body gets its own
/// forked branch context, merged exactly like `if`/`unless`.
pub(super) fn lower_case(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    subject: Option<&Expr>,
    whens: &[WhenClause],
    else_body: Option<&[Expr]>,
) -> NodeId {
    if let Some(s) = subject {
        lowerer.lower_expr(ctx, s);
    }
    for when in whens {
        for value in &when.values {
            lowerer.lower_expr(ctx, value);
        }
    }

    let mut bodies: Vec<&[Expr]> = whens.iter().map(|w| w.body.as_slice()).collect();
    if let Some(body) = else_body {
        bodies.push(body);
    }
    lower_branch_merge(lowerer, ctx, offset, &bodies, else_body.is_some())
}

/// `return/raise unless V` (§3.2 invariant 4): narrows a bare local
/// reference guarded on to its truthy half for the remainder of the
/// enclosing scope, since control only reaches past the guard when `V` was
/// truthy. Any other guarded expression shape has nothing to narrow.
pub(super) fn lower_guard_unless(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    cond: &Expr,
) -> NodeId {
    let cond_id = lowerer.lower_expr(ctx, cond);

    if let ExprKind::LocalRef(name) = &cond.kind {
        if let Some(write) = ctx.variables.get(name).copied() {
            let narrow_id = lowerer.push(
                ctx,
                offset,
                NodeKind::Narrow { source: write, kind: NarrowKind::Truthy },
            );
            let called_methods = lowerer.called_methods_of(write);
            let new_write = lowerer.push(
                ctx,
                offset,
                NodeKind::LocalWrite {
                    name: name.clone(),
                    value: narrow_id,
                    called_methods,
                },
            );
            ctx.variables.insert(name.clone(), new_write);
        }
    }

    cond_id
}

pub(super) fn lower_and(lowerer: &mut Lowerer, ctx: &mut Context, offset: u32, lhs: &Expr, rhs: &Expr) -> NodeId {
    let lhs_id = lowerer.lower_expr(ctx, lhs);
    let rhs_id = lowerer.lower_expr(ctx, rhs);
    lowerer.push(ctx, offset, NodeKind::And { lhs: lhs_id, rhs: rhs_id })
}

pub(super) fn lower_or(lowerer: &mut Lowerer, ctx: &mut Context, offset: u32, lhs: &Expr, rhs: &Expr) -> NodeId {
    let lhs_id = lowerer.lower_expr(ctx, lhs);
    let rhs_id = lowerer.lower_expr(ctx, rhs);
    lowerer.push(ctx, offset, NodeKind::Or { lhs: lhs_id, rhs: rhs_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registries;

    #[test]
    fn if_else_merges_rebound_local() {
        let regs = Registries::new();
        let mut l = Lowerer::new("a.rb".into(), &regs);
        let mut ctx = Context::root();

        let cond = Expr::new(0, ExprKind::LocalRef("flag".into()));
        let then_body = vec![Expr::new(
            1,
            ExprKind::Assign { target: crate::lower::AssignTarget::Local, name: "x".into(), value: Box::new(Expr::new(2, ExprKind::IntLit)) },
        )];
        let else_body = vec![Expr::new(
            3,
            ExprKind::Assign { target: crate::lower::AssignTarget::Local, name: "x".into(), value: Box::new(Expr::new(4, ExprKind::StringLit)) },
        )];

        lower_if(&mut l, &mut ctx, 5, &cond, &then_body, Some(&else_body));

        let write = ctx.variables.get("x").copied().unwrap();
        match &l.arena.get(write).kind {
            NodeKind::LocalWrite { value, .. } => match &l.arena.get(*value).kind {
                NodeKind::Merge { branches } => assert_eq!(branches.len(), 2),
                other => panic!("expected Merge, got {other:?}"),
            },
            other => panic!("expected LocalWrite, got {other:?}"),
        }
    }

    fn local_assign(offset: u32, name: &str, value_offset: u32, kind: ExprKind) -> Expr {
        Expr::new(
            offset,
            ExprKind::Assign {
                target: crate::lower::AssignTarget::Local,
                name: name.into(),
                value: Box::new(Expr::new(value_offset, kind)),
            },
        )
    }

    #[test]
    fn case_merges_a_local_rebound_in_every_when() {
        let regs = Registries::new();
        let mut l = Lowerer::new("a.rb".into(), &regs);
        let mut ctx = Context::root();

        let subject = Expr::new(0, ExprKind::LocalRef("flag".into()));
        let whens = vec![
            WhenClause {
                values: vec![Expr::new(1, ExprKind::SymbolLit("a".into()))],
                body: vec![local_assign(2, "x", 3, ExprKind::IntLit)],
            },
            WhenClause {
                values: vec![Expr::new(4, ExprKind::SymbolLit("b".into()))],
                body: vec![local_assign(5, "x", 6, ExprKind::StringLit)],
            },
        ];
        let else_body = vec![local_assign(7, "x", 8, ExprKind::NilLit)];

        lower_case(&mut l, &mut ctx, 9, Some(&subject), &whens, Some(&else_body));

        let write = ctx.variables.get("x").copied().unwrap();
        match &l.arena.get(write).kind {
            NodeKind::LocalWrite { value, .. } => match &l.arena.get(*value).kind {
                NodeKind::Merge { branches } => assert_eq!(branches.len(), 3),
                other => panic!("expected Merge, got {other:?}"),
            },
            other => panic!("expected LocalWrite, got {other:?}"),
        }
    }

    #[test]
    fn case_elides_a_non_returning_when_from_its_own_value() {
        let regs = Registries::new();
        let mut l = Lowerer::new("a.rb".into(), &regs);
        let mut ctx = Context::root();

        let whens = vec![
            WhenClause {
                values: vec![Expr::new(0, ExprKind::SymbolLit("a".into()))],
                body: vec![Expr::new(1, ExprKind::NonReturning)],
            },
            WhenClause {
                values: vec![Expr::new(2, ExprKind::SymbolLit("b".into()))],
                body: vec![Expr::new(3, ExprKind::IntLit)],
            },
        ];

        let result = lower_case(&mut l, &mut ctx, 4, None, &whens, None);

        // Only the surviving `when` plus the implicit nil (no `else`)
        // contribute -- the `raise`-only branch is elided (§3.2 invariant
        // 3), so this is a 2-way `Merge`, not 3-way.
        match &l.arena.get(result).kind {
            NodeKind::Merge { branches } => assert_eq!(branches.len(), 2),
            other => panic!("expected Merge, got {other:?}"),
        }
    }
}
