//! Assignment lowering: plain/compound/multiple assignment and the
//! container-mutation widening rules (§4.1 "Container mutation").

use std::sync::Arc;

use crate::ir::{NodeId, NodeKind};
use crate::ty::{Name, Ty};

use super::{literal_ty_of, AssignTarget, Context, Expr, ExprKind, Lowerer, MultiTarget};

pub(super) fn lower_assign(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    target: AssignTarget,
    name: &Name,
    value: &Expr,
) -> NodeId {
    let value_id = lowerer.lower_expr(ctx, value);
    bind(lowerer, ctx, offset, target, name, value_id)
}

/// Rebinds `name` to `value_id`: pushes the appropriate write node, tracks
/// its structural shape when `value_id` is itself a literal with a known
/// shape (§4.1), and clears any stale shape entry otherwise.
fn bind(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    target: AssignTarget,
    name: &Name,
    value_id: NodeId,
) -> NodeId {
    match target {
        AssignTarget::Local => {
            let called_methods = lowerer.fresh_called_methods();
            let write_id = lowerer.push(
                ctx,
                offset,
                NodeKind::LocalWrite {
                    name: name.clone(),
                    value: value_id,
                    called_methods,
                },
            );
            ctx.variables.insert(name.clone(), write_id);
            match literal_ty_of(&lowerer.arena, value_id) {
                Ty::Unknown => {
                    ctx.shapes.remove(name);
                }
                ty => {
                    ctx.shapes.insert(name.clone(), ty);
                }
            }
            write_id
        }
        AssignTarget::Ivar => {
            let class = ctx.class_path.last().cloned().unwrap_or_default();
            let write_id = lowerer.push(
                ctx,
                offset,
                NodeKind::IvarWrite {
                    class,
                    name: name.clone(),
                    value: value_id,
                },
            );
            if ctx.method_name.is_some() {
                ctx.narrowed_ivars.insert(name.clone(), write_id);
            } else {
                ctx.instance_variables.insert(name.clone(), write_id);
            }
            write_id
        }
        AssignTarget::Cvar => {
            let write_id = lowerer.push(
                ctx,
                offset,
                NodeKind::CvarWrite {
                    name: name.clone(),
                    value: value_id,
                },
            );
            ctx.class_variables.insert(name.clone(), write_id);
            write_id
        }
    }
}

/// Reads the variable's current binding before a compound assignment
/// touches it; an unbound name reads as `Unknown` (e.g. `x ||= 1` where `x`
/// has no prior assignment in this scope).
fn current_read(lowerer: &mut Lowerer, ctx: &Context, offset: u32, target: AssignTarget, name: &Name) -> NodeId {
    match target {
        AssignTarget::Local => match ctx.variables.get(name).copied() {
            Some(write) => {
                let called_methods = lowerer.called_methods_of(write);
                lowerer.push(
                    ctx,
                    offset,
                    NodeKind::LocalRead {
                        name: name.clone(),
                        write: Some(write),
                        called_methods,
                    },
                )
            }
            None => lowerer.push(
                ctx,
                offset,
                NodeKind::LocalRead {
                    name: name.clone(),
                    write: None,
                    called_methods: lowerer.fresh_called_methods(),
                },
            ),
        },
        AssignTarget::Ivar => {
            let class = ctx.class_path.last().cloned().unwrap_or_default();
            lowerer.push(
                ctx,
                offset,
                NodeKind::IvarRead {
                    class,
                    name: name.clone(),
                    write: ctx.ivar(name),
                },
            )
        }
        AssignTarget::Cvar => lowerer.push(
            ctx,
            offset,
            NodeKind::CvarRead {
                name: name.clone(),
                write: ctx.class_variables.get(name).copied(),
            },
        ),
    }
}

#[allow(clippy::too_many_arguments)]
pub(super) fn lower_op_assign(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    target: AssignTarget,
    name: &Name,
    op: Option<&Name>,
    logical_and: bool,
    value: &Expr,
) -> NodeId {
    let lhs = current_read(lowerer, ctx, offset, target, name);
    let value_id = lowerer.lower_expr(ctx, value);

    let combined = match op {
        None if logical_and => lowerer.push(ctx, offset, NodeKind::And { lhs, rhs: value_id }),
        None => lowerer.push(ctx, offset, NodeKind::Or { lhs, rhs: value_id }),
        Some(method) => lowerer.push(
            ctx,
            offset,
            NodeKind::Call {
                method: method.clone(),
                receiver: Some(lhs),
                args: vec![value_id],
                block_body: None,
                has_block: false,
                implicit_self: false,
            },
        ),
    };

    bind(lowerer, ctx, offset, target, name, combined)
}

pub(super) fn lower_multiple_assign(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    targets: &[MultiTarget],
    value: &Expr,
) -> NodeId {
    let value_id = lowerer.lower_expr(ctx, value);

    for target in targets {
        match target {
            MultiTarget::Plain { name, .. } => {
                let elem_id = index_call(lowerer, ctx, offset, value_id);
                let called_methods = lowerer.fresh_called_methods();
                let write_id = lowerer.push(
                    ctx,
                    offset,
                    NodeKind::LocalWrite {
                        name: name.clone(),
                        value: elem_id,
                        called_methods,
                    },
                );
                ctx.variables.insert(name.clone(), write_id);
                ctx.shapes.remove(name);
            }
            MultiTarget::Rest { name } => {
                let lit_id = lowerer.push(
                    ctx,
                    offset,
                    NodeKind::Literal {
                        ty: Ty::Array(Arc::new(Ty::Unknown)),
                        children: vec![],
                    },
                );
                let called_methods = lowerer.fresh_called_methods();
                let write_id = lowerer.push(
                    ctx,
                    offset,
                    NodeKind::LocalWrite {
                        name: name.clone(),
                        value: lit_id,
                        called_methods,
                    },
                );
                ctx.variables.insert(name.clone(), write_id);
                ctx.shapes.remove(name);
            }
        }
    }

    value_id
}

/// Synthesizes `receiver[<unknown index>]`, the same shape of `Call` node a
/// literal `a[i]` expression would lower to (§4.1): the destructured
/// element's precise per-position type isn't recoverable without a literal
/// integer payload on `IntLit`, so both a real index expression and a
/// destructuring target resolve through the same declared `Elem`
/// substitution, and only fall back to `Unknown` for a `Tuple` receiver
/// (not modeled by `substitution_for_call`, see DESIGN.md).
fn index_call(lowerer: &mut Lowerer, ctx: &Context, offset: u32, receiver: NodeId) -> NodeId {
    let idx = lowerer.push(
        ctx,
        offset,
        NodeKind::Literal {
            ty: Ty::Instance("Integer".into()),
            children: vec![],
        },
    );
    lowerer.push(
        ctx,
        offset,
        NodeKind::Call {
            method: Name::from("[]"),
            receiver: Some(receiver),
            args: vec![idx],
            block_body: None,
            has_block: false,
            implicit_self: false,
        },
    )
}

pub(super) fn lower_index_assign(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    receiver: &Expr,
    index: &Expr,
    value: &Expr,
) -> NodeId {
    let value_id = lowerer.lower_expr(ctx, value);

    if let (ExprKind::LocalRef(name), Some(shape)) = (&receiver.kind, tracked_shape(ctx, receiver)) {
        let value_ty = literal_ty_of(&lowerer.arena, value_id);
        let widened = widen_for_index_assign(&shape, index, value_ty);
        let Some(old_write) = ctx.variables.get(name).copied() else {
            return fallback_index_assign(lowerer, ctx, offset, receiver, index, value_id);
        };
        let called_methods = lowerer.called_methods_of(old_write);
        let synthetic_value = lowerer.push(
            ctx,
            offset,
            NodeKind::Literal {
                ty: widened.clone(),
                children: vec![old_write, value_id],
            },
        );
        let new_write = lowerer.push(
            ctx,
            offset,
            NodeKind::LocalWrite {
                name: name.clone(),
                value: synthetic_value,
                called_methods,
            },
        );
        ctx.variables.insert(name.clone(), new_write);
        ctx.shapes.insert(name.clone(), widened);
        return value_id;
    }

    fallback_index_assign(lowerer, ctx, offset, receiver, index, value_id)
}

fn fallback_index_assign(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    receiver: &Expr,
    index: &Expr,
    value_id: NodeId,
) -> NodeId {
    let recv_id = lowerer.lower_expr(ctx, receiver);
    let idx_id = lowerer.lower_expr(ctx, index);
    lowerer.push(
        ctx,
        offset,
        NodeKind::Call {
            method: Name::from("[]="),
            receiver: Some(recv_id),
            args: vec![idx_id, value_id],
            block_body: None,
            has_block: false,
            implicit_self: false,
        },
    );
    value_id
}

pub(super) fn lower_shovel_assign(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    receiver: &Expr,
    value: &Expr,
) -> NodeId {
    let value_id = lowerer.lower_expr(ctx, value);

    if let (ExprKind::LocalRef(name), Some(shape)) = (&receiver.kind, tracked_shape(ctx, receiver)) {
        let value_ty = literal_ty_of(&lowerer.arena, value_id);
        let widened = match shape {
            Ty::Array(elem) => Ty::Array(Arc::new(Ty::union([(*elem).clone(), value_ty]))),
            Ty::Tuple(elems) => Ty::Array(Arc::new(Ty::union(
                elems.iter().cloned().chain(std::iter::once(value_ty)),
            ))),
            other => other,
        };
        if let Some(old_write) = ctx.variables.get(name).copied() {
            let called_methods = lowerer.called_methods_of(old_write);
            let synthetic_value = lowerer.push(
                ctx,
                offset,
                NodeKind::Literal {
                    ty: widened.clone(),
                    children: vec![old_write, value_id],
                },
            );
            let new_write = lowerer.push(
                ctx,
                offset,
                NodeKind::LocalWrite {
                    name: name.clone(),
                    value: synthetic_value,
                    called_methods,
                },
            );
            ctx.variables.insert(name.clone(), new_write);
            ctx.shapes.insert(name.clone(), widened);
            return value_id;
        }
    }

    let recv_id = lowerer.lower_expr(ctx, receiver);
    lowerer.push(
        ctx,
        offset,
        NodeKind::Call {
            method: Name::from("<<"),
            receiver: Some(recv_id),
            args: vec![value_id],
            block_body: None,
            has_block: false,
            implicit_self: false,
        },
    );
    value_id
}

fn tracked_shape(ctx: &Context, receiver: &Expr) -> Option<Ty> {
    match &receiver.kind {
        ExprKind::LocalRef(name) => ctx.shapes.get(name).cloned(),
        _ => None,
    }
}

fn symbol_key(expr: &Expr) -> Option<&Name> {
    match &expr.kind {
        ExprKind::SymbolLit(name) => Some(name),
        _ => None,
    }
}

/// A light, non-lowering guess at an index expression's type, used only to
/// widen a `Hash`'s key type when a non-symbol key is assigned through an
/// already-`Hash`-shaped binding; the index expression itself is not
/// lowered into a node here (mirroring how a `HashLit`'s symbol keys never
/// get a node of their own either).
fn index_ty_hint(expr: &Expr) -> Ty {
    match &expr.kind {
        ExprKind::IntLit => Ty::Instance("Integer".into()),
        ExprKind::FloatLit => Ty::Instance("Float".into()),
        ExprKind::StringLit => Ty::Instance("String".into()),
        ExprKind::SymbolLit(_) => Ty::Instance("Symbol".into()),
        ExprKind::NilLit => Ty::Instance("NilClass".into()),
        ExprKind::BoolLit(_) => Ty::union([
            Ty::Instance("TrueClass".into()),
            Ty::Instance("FalseClass".into()),
        ]),
        _ => Ty::Unknown,
    }
}

/// §4.1's container-mutation widening table for `receiver[index] = value`:
/// a `HashShape` stays structural for a symbol key, widens to a nominal
/// `Hash` on the first non-symbol key; a `Hash` just unions in the new
/// key/value types; a `Tuple` degrades to a homogeneous `Array` (its
/// per-position precision can't survive an index-assign without a literal
/// index value to target); an `Array` unions in the new element type.
fn widen_for_index_assign(shape: &Ty, index: &Expr, value_ty: Ty) -> Ty {
    match shape {
        Ty::HashShape(fields) => match symbol_key(index) {
            Some(key) => {
                let mut updated = (**fields).clone();
                updated.insert(key.clone(), value_ty);
                Ty::HashShape(Arc::new(updated))
            }
            None => {
                let existing_val = Ty::union(fields.values().cloned());
                Ty::Hash(
                    Arc::new(Ty::union([Ty::Instance("Symbol".into()), index_ty_hint(index)])),
                    Arc::new(Ty::union([existing_val, value_ty])),
                )
            }
        },
        Ty::Hash(k, v) => Ty::Hash(
            Arc::new(Ty::union([(**k).clone(), index_ty_hint(index)])),
            Arc::new(Ty::union([(**v).clone(), value_ty])),
        ),
        Ty::Tuple(elems) => Ty::Array(Arc::new(Ty::union(
            elems.iter().cloned().chain(std::iter::once(value_ty)),
        ))),
        Ty::Array(elem) => Ty::Array(Arc::new(Ty::union([(**elem).clone(), value_ty]))),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registries;

    fn lowerer(regs: &Registries) -> Lowerer<'_> {
        Lowerer::new("a.rb".into(), regs)
    }

    #[test]
    fn plain_local_assign_tracks_tuple_shape() {
        let regs = Registries::new();
        let mut l = lowerer(&regs);
        let mut ctx = Context::root();
        let value = Expr::new(0, ExprKind::ArrayLit(vec![Expr::new(1, ExprKind::IntLit)]));
        lower_assign(&mut l, &mut ctx, 0, AssignTarget::Local, &Name::from("x"), &value);
        assert!(matches!(ctx.shapes.get("x"), Some(Ty::Tuple(_))));
    }

    #[test]
    fn hash_shape_index_assign_with_symbol_key_stays_structural() {
        let regs = Registries::new();
        let mut l = lowerer(&regs);
        let mut ctx = Context::root();
        let hash_lit = Expr::new(
            0,
            ExprKind::HashLit(vec![(super::super::HashKey::Symbol("a".into()), Expr::new(1, ExprKind::IntLit))]),
        );
        lower_assign(&mut l, &mut ctx, 0, AssignTarget::Local, &Name::from("h"), &hash_lit);

        let receiver = Expr::new(2, ExprKind::LocalRef("h".into()));
        let index = Expr::new(3, ExprKind::SymbolLit("b".into()));
        let value = Expr::new(4, ExprKind::StringLit);
        lower_index_assign(&mut l, &mut ctx, 5, &receiver, &index, &value);

        match ctx.shapes.get("h") {
            Some(Ty::HashShape(fields)) => {
                assert_eq!(fields.get("a"), Some(&Ty::Instance("Integer".into())));
                assert_eq!(fields.get("b"), Some(&Ty::Instance("String".into())));
            }
            other => panic!("expected HashShape, got {other:?}"),
        }
    }

    #[test]
    fn hash_shape_index_assign_with_non_symbol_key_widens_to_hash() {
        let regs = Registries::new();
        let mut l = lowerer(&regs);
        let mut ctx = Context::root();
        let hash_lit = Expr::new(
            0,
            ExprKind::HashLit(vec![(super::super::HashKey::Symbol("a".into()), Expr::new(1, ExprKind::IntLit))]),
        );
        lower_assign(&mut l, &mut ctx, 0, AssignTarget::Local, &Name::from("h"), &hash_lit);

        let receiver = Expr::new(2, ExprKind::LocalRef("h".into()));
        let index = Expr::new(3, ExprKind::StringLit);
        let value = Expr::new(4, ExprKind::StringLit);
        lower_index_assign(&mut l, &mut ctx, 5, &receiver, &index, &value);

        assert!(matches!(ctx.shapes.get("h"), Some(Ty::Hash(_, _))));
    }

    #[test]
    fn shovel_on_array_unions_element_type() {
        let regs = Registries::new();
        let mut l = lowerer(&regs);
        let mut ctx = Context::root();
        // Directly seed a tracked Array shape, bypassing an opaque call
        // result (lowering a call gives no literal shape to track).
        let write = l.push(
            &ctx,
            0,
            NodeKind::LocalWrite {
                name: "xs".into(),
                value: NodeId(0),
                called_methods: l.fresh_called_methods(),
            },
        );
        ctx.variables.insert("xs".into(), write);
        ctx.shapes.insert("xs".into(), Ty::Array(Arc::new(Ty::Instance("Integer".into()))));

        let receiver = Expr::new(1, ExprKind::LocalRef("xs".into()));
        let pushed = Expr::new(2, ExprKind::StringLit);
        lower_shovel_assign(&mut l, &mut ctx, 3, &receiver, &pushed);

        match ctx.shapes.get("xs") {
            Some(Ty::Array(elem)) => assert_eq!(
                **elem,
                Ty::union([Ty::Instance("Integer".into()), Ty::Instance("String".into())])
            ),
            other => panic!("expected Array, got {other:?}"),
        }
    }
}
