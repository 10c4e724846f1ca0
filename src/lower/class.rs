//! Class/module/method declaration lowering (§4.1 "Classes and methods",
//! §4.1 "Return assembly").

use crate::ir::{GlobalNodeId, NodeId, NodeKind};
use crate::registry::{class_scope_id, singleton_class_scope_id};
use crate::ty::Name;

use super::{Context, Expr, ExprKind, Lowerer, ParamSpec, Visibility};

#[allow(clippy::too_many_arguments)]
pub(super) fn lower_def(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    name: &Name,
    params: &[ParamSpec],
    body: &[Expr],
    singleton: bool,
    _visibility: Visibility,
    module_function: bool,
) -> NodeId {
    let mut method_ctx = ctx.fork_method(name.clone(), singleton);

    let mut param_ids = Vec::with_capacity(params.len());
    for p in params {
        let default_id = p.default.as_ref().map(|d| lowerer.lower_expr(&mut method_ctx, d));
        let called_methods = lowerer.fresh_called_methods();
        let param_id = lowerer.push(
            &method_ctx,
            offset,
            NodeKind::Param {
                name: p.name.clone(),
                kind: p.kind,
                default: default_id,
                called_methods,
            },
        );
        method_ctx.variables.insert(p.name.clone(), param_id);
        param_ids.push(param_id);
    }

    let body_start = lowerer.arena.len();
    let body_last = lowerer.lower_body(&mut method_ctx, body);
    let return_node = assemble_return(lowerer, &method_ctx, offset, body_start, body_last);

    let class: Name = class_scope_id(&ctx.class_path).into();
    let def_id = lowerer.push(
        ctx,
        offset,
        NodeKind::Def {
            name: name.clone(),
            class: class.clone(),
            params: param_ids,
            return_node,
            body: body_last,
            singleton,
            module_function,
        },
    );

    // A singleton `Def` is registered under its own encoded scope (§3.3) so
    // it never shares a registry slot with an instance method of the same
    // name -- `module_function`'s dual registration below relies on this.
    let registry_scope: Name = if singleton {
        singleton_class_scope_id(&class).into()
    } else {
        class.clone()
    };
    lowerer.registries.methods.register(
        &registry_scope,
        name.clone(),
        GlobalNodeId { file: lowerer.file.clone(), node: def_id },
    );

    def_id
}

/// Every explicit `return` reachable in the body, plus the implicit
/// fall-through value, merged into the method's return type (§4.1 "Return
/// assembly"). A method with exactly one contributing node (no explicit
/// `return` at all, or a single `return` that is also the last statement)
/// skips the `Merge` wrapper.
fn assemble_return(
    lowerer: &mut Lowerer,
    ctx: &Context,
    offset: u32,
    body_start: usize,
    body_last: NodeId,
) -> Option<NodeId> {
    let mut contributing: Vec<NodeId> = lowerer
        .arena
        .iter()
        .filter(|(id, _)| id.0 as usize >= body_start)
        .filter_map(|(id, node)| matches!(node.kind, NodeKind::Return { .. }).then_some(id))
        .collect();
    if !contributing.contains(&body_last) {
        contributing.push(body_last);
    }

    match contributing.len() {
        0 => None,
        1 => Some(contributing[0]),
        _ => Some(lowerer.push(ctx, offset, NodeKind::Merge { branches: contributing })),
    }
}

/// `module_function def foo; ...; end`: the method is registered both as
/// an ordinary instance method and as a singleton method of the enclosing
/// module. The two registrations land under distinct registry scopes
/// (plain class scope vs. the encoded singleton scope, §3.3), so both
/// lookups resolve independently and neither overwrites the other.
pub(super) fn lower_module_function(lowerer: &mut Lowerer, ctx: &mut Context, inner: &Expr) -> NodeId {
    match &inner.kind {
        ExprKind::Def { name, params, body, visibility, .. } => {
            let instance_id =
                lower_def(lowerer, ctx, inner.offset, name, params, body, false, *visibility, true);
            lower_def(lowerer, ctx, inner.offset, name, params, body, true, *visibility, true);
            instance_id
        }
        _ => lowerer.lower_expr(ctx, inner),
    }
}

pub(super) fn lower_class_def(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    name: &Name,
    superclass: Option<&Name>,
    members: &[Expr],
) -> NodeId {
    let mut class_ctx = ctx.fork_class(name.clone());
    let full_name: Name = class_scope_id(&class_ctx.class_path).into();

    lowerer.registries.classes.register(full_name.clone(), superclass.cloned());

    let member_ids: Vec<NodeId> = members
        .iter()
        .map(|m| lowerer.lower_expr(&mut class_ctx, m))
        .collect();

    lowerer.push(
        ctx,
        offset,
        NodeKind::ClassModule {
            name: full_name,
            superclass: superclass.cloned(),
            members: member_ids,
        },
    )
}

pub(super) fn lower_module_def(
    lowerer: &mut Lowerer,
    ctx: &mut Context,
    offset: u32,
    name: &Name,
    members: &[Expr],
) -> NodeId {
    let mut module_ctx = ctx.fork_class(name.clone());
    let full_name: Name = class_scope_id(&module_ctx.class_path).into();

    lowerer.registries.classes.register(full_name.clone(), None);

    let member_ids: Vec<NodeId> = members
        .iter()
        .map(|m| lowerer.lower_expr(&mut module_ctx, m))
        .collect();

    lowerer.push(
        ctx,
        offset,
        NodeKind::ClassModule { name: full_name, superclass: None, members: member_ids },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registries;

    #[test]
    fn def_registers_in_method_registry() {
        let regs = Registries::new();
        let mut l = Lowerer::new("a.rb".into(), &regs);
        let mut ctx = Context::root().fork_class("Greeter".into());

        let body = vec![Expr::new(0, ExprKind::StringLit)];
        lower_def(
            &mut l,
            &mut ctx,
            0,
            &Name::from("hello"),
            &[],
            &body,
            false,
            Visibility::Public,
            false,
        );

        let found = regs.methods.lookup("Greeter", "hello");
        assert!(found.is_some());
    }

    #[test]
    fn single_implicit_return_skips_merge_wrapper() {
        let regs = Registries::new();
        let mut l = Lowerer::new("a.rb".into(), &regs);
        let mut ctx = Context::root().fork_class("Greeter".into());

        let body = vec![Expr::new(0, ExprKind::StringLit)];
        let def_id = lower_def(
            &mut l,
            &mut ctx,
            0,
            &Name::from("hello"),
            &[],
            &body,
            false,
            Visibility::Public,
            false,
        );

        match &l.arena.get(def_id).kind {
            NodeKind::Def { return_node, body, .. } => assert_eq!(*return_node, Some(*body)),
            other => panic!("expected Def, got {other:?}"),
        }
    }
}
