//! Human-readable rendering of `Ty` for hover responses (§6.5).

use std::fmt::Write as _;

use itertools::Itertools;

use crate::ty::def::{ParamKind, Ty};

/// Renders a type the way a hover response formats `Guessed Type: T`.
pub fn render_type(ty: &Ty) -> String {
    if ty.is_bool_alias() {
        return "bool".to_string();
    }

    match ty {
        Ty::Unknown => "Unknown".to_string(),
        Ty::Instance(name) => name.to_string(),
        Ty::Singleton(name) => format!("Singleton({name})"),
        Ty::SelfTy => "self".to_string(),
        Ty::Array(elem) => format!("Array[{}]", render_type(elem)),
        Ty::Tuple(elems) => format!("[{}]", elems.iter().map(render_type).join(", ")),
        Ty::Hash(k, v) => format!("Hash[{}, {}]", render_type(k), render_type(v)),
        Ty::HashShape(fields) => format!(
            "{{{}}}",
            fields.iter().map(|(name, ty)| format!("{name}: {}", render_type(ty))).join(", ")
        ),
        Ty::Range(elem) => format!("Range[{}]", render_type(elem)),
        Ty::Union(members) => members.iter().map(render_type).join(" | "),
        Ty::TypeVar(name) => name.to_string(),
        Ty::ForwardingArgs => "...".to_string(),
        Ty::MethodSignature(sig) => render_signature(sig),
    }
}

/// Renders `Guessed Signature: (params) -> return`.
pub fn render_signature(sig: &crate::ty::def::MethodSignature) -> String {
    let mut out = String::new();
    out.push('(');
    for (i, param) in sig.params.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{}", render_param(param));
    }
    out.push_str(") -> ");
    out.push_str(&render_type(&sig.return_ty));
    out
}

fn render_param(param: &crate::ty::def::ParamType) -> String {
    let ty = render_type(&param.ty);
    match param.kind {
        ParamKind::Required => format!("{}: {ty}", param.name),
        ParamKind::Optional => format!("{}: {ty} = ?", param.name),
        ParamKind::Rest => format!("*{}: {ty}", param.name),
        ParamKind::KeywordRequired => format!("{}: {ty}", param.name),
        ParamKind::KeywordOptional => format!("{}: {ty} = ?", param.name),
        ParamKind::KeywordRest => format!("**{}: {ty}", param.name),
        ParamKind::Block => format!("&{}: {ty}", param.name),
        ParamKind::Forwarding => "...".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn renders_tuple_literal() {
        let int = Ty::Instance("Integer".into());
        let tuple = Ty::Tuple(Arc::new(vec![int.clone(), int.clone(), int]));
        assert_eq!(render_type(&tuple), "[Integer, Integer, Integer]");
    }

    #[test]
    fn renders_hash_union_key() {
        let ty = Ty::Hash(
            Arc::new(Ty::union([
                Ty::Instance("String".into()),
                Ty::Instance("Symbol".into()),
            ])),
            Arc::new(Ty::Instance("Integer".into())),
        );
        assert_eq!(render_type(&ty), "Hash[String | Symbol, Integer]");
    }

    #[test]
    fn renders_bool_alias() {
        let ty = Ty::union([
            Ty::Instance("TrueClass".into()),
            Ty::Instance("FalseClass".into()),
        ]);
        assert_eq!(render_type(&ty), "bool");
    }
}
