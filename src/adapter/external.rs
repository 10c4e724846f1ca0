//! External type representation and its conversion into the internal type
//! language (§4.4).

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::ty::{BlockSignature, MethodSignature, Name, ParamKind, ParamType, Ty};

/// A type as expressed by the declared-signature provider, before
/// conversion. Kept separate from `ty::Ty` because the external
/// representation additionally distinguishes `Base` (the library's untyped
/// placeholder, converted to `Unknown`) from a fully-resolved type, and
/// because a provider may express tuples, which the internal language
/// widens to `Array(Union(..))` at conversion time rather than keeping as a
/// distinct external-facing concept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalType {
    /// The library's "no useful type" placeholder.
    Base,
    Instance(String),
    Array(Box<ExternalType>),
    Hash(Box<ExternalType>, Box<ExternalType>),
    Range(Box<ExternalType>),
    Tuple(Vec<ExternalType>),
    Union(Vec<ExternalType>),
    TypeVar(String),
    SelfTy,
}

/// Converts an external type into the internal type language (§4.4):
/// - class instances become `Instance`
/// - `Array`/`Hash`/`Range` keep their special-cased wrappers
/// - type variables become `TypeVar`
/// - unions become `Union`
/// - tuples become `Array(Union(element_types))`
/// - `self` becomes `SelfTy`
/// - the base placeholder becomes `Unknown`
pub fn to_internal(ext: &ExternalType) -> Ty {
    match ext {
        ExternalType::Base => Ty::Unknown,
        ExternalType::Instance(name) => Ty::Instance(name.as_str().into()),
        ExternalType::Array(elem) => Ty::Array(Arc::new(to_internal(elem))),
        ExternalType::Hash(k, v) => Ty::Hash(Arc::new(to_internal(k)), Arc::new(to_internal(v))),
        ExternalType::Range(elem) => Ty::Range(Arc::new(to_internal(elem))),
        ExternalType::Tuple(elems) => {
            let element = Ty::union(elems.iter().map(to_internal));
            Ty::Array(Arc::new(element))
        }
        ExternalType::Union(members) => Ty::union(members.iter().map(to_internal)),
        ExternalType::TypeVar(name) => Ty::TypeVar(name.as_str().into()),
        ExternalType::SelfTy => Ty::SelfTy,
    }
}

/// Substitutes every `TypeVar` in `ty` using `subst`, recursively. Type
/// variables with no entry in `subst` are left untouched (they remain
/// through substitution per §3.1).
pub fn substitute(ty: &Ty, subst: &FxHashMap<Name, Ty>) -> Ty {
    match ty {
        Ty::TypeVar(name) => subst.get(name).cloned().unwrap_or_else(|| ty.clone()),
        Ty::Array(elem) => Ty::Array(Arc::new(substitute(elem, subst))),
        Ty::Hash(k, v) => Ty::Hash(Arc::new(substitute(k, subst)), Arc::new(substitute(v, subst))),
        Ty::Range(elem) => Ty::Range(Arc::new(substitute(elem, subst))),
        Ty::Tuple(elems) => Ty::Tuple(Arc::new(elems.iter().map(|t| substitute(t, subst)).collect())),
        Ty::HashShape(fields) => Ty::HashShape(Arc::new(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), substitute(v, subst)))
                .collect(),
        )),
        Ty::Union(members) => Ty::union(members.iter().map(|t| substitute(t, subst))),
        Ty::MethodSignature(sig) => Ty::MethodSignature(Arc::new(MethodSignature {
            params: sig
                .params
                .iter()
                .map(|p| ParamType {
                    name: p.name.clone(),
                    kind: p.kind,
                    ty: substitute(&p.ty, subst),
                })
                .collect(),
            return_ty: substitute(&sig.return_ty, subst),
            block: sig.block.as_ref().map(|b| BlockSignature {
                params: b.params.iter().map(|t| substitute(t, subst)).collect(),
                return_ty: substitute(&b.return_ty, subst),
            }),
        })),
        other => other.clone(),
    }
}

/// The kind of an external parameter, mirroring `ty::ParamKind` but named
/// separately since the external form distinguishes "positional" from
/// "named" the way most declared-signature formats do, rather than this
/// language's required/optional/rest/keyword split; `to_kind` narrows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalParamKind {
    Positional,
    PositionalOptional,
    Rest,
    Keyword,
    KeywordOptional,
    KeywordRest,
    Block,
}

impl ExternalParamKind {
    pub fn to_internal(self) -> ParamKind {
        match self {
            ExternalParamKind::Positional => ParamKind::Required,
            ExternalParamKind::PositionalOptional => ParamKind::Optional,
            ExternalParamKind::Rest => ParamKind::Rest,
            ExternalParamKind::Keyword => ParamKind::KeywordRequired,
            ExternalParamKind::KeywordOptional => ParamKind::KeywordOptional,
            ExternalParamKind::KeywordRest => ParamKind::KeywordRest,
            ExternalParamKind::Block => ParamKind::Block,
        }
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalParam {
    pub name: String,
    pub kind: ExternalParamKind,
    pub ty: ExternalType,
}

/// A declared block signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalBlockSignature {
    pub params: Vec<ExternalType>,
    pub return_ty: ExternalType,
}

/// One overload of a declared method signature (§4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalOverload {
    pub params: Vec<ExternalParam>,
    pub block: Option<ExternalBlockSignature>,
    pub return_ty: ExternalType,
}

impl ExternalOverload {
    /// Converts this overload's params/return/block into the internal type
    /// language, without substitution (callers apply `substitute`
    /// afterwards using the receiver's concrete element types).
    pub fn to_signature(&self) -> MethodSignature {
        MethodSignature {
            params: self
                .params
                .iter()
                .map(|p| ParamType {
                    name: p.name.as_str().into(),
                    kind: p.kind.to_internal(),
                    ty: to_internal(&p.ty),
                })
                .collect(),
            return_ty: to_internal(&self.return_ty),
            block: self.block.as_ref().map(|b| BlockSignature {
                params: b.params.iter().map(to_internal).collect(),
                return_ty: to_internal(&b.return_ty),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_widens_to_array_union() {
        let ext = ExternalType::Tuple(vec![
            ExternalType::Instance("Integer".to_string()),
            ExternalType::Instance("String".to_string()),
        ]);
        let ty = to_internal(&ext);
        assert_eq!(
            ty,
            Ty::Array(Arc::new(Ty::union([
                Ty::Instance("Integer".into()),
                Ty::Instance("String".into())
            ])))
        );
    }

    #[test]
    fn substitution_replaces_type_vars() {
        let ty = Ty::Array(Arc::new(Ty::TypeVar("Elem".into())));
        let mut subst = FxHashMap::default();
        subst.insert(Name::from("Elem"), Ty::Instance("Integer".into()));
        assert_eq!(
            substitute(&ty, &subst),
            Ty::Array(Arc::new(Ty::Instance("Integer".into())))
        );
    }

    #[test]
    fn base_converts_to_unknown() {
        assert_eq!(to_internal(&ExternalType::Base), Ty::Unknown);
    }
}
