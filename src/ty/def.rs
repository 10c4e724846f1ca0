//! Name Convention:
//! - `Ty`: the algebraic type language of §3.1
//! - `MethodSignature`/`ParamType`: the "not a value type" signature carried
//!   back for hover on defs/calls

use std::collections::BTreeMap;
use std::sync::Arc;

use ecow::EcoString;

/// An interned class/method/variable name.
pub type Name = EcoString;

/// A reference-counted handle to a nested type.
///
/// `tinymist-analysis/src/ty/def.rs` wraps nested types in a custom interner
/// (`adt::interner::Interned`) that deduplicates structurally equal types
/// across the whole session. That interner module wasn't available here, so
/// this crate uses a plain `Arc`; see `DESIGN.md` for the simplification.
pub type TyRef = Arc<Ty>;

/// All possible types in the inferred type language (§3.1).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ty {
    /// Top/bottom sentinel. Absorbs into unions only if alone.
    Unknown,
    /// The canonical form for a class instance.
    Instance(Name),
    /// The class object itself (`Foo` as a value, not `Foo.new`).
    Singleton(Name),
    /// `self`, resolved relative to the enclosing class context.
    SelfTy,
    /// A homogeneous array.
    Array(TyRef),
    /// An ordered, fixed-length element list created by an array literal
    /// with a statically known element count.
    Tuple(Arc<Vec<Ty>>),
    /// A nominal key/value hash.
    Hash(TyRef, TyRef),
    /// A structural record type for a symbol-keyed hash literal.
    HashShape(Arc<BTreeMap<Name, Ty>>),
    /// A range over an element type.
    Range(TyRef),
    /// A flattened, deduplicated, >=2-element union.
    Union(Arc<Vec<Ty>>),
    /// A type variable that survives substitution (used by the declared
    /// signature adapter before a receiver's types are substituted in).
    TypeVar(Name),
    /// The `...` argument-forwarding parameter.
    ForwardingArgs,
    /// Not a value type: returned for hover on method defs/calls.
    MethodSignature(Arc<MethodSignature>),
}

impl Ty {
    /// Builds a `Union` from a non-empty iterator, applying the structural
    /// invariants of §3.1: flattened, deduplicated, and unwrapped if the
    /// result has a single member.
    pub fn union<I: IntoIterator<Item = Ty>>(types: I) -> Ty {
        let mut flat = Vec::new();
        for ty in types {
            match ty {
                Ty::Union(members) => flat.extend(members.iter().cloned()),
                other => flat.push(other),
            }
        }
        flat.sort();
        flat.dedup();
        match flat.len() {
            0 => Ty::Unknown,
            1 => flat.into_iter().next().unwrap(),
            _ => Ty::Union(Arc::new(flat)),
        }
    }

    /// Whether this type is the `bool` alias, i.e. a union of exactly
    /// `TrueClass` and `FalseClass`.
    pub fn is_bool_alias(&self) -> bool {
        matches!(self, Ty::Union(members) if members.len() == 2
            && members.iter().any(|t| matches!(t, Ty::Instance(n) if n == "TrueClass"))
            && members.iter().any(|t| matches!(t, Ty::Instance(n) if n == "FalseClass")))
    }

    /// Returns the members of a union, or a single-element slice view for
    /// any other type (used by call sites that want to iterate "the
    /// possible types" uniformly).
    pub fn members(&self) -> Vec<&Ty> {
        match self {
            Ty::Union(members) => members.iter().collect(),
            other => vec![other],
        }
    }

    /// Whether the type denotes `nil`/`false` only (used by narrowing).
    pub fn is_definitely_falsy(&self) -> bool {
        self.members()
            .iter()
            .all(|t| matches!(t, Ty::Instance(n) if n == "NilClass" || n == "FalseClass"))
    }
}

/// The kind of a method/block parameter (§3.2 `Param`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum::Display)]
pub enum ParamKind {
    Required,
    Optional,
    Rest,
    KeywordRequired,
    KeywordOptional,
    KeywordRest,
    Block,
    Forwarding,
}

/// One parameter of a `MethodSignature`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamType {
    pub name: Name,
    pub kind: ParamKind,
    pub ty: Ty,
}

/// The block signature of a method (accepted block's parameter types and
/// the type the block is expected to return).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockSignature {
    pub params: Vec<Ty>,
    pub return_ty: Ty,
}

/// A full method signature, returned for hover on a `Def` or a `Call`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodSignature {
    pub params: Vec<ParamType>,
    pub return_ty: Ty,
    pub block: Option<BlockSignature>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_and_dedupes() {
        let a = Ty::Instance("Integer".into());
        let b = Ty::Instance("String".into());
        let nested = Ty::union([Ty::union([a.clone(), b.clone()]), a.clone()]);
        assert_eq!(nested, Ty::union([a, b]));
    }

    #[test]
    fn union_of_one_unwraps() {
        let a = Ty::Instance("Integer".into());
        assert_eq!(Ty::union([a.clone()]), a);
    }

    #[test]
    fn bool_alias_detection() {
        let t = Ty::Instance("TrueClass".into());
        let f = Ty::Instance("FalseClass".into());
        assert!(Ty::union([t, f]).is_bool_alias());
    }
}
