//! The on-disk cache file format (§6.1): a schema kept deliberately separate
//! from the internal `Ty`/`MethodSignature` types, so a future change to
//! the internal type language doesn't silently change the cache's on-disk
//! shape (and vice versa -- a version bump here is an explicit, reviewable
//! decision).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ty::{BlockSignature, MethodSignature, ParamKind, ParamType, Ty};

pub const SCHEMA_VERSION: u32 = 1;

/// Tagged union mirroring §3.1's `Ty` variants, `_type` ∈ the set §6.1
/// names. `Self` is a reserved word in Rust, so the variant is named
/// `SelfTy` and renamed on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum SerializedType {
    Unknown,
    Instance { name: String },
    Singleton { name: String },
    Array { elem: Box<SerializedType> },
    Tuple { elems: Vec<SerializedType> },
    Hash { key: Box<SerializedType>, value: Box<SerializedType> },
    HashShape { fields: BTreeMap<String, SerializedType> },
    Range { elem: Box<SerializedType> },
    Union { members: Vec<SerializedType> },
    TypeVar { name: String },
    #[serde(rename = "Self")]
    SelfTy,
    ForwardingArgs,
    MethodSignature { sig: Box<SerializedSig> },
}

impl SerializedType {
    pub fn from_ty(ty: &Ty) -> Self {
        match ty {
            Ty::Unknown => SerializedType::Unknown,
            Ty::Instance(name) => SerializedType::Instance { name: name.to_string() },
            Ty::Singleton(name) => SerializedType::Singleton { name: name.to_string() },
            Ty::SelfTy => SerializedType::SelfTy,
            Ty::Array(elem) => SerializedType::Array { elem: Box::new(SerializedType::from_ty(elem)) },
            Ty::Tuple(elems) => {
                SerializedType::Tuple { elems: elems.iter().map(SerializedType::from_ty).collect() }
            }
            Ty::Hash(k, v) => SerializedType::Hash {
                key: Box::new(SerializedType::from_ty(k)),
                value: Box::new(SerializedType::from_ty(v)),
            },
            Ty::HashShape(fields) => SerializedType::HashShape {
                fields: fields.iter().map(|(k, v)| (k.to_string(), SerializedType::from_ty(v))).collect(),
            },
            Ty::Range(elem) => SerializedType::Range { elem: Box::new(SerializedType::from_ty(elem)) },
            Ty::Union(members) => {
                SerializedType::Union { members: members.iter().map(SerializedType::from_ty).collect() }
            }
            Ty::TypeVar(name) => SerializedType::TypeVar { name: name.to_string() },
            Ty::ForwardingArgs => SerializedType::ForwardingArgs,
            // The top-level `SerializedSig` schema carries no block field
            // (§6.1); a nested `MethodSignature` value loses its block
            // shape on round-trip, which is the only lossy conversion this
            // schema performs (see DESIGN.md).
            Ty::MethodSignature(sig) => {
                SerializedType::MethodSignature { sig: Box::new(SerializedSig::from_signature(sig)) }
            }
        }
    }

    pub fn to_ty(&self) -> Ty {
        use std::sync::Arc;
        match self {
            SerializedType::Unknown => Ty::Unknown,
            SerializedType::Instance { name } => Ty::Instance(name.as_str().into()),
            SerializedType::Singleton { name } => Ty::Singleton(name.as_str().into()),
            SerializedType::SelfTy => Ty::SelfTy,
            SerializedType::Array { elem } => Ty::Array(Arc::new(elem.to_ty())),
            SerializedType::Tuple { elems } => Ty::Tuple(Arc::new(elems.iter().map(Self::to_ty).collect())),
            SerializedType::Hash { key, value } => Ty::Hash(Arc::new(key.to_ty()), Arc::new(value.to_ty())),
            SerializedType::HashShape { fields } => Ty::HashShape(Arc::new(
                fields.iter().map(|(k, v)| (k.as_str().into(), v.to_ty())).collect(),
            )),
            SerializedType::Range { elem } => Ty::Range(Arc::new(elem.to_ty())),
            SerializedType::Union { members } => Ty::union(members.iter().map(Self::to_ty)),
            SerializedType::TypeVar { name } => Ty::TypeVar(name.as_str().into()),
            SerializedType::ForwardingArgs => Ty::ForwardingArgs,
            SerializedType::MethodSignature { sig } => Ty::MethodSignature(Arc::new(sig.to_signature())),
        }
    }
}

/// One serialized parameter (§6.1's `SerializedSig.params[]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedParam {
    pub name: String,
    pub kind: String,
    #[serde(rename = "type")]
    pub ty: SerializedType,
}

/// `SerializedSig` (§6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedSig {
    pub return_type: SerializedType,
    pub params: Vec<SerializedParam>,
}

impl SerializedSig {
    pub fn from_signature(sig: &MethodSignature) -> Self {
        SerializedSig {
            return_type: SerializedType::from_ty(&sig.return_ty),
            params: sig
                .params
                .iter()
                .map(|p| SerializedParam {
                    name: p.name.to_string(),
                    kind: param_kind_to_str(p.kind).to_string(),
                    ty: SerializedType::from_ty(&p.ty),
                })
                .collect(),
        }
    }

    pub fn to_signature(&self) -> MethodSignature {
        MethodSignature {
            params: self
                .params
                .iter()
                .map(|p| ParamType {
                    name: p.name.as_str().into(),
                    kind: str_to_param_kind(&p.kind),
                    ty: p.ty.to_ty(),
                })
                .collect(),
            return_ty: self.return_type.to_ty(),
            // Dropped on serialize (see `SerializedType::from_ty`); a
            // cached method never carries a reconstructed block shape.
            block: None::<BlockSignature>,
        }
    }
}

fn param_kind_to_str(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Required => "required",
        ParamKind::Optional => "optional",
        ParamKind::Rest => "rest",
        ParamKind::KeywordRequired => "keyword_required",
        ParamKind::KeywordOptional => "keyword_optional",
        ParamKind::KeywordRest => "keyword_rest",
        ParamKind::Block => "block",
        ParamKind::Forwarding => "forwarding",
    }
}

fn str_to_param_kind(s: &str) -> ParamKind {
    match s {
        "optional" => ParamKind::Optional,
        "rest" => ParamKind::Rest,
        "keyword_required" => ParamKind::KeywordRequired,
        "keyword_optional" => ParamKind::KeywordOptional,
        "keyword_rest" => ParamKind::KeywordRest,
        "block" => ParamKind::Block,
        "forwarding" => ParamKind::Forwarding,
        _ => ParamKind::Required,
    }
}

/// One library's cached signature set, keyed `class_name -> method_name`
/// (§6.1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLibrary {
    pub version: u32,
    #[serde(default = "default_true")]
    pub fully_inferred: bool,
    #[serde(default)]
    pub lazy_only: bool,
    pub instance_methods: BTreeMap<String, BTreeMap<String, SerializedSig>>,
    pub class_methods: BTreeMap<String, BTreeMap<String, SerializedSig>>,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn round_trips_every_type_variant() {
        let samples = vec![
            Ty::Unknown,
            Ty::Instance("Integer".into()),
            Ty::Singleton("Integer".into()),
            Ty::SelfTy,
            Ty::Array(Arc::new(Ty::Instance("String".into()))),
            Ty::Tuple(Arc::new(vec![Ty::Instance("Integer".into()), Ty::Instance("String".into())])),
            Ty::Hash(Arc::new(Ty::Instance("Symbol".into())), Arc::new(Ty::Instance("Integer".into()))),
            Ty::Range(Arc::new(Ty::Instance("Integer".into()))),
            Ty::union([Ty::Instance("Integer".into()), Ty::Instance("String".into())]),
            Ty::TypeVar("Elem".into()),
            Ty::ForwardingArgs,
        ];
        for ty in samples {
            let serialized = SerializedType::from_ty(&ty);
            assert_eq!(serialized.to_ty(), ty);
        }
    }

    #[test]
    fn json_round_trip_preserves_schema_version() {
        let lib = CachedLibrary {
            version: SCHEMA_VERSION,
            fully_inferred: true,
            lazy_only: true,
            instance_methods: BTreeMap::new(),
            class_methods: BTreeMap::new(),
        };
        let json = serde_json::to_string(&lib).unwrap();
        let back: CachedLibrary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, lib);
    }

    #[test]
    fn missing_fully_inferred_defaults_to_true() {
        let json = r#"{"version":1,"instance_methods":{},"class_methods":{}}"#;
        let lib: CachedLibrary = serde_json::from_str(json).unwrap();
        assert!(lib.fully_inferred);
        assert!(!lib.lazy_only);
    }
}
