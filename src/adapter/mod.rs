//! The declared-signature adapter (§4.4) and the trait boundaries for the
//! five external collaborators listed in §1/§4.5. The core never talks to a
//! concrete parser, signature database, cache backend, or editor directly —
//! only through these traits — so swapping any of them never touches
//! `ty`/`ir`/`lower`/`resolver`.

mod external;

pub use external::{
    substitute, to_internal, ExternalBlockSignature, ExternalOverload, ExternalParam,
    ExternalParamKind, ExternalType,
};

use rustc_hash::FxHashMap;

use crate::ty::Name;

/// Resolves `ClassName#method` / `ClassName.method` to a structured
/// signature, and exposes the ancestry chain used by the simplifier (§4.3).
/// Implemented out-of-core; expected to be in-memory after a one-time load
/// (§5).
pub trait SignatureProvider {
    fn signatures_for(&self, class: &str, method: &str, singleton: bool) -> Vec<ExternalOverload>;
    fn ancestors_of(&self, class: &str) -> Vec<String>;
}

/// A signature provider with nothing declared; used when no declared-library
/// data is available (e.g. a method on a purely user-defined class).
#[derive(Default)]
pub struct EmptySignatureProvider;

impl SignatureProvider for EmptySignatureProvider {
    fn signatures_for(&self, _class: &str, _method: &str, _singleton: bool) -> Vec<ExternalOverload> {
        Vec::new()
    }

    fn ancestors_of(&self, _class: &str) -> Vec<String> {
        Vec::new()
    }
}

/// An in-memory signature provider for tests and small embedded libraries:
/// keyed exactly as the method registry is, `(class, method, singleton)`.
#[derive(Default)]
pub struct MapSignatureProvider {
    signatures: FxHashMap<(String, String, bool), Vec<ExternalOverload>>,
    ancestors: FxHashMap<String, Vec<String>>,
}

impl MapSignatureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(
        mut self,
        class: impl Into<String>,
        method: impl Into<String>,
        singleton: bool,
        overloads: Vec<ExternalOverload>,
    ) -> Self {
        self.signatures
            .insert((class.into(), method.into(), singleton), overloads);
        self
    }

    pub fn with_ancestors(mut self, class: impl Into<String>, ancestors: Vec<String>) -> Self {
        self.ancestors.insert(class.into(), ancestors);
        self
    }
}

impl SignatureProvider for MapSignatureProvider {
    fn signatures_for(&self, class: &str, method: &str, singleton: bool) -> Vec<ExternalOverload> {
        self.signatures
            .get(&(class.to_string(), method.to_string(), singleton))
            .cloned()
            .unwrap_or_default()
    }

    fn ancestors_of(&self, class: &str) -> Vec<String> {
        self.ancestors.get(class).cloned().unwrap_or_default()
    }
}

/// The source-parser contract (§1, §4.5): `parse(file_content) -> AST`. Not
/// implemented here; the core only ever consumes its output (see
/// `lower::lower_file`, which takes a pre-built AST rather than source
/// text).
pub trait SourceParser {
    type Ast;
    fn parse(&self, content: &str) -> Self::Ast;
}

/// Yields the set of files belonging to a library and its transitive
/// dependency graph (§1, §4.6).
pub trait DependencyMetadata {
    fn files_of(&self, library: &str, version: &str) -> Vec<Name>;
    fn transitive_deps(&self, library: &str, version: &str) -> Vec<(String, String)>;
}
