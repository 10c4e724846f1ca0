//! `InferenceResult` (§4.2): a type plus the reason it was produced, used
//! for the debug hover rendering (§6.5) and not for control flow.

use crate::ty::Ty;

/// Why a type was produced. Purely descriptive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Declared,
    Literal,
    InferredCall,
    DuckTyping,
    Unknown,
}

impl Provenance {
    pub fn label(self) -> &'static str {
        match self {
            Provenance::Declared => "declared-signature",
            Provenance::Literal => "literal",
            Provenance::InferredCall => "inferred-call",
            Provenance::DuckTyping => "duck-typing",
            Provenance::Unknown => "unknown",
        }
    }
}

/// The result of inferring one IR node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferenceResult {
    pub ty: Ty,
    pub provenance: Provenance,
}

impl InferenceResult {
    pub fn unknown() -> Self {
        Self {
            ty: Ty::Unknown,
            provenance: Provenance::Unknown,
        }
    }

    pub fn new(ty: Ty, provenance: Provenance) -> Self {
        Self { ty, provenance }
    }
}
