//! The type language (§3.1) and its simplifier/formatter.

mod def;
mod format;
mod simplify;

pub use def::{BlockSignature, MethodSignature, Name, ParamKind, ParamType, Ty, TyRef};
pub use format::{render_signature, render_type};
pub use simplify::{simplify, AncestorProvider};
