//! Hover response assembly (§6.5): the single entry point the editor calls.
//!
//! Grounded on the section-list-then-join shape of
//! `tinymist-query/src/hover.rs`'s `HoverWorker` (it collects `def`/`value`/
//! `preview`/`docs` into separate `Vec<String>`s and joins them with a
//! divider), scaled down to this core's two sections: the guessed type/
//! signature, and, in debug mode, its provenance and called-method set.

use std::fmt::Write as _;

use crate::ir::{FileId, NodeId, NodeKind};
use crate::resolver::{self, Engine, Provenance};
use crate::ty::{render_signature, render_type, Name, Ty};

/// One resolved hover result. Byte-offset-to-line/col conversion and
/// line/col-to-offset conversion are the source parser's job (§4.5: "The
/// core converts byte positions to line/col via a parser-provided map");
/// this entry point takes the byte offset directly rather than embedding a
/// line-index implementation that has nothing to do with type inference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverResult {
    pub ty: Ty,
    pub provenance: Provenance,
    pub method_calls: Vec<String>,
}

/// Looks up the IR node at `offset` in `file` and infers its type. Returns
/// `None` when there is no node there, or inference produced `Unknown`
/// (§7: "the hover response is either a type, a signature, or empty").
pub fn hover(engine: &Engine, file: &FileId, offset: u32) -> Option<HoverResult> {
    let node = engine.registries.locations.node_at(file, offset)?;
    let result = resolver::infer(engine, file, node);
    if result.ty == Ty::Unknown {
        return None;
    }

    let method_calls = called_methods_of(engine, file, node)
        .unwrap_or_default()
        .into_iter()
        .map(|n| n.to_string())
        .collect();

    Some(HoverResult {
        ty: result.ty,
        provenance: result.provenance,
        method_calls,
    })
}

/// Renders the Markdown sections the front-end concatenates (§6.5): the
/// guessed type or signature line, then, when `debug` is set, the reason
/// and (if non-empty) the method-call set that drove it.
pub fn render(result: &HoverResult, debug: bool) -> String {
    let mut sections = Vec::new();

    let mut head = String::new();
    match &result.ty {
        Ty::MethodSignature(sig) => {
            let _ = write!(head, "Guessed Signature: {}", render_signature(sig));
        }
        other => {
            let _ = write!(head, "Guessed Type: {}", render_type(other));
        }
    }
    sections.push(head);

    if debug {
        sections.push(format!("Reason: {}", result.provenance.label()));
        if !result.method_calls.is_empty() {
            sections.push(format!("Method calls: [{}]", result.method_calls.join(", ")));
        }
    }

    sections.join("\n\n")
}

fn called_methods_of(engine: &Engine, file: &FileId, node: NodeId) -> Option<Vec<Name>> {
    let arena = engine.arena(file)?;
    match &arena.get(node).kind {
        NodeKind::LocalRead { called_methods, .. } | NodeKind::Param { called_methods, .. } => {
            Some(called_methods.borrow().clone())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EmptySignatureProvider;
    use crate::config::Config;
    use crate::ir::{FileArena, NodeKind as NK};
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(Arc::new(EmptySignatureProvider), Config::default())
    }

    #[test]
    fn hover_on_literal_renders_guessed_type() {
        let e = engine();
        let mut arena = FileArena::new();
        let lit = arena.push(5, NK::Literal { ty: Ty::Instance("Integer".into()), children: vec![] });
        let file: FileId = "a.rb".into();
        e.registries.locations.register(&file, "TopLevel", 5, lit);
        e.install_file(file.clone(), arena);

        let result = hover(&e, &file, 5).unwrap();
        assert_eq!(render(&result, false), "Guessed Type: Integer");
    }

    #[test]
    fn hover_on_unknown_returns_none() {
        let e = engine();
        let mut arena = FileArena::new();
        let lit = arena.push(0, NK::Literal { ty: Ty::Unknown, children: vec![] });
        let file: FileId = "a.rb".into();
        e.registries.locations.register(&file, "TopLevel", 0, lit);
        e.install_file(file.clone(), arena);

        assert!(hover(&e, &file, 0).is_none());
    }

    #[test]
    fn debug_mode_appends_reason_section() {
        let e = engine();
        let mut arena = FileArena::new();
        let lit = arena.push(0, NK::Literal { ty: Ty::Instance("String".into()), children: vec![] });
        let file: FileId = "a.rb".into();
        e.registries.locations.register(&file, "TopLevel", 0, lit);
        e.install_file(file.clone(), arena);

        let result = hover(&e, &file, 0).unwrap();
        let rendered = render(&result, true);
        assert!(rendered.contains("Reason: literal"));
    }
}
