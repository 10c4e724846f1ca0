//! The coverage reporter (§4.7): walks the location index and reports how
//! much of a project actually got a non-`Unknown` type.
//!
//! Grounded on `tinymist-debug`'s coverage-result shape (a per-kind tally
//! plus a single aggregate score) but computed from the resolver's own
//! inference rather than a runtime trace, since this core has no runtime
//! evaluation (Non-goal, §1).

use std::collections::BTreeMap;

use crate::ir::{FileId, NodeKind};
use crate::resolver::{self, Engine};
use crate::ty::Ty;

/// Typed/total tally for one IR node kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeKindCoverage {
    pub typed: usize,
    pub total: usize,
}

impl NodeKindCoverage {
    /// `typed / total`, or `0.0` for a kind with no observed nodes rather
    /// than a `NaN` from the division.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.typed as f64 / self.total as f64
        }
    }
}

/// The full report: per-kind node coverage (§4.7 "broken down by node
/// kind", `Def` excluded to avoid double-counting with the signature
/// score) and the average per-method signature score. `None` when the
/// walked files contain no `Def` at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageReport {
    pub node_coverage: BTreeMap<String, NodeKindCoverage>,
    pub signature_score: Option<f64>,
}

/// Computes §4.7's two metrics over every node the location index has
/// recorded for `files`. Nodes whose inference produces `Unknown` count as
/// untyped, not as an error (§4.7: "Nodes whose inference fails are
/// counted as untyped, not as errors").
pub fn report(engine: &Engine, files: &[FileId]) -> CoverageReport {
    let mut node_coverage: BTreeMap<String, NodeKindCoverage> = BTreeMap::new();
    let mut signature_scores: Vec<f64> = Vec::new();

    for file in files {
        let Some(arena) = engine.arena(file) else { continue };

        for node_id in engine.registries.locations.nodes_for_file(file) {
            let kind = arena.get(node_id).kind.clone();

            if let NodeKind::Def { params, return_node, .. } = &kind {
                let typed_params = params
                    .iter()
                    .filter(|p| resolver::infer(engine, file, **p).ty != Ty::Unknown)
                    .count();
                let typed_return = match return_node {
                    Some(r) if resolver::infer(engine, file, *r).ty != Ty::Unknown => 1,
                    _ => 0,
                };
                let score = (typed_params + typed_return) as f64 / (params.len() + 1) as f64;
                signature_scores.push(score);
                continue;
            }

            let entry = node_coverage
                .entry(kind.discriminator().to_string())
                .or_default();
            entry.total += 1;
            if resolver::infer(engine, file, node_id).ty != Ty::Unknown {
                entry.typed += 1;
            }
        }
    }

    let signature_score = if signature_scores.is_empty() {
        None
    } else {
        Some(signature_scores.iter().sum::<f64>() / signature_scores.len() as f64)
    };

    CoverageReport { node_coverage, signature_score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EmptySignatureProvider;
    use crate::config::Config;
    use crate::ir::FileArena;
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(Arc::new(EmptySignatureProvider), Config::default())
    }

    #[test]
    fn untyped_and_typed_literals_tally_per_kind() {
        let e = engine();
        let mut arena = FileArena::new();
        let typed = arena.push(0, NodeKind::Literal { ty: Ty::Instance("Integer".into()), children: vec![] });
        let untyped = arena.push(1, NodeKind::Literal { ty: Ty::Unknown, children: vec![] });
        let file: FileId = "a.rb".into();
        e.registries.locations.register(&file, "TopLevel", 0, typed);
        e.registries.locations.register(&file, "TopLevel", 1, untyped);
        e.install_file(file.clone(), arena);

        let report = report(&e, &[file]);
        let lit_coverage = report.node_coverage.get("literal").unwrap();
        assert_eq!(lit_coverage.total, 2);
        assert_eq!(lit_coverage.typed, 1);
        assert_eq!(lit_coverage.fraction(), 0.5);
    }

    #[test]
    fn def_is_excluded_from_node_coverage_and_scored_separately() {
        let e = engine();
        let mut arena = FileArena::new();
        let body = arena.push(0, NodeKind::Literal { ty: Ty::Instance("Integer".into()), children: vec![] });
        let def = arena.push(
            1,
            NodeKind::Def {
                name: "foo".into(),
                class: "Greeter".into(),
                params: vec![],
                return_node: Some(body),
                body,
                singleton: false,
                module_function: false,
            },
        );
        let file: FileId = "a.rb".into();
        e.registries.locations.register(&file, "Greeter", 0, body);
        e.registries.locations.register(&file, "Greeter", 1, def);
        e.install_file(file.clone(), arena);

        let report = report(&e, &[file]);
        assert!(!report.node_coverage.contains_key("def"));
        assert_eq!(report.signature_score, Some(1.0));
    }

    #[test]
    fn no_defs_yields_no_signature_score() {
        let e = engine();
        let mut arena = FileArena::new();
        let lit = arena.push(0, NodeKind::Literal { ty: Ty::Unknown, children: vec![] });
        let file: FileId = "a.rb".into();
        e.registries.locations.register(&file, "TopLevel", 0, lit);
        e.install_file(file.clone(), arena);

        assert_eq!(report(&e, &[file]).signature_score, None);
    }
}
