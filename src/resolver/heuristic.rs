//! The method-call-set heuristic (§4.2, GLOSSARY).

use crate::resolver::engine::Engine;
use crate::resolver::provenance::{InferenceResult, Provenance};
use crate::ty::{Name, Ty};

/// Infers a receiver's type from the set of methods called on it, by
/// intersecting against every registered user-defined class's method set,
/// then keeping only the most general matches (dropping any candidate that
/// is a descendant of another candidate).
pub fn infer_from_called_methods(engine: &Engine, called: &[Name]) -> InferenceResult {
    if called.is_empty() {
        return InferenceResult::unknown();
    }

    let candidates = engine.registries.methods.classes_with_all(called);
    let candidates = most_general(engine, candidates);

    match candidates.len() {
        0 => InferenceResult::unknown(),
        1 => InferenceResult::new(
            Ty::Instance(candidates[0].as_str().into()),
            Provenance::DuckTyping,
        ),
        2..=3 => InferenceResult::new(
            Ty::union(candidates.iter().map(|c| Ty::Instance(c.as_str().into()))),
            Provenance::DuckTyping,
        ),
        _ => InferenceResult::unknown(),
    }
}

fn most_general(engine: &Engine, candidates: Vec<String>) -> Vec<String> {
    candidates
        .iter()
        .filter(|candidate| {
            !candidates.iter().any(|other| {
                other != *candidate && engine.ancestors_of(candidate).iter().any(|a| a == other)
            })
        })
        .cloned()
        .collect()
}
