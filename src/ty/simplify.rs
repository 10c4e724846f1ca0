//! The type simplifier (§4.3).
//!
//! Operates only on `Ty::Union`; every other variant passes through
//! unchanged. Grounded on the shape of `tinymist-analysis/src/ty/simplify.rs`
//! (a cache-backed worker struct invoked once per query) but without that
//! file's polarity/type-variable-bounds machinery, which this language does
//! not have: user-defined classes here carry no generics (Non-goal, §1), so
//! there is nothing to analyze besides the union itself.

use crate::ty::def::Ty;

/// Supplies ancestry information for the "collapse to common ancestor" step.
/// Implemented by the combination of the declared-signature adapter (for
/// library classes) and the local class registry (for user-defined classes);
/// see `resolver::Engine::ancestors_of`.
pub trait AncestorProvider {
    /// Returns the ancestor chain of `class`, nearest-first, not including
    /// `class` itself.
    fn ancestors_of(&self, class: &str) -> Vec<String>;
}

/// Simplifies `ty` per §4.3, using `max_union` as the post-simplification
/// collapse threshold (§6.4's `max_union`, default 3).
pub fn simplify(ty: Ty, ancestors: &dyn AncestorProvider, max_union: usize) -> Ty {
    let Ty::Union(members) = ty else {
        return ty;
    };

    // Step 1-2 are already guaranteed by `Ty::union`'s constructor (flatten +
    // dedup), but a union may arrive here after substitution, so redo it
    // defensively rather than trust the caller.
    let mut flat = Ty::union(members.iter().cloned());

    // Step 3: collapse descendants into a common ancestor already present in
    // the union.
    if let Ty::Union(members) = &flat {
        if let Some(collapsed) = collapse_to_common_ancestor(members, ancestors) {
            flat = collapsed;
        }
    }

    // Step 4: unwrap singleton unions (handled by `Ty::union`, but
    // `collapse_to_common_ancestor` can also produce one).
    if let Ty::Union(members) = &flat {
        if members.len() == 1 {
            return members[0].clone();
        }
    }

    // Step 5: collapse to `Unknown` past the configured maximum.
    if let Ty::Union(members) = &flat {
        if members.len() > max_union {
            return Ty::Unknown;
        }
    }

    flat
}

fn collapse_to_common_ancestor(members: &[Ty], ancestors: &dyn AncestorProvider) -> Option<Ty> {
    let instances: Vec<&str> = members
        .iter()
        .filter_map(|t| match t {
            Ty::Instance(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();
    if instances.len() < 2 || instances.len() != members.len() {
        // Only collapse when every member of the union is a plain class
        // instance; mixed unions (e.g. `Instance | Array`) are left alone.
        return None;
    }

    for name in &instances {
        if !members
            .iter()
            .any(|t| matches!(t, Ty::Instance(n) if n == name))
        {
            continue;
        }
        let chain = ancestors.ancestors_of(name);
        let is_common_ancestor = instances.iter().all(|other| {
            other == name || chain.iter().any(|a| a == other) || {
                let other_chain = ancestors.ancestors_of(other);
                other_chain.iter().any(|a| a == name)
            }
        });
        if is_common_ancestor {
            let descendants_of_name: usize = instances
                .iter()
                .filter(|other| {
                    **other != *name && ancestors.ancestors_of(other).iter().any(|a| a == name)
                })
                .count();
            if descendants_of_name == instances.len() - 1 {
                return Some(Ty::Instance((*name).into()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeAncestors(HashMap<&'static str, Vec<&'static str>>);
    impl AncestorProvider for FakeAncestors {
        fn ancestors_of(&self, class: &str) -> Vec<String> {
            self.0
                .get(class)
                .map(|v| v.iter().map(|s| s.to_string()).collect())
                .unwrap_or_default()
        }
    }

    fn ancestors() -> FakeAncestors {
        let mut m = HashMap::new();
        m.insert("Dog", vec!["Animal", "Object"]);
        m.insert("Cat", vec!["Animal", "Object"]);
        m.insert("Animal", vec!["Object"]);
        FakeAncestors(m)
    }

    #[test]
    fn collapses_descendants_to_common_ancestor() {
        let ty = Ty::union([
            Ty::Instance("Dog".into()),
            Ty::Instance("Cat".into()),
            Ty::Instance("Animal".into()),
        ]);
        assert_eq!(simplify(ty, &ancestors(), 3), Ty::Instance("Animal".into()));
    }

    #[test]
    fn oversized_union_collapses_to_unknown() {
        let ty = Ty::union([
            Ty::Instance("A".into()),
            Ty::Instance("B".into()),
            Ty::Instance("C".into()),
            Ty::Instance("D".into()),
        ]);
        assert_eq!(simplify(ty, &ancestors(), 3), Ty::Unknown);
    }

    #[test]
    fn unrelated_union_is_untouched() {
        let ty = Ty::union([Ty::Instance("Integer".into()), Ty::Instance("String".into())]);
        assert_eq!(simplify(ty.clone(), &ancestors(), 3), ty);
    }
}
