//! Topological build order (§4.6 step 3): dependencies before dependents,
//! cycles broken by whichever library the DFS reaches first.

use rustc_hash::FxHashSet;

/// Visits `libraries` depth-first through `deps` (a library's direct
/// dependency names), returning a dependency-first order. A library is
/// marked visited the moment the walk reaches it, before recursing into its
/// own dependencies -- so a cycle is broken by simply skipping the repeat
/// visit rather than detecting and reporting it as an error (§4.6: "cycles
/// are broken by first-visit-wins").
pub fn topological_order<F>(libraries: &[String], deps: F) -> Vec<String>
where
    F: Fn(&str) -> Vec<String>,
{
    let mut visited = FxHashSet::default();
    let mut order = Vec::with_capacity(libraries.len());
    for lib in libraries {
        visit(lib, &deps, &mut visited, &mut order);
    }
    order
}

fn visit<F>(lib: &str, deps: &F, visited: &mut FxHashSet<String>, order: &mut Vec<String>)
where
    F: Fn(&str) -> Vec<String>,
{
    if !visited.insert(lib.to_string()) {
        return;
    }
    for dep in deps(lib) {
        visit(&dep, deps, visited, order);
    }
    order.push(lib.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn dependencies_come_before_dependents() {
        let mut graph = HashMap::new();
        graph.insert("app".to_string(), vec!["rails".to_string()]);
        graph.insert("rails".to_string(), vec!["activesupport".to_string()]);
        graph.insert("activesupport".to_string(), vec![]);

        let libs = vec!["app".to_string()];
        let order = topological_order(&libs, |l| graph.get(l).cloned().unwrap_or_default());

        assert_eq!(order, vec!["activesupport", "rails", "app"]);
    }

    #[test]
    fn cycles_do_not_infinite_loop() {
        let mut graph = HashMap::new();
        graph.insert("a".to_string(), vec!["b".to_string()]);
        graph.insert("b".to_string(), vec!["a".to_string()]);

        let libs = vec!["a".to_string()];
        let order = topological_order(&libs, |l| graph.get(l).cloned().unwrap_or_default());

        assert_eq!(order.len(), 2);
        assert!(order.contains(&"a".to_string()));
        assert!(order.contains(&"b".to_string()));
    }
}
