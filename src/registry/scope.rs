//! Scope identifiers (§4.1 "Scoping").

use crate::ty::Name;

/// The kind of lexical scope a lowering `Context` represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeType {
    TopLevel,
    Class,
    Method,
    Block,
}

/// Builds the class-scope id used as a location-index/method-registry key:
/// `Outer::Inner`.
pub fn class_scope_id(class_path: &[Name]) -> String {
    class_path.iter().map(|n| n.as_str()).collect::<Vec<_>>().join("::")
}

/// Encodes a class's own singleton-class scope: `Outer::<Class:Inner>` (§3.3
/// "The `class_scope` for singleton methods is the encoded form
/// `Outer::<Class:Outer>`"). This is the method-registry/location-index key
/// a singleton `Def` is registered under, so an instance and a singleton
/// method of the same name never collide in the same table.
pub fn singleton_class_scope_id(class: &str) -> String {
    match class.rsplit_once("::") {
        Some((outer, inner)) => format!("{outer}::<Class:{inner}>"),
        None => format!("<Class:{class}>"),
    }
}

/// Builds the method-scope id: `Outer::Inner#method`, or, for a singleton
/// method, `Outer::<Class:Inner>#method` (the encoded form matching declared
/// library conventions, §3.3).
pub fn method_scope_id(class_path: &[Name], method: &Name, singleton: bool) -> String {
    let class = class_scope_id(class_path);
    let scope = if singleton { singleton_class_scope_id(&class) } else { class };
    format!("{scope}#{method}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_class_scope() {
        let path: Vec<Name> = vec!["Outer".into(), "Inner".into()];
        assert_eq!(class_scope_id(&path), "Outer::Inner");
    }

    #[test]
    fn instance_method_scope() {
        let path: Vec<Name> = vec!["Outer".into(), "Inner".into()];
        let m: Name = "method".into();
        assert_eq!(method_scope_id(&path, &m, false), "Outer::Inner#method");
    }

    #[test]
    fn singleton_method_scope() {
        let path: Vec<Name> = vec!["Outer".into(), "Inner".into()];
        let m: Name = "method".into();
        assert_eq!(
            method_scope_id(&path, &m, true),
            "Outer::<Class:Inner>#method"
        );
    }

    #[test]
    fn top_level_singleton_method_scope() {
        let path: Vec<Name> = vec!["Inner".into()];
        let m: Name = "method".into();
        assert_eq!(method_scope_id(&path, &m, true), "<Class:Inner>#method");
    }
}
