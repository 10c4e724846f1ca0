//! Overload resolution (§4.2 step 1, §4.4 substitution).

use rustc_hash::FxHashMap;

use crate::adapter::substitute;
use crate::ty::{MethodSignature, Name, Ty};

/// Scores one positional argument against a declared parameter type:
/// an exact class match scores high, membership in a declared union scores
/// low, and an unknown argument is neutral.
fn score_arg(arg: &Ty, param: &Ty) -> i32 {
    if matches!(arg, Ty::Unknown) {
        return 0;
    }
    if arg == param {
        return 10;
    }
    if let Ty::Union(members) = param {
        if members.iter().any(|m| m == arg) {
            return 3;
        }
    }
    -1
}

/// Scores `sig` against the call's argument types. Only positional
/// parameters are scored (named/rest scoring would require matching the
/// call's keyword arguments, which is outside this language's minimal
/// overload-selection need).
pub fn score_overload(sig: &MethodSignature, arg_types: &[Ty]) -> i32 {
    sig.params
        .iter()
        .zip(arg_types.iter())
        .map(|(p, a)| score_arg(a, &p.ty))
        .sum()
}

/// Picks the best-scoring overload; ties favor the first declared (§4.2:
/// "The overload with the highest positive score is chosen; ties favor the
/// first declared").
pub fn choose_overload<'a>(
    overloads: &'a [MethodSignature],
    arg_types: &[Ty],
) -> Option<&'a MethodSignature> {
    overloads
        .iter()
        .enumerate()
        .map(|(i, sig)| (score_overload(sig, arg_types), i, sig))
        .max_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
        .map(|(_, _, sig)| sig)
}

/// Builds the type-variable substitution map for a call: `Elem` from an
/// array receiver, `K`/`V` from a hash receiver, and `U` from the block
/// body's resolved type when the call passes a block (§4.2 step 1, §6
/// scenario 6).
pub fn substitution_for_call(
    receiver: &Ty,
    block_body_ty: Option<&Ty>,
) -> FxHashMap<Name, Ty> {
    let mut subst = FxHashMap::default();
    match receiver {
        Ty::Array(elem) => {
            subst.insert(Name::from("Elem"), (**elem).clone());
        }
        Ty::Hash(k, v) => {
            subst.insert(Name::from("K"), (**k).clone());
            subst.insert(Name::from("V"), (**v).clone());
        }
        Ty::Range(elem) => {
            subst.insert(Name::from("Elem"), (**elem).clone());
        }
        _ => {}
    }
    if let Some(block_ty) = block_body_ty {
        subst.insert(Name::from("U"), block_ty.clone());
    }
    subst
}

/// Applies `substitution_for_call`'s map to an overload's return type.
pub fn substituted_return(sig: &MethodSignature, subst: &FxHashMap<Name, Ty>) -> Ty {
    substitute(&sig.return_ty, subst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{ParamKind, ParamType};
    use std::sync::Arc;

    fn sig(param_ty: Ty, return_ty: Ty) -> MethodSignature {
        MethodSignature {
            params: vec![ParamType {
                name: "x".into(),
                kind: ParamKind::Required,
                ty: param_ty,
            }],
            return_ty,
            block: None,
        }
    }

    #[test]
    fn exact_match_wins_over_union_member() {
        let overloads = vec![
            sig(
                Ty::union([Ty::Instance("Integer".into()), Ty::Instance("String".into())]),
                Ty::Instance("A".into()),
            ),
            sig(Ty::Instance("Integer".into()), Ty::Instance("B".into())),
        ];
        let chosen = choose_overload(&overloads, &[Ty::Instance("Integer".into())]).unwrap();
        assert_eq!(chosen.return_ty, Ty::Instance("B".into()));
    }

    #[test]
    fn ties_favor_first_declared() {
        let overloads = vec![
            sig(Ty::Unknown, Ty::Instance("First".into())),
            sig(Ty::Unknown, Ty::Instance("Second".into())),
        ];
        let chosen = choose_overload(&overloads, &[Ty::Unknown]).unwrap();
        assert_eq!(chosen.return_ty, Ty::Instance("First".into()));
    }

    #[test]
    fn substitutes_elem_from_array_receiver() {
        let receiver = Ty::Array(Arc::new(Ty::Instance("Integer".into())));
        let subst = substitution_for_call(&receiver, None);
        assert_eq!(subst.get("Elem"), Some(&Ty::Instance("Integer".into())));
    }
}
