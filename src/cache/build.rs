//! The library signature cache orchestration (§4.6): extracting a library's
//! signatures into the cache format, and loading a cached library back into
//! the method registry "as if built locally".

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::adapter::DependencyMetadata;
use crate::error::CoreError;
use crate::ir::{FileArena, FileId, GlobalNodeId, NodeKind};
use crate::registry::{singleton_class_scope_id, MethodRegistry};
use crate::resolver::{self, Engine};
use crate::ty::{Name, ParamKind, Ty};

use super::key::cache_key;
use super::order::topological_order;
use super::schema::{CachedLibrary, SerializedSig, SCHEMA_VERSION};
use super::store::CacheStore;

/// Methods checked between timeout polls (§4.6 step 4: "checked every N
/// methods via a monotonic clock").
const TIMEOUT_CHECK_INTERVAL: usize = 32;

/// Extracts every method registered under `class_scope` into the cache
/// format (§4.6 step 4). `class_scope` is the plain class name for instance
/// methods or the encoded singleton scope for class methods (§3.3) -- the
/// two never share a registry slot, so no further filtering by `Def`'s own
/// `singleton` flag is needed here. Returns `None` if `timeout` fired before
/// every method was visited -- the caller must not persist a partial result
/// (§7: "abandon the library's build; do not persist partial results").
fn extract_class(
    methods: &MethodRegistry,
    engine: &Engine,
    class_scope: &str,
    started: Instant,
    timeout: Option<Duration>,
) -> Option<BTreeMap<String, SerializedSig>> {
    let mut out = BTreeMap::new();
    for (i, method) in methods.method_names(class_scope).into_iter().enumerate() {
        if i % TIMEOUT_CHECK_INTERVAL == 0 {
            if let Some(limit) = timeout {
                if started.elapsed() > limit {
                    return None;
                }
            }
        }

        let Some(global) = methods.lookup(class_scope, &method) else { continue };
        let result = resolver::infer(engine, &global.file, global.node);
        if let Ty::MethodSignature(sig) = result.ty {
            out.insert(method.to_string(), SerializedSig::from_signature(&sig));
        }
        // Any other resolved shape is a per-method inference failure (§7):
        // skip it, keep going.
    }
    Some(out)
}

/// Extracts one library's full signature set (§4.6 steps 4-5), over every
/// class name the library's `DependencyMetadata` reports. Returns `None` on
/// a timed-out build.
pub fn extract_library(
    engine: &Engine,
    class_names: &[Name],
    per_lib_timeout: Option<Duration>,
) -> Option<CachedLibrary> {
    let started = Instant::now();
    let mut instance_methods = BTreeMap::new();
    let mut class_methods = BTreeMap::new();
    let mut fully_inferred = true;

    for class in class_names {
        let singleton_scope = singleton_class_scope_id(class);

        let Some(instance) =
            extract_class(&engine.registries.methods, engine, class, started, per_lib_timeout)
        else {
            return None;
        };
        let Some(class_level) = extract_class(
            &engine.registries.methods,
            engine,
            &singleton_scope,
            started,
            per_lib_timeout,
        ) else {
            return None;
        };

        let total = engine.registries.methods.method_names(class).len()
            + engine.registries.methods.method_names(&singleton_scope).len();
        if instance.len() + class_level.len() < total {
            fully_inferred = false;
        }

        if !instance.is_empty() {
            instance_methods.insert(class.to_string(), instance);
        }
        if !class_level.is_empty() {
            class_methods.insert(class.to_string(), class_level);
        }
    }

    Some(CachedLibrary {
        version: SCHEMA_VERSION,
        fully_inferred,
        lazy_only: true,
        instance_methods,
        class_methods,
    })
}

/// Builds and saves every library named in `libraries` (§4.6 steps 1-5),
/// visiting them in dependency-first order (step 3) so a library's own
/// declared ancestry is already registered by the time a dependent is
/// extracted. `class_names_of` maps a library to the user-visible class
/// names it defines (the partition of §4.6 step 1 -- grouping indexed files
/// by the path patterns that expose a library's name/version -- is a
/// concern of the indexing layer, not of this cache module).
pub fn build_all<S: CacheStore>(
    engine: &Engine,
    store: &S,
    deps: &dyn DependencyMetadata,
    libraries: &[(String, String)],
    class_names_of: impl Fn(&str, &str) -> Vec<Name>,
    per_lib_timeout: Option<Duration>,
) {
    let names: Vec<String> = libraries.iter().map(|(n, _)| n.clone()).collect();
    let versions: BTreeMap<String, String> = libraries.iter().cloned().collect();

    let order = topological_order(&names, |name| {
        versions
            .get(name)
            .map(|version| deps.transitive_deps(name, version).into_iter().map(|(n, _)| n).collect())
            .unwrap_or_default()
    });

    for name in order {
        let Some(version) = versions.get(&name) else { continue };
        let transitive = deps.transitive_deps(&name, version);
        let key = cache_key(&name, version, &transitive);
        if store.exists(&key) {
            continue;
        }

        let class_names = class_names_of(&name, version);
        let Some(cached) = extract_library(engine, &class_names, per_lib_timeout) else {
            log::warn!("library `{name}-{version}` timed out during signature extraction; not cached");
            continue;
        };

        match serde_json::to_vec_pretty(&cached) {
            Ok(bytes) => {
                if let Err(err) = store.save(&key, &bytes) {
                    log::warn!("failed to save cache entry `{key}`: {err}");
                }
            }
            Err(err) => log::warn!("failed to serialize cache entry `{key}`: {err}"),
        }
    }
}

/// Loads a cached library back into the method registry "as if built
/// locally" (§4.6 "Loading"): synthesizes a minimal `Def`/`Param` arena
/// whose nodes resolve directly to the cached types (a `Param`'s declared
/// type is carried the same way an ordinary default-value expression would
/// be, via a `Literal` default -- this reuses the resolver's existing
/// `Param` rule rather than adding a new one just for cached signatures).
pub fn load_into_engine(engine: &Engine, key: &str, bytes: &[u8]) -> Result<(), CoreError> {
    let lib: CachedLibrary = serde_json::from_slice(bytes)
        .map_err(|source| CoreError::CacheFormat { key: key.to_string(), source })?;
    if lib.version != SCHEMA_VERSION {
        return Err(CoreError::CacheVersionMismatch { key: key.to_string(), found: lib.version });
    }

    let file: FileId = format!("cache::{key}").into();
    let mut arena = FileArena::new();

    let mut defs: Vec<(String, Name, usize)> = Vec::new();
    for (class, methods) in &lib.instance_methods {
        for (method, sig) in methods {
            let def_id = push_cached_def(&mut arena, class, method, sig, false);
            defs.push((class.clone(), method.as_str().into(), def_id.0 as usize));
        }
    }
    for (class, methods) in &lib.class_methods {
        for (method, sig) in methods {
            let def_id = push_cached_def(&mut arena, class, method, sig, true);
            defs.push((singleton_class_scope_id(class), method.as_str().into(), def_id.0 as usize));
        }
    }

    for (class_scope, method, node_idx) in defs {
        engine.registries.methods.register(
            &class_scope,
            method,
            GlobalNodeId { file: file.clone(), node: crate::ir::NodeId(node_idx as u32) },
        );
    }
    engine.install_file(file, arena);
    Ok(())
}

fn push_cached_def(
    arena: &mut FileArena,
    class: &str,
    method: &str,
    sig: &SerializedSig,
    singleton: bool,
) -> crate::ir::NodeId {
    let mut param_ids = Vec::with_capacity(sig.params.len());
    for param in &sig.params {
        let ty = param.ty.to_ty();
        let default = arena.push(0, NodeKind::Literal { ty, children: vec![] });
        let kind = parse_param_kind(&param.kind);
        param_ids.push(arena.push(
            0,
            NodeKind::Param {
                name: param.name.as_str().into(),
                kind,
                default: Some(default),
                called_methods: fresh_called_methods(),
            },
        ));
    }

    let return_node = arena.push(0, NodeKind::Literal { ty: sig.return_type.to_ty(), children: vec![] });

    arena.push(
        0,
        NodeKind::Def {
            name: method.into(),
            class: class.into(),
            params: param_ids,
            return_node: Some(return_node),
            body: return_node,
            singleton,
            module_function: false,
        },
    )
}

fn fresh_called_methods() -> crate::ir::CalledMethods {
    Rc::new(RefCell::new(Vec::new()))
}

fn parse_param_kind(s: &str) -> ParamKind {
    match s {
        "optional" => ParamKind::Optional,
        "rest" => ParamKind::Rest,
        "keyword_required" => ParamKind::KeywordRequired,
        "keyword_optional" => ParamKind::KeywordOptional,
        "keyword_rest" => ParamKind::KeywordRest,
        "block" => ParamKind::Block,
        "forwarding" => ParamKind::Forwarding,
        _ => ParamKind::Required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::EmptySignatureProvider;
    use crate::config::Config;
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(Arc::new(EmptySignatureProvider), Config::default())
    }

    fn sample_library() -> CachedLibrary {
        let mut instance_methods = BTreeMap::new();
        let mut methods = BTreeMap::new();
        methods.insert(
            "name".to_string(),
            SerializedSig {
                return_type: super::super::schema::SerializedType::Instance { name: "String".to_string() },
                params: vec![],
            },
        );
        instance_methods.insert("Greeter".to_string(), methods);
        CachedLibrary {
            version: SCHEMA_VERSION,
            fully_inferred: true,
            lazy_only: true,
            instance_methods,
            class_methods: BTreeMap::new(),
        }
    }

    #[test]
    fn loading_a_cached_library_registers_its_methods() {
        let e = engine();
        let lib = sample_library();
        let bytes = serde_json::to_vec(&lib).unwrap();
        load_into_engine(&e, "greeter-1.0.0-abcde", &bytes).unwrap();

        let global = e.registries.methods.lookup("Greeter", "name").unwrap();
        let result = resolver::infer(&e, &global.file, global.node);
        match result.ty {
            Ty::MethodSignature(sig) => assert_eq!(sig.return_ty, Ty::Instance("String".into())),
            other => panic!("expected MethodSignature, got {other:?}"),
        }
    }

    #[test]
    fn loading_a_cached_class_method_does_not_collide_with_an_instance_method() {
        let e = engine();
        let mut lib = sample_library();
        let mut class_methods = BTreeMap::new();
        let mut methods = BTreeMap::new();
        methods.insert(
            "name".to_string(),
            SerializedSig {
                return_type: super::super::schema::SerializedType::Instance {
                    name: "Greeter".to_string(),
                },
                params: vec![],
            },
        );
        class_methods.insert("Greeter".to_string(), methods);
        lib.class_methods = class_methods;

        let bytes = serde_json::to_vec(&lib).unwrap();
        load_into_engine(&e, "greeter-1.0.0-abcde", &bytes).unwrap();

        let instance = e.registries.methods.lookup("Greeter", "name").unwrap();
        let class_level = e
            .registries
            .methods
            .lookup("Greeter::<Class:Greeter>", "name")
            .unwrap();
        assert_ne!(instance.node, class_level.node);

        let instance_result = resolver::infer(&e, &instance.file, instance.node);
        let class_result = resolver::infer(&e, &class_level.file, class_level.node);
        match (instance_result.ty, class_result.ty) {
            (Ty::MethodSignature(i), Ty::MethodSignature(c)) => {
                assert_eq!(i.return_ty, Ty::Instance("String".into()));
                assert_eq!(c.return_ty, Ty::Instance("Greeter".into()));
            }
            other => panic!("expected two MethodSignatures, got {other:?}"),
        }
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let e = engine();
        let json = r#"{"version":2,"instance_methods":{},"class_methods":{}}"#;
        let err = load_into_engine(&e, "k", json.as_bytes()).unwrap_err();
        assert!(matches!(err, CoreError::CacheVersionMismatch { found: 2, .. }));
    }
}
