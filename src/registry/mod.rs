//! Registries & indexes (§3.3): the location index, method registry, and
//! ivar/cvar/class registries. All process-wide and mutex-protected (§5).

mod class;
mod location;
mod method;
mod scope;

pub use class::{ClassRegistry, VarRegistry};
pub use location::LocationIndex;
pub use method::MethodRegistry;
pub use scope::{class_scope_id, method_scope_id, singleton_class_scope_id, ScopeType};

/// The full set of process-wide registries/indexes a session holds. One
/// instance per analysis session, owned by the editor session and passed
/// into request handlers (§9: "replace singletons ... with explicit
/// construction and injection").
#[derive(Default)]
pub struct Registries {
    pub locations: LocationIndex,
    pub methods: MethodRegistry,
    pub ivars: VarRegistry,
    pub cvars: VarRegistry,
    pub classes: ClassRegistry,
}

impl Registries {
    pub fn new() -> Self {
        Self::default()
    }
}
