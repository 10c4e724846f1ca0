//! The library signature cache (§4.5-§4.7, §6): demand-avoidance for
//! declared third-party signatures, so a project doesn't re-infer a gem's
//! public surface on every run.

mod build;
mod key;
mod order;
mod schema;
mod store;

pub use build::{build_all, extract_library, load_into_engine};
pub use key::{cache_key, short_dep_hash};
pub use order::topological_order;
pub use schema::{CachedLibrary, SerializedParam, SerializedSig, SerializedType, SCHEMA_VERSION};
pub use store::{CacheStore, FsCacheStore, MemoryCacheStore};
