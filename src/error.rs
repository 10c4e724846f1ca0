//! The error taxonomy (§7). Resolution-path failures (cycles, depth limits,
//! adapter misses, dangling dependencies) are local recoveries that produce
//! `Unknown`/`None` and are not represented here; this enum only covers the
//! handful of operations that can genuinely fail and need to be reported to
//! a caller: cache I/O and config validation.

use thiserror::Error;

/// A fallible operation on the core's boundary. Nothing on the hover path
/// returns this type (§7: "the core never throws to the editor").
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cache I/O error for key `{key}`: {source}")]
    CacheIo {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cache entry for key `{key}` is malformed: {source}")]
    CacheFormat {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("cache schema version mismatch for key `{key}`: expected 1, got {found}")]
    CacheVersionMismatch { key: String, found: u32 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
