//! Configuration knobs (§6.4).

use crate::error::CoreError;

/// Recognized options and their effects (§6.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Max types in a union post-simplification before collapsing to
    /// `Unknown`. Default 3.
    pub max_union: usize,
    /// Max resolver recursion depth. Default 5.
    pub max_depth: usize,
    /// Max constant-alias chain. Default 5.
    pub max_alias_depth: usize,
    /// Seconds for one library's signature extraction. `None` means
    /// unbounded.
    pub per_lib_timeout_s: Option<u64>,
    /// Enables hover debug rendering (reason, inferred-from set).
    pub debug: bool,
    /// Toggles the library signature cache (§4.6).
    pub enable_library_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_union: 3,
            max_depth: 5,
            max_alias_depth: 5,
            per_lib_timeout_s: None,
            debug: false,
            enable_library_cache: true,
        }
    }
}

impl Config {
    /// Clamps the numeric knobs to sane non-zero minimums, rather than
    /// letting a `max_depth: 0` silently turn the resolver into a machine
    /// that infers `Unknown` for everything. Not specified by §6.4 itself,
    /// but every complete config surface validates its own invariants before
    /// they reach the hot path (supplemented feature, see `SPEC_FULL.md`
    /// §C).
    pub fn validated(self) -> Result<Self, CoreError> {
        if self.max_union == 0 {
            return Err(CoreError::InvalidConfig(
                "max_union must be at least 1".to_string(),
            ));
        }
        if self.max_depth == 0 {
            return Err(CoreError::InvalidConfig(
                "max_depth must be at least 1".to_string(),
            ));
        }
        if self.max_alias_depth == 0 {
            return Err(CoreError::InvalidConfig(
                "max_alias_depth must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let c = Config::default();
        assert_eq!(c.max_union, 3);
        assert_eq!(c.max_depth, 5);
        assert_eq!(c.max_alias_depth, 5);
        assert!(c.enable_library_cache);
    }

    #[test]
    fn zero_max_depth_is_rejected() {
        let c = Config {
            max_depth: 0,
            ..Config::default()
        };
        assert!(c.validated().is_err());
    }
}
