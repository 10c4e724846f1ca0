//! Cache key derivation (§6.2).

use sha2::{Digest, Sha256};

/// The short dependency hash: `sha256("v1:" + sorted("name:version,"-joined
/// list)).hex[0..5]`. Deliberately short -- §6.2 trades identifiability for
/// file-name length, relying on the per-library name/version already in the
/// key plus the leading version byte to catch gross mismatches; a collision
/// rebuilds rather than corrupts (checked at load time by the caller
/// comparing the deserialized entry's own recorded identity, if present).
pub fn short_dep_hash(transitive_deps: &[(String, String)]) -> String {
    let mut pairs: Vec<String> = transitive_deps
        .iter()
        .map(|(name, version)| format!("{name}:{version}"))
        .collect();
    pairs.sort();
    let joined = pairs.join(",");

    let mut hasher = Sha256::new();
    hasher.update(b"v1:");
    hasher.update(joined.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..5].to_string()
}

/// The full cache key for one library (§4.6 step 2, §6.1's file name):
/// `{name}-{version}-{dep_hash}`.
pub fn cache_key(name: &str, version: &str, transitive_deps: &[(String, String)]) -> String {
    format!("{name}-{version}-{}", short_dep_hash(transitive_deps))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dep_hash_is_five_hex_chars() {
        let hash = short_dep_hash(&[("rails".to_string(), "7.1.0".to_string())]);
        assert_eq!(hash.len(), 5);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn dep_order_does_not_affect_the_hash() {
        let a = short_dep_hash(&[
            ("a".to_string(), "1.0".to_string()),
            ("b".to_string(), "2.0".to_string()),
        ]);
        let b = short_dep_hash(&[
            ("b".to_string(), "2.0".to_string()),
            ("a".to_string(), "1.0".to_string()),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn cache_key_embeds_name_and_version() {
        let key = cache_key("rails", "7.1.0", &[]);
        assert!(key.starts_with("rails-7.1.0-"));
    }
}
