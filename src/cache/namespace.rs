//! Key namespacing shared by every backend.

/// Separator between an instance prefix and a logical key.
pub const SEPARATOR: char = ':';

/// Physical key for `key` inside the instance identified by `prefix`.
pub fn namespace(prefix: &str, key: &str) -> String {
    format!("{prefix}{SEPARATOR}{key}")
}

/// Common leading bytes of every key owned by `prefix`.
pub fn namespace_prefix(prefix: &str) -> String {
    namespace(prefix, "")
}
