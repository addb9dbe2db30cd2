//! Public path resolution for stored files.

/// Map a stored file key to the relative URL under which it is published.
///
/// Only the file-name part of the key is kept, so keys that carry a directory
/// component still resolve inside `prefix`.
pub fn public_path(prefix: &str, key: &str) -> String {
    let file_name = key.rsplit(['/', '\\']).next().unwrap_or(key);
    let prefix = prefix.trim_end_matches('/');

    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}
