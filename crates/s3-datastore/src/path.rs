pub const SEPARATOR: char = '/';

/// Joins the optional root path and a uid into a store key with exactly one separator
/// between them. Without a root the uid is the key.
pub fn resolve(root_path: Option<&str>, uid: &str) -> String {
    match root_path.map(|root| root.trim_end_matches(SEPARATOR)) {
        Some(root) if !root.is_empty() => {
            format!("{}{}{}", root, SEPARATOR, uid.trim_start_matches(SEPARATOR))
        }
        _ => uid.to_string(),
    }
}
