//! Value-name comparison.
//!
//! Value names within one node are unique under case-insensitive comparison.
//! Every lookup, overwrite and delete scan goes through [`names_equal`] so the
//! policy is the same at every call site.

/// Compare two value names case-insensitively.
///
/// Uses per-character Unicode lowercase mapping, so `"Count"`, `"COUNT"` and
/// `"count"` are the same name, as are `"Ärger"` and `"ärger"`.
///
/// ```
/// use hivekit_engine::names_equal;
///
/// assert!(names_equal("Count", "cOUNT"));
/// assert!(!names_equal("Count", "Counter"));
/// ```
pub fn names_equal(a: &str, b: &str) -> bool {
    if a.len() == b.len() && a.eq_ignore_ascii_case(b) {
        return true;
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
