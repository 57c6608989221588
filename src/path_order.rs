//! Path ordering for the commit path-driver (C5 step 10, §5 "the
//! path-driver imposes depth-first ordering over the union of affected
//! paths so that parents exist before children").
//!
//! Adapted from the teacher's `sorts.rs`, which implemented the same
//! path-aware comparisons for a generic sorted-hash utility; here it is
//! specialized to the one ordering the commit handlers actually need:
//! sorting a pair's flat target list directly before the path driver
//! walks it.

use std::cmp::Ordering;

/// Path-aware comparison: compares component by component, shorter paths
/// (i.e. shallower / closer to the root) sorting first on a shared prefix.
pub fn compare_as_paths(a: &str, b: &str) -> Ordering {
    let a_parts = a.split('/');
    let b_parts = b.split('/');
    for (x, y) in a_parts.zip(b_parts) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.matches('/').count().cmp(&b.matches('/').count())
}

/// Shallower paths first, then lexicographic; guarantees a parent
/// directory is visited before any of its children.
pub fn compare_parent_first(a: &str, b: &str) -> Ordering {
    let depth = a.matches('/').count().cmp(&b.matches('/').count());
    match depth {
        Ordering::Equal => compare_as_paths(a, b),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shallower_paths_sort_first() {
        let mut paths = vec![
            "a/b/c".to_string(),
            "a".to_string(),
            "a/b".to_string(),
        ];
        paths.sort_by(|a, b| compare_parent_first(a, b));
        assert_eq!(paths, vec!["a", "a/b", "a/b/c"]);
    }

    #[test]
    fn same_depth_breaks_tie_lexicographically() {
        let mut paths = vec!["b".to_string(), "a".to_string()];
        paths.sort_by(|a, b| compare_parent_first(a, b));
        assert_eq!(paths, vec!["a", "b"]);
    }
}
