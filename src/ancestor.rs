//! Ancestor Computer (C2): longest common path ancestor across all sources
//! and all destinations, and the cross-ancestor at which a repo→repo RA
//! session must be opened.

use crate::path;
use crate::pair::CopyPair;

/// `(src_ancestor, dst_ancestor, cross_ancestor)` for a batch of pairs.
///
/// Per spec §4.2: for paths treated as URLs, ancestry is computed by
/// path-segment longest-common-prefix, never a raw string prefix. When
/// `pairs.len() == 1`, `dst_ancestor` is the single `dst` itself; callers
/// that want its *parent* (the repo→WC and WC→repo handlers) take
/// `dirname` explicitly, matching the source's own inconsistency here
/// (spec §9 open question, preserved rather than silently unified).
pub fn common_ancestors(pairs: &[CopyPair]) -> (String, String, String) {
    let src_ancestor = path::longest_common_ancestor_many(pairs.iter().map(|p| p.src.as_str()));
    let dst_ancestor = if pairs.len() == 1 {
        pairs[0].dst.clone()
    } else {
        path::longest_common_ancestor_many(pairs.iter().map(|p| p.dst.as_str()))
    };
    let cross_ancestor = path::longest_common_ancestor(&src_ancestor, &dst_ancestor);
    (src_ancestor, dst_ancestor, cross_ancestor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CopySource, Revision};

    fn pair(src: &str, dst: &str) -> CopyPair {
        CopyPair::new(
            &CopySource::new(src, Revision::Head, Revision::Head),
            dst.to_string(),
        )
    }

    #[test]
    fn single_pair_dst_ancestor_is_dst_itself() {
        let pairs = vec![pair("svn://r/trunk/a", "svn://r/trunk/b")];
        let (_, dst_ancestor, _) = common_ancestors(&pairs);
        assert_eq!(dst_ancestor, "svn://r/trunk/b");
    }

    #[test]
    fn multi_pair_uses_common_prefix() {
        let pairs = vec![
            pair("svn://r/trunk/a", "svn://r/branches/x/a"),
            pair("svn://r/trunk/b", "svn://r/branches/x/b"),
        ];
        let (src_ancestor, dst_ancestor, cross) = common_ancestors(&pairs);
        assert_eq!(src_ancestor, "svn://r/trunk");
        assert_eq!(dst_ancestor, "svn://r/branches/x");
        assert_eq!(cross, "svn://r");
    }

    #[test]
    fn cross_repository_pairs_have_empty_cross_ancestor() {
        let pairs = vec![pair("svn://A/x", "svn://B/y")];
        let (_, _, cross) = common_ancestors(&pairs);
        assert_eq!(cross, "");
    }

    #[test]
    fn ancestor_splits_at_segment_boundary_not_bytes() {
        let pairs = vec![
            pair("svn://r/trunk/foo", "svn://r/dst/foo"),
            pair("svn://r/trunk/foobar", "svn://r/dst/foobar"),
        ];
        let (src_ancestor, _, _) = common_ancestors(&pairs);
        assert_eq!(src_ancestor, "svn://r/trunk");
    }
}
