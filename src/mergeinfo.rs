//! Merge-info assembly (C3): per-path revision-range provenance that rides
//! along with every copy.
//!
//! The teacher's `mergeinfo.rs` only wraps the opaque `svn_mergeinfo_t`
//! handle and an inheritance enum; all of the actual range-list merging and
//! text (de)serialization lives in C and is invisible to the bindings. This
//! module implements that logic directly: a `Mergeinfo` is a path → range
//! list map, ranges merge by union, and the whole thing serializes to the
//! standard `path:start-end,start-end` text form.

use crate::Revnum;
use indexmap::IndexMap;
use std::fmt;

/// An inclusive revision range `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RevisionRange {
    pub start: i64,
    pub end: i64,
}

impl RevisionRange {
    pub fn new(start: Revnum, end: Revnum) -> Self {
        Self {
            start: start.as_i64(),
            end: end.as_i64(),
        }
    }

    fn overlaps_or_touches(&self, other: &RevisionRange) -> bool {
        self.start <= other.end + 1 && other.start <= self.end + 1
    }

    fn union(&self, other: &RevisionRange) -> RevisionRange {
        RevisionRange {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for RevisionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A mapping from repository-relative path to the list of revision ranges
/// merged into (or implied for) that path. Iteration order matches
/// insertion order, serialization sorts paths for a stable text form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mergeinfo(IndexMap<String, Vec<RevisionRange>>);

impl Mergeinfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|ranges| ranges.is_empty())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn ranges(&self, path: &str) -> &[RevisionRange] {
        self.0.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Add a single range under `path`, merging with any overlapping or
    /// adjacent range already recorded.
    pub fn add_range(&mut self, path: &str, range: RevisionRange) {
        let ranges = self.0.entry(path.to_string()).or_default();
        ranges.push(range);
        normalize(ranges);
    }

    /// Union `other` into `self` in place (the combine step C3 needs for
    /// implied ∪ explicit ∪ wc-explicit).
    pub fn merge(&mut self, other: &Mergeinfo) {
        for (path, ranges) in &other.0 {
            for range in ranges {
                self.add_range(path, *range);
            }
        }
    }

    /// Serialize to the standard `path1:r1,r2\npath2:r3` text form, paths
    /// in sorted order for determinism.
    pub fn to_text(&self) -> String {
        let mut paths: Vec<&String> = self.0.keys().collect();
        paths.sort();
        paths
            .into_iter()
            .filter(|p| !self.0[*p].is_empty())
            .map(|p| {
                let ranges: Vec<String> = self.0[p].iter().map(RevisionRange::to_string).collect();
                format!("{p}:{}", ranges.join(","))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Parse the standard mergeinfo text form. Unparseable lines are
    /// skipped rather than failing the whole parse; malformed mergeinfo on
    /// a node should not block a copy (the WC/RA layer is the authority on
    /// whether the text is well-formed).
    pub fn parse(text: &str) -> Mergeinfo {
        let mut info = Mergeinfo::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((path, ranges)) = line.split_once(':') else {
                continue;
            };
            for range_str in ranges.split(',') {
                if let Some(range) = parse_range(range_str.trim()) {
                    info.add_range(path, range);
                }
            }
        }
        info
    }
}

fn parse_range(s: &str) -> Option<RevisionRange> {
    let s = s.trim_end_matches('*'); // strip non-inheritable marker
    if let Some((start, end)) = s.split_once('-') {
        Some(RevisionRange {
            start: start.parse().ok()?,
            end: end.parse().ok()?,
        })
    } else {
        let rev: i64 = s.parse().ok()?;
        Some(RevisionRange { start: rev, end: rev })
    }
}

/// Sort and coalesce overlapping/adjacent ranges in place.
fn normalize(ranges: &mut Vec<RevisionRange>) {
    ranges.sort();
    let mut merged: Vec<RevisionRange> = Vec::with_capacity(ranges.len());
    for range in ranges.drain(..) {
        match merged.last_mut() {
            Some(last) if last.overlaps_or_touches(&range) => *last = last.union(&range),
            _ => merged.push(range),
        }
    }
    *ranges = merged;
}

/// Compute the implied mergeinfo for a copy source: a single range
/// `[oldest_rev_where_node_exists .. src_revnum]` keyed under the
/// repository-relative source path (spec §4.3).
pub fn implied(src_rel_path: &str, oldest_rev: Revnum, src_revnum: Revnum) -> Mergeinfo {
    let mut info = Mergeinfo::new();
    info.add_range(src_rel_path, RevisionRange::new(oldest_rev, src_revnum));
    info
}

/// Assemble the full mergeinfo for a single copy: implied history ∪
/// explicit mergeinfo already on the source node ∪ (optionally) the WC's
/// own parsed mergeinfo, per §4.3.
pub fn assemble(
    src_rel_path: &str,
    oldest_rev: Revnum,
    src_revnum: Revnum,
    explicit_on_source: &Mergeinfo,
    wc_mergeinfo: Option<&Mergeinfo>,
) -> Mergeinfo {
    let mut info = implied(src_rel_path, oldest_rev, src_revnum);
    info.merge(explicit_on_source);
    if let Some(wc) = wc_mergeinfo {
        info.merge(wc);
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rn(n: i64) -> Revnum {
        Revnum::from_raw(n).unwrap()
    }

    #[test]
    fn single_range_round_trips_through_text() {
        let mut info = Mergeinfo::new();
        info.add_range("/trunk", RevisionRange::new(rn(1), rn(5)));
        assert_eq!(info.to_text(), "/trunk:1-5");
        let parsed = Mergeinfo::parse(&info.to_text());
        assert_eq!(parsed, info);
    }

    #[test]
    fn single_revision_range_serializes_without_dash() {
        let mut info = Mergeinfo::new();
        info.add_range("/trunk", RevisionRange::new(rn(7), rn(7)));
        assert_eq!(info.to_text(), "/trunk:7");
    }

    #[test]
    fn overlapping_ranges_coalesce() {
        let mut info = Mergeinfo::new();
        info.add_range("/trunk", RevisionRange::new(rn(1), rn(5)));
        info.add_range("/trunk", RevisionRange::new(rn(4), rn(10)));
        assert_eq!(info.ranges("/trunk"), &[RevisionRange { start: 1, end: 10 }]);
    }

    #[test]
    fn adjacent_ranges_coalesce() {
        let mut info = Mergeinfo::new();
        info.add_range("/trunk", RevisionRange::new(rn(1), rn(5)));
        info.add_range("/trunk", RevisionRange::new(rn(6), rn(10)));
        assert_eq!(info.ranges("/trunk"), &[RevisionRange { start: 1, end: 10 }]);
    }

    #[test]
    fn disjoint_ranges_stay_separate_and_sort() {
        let mut info = Mergeinfo::new();
        info.add_range("/trunk", RevisionRange::new(rn(20), rn(25)));
        info.add_range("/trunk", RevisionRange::new(rn(1), rn(5)));
        assert_eq!(
            info.ranges("/trunk"),
            &[
                RevisionRange { start: 1, end: 5 },
                RevisionRange { start: 20, end: 25 },
            ]
        );
    }

    #[test]
    fn assemble_unions_implied_explicit_and_wc() {
        let mut explicit = Mergeinfo::new();
        explicit.add_range("/branches/b1", RevisionRange::new(rn(50), rn(60)));
        let mut wc = Mergeinfo::new();
        wc.add_range("/trunk", RevisionRange::new(rn(90), rn(95)));

        let assembled = assemble("/trunk", rn(1), rn(100), &explicit, Some(&wc));
        assert_eq!(assembled.ranges("/trunk"), &[
            RevisionRange { start: 1, end: 100 },
        ]);
        assert_eq!(assembled.ranges("/branches/b1"), &[RevisionRange { start: 50, end: 60 }]);
    }

    #[test]
    fn empty_mergeinfo_serializes_to_empty_text() {
        let info = Mergeinfo::new();
        assert!(info.is_empty());
        assert_eq!(info.to_text(), "");
    }

    #[test]
    fn parse_skips_malformed_lines() {
        let parsed = Mergeinfo::parse("not-a-valid-line\n/trunk:1-5");
        assert_eq!(parsed.ranges("/trunk"), &[RevisionRange { start: 1, end: 5 }]);
    }
}
