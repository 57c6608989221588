//! The copy-pair data model (spec §3).

use crate::{NodeKind, Revision, Revnum};

/// User input: one `(path, revision, peg_revision)` source.
#[derive(Debug, Clone)]
pub struct CopySource {
    /// URL or local path, as given by the caller.
    pub path: String,
    /// The operational revision: the revision whose content is used.
    pub revision: Revision,
    /// The revision in which `path` is interpreted, disambiguating
    /// renamed history.
    pub peg_revision: Revision,
}

impl CopySource {
    pub fn new(path: impl Into<String>, revision: Revision, peg_revision: Revision) -> Self {
        Self {
            path: path.into(),
            revision,
            peg_revision,
        }
    }

    pub fn is_url(&self) -> bool {
        crate::path::is_url(&self.path)
    }
}

/// One internal working record produced by [`crate::normalize::normalize`]
/// and mutated in place by whichever handler (C4-C7) executes it.
#[derive(Debug, Clone)]
pub struct CopyPair {
    /// URL or local path; rewritten to a canonical URL when a WC source
    /// is promoted to a repo source (§4.1 step 7).
    pub src: String,
    /// The original user-supplied `src`, before any peg relocation. Only
    /// consumed by C7 for checkout reporting.
    pub src_original: String,
    /// Absolute form of a local `src`. `None` once `src` is a URL.
    pub src_abs: Option<String>,
    /// Filled in by a handler's existence check.
    pub src_kind: NodeKind,
    pub src_peg_revision: Revision,
    pub src_op_revision: Revision,
    /// Resolved once the handler has consulted the RA session / WC entry.
    pub src_revnum: Option<Revnum>,
    /// `src` made relative to the RA session's anchor URL, URI-decoded.
    pub src_rel: Option<String>,

    pub dst: String,
    pub dst_parent: String,
    pub base_name: String,
    pub dst_rel: Option<String>,

    /// Set when `src == dst` in a repo→repo copy: a legitimate
    /// reinstatement of a deleted node, producing an add but no delete
    /// (spec §3 invariant 4, §4.5 step 2).
    pub resurrection: bool,
}

impl CopyPair {
    /// Build a pair from a normalized source and a destination that has
    /// already had `basename(source.path)` appended if this is a
    /// multi-source call (§4.1 step 2).
    pub fn new(source: &CopySource, dst: String) -> Self {
        let (dst_parent, base_name) = crate::path::split(&dst);
        Self {
            src: source.path.clone(),
            src_original: source.path.clone(),
            src_abs: None,
            src_kind: NodeKind::None,
            src_peg_revision: source.peg_revision,
            src_op_revision: source.revision,
            src_revnum: None,
            src_rel: None,
            dst,
            dst_parent,
            base_name,
            dst_rel: None,
            resurrection: false,
        }
    }

    pub fn is_move_into_self(&self) -> bool {
        self.src == self.dst
    }
}

/// Per-pair scratch record used only by C5 (repo→repo) to drive the
/// path-driver callback and the mergeinfo property attached to each add.
#[derive(Debug, Clone)]
pub struct PathDriverInfo {
    pub src_url: String,
    pub src_path: String,
    pub dst_path: String,
    pub src_kind: NodeKind,
    pub src_revnum: Revnum,
    pub resurrection: bool,
    /// Serialized mergeinfo text to set as a property on the added node;
    /// empty means "no property change" (spec §8 invariant 3).
    pub mergeinfo: String,
    pub is_move: bool,
}
