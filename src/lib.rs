//! Copy/move core for a version-control client.
//!
//! This crate implements the locality dispatch matrix, common-ancestor
//! computation, merge-info propagation and editor-driven commit logic
//! behind a copy/move subsystem. The working-copy administrative layer,
//! the remote-access session, and the commit editor itself are external
//! collaborators consumed through the traits in [`collab`].

pub mod ancestor;
pub mod collab;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod mergeinfo;
pub mod normalize;
pub mod options;
pub mod pair;
pub mod path;
pub mod path_order;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timestamps;

pub use collab::{CommitInfo, Editor, RaSession, WcLayer};
pub use dispatch::{copy, copy_single, move_, move_single};
pub use error::{Error, ErrorKind};
pub use options::{CopyOptions, MoveOptions};
pub use pair::{CopyPair, CopySource, PathDriverInfo};

use std::str::FromStr;

/// A resolved or symbolic revision selector, as attached to a [`CopySource`].
///
/// Mirrors the svn `svn_opt_revision_kind` set: most of these are meaningful
/// only for working-copy paths (`Base`, `Committed`, `Previous`, `Working`);
/// `Head` and `Number` apply to repository URLs as well.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Revision {
    #[default]
    Unspecified,
    Number(Revnum),
    Date(i64),
    Committed,
    Previous,
    Base,
    Working,
    Head,
}

impl Revision {
    /// Revision kinds that only make sense against a working copy, never
    /// a valid peg revision for a URL source (spec §4.1 step 1).
    pub fn is_wc_only(&self) -> bool {
        matches!(self, Revision::Base | Revision::Committed | Revision::Previous)
    }
}

impl FromStr for Revision {
    type Err = String;

    fn from_str(rev: &str) -> Result<Self, Self::Err> {
        match rev {
            "unspecified" => Ok(Revision::Unspecified),
            "committed" => Ok(Revision::Committed),
            "previous" => Ok(Revision::Previous),
            "base" => Ok(Revision::Base),
            "working" => Ok(Revision::Working),
            "head" => Ok(Revision::Head),
            other => {
                if let Some(rest) = other.strip_prefix("number:") {
                    rest.parse::<i64>()
                        .map(|n| Revision::Number(Revnum(n)))
                        .map_err(|e| e.to_string())
                } else if let Some(rest) = other.strip_prefix("date:") {
                    rest.parse::<i64>().map(Revision::Date).map_err(|e| e.to_string())
                } else {
                    Err(format!("Invalid revision: {other}"))
                }
            }
        }
    }
}

impl From<Revnum> for Revision {
    fn from(revnum: Revnum) -> Self {
        Revision::Number(revnum)
    }
}

/// A repository revision number. Negative values are never valid; use
/// [`Revnum::from_raw`] at any FFI/parse boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revnum(i64);

impl Revnum {
    pub fn from_raw(raw: i64) -> Option<Self> {
        if raw < 0 {
            None
        } else {
            Some(Self(raw))
        }
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn as_u64(&self) -> u64 {
        self.0 as u64
    }
}

impl From<u32> for Revnum {
    fn from(v: u32) -> Self {
        Self(v as i64)
    }
}

impl From<u64> for Revnum {
    fn from(v: u64) -> Self {
        Self(v as i64)
    }
}

impl std::fmt::Display for Revnum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of node a source path resolves to, once an existence check has
/// been performed. Spec §3 calls this `src_kind`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Dir,
    #[default]
    None,
}

impl NodeKind {
    pub fn exists(&self) -> bool {
        !matches!(self, NodeKind::None)
    }
}

/// How much of a directory tree an operation should traverse. Carried
/// through to [`WcLayer::checkout`] and [`WcLayer::adm_open`]; the copy/move
/// core itself never inspects this beyond forwarding it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Depth {
    #[default]
    Unknown,
    Exclude,
    Empty,
    Files,
    Immediates,
    Infinity,
}
