//! Narrow collaborator interfaces (§6 of spec.md).
//!
//! These traits are the boundary: the working-copy administrative layer,
//! the remote-access session, the commit editor, and the user-supplied
//! callbacks are all *external* to this crate's logic. The teacher binds
//! each of these to a concrete `libsvn` FFI call (`ra.rs`'s `Session`,
//! `wc.rs`'s `Context`, `delta.rs`'s `Editor`/`DirectoryEditor`/
//! `FileEditor` traits); here the same shapes are kept but as trait
//! objects so the dispatch/handler logic in this crate can be driven by
//! an in-memory fake ([`crate::testing`]) in tests and by a real backend
//! in production, without this crate knowing which.

use crate::error::Result;
use crate::mergeinfo::Mergeinfo;
use crate::{Depth, NodeKind, Revision, Revnum};
use std::collections::HashMap;

/// Result of a successful repository commit (spec §3; shape taken from the
/// conventional SVN commit-info tuple since spec.md only says "C5 and C6
/// produce a `CommitInfo`" without defining its fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub revision: Revnum,
    pub date: Option<String>,
    pub author: Option<String>,
    pub post_commit_err: Option<String>,
}

/// An exclusive, directory-scoped working-copy lock ("access baton").
/// Identity is the path it was opened on, sufficient for the handlers'
/// "is this the same lock?" checks in spec §4.4.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmAccess {
    pub path: String,
}

impl AdmAccess {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// A working-copy entry, as read by [`WcLayer::entry`].
#[derive(Debug, Clone, Default)]
pub struct WcEntry {
    pub url: Option<String>,
    pub revision: Option<Revnum>,
    pub kind: NodeKind,
    pub schedule_delete: bool,
    pub copied: bool,
}

/// The working-copy administrative layer (§6.2): lock/open/close, entry
/// storage, file addition/deletion, checkout.
pub trait WcLayer {
    fn adm_open(&mut self, parent: &str, depth: Depth) -> Result<AdmAccess>;
    fn adm_probe_open(&mut self, path: &str) -> Result<AdmAccess>;
    fn adm_retrieve(&mut self, parent: &AdmAccess, path: &str) -> Result<AdmAccess>;
    fn adm_close(&mut self, adm: AdmAccess) -> Result<()>;

    fn entry(&mut self, path: &str) -> Result<Option<WcEntry>>;
    fn node_kind(&mut self, path: &str) -> Result<NodeKind>;
    fn is_directory(&mut self, path: &str) -> Result<bool>;

    fn copy(&mut self, src: &str, adm: &AdmAccess, base_name: &str) -> Result<()>;
    fn delete(&mut self, path: &str, adm: &AdmAccess, force: bool) -> Result<()>;

    /// Mark `dst` as scheduled-add-with-history from `(src_url, src_rev)`.
    fn add_with_history(
        &mut self,
        dst: &str,
        adm: &AdmAccess,
        src_url: &str,
        src_rev: Revnum,
    ) -> Result<()>;

    /// Add a file whose text-base is already staged at `text_path`
    /// (written by the caller via a temp file), optionally with
    /// copyfrom history.
    fn add_repos_file(
        &mut self,
        dst: &str,
        adm: &AdmAccess,
        text_path: &str,
        props: &HashMap<String, Vec<u8>>,
        copyfrom: Option<(&str, Revnum)>,
    ) -> Result<()>;

    fn checkout(
        &mut self,
        src_url: &str,
        dst: &str,
        peg: Revision,
        op: Revision,
        depth: Depth,
    ) -> Result<Revnum>;

    fn parse_mergeinfo(&mut self, path: &str) -> Result<Mergeinfo>;
    fn record_mergeinfo(&mut self, path: &str, info: &Mergeinfo, adm: &AdmAccess) -> Result<()>;

    /// Stage `content` into a uniquely-named temp file under the
    /// administrative area for `parent`, returning a path suitable for
    /// [`WcLayer::add_repos_file`]'s `text_path` (spec §4.7 step 7: "open a
    /// uniquely named temp file in `dst`'s directory, stream the file
    /// contents via RA into it").
    fn stage_temp_file(&mut self, parent: &str, content: &[u8]) -> Result<String>;

    /// Condense the versioned subtree rooted at `path` into the flat item
    /// set a WC→repo commit uploads (spec §4.6 step 6: "crawl the WC
    /// subtree to produce commit_items", the "low-level commit item
    /// condensation" spec.md lists as an external collaborator). The root
    /// itself is included with an empty `rel_path`.
    fn crawl_commit_subtree(&mut self, path: &str) -> Result<Vec<WcSubtreeItem>>;

    /// Read a versioned file's working contents, for streaming into a
    /// commit (§4.6 step 6/7).
    fn read_file(&mut self, path: &str) -> Result<Vec<u8>>;
}

/// One file or directory discovered while crawling a WC subtree for commit
/// (spec §4.6 step 6), path relative to the crawl root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WcSubtreeItem {
    pub rel_path: String,
    pub kind: NodeKind,
}

/// A live remote-access session anchored at some URL (§6.2).
pub trait RaSession {
    fn session_url(&self) -> &str;
    fn reparent(&mut self, url: &str) -> Result<()>;
    fn latest_revnum(&mut self) -> Result<Revnum>;
    fn check_path(&mut self, rel_path: &str, rev: Revnum) -> Result<NodeKind>;
    fn get_uuid(&mut self) -> Result<String>;
    fn get_repos_root(&mut self) -> Result<String>;

    /// Fetch a file's contents and properties at `rev`, writing the
    /// content into `sink`. Returns the revision the content was
    /// actually read at (meaningful when `rev` was symbolic).
    fn get_file(
        &mut self,
        rel_path: &str,
        rev: Revnum,
        sink: &mut dyn std::io::Write,
    ) -> Result<(Revnum, HashMap<String, Vec<u8>>)>;

    /// Resolve `(path, peg_rev, op_rev)` to the canonical URL of the node
    /// at `op_rev`, and the concrete revnum that resolves to (the
    /// history-tracing primitive used by C5 step 6 and C7 step 1).
    fn trace_history(
        &mut self,
        path: &str,
        peg_rev: Revision,
        op_rev: Revision,
    ) -> Result<(String, Revnum)>;

    /// The oldest revision at which `rel_path` exists, the lower bound of
    /// the implied mergeinfo range (§4.3).
    fn oldest_revision(&mut self, rel_path: &str, rev: Revnum) -> Result<Revnum>;

    /// Explicit mergeinfo already recorded on `rel_path` at `rev`.
    fn get_mergeinfo(&mut self, rel_path: &str, rev: Revnum) -> Result<Mergeinfo>;

    /// Acquire a commit editor. `revprops` carries at least `svn:log`,
    /// resolved from the log-message callback.
    fn get_commit_editor(&mut self, revprops: HashMap<String, String>) -> Result<Box<dyn Editor>>;
}

/// Opens (or reopens) an [`RaSession`] at a URL; kept separate from
/// `RaSession` itself since "open" has no receiver yet (spec §6.2:
/// `open(url, wc_anchor?)`).
pub trait RaOpen {
    fn open(&mut self, url: &str, wc_anchor: Option<&str>) -> Result<Box<dyn RaSession>>;
}

/// The root of a commit editor / delta editor (§6.2, §9 "baton-passed
/// callbacks"). Closing a directory or file baton consumes it, modeling
/// the one-shot nature of the underlying C batons as ownership.
pub trait Editor {
    fn open_root(&mut self) -> Result<Box<dyn DirEditor + '_>>;
    fn close_edit(self: Box<Self>) -> Result<CommitInfo>;
    fn abort_edit(self: Box<Self>) -> Result<()>;
}

pub trait DirEditor {
    fn delete_entry(&mut self, path: &str, revision: Option<Revnum>) -> Result<()>;

    /// Descend into an already-existing child directory, for path-driver
    /// traversal through ancestors that aren't themselves part of the
    /// commit's add set.
    fn open_directory<'a>(&'a mut self, path: &str, revision: Option<Revnum>) -> Result<Box<dyn DirEditor + 'a>>;

    fn add_directory<'a>(
        &'a mut self,
        path: &str,
        copyfrom: Option<(&str, Revnum)>,
    ) -> Result<Box<dyn DirEditor + 'a>>;

    fn add_file<'a>(
        &'a mut self,
        path: &str,
        copyfrom: Option<(&str, Revnum)>,
    ) -> Result<Box<dyn FileEditor + 'a>>;

    fn change_prop(&mut self, name: &str, value: &[u8]) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;
}

pub trait FileEditor {
    fn change_prop(&mut self, name: &str, value: &[u8]) -> Result<()>;

    /// Write the file's full text. Real `svn_delta_editor_t` streams text
    /// deltas through `apply_textdelta`; this narrower contract takes the
    /// whole buffer at once since nothing in this crate needs incremental
    /// application.
    fn append_text(&mut self, content: &[u8]) -> Result<()>;

    fn close(self: Box<Self>, text_checksum: Option<&str>) -> Result<()>;
}

/// One commit item gathered for the log-message callback (§4.5 step 7,
/// §4.6 step 6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitItem {
    pub path: String,
    pub kind: CommitItemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitItemKind {
    Add,
    Delete,
}

/// An observable event surfaced through [`Callbacks::notify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyEvent {
    pub action: NotifyAction,
    pub path: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyAction {
    Add,
    Delete,
    Update,
    CommitFinalizing,
}

/// The cooperative callback bundle consumed from the caller (§5, §6.2):
/// cancellation polled at pair boundaries, notification of completed
/// steps, and the log-message prompt for repository commits.
pub trait Callbacks {
    /// A positive return aborts the operation promptly (§5).
    fn cancel(&mut self) -> Result<()> {
        Ok(())
    }

    fn notify(&mut self, _event: &NotifyEvent) {}

    /// Returns `None` to mean "no log message callback installed". A
    /// callback that *is* installed but returns `Some("")` triggers the
    /// empty-message-aborts-silently convention (§4.5 step 7, §9 open
    /// question: preserved as-is).
    fn get_log_msg(&mut self, _items: &[CommitItem]) -> Option<String> {
        None
    }
}

/// A [`Callbacks`] that never cancels, never logs a message, and ignores
/// notifications; the default for callers that don't need any of the
/// three hooks.
#[derive(Debug, Default)]
pub struct NoopCallbacks;

impl Callbacks for NoopCallbacks {}
