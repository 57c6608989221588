//! In-memory fakes for every §6.2 collaborator (C13).
//!
//! Feature-gated behind `testing` (and always available to this crate's
//! own `#[cfg(test)]` modules) so the dispatch matrix and each handler can
//! be exercised without a real working copy or repository, mirroring the
//! `testing`/`test-fakes` feature convention used by the pack's VCS crates
//! (`jj-vcs-jj`'s `lib` crate, for one).

use crate::collab::{
    AdmAccess, Callbacks, CommitInfo, CommitItem, DirEditor, Editor, FileEditor, NotifyEvent,
    RaOpen, RaSession, WcEntry, WcLayer, WcSubtreeItem,
};
use crate::error::{Error, ErrorKind};
use crate::mergeinfo::Mergeinfo;
use crate::path;
use crate::{Depth, NodeKind, Revision, Revnum};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub mod fake_wc {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct NodeRecord {
        kind: NodeKind,
        mergeinfo: Mergeinfo,
        content: Vec<u8>,
    }

    /// An in-memory working copy: versioned nodes plus the set of
    /// currently-open admin locks, so tests can assert lock hygiene
    /// (spec §8 invariants 6 and 7).
    #[derive(Debug, Default)]
    pub struct FakeWc {
        entries: HashMap<String, WcEntry>,
        nodes: HashMap<String, NodeRecord>,
        locks: Vec<String>,
        staged: HashMap<String, Vec<u8>>,
        next_temp_id: usize,
    }

    impl FakeWc {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn put_file(&mut self, path: &str) -> &mut Self {
            self.nodes.insert(
                path.to_string(),
                NodeRecord {
                    kind: NodeKind::File,
                    mergeinfo: Mergeinfo::new(),
                    content: Vec::new(),
                },
            );
            self
        }

        pub fn put_dir(&mut self, path: &str) -> &mut Self {
            self.nodes.insert(
                path.to_string(),
                NodeRecord {
                    kind: NodeKind::Dir,
                    mergeinfo: Mergeinfo::new(),
                    content: Vec::new(),
                },
            );
            self
        }

        pub fn set_content(&mut self, path: &str, content: &[u8]) -> &mut Self {
            self.nodes
                .entry(path.to_string())
                .or_insert_with(|| NodeRecord { kind: NodeKind::File, ..Default::default() })
                .content = content.to_vec();
            self
        }

        pub fn set_entry_url(&mut self, path: &str, url: &str, rev: i64) -> &mut Self {
            self.entries.insert(
                path.to_string(),
                WcEntry {
                    url: Some(url.to_string()),
                    revision: Revnum::from_raw(rev),
                    kind: NodeKind::File,
                    schedule_delete: false,
                    copied: false,
                },
            );
            self
        }

        pub fn set_mergeinfo(&mut self, path: &str, info: Mergeinfo) -> &mut Self {
            self.nodes
                .entry(path.to_string())
                .or_insert(NodeRecord { kind: NodeKind::File, mergeinfo: Mergeinfo::new(), content: Vec::new() })
                .mergeinfo = info;
            self
        }

        /// Locks currently held; must be empty after a clean call
        /// completes or aborts (spec §8 invariants 6, 7).
        pub fn open_locks(&self) -> &[String] {
            &self.locks
        }

        pub fn node_exists(&self, path: &str) -> bool {
            self.nodes.contains_key(path)
        }

        pub fn staged_content(&self, text_path: &str) -> Option<&[u8]> {
            self.staged.get(text_path).map(Vec::as_slice)
        }
    }

    impl WcLayer for FakeWc {
        fn adm_open(&mut self, parent: &str, _depth: Depth) -> Result<AdmAccess, Error> {
            self.locks.push(parent.to_string());
            Ok(AdmAccess::new(parent))
        }

        fn adm_probe_open(&mut self, path: &str) -> Result<AdmAccess, Error> {
            self.locks.push(path.to_string());
            Ok(AdmAccess::new(path))
        }

        fn adm_retrieve(&mut self, _parent: &AdmAccess, path: &str) -> Result<AdmAccess, Error> {
            Ok(AdmAccess::new(path))
        }

        fn adm_close(&mut self, adm: AdmAccess) -> Result<(), Error> {
            match self.locks.iter().position(|p| *p == adm.path) {
                Some(idx) => {
                    self.locks.remove(idx);
                    Ok(())
                }
                None => Err(Error::for_path(ErrorKind::WcNotDirectory, &adm.path)),
            }
        }

        fn entry(&mut self, path: &str) -> Result<Option<WcEntry>, Error> {
            Ok(self.entries.get(path).cloned())
        }

        fn node_kind(&mut self, path: &str) -> Result<NodeKind, Error> {
            Ok(self.nodes.get(path).map(|n| n.kind).unwrap_or(NodeKind::None))
        }

        fn is_directory(&mut self, path: &str) -> Result<bool, Error> {
            Ok(matches!(self.node_kind(path)?, NodeKind::Dir))
        }

        fn copy(&mut self, src: &str, adm: &AdmAccess, base_name: &str) -> Result<(), Error> {
            let record = self
                .nodes
                .get(src)
                .cloned()
                .ok_or_else(|| Error::for_path(ErrorKind::NodeUnknownKind, src))?;
            let dst = path::join(&adm.path, base_name);
            self.nodes.insert(dst.clone(), record.clone());
            self.entries.insert(
                dst,
                WcEntry {
                    url: None,
                    revision: None,
                    kind: record.kind,
                    schedule_delete: false,
                    copied: true,
                },
            );
            Ok(())
        }

        fn delete(&mut self, path: &str, _adm: &AdmAccess, _force: bool) -> Result<(), Error> {
            self.nodes.remove(path);
            self.entries.remove(path);
            Ok(())
        }

        fn add_with_history(
            &mut self,
            dst: &str,
            _adm: &AdmAccess,
            src_url: &str,
            src_rev: Revnum,
        ) -> Result<(), Error> {
            self.nodes.insert(
                dst.to_string(),
                NodeRecord { kind: NodeKind::Dir, mergeinfo: Mergeinfo::new(), content: Vec::new() },
            );
            self.entries.insert(
                dst.to_string(),
                WcEntry {
                    url: Some(src_url.to_string()),
                    revision: Some(src_rev),
                    kind: NodeKind::Dir,
                    schedule_delete: false,
                    copied: true,
                },
            );
            Ok(())
        }

        fn add_repos_file(
            &mut self,
            dst: &str,
            _adm: &AdmAccess,
            text_path: &str,
            _props: &HashMap<String, Vec<u8>>,
            copyfrom: Option<(&str, Revnum)>,
        ) -> Result<(), Error> {
            let content = self.staged.get(text_path).cloned().unwrap_or_default();
            self.nodes.insert(
                dst.to_string(),
                NodeRecord { kind: NodeKind::File, mergeinfo: Mergeinfo::new(), content },
            );
            self.entries.insert(
                dst.to_string(),
                WcEntry {
                    url: copyfrom.map(|(u, _)| u.to_string()),
                    revision: copyfrom.map(|(_, r)| r),
                    kind: NodeKind::File,
                    schedule_delete: false,
                    copied: copyfrom.is_some(),
                },
            );
            Ok(())
        }

        fn checkout(
            &mut self,
            src_url: &str,
            dst: &str,
            _peg: Revision,
            _op: Revision,
            _depth: Depth,
        ) -> Result<Revnum, Error> {
            let rev = Revnum::from_raw(1).unwrap();
            self.nodes.insert(
                dst.to_string(),
                NodeRecord { kind: NodeKind::Dir, mergeinfo: Mergeinfo::new(), content: Vec::new() },
            );
            self.entries.insert(
                dst.to_string(),
                WcEntry {
                    url: Some(src_url.to_string()),
                    revision: Some(rev),
                    kind: NodeKind::Dir,
                    schedule_delete: false,
                    copied: false,
                },
            );
            Ok(rev)
        }

        fn parse_mergeinfo(&mut self, path: &str) -> Result<Mergeinfo, Error> {
            Ok(self.nodes.get(path).map(|n| n.mergeinfo.clone()).unwrap_or_default())
        }

        fn record_mergeinfo(&mut self, path: &str, info: &Mergeinfo, _adm: &AdmAccess) -> Result<(), Error> {
            self.nodes
                .entry(path.to_string())
                .or_insert(NodeRecord { kind: NodeKind::File, mergeinfo: Mergeinfo::new(), content: Vec::new() })
                .mergeinfo = info.clone();
            Ok(())
        }

        fn stage_temp_file(&mut self, parent: &str, content: &[u8]) -> Result<String, Error> {
            self.next_temp_id += 1;
            let text_path = path::join(parent, &format!(".svn-tmp-{}", self.next_temp_id));
            self.staged.insert(text_path.clone(), content.to_vec());
            Ok(text_path)
        }

        fn crawl_commit_subtree(&mut self, path_arg: &str) -> Result<Vec<WcSubtreeItem>, Error> {
            let mut items: Vec<WcSubtreeItem> = self
                .nodes
                .iter()
                .filter(|(p, _)| path::is_ancestor_or_self(path_arg, p))
                .map(|(p, n)| WcSubtreeItem {
                    rel_path: if *p == path_arg { String::new() } else { path::relative_to(path_arg, p) },
                    kind: n.kind,
                })
                .collect();
            items.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
            Ok(items)
        }

        fn read_file(&mut self, path_arg: &str) -> Result<Vec<u8>, Error> {
            self.nodes
                .get(path_arg)
                .map(|n| n.content.clone())
                .ok_or_else(|| Error::for_path(ErrorKind::NodeUnknownKind, path_arg))
        }
    }
}

pub mod fake_repo {
    use super::*;

    #[derive(Debug, Clone)]
    struct RepoNode {
        kind: NodeKind,
        created_rev: i64,
        /// Set by [`FakeRepo::delete`]; the node stays in the map so
        /// history queries at revisions before the deletion still resolve,
        /// but [`RaSession::check_path`] reports it absent from this
        /// revision onward.
        deleted_rev: Option<i64>,
        mergeinfo: Mergeinfo,
        content: Vec<u8>,
        props: HashMap<String, Vec<u8>>,
    }

    #[derive(Debug)]
    struct RepoState {
        root: String,
        uuid: String,
        head: i64,
        nodes: HashMap<String, RepoNode>,
    }

    /// A fake repository shared by every [`FakeRaSession`] opened against
    /// it. Commits mutate this state when an editor is closed.
    #[derive(Debug, Clone)]
    pub struct FakeRepo(Rc<RefCell<RepoState>>);

    impl FakeRepo {
        pub fn new(root: &str, uuid: &str) -> Self {
            Self(Rc::new(RefCell::new(RepoState {
                root: root.to_string(),
                uuid: uuid.to_string(),
                head: 0,
                nodes: HashMap::new(),
            })))
        }

        pub fn put_file(&self, url: &str, created_rev: i64, content: &[u8]) -> &Self {
            let mut state = self.0.borrow_mut();
            state.nodes.insert(
                url.to_string(),
                RepoNode {
                    kind: NodeKind::File,
                    created_rev,
                    deleted_rev: None,
                    mergeinfo: Mergeinfo::new(),
                    content: content.to_vec(),
                    props: HashMap::new(),
                },
            );
            state.head = state.head.max(created_rev);
            self
        }

        pub fn put_dir(&self, url: &str, created_rev: i64) -> &Self {
            let mut state = self.0.borrow_mut();
            state.nodes.insert(
                url.to_string(),
                RepoNode {
                    kind: NodeKind::Dir,
                    created_rev,
                    deleted_rev: None,
                    mergeinfo: Mergeinfo::new(),
                    content: Vec::new(),
                    props: HashMap::new(),
                },
            );
            state.head = state.head.max(created_rev);
            self
        }

        pub fn set_head(&self, head: i64) -> &Self {
            self.0.borrow_mut().head = head;
            self
        }

        pub fn set_mergeinfo(&self, url: &str, info: Mergeinfo) -> &Self {
            if let Some(node) = self.0.borrow_mut().nodes.get_mut(url) {
                node.mergeinfo = info;
            }
            self
        }

        /// Mark `url` deleted as of the repository's current head, without
        /// erasing it; history queries (`oldest_revision`, `check_path` at
        /// an earlier revision) still see the node.
        pub fn delete(&self, url: &str) {
            let mut state = self.0.borrow_mut();
            let head = state.head;
            if let Some(node) = state.nodes.get_mut(url) {
                node.deleted_rev = Some(head);
            }
        }

        pub fn head(&self) -> Revnum {
            Revnum::from_raw(self.0.borrow().head).unwrap()
        }

        pub fn node_exists(&self, url: &str) -> bool {
            let state = self.0.borrow();
            match state.nodes.get(url) {
                Some(node) => node.deleted_rev.map_or(true, |d| state.head < d),
                None => false,
            }
        }

        pub fn opener(&self) -> FakeRaOpener {
            FakeRaOpener { repo: self.0.clone() }
        }
    }

    #[derive(Debug)]
    enum FakeOp {
        AddDir { path: String, copyfrom: Option<(String, i64)> },
        AddFile { path: String, copyfrom: Option<(String, i64)>, content: Vec<u8> },
        Delete { path: String },
        PropChange { path: String, name: String, value: Vec<u8> },
    }

    pub struct FakeRaOpener {
        repo: Rc<RefCell<RepoState>>,
    }

    impl RaOpen for FakeRaOpener {
        fn open(&mut self, url: &str, _wc_anchor: Option<&str>) -> Result<Box<dyn RaSession>, Error> {
            // An empty anchor only ever arises from a cross-repository
            // ancestor computation (two URLs with no shared scheme/host
            // have no common ancestor at all, not even the empty string
            // would be wrong to open at); treat it the same as any other
            // URL that shares nothing with this repository's root.
            if url.is_empty() || path::longest_common_ancestor(&self.repo.borrow().root, url).is_empty() {
                return Err(Error::new(ErrorKind::RaIllegalUrl, format!("'{url}' is not the same repository")));
            }
            Ok(Box::new(FakeRaSession {
                repo: self.repo.clone(),
                anchor: url.to_string(),
            }))
        }
    }

    pub struct FakeRaSession {
        repo: Rc<RefCell<RepoState>>,
        anchor: String,
    }

    impl RaSession for FakeRaSession {
        fn session_url(&self) -> &str {
            &self.anchor
        }

        fn reparent(&mut self, url: &str) -> Result<(), Error> {
            self.anchor = url.to_string();
            Ok(())
        }

        fn latest_revnum(&mut self) -> Result<Revnum, Error> {
            Ok(Revnum::from_raw(self.repo.borrow().head).unwrap())
        }

        fn check_path(&mut self, rel_path: &str, rev: Revnum) -> Result<NodeKind, Error> {
            let full = path::join(&self.anchor, rel_path);
            let state = self.repo.borrow();
            Ok(match state.nodes.get(&full) {
                Some(node) if rev.as_i64() < node.created_rev => NodeKind::None,
                Some(node) if node.deleted_rev.is_some_and(|d| rev.as_i64() >= d) => NodeKind::None,
                Some(node) => node.kind,
                None => NodeKind::None,
            })
        }

        fn get_uuid(&mut self) -> Result<String, Error> {
            Ok(self.repo.borrow().uuid.clone())
        }

        fn get_repos_root(&mut self) -> Result<String, Error> {
            Ok(self.repo.borrow().root.clone())
        }

        fn get_file(
            &mut self,
            rel_path: &str,
            _rev: Revnum,
            sink: &mut dyn std::io::Write,
        ) -> Result<(Revnum, HashMap<String, Vec<u8>>), Error> {
            let full = path::join(&self.anchor, rel_path);
            let state = self.repo.borrow();
            let node = state
                .nodes
                .get(&full)
                .ok_or_else(|| Error::for_path(ErrorKind::FsNotFound, &full))?;
            sink.write_all(&node.content).map_err(|e| Error::new(ErrorKind::FsNotFound, e.to_string()))?;
            Ok((Revnum::from_raw(node.created_rev).unwrap(), node.props.clone()))
        }

        fn trace_history(
            &mut self,
            path_in: &str,
            _peg_rev: Revision,
            op_rev: Revision,
        ) -> Result<(String, Revnum), Error> {
            let revnum = match op_rev {
                Revision::Number(n) => n,
                _ => Revnum::from_raw(self.repo.borrow().head).unwrap(),
            };
            Ok((path_in.to_string(), revnum))
        }

        fn oldest_revision(&mut self, rel_path: &str, _rev: Revnum) -> Result<Revnum, Error> {
            let full = path::join(&self.anchor, rel_path);
            let state = self.repo.borrow();
            let node = state
                .nodes
                .get(&full)
                .ok_or_else(|| Error::for_path(ErrorKind::FsNotFound, &full))?;
            Ok(Revnum::from_raw(node.created_rev).unwrap())
        }

        fn get_mergeinfo(&mut self, rel_path: &str, _rev: Revnum) -> Result<Mergeinfo, Error> {
            let full = path::join(&self.anchor, rel_path);
            Ok(self.repo.borrow().nodes.get(&full).map(|n| n.mergeinfo.clone()).unwrap_or_default())
        }

        fn get_commit_editor(&mut self, _revprops: HashMap<String, String>) -> Result<Box<dyn Editor>, Error> {
            Ok(Box::new(FakeEditor {
                repo: self.repo.clone(),
                anchor: self.anchor.clone(),
                ops: Rc::new(RefCell::new(Vec::new())),
            }))
        }
    }

    struct FakeEditor {
        repo: Rc<RefCell<RepoState>>,
        anchor: String,
        ops: Rc<RefCell<Vec<FakeOp>>>,
    }

    impl Editor for FakeEditor {
        fn open_root(&mut self) -> Result<Box<dyn DirEditor + '_>, Error> {
            Ok(Box::new(FakeDirEditor {
                ops: self.ops.clone(),
                path: self.anchor.clone(),
            }))
        }

        fn close_edit(self: Box<Self>) -> Result<CommitInfo, Error> {
            let mut state = self.repo.borrow_mut();
            state.head += 1;
            let new_rev = state.head;
            let anchor = self.anchor.clone();
            for op in self.ops.borrow_mut().drain(..) {
                match op {
                    FakeOp::AddDir { path, .. } => {
                        let full = path::join(&anchor, &path);
                        state.nodes.insert(
                            full,
                            RepoNode {
                                kind: NodeKind::Dir,
                                created_rev: new_rev,
                                deleted_rev: None,
                                mergeinfo: Mergeinfo::new(),
                                content: Vec::new(),
                                props: HashMap::new(),
                            },
                        );
                    }
                    FakeOp::AddFile { path, content, .. } => {
                        let full = path::join(&anchor, &path);
                        state.nodes.insert(
                            full,
                            RepoNode {
                                kind: NodeKind::File,
                                created_rev: new_rev,
                                deleted_rev: None,
                                mergeinfo: Mergeinfo::new(),
                                content,
                                props: HashMap::new(),
                            },
                        );
                    }
                    FakeOp::Delete { path } => {
                        let full = path::join(&anchor, &path);
                        if let Some(node) = state.nodes.get_mut(&full) {
                            node.deleted_rev = Some(new_rev);
                        }
                    }
                    FakeOp::PropChange { path, name, value } => {
                        let full = path::join(&anchor, &path);
                        if let Some(node) = state.nodes.get_mut(&full) {
                            if name == "svn:mergeinfo" {
                                node.mergeinfo = Mergeinfo::parse(&String::from_utf8_lossy(&value));
                            } else {
                                node.props.insert(name, value);
                            }
                        }
                    }
                }
            }
            Ok(CommitInfo {
                revision: Revnum::from_raw(new_rev).unwrap(),
                date: None,
                author: None,
                post_commit_err: None,
            })
        }

        fn abort_edit(self: Box<Self>) -> Result<(), Error> {
            self.ops.borrow_mut().clear();
            Ok(())
        }
    }

    struct FakeDirEditor {
        ops: Rc<RefCell<Vec<FakeOp>>>,
        path: String,
    }

    impl DirEditor for FakeDirEditor {
        fn delete_entry(&mut self, path_arg: &str, _revision: Option<Revnum>) -> Result<(), Error> {
            self.ops.borrow_mut().push(FakeOp::Delete { path: path_arg.to_string() });
            Ok(())
        }

        fn open_directory<'a>(
            &'a mut self,
            path_arg: &str,
            _revision: Option<Revnum>,
        ) -> Result<Box<dyn DirEditor + 'a>, Error> {
            Ok(Box::new(FakeDirEditor { ops: self.ops.clone(), path: path_arg.to_string() }))
        }

        fn add_directory<'a>(
            &'a mut self,
            path_arg: &str,
            copyfrom: Option<(&str, Revnum)>,
        ) -> Result<Box<dyn DirEditor + 'a>, Error> {
            self.ops.borrow_mut().push(FakeOp::AddDir {
                path: path_arg.to_string(),
                copyfrom: copyfrom.map(|(u, r)| (u.to_string(), r.as_i64())),
            });
            Ok(Box::new(FakeDirEditor { ops: self.ops.clone(), path: path_arg.to_string() }))
        }

        fn add_file<'a>(
            &'a mut self,
            path_arg: &str,
            copyfrom: Option<(&str, Revnum)>,
        ) -> Result<Box<dyn FileEditor + 'a>, Error> {
            self.ops.borrow_mut().push(FakeOp::AddFile {
                path: path_arg.to_string(),
                copyfrom: copyfrom.map(|(u, r)| (u.to_string(), r.as_i64())),
                content: Vec::new(),
            });
            Ok(Box::new(FakeFileEditor { ops: self.ops.clone(), path: path_arg.to_string() }))
        }

        fn change_prop(&mut self, name: &str, value: &[u8]) -> Result<(), Error> {
            self.ops.borrow_mut().push(FakeOp::PropChange {
                path: self.path.clone(),
                name: name.to_string(),
                value: value.to_vec(),
            });
            Ok(())
        }

        fn close(self: Box<Self>) -> Result<(), Error> {
            Ok(())
        }
    }

    struct FakeFileEditor {
        ops: Rc<RefCell<Vec<FakeOp>>>,
        path: String,
    }

    impl FileEditor for FakeFileEditor {
        fn change_prop(&mut self, name: &str, value: &[u8]) -> Result<(), Error> {
            self.ops.borrow_mut().push(FakeOp::PropChange {
                path: self.path.clone(),
                name: name.to_string(),
                value: value.to_vec(),
            });
            Ok(())
        }

        fn append_text(&mut self, content: &[u8]) -> Result<(), Error> {
            let mut ops = self.ops.borrow_mut();
            let op = ops
                .iter_mut()
                .rev()
                .find_map(|op| match op {
                    FakeOp::AddFile { path, content, .. } if *path == self.path => Some(content),
                    _ => None,
                })
                .expect("append_text called without a matching add_file op");
            op.extend_from_slice(content);
            Ok(())
        }

        fn close(self: Box<Self>, _text_checksum: Option<&str>) -> Result<(), Error> {
            Ok(())
        }
    }
}

/// Records every [`NotifyEvent`] and the log message request it was
/// handed, so tests can assert on both.
#[derive(Debug, Default)]
pub struct RecordingCallbacks {
    pub events: RefCell<Vec<NotifyEvent>>,
    pub log_message: Option<String>,
    pub cancel_after: Option<usize>,
    calls: RefCell<usize>,
}

impl RecordingCallbacks {
    pub fn with_log_message(message: impl Into<String>) -> Self {
        Self {
            log_message: Some(message.into()),
            ..Default::default()
        }
    }
}

impl Callbacks for RecordingCallbacks {
    fn cancel(&mut self) -> Result<(), Error> {
        *self.calls.borrow_mut() += 1;
        if let Some(limit) = self.cancel_after {
            if *self.calls.borrow() > limit {
                return Err(Error::new(ErrorKind::UnsupportedFeature, "cancelled"));
            }
        }
        Ok(())
    }

    fn notify(&mut self, event: &NotifyEvent) {
        self.events.borrow_mut().push(event.clone());
    }

    fn get_log_msg(&mut self, _items: &[CommitItem]) -> Option<String> {
        self.log_message.clone()
    }
}
