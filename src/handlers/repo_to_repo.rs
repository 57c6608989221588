//! Repo→Repo Handler (C5): the intricate one. A whole batch of copies
//! and/or moves executes as one commit transaction, driven through a
//! single commit editor in parent-before-child path order (spec §4.5).

use crate::ancestor;
use crate::collab::{Callbacks, CommitInfo, CommitItem, CommitItemKind, DirEditor, RaOpen};
use crate::error::{Error, ErrorKind, Result};
use crate::mergeinfo;
use crate::pair::{CopyPair, PathDriverInfo};
use crate::path;
use crate::path_order;
use crate::NodeKind;
use std::collections::HashMap;

enum PathAction {
    Add(PathDriverInfo),
    Delete,
}

/// Drive the per-path callback (spec §4.5 table) by descending from `root`
/// through whatever ancestor directories the target isn't itself part of,
/// applying the leaf action, then closing back up.
fn apply_target(root: &mut dyn DirEditor, target: &str, action: &PathAction) -> Result<()> {
    let segments: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(Error::new(ErrorKind::UnsupportedFeature, "Cannot act on the repository root"));
    }
    descend(root, &segments, String::new(), target, action)
}

fn descend(
    dir: &mut dyn DirEditor,
    remaining: &[&str],
    prefix: String,
    leaf_path: &str,
    action: &PathAction,
) -> Result<()> {
    if remaining.len() == 1 {
        return apply_leaf(dir, leaf_path, action);
    }
    let next_prefix = if prefix.is_empty() { remaining[0].to_string() } else { format!("{prefix}/{}", remaining[0]) };
    let mut child = dir.open_directory(&next_prefix, None)?;
    let result = descend(child.as_mut(), &remaining[1..], next_prefix, leaf_path, action);
    child.close()?;
    result
}

fn apply_leaf(dir: &mut dyn DirEditor, path: &str, action: &PathAction) -> Result<()> {
    match action {
        PathAction::Delete => dir.delete_entry(path, None),
        PathAction::Add(info) => {
            let copyfrom = Some((info.src_url.as_str(), info.src_revnum));
            match info.src_kind {
                NodeKind::Dir => {
                    let mut child = dir.add_directory(path, copyfrom)?;
                    if !info.mergeinfo.is_empty() {
                        child.change_prop("svn:mergeinfo", info.mergeinfo.as_bytes())?;
                    }
                    child.close()
                }
                _ => {
                    let mut child = dir.add_file(path, copyfrom)?;
                    if !info.mergeinfo.is_empty() {
                        child.change_prop("svn:mergeinfo", info.mergeinfo.as_bytes())?;
                    }
                    child.close(None)
                }
            }
        }
    }
}

/// Returns `None` when the log-message callback returned an empty message
/// (the §9 "user-cancel" convention, preserved as-is) rather than when no
/// commit was needed at all; every repo→repo call that reaches this
/// function produces a commit unless that convention fires.
#[tracing::instrument(skip_all, fields(pairs = pairs.len(), is_move))]
pub fn execute(
    pairs: &mut [CopyPair],
    is_move: bool,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
) -> Result<Option<CommitInfo>> {
    let (_, _, top_url) = ancestor::common_ancestors(pairs);
    tracing::debug!(%top_url, "opened repo-to-repo commit anchor");
    let mut anchor = top_url.clone();

    // Step 2: mark resurrections, raise the anchor if one lands on top_url
    // itself (a node can't be added at the repository root).
    for pair in pairs.iter_mut() {
        if pair.src == pair.dst {
            pair.resurrection = true;
        }
    }
    if pairs.iter().any(|p| p.resurrection && p.src == top_url) {
        anchor = path::dirname(&top_url);
    }

    // Step 3.
    let mut session = match opener.open(&anchor, None) {
        Ok(session) => session,
        Err(e) if e.kind() == ErrorKind::RaIllegalUrl && top_url.is_empty() => {
            return Err(Error::new(
                ErrorKind::UnsupportedFeature,
                "Source and dest appear not to be in the same repository",
            ));
        }
        Err(e) => return Err(e),
    };

    // Step 4: src lying below a non-root dst is also a resurrection-style
    // anchor raise (copying a node into one of its own ancestors).
    let mut needs_reparent = false;
    for pair in pairs.iter_mut() {
        if !path::is_root(&pair.dst) && path::is_strict_ancestor(&pair.dst, &pair.src) {
            pair.resurrection = true;
            anchor = path::dirname(&top_url);
            needs_reparent = true;
        }
    }
    if needs_reparent {
        session.reparent(&anchor)?;
    }

    // Step 5.
    let head = session.latest_revnum()?;

    // Step 6.
    for pair in pairs.iter_mut() {
        callbacks.cancel()?;
        let (resolved_url, resolved_revnum) =
            session.trace_history(&pair.src, pair.src_peg_revision, pair.src_op_revision)?;
        pair.src = resolved_url;
        pair.src_revnum = Some(resolved_revnum);

        let src_rel = path::relative_to(&anchor, &pair.src);
        let dst_rel = path::relative_to(&anchor, &pair.dst);
        if is_move && src_rel.is_empty() {
            return Err(Error::new(ErrorKind::UnsupportedFeature, "Cannot move URL into itself"));
        }

        pair.src_kind = session.check_path(&src_rel, resolved_revnum)?;
        if !pair.src_kind.exists() {
            return Err(Error::for_path(ErrorKind::FsNotFound, &pair.src));
        }
        if session.check_path(&dst_rel, head)?.exists() {
            return Err(Error::for_path(ErrorKind::FsAlreadyExists, &pair.dst));
        }

        pair.src_rel = Some(src_rel);
        pair.dst_rel = Some(dst_rel);
    }

    // Step 7.
    let mut items = Vec::new();
    for pair in pairs.iter() {
        if pair.resurrection && is_move {
            continue;
        }
        items.push(CommitItem { path: pair.dst.clone(), kind: CommitItemKind::Add });
        if !pair.resurrection && is_move {
            items.push(CommitItem { path: pair.src.clone(), kind: CommitItemKind::Delete });
        }
    }
    let message = callbacks.get_log_msg(&items);
    if let Some(msg) = &message {
        if msg.is_empty() {
            tracing::debug!("empty log message, aborting commit without error");
            return Ok(None);
        }
    }

    // Step 8: mergeinfo + target list.
    let mut targets: Vec<(String, PathAction)> = Vec::new();
    for pair in pairs.iter() {
        if pair.resurrection && is_move {
            continue;
        }
        let src_rel = pair.src_rel.clone().expect("resolved in step 6");
        let dst_rel = pair.dst_rel.clone().expect("resolved in step 6");
        let src_revnum = pair.src_revnum.expect("resolved in step 6");
        let oldest = session.oldest_revision(&src_rel, src_revnum)?;
        let explicit = session.get_mergeinfo(&src_rel, src_revnum)?;
        let merged = mergeinfo::assemble(&src_rel, oldest, src_revnum, &explicit, None);

        let info = PathDriverInfo {
            src_url: pair.src.clone(),
            src_path: src_rel.clone(),
            dst_path: dst_rel.clone(),
            src_kind: pair.src_kind,
            src_revnum,
            resurrection: pair.resurrection,
            mergeinfo: merged.to_text(),
            is_move,
        };
        targets.push((dst_rel, PathAction::Add(info)));
        if !pair.resurrection && is_move {
            targets.push((src_rel, PathAction::Delete));
        }
    }
    targets.sort_by(|a, b| path_order::compare_parent_first(&a.0, &b.0));

    // Step 9 + 10.
    let mut revprops = HashMap::new();
    if let Some(msg) = message {
        revprops.insert("svn:log".to_string(), msg);
    }
    let mut editor = session.get_commit_editor(revprops)?;
    let mut root = editor.open_root()?;

    let mut failure = None;
    for (path, action) in &targets {
        if let Err(e) = apply_target(root.as_mut(), path, action) {
            failure = Some(e);
            break;
        }
    }

    if let Some(e) = failure {
        drop(root);
        let _ = editor.abort_edit();
        return Err(e);
    }

    root.close()?;
    let commit_info = editor.close_edit()?;
    Ok(Some(commit_info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fake_repo::FakeRepo;
    use crate::testing::RecordingCallbacks;
    use crate::{CopyPair, CopySource, Revision, Revnum};

    fn pair(src: &str, dst: &str, rev: i64) -> CopyPair {
        CopyPair::new(
            &CopySource::new(src, Revision::Number(Revnum::from_raw(rev).unwrap()), Revision::Number(Revnum::from_raw(rev).unwrap())),
            dst.to_string(),
        )
    }

    #[test]
    fn copy_into_self_resurrects_without_delete() {
        let repo = FakeRepo::new("svn://r", "uuid-1");
        repo.put_dir("svn://r/trunk", 1);
        repo.put_dir("svn://r/trunk/X", 50);
        repo.set_head(100);
        repo.delete("svn://r/trunk/X");

        let mut opener = repo.opener();
        let mut pairs = vec![pair("svn://r/trunk/X", "svn://r/trunk/X", 50)];
        let mut callbacks = RecordingCallbacks::with_log_message("resurrect X");
        let info = execute(&mut pairs, false, &mut opener, &mut callbacks).unwrap();
        assert!(info.is_some());
        assert!(pairs[0].resurrection);
    }

    #[test]
    fn move_of_siblings_produces_two_adds_and_two_deletes() {
        let repo = FakeRepo::new("svn://r", "uuid-1");
        repo.put_file("svn://r/trunk/a", 1, b"a");
        repo.put_file("svn://r/trunk/b", 1, b"b");
        repo.put_dir("svn://r/dest", 1);
        repo.set_head(5);

        let mut opener = repo.opener();
        let mut pairs = vec![
            pair("svn://r/trunk/a", "svn://r/dest/a", 5),
            pair("svn://r/trunk/b", "svn://r/dest/b", 5),
        ];
        let mut callbacks = RecordingCallbacks::with_log_message("move siblings");
        let info = execute(&mut pairs, true, &mut opener, &mut callbacks).unwrap();
        assert!(info.is_some());
        assert!(repo.node_exists("svn://r/dest/a"));
        assert!(repo.node_exists("svn://r/dest/b"));
    }

    #[test]
    fn cross_repository_attempt_is_reported() {
        let repo = FakeRepo::new("svn://A", "uuid-a");
        repo.put_file("svn://A/x", 1, b"x");
        let mut opener = repo.opener();
        let mut pairs = vec![pair("svn://A/x", "svn://B/y", 1)];
        let mut callbacks = RecordingCallbacks::default();
        let err = execute(&mut pairs, false, &mut opener, &mut callbacks).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
        assert!(err.message().contains("not to be in the same repository"));
    }

    #[test]
    fn empty_log_message_aborts_without_error() {
        let repo = FakeRepo::new("svn://r", "uuid-1");
        repo.put_file("svn://r/trunk/a", 1, b"a");
        repo.set_head(5);
        let mut opener = repo.opener();
        let mut pairs = vec![pair("svn://r/trunk/a", "svn://r/trunk/b", 5)];
        let mut callbacks = RecordingCallbacks::with_log_message("");
        let result = execute(&mut pairs, false, &mut opener, &mut callbacks).unwrap();
        assert!(result.is_none());
        assert!(!repo.node_exists("svn://r/trunk/b"));
    }
}
