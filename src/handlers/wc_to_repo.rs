//! WC→Repo Handler (C6): a batch of working-copy paths committed in one
//! repository transaction, carrying each path's accumulated mergeinfo
//! along (spec §4.6).

use crate::collab::{AdmAccess, Callbacks, CommitInfo, CommitItem, CommitItemKind, DirEditor, RaOpen, RaSession, WcEntry, WcLayer};
use crate::error::{Error, ErrorKind, Result};
use crate::mergeinfo::{self, Mergeinfo};
use crate::pair::CopyPair;
use crate::path;
use crate::path_order;
use crate::NodeKind;
use std::collections::HashMap;

enum WcAction {
    AddDir { mergeinfo: String },
    AddFile { content: Vec<u8>, mergeinfo: String },
}

/// Drives the commit per §4.6 steps 1-10, composing commit/unlock errors
/// per §7 regardless of which phase fails.
#[tracing::instrument(skip_all, fields(pairs = pairs.len()))]
pub fn execute(
    pairs: &mut [CopyPair],
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
) -> Result<Option<CommitInfo>> {
    // Step 1: the commit layer only ever deals in absolute WC paths.
    for pair in pairs.iter_mut() {
        pair.src_abs = Some(pair.src.clone());
    }

    // Step 2: a single source's "common ancestor" is its own parent
    // directory, since a WC lock is always directory-scoped (mirrors the
    // same single-pair treatment in the repo→WC handler).
    let src_ancestor = if pairs.len() == 1 {
        path::dirname(&pairs[0].src)
    } else {
        path::longest_common_ancestor_many(pairs.iter().map(|p| p.src.as_str()))
    };
    let adm = wc.adm_probe_open(&src_ancestor)?;

    let outcome = run_commit(pairs, wc, opener, callbacks, &src_ancestor);

    // Step 10: unlock is always attempted, regardless of how the commit
    // went; this crate models no separate tempfile-cleanup primitive, so
    // `cleanup_err` is always `None`.
    let (result, commit_err) = match outcome {
        Ok(v) => (v, None),
        Err(e) => (None, Some(e)),
    };
    let unlock_err = wc.adm_close(adm).err();
    if unlock_err.is_some() {
        tracing::warn!("failed to release working copy lock after commit attempt");
    }
    match Error::compose(commit_err, unlock_err, None) {
        Some(composed) => Err(composed),
        None => Ok(result),
    }
}

fn run_commit(
    pairs: &mut [CopyPair],
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    src_ancestor: &str,
) -> Result<Option<CommitInfo>> {
    // Step 3: common destination URL ancestor, WC anchored for lock/tempfile
    // purposes.
    let dst_ancestor = if pairs.len() == 1 {
        path::dirname(&pairs[0].dst)
    } else {
        path::longest_common_ancestor_many(pairs.iter().map(|p| p.dst.as_str()))
    };
    let mut session = opener.open(&dst_ancestor, Some(src_ancestor))?;
    let repos_root = session.get_repos_root()?;
    let head = session.latest_revnum()?;

    // A second session anchored at the repository root, used only to query
    // each WC entry's *source*-side history for mergeinfo assembly; the
    // commit session above is anchored at the destination and can't
    // resolve source-relative paths.
    let mut src_session = opener.open(&repos_root, None)?;

    // Step 4.
    for pair in pairs.iter_mut() {
        callbacks.cancel()?;
        let dst_rel = path::relative_to(&dst_ancestor, &pair.dst);
        if session.check_path(&dst_rel, head)?.exists() {
            return Err(Error::for_path(ErrorKind::FsAlreadyExists, &pair.dst));
        }
        pair.src_kind = wc.node_kind(&pair.src)?;
        if !pair.src_kind.exists() {
            return Err(Error::for_path(ErrorKind::NodeUnknownKind, &pair.src));
        }
        pair.dst_rel = Some(dst_rel);
    }

    // Step 5.
    let items: Vec<CommitItem> = pairs
        .iter()
        .map(|p| CommitItem { path: p.dst.clone(), kind: CommitItemKind::Add })
        .collect();
    let message = callbacks.get_log_msg(&items);
    if let Some(msg) = &message {
        if msg.is_empty() {
            return Ok(None);
        }
    }

    // Steps 6-7: crawl each source subtree, assemble mergeinfo per item,
    // build the flat target list the path driver walks.
    let mut targets: Vec<(String, WcAction)> = Vec::new();
    for pair in pairs.iter() {
        let dst_rel = pair.dst_rel.clone().expect("resolved in step 4");
        let entry = wc.entry(&pair.src)?;
        let root_mergeinfo = assemble_mergeinfo(wc, src_session.as_mut(), &repos_root, &pair.src, entry.as_ref())?;

        match pair.src_kind {
            NodeKind::Dir => {
                targets.push((dst_rel.clone(), WcAction::AddDir { mergeinfo: root_mergeinfo.to_text() }));
                for item in wc.crawl_commit_subtree(&pair.src)? {
                    if item.rel_path.is_empty() {
                        continue;
                    }
                    let child_dst_rel = path::join(&dst_rel, &item.rel_path);
                    let action = match item.kind {
                        NodeKind::Dir => WcAction::AddDir { mergeinfo: String::new() },
                        _ => {
                            let content = wc.read_file(&path::join(&pair.src, &item.rel_path))?;
                            WcAction::AddFile { content, mergeinfo: String::new() }
                        }
                    };
                    targets.push((child_dst_rel, action));
                }
            }
            _ => {
                let content = wc.read_file(&pair.src)?;
                targets.push((dst_rel, WcAction::AddFile { content, mergeinfo: root_mergeinfo.to_text() }));
            }
        }
    }
    targets.sort_by(|a, b| path_order::compare_parent_first(&a.0, &b.0));

    // Step 8-9: condense at the already-open anchor, drive the commit.
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

fn assemble_mergeinfo(
    wc: &mut dyn WcLayer,
    session: &mut dyn RaSession,
    repos_root: &str,
    src: &str,
    entry: Option<&WcEntry>,
) -> Result<Mergeinfo> {
    let wc_info = wc.parse_mergeinfo(src)?;
    let Some(entry) = entry else { return Ok(wc_info) };
    let (Some(url), Some(revnum)) = (entry.url.clone(), entry.revision) else {
        return Ok(wc_info);
    };
    let rel = path::relative_to(repos_root, &url);
    let oldest = session.oldest_revision(&rel, revnum)?;
    let explicit = session.get_mergeinfo(&rel, revnum)?;
    Ok(mergeinfo::assemble(&rel, oldest, revnum, &explicit, Some(&wc_info)))
}

fn apply_target(root: &mut dyn DirEditor, target: &str, action: &WcAction) -> Result<()> {
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
    action: &WcAction,
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

fn apply_leaf(dir: &mut dyn DirEditor, path: &str, action: &WcAction) -> Result<()> {
    match action {
        WcAction::AddDir { mergeinfo } => {
            let mut child = dir.add_directory(path, None)?;
            if !mergeinfo.is_empty() {
                child.change_prop("svn:mergeinfo", mergeinfo.as_bytes())?;
            }
            child.close()
        }
        WcAction::AddFile { content, mergeinfo } => {
            let mut child = dir.add_file(path, None)?;
            child.append_text(content)?;
            if !mergeinfo.is_empty() {
                child.change_prop("svn:mergeinfo", mergeinfo.as_bytes())?;
            }
            child.close(None)
        }
    }
}
