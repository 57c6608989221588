//! Repo→WC Handler (C7): checkout a directory or fetch-and-stage a file,
//! marking the result as added-with-history whenever source and
//! destination repositories agree (spec §4.7).

use crate::collab::{AdmAccess, Callbacks, NotifyAction, NotifyEvent, RaOpen, RaSession, WcLayer};
use crate::error::{Error, ErrorKind, Result};
use crate::mergeinfo;
use crate::pair::CopyPair;
use crate::path;
use crate::timestamps::{sleep_for_timestamps, Clock};
use crate::{Depth, NodeKind, Revision};
use std::time::Duration;

/// Compares the RA session's UUID with the UUID of the repository backing
/// `dst_parent` in the WC. Either side being unobtainable is treated as
/// "different repositories"; no history is attempted rather than guessed.
fn same_repositories(
    wc: &mut dyn WcLayer,
    dst_parent: &str,
    session: &mut dyn RaSession,
    opener: &mut dyn RaOpen,
) -> bool {
    let Ok(Some(entry)) = wc.entry(dst_parent) else {
        return false;
    };
    let Some(url) = entry.url else {
        return false;
    };
    let Ok(mut dst_session) = opener.open(&url, None) else {
        return false;
    };
    match (session.get_uuid(), dst_session.get_uuid()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[tracing::instrument(skip_all, fields(pairs = pairs.len()))]
pub fn execute(
    pairs: &mut [CopyPair],
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    granularity: Duration,
) -> Result<()> {
    for pair in pairs.iter_mut() {
        pair.src_original = pair.src.clone();
    }

    // Step 2: common source ancestor; a single pair takes its parent since
    // the node itself can't also be the anchor it's resolved relative to.
    let src_ancestor = if pairs.len() == 1 {
        path::dirname(&pairs[0].src)
    } else {
        path::longest_common_ancestor_many(pairs.iter().map(|p| p.src.as_str()))
    };
    let mut session = opener.open(&src_ancestor, None)?;

    // Step 3.
    for pair in pairs.iter_mut() {
        callbacks.cancel()?;
        let (resolved_url, resolved_revnum) =
            session.trace_history(&pair.src, pair.src_peg_revision, pair.src_op_revision)?;
        pair.src = resolved_url;
        pair.src_revnum = Some(resolved_revnum);

        let src_rel = path::relative_to(&src_ancestor, &pair.src);
        pair.src_kind = session.check_path(&src_rel, resolved_revnum)?;
        if !pair.src_kind.exists() {
            return Err(Error::for_path(ErrorKind::FsNotFound, &pair.src));
        }
        if wc.node_kind(&pair.dst)?.exists() {
            return Err(Error::for_path(ErrorKind::EntryExists, &pair.dst));
        }
        if !wc.is_directory(&pair.dst_parent)? {
            return Err(Error::for_path(ErrorKind::WcNotDirectory, &pair.dst_parent));
        }
        pair.src_rel = Some(src_rel);
    }

    // Step 4: one lock covering every destination.
    let dst_common = path::longest_common_ancestor_many(pairs.iter().map(|p| p.dst_parent.as_str()));
    let adm = wc.adm_probe_open(&dst_common)?;

    let outcome = run_pairs(pairs, wc, &mut *session, opener, callbacks, clock, granularity, &adm);

    outcome.and(wc.adm_close(adm))
}

fn run_pairs(
    pairs: &mut [CopyPair],
    wc: &mut dyn WcLayer,
    session: &mut dyn RaSession,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    granularity: Duration,
    adm: &AdmAccess,
) -> Result<()> {
    for pair in pairs.iter() {
        callbacks.cancel()?;

        // Step 5: logical obstruction (a WC entry already points at
        // `dst` but the working file backing it is gone and it isn't
        // scheduled for deletion).
        if let Some(entry) = wc.entry(&pair.dst)? {
            if !wc.node_kind(&pair.dst)?.exists() && !entry.schedule_delete {
                return Err(Error::for_path(ErrorKind::WcObstructedUpdate, &pair.dst));
            }
        }

        let same_repo = same_repositories(wc, &pair.dst_parent, session, opener);
        let src_rel = pair.src_rel.as_deref().expect("resolved in step 3");
        let src_revnum = pair.src_revnum.expect("resolved in step 3");

        match pair.src_kind {
            NodeKind::Dir => {
                let landed = wc.checkout(&pair.src, &pair.dst, pair.src_peg_revision, pair.src_op_revision, Depth::Infinity)?;
                if !same_repo {
                    tracing::warn!(src = %pair.src, dst = %pair.dst, "checked out from a foreign repository; leaving disjoint");
                    return Err(Error::new(
                        ErrorKind::UnsupportedFeature,
                        format!(
                            "'{}' is from a foreign repository; leaving '{}' as a disjoint working copy",
                            pair.src, pair.dst
                        ),
                    ));
                }
                let copyfrom_rev = if matches!(pair.src_op_revision, Revision::Head) { landed } else { src_revnum };
                wc.add_with_history(&pair.dst, adm, &pair.src, copyfrom_rev)?;

                let oldest = session.oldest_revision(src_rel, src_revnum)?;
                let explicit = session.get_mergeinfo(src_rel, src_revnum)?;
                let merged = mergeinfo::assemble(src_rel, oldest, src_revnum, &explicit, None);
                wc.record_mergeinfo(&pair.dst, &merged, adm)?;
            }
            _ => {
                let mut content = Vec::new();
                let (_, props) = session.get_file(src_rel, src_revnum, &mut content)?;
                let text_path = wc.stage_temp_file(&pair.dst_parent, &content)?;
                let copyfrom = if same_repo { Some((pair.src.as_str(), src_revnum)) } else { None };
                wc.add_repos_file(&pair.dst, adm, &text_path, &props, copyfrom)?;

                let oldest = session.oldest_revision(src_rel, src_revnum)?;
                let explicit = session.get_mergeinfo(src_rel, src_revnum)?;
                let merged = mergeinfo::assemble(src_rel, oldest, src_revnum, &explicit, None);
                wc.record_mergeinfo(&pair.dst, &merged, adm)?;

                callbacks.notify(&NotifyEvent {
                    action: NotifyAction::Add,
                    path: pair.dst.clone(),
                    kind: NodeKind::File,
                });
                sleep_for_timestamps(clock, granularity);
            }
        }
    }
    Ok(())
}
