//! Dispatch & Retry (C8): chooses one of the four locality handlers and
//! implements the top-level entry points' "retry as child" fallback
//! (spec §4.8, §6.1).

use crate::collab::{Callbacks, CommitInfo, RaOpen, WcLayer};
use crate::error::{Error, ErrorKind, Result};
use crate::handlers::{repo_to_repo, repo_to_wc, wc_to_repo, wc_to_wc};
use crate::normalize;
use crate::options::{CopyOptions, MoveOptions};
use crate::path;
use crate::timestamps::Clock;
use crate::CopySource;
use std::time::Duration;

/// Multi-pair copy; returns commit info iff any repo-side commit occurred
/// (spec §6.1).
#[tracing::instrument(skip_all, fields(sources = sources.len(), dst))]
pub fn copy(
    sources: &[CopySource],
    dst: &str,
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    options: &CopyOptions,
) -> Result<Option<CommitInfo>> {
    if options.copy_as_child && sources.len() > 1 {
        return Err(Error::new(
            ErrorKind::ClientMultipleSourcesDisallowed,
            "Cannot retry as child with more than one source",
        ));
    }

    match run_copy(sources, dst, wc, opener, callbacks, clock, options.timestamp_granularity) {
        Err(e) if retry_as_child_applies(&e, sources.len(), options.copy_as_child) => {
            let child_dst = path::join(dst, &path::basename(&sources[0].path));
            tracing::debug!(%child_dst, "retrying copy as child after destination collision");
            run_copy(sources, &child_dst, wc, opener, callbacks, clock, options.timestamp_granularity)
        }
        other => other,
    }
}

/// Multi-pair move; `force` bypasses the local-modification check in the
/// WC delete (spec §6.1).
#[tracing::instrument(skip_all, fields(sources = sources.len(), dst))]
pub fn move_(
    sources: &[CopySource],
    dst: &str,
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    options: &MoveOptions,
) -> Result<Option<CommitInfo>> {
    if options.move_as_child && sources.len() > 1 {
        return Err(Error::new(
            ErrorKind::ClientMultipleSourcesDisallowed,
            "Cannot retry as child with more than one source",
        ));
    }

    match run_move(sources, dst, wc, opener, callbacks, clock, options) {
        Err(e) if retry_as_child_applies(&e, sources.len(), options.move_as_child) => {
            let child_dst = path::join(dst, &path::basename(&sources[0].path));
            tracing::debug!(%child_dst, "retrying move as child after destination collision");
            run_move(sources, &child_dst, wc, opener, callbacks, clock, options)
        }
        other => other,
    }
}

/// The older single-source `copy` adapter (§6.1): builds a one-element
/// sources list and retries unconditionally against `dst / basename(src)`
/// on `entry_exists`/`fs_already_exists`, independent of `copy_as_child`
/// (that flag only governs the multi-pair [`copy`]'s own retry).
pub fn copy_single(
    source: &CopySource,
    dst: &str,
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    granularity: Duration,
) -> Result<Option<CommitInfo>> {
    let sources = [source.clone()];
    match run_copy(&sources, dst, wc, opener, callbacks, clock, granularity) {
        Err(e) if matches!(e.kind(), ErrorKind::EntryExists | ErrorKind::FsAlreadyExists) => {
            let child_dst = path::join(dst, &path::basename(&source.path));
            run_copy(&sources, &child_dst, wc, opener, callbacks, clock, granularity)
        }
        other => other,
    }
}

/// The older single-source `move` adapter (§6.1), mirroring [`copy_single`].
pub fn move_single(
    source: &CopySource,
    dst: &str,
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    force: bool,
    granularity: Duration,
) -> Result<Option<CommitInfo>> {
    let sources = [source.clone()];
    let options = MoveOptions { move_as_child: false, force, timestamp_granularity: granularity };
    match run_move(&sources, dst, wc, opener, callbacks, clock, &options) {
        Err(e) if matches!(e.kind(), ErrorKind::EntryExists | ErrorKind::FsAlreadyExists) => {
            let child_dst = path::join(dst, &path::basename(&source.path));
            run_move(&sources, &child_dst, wc, opener, callbacks, clock, &options)
        }
        other => other,
    }
}

fn retry_as_child_applies(err: &Error, n_sources: usize, as_child: bool) -> bool {
    as_child && n_sources == 1 && matches!(err.kind(), ErrorKind::EntryExists | ErrorKind::FsAlreadyExists)
}

/// Normalizes `sources`/`dst` into pairs (C1) and dispatches on the
/// locality matrix (§4.8) without any retry behavior; retry is the
/// caller's concern, since what gets retried differs between the
/// multi-pair entry points and their single-source adapters.
fn run_copy(
    sources: &[CopySource],
    dst: &str,
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    granularity: Duration,
) -> Result<Option<CommitInfo>> {
    let normalized = normalize::normalize(sources, dst, false, Some(wc))?;
    let mut pairs = normalized.pairs;
    let dst_is_url = pairs.first().is_some_and(|p| path::is_url(&p.dst));

    tracing::debug!(srcs_are_urls = normalized.srcs_are_urls, dst_is_url, pairs = pairs.len(), "dispatching copy");
    match (normalized.srcs_are_urls, dst_is_url) {
        (false, false) => {
            wc_to_wc::copy(&mut pairs, wc, callbacks, clock, granularity)?;
            Ok(None)
        }
        (false, true) => wc_to_repo::execute(&mut pairs, wc, opener, callbacks),
        (true, false) => {
            repo_to_wc::execute(&mut pairs, wc, opener, callbacks, clock, granularity)?;
            Ok(None)
        }
        (true, true) => repo_to_repo::execute(&mut pairs, false, opener, callbacks),
    }
}

fn run_move(
    sources: &[CopySource],
    dst: &str,
    wc: &mut dyn WcLayer,
    opener: &mut dyn RaOpen,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    options: &MoveOptions,
) -> Result<Option<CommitInfo>> {
    let normalized = normalize::normalize(sources, dst, true, Some(wc))?;
    let mut pairs = normalized.pairs;

    tracing::debug!(srcs_are_urls = normalized.srcs_are_urls, pairs = pairs.len(), "dispatching move");
    // Normalize's step 6 already rejects moves whose source and
    // destination classes differ, so only WC→WC and Repo→Repo survive
    // here (§4.1 step 6).
    if normalized.srcs_are_urls {
        repo_to_repo::execute(&mut pairs, true, opener, callbacks)
    } else {
        wc_to_wc::move_pairs(&mut pairs, wc, callbacks, clock, options.timestamp_granularity, options.force)?;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::NoopCallbacks;
    use crate::testing::fake_repo::FakeRepo;
    use crate::testing::fake_wc::FakeWc;
    use crate::testing::RecordingCallbacks;
    use crate::timestamps::NoopClock;
    use crate::Revision;

    fn src(path: &str) -> CopySource {
        CopySource::new(path, Revision::Unspecified, Revision::Unspecified)
    }

    #[test]
    fn wc_to_wc_copy_dispatches_to_c4() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc").put_file("/wc/a.txt");
        let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
        let mut callbacks = NoopCallbacks;
        let clock = NoopClock::default();
        let options = CopyOptions::default();

        let result = copy(&[src("/wc/a.txt")], "/wc/b.txt", &mut wc, &mut opener, &mut callbacks, &clock, &options).unwrap();
        assert!(result.is_none());
        assert!(wc.node_exists("/wc/b.txt"));
    }

    #[test]
    fn repo_to_repo_copy_dispatches_to_c5_and_returns_commit_info() {
        let repo = FakeRepo::new("svn://r", "uuid-1");
        repo.put_file("svn://r/trunk/a", 1, b"a");
        repo.set_head(5);
        let mut opener = repo.opener();
        let mut wc = FakeWc::new();
        let mut callbacks = RecordingCallbacks::with_log_message("copy a");
        let clock = NoopClock::default();
        let options = CopyOptions::default();

        let result = copy(
            &[src("svn://r/trunk/a")],
            "svn://r/trunk/b",
            &mut wc,
            &mut opener,
            &mut callbacks,
            &clock,
            &options,
        )
        .unwrap();
        assert!(result.is_some());
        assert!(repo.node_exists("svn://r/trunk/b"));
    }

    #[test]
    fn copy_as_child_retries_once_against_destination_as_parent() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc").put_dir("/wc/dst").put_file("/wc/a.txt");
        let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
        let mut callbacks = NoopCallbacks;
        let clock = NoopClock::default();
        let options = CopyOptions { copy_as_child: true, ..Default::default() };

        // "/wc/dst" already exists, so the first attempt fails with
        // entry_exists; the retry targets "/wc/dst/a.txt" instead.
        let result = copy(&[src("/wc/a.txt")], "/wc/dst", &mut wc, &mut opener, &mut callbacks, &clock, &options).unwrap();
        assert!(result.is_none());
        assert!(wc.node_exists("/wc/dst/a.txt"));
    }

    #[test]
    fn copy_as_child_with_multiple_sources_is_rejected_up_front() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc").put_file("/wc/a.txt").put_file("/wc/b.txt").put_dir("/wc/dst");
        let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
        let mut callbacks = NoopCallbacks;
        let clock = NoopClock::default();
        let options = CopyOptions { copy_as_child: true, ..Default::default() };

        let err = copy(
            &[src("/wc/a.txt"), src("/wc/b.txt")],
            "/wc/dst",
            &mut wc,
            &mut opener,
            &mut callbacks,
            &clock,
            &options,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ClientMultipleSourcesDisallowed);
    }

    #[test]
    fn copy_single_retries_unconditionally_without_the_flag() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc").put_dir("/wc/dst").put_file("/wc/a.txt");
        let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
        let mut callbacks = NoopCallbacks;
        let clock = NoopClock::default();

        let result = copy_single(&src("/wc/a.txt"), "/wc/dst", &mut wc, &mut opener, &mut callbacks, &clock, Duration::ZERO).unwrap();
        assert!(result.is_none());
        assert!(wc.node_exists("/wc/dst/a.txt"));
    }

    #[test]
    fn wc_to_wc_move_dispatches_to_c4() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc").put_file("/wc/a.txt");
        let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
        let mut callbacks = NoopCallbacks;
        let clock = NoopClock::default();
        let options = MoveOptions::default();

        move_(&[src("/wc/a.txt")], "/wc/b.txt", &mut wc, &mut opener, &mut callbacks, &clock, &options).unwrap();
        assert!(wc.node_exists("/wc/b.txt"));
        assert!(!wc.node_exists("/wc/a.txt"));
    }

    #[test]
    fn repo_to_repo_move_dispatches_to_c5() {
        let repo = FakeRepo::new("svn://r", "uuid-1");
        repo.put_file("svn://r/trunk/a", 1, b"a");
        repo.set_head(5);
        let mut opener = repo.opener();
        let mut wc = FakeWc::new();
        let mut callbacks = RecordingCallbacks::with_log_message("move a");
        let clock = NoopClock::default();
        let options = MoveOptions::default();

        let result = move_(
            &[src("svn://r/trunk/a")],
            "svn://r/trunk/b",
            &mut wc,
            &mut opener,
            &mut callbacks,
            &clock,
            &options,
        )
        .unwrap();
        assert!(result.is_some());
        assert!(repo.node_exists("svn://r/trunk/b"));
    }

    #[test]
    fn move_across_localities_is_rejected_before_dispatch() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc");
        let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
        let mut callbacks = NoopCallbacks;
        let clock = NoopClock::default();
        let options = MoveOptions::default();

        let err = move_(&[src("svn://r/trunk/a")], "/wc/b", &mut wc, &mut opener, &mut callbacks, &clock, &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    }
}
