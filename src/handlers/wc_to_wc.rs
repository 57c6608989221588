//! WC→WC Handler (C4): copy or move entirely within one working copy.
//!
//! No RA session and no mergeinfo calculation are involved here; the WC
//! layer's own copy primitive carries history forward locally (spec §4.4).

use crate::collab::{AdmAccess, Callbacks, WcLayer};
use crate::error::{Error, ErrorKind, Result};
use crate::pair::CopyPair;
use crate::path;
use crate::timestamps::{sleep_for_timestamps, Clock};
use crate::{Depth, NodeKind};
use std::time::Duration;

fn preflight(pairs: &[CopyPair], wc: &mut dyn WcLayer) -> Result<()> {
    for pair in pairs {
        if !wc.node_kind(&pair.src)?.exists() {
            return Err(Error::for_path(ErrorKind::NodeUnknownKind, &pair.src));
        }
        if wc.node_kind(&pair.dst)?.exists() {
            return Err(Error::for_path(ErrorKind::EntryExists, &pair.dst));
        }
        if !wc.is_directory(&pair.dst_parent)? {
            return Err(Error::for_path(ErrorKind::WcNotDirectory, &pair.dst_parent));
        }
    }
    Ok(())
}

/// All dests share one parent (spec §3 invariant 6), so a single admin
/// lock on that parent covers every pair.
#[tracing::instrument(skip_all, fields(pairs = pairs.len()))]
pub fn copy(
    pairs: &mut [CopyPair],
    wc: &mut dyn WcLayer,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    granularity: Duration,
) -> Result<()> {
    preflight(pairs, wc)?;
    let dst_parent = path::longest_common_ancestor_many(pairs.iter().map(|p| p.dst_parent.as_str()));
    let adm = wc.adm_open(&dst_parent, Depth::Infinity)?;

    let outcome = (|| -> Result<()> {
        for pair in pairs.iter_mut() {
            callbacks.cancel()?;
            pair.src_kind = wc.node_kind(&pair.src)?;
            wc.copy(&pair.src, &adm, &pair.base_name)?;
        }
        Ok(())
    })();

    sleep_for_timestamps(clock, granularity);
    let close_result = wc.adm_close(adm);
    outcome.and(close_result)
}

/// Per spec §4.4: each pair picks its own lock pairing, since sources
/// needn't share a parent the way destinations do.
#[tracing::instrument(skip_all, fields(pairs = pairs.len(), force))]
pub fn move_pairs(
    pairs: &mut [CopyPair],
    wc: &mut dyn WcLayer,
    callbacks: &mut dyn Callbacks,
    clock: &dyn Clock,
    granularity: Duration,
    force: bool,
) -> Result<()> {
    preflight(pairs, wc)?;

    for pair in pairs.iter_mut() {
        callbacks.cancel()?;
        pair.src_kind = wc.node_kind(&pair.src)?;

        let src_parent = path::dirname(&pair.src);
        let depth = if matches!(pair.src_kind, NodeKind::Dir) { Depth::Infinity } else { Depth::Empty };
        let src_adm = wc.adm_open(&src_parent, depth)?;

        enum DstLock {
            SameAsSrc,
            Retrieved(AdmAccess),
            Independent(AdmAccess),
        }

        let dst_lock = if src_parent == pair.dst_parent {
            DstLock::SameAsSrc
        } else if matches!(pair.src_kind, NodeKind::Dir) && path::is_strict_ancestor(&pair.src, &pair.dst_parent) {
            match wc.adm_retrieve(&src_adm, &pair.dst_parent) {
                Ok(adm) => DstLock::Retrieved(adm),
                Err(e) => {
                    let _ = wc.adm_close(src_adm);
                    return Err(e);
                }
            }
        } else {
            match wc.adm_probe_open(&pair.dst_parent) {
                Ok(adm) => DstLock::Independent(adm),
                Err(e) => {
                    let _ = wc.adm_close(src_adm);
                    return Err(e);
                }
            }
        };

        let outcome = (|| -> Result<()> {
            let dst_adm_ref = match &dst_lock {
                DstLock::SameAsSrc => &src_adm,
                DstLock::Retrieved(adm) | DstLock::Independent(adm) => adm,
            };
            wc.copy(&pair.src, dst_adm_ref, &pair.base_name)?;
            wc.delete(&pair.src, &src_adm, force)?;
            Ok(())
        })();

        sleep_for_timestamps(clock, granularity);

        let dst_close = match dst_lock {
            DstLock::SameAsSrc | DstLock::Retrieved(_) => Ok(()),
            DstLock::Independent(adm) => wc.adm_close(adm),
        };
        let src_close = wc.adm_close(src_adm);

        outcome.and(dst_close).and(src_close)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::NoopCallbacks;
    use crate::testing::fake_wc::FakeWc;
    use crate::timestamps::NoopClock;
    use crate::{CopyPair, CopySource, Revision};

    fn pair(src: &str, dst: &str) -> CopyPair {
        CopyPair::new(&CopySource::new(src, Revision::Working, Revision::Working), dst.to_string())
    }

    #[test]
    fn copy_creates_destination_and_releases_lock() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc").put_file("/wc/a.txt");
        let mut pairs = vec![pair("/wc/a.txt", "/wc/b.txt")];
        let clock = NoopClock::default();
        let mut callbacks = NoopCallbacks;
        copy(&mut pairs, &mut wc, &mut callbacks, &clock, Duration::ZERO).unwrap();
        assert!(wc.node_exists("/wc/b.txt"));
        assert!(wc.open_locks().is_empty());
    }

    #[test]
    fn copy_rejects_existing_destination() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc").put_file("/wc/a.txt").put_file("/wc/b.txt");
        let mut pairs = vec![pair("/wc/a.txt", "/wc/b.txt")];
        let clock = NoopClock::default();
        let mut callbacks = NoopCallbacks;
        let err = copy(&mut pairs, &mut wc, &mut callbacks, &clock, Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EntryExists);
    }

    #[test]
    fn move_copies_then_deletes_source() {
        let mut wc = FakeWc::new();
        wc.put_dir("/wc").put_file("/wc/a.txt");
        let mut pairs = vec![pair("/wc/a.txt", "/wc/b.txt")];
        let clock = NoopClock::default();
        let mut callbacks = NoopCallbacks;
        move_pairs(&mut pairs, &mut wc, &mut callbacks, &clock, Duration::ZERO, false).unwrap();
        assert!(wc.node_exists("/wc/b.txt"));
        assert!(!wc.node_exists("/wc/a.txt"));
        assert!(wc.open_locks().is_empty());
    }

    #[test]
    fn move_into_sibling_directory_uses_independent_locks() {
        let mut wc = FakeWc::new();
        wc.put_file("/wc/src/a.txt").put_dir("/wc/dst");
        let mut pairs = vec![pair("/wc/src/a.txt", "/wc/dst/a.txt")];
        let clock = NoopClock::default();
        let mut callbacks = NoopCallbacks;
        move_pairs(&mut pairs, &mut wc, &mut callbacks, &clock, Duration::ZERO, false).unwrap();
        assert!(wc.node_exists("/wc/dst/a.txt"));
        assert!(wc.open_locks().is_empty());
    }
}
