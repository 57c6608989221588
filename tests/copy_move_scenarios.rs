//! End-to-end coverage of the six seed scenarios and a couple of the
//! cross-cutting invariants, driven entirely through the public
//! [`svn_copy_core::copy`]/[`svn_copy_core::move_`] entry points rather than
//! any one handler directly.

use std::sync::Once;
use std::time::Duration;

use svn_copy_core::collab::{NoopCallbacks, RaOpen};
use svn_copy_core::mergeinfo::{Mergeinfo, RevisionRange};
use svn_copy_core::testing::fake_repo::FakeRepo;
use svn_copy_core::testing::fake_wc::FakeWc;
use svn_copy_core::testing::RecordingCallbacks;
use svn_copy_core::timestamps::NoopClock;
use svn_copy_core::{copy, move_, CopyOptions, CopySource, ErrorKind, MoveOptions, Revision, Revnum};

static TRACING_INIT: Once = Once::new();

/// Route this crate's `tracing` spans through a test-scoped subscriber so a
/// failing scenario's handler dispatch/lock trail shows up in `cargo test
/// -- --nocapture`, mirroring the pack's own `tracing_subscriber::fmt` setup.
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

fn src(path: &str) -> CopySource {
    CopySource::new(path, Revision::Unspecified, Revision::Unspecified)
}

fn rn(n: i64) -> Revnum {
    Revnum::from_raw(n).unwrap()
}

#[test]
fn scenario_1_simple_wc_to_wc_file_copy() {
    init_tracing();
    let mut wc = FakeWc::new();
    wc.put_dir("/wc").put_file("/wc/a.txt");
    let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
    let mut callbacks = NoopCallbacks;
    let clock = NoopClock::default();

    let result = copy(&[src("/wc/a.txt")], "/wc/b.txt", &mut wc, &mut opener, &mut callbacks, &clock, &CopyOptions::default()).unwrap();

    assert!(result.is_none());
    assert!(wc.node_exists("/wc/b.txt"));
    assert!(wc.open_locks().is_empty());
}

#[test]
fn scenario_2_repo_to_repo_copy_into_itself_resurrects() {
    init_tracing();
    let repo = FakeRepo::new("svn://r", "uuid-1");
    repo.put_dir("svn://r/trunk", 1);
    repo.put_dir("svn://r/trunk/X", 50);
    repo.set_head(100);
    repo.delete("svn://r/trunk/X");
    let mut opener = repo.opener();
    let mut wc = FakeWc::new();
    let mut callbacks = RecordingCallbacks::with_log_message("resurrect X");
    let clock = NoopClock::default();

    let result = copy(
        &[CopySource::new("svn://r/trunk/X", Revision::Number(rn(50)), Revision::Number(rn(50)))],
        "svn://r/trunk/X",
        &mut wc,
        &mut opener,
        &mut callbacks,
        &clock,
        &CopyOptions::default(),
    )
    .unwrap();

    assert!(result.is_some());
    assert!(repo.node_exists("svn://r/trunk/X"));
}

#[test]
fn scenario_3_repo_to_repo_move_of_siblings() {
    init_tracing();
    let repo = FakeRepo::new("svn://r", "uuid-1");
    repo.put_file("svn://r/trunk/a", 1, b"a");
    repo.put_file("svn://r/trunk/b", 1, b"b");
    repo.put_dir("svn://r/dest", 1);
    repo.set_head(5);
    let mut opener = repo.opener();
    let mut wc = FakeWc::new();
    let mut callbacks = RecordingCallbacks::with_log_message("move siblings into dest");
    let clock = NoopClock::default();

    let result = move_(
        &[src("svn://r/trunk/a"), src("svn://r/trunk/b")],
        "svn://r/dest",
        &mut wc,
        &mut opener,
        &mut callbacks,
        &clock,
        &MoveOptions::default(),
    )
    .unwrap();

    assert!(result.is_some());
    assert!(repo.node_exists("svn://r/dest/a"));
    assert!(repo.node_exists("svn://r/dest/b"));
    assert!(!repo.node_exists("svn://r/trunk/a"));
    assert!(!repo.node_exists("svn://r/trunk/b"));
}

#[test]
fn scenario_4_cross_repository_attempt_is_reported() {
    init_tracing();
    let repo = FakeRepo::new("svn://A", "uuid-a");
    repo.put_file("svn://A/x", 1, b"x");
    repo.set_head(1);
    let mut opener = repo.opener();
    let mut wc = FakeWc::new();
    let mut callbacks = NoopCallbacks;
    let clock = NoopClock::default();

    let err = copy(&[src("svn://A/x")], "svn://B/y", &mut wc, &mut opener, &mut callbacks, &clock, &CopyOptions::default()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    assert!(err.message().contains("not to be in the same repository"));
}

#[test]
fn scenario_5_wc_to_repo_multi_file_copy_unions_mergeinfo() {
    init_tracing();
    let repo = FakeRepo::new("svn://r", "uuid-1");
    repo.put_file("svn://r/trunk/a.txt", 1, b"old-a");
    repo.put_file("svn://r/trunk/b.txt", 1, b"old-b");
    repo.set_head(5);
    let mut explicit_a = Mergeinfo::new();
    explicit_a.add_range("/branches/feature", RevisionRange::new(rn(8), rn(9)));
    repo.set_mergeinfo("svn://r/trunk/a.txt", explicit_a.clone());

    let mut wc = FakeWc::new();
    wc.put_dir("/wc").put_file("/wc/a.txt").put_file("/wc/b.txt");
    wc.set_content("/wc/a.txt", b"new-a");
    wc.set_content("/wc/b.txt", b"new-b");
    wc.set_entry_url("/wc/a.txt", "svn://r/trunk/a.txt", 3);
    wc.set_entry_url("/wc/b.txt", "svn://r/trunk/b.txt", 3);
    let mut wc_local = Mergeinfo::new();
    wc_local.add_range("/branches/other", RevisionRange::new(rn(2), rn(2)));
    wc.set_mergeinfo("/wc/a.txt", wc_local.clone());

    let mut opener = repo.opener();
    let mut callbacks = RecordingCallbacks::with_log_message("publish a and b");
    let clock = NoopClock::default();

    let result = copy(
        &[src("/wc/a.txt"), src("/wc/b.txt")],
        "svn://r/trunk2",
        &mut wc,
        &mut opener,
        &mut callbacks,
        &clock,
        &CopyOptions::default(),
    )
    .unwrap();
    assert!(result.is_some());
    assert!(repo.node_exists("svn://r/trunk2/a.txt"));
    assert!(repo.node_exists("svn://r/trunk2/b.txt"));

    let mut verify = repo.opener().open("svn://r", None).unwrap();
    let merged = verify.get_mergeinfo("trunk2/a.txt", repo.head()).unwrap();

    // implied [1..3] on trunk/a.txt, union the explicit repo-side range and
    // the WC's own locally recorded range.
    assert_eq!(merged.ranges("trunk/a.txt"), &[RevisionRange::new(rn(1), rn(3))]);
    assert_eq!(merged.ranges("/branches/feature"), explicit_a.ranges("/branches/feature"));
    assert_eq!(merged.ranges("/branches/other"), wc_local.ranges("/branches/other"));
}

#[test]
fn scenario_6_repo_to_wc_foreign_uuid_directory_copy() {
    init_tracing();
    let repo = FakeRepo::new("svn://r", "uuid-src");
    repo.put_dir("svn://r/trunk", 1);
    repo.set_head(1);
    let mut opener = repo.opener();

    let mut wc = FakeWc::new();
    wc.put_dir("/wc");
    wc.set_entry_url("/wc", "svn://other/wc-root", 1);

    let mut callbacks = NoopCallbacks;
    let clock = NoopClock::default();

    let err = copy(
        &[CopySource::new("svn://r/trunk", Revision::Number(rn(1)), Revision::Number(rn(1)))],
        "/wc/trunk",
        &mut wc,
        &mut opener,
        &mut callbacks,
        &clock,
        &CopyOptions::default(),
    )
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedFeature);
    assert!(err.message().contains("foreign repository"));
    // The checkout itself still landed; only the history marker is denied.
    assert!(wc.node_exists("/wc/trunk"));
}

#[test]
fn invariant_wc_to_wc_copy_leaves_the_same_lock_set_held() {
    init_tracing();
    let mut wc = FakeWc::new();
    wc.put_dir("/wc").put_file("/wc/a.txt");
    let before = wc.open_locks().to_vec();
    let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
    let mut callbacks = NoopCallbacks;
    let clock = NoopClock::default();

    copy(&[src("/wc/a.txt")], "/wc/b.txt", &mut wc, &mut opener, &mut callbacks, &clock, &CopyOptions::default()).unwrap();

    assert_eq!(wc.open_locks(), before.as_slice());
}

#[test]
fn invariant_copy_as_child_retries_exactly_once_on_destination_collision() {
    init_tracing();
    let mut wc = FakeWc::new();
    wc.put_dir("/wc").put_dir("/wc/dst").put_file("/wc/a.txt");
    let mut opener = FakeRepo::new("svn://r", "uuid-1").opener();
    let mut callbacks = NoopCallbacks;
    let clock = NoopClock::default();
    let options = CopyOptions { copy_as_child: true, timestamp_granularity: Duration::ZERO };

    let result = copy(&[src("/wc/a.txt")], "/wc/dst", &mut wc, &mut opener, &mut callbacks, &clock, &options).unwrap();

    assert!(result.is_none());
    assert!(wc.node_exists("/wc/dst/a.txt"));
    assert!(!wc.node_exists("/wc/dst/dst"));
}
