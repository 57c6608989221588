//! Pure-Rust path and URL manipulation for repository-relative and
//! dirent-style paths.
//!
//! The teacher's `dirent.rs`/`uri.rs` wrap APR-pool-backed `svn_dirent_*`
//! and `svn_uri_*` C calls behind a borrowed, pool-lifetimed type. This
//! module gives the same shape (`dirname`/`basename`/`split`/
//! `is_root`/`canonicalize`) over owned `String`s, since the copy/move
//! core never needs pool-scoped borrows once WC/RA I/O is behind a trait.

use percent_encoding::percent_decode_str;

/// Split `path` into `(dirname, basename)` at the last `/`. Mirrors
/// `svn_uri_split`/`svn_dirent_split`. A path with no `/` has an empty
/// dirname.
pub fn split(path: &str) -> (String, String) {
    let path = strip_trailing_slash(path);
    match path.rfind('/') {
        Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
        None => (String::new(), path.to_string()),
    }
}

pub fn dirname(path: &str) -> String {
    split(path).0
}

pub fn basename(path: &str) -> String {
    split(path).1
}

fn strip_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// Join a parent path/URL and a single path component.
pub fn join(parent: &str, component: &str) -> String {
    if parent.is_empty() {
        component.to_string()
    } else if parent.ends_with('/') {
        format!("{parent}{component}")
    } else {
        format!("{parent}/{component}")
    }
}

/// `true` iff `path` is empty or `/`, i.e. the repository root.
pub fn is_root(path: &str) -> bool {
    path.is_empty() || path == "/"
}

/// `true` iff `maybe_child` is `ancestor` itself or lies strictly below it,
/// splitting at path segments (never a raw string-prefix test; spec §4.2
/// is explicit that ancestry must split at `/`).
pub fn is_ancestor_or_self(ancestor: &str, maybe_child: &str) -> bool {
    if ancestor.is_empty() {
        return true;
    }
    if maybe_child == ancestor {
        return true;
    }
    maybe_child
        .strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// `true` iff `maybe_child` lies strictly below `ancestor`.
pub fn is_strict_ancestor(ancestor: &str, maybe_child: &str) -> bool {
    maybe_child != ancestor && is_ancestor_or_self(ancestor, maybe_child)
}

/// Split a URL into `(scheme, authority, path_segments)`. `None` for
/// anything that doesn't look like `scheme://authority[/path]`.
fn split_url(s: &str) -> Option<(&str, &str, Vec<&str>)> {
    let (scheme, rest) = s.split_once("://")?;
    if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
        return None;
    }
    let (authority, path) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => (rest, ""),
    };
    let segments = if path.is_empty() { Vec::new() } else { path.split('/').collect() };
    Some((scheme, authority, segments))
}

fn common_prefix<'a>(a: &[&'a str], b: &[&str]) -> Vec<&'a str> {
    a.iter()
        .zip(b.iter())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| *x)
        .collect()
}

/// Longest common path-segment ancestor of `a` and `b`. Splitting happens
/// on `/`, so `"/trunk/foo"` and `"/trunk/foobar"` share ancestor
/// `"/trunk"`, not `"/trunk/foo"`.
///
/// For URLs, the scheme and authority (host) must match exactly before any
/// path segment is considered shared; two different hosts never have a
/// common ancestor, however similar their paths look, since they are
/// different repositories entirely.
pub fn longest_common_ancestor(a: &str, b: &str) -> String {
    match (split_url(a), split_url(b)) {
        (Some((scheme_a, auth_a, path_a)), Some((scheme_b, auth_b, path_b))) => {
            if scheme_a != scheme_b || auth_a != auth_b {
                return String::new();
            }
            let common = common_prefix(&path_a, &path_b);
            let base = format!("{scheme_a}://{auth_a}");
            if common.is_empty() {
                base
            } else {
                format!("{base}/{}", common.join("/"))
            }
        }
        (None, None) => {
            let a_segs: Vec<&str> = a.split('/').collect();
            let b_segs: Vec<&str> = b.split('/').collect();
            common_prefix(&a_segs, &b_segs).join("/")
        }
        _ => String::new(),
    }
}

/// Longest common ancestor across an arbitrary number of paths. Empty
/// input yields the empty string (the caller decides whether that's a
/// cross-repository signal, as C5 step 3 does).
pub fn longest_common_ancestor_many<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut iter = paths.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    let mut acc = first.to_string();
    for p in iter {
        acc = longest_common_ancestor(&acc, p);
        if acc.is_empty() {
            break;
        }
    }
    acc
}

/// Make `path` relative to `anchor`, URI-decoding each segment (spec §4.2,
/// §4.5 step 6: "`src_rel` relative to the RA-session anchor URL,
/// URI-decoded").
pub fn relative_to(anchor: &str, path: &str) -> String {
    let stripped = path
        .strip_prefix(anchor)
        .map(|rest| rest.trim_start_matches('/'))
        .unwrap_or(path);
    uri_decode(stripped)
}

/// Percent-decode a URI path component. Repository-relative paths are
/// stored decoded; URLs carry percent-encoding that must be stripped
/// before the path is used as a working-copy-relative key.
pub fn uri_decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// `true` iff `path` looks like a URL (`scheme://...`) rather than a local
/// path. Used by C1 to enforce locality homogeneity among sources.
pub fn is_url(path: &str) -> bool {
    path.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
    })
}
