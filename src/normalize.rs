//! Pair Normalizer (C1): turns user `(sources, dst)` input into validated
//! [`CopyPair`]s, resolving peg/op revisions and rejecting mixed locality.

use crate::collab::WcLayer;
use crate::error::{Error, ErrorKind};
use crate::path;
use crate::{CopyPair, CopySource, Revision};

/// The result of normalization: the validated pairs, plus whether the
/// *effective* operation treats sources as URLs (this can flip from
/// `false` to `true` via the WC→repo promotion in step 7).
#[derive(Debug)]
pub struct Normalized {
    pub pairs: Vec<CopyPair>,
    pub srcs_are_urls: bool,
}

/// `normalize(sources, dst, is_move) -> CopyPair[]` (spec §4.1).
///
/// `wc` is consulted only for step 7 (WC→repo promotion); pass `None` when
/// the caller already knows no promotion can apply (e.g. all sources are
/// URLs).
pub fn normalize(
    sources: &[CopySource],
    dst: &str,
    is_move: bool,
    wc: Option<&mut dyn WcLayer>,
) -> Result<Normalized, Error> {
    if sources.is_empty() {
        return Err(Error::new(
            ErrorKind::UnsupportedFeature,
            "At least one source is required",
        ));
    }

    // Step 1: reject WC-only peg revisions on URL sources.
    for source in sources {
        if source.is_url() && source.peg_revision.is_wc_only() {
            return Err(Error::new(
                ErrorKind::ClientBadRevision,
                format!(
                    "Peg revision '{:?}' is not allowed for URL '{}'",
                    source.peg_revision, source.path
                ),
            ));
        }
    }

    // Step 4: locality homogeneity.
    let srcs_are_urls = sources[0].is_url();
    for source in &sources[1..] {
        if source.is_url() != srcs_are_urls {
            return Err(Error::new(
                ErrorKind::UnsupportedFeature,
                "Cannot mix repository and working copy sources",
            ));
        }
    }

    // Step 2: single vs. multi-source destination handling.
    let dsts: Vec<String> = if sources.len() > 1 {
        sources
            .iter()
            .map(|s| path::join(dst, &path::basename(&s.path)))
            .collect()
    } else {
        vec![dst.to_string()]
    };

    // Step 3: resolve peg/op revisions.
    let mut pairs = Vec::with_capacity(sources.len());
    for (source, pair_dst) in sources.iter().zip(dsts.into_iter()) {
        let peg_revision = match source.peg_revision {
            Revision::Unspecified => {
                if srcs_are_urls {
                    Revision::Head
                } else {
                    Revision::Working
                }
            }
            other => other,
        };
        let op_revision = match source.revision {
            Revision::Unspecified => peg_revision,
            other => other,
        };
        let resolved = CopySource::new(source.path.clone(), op_revision, peg_revision);

        // Step 5: no copy/move into own descendant (only meaningful when
        // both sides are local paths; URL self-containment is handled by
        // C5's resurrection logic instead).
        if !srcs_are_urls && path::is_strict_ancestor(&resolved.path, &pair_dst) {
            return Err(Error::new(
                ErrorKind::UnsupportedFeature,
                format!("Cannot copy path '{}' into its own subdirectory", resolved.path),
            ));
        }

        // Step 6: move-specific rules.
        if is_move {
            let dst_is_url = path::is_url(&pair_dst);
            if srcs_are_urls != dst_is_url {
                return Err(Error::new(
                    ErrorKind::UnsupportedFeature,
                    "Moves may not cross the working copy/repository boundary",
                ));
            }
            if resolved.path == pair_dst {
                return Err(Error::new(
                    ErrorKind::UnsupportedFeature,
                    format!("Cannot move path '{}' into itself", resolved.path),
                ));
            }
        }

        pairs.push(CopyPair::new(&resolved, pair_dst));
    }

    // Step 7: WC→repo promotion.
    let mut effective_srcs_are_urls = srcs_are_urls;
    if !srcs_are_urls && !is_move {
        let promote = pairs
            .iter()
            .any(|p| !matches!(p.src_op_revision, Revision::Unspecified | Revision::Working));
        if promote {
            let wc = wc.ok_or_else(|| {
                Error::new(
                    ErrorKind::EntryMissingUrl,
                    "Working copy entry lookup is required to promote this copy to a repository operation",
                )
            })?;
            for pair in &mut pairs {
                let entry = wc.entry(&pair.src).map_err(|e| {
                    Error::with_cause(ErrorKind::EntryMissingUrl, "Failed to read working copy entry", e)
                })?;
                let entry = entry.ok_or_else(|| {
                    Error::for_path(ErrorKind::NodeUnknownKind, &pair.src)
                })?;
                let url = entry.url.ok_or_else(|| {
                    Error::for_path(ErrorKind::EntryMissingUrl, &pair.src)
                })?;
                pair.src = url;
                pair.src_peg_revision = entry
                    .revision
                    .map(Revision::Number)
                    .unwrap_or(Revision::Head);
                pair.src_abs = None;
            }
            effective_srcs_are_urls = true;
        }
    }

    Ok(Normalized {
        pairs,
        srcs_are_urls: effective_srcs_are_urls,
    })
}
