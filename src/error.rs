//! Structured errors for the copy/move core.
//!
//! The upstream C implementation links `svn_error_t` nodes into a cause
//! chain and frees them on drop (see the teacher's `error.rs`). Here the
//! chain becomes an owned `Box<Error>` and the §7 composite-error policy is
//! a plain function instead of manual list splicing.

use std::fmt;

/// Stable error kinds, matching spec.md §7's table one-for-one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("path does not exist")]
    NodeUnknownKind,
    #[error("destination already exists")]
    EntryExists,
    #[error("destination already exists in repository")]
    FsAlreadyExists,
    #[error("source not found at the requested revision")]
    FsNotFound,
    #[error("destination parent is not a directory")]
    WcNotDirectory,
    #[error("working copy entry is obstructed")]
    WcObstructedUpdate,
    #[error("unsupported operation")]
    UnsupportedFeature,
    #[error("invalid peg revision")]
    ClientBadRevision,
    #[error("illegal repository URL")]
    RaIllegalUrl,
    #[error("multiple sources not allowed here")]
    ClientMultipleSourcesDisallowed,
    #[error("working copy entry has no URL")]
    EntryMissingUrl,
}

/// An error from the copy/move core.
///
/// Carries a human-readable message including the offending path (per
/// spec.md §7's "user-visible failure behavior") and an optional boxed
/// cause for chaining.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    cause: Option<Box<Error>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Build an error whose message is the kind's canonical text, with
    /// `path` appended, the common case in C1/C4-C7's pre-flight checks.
    pub fn for_path(kind: ErrorKind, path: &str) -> Self {
        Self::new(kind, format!("{kind}: '{path}'"))
    }

    pub fn with_cause(kind: ErrorKind, message: impl Into<String>, cause: Error) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&Error> {
        self.cause.as_deref()
    }

    /// Wrap `self` under a new top-level message, preserving `self` as the
    /// cause. Used to prefix errors with the §7 composite-error headers.
    pub fn wrapped(self, prefix: &str) -> Error {
        let kind = self.kind;
        let message = format!("{prefix}\n{}", self.message);
        Error::with_cause(kind, message, self)
    }

    /// Implements the §7 composite-error policy for the WC→repo path:
    /// `commit`, `unlock`, and `cleanup` are three independently-attempted
    /// phases, each producing an optional error, chained in that order.
    ///
    /// Returns `None` iff all three are `None`.
    pub fn compose(
        commit_err: Option<Error>,
        unlock_err: Option<Error>,
        cleanup_err: Option<Error>,
    ) -> Option<Error> {
        let mut head = match commit_err {
            Some(err) => err.wrapped("Commit failed (details follow):"),
            None => {
                if unlock_err.is_none() && cleanup_err.is_none() {
                    return None;
                }
                Error::new(
                    ErrorKind::UnsupportedFeature,
                    "Commit succeeded, but other errors follow:",
                )
            }
        };

        if let Some(err) = unlock_err {
            head = append(head, err.wrapped("Error unlocking locked dirs (details follow):"));
        }
        if let Some(err) = cleanup_err {
            head = append(head, err.wrapped("Error in post-commit clean-up (details follow):"));
        }
        Some(head)
    }
}

/// Appends `next` at the end of `head`'s cause chain.
fn append(mut head: Error, next: Error) -> Error {
    let mut tail = &mut head;
    while tail.cause.is_some() {
        tail = tail.cause.as_mut().unwrap();
    }
    tail.cause = Some(Box::new(next));
    head
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
