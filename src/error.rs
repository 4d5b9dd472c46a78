//! Error taxonomy shared across the crate.
//!
//! Every disk-layer failure bubbles up as one of these variants; the TUI
//! converts them to status messages, the CLI prints them and picks an exit
//! code. Nothing in this crate panics on user input.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Crate-wide error type.
#[derive(Debug)]
pub enum Error {
    /// User input violates a rule (empty name, collision, traversal).
    /// Surfaced inline; the operation had no side effects.
    Validation(String),
    /// A referenced path was missing at operation time.
    NotFound(PathBuf),
    /// A read/write/move failed.
    Io {
        op: &'static str,
        path: PathBuf,
        source: io::Error,
    },
    /// A file exists but could not be parsed.
    Malformed { path: PathBuf, reason: String },
    /// A multi-step operation completed some steps and failed others.
    /// The caller must rerun to reconcile.
    PartialPropagation {
        succeeded: Vec<String>,
        failed: Vec<(String, String)>,
    },
    /// User-initiated termination of a cancellable operation.
    Cancelled,
    /// An input would reach a shell or escape the project tree. Refused.
    Unsafe(String),
}

impl Error {
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "{}", msg),
            Error::NotFound(path) => write!(f, "not found: {}", path.display()),
            Error::Io { op, path, source } => {
                write!(f, "{} failed for {}: {}", op, path.display(), source)
            }
            Error::Malformed { path, reason } => {
                write!(f, "malformed file {}: {}", path.display(), reason)
            }
            Error::PartialPropagation { succeeded, failed } => {
                write!(
                    f,
                    "partially completed: {} updated, {} failed",
                    succeeded.len(),
                    failed.len()
                )?;
                for (item, reason) in failed {
                    write!(f, "; {} ({})", item, reason)?;
                }
                Ok(())
            }
            Error::Cancelled => write!(f, "cancelled"),
            Error::Unsafe(msg) => write!(f, "refused unsafe input: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_io() {
        let err = Error::io(
            "write",
            "components/prompts/a.md",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("write failed"));
        assert!(msg.contains("components/prompts/a.md"));
    }

    #[test]
    fn test_display_partial() {
        let err = Error::PartialPropagation {
            succeeded: vec!["alpha.yaml".to_string()],
            failed: vec![("beta.yaml".to_string(), "permission denied".to_string())],
        };
        let msg = err.to_string();
        assert!(msg.contains("1 updated"));
        assert!(msg.contains("beta.yaml"));
    }
}
