//! Error taxonomy shared by the index builder and the synchronizer.

use std::path::{Path, PathBuf};
use thiserror::Error;
use wheelhouse_schema::NameError;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure is fatal to the run that raised it.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid arguments, missing directories or bad configuration.
    #[error("{0}")]
    Validation(String),

    /// An artifact filename that does not follow the wheel grammar.
    #[error("invalid wheel filename '{filename}': {reason}")]
    MalformedName {
        /// The offending filename.
        filename: String,
        /// Which part of the grammar it breaks.
        reason: String,
    },

    /// A corrupt or unreadable archive.
    #[error("cannot read archive {}: {reason}", path.display())]
    ArchiveRead {
        /// Path of the archive.
        path: PathBuf,
        /// Underlying container error.
        reason: String,
    },

    /// Any list/get/put/delete failure against the remote store.
    #[error("remote {operation} failed for '{name}': {reason}")]
    RemoteStore {
        /// Which store operation failed.
        operation: StoreOp,
        /// Asset or release name the operation targeted.
        name: String,
        /// Transport or server message.
        reason: String,
    },

    /// Local filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of [`Error`], for callers that branch on kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`Error::Validation`].
    Validation,
    /// See [`Error::MalformedName`].
    MalformedName,
    /// See [`Error::ArchiveRead`].
    ArchiveRead,
    /// See [`Error::RemoteStore`].
    RemoteStore,
    /// See [`Error::Io`].
    Io,
}

/// Remote store operations, named in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    /// Listing the release's assets.
    List,
    /// Downloading an asset.
    Get,
    /// Uploading an asset.
    Put,
    /// Deleting an asset.
    Delete,
}

impl std::fmt::Display for StoreOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Put => "put",
            Self::Delete => "delete",
        })
    }
}

impl Error {
    /// Which branch of the taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::MalformedName { .. } => ErrorKind::MalformedName,
            Self::ArchiveRead { .. } => ErrorKind::ArchiveRead,
            Self::RemoteStore { .. } => ErrorKind::RemoteStore,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Create a validation error.
    pub fn validation(msg: impl std::fmt::Display) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Create a store error for `operation` on `name`.
    pub fn store(operation: StoreOp, name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::RemoteStore {
            operation,
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an archive error for `path`.
    pub fn archive(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::ArchiveRead {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl From<NameError> for Error {
    fn from(err: NameError) -> Self {
        Self::MalformedName {
            filename: err.filename,
            reason: err.reason,
        }
    }
}

/// Attach a path to a bare `std::io::Error`.
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::result::Result<T, std::io::Error> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_errors_become_malformed_name() {
        let err: Error = wheelhouse_schema::WheelFilename::parse("bad name.whl")
            .unwrap_err()
            .into();
        assert_eq!(err.kind(), ErrorKind::MalformedName);
        assert!(err.to_string().contains("bad name.whl"));
    }

    #[test]
    fn store_errors_name_the_operation() {
        let err = Error::store(StoreOp::Delete, "pkg-1.0-py3-none-any.whl", "HTTP 500");
        assert_eq!(err.kind(), ErrorKind::RemoteStore);
        assert_eq!(
            err.to_string(),
            "remote delete failed for 'pkg-1.0-py3-none-any.whl': HTTP 500"
        );
    }

    #[test]
    fn io_context_keeps_the_path() {
        let missing = Path::new("/definitely/not/here");
        let err = std::fs::read(missing).at(missing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/definitely/not/here"));
    }
}
