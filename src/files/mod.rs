//! Filesystem collaborators of the pipeline.
//!
//! - [`list_files_recursively`] - candidate file discovery
//! - [`read_lines`] - lazy, lossy line reader
//! - [`ensure_directory`] / [`delete_file`] - output directory plumbing

mod lines;
mod ops;
mod walk;

use std::path::PathBuf;

use thiserror::Error;

pub use lines::{LineReader, read_lines};
pub use ops::{delete_file, ensure_directory};
pub use walk::list_files_recursively;

/// Errors raised by the filesystem collaborators.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source root does not exist or is not a directory.
    #[error("source root {path} is not a directory")]
    MissingRoot {
        /// The configured root.
        path: PathBuf,
    },

    /// An IO operation on `path` failed.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
