//! Typed error handling for evprop.
//!
//! Errors fall into three groups that callers treat differently:
//!
//! - **Corpus integrity errors** abort the whole analysis run. The corpus is
//!   structurally ambiguous and no partial output is produced.
//! - **Lookup errors** are local. A batch report can skip the offending
//!   listener and carry on.
//! - Everything else (I/O, configuration, invalid caller input) comes from the
//!   surface around the core.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for evprop operations.
#[derive(Error, Debug)]
pub enum EvpropError {
    /// I/O error when reading sources or writing documents
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration file errors
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// A submit-callable name is defined more than once in the corpus
    #[error("Function or macro `{name}` is defined more than once (in {})", .files.join(", "))]
    DuplicateCallable {
        name: String,
        /// Every file defining the name, sorted
        files: Vec<String>,
    },

    /// A listener file does not contain exactly one registration
    #[error("Listener file {file} must register exactly one listener, found {found}")]
    ListenerMarker { file: String, found: usize },

    /// A listener name is redefined more than once in its file
    #[error("Listener name `{alias}` in {file} is redefined {found} times, expected at most one")]
    ListenerAlias {
        file: String,
        alias: String,
        found: usize,
    },

    /// Internal layout inconsistency while building a propagation table
    #[error("Propagation table for `{listener}`: column `{column}` has {found} rows, expected {expected}")]
    ColumnMismatch {
        listener: String,
        column: String,
        expected: usize,
        found: usize,
    },

    /// Query for a listener that is not part of the model
    #[error("Unknown listener `{name}`")]
    UnknownListener { name: String },

    /// Invalid argument provided by the caller
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl EvpropError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate callable error. The file list is sorted and deduplicated.
    pub fn duplicate_callable(name: impl Into<String>, files: impl IntoIterator<Item = String>) -> Self {
        let mut files: Vec<String> = files.into_iter().collect();
        files.sort();
        files.dedup();
        Self::DuplicateCallable {
            name: name.into(),
            files,
        }
    }

    /// Create a listener marker error.
    pub fn listener_marker(file: impl Into<String>, found: usize) -> Self {
        Self::ListenerMarker {
            file: file.into(),
            found,
        }
    }

    /// Create a listener alias error.
    pub fn listener_alias(file: impl Into<String>, alias: impl Into<String>, found: usize) -> Self {
        Self::ListenerAlias {
            file: file.into(),
            alias: alias.into(),
            found,
        }
    }

    /// Create an unknown listener lookup error.
    pub fn unknown_listener(name: impl Into<String>) -> Self {
        Self::UnknownListener { name: name.into() }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Check if this error means the corpus itself is inconsistent.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCallable { .. }
                | Self::ListenerMarker { .. }
                | Self::ListenerAlias { .. }
                | Self::ColumnMismatch { .. }
        )
    }

    /// Check if this is a lookup error the caller can recover from.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::UnknownListener { .. })
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for evprop results.
pub type EvpropResult<T> = Result<T, EvpropError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> EvpropResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> EvpropResult<T> {
        self.map_err(|e| EvpropError::io(path, e))
    }
}
