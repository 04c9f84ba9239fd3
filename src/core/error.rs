//! Error types for the engine and the registry store.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TronError {
    /// Read or write failure on the durable store.
    #[error("registry store I/O failed at {path:?}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The persisted document could not be understood.
    #[error("registry store at {path:?} is corrupt: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// Unrecognized accumulation-mode tag.
    #[error("invalid accumulation mode: {0:?}")]
    InvalidMode(String),

    /// Re-registration of a label with different provenance.
    #[error("label {label:?} is already registered with a different {field}")]
    DuplicateRegistration { label: String, field: &'static str },

    /// A labeled node was asked to persist but no registry was supplied.
    #[error("node {0:?} is label-bound and needs a registry")]
    RegistryRequired(String),

    #[error("node key {0} is not part of this field")]
    UnknownNode(usize),

    #[error("root key {0} is not part of this field")]
    UnknownRoot(usize),

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

impl TronError {
    pub(crate) fn store_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::StoreIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn store_corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::StoreCorrupt {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TronError>;
