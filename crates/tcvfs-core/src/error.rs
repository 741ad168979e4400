use thiserror::Error;

pub type VfsResult<T> = Result<T, VfsError>;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures reported by a [`crate::journal::SyncJournal`].
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("journal I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("journal encoding error: {0}")]
    Serde(String),

    #[error("journal is closed")]
    Closed,

    #[error("journal lock poisoned")]
    Poisoned,

    #[error("path escapes the sync root: {0}")]
    InvalidPath(String),
}
