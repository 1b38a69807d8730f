use crate::node::Inumber;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("found no file at path")]
    NotFound,
    #[error("path component is not a directory")]
    NotADirectory,
    #[error("an entry with that name already exists")]
    AlreadyExists,
    #[error("directory is not empty")]
    DirectoryNotEmpty,
    #[error("inode table is full")]
    TableFull,
    #[error("directory has no free entries")]
    DirectoryFull,
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A thread panicked while holding the lock of this inode. The table can no
    /// longer be trusted to be consistent.
    #[error("lock on inode {0} is poisoned")]
    LockPoisoned(Inumber),
    #[error("failed writing tree output")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Returns true for errors that indicate broken internal state rather than a
    /// rejected request. Callers should not retry these.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FsError::LockPoisoned(_))
    }

    pub(crate) fn invalid<S: Into<String>>(msg: S) -> Self {
        FsError::InvalidArgument(msg.into())
    }
}

pub type FsResult<T> = Result<T, FsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_poisoned_locks_are_fatal() {
        assert!(FsError::LockPoisoned(Inumber::ROOT).is_fatal());
        assert!(!FsError::TableFull.is_fatal());
        assert!(!FsError::invalid("empty name").is_fatal());
    }

    #[test]
    fn invalid_argument_carries_reason() {
        let err = FsError::invalid("entry name must be non-empty");
        assert_eq!(
            err.to_string(),
            "invalid argument: entry name must be non-empty"
        );
    }
}
