use crate::dir::Directory;
use crate::error::{FsError, FsResult};

use std::fmt;

/// Index of an inode slot in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Inumber(u32);

impl Inumber {
    /// The root directory always lives in the first slot.
    pub const ROOT: Inumber = Inumber(0);

    pub(crate) fn from_raw(raw: u32) -> Self {
        Inumber(raw)
    }

    pub(crate) fn raw(self) -> u32 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Inumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of object an inode describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    /// A regular file.
    File,
    /// A directory holding a fixed number of entries.
    Directory,
}

/// What an allocated inode owns. Exactly one representation exists at a time.
#[derive(Debug, Clone)]
pub enum Payload {
    Directory(Directory),
    /// Opaque file contents. Nothing in the file system interprets them.
    File(Vec<u8>),
}

/// One slot of the inode table. A slot with no payload is free.
#[derive(Debug, Clone, Default)]
pub struct Inode {
    payload: Option<Payload>,
}

impl Inode {
    pub(crate) fn free() -> Self {
        Self { payload: None }
    }

    pub fn kind(&self) -> Option<InodeKind> {
        match self.payload {
            Some(Payload::Directory(_)) => Some(InodeKind::Directory),
            Some(Payload::File(_)) => Some(InodeKind::File),
            None => None,
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.payload.is_some()
    }

    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    /// Claims a free slot for an object of `kind`. Directories start with
    /// `dir_entries` free slots.
    pub(crate) fn allocate(&mut self, kind: InodeKind, dir_entries: usize) {
        debug_assert!(!self.is_allocated());
        self.payload = Some(match kind {
            InodeKind::Directory => Payload::Directory(Directory::with_capacity(dir_entries)),
            InodeKind::File => Payload::File(Vec::new()),
        });
    }

    /// Returns the slot to the free state, dropping its payload.
    pub(crate) fn release(&mut self) -> FsResult<()> {
        match self.payload.take() {
            Some(_) => Ok(()),
            None => Err(FsError::NotFound),
        }
    }

    pub fn as_dir(&self) -> FsResult<&Directory> {
        match &self.payload {
            Some(Payload::Directory(dir)) => Ok(dir),
            Some(Payload::File(_)) => Err(FsError::NotADirectory),
            None => Err(FsError::NotFound),
        }
    }

    pub fn as_dir_mut(&mut self) -> FsResult<&mut Directory> {
        match &mut self.payload {
            Some(Payload::Directory(dir)) => Ok(dir),
            Some(Payload::File(_)) => Err(FsError::NotADirectory),
            None => Err(FsError::NotFound),
        }
    }

    pub fn contents(&self) -> Option<&[u8]> {
        match &self.payload {
            Some(Payload::File(data)) => Some(data.as_slice()),
            _ => None,
        }
    }
}
