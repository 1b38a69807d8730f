use crate::error::{FsError, FsResult};
use crate::node::{Inode, Inumber};

use log::trace;
use std::ops::Deref;
use std::sync::{RwLockReadGuard, RwLockWriteGuard};

/// How an inode is locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// Shared access, any number of readers.
    Read,
    /// Exclusive access, required to change the inode.
    Write,
}

/// A held lock on a single inode.
pub enum InodeGuard<'a> {
    Read(RwLockReadGuard<'a, Inode>),
    Write(RwLockWriteGuard<'a, Inode>),
}

impl<'a> InodeGuard<'a> {
    pub fn mode(&self) -> LockMode {
        match self {
            InodeGuard::Read(_) => LockMode::Read,
            InodeGuard::Write(_) => LockMode::Write,
        }
    }
}

impl<'a> Deref for InodeGuard<'a> {
    type Target = Inode;

    fn deref(&self) -> &Inode {
        match self {
            InodeGuard::Read(guard) => &**guard,
            InodeGuard::Write(guard) => &**guard,
        }
    }
}

/// The locks taken by one operation, in acquisition order.
///
/// Locks are always released newest first: explicitly through `unlock_all`, or
/// when the set is dropped. Composite operations keep extending the same set
/// (a parent directory, then a child inside it) and the whole stack unwinds
/// together, including on early error returns.
#[derive(Default)]
pub struct LockSet<'a> {
    held: Vec<(Inumber, InodeGuard<'a>)>,
}

impl<'a> LockSet<'a> {
    pub fn new() -> Self {
        Self { held: Vec::new() }
    }

    pub(crate) fn push(&mut self, inumber: Inumber, guard: InodeGuard<'a>) {
        trace!("locked inode {} ({:?})", inumber, guard.mode());
        self.held.push((inumber, guard));
    }

    pub fn len(&self) -> usize {
        self.held.len()
    }

    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// The held inumbers, oldest first.
    pub fn inumbers(&self) -> Vec<Inumber> {
        self.held.iter().map(|(i, _)| *i).collect()
    }

    /// The mode `inumber` is held in, if it is held at all.
    pub fn mode_of(&self, inumber: Inumber) -> Option<LockMode> {
        self.find(inumber).map(|idx| self.held[idx].1.mode())
    }

    fn find(&self, inumber: Inumber) -> Option<usize> {
        self.held.iter().rposition(|(i, _)| *i == inumber)
    }

    /// Borrows a held inode.
    pub fn get(&self, inumber: Inumber) -> FsResult<&Inode> {
        self.find(inumber)
            .map(|idx| &*self.held[idx].1)
            .ok_or_else(|| FsError::invalid(format!("inode {} is not locked", inumber)))
    }

    /// Borrows a held inode for modification. Only write-locked inodes can be
    /// modified.
    pub fn get_mut(&mut self, inumber: Inumber) -> FsResult<&mut Inode> {
        let idx = self
            .find(inumber)
            .ok_or_else(|| FsError::invalid(format!("inode {} is not locked", inumber)))?;
        match &mut self.held[idx].1 {
            InodeGuard::Write(guard) => Ok(&mut **guard),
            InodeGuard::Read(_) => Err(FsError::invalid(format!(
                "inode {} is only read-locked",
                inumber
            ))),
        }
    }

    /// Releases the most recently acquired lock.
    pub fn unlock(&mut self) -> Option<Inumber> {
        self.held.pop().map(|(inumber, guard)| {
            drop(guard);
            trace!("unlocked inode {}", inumber);
            inumber
        })
    }

    /// Releases every held lock, newest first.
    pub fn unlock_all(&mut self) {
        while self.unlock().is_some() {}
    }
}

impl<'a> Drop for LockSet<'a> {
    fn drop(&mut self) {
        self.unlock_all();
    }
}
