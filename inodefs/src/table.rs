use crate::config::FsConfig;
use crate::dir::RemovedEntry;
use crate::error::{FsError, FsResult};
use crate::lock::{InodeGuard, LockMode, LockSet};
use crate::node::{Inode, InodeKind, Inumber};

use log::{debug, error, warn};
use std::sync::{RwLock, TryLockError};

/// A fixed-capacity arena of inodes, each behind its own reader/writer lock.
///
/// Inumbers are checked against the arena bounds here and nowhere else. Slot
/// contents are only reachable through a lock, so liveness checks happen on the
/// guards handed out by `lock` and `allocate`.
pub struct InodeTable {
    slots: Box<[RwLock<Inode>]>,
    config: FsConfig,
}

impl InodeTable {
    /// Builds a table with every slot free.
    pub fn new(config: FsConfig) -> Self {
        let slots = (0..config.inode_table_size)
            .map(|_| RwLock::new(Inode::free()))
            .collect();
        Self { slots, config }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn config(&self) -> &FsConfig {
        &self.config
    }

    fn slot(&self, inumber: Inumber) -> FsResult<&RwLock<Inode>> {
        self.slots.get(inumber.index()).ok_or_else(|| {
            warn!("inumber {} out of range", inumber);
            FsError::invalid(format!("inumber {} out of range", inumber))
        })
    }

    /// Burns `delay_cycles` iterations. Used to widen race windows in stress runs.
    fn insert_delay(&self) {
        for _ in 0..self.config.delay_cycles {
            std::hint::spin_loop();
        }
    }

    /// Blocks until `inumber` is locked in `mode`.
    pub fn lock(&self, inumber: Inumber, mode: LockMode) -> FsResult<InodeGuard<'_>> {
        let slot = self.slot(inumber)?;
        let guard = match mode {
            LockMode::Read => slot.read().map(InodeGuard::Read).map_err(|_| ()),
            LockMode::Write => slot.write().map(InodeGuard::Write).map_err(|_| ()),
        };
        guard.map_err(|()| {
            error!("lock on inode {} is poisoned", inumber);
            FsError::LockPoisoned(inumber)
        })
    }

    /// Claims the first free slot for a new object of `kind`.
    ///
    /// Slots are probed with a non-blocking write lock so a scan never waits
    /// behind users of occupied inodes, it just moves past them. The claimed slot
    /// is returned still write-locked; every rejected slot is unlocked before the
    /// scan moves on.
    pub fn allocate(&self, kind: InodeKind) -> FsResult<(Inumber, InodeGuard<'_>)> {
        self.insert_delay();

        for (idx, slot) in self.slots.iter().enumerate() {
            let inumber = Inumber::from_raw(idx as u32);
            match slot.try_write() {
                Ok(mut node) => {
                    if node.is_allocated() {
                        continue;
                    }
                    node.allocate(kind, self.config.max_dir_entries);
                    debug!("allocated inode {} as {:?}", inumber, kind);
                    return Ok((inumber, InodeGuard::Write(node)));
                }
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => {
                    error!("lock on inode {} is poisoned", inumber);
                    return Err(FsError::LockPoisoned(inumber));
                }
            }
        }
        Err(FsError::TableFull)
    }

    /// Frees a write-locked inode, dropping its payload.
    pub fn free(&self, locks: &mut LockSet<'_>, inumber: Inumber) -> FsResult<()> {
        self.insert_delay();
        self.slot(inumber)?;

        locks.get_mut(inumber)?.release().map_err(|err| {
            warn!("free: inode {} is not allocated", inumber);
            err
        })?;
        debug!("freed inode {}", inumber);
        Ok(())
    }

    /// Returns a copy of the inode's current state.
    ///
    /// Takes a read lock internally: the calling thread must not already hold a
    /// write lock on `inumber`.
    pub fn read(&self, inumber: Inumber) -> FsResult<Inode> {
        self.insert_delay();

        let node = self.lock(inumber, LockMode::Read)?;
        if !node.is_allocated() {
            warn!("read: inode {} is not allocated", inumber);
            return Err(FsError::NotFound);
        }
        Ok(node.clone())
    }

    /// Adds `name -> child` to the write-locked directory `parent`.
    ///
    /// `child` must be allocated. When the caller holds its lock this is checked
    /// on the guard; otherwise the caller found it through a locked directory,
    /// which keeps it from being freed.
    pub fn add_entry(
        &self,
        locks: &mut LockSet<'_>,
        parent: Inumber,
        child: Inumber,
        name: &str,
    ) -> FsResult<()> {
        self.insert_delay();
        self.slot(parent)?;
        self.slot(child)?;

        if locks.mode_of(child).is_some() && !locks.get(child)?.is_allocated() {
            warn!("add_entry: inode {} is not allocated", child);
            return Err(FsError::NotFound);
        }
        locks.get_mut(parent)?.as_dir_mut()?.add_entry(name, child)
    }

    /// Clears the entry of `child` in the write-locked directory `parent`.
    pub fn reset_entry(
        &self,
        locks: &mut LockSet<'_>,
        parent: Inumber,
        child: Inumber,
    ) -> FsResult<RemovedEntry> {
        self.insert_delay();
        self.slot(parent)?;
        self.slot(child)?;

        locks.get_mut(parent)?.as_dir_mut()?.remove_entry(child)
    }

    /// Undoes a `reset_entry` on the same, still write-locked, directory.
    pub fn restore_entry(
        &self,
        locks: &mut LockSet<'_>,
        parent: Inumber,
        removed: RemovedEntry,
    ) -> FsResult<()> {
        self.insert_delay();

        locks.get_mut(parent)?.as_dir_mut()?.restore_entry(removed)
    }

    /// Counts allocated slots. Blocks on every slot, so it must not be called
    /// while holding any inode lock.
    pub fn allocated_count(&self) -> FsResult<usize> {
        let mut count = 0;
        for idx in 0..self.slots.len() {
            let inumber = Inumber::from_raw(idx as u32);
            if self.lock(inumber, LockMode::Read)?.is_allocated() {
                count += 1;
            }
        }
        Ok(count)
    }
}
