//! Path splitting and lock-coupled traversal.
//!
//! Every traversal starts at the root and locks each inode before reading its
//! entries, holding all locks taken so far in the caller's `LockSet`. At any
//! instant the held locks form a contiguous chain from the root, so nothing on
//! the walked path can be deleted or moved underneath the walker.
//!
//! Lock order is global: top-down along the tree, and where two paths split,
//! the branch whose first divergent child has the lower inumber is locked
//! first. Every operation acquires locks in this order, which keeps concurrent
//! operations free of lock cycles.

use crate::error::{FsError, FsResult};
use crate::lock::{LockMode, LockSet};
use crate::node::Inumber;
use crate::table::InodeTable;

use log::trace;

/// Splits an absolute path into its components. Repeated and trailing slashes
/// are ignored, so `/` has no components and `//a/b/` is `["a", "b"]`.
pub fn components(path: &str) -> FsResult<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(FsError::invalid(format!(
            "path {:?} must start with \"/\"",
            path
        )));
    }
    Ok(path.split('/').filter(|part| !part.is_empty()).collect())
}

/// Splits an absolute path into its parent components and leaf name. The root
/// has no parent and is rejected.
pub fn split_parent(path: &str) -> FsResult<(Vec<&str>, &str)> {
    let mut parts = components(path)?;
    match parts.pop() {
        Some(leaf) => Ok((parts, leaf)),
        None => Err(FsError::invalid("the root directory has no parent")),
    }
}

/// Resolves `parts` from the root. Intermediate directories are read-locked and
/// the final inode is locked in `mode`.
///
/// On error the locks taken so far stay in `locks`; they are released together
/// with the rest of the set.
pub fn resolve<'a>(
    table: &'a InodeTable,
    locks: &mut LockSet<'a>,
    parts: &[&str],
    mode: LockMode,
) -> FsResult<Inumber> {
    let root_mode = if parts.is_empty() { mode } else { LockMode::Read };
    locks.push(Inumber::ROOT, table.lock(Inumber::ROOT, root_mode)?);
    walk(table, locks, Inumber::ROOT, parts, mode)
}

/// Continues a traversal below `start`, which the caller already holds.
pub fn walk<'a>(
    table: &'a InodeTable,
    locks: &mut LockSet<'a>,
    start: Inumber,
    parts: &[&str],
    mode: LockMode,
) -> FsResult<Inumber> {
    let mut current = start;
    for (depth, name) in parts.iter().enumerate() {
        let next = locks
            .get(current)?
            .as_dir()?
            .lookup(name)
            .ok_or(FsError::NotFound)?;
        let next_mode = if depth + 1 == parts.len() {
            mode
        } else {
            LockMode::Read
        };
        let guard = table.lock(next, next_mode)?;
        if !guard.is_allocated() {
            // Entries only point at live inodes while their directory is locked.
            return Err(FsError::NotFound);
        }
        locks.push(next, guard);
        trace!("resolved {:?} to inode {}", name, next);
        current = next;
    }
    Ok(current)
}

/// Write-locks the directories at `first` and `second` for an operation that
/// spans both, returning their inumbers in argument order.
///
/// The shared prefix is locked once. Below the point where the paths split,
/// the two branches are taken in ascending inumber order of the divergent
/// children. If one directory is an ancestor of the other it is write-locked
/// on the way down.
pub fn resolve_pair<'a>(
    table: &'a InodeTable,
    locks: &mut LockSet<'a>,
    first: &[&str],
    second: &[&str],
) -> FsResult<(Inumber, Inumber)> {
    if first == second {
        let node = resolve(table, locks, first, LockMode::Write)?;
        return Ok((node, node));
    }

    let shared = first
        .iter()
        .zip(second.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let fork_mode = if shared == first.len() || shared == second.len() {
        LockMode::Write
    } else {
        LockMode::Read
    };
    let fork = resolve(table, locks, &first[..shared], fork_mode)?;

    if shared == first.len() {
        let other = walk(table, locks, fork, &second[shared..], LockMode::Write)?;
        return Ok((fork, other));
    }
    if shared == second.len() {
        let other = walk(table, locks, fork, &first[shared..], LockMode::Write)?;
        return Ok((other, fork));
    }

    let (first_child, second_child) = {
        let dir = locks.get(fork)?.as_dir()?;
        (
            dir.lookup(first[shared]).ok_or(FsError::NotFound)?,
            dir.lookup(second[shared]).ok_or(FsError::NotFound)?,
        )
    };
    if first_child < second_child {
        let a = walk(table, locks, fork, &first[shared..], LockMode::Write)?;
        let b = walk(table, locks, fork, &second[shared..], LockMode::Write)?;
        Ok((a, b))
    } else {
        let b = walk(table, locks, fork, &second[shared..], LockMode::Write)?;
        let a = walk(table, locks, fork, &first[shared..], LockMode::Write)?;
        Ok((a, b))
    }
}
