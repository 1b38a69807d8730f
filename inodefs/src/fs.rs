use crate::config::FsConfig;
use crate::dir::validate_name;
use crate::error::{FsError, FsResult};
use crate::lock::{LockMode, LockSet};
use crate::node::{InodeKind, Inumber};
use crate::path::{components, resolve, resolve_pair, split_parent};
use crate::table::InodeTable;
use crate::tree;

use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// An in-memory hierarchical file system over a fixed-size inode table.
///
/// All operations take `&self` and may run from many threads at once. There is
/// no file system wide lock: each operation locks the inodes on its paths, in
/// the order described in [`crate::path`], and releases them newest first when
/// it returns.
pub struct FileSystem {
    table: InodeTable,
}

impl FileSystem {
    /// Initializes an empty file system holding only the root directory.
    pub fn new(config: FsConfig) -> FsResult<Self> {
        config.validate()?;
        let table = InodeTable::new(config);
        let root = table.allocate(InodeKind::Directory)?.0;
        debug_assert_eq!(root, Inumber::ROOT);
        info!(
            "initialized file system with {} inodes, {} entries per directory",
            config.inode_table_size, config.max_dir_entries
        );
        Ok(FileSystem { table })
    }

    pub fn table(&self) -> &InodeTable {
        &self.table
    }

    /// Creates a file or directory at `path`. The parent must exist and must not
    /// already hold the leaf name.
    pub fn create(&self, path: &str, kind: InodeKind) -> FsResult<Inumber> {
        let (parent_parts, name) = split_parent(path)?;
        validate_name(name)?;

        let mut locks = LockSet::new();
        let parent = resolve(&self.table, &mut locks, &parent_parts, LockMode::Write)?;
        let dir = locks.get(parent)?.as_dir()?;
        if dir.lookup(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        // The parent stays write-locked, so no slot can open up before add_entry.
        if dir.len() == dir.capacity() {
            return Err(FsError::DirectoryFull);
        }

        let (child, guard) = self.table.allocate(kind)?;
        locks.push(child, guard);
        if let Err(err) = self.table.add_entry(&mut locks, parent, child, name) {
            self.table.free(&mut locks, child)?;
            return Err(err);
        }
        info!("created {:?} {} as inode {}", kind, path, child);
        Ok(child)
    }

    /// Deletes the file or empty directory at `path`.
    pub fn delete(&self, path: &str) -> FsResult<()> {
        let (parent_parts, name) = split_parent(path)?;

        let mut locks = LockSet::new();
        let parent = resolve(&self.table, &mut locks, &parent_parts, LockMode::Write)?;
        let child = locks
            .get(parent)?
            .as_dir()?
            .lookup(name)
            .ok_or(FsError::NotFound)?;
        locks.push(child, self.table.lock(child, LockMode::Write)?);

        if let Some(InodeKind::Directory) = locks.get(child)?.kind() {
            if !locks.get(child)?.as_dir()?.is_empty() {
                return Err(FsError::DirectoryNotEmpty);
            }
        }

        self.table.reset_entry(&mut locks, parent, child)?;
        self.table.free(&mut locks, child)?;
        info!("deleted {} (inode {})", path, child);
        Ok(())
    }

    /// Resolves `path`, leaving every lock taken on the way in `locks`. The
    /// target is locked in `mode`, its ancestors for reading.
    ///
    /// The caller decides when to release: dropping `locks`, or calling
    /// [`LockSet::unlock_all`], unwinds them newest first.
    pub fn lookup<'a>(
        &'a self,
        path: &str,
        mode: LockMode,
        locks: &mut LockSet<'a>,
    ) -> FsResult<Inumber> {
        let parts = components(path)?;
        resolve(&self.table, locks, &parts, mode)
    }

    /// Resolves `path` and releases the locks straight away.
    pub fn lookup_inumber(&self, path: &str) -> FsResult<Inumber> {
        let mut locks = LockSet::new();
        self.lookup(path, LockMode::Read, &mut locks)
    }

    /// Moves the entry at `old_path` to `new_path`. The inode keeps its
    /// inumber, only the two directory tables change.
    ///
    /// Either both tables are updated or neither is: if the new entry cannot be
    /// added, the old one is restored before the error is returned.
    pub fn move_path(&self, old_path: &str, new_path: &str) -> FsResult<()> {
        let (old_parts, old_name) = split_parent(old_path)?;
        let (new_parts, new_name) = split_parent(new_path)?;
        validate_name(new_name)?;

        let old_full = components(old_path)?;
        let new_full = components(new_path)?;
        if new_full.len() > old_full.len() && new_full.starts_with(&old_full) {
            return Err(FsError::invalid(format!(
                "cannot move {} into its own subtree",
                old_path
            )));
        }

        let mut locks = LockSet::new();
        let (old_parent, new_parent) =
            resolve_pair(&self.table, &mut locks, &old_parts, &new_parts)?;
        let child = locks
            .get(old_parent)?
            .as_dir()?
            .lookup(old_name)
            .ok_or(FsError::NotFound)?;
        if locks.get(new_parent)?.kind() != Some(InodeKind::Directory) {
            return Err(FsError::NotADirectory);
        }
        if old_parent == new_parent && old_name == new_name {
            return Ok(());
        }

        let removed = self.table.reset_entry(&mut locks, old_parent, child)?;
        if let Err(err) = self.table.add_entry(&mut locks, new_parent, child, new_name) {
            debug!("move of {} failed ({}), restoring entry", old_path, err);
            self.table.restore_entry(&mut locks, old_parent, removed)?;
            return Err(err);
        }
        info!("moved {} to {} (inode {})", old_path, new_path, child);
        Ok(())
    }

    /// Writes every reachable path, one per line, in pre-order.
    pub fn print_tree<W: Write>(&self, out: &mut W) -> FsResult<()> {
        tree::print_tree(&self.table, out)
    }

    /// Writes the tree into a newly created file at `dest`.
    pub fn print_tree_to_file<P: AsRef<Path>>(&self, dest: P) -> FsResult<()> {
        let mut out = BufWriter::new(File::create(dest)?);
        self.print_tree(&mut out)?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_fs(inodes: usize, entries: usize) -> FileSystem {
        let config = FsConfig::builder()
            .with_inode_table_size(inodes)
            .with_max_dir_entries(entries)
            .build()
            .unwrap();
        FileSystem::new(config).unwrap()
    }

    #[test]
    fn root_dir_resolves_to_root_inumber() {
        let fs = small_fs(4, 4);
        assert_eq!(fs.lookup_inumber("/").unwrap(), Inumber::ROOT);
    }

    #[test]
    fn missing_file_is_not_found() {
        let fs = small_fs(4, 4);
        match fs.lookup_inumber("/foo") {
            Err(FsError::NotFound) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn created_file_gets_next_inumber() {
        let fs = small_fs(4, 4);
        assert_eq!(fs.create("/foo", InodeKind::File).unwrap(), Inumber::from_raw(1));
        assert_eq!(fs.lookup_inumber("/foo").unwrap(), Inumber::from_raw(1));
    }

    #[test]
    fn create_rejects_duplicates_without_allocating() {
        let fs = small_fs(4, 4);
        fs.create("/foo", InodeKind::File).unwrap();
        match fs.create("/foo", InodeKind::Directory) {
            Err(FsError::AlreadyExists) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fs.table().allocated_count().unwrap(), 2);
    }

    #[test]
    fn create_under_file_fails() {
        let fs = small_fs(4, 4);
        fs.create("/foo", InodeKind::File).unwrap();
        match fs.create("/foo/bar", InodeKind::File) {
            Err(FsError::NotADirectory) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn full_directory_releases_new_inode() {
        let fs = small_fs(4, 1);
        fs.create("/a", InodeKind::File).unwrap();
        match fs.create("/b", InodeKind::File) {
            Err(FsError::DirectoryFull) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(fs.table().allocated_count().unwrap(), 2);
    }

    #[test]
    fn full_directory_is_reported_before_a_full_table() {
        let fs = small_fs(2, 1);
        fs.create("/a", InodeKind::File).unwrap();
        match fs.create("/b", InodeKind::File) {
            Err(FsError::DirectoryFull) => (),
            other => panic!("expected DirectoryFull, got {:?}", other),
        }
        assert_eq!(fs.table().allocated_count().unwrap(), 2);
    }

    #[test]
    fn root_cannot_be_deleted_or_moved() {
        let fs = small_fs(4, 4);
        assert!(fs.delete("/").is_err());
        assert!(fs.move_path("/", "/x").is_err());
        assert!(fs.create("/", InodeKind::Directory).is_err());
    }

    #[test]
    fn lookup_leaves_locks_for_the_caller() {
        let fs = small_fs(4, 4);
        let d = fs.create("/d", InodeKind::Directory).unwrap();

        let mut locks = LockSet::new();
        assert_eq!(fs.lookup("/d", LockMode::Write, &mut locks).unwrap(), d);
        assert_eq!(locks.inumbers(), vec![Inumber::ROOT, d]);
        assert_eq!(locks.mode_of(d), Some(LockMode::Write));
        locks.unlock_all();

        fs.delete("/d").unwrap();
    }

    #[test]
    fn delete_missing_entry_fails() {
        let fs = small_fs(4, 4);
        match fs.delete("/nope") {
            Err(FsError::NotFound) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn move_within_directory_renames() {
        let fs = small_fs(4, 4);
        let a = fs.create("/a", InodeKind::File).unwrap();
        fs.move_path("/a", "/b").unwrap();
        assert_eq!(fs.lookup_inumber("/b").unwrap(), a);
        assert!(fs.lookup_inumber("/a").is_err());
    }

    #[test]
    fn move_onto_itself_is_a_no_op() {
        let fs = small_fs(4, 4);
        let a = fs.create("/a", InodeKind::File).unwrap();
        fs.move_path("/a", "/a").unwrap();
        assert_eq!(fs.lookup_inumber("/a").unwrap(), a);
    }

    #[test]
    fn move_into_own_subtree_fails() {
        let fs = small_fs(4, 4);
        fs.create("/d", InodeKind::Directory).unwrap();
        fs.create("/d/e", InodeKind::Directory).unwrap();
        match fs.move_path("/d", "/d/e/d") {
            Err(FsError::InvalidArgument(_)) => (),
            other => panic!("unexpected {:?}", other),
        }
        assert!(fs.lookup_inumber("/d/e").is_ok());
    }

    #[test]
    fn move_to_ancestor_directory() {
        let fs = small_fs(6, 4);
        fs.create("/d", InodeKind::Directory).unwrap();
        fs.create("/d/e", InodeKind::Directory).unwrap();
        let f = fs.create("/d/e/f", InodeKind::File).unwrap();

        fs.move_path("/d/e/f", "/f").unwrap();
        assert_eq!(fs.lookup_inumber("/f").unwrap(), f);
        fs.move_path("/f", "/d/e/g").unwrap();
        assert_eq!(fs.lookup_inumber("/d/e/g").unwrap(), f);
    }
}
