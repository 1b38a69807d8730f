use crate::error::{FsError, FsResult};
use crate::node::Inumber;

use zerocopy::{AsBytes, FromBytes, FromZeroes};

/// Marks an unused entry slot. Never a valid inumber: table sizes are capped
/// below it.
pub const FREE_INODE: u32 = u32::MAX;

/// Longest entry name in bytes. Directory entries are fixed size records so the
/// name lives inline.
pub const MAX_NAME_LEN: usize = 98;

/// Size of one `DirEntry` record in bytes.
pub const DIR_ENTRY_SIZE: usize = 104;

// The derives only hold for a padding-free record.
const _: () = assert!(std::mem::size_of::<DirEntry>() == DIR_ENTRY_SIZE);

#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Copy, Clone)]
/// A single `(name, inumber)` slot of a directory. This structure is exactly
/// 104 bytes with no padding.
pub struct DirEntry {
    /// Target inode, or `FREE_INODE` when the slot is unused.
    inumber: u32,
    /// Number of meaningful bytes in `name`.
    name_len: u16,
    name: [u8; MAX_NAME_LEN],
}

impl DirEntry {
    fn free() -> Self {
        let mut entry = DirEntry::new_zeroed();
        entry.inumber = FREE_INODE;
        entry
    }

    fn is_free(&self) -> bool {
        self.inumber == FREE_INODE
    }

    fn set(&mut self, name: &str, inumber: Inumber) {
        let bytes = name.as_bytes();
        self.name = [0; MAX_NAME_LEN];
        self.name[..bytes.len()].copy_from_slice(bytes);
        self.name_len = bytes.len() as u16;
        self.inumber = inumber.raw();
    }

    fn clear(&mut self) {
        self.as_bytes_mut().fill(0);
        self.inumber = FREE_INODE;
    }

    /// The entry name. Names only ever enter through `&str` so the bytes are
    /// valid UTF-8.
    pub fn name(&self) -> &str {
        std::str::from_utf8(&self.name[..self.name_len as usize]).unwrap_or_default()
    }

    pub fn inumber(&self) -> Inumber {
        Inumber::from_raw(self.inumber)
    }
}

impl std::fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_free() {
            return f.write_str("DirEntry(free)");
        }
        f.debug_struct("DirEntry")
            .field("name", &self.name())
            .field("inumber", &self.inumber)
            .finish()
    }
}

/// An entry taken out of a directory together with the slot it occupied, so
/// that a failed multi-step update can put it back exactly where it was.
#[derive(Debug, Clone, Copy)]
pub struct RemovedEntry {
    slot: usize,
    entry: DirEntry,
}

impl RemovedEntry {
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    pub fn inumber(&self) -> Inumber {
        self.entry.inumber()
    }
}

/// Checks a single path component for use as an entry name.
pub fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() {
        return Err(FsError::invalid("entry name must be non-empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(FsError::invalid(format!(
            "entry name exceeds {} bytes",
            MAX_NAME_LEN
        )));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(FsError::invalid(format!(
            "entry name {:?} contains a reserved character",
            name
        )));
    }
    Ok(())
}

/// The fixed-capacity child list of a directory inode.
///
/// None of these operations lock anything: callers reach a `Directory` through
/// a guard on its inode, read mode for lookups and write mode for updates.
#[derive(Debug, Clone)]
pub struct Directory {
    entries: Box<[DirEntry]>,
}

impl Directory {
    /// Creates a directory with `capacity` slots, all free.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: vec![DirEntry::free(); capacity].into_boxed_slice(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over populated entries in slot order.
    pub fn entries(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|e| !e.is_free())
    }

    pub fn len(&self) -> usize {
        self.entries().count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(DirEntry::is_free)
    }

    /// Finds the inode bound to `name`. Names are unique within a directory so
    /// the first match is the only one.
    pub fn lookup(&self, name: &str) -> Option<Inumber> {
        self.entries()
            .find(|e| e.name() == name)
            .map(DirEntry::inumber)
    }

    /// Binds `name` to `child` in the first free slot.
    pub fn add_entry(&mut self, name: &str, child: Inumber) -> FsResult<()> {
        validate_name(name)?;
        if self.lookup(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        let slot = self
            .entries
            .iter_mut()
            .find(|e| e.is_free())
            .ok_or(FsError::DirectoryFull)?;
        slot.set(name, child);
        Ok(())
    }

    /// Clears the entry pointing at `child`. Entries are matched by inumber, not
    /// by name.
    pub fn remove_entry(&mut self, child: Inumber) -> FsResult<RemovedEntry> {
        let slot = self
            .entries
            .iter()
            .position(|e| !e.is_free() && e.inumber() == child)
            .ok_or(FsError::NotFound)?;
        let entry = self.entries[slot];
        self.entries[slot].clear();
        Ok(RemovedEntry { slot, entry })
    }

    /// Puts a previously removed entry back into its original slot.
    pub fn restore_entry(&mut self, removed: RemovedEntry) -> FsResult<()> {
        match self.entries.get_mut(removed.slot) {
            Some(slot) if slot.is_free() => {
                *slot = removed.entry;
                Ok(())
            }
            _ => Err(FsError::invalid(format!(
                "slot {} is no longer free",
                removed.slot
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ino(n: u32) -> Inumber {
        Inumber::from_raw(n)
    }

    #[test]
    fn entry_record_has_no_padding() {
        assert_eq!(DirEntry::free().as_bytes().len(), DIR_ENTRY_SIZE);

        let mut entry = DirEntry::free();
        entry.set("name", Inumber::from_raw(3));
        entry.clear();
        assert!(entry.is_free());
        assert_eq!(&entry.as_bytes()[4..], &[0u8; DIR_ENTRY_SIZE - 4][..]);
    }

    #[test]
    fn new_directory_is_empty() {
        let dir = Directory::with_capacity(4);
        assert!(dir.is_empty());
        assert_eq!(dir.capacity(), 4);
        assert_eq!(dir.lookup("a"), None);
    }

    #[test]
    fn can_add_and_lookup_entries() {
        let mut dir = Directory::with_capacity(4);
        dir.add_entry("a", ino(1)).unwrap();
        dir.add_entry("b", ino(2)).unwrap();

        assert_eq!(dir.lookup("a"), Some(ino(1)));
        assert_eq!(dir.lookup("b"), Some(ino(2)));
        assert_eq!(dir.lookup("c"), None);
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut dir = Directory::with_capacity(4);
        dir.add_entry("a", ino(1)).unwrap();
        match dir.add_entry("a", ino(2)) {
            Err(FsError::AlreadyExists) => (),
            other => panic!("expected AlreadyExists, got {:?}", other),
        }
    }

    #[test]
    fn full_directory_rejects_new_entries() {
        let mut dir = Directory::with_capacity(2);
        dir.add_entry("a", ino(1)).unwrap();
        dir.add_entry("b", ino(2)).unwrap();
        match dir.add_entry("c", ino(3)) {
            Err(FsError::DirectoryFull) => (),
            other => panic!("expected DirectoryFull, got {:?}", other),
        }
    }

    #[test]
    fn invalid_names_are_rejected() {
        let mut dir = Directory::with_capacity(2);
        assert!(dir.add_entry("", ino(1)).is_err());
        assert!(dir.add_entry("a/b", ino(1)).is_err());
        assert!(dir.add_entry(&"x".repeat(MAX_NAME_LEN + 1), ino(1)).is_err());
        dir.add_entry(&"x".repeat(MAX_NAME_LEN), ino(1)).unwrap();
    }

    #[test]
    fn removal_matches_by_inumber_and_frees_slot() {
        let mut dir = Directory::with_capacity(1);
        dir.add_entry("a", ino(7)).unwrap();

        match dir.remove_entry(ino(8)) {
            Err(FsError::NotFound) => (),
            other => panic!("expected NotFound, got {:?}", other),
        }

        let removed = dir.remove_entry(ino(7)).unwrap();
        assert_eq!(removed.name(), "a");
        assert!(dir.is_empty());
        // The slot can be reused.
        dir.add_entry("b", ino(9)).unwrap();
    }

    #[test]
    fn restore_puts_entry_back_in_its_slot() {
        let mut dir = Directory::with_capacity(3);
        dir.add_entry("a", ino(1)).unwrap();
        dir.add_entry("b", ino(2)).unwrap();
        dir.add_entry("c", ino(3)).unwrap();

        let removed = dir.remove_entry(ino(2)).unwrap();
        dir.restore_entry(removed).unwrap();

        let names: Vec<&str> = dir.entries().map(DirEntry::name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn restore_into_reused_slot_fails() {
        let mut dir = Directory::with_capacity(1);
        dir.add_entry("a", ino(1)).unwrap();
        let removed = dir.remove_entry(ino(1)).unwrap();
        dir.add_entry("b", ino(2)).unwrap();
        assert!(dir.restore_entry(removed).is_err());
    }
}
