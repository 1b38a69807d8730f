//! An in-memory hierarchical file system built on a fixed-size inode table.
//!
//! Every inode carries its own reader/writer lock. Path operations lock the
//! inodes they walk through from the root down and release them in reverse,
//! so operations on disjoint subtrees proceed in parallel.
//!
//! ```
//! use inodefs::{FileSystem, FsConfig, InodeKind};
//!
//! let fs = FileSystem::new(FsConfig::default()).unwrap();
//! fs.create("/d", InodeKind::Directory).unwrap();
//! fs.create("/d/b", InodeKind::File).unwrap();
//! fs.move_path("/d/b", "/c").unwrap();
//!
//! let mut out = Vec::new();
//! fs.print_tree(&mut out).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "/\n/d\n/c\n");
//! ```

mod config;
mod dir;
mod error;
mod fs;
mod lock;
mod node;
pub mod path;
mod table;
mod tree;

pub use crate::config::{FsConfig, FsConfigBuilder};
pub use crate::dir::{DirEntry, Directory, RemovedEntry, DIR_ENTRY_SIZE, FREE_INODE, MAX_NAME_LEN};
pub use crate::error::{FsError, FsResult};
pub use crate::fs::FileSystem;
pub use crate::lock::{InodeGuard, LockMode, LockSet};
pub use crate::node::{Inode, InodeKind, Inumber, Payload};
pub use crate::table::InodeTable;
