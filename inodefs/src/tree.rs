use crate::error::FsResult;
use crate::lock::LockMode;
use crate::node::{Inode, Inumber};
use crate::table::InodeTable;

use std::io::Write;

/// Writes the full path of every reachable inode in pre-order, one per line,
/// starting with `/`.
///
/// Each visited inode is read-locked while its parent's read lock is still
/// held. This gives a consistent view of every subtree while it is printed and
/// keeps freed inodes from being visited. Writers on the visited path wait for
/// the print to move past them.
pub fn print_tree<W: Write>(table: &InodeTable, out: &mut W) -> FsResult<()> {
    let root = table.lock(Inumber::ROOT, LockMode::Read)?;
    visit(table, &root, "", out)
}

fn visit<W: Write>(table: &InodeTable, node: &Inode, path: &str, out: &mut W) -> FsResult<()> {
    writeln!(out, "{}", if path.is_empty() { "/" } else { path })?;

    if let Ok(dir) = node.as_dir() {
        for entry in dir.entries() {
            let child_path = format!("{}/{}", path, entry.name());
            let child = table.lock(entry.inumber(), LockMode::Read)?;
            visit(table, &child, &child_path, out)?;
        }
    }
    Ok(())
}
