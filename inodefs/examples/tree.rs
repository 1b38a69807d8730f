use std::io;

use inodefs::{FileSystem, FsConfig, InodeKind};

pub fn main() {
    let config = FsConfig::builder()
        .with_inode_table_size(16)
        .with_max_dir_entries(8)
        .build()
        .expect("invalid configuration");
    let fs = FileSystem::new(config).expect("should create");

    // Build a small tree, then move a file out of its directory.
    fs.create("/a", InodeKind::File).unwrap();
    fs.create("/d", InodeKind::Directory).unwrap();
    fs.create("/d/b", InodeKind::File).unwrap();
    fs.move_path("/d/b", "/c").unwrap();

    fs.print_tree(&mut io::stdout().lock()).unwrap();
}
