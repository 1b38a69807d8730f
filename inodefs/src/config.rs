use crate::dir::FREE_INODE;
use crate::error::{FsError, FsResult};

const DEFAULT_INODE_TABLE_SIZE: usize = 50;
const DEFAULT_MAX_DIR_ENTRIES: usize = 20;

/// Sizing of an in-memory file system. Both limits are fixed for the lifetime
/// of the table: neither the table nor a directory's entry array ever grows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FsConfig {
    /// Total number of inode slots, root included.
    pub inode_table_size: usize,
    /// Number of entry slots allocated for every directory.
    pub max_dir_entries: usize,
    /// Busy-wait iterations inserted at the start of every table operation. Only
    /// useful for widening race windows in stress tests, zero disables it.
    pub delay_cycles: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            inode_table_size: DEFAULT_INODE_TABLE_SIZE,
            max_dir_entries: DEFAULT_MAX_DIR_ENTRIES,
            delay_cycles: 0,
        }
    }
}

impl FsConfig {
    pub fn builder() -> FsConfigBuilder {
        FsConfigBuilder {
            config: FsConfig::default(),
        }
    }

    /// Checks the limits a table can be built with.
    pub fn validate(&self) -> FsResult<()> {
        if self.inode_table_size == 0 {
            return Err(FsError::invalid("inode table must hold at least the root"));
        }
        // Every valid inumber must stay distinct from the free entry marker.
        if self.inode_table_size as u64 >= u64::from(FREE_INODE) {
            return Err(FsError::invalid(format!(
                "inode table size {} collides with the free entry marker",
                self.inode_table_size
            )));
        }
        if self.max_dir_entries == 0 {
            return Err(FsError::invalid("directories need at least one entry slot"));
        }
        Ok(())
    }
}

pub struct FsConfigBuilder {
    config: FsConfig,
}

impl FsConfigBuilder {
    /// Sets the number of inode slots in the table.
    pub fn with_inode_table_size(mut self, slots: usize) -> Self {
        self.config.inode_table_size = slots;
        self
    }

    /// Sets the per-directory entry capacity.
    pub fn with_max_dir_entries(mut self, entries: usize) -> Self {
        self.config.max_dir_entries = entries;
        self
    }

    pub fn with_delay_cycles(mut self, cycles: usize) -> Self {
        self.config.delay_cycles = cycles;
        self
    }

    pub fn build(self) -> FsResult<FsConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
