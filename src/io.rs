//! Disk persistence for item buffers
//!
//! Files hold the exported root item and nothing else; endianness comes from
//! the config on load.

use crate::config::ManagerConfig;
use crate::error::Result;
use crate::manager::ItemManager;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

impl ItemManager {
    /// Write the root item to `path`, replacing any existing file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(self.as_bytes())?;
        file.sync_all()?;
        debug!(
            "Saved {} bytes to {}",
            self.as_bytes().len(),
            path.as_ref().display()
        );
        Ok(())
    }

    /// Read and validate a buffer previously written by [`save_to_file`](Self::save_to_file)
    pub fn load_from_file<P: AsRef<Path>>(path: P, config: ManagerConfig) -> Result<Self> {
        let mut file = File::open(&path)?;
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        debug!("Read {} bytes from {}", bytes.len(), path.as_ref().display());
        Self::load(&bytes, config)
    }
}
