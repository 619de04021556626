//! Persistence of node state between runs.

pub mod file;
pub mod frame;

use anyhow::{Context, Result};
use castflow_grid::nbt::GridSnapshot;

pub use file::FileStore;

pub trait StateStore {
    fn save_snapshot(&self, snapshot: &GridSnapshot) -> Result<()>;
    /// `None` if nothing was saved yet.
    fn load_snapshot(&self) -> Result<Option<GridSnapshot>>;
}

/// Serializes a snapshot to NBT and frames it.
pub fn encode(snapshot: &GridSnapshot) -> Result<(Vec<u8>, usize)> {
    let nbt = fastnbt::to_bytes(snapshot).context("Failed to serialize state NBT")?;
    let raw_len = nbt.len();
    Ok((frame::wrap(&nbt)?, raw_len))
}

pub fn decode(framed: &[u8]) -> Result<GridSnapshot> {
    let nbt = frame::unwrap(framed)?;
    fastnbt::from_bytes(&nbt).context("Failed to parse state NBT")
}
