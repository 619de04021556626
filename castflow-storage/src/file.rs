use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use castflow_benchmark::RoutingMetrics;
use castflow_grid::nbt::GridSnapshot;
use log::debug;

use crate::{StateStore, decode, encode};

/// Stores the state in a single file, replaced atomically on save.
pub struct FileStore {
    path: PathBuf,
    metrics: Option<Arc<RoutingMetrics>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<RoutingMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for FileStore {
    fn save_snapshot(&self, snapshot: &GridSnapshot) -> Result<()> {
        let start = Instant::now();
        let (framed, raw_len) = encode(snapshot)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &framed)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        if let Some(metrics) = &self.metrics {
            metrics.record_save(start.elapsed());
            metrics.record_state_sizes(raw_len, framed.len());
        }
        debug!(
            "Saved state to {} ({} -> {} bytes)",
            self.path.display(),
            raw_len,
            framed.len()
        );
        Ok(())
    }

    fn load_snapshot(&self) -> Result<Option<GridSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let start = Instant::now();
        let framed = fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let snapshot = decode(&framed)
            .with_context(|| format!("Corrupt state file {}", self.path.display()))?;

        if let Some(metrics) = &self.metrics {
            metrics.record_load(start.elapsed());
        }
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use castflow_grid::{
        Block, Crucible, Direction, FlowLink, FlowWorld, FluidId, FluidStack, Grid, MoldItem,
        MoldTable, Position,
    };
    use std::sync::atomic::Ordering;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("castflow-{}-{}.dat", name, std::process::id()))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = FileStore::new(temp_path("missing"));
        assert!(store.load_snapshot().expect("Should load").is_none());
    }

    #[test]
    fn test_state_survives_restart() {
        let path = temp_path("restart");
        let copper = FluidId::new("tfc:metal/copper");
        let mut grid = Grid::new();
        let contents = FluidStack::new(copper.clone(), 40);
        grid.set(
            Position::new(0, 0, 0),
            Block::Crucible(Crucible::new(Some(contents), true, 1150.0)),
        );
        grid.place_channel(Position::new(1, 0, 0));
        grid.set(
            Position::new(2, 0, 0),
            Block::MoldTable(MoldTable::new(Some(MoldItem {
                capacity: 100,
                accepts: vec![],
                result: "tfc:metal/ingot/copper".to_string(),
                contents: None,
                temperature: 0.0,
            }))),
        );
        let west = FlowLink::new(Direction::West, 1);
        if let Some(channel) = grid.conduit_mut(Position::new(1, 0, 0)) {
            channel.set_link_properties(west, false, 1, copper.clone());
        }
        if let Some(table) = grid.sink_mut(Position::new(2, 0, 0)) {
            table.set_source(Position::new(0, 0, 0), copper.clone(), west);
        }

        let metrics = Arc::new(RoutingMetrics::default());
        let store = FileStore::new(&path).with_metrics(metrics.clone());
        store.save_snapshot(&grid.snapshot()).expect("Should save");

        // Same layout, fresh state.
        let mut reloaded = Grid::new();
        reloaded.set(
            Position::new(0, 0, 0),
            Block::Crucible(Crucible::new(None, false, 0.0)),
        );
        reloaded.place_channel(Position::new(1, 0, 0));
        reloaded.set(Position::new(2, 0, 0), Block::MoldTable(MoldTable::new(None)));

        let snapshot = store.load_snapshot().expect("Should load").expect("Should exist");
        assert_eq!(reloaded.restore(&snapshot), 3);

        let channel = reloaded.conduit(Position::new(1, 0, 0)).expect("Should be a channel");
        assert_eq!(channel.flow_source(), Some(west));
        assert_eq!(channel.ref_count(), 1);
        assert!(!channel.is_from_conduit());
        let link = reloaded
            .sink(Position::new(2, 0, 0))
            .and_then(|t| t.link())
            .expect("Should be linked");
        assert_eq!(link.source, Position::new(0, 0, 0));
        let contents = reloaded
            .source(Position::new(0, 0, 0))
            .and_then(|c| c.contents.clone());
        assert_eq!(contents, Some(FluidStack::new(copper, 40)));

        assert_eq!(metrics.total_state_saves.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.total_state_loads.load(Ordering::Relaxed), 1);
        let _ = fs::remove_file(&path);
    }
}
