//! Scene files describe a grid layout in JSON.
//!
//! ```json
//! {
//!   "sources": [{
//!     "pos": [0, 0, 0], "fluid": "tfc:metal/copper", "amount": 100, "temperature": 1200.0
//!   }],
//!   "conduits": [[1, 0, 0], [2, 0, 0]],
//!   "sinks": [{
//!     "pos": [3, 0, 0], "mold": { "capacity": 100, "result": "tfc:metal/ingot/copper" }
//!   }],
//!   "obstacles": [{ "pos": [2, 1, 0], "name": "minecraft:stone" }]
//! }
//! ```

use anyhow::{Context, Result, bail};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::block::{Block, Crucible, MoldItem, MoldTable};
use crate::fluid::{FluidId, FluidStack};
use crate::grid::Grid;
use crate::pos::Position;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(default)]
    pub conduits: Vec<Position>,
    #[serde(default)]
    pub sinks: Vec<SinkEntry>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub pos: Position,
    #[serde(default)]
    pub fluid: Option<FluidId>,
    #[serde(default)]
    pub amount: u32,
    #[serde(default = "default_molten")]
    pub molten: bool,
    #[serde(default)]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkEntry {
    pub pos: Position,
    #[serde(default)]
    pub mold: Option<MoldItem>,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleEntry {
    pub pos: Position,
    #[serde(default = "default_obstacle")]
    pub name: String,
}

fn default_molten() -> bool {
    true
}

fn default_obstacle() -> String {
    "minecraft:stone".to_string()
}

impl Scene {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse scene JSON")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene {}", path.display()))?;
        Self::from_json(&text)
    }

    /// Every position named by the scene, in file order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.sources
            .iter()
            .map(|s| s.pos)
            .chain(self.conduits.iter().copied())
            .chain(self.sinks.iter().map(|s| s.pos))
            .chain(self.obstacles.iter().map(|o| o.pos))
    }

    /// Builds the grid. Later entries replace earlier ones at the same position.
    ///
    /// Fails if a position cannot be written to a state file unchanged.
    pub fn build(&self) -> Result<Grid> {
        if let Some(pos) = self.positions().find(|p| !p.is_packable()) {
            bail!(
                "Scene position {} is out of range (|x|, |z| < 2^25, y in -2048..=2047)",
                pos
            );
        }

        let mut grid = Grid::new();
        let mut place = |pos: Position, block: Block| {
            if let Some(previous) = grid.set(pos, block) {
                warn!("Scene places two blocks at {}, replacing {:?}", pos, previous.kind());
            }
        };

        for source in &self.sources {
            let contents = source
                .fluid
                .clone()
                .filter(|_| source.amount > 0)
                .map(|fluid| FluidStack::new(fluid, source.amount));
            let crucible = Crucible::new(contents, source.molten, source.temperature);
            place(source.pos, Block::Crucible(crucible));
        }
        for &pos in &self.conduits {
            place(pos, Block::Channel(Default::default()));
        }
        for sink in &self.sinks {
            let mut table = MoldTable::new(sink.mold.clone());
            table.output = sink.output.clone();
            place(sink.pos, Block::MoldTable(table));
        }
        for obstacle in &self.obstacles {
            place(obstacle.pos, Block::Obstacle(obstacle.name.clone()));
        }

        Ok(grid)
    }
}
