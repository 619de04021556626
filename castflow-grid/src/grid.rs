use std::collections::HashMap;

use crate::block::{Block, Channel, Crucible, MoldTable};
use crate::pos::Position;

/// What occupies a cell, as far as routing is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Empty,
    Conduit,
    Sink,
    Source,
    Other,
}

/// Query and mutation surface the routing engine needs from a world.
///
/// Nodes are looked up by position on every access; nothing holds on to a
/// node between calls.
pub trait FlowWorld {
    fn node_kind(&self, pos: Position) -> NodeKind;

    fn source(&self, pos: Position) -> Option<&Crucible>;
    fn source_mut(&mut self, pos: Position) -> Option<&mut Crucible>;

    fn conduit(&self, pos: Position) -> Option<&Channel>;
    fn conduit_mut(&mut self, pos: Position) -> Option<&mut Channel>;

    fn sink(&self, pos: Position) -> Option<&MoldTable>;
    fn sink_mut(&mut self, pos: Position) -> Option<&mut MoldTable>;

    /// All sink positions, sorted.
    fn sink_positions(&self) -> Vec<Position>;

    /// Empties the cell, returning what was there.
    fn remove(&mut self, pos: Position) -> Option<Block>;

    fn cell_is_empty(&self, pos: Position) -> bool {
        self.node_kind(pos) == NodeKind::Empty
    }

    fn is_conduit(&self, pos: Position) -> bool {
        self.node_kind(pos) == NodeKind::Conduit
    }

    fn is_sink(&self, pos: Position) -> bool {
        self.node_kind(pos) == NodeKind::Sink
    }
}

/// Sparse block grid. Cells not in the map are empty.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    blocks: HashMap<Position, Block>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `block` at `pos`, returning whatever was replaced.
    pub fn set(&mut self, pos: Position, block: Block) -> Option<Block> {
        self.blocks.insert(pos, block)
    }

    pub fn get(&self, pos: Position) -> Option<&Block> {
        self.blocks.get(&pos)
    }

    pub fn block_mut(&mut self, pos: Position) -> Option<&mut Block> {
        self.blocks.get_mut(&pos)
    }

    /// Occupied positions, in no particular order.
    pub fn positions(&self) -> Vec<Position> {
        self.blocks.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Positions holding blocks of `kind`, sorted.
    pub fn positions_of(&self, kind: NodeKind) -> Vec<Position> {
        let mut positions: Vec<Position> = self
            .blocks
            .iter()
            .filter(|(_, block)| block.kind() == kind)
            .map(|(pos, _)| *pos)
            .collect();
        positions.sort();
        positions
    }

    pub fn place_channel(&mut self, pos: Position) {
        self.set(pos, Block::Channel(Channel::new()));
    }

    pub fn place_obstacle(&mut self, pos: Position, name: &str) {
        self.set(pos, Block::Obstacle(name.to_string()));
    }
}

impl FlowWorld for Grid {
    fn node_kind(&self, pos: Position) -> NodeKind {
        self.blocks.get(&pos).map_or(NodeKind::Empty, Block::kind)
    }

    fn source(&self, pos: Position) -> Option<&Crucible> {
        match self.blocks.get(&pos) {
            Some(Block::Crucible(crucible)) => Some(crucible),
            _ => None,
        }
    }

    fn source_mut(&mut self, pos: Position) -> Option<&mut Crucible> {
        match self.blocks.get_mut(&pos) {
            Some(Block::Crucible(crucible)) => Some(crucible),
            _ => None,
        }
    }

    fn conduit(&self, pos: Position) -> Option<&Channel> {
        match self.blocks.get(&pos) {
            Some(Block::Channel(channel)) => Some(channel),
            _ => None,
        }
    }

    fn conduit_mut(&mut self, pos: Position) -> Option<&mut Channel> {
        match self.blocks.get_mut(&pos) {
            Some(Block::Channel(channel)) => Some(channel),
            _ => None,
        }
    }

    fn sink(&self, pos: Position) -> Option<&MoldTable> {
        match self.blocks.get(&pos) {
            Some(Block::MoldTable(table)) => Some(table),
            _ => None,
        }
    }

    fn sink_mut(&mut self, pos: Position) -> Option<&mut MoldTable> {
        match self.blocks.get_mut(&pos) {
            Some(Block::MoldTable(table)) => Some(table),
            _ => None,
        }
    }

    fn sink_positions(&self) -> Vec<Position> {
        self.positions_of(NodeKind::Sink)
    }

    fn remove(&mut self, pos: Position) -> Option<Block> {
        self.blocks.remove(&pos)
    }
}
