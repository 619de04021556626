//! NBT (Named Binary Tag) structures for persisted node state.
//!
//! Only the state each node keeps between activations is stored here; the
//! layout of the grid itself comes from the scene. Serialized with fastnbt.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::block::{Block, Channel, Crucible, FlowLink, MoldTable};
use crate::fluid::{FluidId, FluidStack};
use crate::grid::Grid;
use crate::pos::{Direction, Position};

/// `flowSource` value written for a channel without flow.
pub const NO_FLOW_BYTE: i8 = 99;

/// Snapshot format version (default).
/// Can be overridden by CASTFLOW_DATA_VERSION env var.
pub fn get_data_version() -> i32 {
    std::env::var("CASTFLOW_DATA_VERSION")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
}

/// Root of a saved state file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    #[serde(rename = "DataVersion")]
    pub data_version: i32,

    #[serde(default)]
    pub channels: Vec<ChannelTag>,
    #[serde(default)]
    pub molds: Vec<MoldTag>,
    #[serde(default)]
    pub crucibles: Vec<CrucibleTag>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTag {
    // Packed block position
    pub pos: i64,

    #[serde(rename = "nFlowsOut")]
    pub n_flows_out: i32,

    // Non-zero when the flow comes from another channel (tall render box for drops)
    #[serde(rename = "useLongRenderBox")]
    pub use_long_render_box: i8,

    // Direction ordinal, or NO_FLOW_BYTE
    #[serde(rename = "flowSource")]
    pub flow_source: i8,

    // Stored as a signed byte; read back as 0..=255
    #[serde(rename = "flowSourceDistance", default = "default_distance")]
    pub flow_source_distance: i8,

    // Fluid to render, empty without flow
    pub texture: String,

    // Non-zero while powered
    #[serde(default)]
    pub triggered: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoldTag {
    pub pos: i64,

    // Link to the crucible, all present or all absent
    #[serde(rename = "sourcePosition", default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<i64>,
    #[serde(rename = "flowSource", default, skip_serializing_if = "Option::is_none")]
    pub flow_source: Option<i8>,
    #[serde(rename = "flowSourceDistance", default, skip_serializing_if = "Option::is_none")]
    pub flow_source_distance: Option<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid: Option<String>,

    // Inventory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(rename = "moldFluid", default, skip_serializing_if = "Option::is_none")]
    pub mold_fluid: Option<String>,
    #[serde(rename = "moldAmount", default)]
    pub mold_amount: i32,
    #[serde(rename = "moldTemperature", default)]
    pub mold_temperature: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrucibleTag {
    pub pos: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluid: Option<String>,
    #[serde(default)]
    pub amount: i32,
    pub molten: i8,
    pub temperature: f32,
}

fn default_distance() -> i8 {
    1
}

fn link_from_bytes(direction: i8, distance: i8) -> Option<FlowLink> {
    if direction == NO_FLOW_BYTE || direction < 0 {
        return None;
    }
    let direction = Direction::from_ordinal(direction as u8)?;
    Some(FlowLink::new(direction, (distance as u8).max(1)))
}

impl ChannelTag {
    pub fn from_channel(pos: Position, channel: &Channel) -> Self {
        let link = channel.flow_source();
        Self {
            pos: pos.as_long(),
            n_flows_out: channel.ref_count(),
            use_long_render_box: channel.is_from_conduit() as i8,
            flow_source: link.map_or(NO_FLOW_BYTE, |l| l.direction.ordinal() as i8),
            flow_source_distance: link.map_or(1, |l| l.distance as i8),
            texture: channel.fluid().map(|f| f.to_string()).unwrap_or_default(),
            triggered: channel.is_triggered() as i8,
        }
    }

    pub fn apply(&self, channel: &mut Channel) {
        channel.set_triggered(self.triggered != 0);
        let link = link_from_bytes(self.flow_source, self.flow_source_distance);
        match link {
            Some(link) if !self.texture.is_empty() => channel.set_link_properties(
                link,
                self.use_long_render_box != 0,
                self.n_flows_out,
                FluidId::new(self.texture.as_str()),
            ),
            _ => channel.clear(),
        }
    }
}

impl MoldTag {
    pub fn from_table(pos: Position, table: &MoldTable) -> Self {
        let link = table.link();
        let mold = table.mold.as_ref();
        Self {
            pos: pos.as_long(),
            source_position: link.map(|l| l.source.as_long()),
            flow_source: link.map(|l| l.flow_source.direction.ordinal() as i8),
            flow_source_distance: link.map(|l| l.flow_source.distance as i8),
            fluid: link.map(|l| l.fluid.to_string()),
            output: table.output.clone(),
            mold_fluid: mold.and_then(|m| m.contents.as_ref()).map(|c| c.fluid.to_string()),
            mold_amount: mold.map_or(0, |m| m.amount() as i32),
            mold_temperature: mold.map_or(0.0, |m| m.temperature),
        }
    }

    pub fn apply(&self, table: &mut MoldTable) {
        table.take_link();
        let link = match (self.source_position, self.flow_source, &self.fluid) {
            (Some(source), Some(direction), Some(fluid)) => {
                let distance = self.flow_source_distance.unwrap_or(1);
                link_from_bytes(direction, distance)
                    .map(|l| (Position::from_long(source), fluid, l))
            }
            _ => None,
        };
        if let Some((source, fluid, flow_source)) = link {
            table.set_source(source, FluidId::new(fluid.as_str()), flow_source);
        }

        table.output = self.output.clone();
        if let Some(mold) = &mut table.mold {
            mold.contents = match &self.mold_fluid {
                Some(fluid) if self.mold_amount > 0 => {
                    Some(FluidStack::new(FluidId::new(fluid.as_str()), self.mold_amount as u32))
                }
                _ => None,
            };
            mold.temperature = self.mold_temperature;
        }
    }
}

impl CrucibleTag {
    pub fn from_crucible(pos: Position, crucible: &Crucible) -> Self {
        Self {
            pos: pos.as_long(),
            fluid: crucible.contents.as_ref().map(|c| c.fluid.to_string()),
            amount: crucible.contents.as_ref().map_or(0, |c| c.amount as i32),
            molten: crucible.molten as i8,
            temperature: crucible.temperature,
        }
    }

    pub fn apply(&self, crucible: &mut Crucible) {
        crucible.contents = match &self.fluid {
            Some(fluid) if self.amount > 0 => {
                Some(FluidStack::new(FluidId::new(fluid.as_str()), self.amount as u32))
            }
            _ => None,
        };
        crucible.molten = self.molten != 0;
        crucible.temperature = self.temperature;
    }
}

impl Grid {
    /// Collects the persistent state of every node, sorted by position.
    pub fn snapshot(&self) -> GridSnapshot {
        let mut snapshot = GridSnapshot {
            data_version: get_data_version(),
            channels: Vec::new(),
            molds: Vec::new(),
            crucibles: Vec::new(),
        };

        let mut positions: Vec<Position> = self.positions();
        positions.sort();
        for pos in positions {
            match self.get(pos) {
                Some(Block::Channel(channel)) => {
                    snapshot.channels.push(ChannelTag::from_channel(pos, channel))
                }
                Some(Block::MoldTable(table)) => {
                    snapshot.molds.push(MoldTag::from_table(pos, table))
                }
                Some(Block::Crucible(crucible)) => {
                    snapshot.crucibles.push(CrucibleTag::from_crucible(pos, crucible))
                }
                _ => {}
            }
        }
        snapshot
    }

    /// Applies saved node state onto the blocks already in the grid.
    ///
    /// Tags whose position does not hold a block of the matching kind are
    /// skipped. Returns the number of tags applied.
    pub fn restore(&mut self, snapshot: &GridSnapshot) -> usize {
        let mut applied = 0;

        for tag in &snapshot.channels {
            let pos = Position::from_long(tag.pos);
            match self.block_mut(pos) {
                Some(Block::Channel(channel)) => {
                    tag.apply(channel);
                    applied += 1;
                }
                _ => warn!("No channel at {} for saved state, skipping", pos),
            }
        }
        for tag in &snapshot.molds {
            let pos = Position::from_long(tag.pos);
            match self.block_mut(pos) {
                Some(Block::MoldTable(table)) => {
                    tag.apply(table);
                    applied += 1;
                }
                _ => warn!("No mold table at {} for saved state, skipping", pos),
            }
        }
        for tag in &snapshot.crucibles {
            let pos = Position::from_long(tag.pos);
            match self.block_mut(pos) {
                Some(Block::Crucible(crucible)) => {
                    tag.apply(crucible);
                    applied += 1;
                }
                _ => warn!("No crucible at {} for saved state, skipping", pos),
            }
        }

        applied
    }
}
