use std::collections::HashMap;

use castflow_grid::{FlowLink, FlowWorld, FluidId, Position};
use log::debug;

use crate::error::RouteError;

/// Flow directions and path counts collected over all routed mold tables,
/// before anything is written to the world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowPlan {
    /// Node -> link to its upstream neighbor on the path.
    pub flow_sources: HashMap<Position, FlowLink>,
    /// Node -> number of paths passing through it from downstream.
    pub ref_counts: HashMap<Position, i32>,
}

impl FlowPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one path, ordered from the mold table back to the root channel.
    ///
    /// Returns the number of hops.
    pub fn record_path(&mut self, path: &[Position]) -> Result<usize, RouteError> {
        for pair in path.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            let link = FlowLink::between(current, next)
                .ok_or(RouteError::MisalignedStep { from: current, to: next })?;
            self.flow_sources.insert(current, link);
            *self.ref_counts.entry(next).or_insert(0) += 1;
        }
        Ok(path.len().saturating_sub(1))
    }

    pub fn ref_count(&self, pos: Position) -> i32 {
        self.ref_counts.get(&pos).copied().unwrap_or(0)
    }

    /// Sum of all recorded path counts.
    pub fn total_refs(&self) -> i32 {
        self.ref_counts.values().sum()
    }

    /// Writes the plan onto the world.
    ///
    /// Every planned channel points at the next channel upstream; the root
    /// channel points at the crucible. Mold tables record the crucible and
    /// fluid they draw from. Returns the number of channels written.
    pub fn apply<W: FlowWorld + ?Sized>(
        &self,
        world: &mut W,
        root: Position,
        root_link: FlowLink,
        source: Position,
        fluid: &FluidId,
    ) -> usize {
        let mut positions: Vec<Position> = self.flow_sources.keys().copied().collect();
        positions.sort();

        let mut written = 0;
        for pos in positions {
            let link = self.flow_sources[&pos];
            if let Some(channel) = world.conduit_mut(pos) {
                if channel.has_flow() {
                    debug!("Channel {} already flowing, overwriting", pos);
                }
                channel.set_link_properties(link, true, self.ref_count(pos), fluid.clone());
                written += 1;
            } else if let Some(table) = world.sink_mut(pos) {
                table.set_source(source, fluid.clone(), link);
            }
        }

        if let Some(channel) = world.conduit_mut(root) {
            if channel.has_flow() {
                debug!("Root channel {} already flowing, overwriting", root);
            }
            channel.set_link_properties(root_link, false, self.ref_count(root), fluid.clone());
            written += 1;
        }
        written
    }
}
