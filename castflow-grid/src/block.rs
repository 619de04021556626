//! Block contents and the per-node state each block persists.
//!
//! - [`Crucible`]: the flow source
//! - [`Channel`]: a conduit relaying flow
//! - [`MoldTable`]: a sink that consumes flow into its mold

use serde::{Deserialize, Serialize};

use crate::fluid::{FluidAction, FluidId, FluidStack};
use crate::grid::NodeKind;
use crate::pos::{Direction, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Any solid block that is not part of the network.
    Obstacle(String),
    Crucible(Crucible),
    Channel(Channel),
    MoldTable(MoldTable),
}

impl Block {
    pub fn kind(&self) -> NodeKind {
        match self {
            Block::Obstacle(_) => NodeKind::Other,
            Block::Crucible(_) => NodeKind::Source,
            Block::Channel(_) => NodeKind::Conduit,
            Block::MoldTable(_) => NodeKind::Sink,
        }
    }
}

/// Pointer from a node to its immediate upstream supplier.
///
/// `distance` is 1 for neighbors and larger only for drops down a shaft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowLink {
    pub direction: Direction,
    pub distance: u8,
}

impl FlowLink {
    pub fn new(direction: Direction, distance: u8) -> Self {
        Self { direction, distance }
    }

    /// Link from `from` pointing at `to`.
    ///
    /// Returns `None` unless the offset is axis-aligned and between 1 and 255 cells.
    pub fn between(from: Position, to: Position) -> Option<Self> {
        let (dx, dy, dz) = from.delta_to(to);
        let distance = dx.abs() + dy.abs() + dz.abs();
        if distance == 0 || distance > u8::MAX as i64 {
            return None;
        }
        // Any offset with two non-zero components divides down to (0, 0, 0).
        let direction = Direction::from_delta(
            (dx / distance) as i32,
            (dy / distance) as i32,
            (dz / distance) as i32,
        )?;
        Some(Self::new(direction, distance as u8))
    }

    /// The upstream node, or `None` if it would lie outside the `i32` range.
    pub fn target(self, from: Position) -> Option<Position> {
        from.checked_relative(self.direction, self.distance as i32)
    }

    /// Cells strictly between `from` and the upstream node.
    pub fn intermediate(self, from: Position) -> impl Iterator<Item = Position> {
        (1..self.distance as i32).map_while(move |i| from.checked_relative(self.direction, i))
    }
}

/// What a source can currently pour.
#[derive(Debug, Clone, PartialEq)]
pub struct FluidHandle {
    pub fluid: FluidId,
    pub available: u32,
    pub temperature: f32,
}

impl FluidHandle {
    /// One unit of the fluid, as a simulated drain would return it.
    pub fn sample(&self) -> FluidStack {
        FluidStack::new(self.fluid.clone(), self.available.min(1))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Crucible {
    pub contents: Option<FluidStack>,
    pub molten: bool,
    pub temperature: f32,
}

impl Crucible {
    pub fn new(contents: Option<FluidStack>, molten: bool, temperature: f32) -> Self {
        Self {
            contents,
            molten,
            temperature,
        }
    }

    /// The pourable fluid, only if the crucible is not empty, holds `expected`
    /// (when given) and the metal is molten.
    pub fn fluid_handler_if_available(&self, expected: Option<&FluidId>) -> Option<FluidHandle> {
        let contents = self.contents.as_ref().filter(|c| !c.is_empty())?;
        if expected.is_some_and(|fluid| *fluid != contents.fluid) {
            return None;
        }
        if !self.molten {
            return None;
        }
        Some(FluidHandle {
            fluid: contents.fluid.clone(),
            available: contents.amount,
            temperature: self.temperature,
        })
    }

    pub fn drain(&mut self, amount: u32, action: FluidAction) -> Option<FluidStack> {
        let contents = self.contents.as_mut()?;
        let drained = amount.min(contents.amount);
        if drained == 0 {
            return None;
        }
        let stack = FluidStack::new(contents.fluid.clone(), drained);
        if action == FluidAction::Execute {
            contents.amount -= drained;
            if contents.amount == 0 {
                self.contents = None;
            }
        }
        Some(stack)
    }
}

/// Conduit state: where the flow comes from and how many sink paths use it.
///
/// Idle while `flow_source` is empty, Flowing otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    flow_source: Option<FlowLink>,
    /// True if the flow comes from another channel, false if from a crucible.
    from_conduit: bool,
    ref_count: i32,
    fluid: Option<FluidId>,
    /// Last signal seen; activation only fires on a rising edge.
    triggered: bool,
}

impl Channel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_flow(&self) -> bool {
        self.flow_source.is_some()
    }

    pub fn flow_source(&self) -> Option<FlowLink> {
        self.flow_source
    }

    pub fn is_from_conduit(&self) -> bool {
        self.from_conduit
    }

    pub fn ref_count(&self) -> i32 {
        self.ref_count
    }

    pub fn fluid(&self) -> Option<&FluidId> {
        self.fluid.as_ref()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    /// Records the signal state. Returns true on an unpowered to powered edge.
    pub fn set_triggered(&mut self, powered: bool) -> bool {
        let rising = powered && !self.triggered;
        self.triggered = powered;
        rising
    }

    pub fn set_link_properties(
        &mut self,
        flow_source: FlowLink,
        is_from_conduit: bool,
        ref_count: i32,
        fluid: FluidId,
    ) {
        self.flow_source = Some(flow_source);
        self.from_conduit = is_from_conduit;
        self.ref_count = ref_count;
        self.fluid = Some(fluid);
    }

    /// Drops `count` sink paths from this channel, going Idle once none are left.
    ///
    /// Returns the upstream link when the notification must travel on to another channel.
    pub fn release_flows(&mut self, count: i32) -> Option<FlowLink> {
        let upstream = self.flow_source.filter(|_| self.from_conduit);
        self.ref_count -= count;
        if self.ref_count <= 0 {
            self.clear();
        }
        upstream
    }

    /// Goes Idle. The signal state is kept.
    pub fn clear(&mut self) {
        self.flow_source = None;
        self.from_conduit = false;
        self.ref_count = 0;
        self.fluid = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoldItem {
    pub capacity: u32,
    /// Fluids this mold can be cast with. Empty accepts any fluid.
    #[serde(default)]
    pub accepts: Vec<FluidId>,
    /// Item produced once the metal solidifies.
    pub result: String,
    #[serde(default)]
    pub contents: Option<FluidStack>,
    #[serde(default)]
    pub temperature: f32,
}

impl MoldItem {
    pub fn accepts(&self, fluid: &FluidId) -> bool {
        self.accepts.is_empty() || self.accepts.contains(fluid)
    }

    pub fn amount(&self) -> u32 {
        self.contents.as_ref().map_or(0, |c| c.amount)
    }

    pub fn is_full(&self) -> bool {
        self.amount() >= self.capacity
    }

    /// How much of `stack` would fit.
    pub fn fillable(&self, stack: &FluidStack) -> u32 {
        if stack.is_empty() || !self.accepts(&stack.fluid) {
            return 0;
        }
        if self.contents.as_ref().is_some_and(|c| c.fluid != stack.fluid) {
            return 0;
        }
        stack.amount.min(self.capacity.saturating_sub(self.amount()))
    }

    pub fn fill(&mut self, stack: &FluidStack, action: FluidAction) -> u32 {
        let filled = self.fillable(stack);
        if filled > 0 && action == FluidAction::Execute {
            match &mut self.contents {
                Some(contents) => contents.amount += filled,
                None => self.contents = Some(FluidStack::new(stack.fluid.clone(), filled)),
            }
        }
        filled
    }
}

/// The source a mold table is currently drawing from.
#[derive(Debug, Clone, PartialEq)]
pub struct SinkLink {
    pub source: Position,
    pub fluid: FluidId,
    pub flow_source: FlowLink,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoldTable {
    pub mold: Option<MoldItem>,
    /// Solidified cast waiting to be taken out.
    pub output: Option<String>,
    link: Option<SinkLink>,
}

impl MoldTable {
    pub fn new(mold: Option<MoldItem>) -> Self {
        Self {
            mold,
            output: None,
            link: None,
        }
    }

    pub fn has_unclaimed_output(&self) -> bool {
        self.output.is_some()
    }

    /// Comparator output: 15 with a cast waiting, 1..=14 by fill level with a
    /// mold, 0 without one.
    pub fn signal_level(&self) -> u8 {
        if self.output.is_some() {
            return 15;
        }
        match &self.mold {
            Some(mold) if mold.capacity > 0 => {
                let amount = mold.amount().min(mold.capacity) as u64;
                1 + (13 * amount / mold.capacity as u64) as u8
            }
            Some(_) => 1,
            None => 0,
        }
    }

    /// Whether any of `sample` could be poured into the mold right now.
    pub fn simulate_fill(&self, sample: &FluidStack) -> bool {
        self.mold.as_ref().is_some_and(|mold| mold.fillable(sample) > 0)
    }

    pub fn fill(&mut self, stack: &FluidStack, action: FluidAction) -> u32 {
        self.mold.as_mut().map_or(0, |mold| mold.fill(stack, action))
    }

    pub fn has_source(&self) -> bool {
        self.link.is_some()
    }

    pub fn link(&self) -> Option<&SinkLink> {
        self.link.as_ref()
    }

    pub fn set_source(&mut self, source: Position, fluid: FluidId, flow_source: FlowLink) {
        self.link = Some(SinkLink {
            source,
            fluid,
            flow_source,
        });
    }

    pub fn take_link(&mut self) -> Option<SinkLink> {
        self.link.take()
    }

    pub fn set_mold_temperature(&mut self, temperature: f32) {
        if let Some(mold) = &mut self.mold {
            mold.temperature = temperature;
        }
    }

    pub fn cool(&mut self, amount: f32) {
        if let Some(mold) = &mut self.mold {
            mold.temperature = (mold.temperature - amount).max(0.0);
        }
    }

    /// Turns a full, cooled mold into its cast. Returns true if a cast was produced.
    pub fn try_solidify(&mut self, below: f32) -> bool {
        if self.output.is_some() {
            return false;
        }
        let Some(mold) = &mut self.mold else {
            return false;
        };
        if mold.contents.is_none() || !mold.is_full() || mold.temperature >= below {
            return false;
        }
        mold.contents = None;
        self.output = Some(mold.result.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn copper(amount: u32) -> FluidStack {
        FluidStack::new(FluidId::new("tfc:metal/copper"), amount)
    }

    fn ingot_mold() -> MoldItem {
        MoldItem {
            capacity: 100,
            accepts: vec![],
            result: "tfc:metal/ingot/copper".to_string(),
            contents: None,
            temperature: 0.0,
        }
    }

    #[test]
    fn test_link_between_neighbors() {
        let at = Position::new(2, 0, 0);
        let link = FlowLink::between(at, Position::new(1, 0, 0)).expect("Should link");
        assert_eq!(link, FlowLink::new(Direction::West, 1));
        assert_eq!(link.target(at), Some(Position::new(1, 0, 0)));
        assert_eq!(link.intermediate(at).count(), 0);
    }

    #[test]
    fn test_link_up_a_shaft() {
        let at = Position::new(0, 0, 0);
        let link = FlowLink::between(at, Position::new(0, 4, 0)).expect("Should link");
        assert_eq!(link, FlowLink::new(Direction::Up, 4));
        let between: Vec<_> = link.intermediate(at).collect();
        assert_eq!(
            between,
            vec![Position::new(0, 1, 0), Position::new(0, 2, 0), Position::new(0, 3, 0)]
        );
    }

    #[test]
    fn test_link_rejects_diagonal_and_far() {
        let at = Position::new(0, 0, 0);
        assert_eq!(FlowLink::between(at, at), None);
        assert_eq!(FlowLink::between(at, Position::new(1, 1, 0)), None);
        assert_eq!(FlowLink::between(at, Position::new(3, 0, -1)), None);
        assert_eq!(FlowLink::between(at, Position::new(0, 256, 0)), None);
        assert!(FlowLink::between(at, Position::new(0, 255, 0)).is_some());

        let edge = Position::new(i32::MAX, 0, 0);
        assert_eq!(FlowLink::between(edge, Position::new(i32::MIN, 0, 0)), None);
        assert_eq!(FlowLink::new(Direction::East, 1).target(edge), None);
        assert_eq!(FlowLink::new(Direction::East, 3).intermediate(edge).count(), 0);
    }

    #[test]
    fn test_crucible_availability() {
        let mut crucible = Crucible::new(Some(copper(10)), true, 1100.0);
        let handle = crucible.fluid_handler_if_available(None).expect("Should pour");
        assert_eq!(handle.sample(), copper(1));

        let tin = FluidId::new("tfc:metal/tin");
        assert!(crucible.fluid_handler_if_available(Some(&tin)).is_none());
        assert!(crucible.fluid_handler_if_available(Some(&copper(1).fluid)).is_some());

        crucible.molten = false;
        assert!(crucible.fluid_handler_if_available(None).is_none());

        let empty = Crucible::new(None, true, 1100.0);
        assert!(empty.fluid_handler_if_available(None).is_none());
    }

    #[test]
    fn test_crucible_drain() {
        let mut crucible = Crucible::new(Some(copper(2)), true, 1100.0);
        assert_eq!(crucible.drain(1, FluidAction::Simulate), Some(copper(1)));
        assert_eq!(crucible.contents, Some(copper(2)));
        assert_eq!(crucible.drain(5, FluidAction::Execute), Some(copper(2)));
        assert_eq!(crucible.contents, None);
        assert_eq!(crucible.drain(1, FluidAction::Execute), None);
    }

    #[test]
    fn test_mold_fill_limits() {
        let mut mold = ingot_mold();
        assert_eq!(mold.fill(&copper(60), FluidAction::Execute), 60);
        assert_eq!(mold.fill(&copper(60), FluidAction::Simulate), 40);
        assert_eq!(mold.amount(), 60);
        assert_eq!(mold.fill(&copper(60), FluidAction::Execute), 40);
        assert!(mold.is_full());
        assert_eq!(mold.fill(&copper(1), FluidAction::Execute), 0);

        let mut other = ingot_mold();
        other.fill(&copper(1), FluidAction::Execute);
        let tin = FluidStack::new(FluidId::new("tfc:metal/tin"), 1);
        assert_eq!(other.fillable(&tin), 0);
    }

    #[test]
    fn test_mold_accept_list() {
        let mut mold = ingot_mold();
        mold.accepts = vec![FluidId::new("tfc:metal/bronze")];
        assert_eq!(mold.fillable(&copper(1)), 0);
    }

    #[test]
    fn test_table_simulate_fill() {
        let table = MoldTable::new(Some(ingot_mold()));
        assert!(table.simulate_fill(&copper(1)));
        assert!(!table.simulate_fill(&copper(0)));
        assert!(!MoldTable::new(None).simulate_fill(&copper(1)));
    }

    #[test]
    fn test_table_solidifies_when_full_and_cool() {
        let mut table = MoldTable::new(Some(ingot_mold()));
        table.fill(&copper(100), FluidAction::Execute);
        table.set_mold_temperature(1000.0);
        assert!(!table.try_solidify(300.0));

        table.cool(800.0);
        assert!(table.try_solidify(300.0));
        assert_eq!(table.output.as_deref(), Some("tfc:metal/ingot/copper"));
        assert!(table.has_unclaimed_output());
        assert_eq!(table.mold.as_ref().map(MoldItem::amount), Some(0));
    }

    #[test]
    fn test_channel_release() {
        let mut channel = Channel::new();
        let link = FlowLink::new(Direction::West, 1);
        channel.set_link_properties(link, true, 2, FluidId::new("tfc:metal/copper"));

        assert_eq!(channel.release_flows(1), Some(link));
        assert!(channel.has_flow());
        assert_eq!(channel.ref_count(), 1);

        assert_eq!(channel.release_flows(1), Some(link));
        assert!(!channel.has_flow());
        assert_eq!(channel.ref_count(), 0);
        assert_eq!(channel.fluid(), None);
    }

    #[test]
    fn test_channel_signal_edges() {
        let mut channel = Channel::new();
        assert!(channel.set_triggered(true));
        assert!(!channel.set_triggered(true));
        assert!(channel.is_triggered());

        channel.clear();
        assert!(channel.is_triggered());
        assert!(!channel.set_triggered(false));
        assert!(channel.set_triggered(true));
    }

    #[test]
    fn test_table_signal_level() {
        assert_eq!(MoldTable::new(None).signal_level(), 0);

        let mut table = MoldTable::new(Some(MoldItem {
            capacity: 100,
            accepts: vec![],
            result: "tfc:metal/ingot/copper".to_string(),
            contents: None,
            temperature: 0.0,
        }));
        assert_eq!(table.signal_level(), 1);

        let copper = FluidId::new("tfc:metal/copper");
        table.fill(&FluidStack::new(copper.clone(), 50), FluidAction::Execute);
        assert_eq!(table.signal_level(), 7);
        table.fill(&FluidStack::new(copper, 50), FluidAction::Execute);
        assert_eq!(table.signal_level(), 14);

        table.output = Some("tfc:metal/ingot/copper".to_string());
        assert_eq!(table.signal_level(), 15);
    }

    #[test]
    fn test_root_channel_does_not_forward() {
        let mut channel = Channel::new();
        let copper = FluidId::new("tfc:metal/copper");
        channel.set_link_properties(FlowLink::new(Direction::East, 1), false, 1, copper);
        assert_eq!(channel.release_flows(1), None);
        assert!(!channel.has_flow());
    }
}
