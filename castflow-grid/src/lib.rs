//! Block grid for the casting channel network.
//!
//! Stands in for the host world: every cell is keyed by [`Position`] and
//! holds at most one [`Block`]. Nodes never reference each other by pointer,
//! only by position lookups into the grid.

pub mod block;
pub mod fluid;
pub mod grid;
pub mod nbt;
pub mod pos;
pub mod scene;

pub use block::{Block, Channel, Crucible, FlowLink, FluidHandle, MoldItem, MoldTable, SinkLink};
pub use fluid::{FluidAction, FluidId, FluidStack};
pub use grid::{FlowWorld, Grid, NodeKind};
pub use pos::{Direction, ParsePositionError, Position};
