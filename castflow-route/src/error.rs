use castflow_grid::Position;
use thiserror::Error;

/// Failures of the routing engine.
///
/// Expected absences (no molten fluid, no mold table able to accept it) are
/// not errors; they produce an empty [`Activation`](crate::Activation).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// A mold table found by discovery is unreachable in the built graph.
    /// Means graph construction disagrees with discovery.
    #[error("illegal graph: no connection between node {start} and node {goal}")]
    Disconnected { start: usize, goal: usize },

    /// Two consecutive path nodes are not on a shared axis.
    #[error("path step from {from} to {to} is not axis-aligned")]
    MisalignedStep { from: Position, to: Position },

    #[error("no channel at {0}")]
    NotAConduit(Position),

    #[error("no crucible at {0}")]
    NotASource(Position),

    /// The crucible does not share a face with the root channel.
    #[error("crucible at {crucible} does not touch channel {root}")]
    SourceNotAdjacent { crucible: Position, root: Position },
}
