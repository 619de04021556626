//! Network discovery: flood fill from the root channel.

use std::collections::{HashMap, HashSet, VecDeque};

use castflow_grid::{Direction, FlowWorld, FluidStack, NodeKind, Position};
use log::debug;

/// Channels and mold tables reachable from one root channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// In discovery order; the root is first.
    pub conduits: Vec<Position>,
    /// In first-seen order, without duplicates.
    pub sinks: Vec<Position>,
    /// Only channels are keys. Each list holds adjacent channels followed by
    /// adjacent mold tables.
    pub neighbors: HashMap<Position, Vec<Position>>,
}

impl Discovery {
    pub fn root(&self) -> Option<Position> {
        self.conduits.first().copied()
    }
}

/// Nodes of kind `want` adjacent to `current`.
///
/// Sideways and up only the touching cell counts. Down scans through empty
/// cells for up to `max_drop` cells and stops at the first non-empty one.
pub fn find_adjacent<W: FlowWorld + ?Sized>(
    world: &W,
    current: Position,
    want: NodeKind,
    max_drop: u8,
) -> Vec<Position> {
    let mut adjacent = Vec::new();
    for dir in Direction::ALL {
        // When going down, allow >1 block distance
        let reach = if dir == Direction::Down { max_drop as i32 } else { 1 };

        for distance in 1..=reach {
            // Past the edge of the coordinate range counts as solid.
            let Some(relative) = current.checked_relative(dir, distance) else {
                break;
            };
            let kind = world.node_kind(relative);
            if kind == want {
                adjacent.push(relative);
                break;
            } else if kind != NodeKind::Empty {
                break;
            }
        }
    }
    adjacent
}

/// Flood fills the channel network starting at `root`.
///
/// Channels are queued so the whole net is found; mold tables are leaves and
/// only recorded.
pub fn discover<W: FlowWorld + ?Sized>(world: &W, root: Position, max_drop: u8) -> Discovery {
    let mut discovery = Discovery::default();
    let mut indexed = HashSet::new();
    let mut seen_sinks = HashSet::new();
    let mut pending = VecDeque::from([root]);

    while let Some(current) = pending.pop_front() {
        if !indexed.insert(current) {
            continue;
        }
        discovery.conduits.push(current);

        let adjacent_conduits = find_adjacent(world, current, NodeKind::Conduit, max_drop);
        let adjacent_sinks = find_adjacent(world, current, NodeKind::Sink, max_drop);

        pending.extend(adjacent_conduits.iter().copied().filter(|p| !indexed.contains(p)));
        for &sink in &adjacent_sinks {
            if seen_sinks.insert(sink) {
                discovery.sinks.push(sink);
            }
        }

        let mut neighbors = adjacent_conduits;
        neighbors.extend(adjacent_sinks);
        discovery.neighbors.insert(current, neighbors);
    }

    debug!(
        "Discovered {} channels and {} mold tables from {}",
        discovery.conduits.len(),
        discovery.sinks.len(),
        root
    );
    discovery
}

/// Removes mold tables that hold an unclaimed cast or cannot take `sample`.
///
/// Run before graph construction, so tables that would disconnect after a
/// single tick never get a flow. Returns the removed positions.
pub fn filter_sinks<W: FlowWorld + ?Sized>(
    world: &W,
    discovery: &mut Discovery,
    sample: &FluidStack,
) -> Vec<Position> {
    let mut removed = Vec::new();
    discovery.sinks.retain(|&pos| {
        let keep = world
            .sink(pos)
            .is_some_and(|table| !table.has_unclaimed_output() && table.simulate_fill(sample));
        if !keep {
            removed.push(pos);
        }
        keep
    });
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{copper, mold_table, pos, straight_line, tee};
    use castflow_grid::{FluidId, FluidStack, Grid};

    #[test]
    fn test_straight_line() {
        let grid = straight_line();
        let discovery = discover(&grid, pos(1, 0, 0), 255);
        assert_eq!(discovery.conduits, vec![pos(1, 0, 0), pos(2, 0, 0), pos(3, 0, 0)]);
        assert_eq!(discovery.sinks, vec![pos(4, 0, 0)]);
        assert_eq!(discovery.neighbors[&pos(1, 0, 0)], vec![pos(2, 0, 0)]);
        assert_eq!(discovery.neighbors[&pos(2, 0, 0)], vec![pos(1, 0, 0), pos(3, 0, 0)]);
        assert_eq!(discovery.neighbors[&pos(3, 0, 0)], vec![pos(2, 0, 0), pos(4, 0, 0)]);
        assert!(!discovery.neighbors.contains_key(&pos(4, 0, 0)));
    }

    #[test]
    fn test_deterministic() {
        let grid = tee();
        let first = discover(&grid, pos(1, 0, 0), 255);
        for _ in 0..10 {
            assert_eq!(discover(&grid, pos(1, 0, 0), 255), first);
        }
        assert_eq!(first.conduits.len(), 5);
        assert_eq!(first.sinks.len(), 2);
    }

    #[test]
    fn test_shared_sink_recorded_once() {
        let mut grid = Grid::new();
        for p in [pos(0, 0, 0), pos(0, 0, 1), pos(1, 0, 1), pos(2, 0, 1), pos(2, 0, 0)] {
            grid.place_channel(p);
        }
        // Touches three channels of the loop.
        grid.set(pos(1, 0, 0), mold_table(10));

        let discovery = discover(&grid, pos(0, 0, 0), 255);
        assert_eq!(discovery.conduits.len(), 5);
        assert_eq!(discovery.sinks, vec![pos(1, 0, 0)]);
        assert!(discovery.neighbors[&pos(2, 0, 0)].contains(&pos(1, 0, 0)));
        assert!(discovery.neighbors[&pos(1, 0, 1)].contains(&pos(1, 0, 0)));
    }

    #[test]
    fn test_up_is_adjacent_only_when_touching() {
        let mut grid = Grid::new();
        grid.place_channel(pos(0, 0, 0));
        grid.place_channel(pos(0, 1, 0));
        grid.place_channel(pos(5, 0, 0));
        grid.place_channel(pos(5, 2, 0));

        let found = find_adjacent(&grid, pos(0, 0, 0), NodeKind::Conduit, 255);
        assert_eq!(found, vec![pos(0, 1, 0)]);
        assert!(find_adjacent(&grid, pos(5, 0, 0), NodeKind::Conduit, 255).is_empty());
    }

    #[test]
    fn test_down_shaft_limit() {
        let mut grid = Grid::new();
        let top = pos(0, 300, 0);
        grid.place_channel(top);

        // Exactly 255 cells below: the scan reaches it.
        grid.place_channel(top.relative(Direction::Down, 255));
        assert_eq!(
            find_adjacent(&grid, top, NodeKind::Conduit, 255),
            vec![top.relative(Direction::Down, 255)]
        );

        // 256 cells below: out of reach.
        grid.remove(top.relative(Direction::Down, 255));
        grid.place_channel(top.relative(Direction::Down, 256));
        assert!(find_adjacent(&grid, top, NodeKind::Conduit, 255).is_empty());
    }

    #[test]
    fn test_down_scan_blocked_by_obstacle() {
        let mut grid = Grid::new();
        grid.place_channel(pos(0, 10, 0));
        grid.place_obstacle(pos(0, 6, 0), "minecraft:stone");
        grid.place_channel(pos(0, 2, 0));
        assert!(find_adjacent(&grid, pos(0, 10, 0), NodeKind::Conduit, 255).is_empty());

        // A mold table in the way also blocks the channel search, but is itself found.
        grid.remove(pos(0, 6, 0));
        grid.set(pos(0, 6, 0), mold_table(10));
        assert!(find_adjacent(&grid, pos(0, 10, 0), NodeKind::Conduit, 255).is_empty());
        assert_eq!(find_adjacent(&grid, pos(0, 10, 0), NodeKind::Sink, 255), vec![pos(0, 6, 0)]);
    }

    #[test]
    fn test_max_drop_config() {
        let mut grid = Grid::new();
        grid.place_channel(pos(0, 10, 0));
        grid.place_channel(pos(0, 5, 0));
        assert!(find_adjacent(&grid, pos(0, 10, 0), NodeKind::Conduit, 4).is_empty());
        assert_eq!(find_adjacent(&grid, pos(0, 10, 0), NodeKind::Conduit, 5), vec![pos(0, 5, 0)]);
    }

    #[test]
    fn test_filter_sinks() {
        let mut grid = tee();
        if let Some(table) = grid.sink_mut(pos(3, 0, 2)) {
            table.output = Some("tfc:metal/ingot/copper".to_string());
        }
        let mut discovery = discover(&grid, pos(1, 0, 0), 255);
        let removed = filter_sinks(&grid, &mut discovery, &FluidStack::new(copper(), 1));
        assert_eq!(removed, vec![pos(3, 0, 2)]);
        assert_eq!(discovery.sinks, vec![pos(3, 0, -2)]);
    }

    #[test]
    fn test_filter_rejects_incompatible_fluid() {
        let mut grid = straight_line();
        if let Some(mold) = grid.sink_mut(pos(4, 0, 0)).and_then(|t| t.mold.as_mut()) {
            mold.accepts = vec![FluidId::new("tfc:metal/bronze")];
        }
        let mut discovery = discover(&grid, pos(1, 0, 0), 255);
        let removed = filter_sinks(&grid, &mut discovery, &FluidStack::new(copper(), 1));
        assert_eq!(removed, vec![pos(4, 0, 0)]);
        assert!(discovery.sinks.is_empty());
    }

    #[test]
    fn test_filter_rejects_empty_sample() {
        let grid = straight_line();
        let mut discovery = discover(&grid, pos(1, 0, 0), 255);
        let removed = filter_sinks(&grid, &mut discovery, &FluidStack::new(copper(), 0));
        assert_eq!(removed, vec![pos(4, 0, 0)]);
    }
}
