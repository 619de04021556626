//! Keeping flow links consistent after the network changes.
//!
//! Channels only know their immediate upstream neighbor, so both breaking a
//! link and checking one walk the chain hop by hop through the world.

use std::collections::HashSet;

use castflow_grid::{Direction, FlowLink, FlowWorld, NodeKind, Position};
use log::debug;

/// Tells the channel at `pos` that `count` paths through it stopped flowing,
/// and forwards the same notice upstream channel by channel.
///
/// A channel left with no paths goes idle. Forwarding stops at the root (its
/// upstream is the crucible), at a missing upstream, or at an idle channel.
/// Returns how many channels went idle.
pub fn notify_broken_link<W: FlowWorld + ?Sized>(
    world: &mut W,
    pos: Position,
    count: i32,
) -> usize {
    if count <= 0 {
        return 0;
    }

    let mut cleared = 0;
    let mut current = pos;
    loop {
        let Some(channel) = world.conduit_mut(current) else {
            break;
        };
        if !channel.has_flow() {
            break;
        }
        let upstream = channel.release_flows(count);
        if !channel.has_flow() {
            cleared += 1;
        }
        match upstream.and_then(|link| link.target(current)) {
            Some(next) => current = next,
            None => break,
        }
    }

    debug!("Break at {} (count {}) cleared {} channels", pos, count, cleared);
    cleared
}

/// Whether the chain of links from `pos` up to a crucible is interrupted.
///
/// Every hop must land on a channel (or, from the root channel, on a
/// crucible) and a drop must pass only through empty cells. A node without a
/// link counts as broken. Read-only.
pub fn link_is_broken<W: FlowWorld + ?Sized>(world: &W, pos: Position) -> bool {
    let Some(mut link) = flow_source_of(world, pos) else {
        return true;
    };

    let mut visited = HashSet::new();
    let mut current = pos;
    loop {
        if !visited.insert(current) {
            // A loop never reaches a crucible.
            return true;
        }
        if link.intermediate(current).any(|p| !world.cell_is_empty(p)) {
            return true;
        }

        let Some(upstream) = link.target(current) else {
            return true;
        };
        let is_root = world.conduit(current).is_some_and(|c| !c.is_from_conduit());
        if is_root {
            return world.node_kind(upstream) != NodeKind::Source;
        }

        let Some(next) = world.conduit(upstream).and_then(|c| c.flow_source()) else {
            return true;
        };
        current = upstream;
        link = next;
    }
}

/// Removes the mold table's source and releases its path upstream.
///
/// Returns the number of channels that went idle.
pub fn finish_flow<W: FlowWorld + ?Sized>(world: &mut W, sink: Position) -> usize {
    let Some(link) = world.sink_mut(sink).and_then(|table| table.take_link()) else {
        return 0;
    };
    match link.flow_source.target(sink) {
        Some(upstream) => notify_broken_link(world, upstream, 1),
        None => 0,
    }
}

/// Destroys a channel, releasing every path that ran through it.
pub fn remove_conduit<W: FlowWorld + ?Sized>(world: &mut W, pos: Position) -> usize {
    let Some(channel) = world.conduit(pos) else {
        return 0;
    };
    let ref_count = channel.ref_count();
    let cleared = if ref_count > 0 {
        notify_broken_link(world, pos, ref_count)
    } else {
        0
    };
    world.remove(pos);
    cleared
}

/// Destroys a mold table, finishing its flow first.
pub fn remove_sink<W: FlowWorld + ?Sized>(world: &mut W, pos: Position) -> usize {
    if !world.is_sink(pos) {
        return 0;
    }
    let cleared = finish_flow(world, pos);
    world.remove(pos);
    cleared
}

/// Sides the channel at `pos` visually connects to.
///
/// Flow never climbs, so Up is never a connection.
pub fn connections<W: FlowWorld + ?Sized>(
    world: &W,
    pos: Position,
    max_drop: u8,
) -> Vec<Direction> {
    let mut sides = Vec::new();
    for dir in Direction::ALL {
        if dir == Direction::Up {
            continue;
        }
        let reach = if dir == Direction::Down { max_drop as i32 } else { 1 };
        for distance in 1..=reach {
            let Some(cell) = pos.checked_relative(dir, distance) else {
                break;
            };
            match world.node_kind(cell) {
                NodeKind::Conduit | NodeKind::Source | NodeKind::Sink => {
                    sides.push(dir);
                    break;
                }
                NodeKind::Empty => continue,
                NodeKind::Other => break,
            }
        }
    }
    sides
}

/// Link of the channel or mold table at `pos`, if it has one.
pub fn flow_source_of<W: FlowWorld + ?Sized>(world: &W, pos: Position) -> Option<FlowLink> {
    match world.node_kind(pos) {
        NodeKind::Conduit => world.conduit(pos).and_then(|c| c.flow_source()),
        NodeKind::Sink => world.sink(pos).and_then(|t| t.link()).map(|l| l.flow_source),
        _ => None,
    }
}
