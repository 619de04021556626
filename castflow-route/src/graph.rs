use std::collections::HashMap;

use castflow_grid::Position;

use crate::astar::a_star;
use crate::discover::Discovery;
use crate::error::RouteError;

/// Dense graph over one discovered network.
///
/// Channels come first in discovery order (the root channel is index 0),
/// followed by the mold tables that survived filtering. Channels are joined
/// both ways, a channel is joined to a mold table one way only, so a path
/// from the root never crosses another mold table.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: Vec<Position>,
    index: HashMap<Position, usize>,
    costs: Vec<Vec<u32>>,
    heuristic: Vec<Vec<f64>>,
}

impl FlowGraph {
    pub const ROOT: usize = 0;

    pub fn build(discovery: &Discovery) -> Self {
        let nodes: Vec<Position> = discovery
            .conduits
            .iter()
            .chain(discovery.sinks.iter())
            .copied()
            .collect();
        let index: HashMap<Position, usize> =
            nodes.iter().enumerate().map(|(i, &p)| (p, i)).collect();

        let len = nodes.len();
        let mut costs = vec![vec![0u32; len]; len];
        let mut heuristic = vec![vec![0f64; len]; len];

        for &channel in &discovery.conduits {
            let Some(neighbors) = discovery.neighbors.get(&channel) else {
                continue;
            };
            let x = index[&channel];

            for neighbor in neighbors {
                // Might not be there if the mold table was filtered out
                let Some(&y) = index.get(neighbor) else {
                    continue;
                };
                costs[x][y] = 1;
                if heuristic[x][y] == 0.0 {
                    let distance = channel.distance(*neighbor);
                    heuristic[x][y] = distance;
                    heuristic[y][x] = distance;
                }
            }
        }

        Self {
            nodes,
            index,
            costs,
            heuristic,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn index_of(&self, pos: Position) -> Option<usize> {
        self.index.get(&pos).copied()
    }

    pub fn position(&self, index: usize) -> Position {
        self.nodes[index]
    }

    pub fn costs(&self) -> &[Vec<u32>] {
        &self.costs
    }

    pub fn heuristic(&self) -> &[Vec<f64>] {
        &self.heuristic
    }

    /// Shortest path from `goal` back to the root channel, both included.
    pub fn path_from(&self, goal: Position) -> Result<Vec<Position>, RouteError> {
        let goal_index = self.index_of(goal).ok_or(RouteError::Disconnected {
            start: Self::ROOT,
            goal: usize::MAX,
        })?;
        let path = a_star(&self.costs, &self.heuristic, Self::ROOT, goal_index)?;
        Ok(path.into_iter().map(|i| self.nodes[i]).collect())
    }
}
