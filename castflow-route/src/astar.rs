use crate::error::RouteError;

/// Finds the shortest path between two nodes using A*.
///
/// `graph` is an adjacency matrix where `graph[x][y]` is the weight of the
/// edge from `x` to `y`, or 0 if there is none. `heuristic[x][y]` must never
/// exceed the real distance, e.g. straight-line distance.
///
/// Returns the path from `goal` to `start`, both included.
pub fn a_star(
    graph: &[Vec<u32>],
    heuristic: &[Vec<f64>],
    start: usize,
    goal: usize,
) -> Result<Vec<usize>, RouteError> {
    let len = graph.len();

    let mut distances = vec![u32::MAX; len];
    distances[start] = 0;

    let mut parent = vec![start; len];

    // Start is the first to be expanded.
    let mut priorities = vec![f64::INFINITY; len];
    priorities[start] = heuristic[start][goal];

    let mut visited = vec![false; len];

    loop {
        // Lowest priority among unvisited nodes; ties go to the lowest index.
        let mut lowest_priority = f64::INFINITY;
        let mut lowest = None;
        for (i, &priority) in priorities.iter().enumerate() {
            if priority < lowest_priority && !visited[i] {
                lowest_priority = priority;
                lowest = Some(i);
            }
        }

        let Some(current) = lowest else {
            return Err(RouteError::Disconnected { start, goal });
        };

        if current == goal {
            let mut path = Vec::new();
            let mut index = current;
            while index != start {
                path.push(index);
                index = parent[index];
            }
            path.push(start);
            return Ok(path);
        }

        for (i, &weight) in graph[current].iter().enumerate() {
            if weight == 0 || visited[i] {
                continue;
            }
            let candidate = distances[current].saturating_add(weight);
            if candidate < distances[i] {
                distances[i] = candidate;
                parent[i] = current;
                priorities[i] = candidate as f64 + heuristic[i][goal];
            }
        }

        visited[current] = true;
    }
}
