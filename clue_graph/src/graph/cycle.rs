//! Cycle detection for prerequisite edges.

use std::collections::{HashMap, HashSet};

use mystery_model::{ClueId, Edge};

/// Reachability checks over an edge set.
pub struct CycleDetector;

impl CycleDetector {
    /// Decide whether adding `source -> target` to `edges` would close a cycle.
    ///
    /// `edges` must be the currently effective edge set (committed baseline
    /// with every staged prerequisite list applied). A self-loop always
    /// counts as a cycle.
    pub fn would_create_cycle(edges: &[Edge], source: ClueId, target: ClueId) -> bool {
        if source == target {
            return true;
        }

        let mut adjacency = Self::build_adjacency(edges);
        adjacency.entry(source).or_default().push(target);

        // Any path target ~> source closes the loop through the new edge.
        let mut visited = HashSet::new();
        let mut stack = vec![target];

        while let Some(node) = stack.pop() {
            if node == source {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(next) = adjacency.get(&node) {
                stack.extend(next.iter().copied().filter(|n| !visited.contains(n)));
            }
        }

        false
    }

    /// List the cycles of an edge set, each as the clue ids along the loop.
    ///
    /// Every cycle found through a DFS back edge is reported once; cycles
    /// sharing edges may be reported only partially.
    pub fn find_cycles(nodes: &[ClueId], edges: &[Edge]) -> Vec<Vec<ClueId>> {
        let adjacency = Self::build_adjacency(edges);
        let mut marks: HashMap<ClueId, Mark> = HashMap::new();
        let mut cycles = Vec::new();

        let roots = nodes
            .iter()
            .copied()
            .chain(edges.iter().map(|edge| edge.source));

        for root in roots {
            if !marks.contains_key(&root) {
                visit(root, &adjacency, &mut marks, &mut cycles);
            }
        }

        cycles
    }

    /// Check if an edge set is acyclic.
    pub fn is_acyclic(edges: &[Edge]) -> bool {
        Self::find_cycles(&[], edges).is_empty()
    }

    fn build_adjacency(edges: &[Edge]) -> HashMap<ClueId, Vec<ClueId>> {
        let mut adjacency: HashMap<ClueId, Vec<ClueId>> = HashMap::new();
        for edge in edges {
            adjacency.entry(edge.source).or_default().push(edge.target);
        }
        adjacency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Iterative DFS from `root`. Each frame is a node and the index of its next child.
fn visit(
    root: ClueId,
    adjacency: &HashMap<ClueId, Vec<ClueId>>,
    marks: &mut HashMap<ClueId, Mark>,
    cycles: &mut Vec<Vec<ClueId>>,
) {
    let mut path: Vec<ClueId> = vec![root];
    let mut frames: Vec<(ClueId, usize)> = vec![(root, 0)];
    marks.insert(root, Mark::Visiting);

    while let Some(frame) = frames.last_mut() {
        let (node, cursor) = *frame;
        let children = adjacency.get(&node).map(|v| v.as_slice()).unwrap_or(&[]);

        let Some(&next) = children.get(cursor) else {
            frames.pop();
            path.pop();
            marks.insert(node, Mark::Done);
            continue;
        };
        frame.1 += 1;

        match marks.get(&next) {
            Some(Mark::Visiting) => {
                if let Some(start) = path.iter().position(|&n| n == next) {
                    cycles.push(path[start..].to_vec());
                }
            }
            Some(Mark::Done) => {}
            None => {
                marks.insert(next, Mark::Visiting);
                path.push(next);
                frames.push((next, 0));
            }
        }
    }
}
