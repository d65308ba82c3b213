//! Sugiyama-style layered layout.
//!
//! 1. Layer assignment: longest path from the roots along a Kahn topological order
//! 2. Crossing reduction: alternating barycenter sweeps
//! 3. Coordinate assignment: each rank packed left to right and centered
//!    on the widest rank; ranks stacked top to bottom

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use mystery_model::{ClueId, Edge};

use super::{LayeredLayout, LayoutConfig, LayoutNode, Position};
use crate::error::LayoutError;

/// The built-in layered layout.
#[derive(Debug, Clone, Default)]
pub struct SugiyamaLayout {
    config: LayoutConfig,
}

impl SugiyamaLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }
}

impl LayeredLayout for SugiyamaLayout {
    fn compute(
        &self,
        nodes: &[LayoutNode],
        edges: &[Edge],
        _hints: &HashMap<ClueId, Position>,
    ) -> Result<HashMap<ClueId, Position>, LayoutError> {
        if nodes.is_empty() {
            return Ok(HashMap::new());
        }

        let graph = IndexedGraph::new(nodes, edges);
        let order = graph.topological_order()?;
        let layer_of = graph.assign_layers(&order);
        let mut layers = group_by_layer(&layer_of);

        order_by_barycenter(&mut layers, &graph, self.config.barycenter_iterations);

        Ok(self.assign_coordinates(nodes, &layers))
    }
}

impl SugiyamaLayout {
    fn assign_coordinates(
        &self,
        nodes: &[LayoutNode],
        layers: &[Vec<usize>],
    ) -> HashMap<ClueId, Position> {
        let spacing = self.config.node_spacing;
        let layer_width = |layer: &Vec<usize>| -> f64 {
            let boxes: f64 = layer.iter().map(|&v| nodes[v].width).sum();
            boxes + layer.len().saturating_sub(1) as f64 * spacing
        };
        let max_width = layers
            .iter()
            .map(|layer| layer_width(layer))
            .fold(0.0, f64::max);

        let mut positions = HashMap::with_capacity(nodes.len());
        let mut y = 0.0;

        for layer in layers {
            let mut x = (max_width - layer_width(layer)) / 2.0;
            let mut tallest: f64 = 0.0;

            for &v in layer {
                positions.insert(nodes[v].id, Position::new(x, y));
                x += nodes[v].width + spacing;
                tallest = tallest.max(nodes[v].height);
            }

            y += tallest + self.config.rank_spacing;
        }

        positions
    }
}

/// Adjacency over node indices, restricted to edges between the given nodes.
struct IndexedGraph<'a> {
    nodes: &'a [LayoutNode],
    children: Vec<Vec<usize>>,
    parents: Vec<Vec<usize>>,
}

impl<'a> IndexedGraph<'a> {
    fn new(nodes: &'a [LayoutNode], edges: &[Edge]) -> Self {
        let index: HashMap<ClueId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id, idx))
            .collect();

        let mut children = vec![Vec::new(); nodes.len()];
        let mut parents = vec![Vec::new(); nodes.len()];

        for edge in edges {
            let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target)) else {
                continue;
            };
            children[from].push(to);
            parents[to].push(from);
        }

        Self {
            nodes,
            children,
            parents,
        }
    }

    /// Kahn's algorithm. Any node left over sits on a cycle.
    fn topological_order(&self) -> Result<Vec<usize>, LayoutError> {
        let n = self.nodes.len();
        let mut indegree: Vec<usize> = self.parents.iter().map(Vec::len).collect();
        let mut queue: VecDeque<usize> = (0..n).filter(|&v| indegree[v] == 0).collect();
        let mut order = Vec::with_capacity(n);

        while let Some(v) = queue.pop_front() {
            order.push(v);
            for &child in &self.children[v] {
                indegree[child] -= 1;
                if indegree[child] == 0 {
                    queue.push_back(child);
                }
            }
        }

        if order.len() < n {
            let stuck = (0..n).find(|&v| indegree[v] > 0).unwrap_or(0);
            return Err(LayoutError::Cyclic(self.nodes[stuck].id));
        }

        Ok(order)
    }

    /// Longest-path layering: a node sits one rank below its deepest parent.
    fn assign_layers(&self, order: &[usize]) -> Vec<usize> {
        let mut layer = vec![0; self.nodes.len()];
        for &v in order {
            layer[v] = self.parents[v]
                .iter()
                .map(|&p| layer[p] + 1)
                .max()
                .unwrap_or(0);
        }
        layer
    }
}

/// Group node indices by layer, keeping input order inside each layer.
fn group_by_layer(layer_of: &[usize]) -> Vec<Vec<usize>> {
    let depth = layer_of.iter().copied().max().unwrap_or(0);
    let mut layers = vec![Vec::new(); depth + 1];
    for (v, &layer) in layer_of.iter().enumerate() {
        layers[layer].push(v);
    }
    layers
}

/// Reorder each layer by the mean order of its neighbours, sweeping down
/// (using parents) and up (using children) alternately.
fn order_by_barycenter(layers: &mut [Vec<usize>], graph: &IndexedGraph<'_>, iterations: usize) {
    let mut order = vec![0.0; graph.nodes.len()];
    for layer in layers.iter() {
        for (rank, &v) in layer.iter().enumerate() {
            order[v] = rank as f64;
        }
    }

    for iteration in 0..iterations {
        let downward = iteration % 2 == 0;
        let sweep: Vec<usize> = if downward {
            (1..layers.len()).collect()
        } else {
            (0..layers.len().saturating_sub(1)).rev().collect()
        };

        for layer_idx in sweep {
            let mut keyed: Vec<(usize, f64)> = layers[layer_idx]
                .iter()
                .map(|&v| {
                    let neighbours = if downward {
                        &graph.parents[v]
                    } else {
                        &graph.children[v]
                    };
                    let barycenter = if neighbours.is_empty() {
                        order[v]
                    } else {
                        neighbours.iter().map(|&u| order[u]).sum::<f64>() / neighbours.len() as f64
                    };
                    (v, barycenter)
                })
                .collect();

            keyed.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

            layers[layer_idx] = keyed.iter().map(|(v, _)| *v).collect();
            for (rank, &v) in layers[layer_idx].iter().enumerate() {
                order[v] = rank as f64;
            }
        }
    }
}
