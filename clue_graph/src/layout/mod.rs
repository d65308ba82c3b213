//! Layout engine - places visible clues on the canvas.
//!
//! Placement policy:
//! 1. **Saved**: every visible clue has a user-dragged position, use those as-is
//! 2. **Computed**: otherwise run the layered algorithm top-to-bottom and pin
//!    whatever saved positions exist on top of its result
//! 3. **Fallback**: if the algorithm fails, times out or leaves a clue
//!    unplaced, fall back to a deterministic grid so nothing renders without
//!    coordinates

mod grid;
mod layered;
mod task;

pub use grid::*;
pub use layered::*;
pub use task::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use mystery_model::{ClueId, Edge};

use crate::error::LayoutError;

/// A point on the canvas (top-left corner of a clue box).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Configuration for node sizing, the layered algorithm and the fallback grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Width of every clue box.
    pub base_width: f64,

    /// Height of a clue box showing only its name.
    pub base_height: f64,

    /// Extra height per visible field row.
    pub row_height: f64,

    /// Minimum horizontal gap between boxes in the same rank.
    pub node_spacing: f64,

    /// Vertical gap between ranks.
    pub rank_spacing: f64,

    /// Number of barycenter sweeps for crossing reduction.
    pub barycenter_iterations: usize,

    /// Columns of the fallback grid.
    pub fallback_columns: usize,

    /// Gap between fallback grid cells.
    pub fallback_gap: f64,

    /// Budget for a background layout run, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            base_width: 220.0,
            base_height: 56.0,
            row_height: 22.0,
            node_spacing: 40.0,
            rank_spacing: 80.0,
            barycenter_iterations: 4,
            fallback_columns: 4,
            fallback_gap: 40.0,
            timeout_ms: 2_000,
        }
    }
}

impl LayoutConfig {
    /// Box size of a clue showing the given fields.
    pub fn node_size(&self, fields: &VisibleFields) -> (f64, f64) {
        (
            self.base_width,
            self.base_height + fields.count() as f64 * self.row_height,
        )
    }
}

/// Optional rows shown on each clue box, below the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibleFields {
    pub clue_type: bool,
    pub npc: bool,
    pub detail: bool,
    pub trigger_keywords: bool,
    pub prerequisites: bool,
}

impl Default for VisibleFields {
    fn default() -> Self {
        Self {
            clue_type: true,
            npc: true,
            detail: false,
            trigger_keywords: false,
            prerequisites: false,
        }
    }
}

impl VisibleFields {
    /// Only the name row.
    pub fn none() -> Self {
        Self {
            clue_type: false,
            npc: false,
            detail: false,
            trigger_keywords: false,
            prerequisites: false,
        }
    }

    /// Number of visible field rows.
    pub fn count(&self) -> usize {
        [
            self.clue_type,
            self.npc,
            self.detail,
            self.trigger_keywords,
            self.prerequisites,
        ]
        .into_iter()
        .filter(|shown| *shown)
        .count()
    }
}

/// A clue box to place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutNode {
    pub id: ClueId,
    pub width: f64,
    pub height: f64,
}

/// Everything one layout run needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutInput {
    /// Visible clues, in display order.
    pub nodes: Vec<LayoutNode>,
    /// Edges between visible clues.
    pub edges: Vec<Edge>,
    /// User-dragged positions; may cover any subset of clues.
    pub saved: HashMap<ClueId, Position>,
}

impl LayoutInput {
    /// Check if every clue to place has a saved position.
    pub fn fully_saved(&self) -> bool {
        self.nodes.iter().all(|node| self.saved.contains_key(&node.id))
    }
}

/// Where a set of positions came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutSource {
    Saved,
    Computed,
    Fallback,
}

/// Positions for every clue of a [`LayoutInput`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOutcome {
    pub positions: HashMap<ClueId, Position>,
    pub source: LayoutSource,
}

/// A layered (hierarchical) graph-drawing algorithm.
pub trait LayeredLayout: Send + Sync {
    /// Place `nodes` top-to-bottom following `edges`.
    ///
    /// `hints` are saved positions the algorithm may take into account.
    fn compute(
        &self,
        nodes: &[LayoutNode],
        edges: &[Edge],
        hints: &HashMap<ClueId, Position>,
    ) -> Result<HashMap<ClueId, Position>, LayoutError>;
}

/// Applies the placement policy around a [`LayeredLayout`].
pub struct LayoutEngine {
    config: LayoutConfig,
    algorithm: Box<dyn LayeredLayout>,
}

impl std::fmt::Debug for LayoutEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl LayoutEngine {
    /// Create an engine backed by the built-in Sugiyama layout.
    pub fn new(config: LayoutConfig) -> Self {
        let algorithm = Box::new(SugiyamaLayout::new(config.clone()));
        Self { config, algorithm }
    }

    /// Create an engine backed by a custom algorithm.
    pub fn with_algorithm(config: LayoutConfig, algorithm: impl LayeredLayout + 'static) -> Self {
        Self {
            config,
            algorithm: Box::new(algorithm),
        }
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Place every clue of `input`. Never fails.
    pub fn layout(&self, input: &LayoutInput) -> LayoutOutcome {
        if input.fully_saved() {
            let positions = input
                .nodes
                .iter()
                .filter_map(|node| input.saved.get(&node.id).map(|pos| (node.id, *pos)))
                .collect();
            return LayoutOutcome {
                positions,
                source: LayoutSource::Saved,
            };
        }

        match self.algorithm.compute(&input.nodes, &input.edges, &input.saved) {
            Ok(mut positions) => {
                let missing = input
                    .nodes
                    .iter()
                    .filter(|node| !positions.contains_key(&node.id))
                    .count();
                if missing > 0 {
                    return self.fallback(input, &LayoutError::Incomplete(missing));
                }

                positions.retain(|id, _| input.nodes.iter().any(|node| node.id == *id));
                pin_saved(&mut positions, input);

                LayoutOutcome {
                    positions,
                    source: LayoutSource::Computed,
                }
            }
            Err(err) => self.fallback(input, &err),
        }
    }

    /// Grid placement used when the algorithm cannot deliver.
    pub fn fallback(&self, input: &LayoutInput, reason: &LayoutError) -> LayoutOutcome {
        tracing::warn!(error = %reason, nodes = input.nodes.len(), "Auto-layout failed, using grid placement");

        let mut positions = grid_layout(&input.nodes, &self.config);
        pin_saved(&mut positions, input);

        LayoutOutcome {
            positions,
            source: LayoutSource::Fallback,
        }
    }
}

fn pin_saved(positions: &mut HashMap<ClueId, Position>, input: &LayoutInput) {
    for node in &input.nodes {
        if let Some(saved) = input.saved.get(&node.id) {
            positions.insert(node.id, *saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl LayeredLayout for Failing {
        fn compute(
            &self,
            _nodes: &[LayoutNode],
            _edges: &[Edge],
            _hints: &HashMap<ClueId, Position>,
        ) -> Result<HashMap<ClueId, Position>, LayoutError> {
            Err(LayoutError::Worker("boom".to_string()))
        }
    }

    /// Places only the first node.
    struct Forgetful;

    impl LayeredLayout for Forgetful {
        fn compute(
            &self,
            nodes: &[LayoutNode],
            _edges: &[Edge],
            _hints: &HashMap<ClueId, Position>,
        ) -> Result<HashMap<ClueId, Position>, LayoutError> {
            Ok(nodes.iter().take(1).map(|n| (n.id, Position::default())).collect())
        }
    }

    fn input(n: usize) -> LayoutInput {
        let config = LayoutConfig::default();
        let (width, height) = config.node_size(&VisibleFields::default());
        let nodes: Vec<LayoutNode> = (0..n)
            .map(|_| LayoutNode {
                id: ClueId::new(),
                width,
                height,
            })
            .collect();
        let edges = nodes
            .windows(2)
            .map(|pair| Edge::new(pair[0].id, pair[1].id))
            .collect();
        LayoutInput {
            nodes,
            edges,
            saved: HashMap::new(),
        }
    }

    #[test]
    fn test_node_size_grows_with_fields() {
        let config = LayoutConfig::default();
        assert_eq!(config.node_size(&VisibleFields::none()), (220.0, 56.0));
        assert_eq!(config.node_size(&VisibleFields::default()), (220.0, 100.0));
    }

    #[test]
    fn test_fully_saved_skips_algorithm() {
        let mut input = input(3);
        for (i, node) in input.nodes.iter().enumerate() {
            input.saved.insert(node.id, Position::new(i as f64, 7.0));
        }

        let engine = LayoutEngine::with_algorithm(LayoutConfig::default(), Failing);
        let outcome = engine.layout(&input);
        assert_eq!(outcome.source, LayoutSource::Saved);
        assert_eq!(outcome.positions[&input.nodes[2].id], Position::new(2.0, 7.0));
    }

    #[test]
    fn test_partial_saved_positions_are_pinned() {
        let mut input = input(3);
        let pinned = input.nodes[1].id;
        input.saved.insert(pinned, Position::new(-500.0, -500.0));
        input.saved.insert(ClueId::new(), Position::new(1.0, 1.0));

        let outcome = LayoutEngine::default().layout(&input);
        assert_eq!(outcome.source, LayoutSource::Computed);
        assert_eq!(outcome.positions.len(), 3);
        assert_eq!(outcome.positions[&pinned], Position::new(-500.0, -500.0));
    }

    #[test]
    fn test_failure_falls_back_to_grid() {
        let input = input(6);
        let engine = LayoutEngine::with_algorithm(LayoutConfig::default(), Failing);

        let outcome = engine.layout(&input);
        assert_eq!(outcome.source, LayoutSource::Fallback);
        assert_eq!(outcome.positions.len(), 6);
        // index 5 -> column 1, row 1 with four columns
        let fifth = outcome.positions[&input.nodes[5].id];
        assert_eq!(fifth, Position::new(260.0, 140.0));
    }

    #[test]
    fn test_incomplete_result_falls_back() {
        let input = input(3);
        let engine = LayoutEngine::with_algorithm(LayoutConfig::default(), Forgetful);
        assert_eq!(engine.layout(&input).source, LayoutSource::Fallback);
    }

    #[test]
    fn test_empty_input() {
        let outcome = LayoutEngine::default().layout(&LayoutInput::default());
        assert!(outcome.positions.is_empty());
    }
}
