//! Deterministic grid placement used when auto-layout is unavailable.

use std::collections::HashMap;

use mystery_model::ClueId;

use super::{LayoutConfig, LayoutNode, Position};

/// Place nodes row by row: column `index % columns`, row `index / columns`.
///
/// Cells are sized to the largest box so no two boxes overlap.
pub fn grid_layout(nodes: &[LayoutNode], config: &LayoutConfig) -> HashMap<ClueId, Position> {
    let columns = config.fallback_columns.max(1);
    let cell_width = nodes.iter().map(|n| n.width).fold(0.0, f64::max) + config.fallback_gap;
    let cell_height = nodes.iter().map(|n| n.height).fold(0.0, f64::max) + config.fallback_gap;

    nodes
        .iter()
        .enumerate()
        .map(|(index, node)| {
            let column = (index % columns) as f64;
            let row = (index / columns) as f64;
            (node.id, Position::new(column * cell_width, row * cell_height))
        })
        .collect()
}
