//! Render model handed to the canvas.

use serde::Serialize;

use mystery_model::{ClueId, NpcId, TreeIssues};

use crate::layout::{LayoutSource, Position, VisibleFields};
use crate::pending::TransactionState;

/// A visible clue box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: ClueId,
    pub name: String,
    pub clue_type: String,
    pub npc_id: NpcId,
    pub detail: Option<String>,
    pub trigger_keywords: Option<Vec<String>>,
    /// Prerequisites in effect, staged entries included.
    pub prereq_clue_ids: Vec<ClueId>,
    /// Source of at least one effective edge, whatever the collapse state.
    pub has_children: bool,
    pub collapsed: bool,
    /// Size of the hidden sub-tree, zero unless collapsed.
    pub hidden_descendants: usize,
    /// `None` until a layout for the current state has been applied.
    pub position: Option<Position>,
}

/// A visible prerequisite edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    pub source: ClueId,
    pub target: ClueId,
    /// Not yet committed.
    pub staged: bool,
}

/// Everything the canvas draws for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
    pub issues: TreeIssues,
    pub fields: VisibleFields,
    pub state: TransactionState,
    pub pending_count: usize,
    pub layout_source: Option<LayoutSource>,
}

impl GraphView {
    pub fn node(&self, id: ClueId) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn staged_edges(&self) -> impl Iterator<Item = &EdgeView> {
        self.edges.iter().filter(|edge| edge.staged)
    }
}
