//! Clue-tree snapshots - the DAG handed out by `GET /scripts/{id}/clue-tree`.

use serde::{Deserialize, Serialize};

use crate::clue::ClueNode;
use crate::ids::ClueId;

/// A dependency edge: `source` must be unlocked before `target`.
///
/// Edges are never stored on their own. They are the image of every
/// clue's `prereq_clue_ids`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: ClueId,
    pub target: ClueId,
}

impl Edge {
    /// Create a new edge.
    pub fn new(source: ClueId, target: ClueId) -> Self {
        Self { source, target }
    }

    /// Check if this edge points a clue at itself.
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Integrity diagnostics computed by the server.
///
/// These are displayed as-is and never recomputed by the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeIssues {
    /// Clues that can never be unlocked.
    #[serde(default)]
    pub dead_clues: Vec<ClueId>,

    /// Clues with no prerequisites and no dependents.
    #[serde(default)]
    pub orphan_clues: Vec<ClueId>,

    /// Dependency cycles, each listed as the clue ids along the loop.
    #[serde(default)]
    pub cycles: Vec<Vec<ClueId>>,
}

impl TreeIssues {
    /// Check if the server reported no problems at all.
    pub fn is_clean(&self) -> bool {
        self.dead_clues.is_empty() && self.orphan_clues.is_empty() && self.cycles.is_empty()
    }

    /// Total number of reported problems.
    pub fn count(&self) -> usize {
        self.dead_clues.len() + self.orphan_clues.len() + self.cycles.len()
    }
}

/// A full clue-tree snapshot for one script (optionally one scene).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClueTree {
    pub nodes: Vec<ClueNode>,

    #[serde(default)]
    pub edges: Vec<Edge>,

    #[serde(default)]
    pub issues: TreeIssues,
}

impl ClueTree {
    /// Build a snapshot from clues, deriving the edge list from their prerequisites.
    pub fn from_nodes(nodes: Vec<ClueNode>) -> Self {
        let edges = nodes.iter().flat_map(ClueNode::incoming_edges).collect();
        Self {
            nodes,
            edges,
            issues: TreeIssues::default(),
        }
    }

    /// Attach server diagnostics.
    pub fn with_issues(mut self, issues: TreeIssues) -> Self {
        self.issues = issues;
        self
    }

    /// Check if the snapshot has no clues.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
