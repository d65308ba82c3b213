//! Graph model - normalizes a clue-tree snapshot into lookup structures.

use std::collections::{HashMap, HashSet};

use mystery_model::{ClueId, ClueNode, ClueTree, Edge, TreeIssues};

/// The committed baseline of a script's clue graph.
///
/// Built once per snapshot and never mutated; staged edits live in
/// [`PendingChangeStore`](crate::pending::PendingChangeStore) on top of it.
/// Edges are derived from each clue's `prereq_clue_ids`. Prerequisites that
/// point at clues outside the snapshot are kept on the clue (so writes
/// preserve them) but produce no edge.
#[derive(Debug, Clone, Default)]
pub struct GraphModel {
    /// Clues in snapshot order.
    nodes: Vec<ClueNode>,

    /// Index: clue id -> position in `nodes`.
    index: HashMap<ClueId, usize>,

    /// Adjacency: prerequisite -> clues it unlocks.
    edges_by_source: HashMap<ClueId, Vec<ClueId>>,

    /// Reverse adjacency: clue -> resolved prerequisites.
    edges_by_target: HashMap<ClueId, Vec<ClueId>>,

    issues: TreeIssues,
}

impl GraphModel {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the model from a server snapshot.
    ///
    /// The node prerequisite lists are authoritative. A reported edge list
    /// that disagrees with them is logged and otherwise ignored.
    pub fn from_tree(tree: ClueTree) -> Self {
        let ClueTree {
            nodes,
            edges,
            issues,
        } = tree;
        let model = Self::build(nodes, issues);

        if !edges.is_empty() {
            let derived: HashSet<Edge> = model.edges().collect();
            let reported: HashSet<Edge> = edges.into_iter().collect();
            if derived != reported {
                tracing::warn!(
                    derived = derived.len(),
                    reported = reported.len(),
                    "Snapshot edge list disagrees with prerequisite lists, using prerequisites"
                );
            }
        }

        model
    }

    /// Build the model from clues alone.
    pub fn from_nodes(nodes: Vec<ClueNode>) -> Self {
        Self::build(nodes, TreeIssues::default())
    }

    fn build(mut nodes: Vec<ClueNode>, issues: TreeIssues) -> Self {
        let mut seen = HashSet::with_capacity(nodes.len());
        nodes.retain(|node| {
            let fresh = seen.insert(node.id);
            if !fresh {
                tracing::warn!(clue = %node.id, "Dropping repeated clue in snapshot");
            }
            fresh
        });

        for node in &mut nodes {
            let removed = node.dedup_prerequisites();
            if removed > 0 {
                tracing::warn!(clue = %node.id, removed, "Removed repeated prerequisites");
            }
        }

        let index: HashMap<ClueId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id, idx))
            .collect();

        let mut edges_by_source: HashMap<ClueId, Vec<ClueId>> = HashMap::new();
        let mut edges_by_target: HashMap<ClueId, Vec<ClueId>> = HashMap::new();

        for node in &nodes {
            for &prereq in &node.prereq_clue_ids {
                if !index.contains_key(&prereq) {
                    tracing::debug!(clue = %node.id, %prereq, "Prerequisite outside snapshot");
                    continue;
                }
                edges_by_source.entry(prereq).or_default().push(node.id);
                edges_by_target.entry(node.id).or_default().push(prereq);
            }
        }

        Self {
            nodes,
            index,
            edges_by_source,
            edges_by_target,
            issues,
        }
    }

    /// Get a clue by id.
    pub fn node(&self, id: ClueId) -> Option<&ClueNode> {
        self.index.get(&id).map(|&idx| &self.nodes[idx])
    }

    /// Check if a clue is part of the snapshot.
    pub fn contains(&self, id: ClueId) -> bool {
        self.index.contains_key(&id)
    }

    /// All clues in snapshot order.
    pub fn nodes(&self) -> &[ClueNode] {
        &self.nodes
    }

    /// All clue ids in snapshot order.
    pub fn node_ids(&self) -> impl Iterator<Item = ClueId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    /// Number of clues.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no clues.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clues directly unlocked by `id`.
    pub fn children(&self, id: ClueId) -> &[ClueId] {
        self.edges_by_source
            .get(&id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Prerequisites of `id` that resolve to clues in the snapshot.
    pub fn parents(&self, id: ClueId) -> &[ClueId] {
        self.edges_by_target
            .get(&id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The committed prerequisite list of `id`, exactly as stored.
    pub fn prerequisites(&self, id: ClueId) -> &[ClueId] {
        self.node(id)
            .map(|node| node.prereq_clue_ids.as_slice())
            .unwrap_or(&[])
    }

    /// True iff `id` is the source of at least one edge.
    pub fn has_children(&self, id: ClueId) -> bool {
        !self.children(id).is_empty()
    }

    /// All committed edges, grouped by target in snapshot order.
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.nodes.iter().flat_map(move |node| {
            self.parents(node.id)
                .iter()
                .map(move |&prereq| Edge::new(prereq, node.id))
        })
    }

    /// Number of committed edges.
    pub fn edge_count(&self) -> usize {
        self.edges_by_target.values().map(Vec::len).sum()
    }

    /// Server-side integrity diagnostics for this snapshot.
    pub fn issues(&self) -> &TreeIssues {
        &self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (ClueNode, ClueNode, ClueNode) {
        let a = ClueNode::new("A");
        let b = ClueNode::new("B").with_prerequisite(a.id);
        let c = ClueNode::new("C").with_prerequisite(b.id).with_prerequisite(a.id);
        (a, b, c)
    }

    #[test]
    fn test_lookup_structures() {
        let (a, b, c) = chain();
        let graph = GraphModel::from_nodes(vec![a.clone(), b.clone(), c.clone()]);

        assert_eq!(graph.len(), 3);
        assert_eq!(graph.node(b.id).unwrap().name, "B");
        assert_eq!(graph.children(a.id), &[b.id, c.id]);
        assert_eq!(graph.parents(c.id), &[b.id, a.id]);
        assert_eq!(graph.edge_count(), 3);

        assert!(graph.has_children(a.id));
        assert!(graph.has_children(b.id));
        assert!(!graph.has_children(c.id));
    }

    #[test]
    fn test_edges_are_image_of_prerequisites() {
        let (a, b, c) = chain();
        let graph = GraphModel::from_nodes(vec![a.clone(), b.clone(), c.clone()]);

        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(
            edges,
            vec![
                Edge::new(a.id, b.id),
                Edge::new(b.id, c.id),
                Edge::new(a.id, c.id),
            ]
        );
    }

    #[test]
    fn test_dangling_prerequisite_is_kept_but_not_an_edge() {
        let missing = ClueId::new();
        let clue = ClueNode::new("Lonely").with_prerequisite(missing);
        let graph = GraphModel::from_nodes(vec![clue.clone()]);

        assert_eq!(graph.prerequisites(clue.id), &[missing]);
        assert!(graph.parents(clue.id).is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_normalizes_repeated_entries() {
        let a = ClueNode::new("A");
        let mut b = ClueNode::new("B");
        b.prereq_clue_ids = vec![a.id, a.id];

        let graph = GraphModel::from_nodes(vec![a.clone(), b.clone(), a.clone()]);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.prerequisites(b.id), &[a.id]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_from_tree_keeps_issues() {
        let (a, b, c) = chain();
        let issues = TreeIssues {
            orphan_clues: vec![a.id],
            ..Default::default()
        };
        let tree = ClueTree::from_nodes(vec![a.clone(), b, c]).with_issues(issues.clone());

        let graph = GraphModel::from_tree(tree);
        assert_eq!(graph.issues(), &issues);
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn test_unknown_ids() {
        let graph = GraphModel::new();
        let id = ClueId::new();
        assert!(graph.is_empty());
        assert!(!graph.contains(id));
        assert!(graph.children(id).is_empty());
        assert!(graph.prerequisites(id).is_empty());
    }
}
