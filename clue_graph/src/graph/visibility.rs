//! Visibility - hides the descendant sub-trees of collapsed clues.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

use mystery_model::{ClueId, Edge};

/// The clues whose descendant sub-trees are hidden from view.
///
/// Pure view state: never sent to the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollapsedSet {
    ids: HashSet<ClueId>,
}

impl CollapsedSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collapse a clue. Returns false if it was already collapsed.
    pub fn collapse(&mut self, id: ClueId) -> bool {
        self.ids.insert(id)
    }

    /// Expand a clue. Returns false if it was not collapsed.
    pub fn expand(&mut self, id: ClueId) -> bool {
        self.ids.remove(&id)
    }

    /// Flip the collapse state. Returns true if the clue is now collapsed.
    pub fn toggle(&mut self, id: ClueId) -> bool {
        if self.ids.remove(&id) {
            false
        } else {
            self.ids.insert(id);
            true
        }
    }

    pub fn contains(&self, id: ClueId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClueId> + '_ {
        self.ids.iter().copied()
    }

    /// Forget collapsed ids that no longer satisfy `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(ClueId) -> bool) {
        self.ids.retain(|&id| keep(id));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

impl FromIterator<ClueId> for CollapsedSet {
    fn from_iter<I: IntoIterator<Item = ClueId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Result of a visibility pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visibility {
    /// Visible clues, in input order.
    pub visible: Vec<ClueId>,

    /// Clues hidden beneath at least one collapsed clue.
    pub hidden: HashSet<ClueId>,

    /// Collapsed clue -> size of its full descendant set.
    pub hidden_count_by_collapsed: HashMap<ClueId, usize>,
}

impl Visibility {
    /// Check if a clue is visible.
    pub fn is_visible(&self, id: ClueId) -> bool {
        !self.hidden.contains(&id)
    }

    /// Descendant count for the "+N hidden" badge; zero if not collapsed.
    pub fn hidden_count(&self, id: ClueId) -> usize {
        self.hidden_count_by_collapsed.get(&id).copied().unwrap_or(0)
    }

    /// Edges whose both endpoints are visible.
    pub fn visible_edges(&self, edges: &[Edge]) -> Vec<Edge> {
        let visible: HashSet<ClueId> = self.visible.iter().copied().collect();
        edges
            .iter()
            .filter(|edge| visible.contains(&edge.source) && visible.contains(&edge.target))
            .copied()
            .collect()
    }
}

/// Compute which clues stay visible under a collapsed set.
///
/// Descendants are taken over the full graph, regardless of other collapse
/// state, so nested collapses compose. A collapsed clue itself stays visible
/// unless another collapsed clue hides it. Collapsed ids outside `nodes` are
/// ignored.
pub fn compute_visibility(nodes: &[ClueId], edges: &[Edge], collapsed: &CollapsedSet) -> Visibility {
    let known: HashSet<ClueId> = nodes.iter().copied().collect();
    let mut adjacency: HashMap<ClueId, Vec<ClueId>> = HashMap::new();
    for edge in edges {
        adjacency.entry(edge.source).or_default().push(edge.target);
    }

    let mut hidden = HashSet::new();
    let mut hidden_count_by_collapsed = HashMap::new();

    for id in collapsed.iter().filter(|id| known.contains(id)) {
        let below = descendants(&adjacency, id);
        hidden_count_by_collapsed.insert(id, below.len());
        hidden.extend(below);
    }

    let visible = nodes
        .iter()
        .copied()
        .filter(|id| !hidden.contains(id))
        .collect();

    Visibility {
        visible,
        hidden,
        hidden_count_by_collapsed,
    }
}

/// Every clue reachable from `start`, excluding `start` itself.
pub fn descendants(adjacency: &HashMap<ClueId, Vec<ClueId>>, start: ClueId) -> HashSet<ClueId> {
    let mut found = HashSet::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for &child in adjacency.get(&node).map(|v| v.as_slice()).unwrap_or(&[]) {
            if child != start && found.insert(child) {
                queue.push_back(child);
            }
        }
    }

    found
}
