//! In-memory backend - a server stand-in holding clues per script.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use mystery_model::{
    ApiError, ApiResult, ClueId, ClueNode, ClueTree, Edge, SceneId, ScriptId, TreeIssues,
};

use super::{DependencyWriter, TreeDataSource};
use crate::graph::CycleDetector;

#[derive(Debug, Default)]
struct StoreInner {
    /// Script -> its clues, in insertion order.
    scripts: HashMap<ScriptId, Vec<ClueId>>,
    clues: HashMap<ClueId, ClueNode>,
    scenes: HashMap<ClueId, SceneId>,
    failing: HashSet<ClueId>,
    unavailable: bool,
    fetches: usize,
    updates: usize,
}

/// Clue storage answering tree fetches and dependency writes.
///
/// Integrity issues are computed on every fetch the way a server would.
/// Failures can be injected per clue or for the whole store.
#[derive(Debug, Default)]
pub struct InMemoryClueStore {
    inner: Mutex<StoreInner>,
}

impl InMemoryClueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add (or replace) the clues of a script.
    pub fn insert_script(&self, script: ScriptId, clues: Vec<ClueNode>) {
        let mut inner = self.lock();
        let ids = clues.iter().map(|clue| clue.id).collect();
        for clue in clues {
            inner.clues.insert(clue.id, clue);
        }
        inner.scripts.insert(script, ids);
    }

    /// Place a clue in a scene, for scene-filtered fetches.
    pub fn assign_scene(&self, clue: ClueId, scene: SceneId) {
        self.lock().scenes.insert(clue, scene);
    }

    /// Current stored state of a clue.
    pub fn clue(&self, id: ClueId) -> Option<ClueNode> {
        self.lock().clues.get(&id).cloned()
    }

    /// Current stored clues of a script.
    pub fn clues(&self, script: ScriptId) -> Vec<ClueNode> {
        let inner = self.lock();
        inner
            .scripts
            .get(&script)
            .map(|ids| ids.iter().filter_map(|id| inner.clues.get(id)).cloned().collect())
            .unwrap_or_default()
    }

    /// Make every dependency write to `id` fail.
    pub fn fail_updates_for(&self, id: ClueId) {
        self.lock().failing.insert(id);
    }

    /// Stop injecting write failures.
    pub fn clear_failures(&self) {
        self.lock().failing.clear();
    }

    /// Simulate the backend being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Number of tree fetches served.
    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    /// Number of successful dependency writes.
    pub fn update_count(&self) -> usize {
        self.lock().updates
    }
}

#[async_trait]
impl TreeDataSource for InMemoryClueStore {
    async fn get_tree(&self, script_id: ScriptId, scene_id: Option<SceneId>) -> ApiResult<ClueTree> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(ApiError::Transport("backend unavailable".to_string()));
        }
        inner.fetches += 1;

        let ids = inner
            .scripts
            .get(&script_id)
            .ok_or(ApiError::ScriptNotFound(script_id))?;

        let nodes: Vec<ClueNode> = ids
            .iter()
            .filter(|id| match scene_id {
                Some(scene) => inner.scenes.get(*id) == Some(&scene),
                None => true,
            })
            .filter_map(|id| inner.clues.get(id))
            .cloned()
            .collect();

        let present: HashSet<ClueId> = nodes.iter().map(|clue| clue.id).collect();
        let edges: Vec<Edge> = nodes
            .iter()
            .flat_map(ClueNode::incoming_edges)
            .filter(|edge| present.contains(&edge.source))
            .collect();
        let issues = compute_issues(&nodes, &edges);

        Ok(ClueTree {
            nodes,
            edges,
            issues,
        })
    }
}

#[async_trait]
impl DependencyWriter for InMemoryClueStore {
    async fn update_dependencies(&self, clue_id: ClueId, prereq_ids: Vec<ClueId>) -> ApiResult<ClueNode> {
        let mut inner = self.lock();
        if inner.unavailable {
            return Err(ApiError::Transport("backend unavailable".to_string()));
        }
        if inner.failing.contains(&clue_id) {
            return Err(ApiError::Http {
                status: 500,
                message: format!("injected failure for {}", clue_id),
            });
        }
        if prereq_ids.contains(&clue_id) {
            return Err(ApiError::Rejected(format!("{} lists itself as prerequisite", clue_id)));
        }

        let clue = inner
            .clues
            .get_mut(&clue_id)
            .ok_or(ApiError::NotFound(clue_id))?;
        clue.prereq_clue_ids = prereq_ids;
        let updated = clue.clone();
        inner.updates += 1;

        tracing::trace!(clue = %clue_id, "Stored prerequisite list");
        Ok(updated)
    }
}

/// Integrity diagnostics for a snapshot.
///
/// - orphan: no prerequisites and nothing depends on it
/// - dead: lists a prerequisite that is not in the snapshot
/// - cycles: loops in the prerequisite relation
pub fn compute_issues(nodes: &[ClueNode], edges: &[Edge]) -> TreeIssues {
    let present: HashSet<ClueId> = nodes.iter().map(|clue| clue.id).collect();
    let depended_on: HashSet<ClueId> = edges.iter().map(|edge| edge.source).collect();

    let orphan_clues = nodes
        .iter()
        .filter(|clue| clue.prereq_clue_ids.is_empty() && !depended_on.contains(&clue.id))
        .map(|clue| clue.id)
        .collect();

    let dead_clues = nodes
        .iter()
        .filter(|clue| clue.prereq_clue_ids.iter().any(|id| !present.contains(id)))
        .map(|clue| clue.id)
        .collect();

    let ids: Vec<ClueId> = nodes.iter().map(|clue| clue.id).collect();
    let cycles = CycleDetector::find_cycles(&ids, edges);

    TreeIssues {
        dead_clues,
        orphan_clues,
        cycles,
    }
}
