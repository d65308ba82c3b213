//! Pending changes - the staged edit transaction over the committed graph.
//!
//! Staged edits are held as whole replacement prerequisite lists keyed by
//! target clue. A target without an entry uses its committed baseline.
//! Entries only go away through a successful commit or a discard; an edit
//! that happens to reproduce the baseline still leaves its entry in place.
//!
//! ```text
//!  Clean ──connect/disconnect──► Dirty ──begin_commit──► Committing
//!    ▲                             │  ▲                      │
//!    │                             │  └──── failure ─────────┤
//!    │◄──────── success ───────────┼─────────────────────────┘
//!    │                          discard
//!    └──── finish_discard ◄── Discarding
//! ```

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use mystery_model::{ApiError, ClueId, ClueNode, Edge};

use crate::error::{EditorError, GraphError};
use crate::graph::{CycleDetector, GraphModel};
use crate::source::DependencyWriter;

/// Lifecycle of the staged edit transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransactionState {
    /// No staged entries.
    #[default]
    Clean,
    /// At least one staged entry.
    Dirty,
    /// A commit batch is in flight.
    Committing,
    /// Entries were dropped and the baseline is being re-fetched.
    Discarding,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TransactionState::Clean => "clean",
            TransactionState::Dirty => "dirty",
            TransactionState::Committing => "committing",
            TransactionState::Discarding => "discarding",
        };
        write!(f, "{}", name)
    }
}

/// Staged prerequisite lists, diffed against a [`GraphModel`] baseline.
#[derive(Debug, Clone, Default)]
pub struct PendingChangeStore {
    /// Target clue -> proposed prerequisite list.
    changes: BTreeMap<ClueId, Vec<ClueId>>,
    state: TransactionState,
}

impl PendingChangeStore {
    /// Create an empty, clean store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Check if any entry is staged.
    pub fn is_dirty(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Number of staged targets.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// The staged list for `target`, if any.
    pub fn get(&self, target: ClueId) -> Option<&[ClueId]> {
        self.changes.get(&target).map(|v| v.as_slice())
    }

    /// Iterate staged entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (ClueId, &[ClueId])> {
        self.changes.iter().map(|(id, list)| (*id, list.as_slice()))
    }

    /// The prerequisite list currently in effect for `target`.
    ///
    /// A staged entry fully replaces the baseline list; the two are never mixed.
    pub fn effective_prereqs<'a>(&'a self, baseline: &'a GraphModel, target: ClueId) -> &'a [ClueId] {
        self.changes
            .get(&target)
            .map(|v| v.as_slice())
            .unwrap_or_else(|| baseline.prerequisites(target))
    }

    /// The edge set in effect across the whole graph.
    ///
    /// Rebuilt from scratch on every call so it always reflects the latest
    /// staged entries. Prerequisites outside the snapshot yield no edge.
    pub fn effective_edges(&self, baseline: &GraphModel) -> Vec<Edge> {
        baseline
            .nodes()
            .iter()
            .flat_map(|node| {
                self.effective_prereqs(baseline, node.id)
                    .iter()
                    .filter(|prereq| baseline.contains(**prereq))
                    .map(move |&prereq| Edge::new(prereq, node.id))
            })
            .collect()
    }

    /// Baseline clues with their effective prerequisite lists applied.
    pub fn effective_nodes(&self, baseline: &GraphModel) -> Vec<ClueNode> {
        baseline
            .nodes()
            .iter()
            .map(|node| {
                let mut node = node.clone();
                if let Some(list) = self.changes.get(&node.id) {
                    node.prereq_clue_ids = list.clone();
                }
                node
            })
            .collect()
    }

    /// Check if an effective edge is staged, i.e. absent from the baseline.
    pub fn is_staged(&self, baseline: &GraphModel, edge: Edge) -> bool {
        self.changes
            .get(&edge.target)
            .is_some_and(|list| list.contains(&edge.source))
            && !baseline.prerequisites(edge.target).contains(&edge.source)
    }

    /// Stage `source` as a new prerequisite of `target`.
    pub fn connect(
        &mut self,
        baseline: &GraphModel,
        source: ClueId,
        target: ClueId,
    ) -> Result<(), GraphError> {
        self.ensure_editable()?;

        if source == target {
            return Err(GraphError::SelfLoop(source));
        }
        for id in [source, target] {
            if !baseline.contains(id) {
                return Err(GraphError::UnknownClue(id));
            }
        }

        let current = self.effective_prereqs(baseline, target);
        if current.contains(&source) {
            return Err(GraphError::DuplicateEdge {
                from: source,
                to: target,
            });
        }

        let edges = self.effective_edges(baseline);
        if CycleDetector::would_create_cycle(&edges, source, target) {
            return Err(GraphError::Cycle {
                from: source,
                to: target,
            });
        }

        let mut proposed = current.to_vec();
        proposed.push(source);
        self.changes.insert(target, proposed);
        self.state = TransactionState::Dirty;

        tracing::debug!(%source, %target, staged = self.changes.len(), "Staged prerequisite");
        Ok(())
    }

    /// Stage the removal of `source` from the prerequisites of `target`.
    pub fn disconnect(
        &mut self,
        baseline: &GraphModel,
        source: ClueId,
        target: ClueId,
    ) -> Result<(), GraphError> {
        self.ensure_editable()?;

        if !baseline.contains(target) {
            return Err(GraphError::UnknownClue(target));
        }

        let current = self.effective_prereqs(baseline, target);
        if !current.contains(&source) {
            return Err(GraphError::MissingEdge {
                from: source,
                to: target,
            });
        }

        let proposed: Vec<ClueId> = current.iter().copied().filter(|&id| id != source).collect();
        self.changes.insert(target, proposed);
        self.state = TransactionState::Dirty;

        tracing::debug!(%source, %target, staged = self.changes.len(), "Staged prerequisite removal");
        Ok(())
    }

    /// Snapshot the staged entries for a commit and lock further edits.
    pub fn begin_commit(&mut self) -> Result<CommitBatch, GraphError> {
        self.ensure_editable()?;
        self.state = TransactionState::Committing;

        Ok(CommitBatch {
            entries: self
                .changes
                .iter()
                .map(|(target, list)| (*target, list.clone()))
                .collect(),
        })
    }

    /// Close a commit. Success clears every entry; failure keeps them for retry.
    pub fn finish_commit(&mut self, succeeded: bool) {
        if self.state != TransactionState::Committing {
            tracing::warn!(state = %self.state, "finish_commit without a commit in flight");
        }
        if succeeded {
            self.changes.clear();
        }
        self.settle();
    }

    /// Drop every staged entry and wait for the baseline to be re-fetched.
    ///
    /// Returns how many entries were dropped.
    pub fn discard(&mut self) -> Result<usize, GraphError> {
        if self.state == TransactionState::Committing {
            return Err(GraphError::Busy(self.state));
        }
        let dropped = self.changes.len();
        self.changes.clear();
        self.state = TransactionState::Discarding;
        Ok(dropped)
    }

    /// Mark the post-discard re-fetch as done.
    pub fn finish_discard(&mut self) {
        if self.state == TransactionState::Discarding {
            self.settle();
        }
    }

    /// Drop entries for targets that no longer exist in `baseline`.
    pub fn retain_known(&mut self, baseline: &GraphModel) -> usize {
        let before = self.changes.len();
        self.changes.retain(|target, _| baseline.contains(*target));
        if matches!(self.state, TransactionState::Clean | TransactionState::Dirty) {
            self.settle();
        }
        before - self.changes.len()
    }

    /// Drop staged entries whose new edges close a cycle through `baseline`.
    ///
    /// A re-fetched baseline may have gained edges that conflict with what
    /// was staged against the old one. Entries are dropped one at a time,
    /// each time the target of a staged edge on a remaining cycle, until no
    /// cycle runs through a staged edge. Returns the dropped targets.
    pub fn drop_cyclic(&mut self, baseline: &GraphModel) -> Vec<ClueId> {
        let ids: Vec<ClueId> = baseline.node_ids().collect();
        let mut dropped = Vec::new();

        loop {
            let edges = self.effective_edges(baseline);
            let culprit = CycleDetector::find_cycles(&ids, &edges)
                .into_iter()
                .find_map(|cycle| self.staged_target_on(baseline, &cycle));

            let Some(target) = culprit else {
                break;
            };
            self.changes.remove(&target);
            dropped.push(target);
        }

        if !dropped.is_empty() && matches!(self.state, TransactionState::Clean | TransactionState::Dirty) {
            self.settle();
        }
        dropped
    }

    /// First clue of `cycle` whose incoming cycle edge is staged.
    fn staged_target_on(&self, baseline: &GraphModel, cycle: &[ClueId]) -> Option<ClueId> {
        let len = cycle.len();
        (0..len).find_map(|i| {
            let target = cycle[i];
            let prereq = cycle[(i + len - 1) % len];
            self.is_staged(baseline, Edge::new(prereq, target)).then_some(target)
        })
    }

    fn ensure_editable(&self) -> Result<(), GraphError> {
        match self.state {
            TransactionState::Committing | TransactionState::Discarding => {
                Err(GraphError::Busy(self.state))
            }
            _ => Ok(()),
        }
    }

    fn settle(&mut self) {
        self.state = if self.changes.is_empty() {
            TransactionState::Clean
        } else {
            TransactionState::Dirty
        };
    }
}

/// The staged entries of one commit, detached from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitBatch {
    entries: Vec<(ClueId, Vec<ClueId>)>,
}

impl CommitBatch {
    /// The `(target, prerequisite list)` writes in this batch.
    pub fn entries(&self) -> &[(ClueId, Vec<ClueId>)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Issue one dependency update per entry, all concurrently.
    pub async fn execute(&self, writer: &dyn DependencyWriter) -> CommitReport {
        let calls = self.entries.iter().map(|(target, prereqs)| async move {
            (*target, writer.update_dependencies(*target, prereqs.clone()).await)
        });

        let mut report = CommitReport {
            total: self.entries.len(),
            ..Default::default()
        };

        for (target, result) in join_all(calls).await {
            match result {
                Ok(clue) => report.updated.push(clue),
                Err(err) => {
                    tracing::error!(clue = %target, error = %err, "Dependency update failed");
                    report.failures.push((target, err));
                }
            }
        }

        report
    }
}

/// Outcome of executing a [`CommitBatch`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitReport {
    pub total: usize,
    pub updated: Vec<ClueNode>,
    pub failures: Vec<(ClueId, ApiError)>,
}

impl CommitReport {
    /// A commit only succeeds if every write succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Targets whose write failed.
    pub fn failed_targets(&self) -> HashSet<ClueId> {
        self.failures.iter().map(|(id, _)| *id).collect()
    }

    pub fn into_result(self) -> Result<Vec<ClueNode>, EditorError> {
        if self.failures.is_empty() {
            Ok(self.updated)
        } else {
            Err(EditorError::Commit {
                total: self.total,
                failures: self.failures,
            })
        }
    }
}
