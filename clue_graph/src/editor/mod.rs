//! Editor session - one script's clue graph as seen and edited on the canvas.
//!
//! The session owns every piece of client state: the committed baseline,
//! the staged transaction, collapse state, dragged positions and the last
//! layout. Mutations are synchronous. Network and layout work is split into
//! a `begin_*` step that hands out a ticket and an `apply_*`/`finish_*` step
//! that consumes it, so the caller decides where the `await` happens:
//!
//! ```text
//! begin_fetch ──► TreeDataSource::get_tree ──► apply_fetch
//! begin_commit ─► CommitBatch::execute ──────► finish_commit ─► begin_fetch ...
//! discard ──────► TreeDataSource::get_tree ──► apply_fetch
//! layout_request ► layout_in_background ─────► apply_layout
//! ```
//!
//! Results for a superseded ticket, or arriving after [`ClueGraphEditor::close`],
//! are dropped with [`EditorError::Stale`].

mod command;
mod view;

pub use command::*;
pub use view::*;

use std::collections::HashMap;
use std::sync::Arc;

use mystery_model::{
    AnalysisClue, AnalysisReport, AnalysisRequest, ApiResult, ClueId, ClueNode, ClueTree, Edge,
    SceneId, ScriptId, TreeIssues,
};

use crate::error::{EditorError, GraphError, Result};
use crate::graph::{compute_visibility, CollapsedSet, GraphModel, Visibility};
use crate::layout::{
    layout_in_background, LayoutEngine, LayoutInput, LayoutNode, LayoutOutcome, LayoutScheduler,
    LayoutTicket, Position, VisibleFields,
};
use crate::pending::{CommitBatch, CommitReport, PendingChangeStore, TransactionState};
use crate::positions::PositionCache;
use crate::source::{DependencyWriter, GraphAnalyzer, TreeDataSource};

/// Ticket for one tree fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

/// Ticket for one commit, carrying the writes to issue.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitTicket {
    generation: u64,
    batch: CommitBatch,
}

impl CommitTicket {
    pub fn batch(&self) -> &CommitBatch {
        &self.batch
    }
}

/// A layout to run for the current visible graph.
#[derive(Debug, Clone)]
pub struct LayoutRequest {
    pub ticket: LayoutTicket,
    pub input: LayoutInput,
}

pub struct ClueGraphEditor {
    script_id: ScriptId,
    scene_id: Option<SceneId>,

    baseline: GraphModel,
    loaded: bool,
    pending: PendingChangeStore,
    collapsed: CollapsedSet,

    positions: PositionCache,
    engine: Arc<LayoutEngine>,
    fields: VisibleFields,
    scheduler: LayoutScheduler,
    layout: Option<LayoutOutcome>,

    fetch_generation: u64,
    commit_generation: u64,
    closed: bool,

    analysis: Option<AnalysisReport>,
    last_error: Option<EditorError>,
}

impl std::fmt::Debug for ClueGraphEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClueGraphEditor")
            .field("script_id", &self.script_id)
            .field("scene_id", &self.scene_id)
            .field("clues", &self.baseline.len())
            .field("state", &self.pending.state())
            .field("pending", &self.pending.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl ClueGraphEditor {
    /// Create a session for one script. Nothing is loaded until the first fetch.
    pub fn new(script_id: ScriptId, positions: PositionCache, engine: Arc<LayoutEngine>) -> Self {
        Self {
            script_id,
            scene_id: None,
            baseline: GraphModel::new(),
            loaded: false,
            pending: PendingChangeStore::new(),
            collapsed: CollapsedSet::new(),
            positions,
            engine,
            fields: VisibleFields::default(),
            scheduler: LayoutScheduler::new(),
            layout: None,
            fetch_generation: 0,
            commit_generation: 0,
            closed: false,
            analysis: None,
            last_error: None,
        }
    }

    /// Restrict fetches to one scene.
    pub fn with_scene(mut self, scene_id: SceneId) -> Self {
        self.scene_id = Some(scene_id);
        self
    }

    pub fn script_id(&self) -> ScriptId {
        self.script_id
    }

    pub fn scene_id(&self) -> Option<SceneId> {
        self.scene_id
    }

    /// The committed graph as last fetched.
    pub fn baseline(&self) -> &GraphModel {
        &self.baseline
    }

    pub fn pending(&self) -> &PendingChangeStore {
        &self.pending
    }

    pub fn state(&self) -> TransactionState {
        self.pending.state()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn collapsed(&self) -> &CollapsedSet {
        &self.collapsed
    }

    pub fn visible_fields(&self) -> VisibleFields {
        self.fields
    }

    /// Server-side integrity diagnostics of the current snapshot.
    pub fn issues(&self) -> &TreeIssues {
        self.baseline.issues()
    }

    pub fn analysis_report(&self) -> Option<&AnalysisReport> {
        self.analysis.as_ref()
    }

    pub fn last_error(&self) -> Option<&EditorError> {
        self.last_error.as_ref()
    }

    /// The last applied layout, if any.
    pub fn layout(&self) -> Option<&LayoutOutcome> {
        self.layout.as_ref()
    }

    /// Check if the visible graph changed since the last applied layout.
    pub fn needs_layout(&self) -> bool {
        self.scheduler.needs_layout()
    }

    /// Stop applying async results. Pending fetches, commits and layouts are dropped on arrival.
    pub fn close(&mut self) {
        if !self.closed {
            tracing::debug!(script = %self.script_id, "Closing clue graph editor");
            self.closed = true;
        }
    }

    // ==================== Edits ====================

    /// Run one canvas command.
    pub fn dispatch(&mut self, command: EditorCommand) -> EditorNotice {
        let result = match command {
            EditorCommand::Connect { source, target } => self
                .connect(source, target)
                .map(|()| format!("Linked {} -> {}", self.label(source), self.label(target))),
            EditorCommand::DeleteEdge { source, target } => self
                .disconnect(source, target)
                .map(|()| format!("Unlinked {} -> {}", self.label(source), self.label(target))),
            EditorCommand::ToggleCollapse { id } => self.toggle_collapse(id).map(|collapsed| {
                let verb = if collapsed { "Collapsed" } else { "Expanded" };
                format!("{} {}", verb, self.label(id))
            }),
            EditorCommand::Collapse { id } => self
                .set_collapsed(id, true)
                .map(|()| format!("Collapsed {}", self.label(id))),
            EditorCommand::Expand { id } => self
                .set_collapsed(id, false)
                .map(|()| format!("Expanded {}", self.label(id))),
            EditorCommand::MoveNode { id, position } => self
                .move_node(id, position)
                .map(|()| format!("Moved {}", self.label(id))),
            EditorCommand::ResetLayout => {
                self.reset_layout();
                Ok("Layout reset".to_string())
            }
            EditorCommand::SetVisibleFields { fields } => {
                self.set_visible_fields(fields);
                Ok(format!("Showing {} field rows", fields.count()))
            }
        };

        match result {
            Ok(message) => EditorNotice::info(message),
            Err(err) => {
                tracing::debug!(error = %err, "Command rejected");
                EditorNotice::from(&EditorError::from(err))
            }
        }
    }

    /// Stage `source` as a prerequisite of `target`.
    pub fn connect(&mut self, source: ClueId, target: ClueId) -> std::result::Result<(), GraphError> {
        self.pending.connect(&self.baseline, source, target)?;
        self.scheduler.invalidate();
        Ok(())
    }

    /// Stage removal of the `source -> target` edge.
    pub fn disconnect(&mut self, source: ClueId, target: ClueId) -> std::result::Result<(), GraphError> {
        self.pending.disconnect(&self.baseline, source, target)?;
        self.scheduler.invalidate();
        Ok(())
    }

    /// Flip the collapse state of a clue. Returns true if it is now collapsed.
    pub fn toggle_collapse(&mut self, id: ClueId) -> std::result::Result<bool, GraphError> {
        self.ensure_known(id)?;
        let collapsed = self.collapsed.toggle(id);
        self.scheduler.invalidate();
        Ok(collapsed)
    }

    pub fn set_collapsed(&mut self, id: ClueId, collapsed: bool) -> std::result::Result<(), GraphError> {
        self.ensure_known(id)?;
        let changed = if collapsed {
            self.collapsed.collapse(id)
        } else {
            self.collapsed.expand(id)
        };
        if changed {
            self.scheduler.invalidate();
        }
        Ok(())
    }

    /// Save a dragged position. Shown immediately, persisted in the position cache.
    pub fn move_node(&mut self, id: ClueId, position: Position) -> std::result::Result<(), GraphError> {
        self.ensure_known(id)?;
        self.positions.set(self.script_id, id, position);
        if let Some(layout) = &mut self.layout {
            layout.positions.insert(id, position);
        }
        self.scheduler.invalidate();
        Ok(())
    }

    /// Forget every dragged position of the script.
    pub fn reset_layout(&mut self) {
        self.positions.clear(self.script_id);
        self.scheduler.invalidate();
    }

    pub fn set_visible_fields(&mut self, fields: VisibleFields) {
        if fields != self.fields {
            self.fields = fields;
            self.scheduler.invalidate();
        }
    }

    // ==================== Fetch ====================

    /// Start loading the tree. Supersedes any fetch in flight.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetch_generation += 1;
        FetchTicket {
            generation: self.fetch_generation,
        }
    }

    /// Apply a fetched tree.
    ///
    /// On failure the previous snapshot stays in place. Either way a pending
    /// discard is settled.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: ApiResult<ClueTree>) -> Result<()> {
        if self.closed || ticket.generation != self.fetch_generation {
            tracing::debug!(ticket = ticket.generation, "Dropping superseded clue tree");
            return Err(EditorError::Stale);
        }

        match result {
            Ok(tree) => {
                self.baseline = GraphModel::from_tree(tree);
                self.loaded = true;

                let dropped = self.pending.retain_known(&self.baseline);
                if dropped > 0 {
                    tracing::warn!(dropped, "Dropped staged changes for clues no longer in the tree");
                }
                let conflicts = self.pending.drop_cyclic(&self.baseline);
                self.last_error = if conflicts.is_empty() {
                    None
                } else {
                    tracing::warn!(
                        dropped = conflicts.len(),
                        "Dropped staged changes that close a cycle with the reloaded tree"
                    );
                    Some(EditorError::StagedConflict(conflicts))
                };

                let baseline = &self.baseline;
                self.collapsed.retain(|id| baseline.contains(id));
                self.pending.finish_discard();
                self.scheduler.invalidate();

                tracing::info!(
                    script = %self.script_id,
                    clues = self.baseline.len(),
                    edges = self.baseline.edge_count(),
                    issues = self.baseline.issues().count(),
                    "Loaded clue tree"
                );
                Ok(())
            }
            Err(err) => {
                self.pending.finish_discard();
                tracing::error!(script = %self.script_id, error = %err, "Failed to load clue tree");
                let err = EditorError::Fetch(err);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    // ==================== Commit / discard ====================

    /// Lock edits and snapshot the staged entries for writing.
    pub fn begin_commit(&mut self) -> Result<CommitTicket> {
        if !self.loaded {
            return Err(EditorError::NotLoaded);
        }
        let batch = self.pending.begin_commit()?;
        self.commit_generation += 1;

        tracing::info!(script = %self.script_id, writes = batch.len(), "Committing staged changes");
        Ok(CommitTicket {
            generation: self.commit_generation,
            batch,
        })
    }

    /// Settle a commit from the outcome of its batch.
    ///
    /// Any failed write fails the whole commit and keeps every staged entry.
    /// On success the written clues are folded into the baseline; callers
    /// should still re-fetch to pick up server-side changes.
    pub fn finish_commit(&mut self, ticket: CommitTicket, report: CommitReport) -> Result<Vec<ClueNode>> {
        if self.closed || ticket.generation != self.commit_generation {
            tracing::debug!(ticket = ticket.generation, "Dropping superseded commit result");
            return Err(EditorError::Stale);
        }

        let succeeded = report.is_success();
        self.pending.finish_commit(succeeded);

        match report.into_result() {
            Ok(updated) => {
                self.fold_into_baseline(&updated);
                self.scheduler.invalidate();
                self.last_error = None;
                tracing::info!(script = %self.script_id, written = updated.len(), "Commit succeeded");
                Ok(updated)
            }
            Err(err) => {
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Drop every staged entry and start re-fetching the baseline.
    ///
    /// Returns the number of dropped entries and the fetch to complete.
    pub fn discard(&mut self) -> Result<(usize, FetchTicket)> {
        let dropped = self.pending.discard()?;
        self.scheduler.invalidate();
        tracing::info!(script = %self.script_id, dropped, "Discarded staged changes");
        Ok((dropped, self.begin_fetch()))
    }

    fn fold_into_baseline(&mut self, updated: &[ClueNode]) {
        let written: HashMap<ClueId, &ClueNode> = updated.iter().map(|clue| (clue.id, clue)).collect();
        let nodes: Vec<ClueNode> = self
            .baseline
            .nodes()
            .iter()
            .map(|node| match written.get(&node.id) {
                Some(clue) => (*clue).clone(),
                None => node.clone(),
            })
            .collect();
        let issues = self.baseline.issues().clone();
        self.baseline = GraphModel::from_tree(ClueTree::from_nodes(nodes).with_issues(issues));
    }

    // ==================== Layout ====================

    /// Edges in effect, staged entries included.
    pub fn effective_edges(&self) -> Vec<Edge> {
        self.pending.effective_edges(&self.baseline)
    }

    fn visibility(&self, edges: &[Edge]) -> Visibility {
        let ids: Vec<ClueId> = self.baseline.node_ids().collect();
        compute_visibility(&ids, edges, &self.collapsed)
    }

    /// The layout input for the current visible graph, with a ticket for the result.
    pub fn layout_request(&self) -> LayoutRequest {
        let edges = self.effective_edges();
        let visibility = self.visibility(&edges);
        let (width, height) = self.engine.config().node_size(&self.fields);

        let nodes = visibility
            .visible
            .iter()
            .map(|&id| LayoutNode { id, width, height })
            .collect();
        let mut saved = self.positions.get(self.script_id);
        saved.retain(|id, _| visibility.is_visible(*id));

        LayoutRequest {
            ticket: self.scheduler.issue(),
            input: LayoutInput {
                nodes,
                edges: visibility.visible_edges(&edges),
                saved,
            },
        }
    }

    /// Apply a finished layout. Returns false if it was superseded.
    pub fn apply_layout(&mut self, ticket: LayoutTicket, outcome: LayoutOutcome) -> bool {
        if self.closed || !self.scheduler.accept(ticket) {
            return false;
        }
        tracing::debug!(source = ?outcome.source, placed = outcome.positions.len(), "Applied layout");
        self.layout = Some(outcome);
        true
    }

    /// Lay out the current visible graph on this thread.
    pub fn relayout(&mut self) -> &LayoutOutcome {
        let LayoutRequest { ticket, input } = self.layout_request();
        let outcome = self.engine.layout(&input);
        self.scheduler.accept(ticket);
        &*self.layout.insert(outcome)
    }

    /// Lay out the current visible graph on the blocking pool.
    ///
    /// Returns false if the state changed or the editor closed meanwhile.
    pub async fn refresh_layout(&mut self) -> bool {
        let LayoutRequest { ticket, input } = self.layout_request();
        let outcome = layout_in_background(Arc::clone(&self.engine), input).await;
        self.apply_layout(ticket, outcome)
    }

    // ==================== View ====================

    /// Project the render model.
    pub fn view(&self) -> GraphView {
        let edges = self.effective_edges();
        let visibility = self.visibility(&edges);
        let effective = self.pending.effective_nodes(&self.baseline);
        let sources: std::collections::HashSet<ClueId> = edges.iter().map(|edge| edge.source).collect();
        let positions = self.layout.as_ref().map(|layout| &layout.positions);

        let nodes = effective
            .into_iter()
            .filter(|node| visibility.is_visible(node.id))
            .map(|node| NodeView {
                id: node.id,
                has_children: sources.contains(&node.id),
                collapsed: self.collapsed.contains(node.id),
                hidden_descendants: visibility.hidden_count(node.id),
                position: positions.and_then(|p| p.get(&node.id).copied()),
                name: node.name,
                clue_type: node.clue_type,
                npc_id: node.npc_id,
                detail: node.detail,
                trigger_keywords: node.trigger_keywords,
                prereq_clue_ids: node.prereq_clue_ids,
            })
            .collect();

        let edges = visibility
            .visible_edges(&edges)
            .into_iter()
            .map(|edge| EdgeView {
                source: edge.source,
                target: edge.target,
                staged: self.pending.is_staged(&self.baseline, edge),
            })
            .collect();

        GraphView {
            nodes,
            edges,
            issues: self.baseline.issues().clone(),
            fields: self.fields,
            state: self.pending.state(),
            pending_count: self.pending.len(),
            layout_source: self.layout.as_ref().map(|layout| layout.source),
        }
    }

    // ==================== Analysis ====================

    /// Request body for analysing the graph in effect, staged edits included.
    pub fn analysis_request(&self, script_background: Option<String>) -> AnalysisRequest {
        AnalysisRequest {
            clues: self
                .pending
                .effective_nodes(&self.baseline)
                .iter()
                .map(AnalysisClue::from)
                .collect(),
            script_background,
        }
    }

    /// Store an analysis report as returned.
    pub fn set_analysis_report(&mut self, report: AnalysisReport) {
        self.analysis = Some(report);
    }

    // ==================== Async wrappers ====================

    /// Fetch and apply the tree.
    pub async fn reload(&mut self, source: &dyn TreeDataSource) -> Result<()> {
        let ticket = self.begin_fetch();
        let result = source.get_tree(self.script_id, self.scene_id).await;
        self.apply_fetch(ticket, result)
    }

    /// Write every staged entry, then re-fetch. Returns the number of clues written.
    ///
    /// A failed re-fetch after a successful write returns [`EditorError::Reload`]:
    /// the staged entries are already cleared and the written clues folded
    /// into the baseline.
    pub async fn commit(&mut self, writer: &dyn DependencyWriter, source: &dyn TreeDataSource) -> Result<usize> {
        let ticket = self.begin_commit()?;
        let report = ticket.batch().execute(writer).await;
        let written = self.finish_commit(ticket, report)?.len();

        match self.reload(source).await {
            Ok(()) => Ok(written),
            Err(EditorError::Fetch(err)) => {
                let err = EditorError::Reload(err);
                self.last_error = Some(err.clone());
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Drop every staged entry and re-fetch. Returns the number of dropped entries.
    pub async fn discard_and_reload(&mut self, source: &dyn TreeDataSource) -> Result<usize> {
        let (dropped, ticket) = self.discard()?;
        let result = source.get_tree(self.script_id, self.scene_id).await;
        self.apply_fetch(ticket, result)?;
        Ok(dropped)
    }

    /// Ask the analyzer about the graph in effect and keep its report.
    pub async fn analyze(
        &mut self,
        analyzer: &dyn GraphAnalyzer,
        script_background: Option<String>,
    ) -> Result<&AnalysisReport> {
        if !self.loaded {
            return Err(EditorError::NotLoaded);
        }
        let request = self.analysis_request(script_background);
        match analyzer.analyze(request).await {
            Ok(report) if !self.closed => Ok(&*self.analysis.insert(report)),
            Ok(_) => Err(EditorError::Stale),
            Err(err) => {
                tracing::error!(script = %self.script_id, error = %err, "Clue analysis failed");
                let err = EditorError::Analysis(err);
                self.last_error = Some(err.clone());
                Err(err)
            }
        }
    }

    // ==================== Helpers ====================

    fn ensure_known(&self, id: ClueId) -> std::result::Result<(), GraphError> {
        if self.baseline.contains(id) {
            Ok(())
        } else {
            Err(GraphError::UnknownClue(id))
        }
    }

    fn label(&self, id: ClueId) -> String {
        self.baseline
            .node(id)
            .map(|node| node.name.clone())
            .unwrap_or_else(|| id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NoticeLevel;
    use crate::graph::CycleDetector;
    use crate::layout::LayoutSource;
    use crate::source::{MockDependencyWriter, MockGraphAnalyzer, MockTreeDataSource};
    use mystery_model::ApiError;

    struct Fixture {
        editor: ClueGraphEditor,
        a: ClueId,
        b: ClueId,
        c: ClueId,
        tree: ClueTree,
    }

    /// A -> B committed, C unconnected.
    fn fixture() -> Fixture {
        let a = ClueNode::new("Torn letter");
        let b = ClueNode::new("Locked drawer").with_prerequisite(a.id);
        let c = ClueNode::new("Muddy boots");
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let tree = ClueTree::from_nodes(vec![a, b, c]);

        let mut editor = ClueGraphEditor::new(
            ScriptId::new(),
            PositionCache::in_memory(),
            Arc::new(LayoutEngine::default()),
        );
        let ticket = editor.begin_fetch();
        editor.apply_fetch(ticket, Ok(tree.clone())).unwrap();

        Fixture {
            editor,
            a: a_id,
            b: b_id,
            c: c_id,
            tree,
        }
    }

    #[test]
    fn test_dispatch_notices() {
        let Fixture {
            mut editor, a, b, c, ..
        } = fixture();

        let linked = editor.dispatch(EditorCommand::Connect { source: b, target: c });
        assert_eq!(linked.level, NoticeLevel::Info);
        assert_eq!(linked.message, "Linked Locked drawer -> Muddy boots");

        let cycle = editor.dispatch(EditorCommand::Connect { source: c, target: a });
        assert_eq!(cycle.level, NoticeLevel::Warning);

        let duplicate = editor.dispatch(EditorCommand::Connect { source: a, target: b });
        assert_eq!(duplicate.level, NoticeLevel::Info);
        assert!(duplicate.message.contains("already a prerequisite"));

        let missing = editor.dispatch(EditorCommand::DeleteEdge { source: a, target: c });
        assert_eq!(missing.level, NoticeLevel::Warning);

        assert_eq!(editor.pending().len(), 1);
    }

    #[test]
    fn test_view_marks_staged_edges() {
        let Fixture {
            mut editor, a, b, c, ..
        } = fixture();
        editor.connect(b, c).unwrap();

        let view = editor.view();
        assert_eq!(view.state, TransactionState::Dirty);
        assert_eq!(view.pending_count, 1);
        assert_eq!(
            view.edges,
            vec![
                EdgeView { source: a, target: b, staged: false },
                EdgeView { source: b, target: c, staged: true },
            ]
        );
        assert!(view.node(b).unwrap().has_children);
        assert_eq!(view.node(c).unwrap().prereq_clue_ids, vec![b]);
    }

    #[test]
    fn test_collapse_hides_descendants() {
        let Fixture {
            mut editor, a, b, c, ..
        } = fixture();
        editor.connect(b, c).unwrap();

        assert_eq!(editor.toggle_collapse(a), Ok(true));
        let view = editor.view();
        assert_eq!(view.nodes.len(), 1);
        assert!(view.edges.is_empty());
        let root = view.node(a).unwrap();
        assert!(root.collapsed);
        assert!(root.has_children);
        assert_eq!(root.hidden_descendants, 2);

        editor.dispatch(EditorCommand::Expand { id: a });
        assert_eq!(editor.view().nodes.len(), 3);

        assert!(matches!(
            editor.toggle_collapse(ClueId::new()),
            Err(GraphError::UnknownClue(_))
        ));
    }

    #[test]
    fn test_fetch_failure_keeps_previous_snapshot() {
        let Fixture {
            mut editor, a, c, ..
        } = fixture();
        editor.connect(a, c).unwrap();

        let ticket = editor.begin_fetch();
        let err = editor
            .apply_fetch(ticket, Err(ApiError::Transport("connection refused".into())))
            .unwrap_err();

        assert!(matches!(err, EditorError::Fetch(_)));
        assert_eq!(editor.baseline().len(), 3);
        assert_eq!(editor.pending().len(), 1);
        assert_eq!(editor.last_error(), Some(&err));
    }

    #[test]
    fn test_superseded_fetch_is_dropped() {
        let Fixture { mut editor, tree, .. } = fixture();

        let first = editor.begin_fetch();
        let second = editor.begin_fetch();
        assert_eq!(
            editor.apply_fetch(first, Ok(ClueTree::default())),
            Err(EditorError::Stale)
        );
        assert_eq!(editor.baseline().len(), 3);

        editor.apply_fetch(second, Ok(tree)).unwrap();
    }

    #[test]
    fn test_results_after_close_are_dropped() {
        let Fixture {
            mut editor, a, c, tree, ..
        } = fixture();
        editor.connect(a, c).unwrap();

        let fetch = editor.begin_fetch();
        let commit = editor.begin_commit().unwrap();
        let layout = editor.layout_request();
        editor.close();

        assert_eq!(editor.apply_fetch(fetch, Ok(tree)), Err(EditorError::Stale));
        assert_eq!(
            editor.finish_commit(commit, CommitReport::default()),
            Err(EditorError::Stale)
        );
        let outcome = LayoutEngine::default().layout(&layout.input);
        assert!(!editor.apply_layout(layout.ticket, outcome));
        assert!(editor.layout().is_none());
    }

    #[test]
    fn test_superseded_layout_is_dropped() {
        let Fixture { mut editor, a, .. } = fixture();

        let stale = editor.layout_request();
        editor.toggle_collapse(a).unwrap();
        let fresh = editor.layout_request();
        assert_eq!(stale.input.nodes.len(), 3);
        // C is unconnected and stays visible
        assert_eq!(fresh.input.nodes.len(), 2);

        let engine = LayoutEngine::default();
        let stale_outcome = engine.layout(&stale.input);
        let fresh_outcome = engine.layout(&fresh.input);

        assert!(editor.apply_layout(fresh.ticket, fresh_outcome));
        assert!(!editor.apply_layout(stale.ticket, stale_outcome));
        assert_eq!(editor.layout().unwrap().positions.len(), 2);
        assert!(!editor.needs_layout());
    }

    #[test]
    fn test_move_node_pins_position() {
        let Fixture {
            mut editor, a, b, c, ..
        } = fixture();
        editor.relayout();

        let notice = editor.dispatch(EditorCommand::MoveNode {
            id: c,
            position: Position::new(900.0, 900.0),
        });
        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(editor.view().node(c).unwrap().position, Some(Position::new(900.0, 900.0)));
        assert!(editor.needs_layout());

        for id in [a, b] {
            editor.move_node(id, Position::new(0.0, 0.0)).unwrap();
        }
        assert_eq!(editor.relayout().source, LayoutSource::Saved);

        editor.dispatch(EditorCommand::ResetLayout);
        assert_eq!(editor.relayout().source, LayoutSource::Computed);
    }

    #[test]
    fn test_visible_fields_resize_boxes() {
        let Fixture { mut editor, .. } = fixture();
        let before = editor.layout_request().input.nodes[0].height;

        editor.dispatch(EditorCommand::SetVisibleFields {
            fields: VisibleFields::none(),
        });
        let after = editor.layout_request().input.nodes[0].height;
        assert!(after < before);
    }

    #[test]
    fn test_commit_requires_load() {
        let mut editor = ClueGraphEditor::new(
            ScriptId::new(),
            PositionCache::in_memory(),
            Arc::new(LayoutEngine::default()),
        );
        assert_eq!(editor.begin_commit().unwrap_err(), EditorError::NotLoaded);
    }

    #[tokio::test]
    async fn test_commit_failure_keeps_pending() {
        let Fixture {
            mut editor, a, b, c, ..
        } = fixture();
        editor.connect(a, c).unwrap();
        editor.connect(b, c).unwrap();

        let mut writer = MockDependencyWriter::new();
        writer
            .expect_update_dependencies()
            .times(1)
            .returning(|_, _| {
                Err(ApiError::Http {
                    status: 503,
                    message: "maintenance".into(),
                })
            });
        let mut source = MockTreeDataSource::new();
        source.expect_get_tree().never();

        let err = editor.commit(&writer, &source).await.unwrap_err();
        assert!(matches!(err, EditorError::Commit { total: 1, .. }));
        assert_eq!(err.level(), NoticeLevel::Error);
        assert_eq!(editor.state(), TransactionState::Dirty);
        assert_eq!(editor.pending().get(c), Some(&[a, b][..]));
    }

    #[tokio::test]
    async fn test_commit_success_refetches() {
        let Fixture {
            mut editor, a, c, tree, ..
        } = fixture();
        editor.connect(a, c).unwrap();

        let mut writer = MockDependencyWriter::new();
        let written = tree.nodes[2].clone().with_prerequisite(a);
        let reply = written.clone();
        writer
            .expect_update_dependencies()
            .withf(move |id, prereqs| *id == c && prereqs == &vec![a])
            .times(1)
            .returning(move |_, _| Ok(reply.clone()));

        let mut server_tree = tree.clone();
        server_tree.nodes[2] = written;
        let mut source = MockTreeDataSource::new();
        source
            .expect_get_tree()
            .times(1)
            .returning(move |_, _| Ok(server_tree.clone()));

        assert_eq!(editor.commit(&writer, &source).await, Ok(1));
        assert_eq!(editor.state(), TransactionState::Clean);
        assert_eq!(editor.baseline().prerequisites(c), &[a]);
        assert!(editor.view().staged_edges().next().is_none());
    }

    #[test]
    fn test_reload_drops_staged_edges_that_now_cycle() {
        let Fixture {
            mut editor, a, b, c, tree,
        } = fixture();
        editor.connect(b, c).unwrap();
        editor.connect(a, c).unwrap();

        // Server now has C as a prerequisite of A.
        let mut server_tree = tree;
        server_tree.nodes[0] = server_tree.nodes[0].clone().with_prerequisite(c);
        let ticket = editor.begin_fetch();
        editor.apply_fetch(ticket, Ok(ClueTree::from_nodes(server_tree.nodes))).unwrap();

        assert!(CycleDetector::is_acyclic(&editor.effective_edges()));
        assert_eq!(editor.pending().len(), 0);
        assert_eq!(editor.state(), TransactionState::Clean);
        let err = editor.last_error().unwrap();
        assert!(matches!(err, EditorError::StagedConflict(targets) if targets == &vec![c]));
        assert_eq!(err.level(), NoticeLevel::Warning);
    }

    #[tokio::test]
    async fn test_commit_reports_reload_failure_separately() {
        let Fixture {
            mut editor, a, c, tree, ..
        } = fixture();
        editor.connect(a, c).unwrap();

        let reply = tree.nodes[2].clone().with_prerequisite(a);
        let mut writer = MockDependencyWriter::new();
        writer
            .expect_update_dependencies()
            .returning(move |_, _| Ok(reply.clone()));
        let mut source = MockTreeDataSource::new();
        source
            .expect_get_tree()
            .returning(|_, _| Err(ApiError::Transport("reset".into())));

        let err = editor.commit(&writer, &source).await.unwrap_err();
        assert!(matches!(err, EditorError::Reload(_)));
        assert_eq!(editor.state(), TransactionState::Clean);
        assert_eq!(editor.baseline().prerequisites(c), &[a]);
        assert_eq!(editor.last_error(), Some(&err));
    }

    #[tokio::test]
    async fn test_discard_restores_baseline() {
        let Fixture {
            mut editor, a, b, c, tree,
        } = fixture();
        editor.disconnect(a, b).unwrap();
        editor.connect(a, c).unwrap();

        let mut source = MockTreeDataSource::new();
        source
            .expect_get_tree()
            .times(1)
            .returning(move |_, _| Ok(tree.clone()));

        assert_eq!(editor.discard_and_reload(&source).await, Ok(2));
        assert_eq!(editor.state(), TransactionState::Clean);
        assert_eq!(editor.effective_edges(), vec![Edge::new(a, b)]);
    }

    #[tokio::test]
    async fn test_discard_fetch_failure_still_unlocks() {
        let Fixture {
            mut editor, a, c, ..
        } = fixture();
        editor.connect(a, c).unwrap();

        let mut source = MockTreeDataSource::new();
        source
            .expect_get_tree()
            .returning(|_, _| Err(ApiError::Transport("timeout".into())));

        assert!(matches!(
            editor.discard_and_reload(&source).await,
            Err(EditorError::Fetch(_))
        ));
        assert_eq!(editor.state(), TransactionState::Clean);
        assert!(editor.connect(a, c).is_ok());
    }

    #[tokio::test]
    async fn test_analysis_uses_effective_graph() {
        let Fixture {
            mut editor, a, c, ..
        } = fixture();
        editor.connect(a, c).unwrap();

        let mut analyzer = MockGraphAnalyzer::new();
        analyzer
            .expect_analyze()
            .withf(move |request| {
                request.clues.len() == 3
                    && request.clues.iter().any(|clue| clue.id == c && clue.prereq_clue_ids == vec![a])
                    && request.script_background.as_deref() == Some("A manor, 1923")
            })
            .returning(|_| {
                Ok(AnalysisReport {
                    overall_score: 7.5,
                    summary: "Solid chain".into(),
                    ..Default::default()
                })
            });

        let report = editor
            .analyze(&analyzer, Some("A manor, 1923".into()))
            .await
            .unwrap();
        assert_eq!(report.overall_score, 7.5);
        assert_eq!(editor.analysis_report().unwrap().summary, "Solid chain");
    }

    #[tokio::test]
    async fn test_analysis_failure_is_reported() {
        let Fixture { mut editor, .. } = fixture();

        let mut analyzer = MockGraphAnalyzer::new();
        analyzer
            .expect_analyze()
            .returning(|_| Err(ApiError::Rejected("quota exceeded".into())));

        let err = editor.analyze(&analyzer, None).await.unwrap_err();
        assert!(matches!(err, EditorError::Analysis(_)));
        assert!(editor.analysis_report().is_none());
    }

    #[tokio::test]
    async fn test_background_layout_applies() {
        let Fixture { mut editor, .. } = fixture();
        assert!(editor.refresh_layout().await);
        assert_eq!(editor.layout().unwrap().source, LayoutSource::Computed);
        assert!(editor.view().nodes.iter().all(|node| node.position.is_some()));
    }
}
