//! External collaborators of the graph editor.
//!
//! The editor reads snapshots from a [`TreeDataSource`], writes prerequisite
//! lists through a [`DependencyWriter`] and forwards clue chains to a
//! [`GraphAnalyzer`]. Implementations decide how requests travel; the
//! in-memory store stands in for the server in tests and tools.

mod memory;

pub use memory::*;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use mystery_model::{
    AnalysisReport, AnalysisRequest, ApiResult, ClueId, ClueNode, ClueTree, SceneId, ScriptId,
};

/// Source of clue-tree snapshots (`GET /scripts/{id}/clue-tree`).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TreeDataSource: Send + Sync {
    /// Fetch the DAG snapshot of a script, optionally narrowed to one scene.
    async fn get_tree(&self, script_id: ScriptId, scene_id: Option<SceneId>) -> ApiResult<ClueTree>;
}

/// Single-clue prerequisite replacement (`PUT /clues/{id}/dependencies`).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DependencyWriter: Send + Sync {
    /// Replace the whole prerequisite list of `clue_id`.
    async fn update_dependencies(&self, clue_id: ClueId, prereq_ids: Vec<ClueId>) -> ApiResult<ClueNode>;
}

/// Narrative-quality analysis (`POST /ai-enhance/analyze-clue-chain`).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait GraphAnalyzer: Send + Sync {
    async fn analyze(&self, request: AnalysisRequest) -> ApiResult<AnalysisReport>;
}
