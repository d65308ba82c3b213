//! REST surface used by the clue graph editor.
//!
//! Only routes, bodies and the error vocabulary live here. How requests
//! travel is up to the client that implements the editor's collaborator
//! traits.
//!
//! Every prerequisite write, whether it adds or removes an edge, goes to the
//! dedicated dependencies endpoint (`PUT /clues/{id}/dependencies`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::{ClueId, SceneId, ScriptId};

/// Errors reported by the backend or by the transport that reached it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Clue {0} not found")]
    NotFound(ClueId),

    #[error("Script {0} not found")]
    ScriptNotFound(ScriptId),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

/// Result type for backend calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Body of `PUT /clues/{id}/dependencies`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyUpdate {
    #[serde(alias = "prerequisite_clue_ids")]
    pub prereq_clue_ids: Vec<ClueId>,
}

impl DependencyUpdate {
    /// Create an update replacing the whole prerequisite list.
    pub fn new(prereq_clue_ids: Vec<ClueId>) -> Self {
        Self { prereq_clue_ids }
    }
}

/// Builds endpoint URLs relative to an API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRoutes {
    base_url: String,
}

impl ApiRoutes {
    /// Create routes for the given base URL. A trailing slash is ignored.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// The base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /scripts/{id}/clue-tree[?scene_id=]`
    pub fn clue_tree(&self, script: ScriptId, scene: Option<SceneId>) -> String {
        match scene {
            Some(scene) => format!(
                "{}/scripts/{}/clue-tree?scene_id={}",
                self.base_url, script, scene
            ),
            None => format!("{}/scripts/{}/clue-tree", self.base_url, script),
        }
    }

    /// `PUT /clues/{id}/dependencies`
    pub fn clue_dependencies(&self, clue: ClueId) -> String {
        format!("{}/clues/{}/dependencies", self.base_url, clue)
    }

    /// `POST /ai-enhance/analyze-clue-chain`
    pub fn analyze_clue_chain(&self) -> String {
        format!("{}/ai-enhance/analyze-clue-chain", self.base_url)
    }
}
