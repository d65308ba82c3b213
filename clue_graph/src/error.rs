//! Error types for the clue graph editor.
//!
//! Graph rejections are local and synchronous: they never touch the staged
//! state. Editor errors wrap collaborator failures surfaced to the user.

use std::time::Duration;

use mystery_model::{ApiError, ClueId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pending::TransactionState;

/// Rejections raised while staging an edge edit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Clue {0} cannot be its own prerequisite")]
    SelfLoop(ClueId),

    #[error("Linking {from} -> {to} would create a cycle")]
    Cycle { from: ClueId, to: ClueId },

    #[error("{from} is already a prerequisite of {to}")]
    DuplicateEdge { from: ClueId, to: ClueId },

    #[error("{from} is not a prerequisite of {to}")]
    MissingEdge { from: ClueId, to: ClueId },

    #[error("Unknown clue {0}")]
    UnknownClue(ClueId),

    #[error("Edits are locked while the transaction is {0}")]
    Busy(TransactionState),
}

/// How loudly a rejection or failure should be reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl GraphError {
    /// Duplicate edges are a harmless no-op; everything else is a warning.
    pub fn level(&self) -> NoticeLevel {
        match self {
            GraphError::DuplicateEdge { .. } => NoticeLevel::Info,
            _ => NoticeLevel::Warning,
        }
    }
}

/// Failures of the auto-layout algorithm. Always recovered by the grid fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("Graph contains a cycle through {0}")]
    Cyclic(ClueId),

    #[error("Layout left {0} nodes without coordinates")]
    Incomplete(usize),

    #[error("Layout timed out after {0:?}")]
    Timeout(Duration),

    #[error("Layout worker failed: {0}")]
    Worker(String),
}

/// Errors surfaced by the editor session.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditorError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Failed to load clue tree: {0}")]
    Fetch(#[source] ApiError),

    #[error("Commit failed for {} of {total} clues", .failures.len())]
    Commit {
        total: usize,
        failures: Vec<(ClueId, ApiError)>,
    },

    #[error("Clue analysis failed: {0}")]
    Analysis(#[source] ApiError),

    #[error("Dropped {} staged changes that close a cycle with the reloaded tree", .0.len())]
    StagedConflict(Vec<ClueId>),

    #[error("Changes were written but the reload failed: {0}")]
    Reload(#[source] ApiError),

    #[error("No clue tree loaded")]
    NotLoaded,

    #[error("Result arrived for a superseded request")]
    Stale,
}

impl EditorError {
    /// The level this error is reported at.
    pub fn level(&self) -> NoticeLevel {
        match self {
            EditorError::Graph(err) => err.level(),
            EditorError::Stale => NoticeLevel::Info,
            EditorError::StagedConflict(_) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        }
    }
}

/// Errors loading or saving editor configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type for editor operations.
pub type Result<T> = std::result::Result<T, EditorError>;
