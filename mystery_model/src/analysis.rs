//! Narrative-quality analysis bodies for `POST /ai-enhance/analyze-clue-chain`.
//!
//! The report is produced by an external AI service. The editor displays it
//! verbatim and never interprets it, so open-ended parts stay as raw JSON.

use serde::{Deserialize, Serialize};

use crate::clue::ClueNode;
use crate::ids::ClueId;

/// A clue as submitted for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisClue {
    pub id: ClueId,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default)]
    pub prereq_clue_ids: Vec<ClueId>,
}

impl From<&ClueNode> for AnalysisClue {
    fn from(clue: &ClueNode) -> Self {
        Self {
            id: clue.id,
            name: clue.name.clone(),
            detail: clue.detail.clone(),
            prereq_clue_ids: clue.prereq_clue_ids.clone(),
        }
    }
}

/// Request body for a clue-chain analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub clues: Vec<AnalysisClue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_background: Option<String>,
}

/// The analysis report, kept exactly as returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(default)]
    pub overall_score: f64,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub issues: Vec<serde_json::Value>,

    #[serde(default)]
    pub suggestions: Vec<serde_json::Value>,

    #[serde(default)]
    pub key_clues: Vec<serde_json::Value>,

    #[serde(default)]
    pub reasoning_paths: Vec<serde_json::Value>,
}
