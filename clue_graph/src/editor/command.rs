//! Editor commands emitted by the canvas, and the notices they produce.

use serde::{Deserialize, Serialize};

use mystery_model::ClueId;

use crate::error::{EditorError, NoticeLevel};
use crate::layout::{Position, VisibleFields};

/// A user gesture on the graph canvas.
///
/// Serialized with a `type` tag, e.g. `{"type": "deleteEdge", "source": .., "target": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EditorCommand {
    /// Stage `source` as a prerequisite of `target`.
    Connect { source: ClueId, target: ClueId },
    /// Stage removal of the `source -> target` edge.
    DeleteEdge { source: ClueId, target: ClueId },
    ToggleCollapse { id: ClueId },
    Collapse { id: ClueId },
    Expand { id: ClueId },
    /// A clue was dragged to a new position.
    MoveNode { id: ClueId, position: Position },
    /// Forget every dragged position of the script.
    ResetLayout,
    SetVisibleFields { fields: VisibleFields },
}

/// Feedback for a dispatched command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditorNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl EditorNotice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn is_rejection(&self) -> bool {
        self.level > NoticeLevel::Info
    }
}

impl From<&EditorError> for EditorNotice {
    fn from(err: &EditorError) -> Self {
        Self {
            level: err.level(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;

    #[test]
    fn test_command_wire_form() {
        let source = ClueId::new();
        let target = ClueId::new();
        let json = serde_json::json!({
            "type": "deleteEdge",
            "source": source.to_string(),
            "target": target.to_string(),
        });

        let command: EditorCommand = serde_json::from_value(json).unwrap();
        assert_eq!(command, EditorCommand::DeleteEdge { source, target });

        let reset: EditorCommand = serde_json::from_str(r#"{"type":"resetLayout"}"#).unwrap();
        assert_eq!(reset, EditorCommand::ResetLayout);
    }

    #[test]
    fn test_notice_from_error() {
        let a = ClueId::new();
        let b = ClueId::new();

        let duplicate = EditorNotice::from(&EditorError::from(GraphError::DuplicateEdge { from: a, to: b }));
        assert_eq!(duplicate.level, NoticeLevel::Info);
        assert!(!duplicate.is_rejection());

        let cycle = EditorNotice::from(&EditorError::from(GraphError::Cycle { from: a, to: b }));
        assert_eq!(cycle.level, NoticeLevel::Warning);
        assert!(cycle.is_rejection());
    }
}
