//! Clue records - the narrative content units gated by prerequisite clues.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::ids::{ClueId, NpcId};
use crate::tree::Edge;

/// Clue type assigned when none is given.
pub const DEFAULT_CLUE_TYPE: &str = "text";

/// A clue as served by the clue CRUD subsystem.
///
/// `prereq_clue_ids` is the source of truth for the incoming dependency
/// edges of this clue. Its order is insertion order and carries no meaning,
/// but it never holds the same id twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClueNode {
    pub id: ClueId,
    pub name: String,

    #[serde(rename = "type", default = "default_clue_type")]
    pub clue_type: String,

    /// The NPC who holds or reveals this clue.
    #[serde(default = "NpcId::nil")]
    pub npc_id: NpcId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_keywords: Option<Vec<String>>,

    /// Clues that must be unlocked before this one.
    #[serde(default, alias = "prerequisite_clue_ids")]
    pub prereq_clue_ids: Vec<ClueId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

fn default_clue_type() -> String {
    DEFAULT_CLUE_TYPE.to_string()
}

impl ClueNode {
    /// Create a new clue with the given name and no prerequisites.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ClueId::new(),
            name: name.into(),
            clue_type: default_clue_type(),
            npc_id: NpcId::nil(),
            detail: None,
            trigger_keywords: None,
            prereq_clue_ids: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the clue id.
    pub fn with_id(mut self, id: ClueId) -> Self {
        self.id = id;
        self
    }

    /// Set the clue type.
    pub fn with_type(mut self, clue_type: impl Into<String>) -> Self {
        self.clue_type = clue_type.into();
        self
    }

    /// Set the NPC holding this clue.
    pub fn with_npc(mut self, npc_id: NpcId) -> Self {
        self.npc_id = npc_id;
        self
    }

    /// Set the clue detail text.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Set the keywords that trigger this clue in dialogue.
    pub fn with_keywords(mut self, keywords: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.trigger_keywords = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Add a prerequisite clue. Ids already present are ignored.
    pub fn with_prerequisite(mut self, prereq: ClueId) -> Self {
        if !self.prereq_clue_ids.contains(&prereq) {
            self.prereq_clue_ids.push(prereq);
        }
        self
    }

    /// Check if `prereq` is a prerequisite of this clue.
    pub fn has_prerequisite(&self, prereq: ClueId) -> bool {
        self.prereq_clue_ids.contains(&prereq)
    }

    /// The incoming dependency edges derived from the prerequisite list.
    pub fn incoming_edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.prereq_clue_ids
            .iter()
            .map(move |&source| Edge::new(source, self.id))
    }

    /// Drop repeated prerequisite ids, keeping the first occurrence.
    ///
    /// Returns how many entries were removed.
    pub fn dedup_prerequisites(&mut self) -> usize {
        let before = self.prereq_clue_ids.len();
        let mut seen = HashSet::with_capacity(before);
        self.prereq_clue_ids.retain(|id| seen.insert(*id));
        before - self.prereq_clue_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clue_creation() {
        let clue = ClueNode::new("Bloody knife");
        assert_eq!(clue.name, "Bloody knife");
        assert_eq!(clue.clue_type, DEFAULT_CLUE_TYPE);
        assert!(clue.prereq_clue_ids.is_empty());
    }

    #[test]
    fn test_with_prerequisite_ignores_duplicates() {
        let knife = ClueId::new();
        let clue = ClueNode::new("Fingerprints")
            .with_prerequisite(knife)
            .with_prerequisite(knife);

        assert_eq!(clue.prereq_clue_ids, vec![knife]);
        assert!(clue.has_prerequisite(knife));
    }

    #[test]
    fn test_incoming_edges() {
        let a = ClueId::new();
        let b = ClueId::new();
        let clue = ClueNode::new("Letter").with_prerequisite(a).with_prerequisite(b);

        let edges: Vec<_> = clue.incoming_edges().collect();
        assert_eq!(edges, vec![Edge::new(a, clue.id), Edge::new(b, clue.id)]);
    }

    #[test]
    fn test_dedup_prerequisites() {
        let a = ClueId::new();
        let b = ClueId::new();
        let mut clue = ClueNode::new("Diary");
        clue.prereq_clue_ids = vec![a, b, a, a];

        assert_eq!(clue.dedup_prerequisites(), 2);
        assert_eq!(clue.prereq_clue_ids, vec![a, b]);
    }

    #[test]
    fn test_deserialize_wire_form() {
        let json = r#"{
            "id": "7f8a3a8e-5a2b-4c1e-9d7e-1a2b3c4d5e6f",
            "name": "Torn glove",
            "type": "image",
            "npc_id": "00000000-0000-0000-0000-000000000000",
            "prerequisite_clue_ids": ["0b1c2d3e-4f50-4617-8899-aabbccddeeff"]
        }"#;

        let clue: ClueNode = serde_json::from_str(json).unwrap();
        assert_eq!(clue.clue_type, "image");
        assert_eq!(clue.prereq_clue_ids.len(), 1);
        assert!(clue.detail.is_none());

        let out = serde_json::to_value(&clue).unwrap();
        assert!(out.get("prereq_clue_ids").is_some());
        assert!(out.get("detail").is_none());
    }
}
