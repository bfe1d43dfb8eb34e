//! Workflow domain types for PlantFlow.
//!
//! `WorkflowDefinition` is the immutable graph produced by the diagram parser
//! and consumed by the state machine. `WorkflowStatePayload` is the computed
//! view of an instance's current node that UI collaborators render.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// What produced a node.
///
/// `Decision`, `Join`, `LoopEntry` and `AfterLoop` are synthetic: the parser
/// creates them for control-flow constructs rather than from diagram text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    #[default]
    Action,
    Start,
    Stop,
    Decision,
    Join,
    LoopEntry,
    AfterLoop,
}

impl NodeKind {
    /// Whether the parser invented this node for a control-flow construct.
    pub fn is_synthetic(self) -> bool {
        matches!(
            self,
            NodeKind::Decision | NodeKind::Join | NodeKind::LoopEntry | NodeKind::AfterLoop
        )
    }
}

/// A vertex of the workflow graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Unique within the owning definition.
    pub id: String,
    /// Display text.
    pub label: String,
    /// Raw JSON object string attached through a `{...}|text` note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_metadata: Option<String>,
    /// Free note text. May itself be a JSON action object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note_markdown: Option<String>,
    #[serde(default)]
    pub kind: NodeKind,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            json_metadata: None,
            note_markdown: None,
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Edges and entry points
// ---------------------------------------------------------------------------

/// A directed, optionally guarded edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub id: String,
    pub from_node_id: String,
    pub to_node_id: String,
    /// Guard or choice label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// An entry node for instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPoint {
    pub node_id: String,
}

// ---------------------------------------------------------------------------
// Definition
// ---------------------------------------------------------------------------

/// The immutable workflow graph.
///
/// Created once on import. Replacing a definition with the same id is an
/// explicit update in the definition store, never an in-place mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub transitions: Vec<Transition>,
    /// The first entry initializes new instances.
    #[serde(default)]
    pub start_points: Vec<StartPoint>,
}

impl WorkflowDefinition {
    /// Look up a node by id.
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Outgoing transitions of a node, in declaration order. The iterator
    /// borrows only the definition.
    pub fn outgoing<'a>(&'a self, node_id: &str) -> impl Iterator<Item = &'a Transition> + use<'a> {
        let node_id = node_id.to_owned();
        self.transitions
            .iter()
            .filter(move |t| t.from_node_id == node_id)
    }

    /// The node new instances start at.
    pub fn first_start_node(&self) -> Option<&WorkflowNode> {
        self.start_points
            .first()
            .and_then(|sp| self.node(&sp.node_id))
    }

    /// Whether a node has no outgoing transitions.
    pub fn is_terminal(&self, node_id: &str) -> bool {
        self.outgoing(node_id).next().is_none()
    }
}

// ---------------------------------------------------------------------------
// State payload (rendered by UI collaborators)
// ---------------------------------------------------------------------------

/// One selectable option of a choice node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowChoiceOption {
    /// 1-based position in declaration order.
    pub order: usize,
    pub display_text: String,
    pub target_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

/// The renderable view of an instance's current node.
///
/// Computed on demand from the current node and its outgoing transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStatePayload {
    pub is_choice: bool,
    /// Used when `is_choice` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub choices: Vec<WorkflowChoiceOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    /// The current node has no outgoing transitions.
    #[serde(default)]
    pub is_terminal: bool,
}
