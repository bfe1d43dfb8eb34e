//! Renderable state of a node and choice matching.

use plantflow_types::workflow::{
    Transition, WorkflowChoiceOption, WorkflowDefinition, WorkflowStatePayload,
};

use crate::action::ActionSpec;

/// Build the payload for `node_id`.
///
/// Two or more outgoing transitions make a choice, one option per
/// transition in declaration order. Otherwise the payload carries the
/// node's note text, or its label when the note is empty or an action.
pub fn compute_payload(def: &WorkflowDefinition, node_id: &str) -> WorkflowStatePayload {
    let Some(node) = def.node(node_id) else {
        return WorkflowStatePayload::default();
    };
    let outgoing: Vec<&Transition> = def.outgoing(node_id).collect();

    let mut payload = WorkflowStatePayload {
        node_label: Some(node.label.clone()),
        node_id: Some(node.id.clone()),
        is_terminal: outgoing.is_empty(),
        ..Default::default()
    };

    if outgoing.len() >= 2 {
        payload.is_choice = true;
        payload.choices = outgoing
            .iter()
            .enumerate()
            .map(|(i, t)| WorkflowChoiceOption {
                order: i + 1,
                display_text: display_text(def, t),
                target_node_id: t.to_node_id.clone(),
                condition: t.condition.clone(),
            })
            .collect();
    } else {
        let note = node
            .note_markdown
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty() && !ActionSpec::is_action_note(n));
        payload.text = Some(note.unwrap_or(&node.label).to_string());
    }
    payload
}

fn display_text(def: &WorkflowDefinition, t: &Transition) -> String {
    match t.condition.as_deref().map(str::trim) {
        Some(condition) if !condition.is_empty() => condition.to_string(),
        _ => def
            .node(&t.to_node_id)
            .map(|n| n.label.clone())
            .unwrap_or_else(|| t.to_node_id.clone()),
    }
}

/// Pick the outgoing transition of `node_id` selected by `value`.
///
/// Tried in order: condition (trimmed, case-insensitive), target node id,
/// target label (case-insensitive). A missing or blank value selects the
/// only transition when there is exactly one.
pub fn match_choice<'a>(
    def: &'a WorkflowDefinition,
    node_id: &str,
    value: Option<&str>,
) -> Option<&'a Transition> {
    let outgoing: Vec<&'a Transition> = def.outgoing(node_id).collect();
    let value = value.map(str::trim).filter(|v| !v.is_empty());

    let Some(value) = value else {
        return match outgoing.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
    };
    let wanted = value.to_lowercase();

    outgoing
        .iter()
        .find(|t| {
            t.condition
                .as_deref()
                .is_some_and(|c| c.trim().to_lowercase() == wanted)
        })
        .or_else(|| outgoing.iter().find(|t| t.to_node_id == value))
        .or_else(|| {
            outgoing.iter().find(|t| {
                def.node(&t.to_node_id)
                    .is_some_and(|n| n.label.trim().to_lowercase() == wanted)
            })
        })
        .copied()
}
