use std::collections::HashSet;

use plantflow_types::workflow::WorkflowDefinition;

use super::WorkflowError;

/// Check that node ids are unique and every edge and start point refers to
/// an existing node. An empty definition is valid.
pub fn validate_definition(def: &WorkflowDefinition) -> Result<(), WorkflowError> {
    if def.id.trim().is_empty() {
        return Err(WorkflowError::Validation(
            "workflow id must not be empty".to_string(),
        ));
    }

    let mut ids = HashSet::new();
    for node in &def.nodes {
        if !ids.insert(node.id.as_str()) {
            return Err(WorkflowError::Validation(format!(
                "duplicate node id: '{}'",
                node.id
            )));
        }
    }

    for t in &def.transitions {
        for endpoint in [&t.from_node_id, &t.to_node_id] {
            if !ids.contains(endpoint.as_str()) {
                return Err(WorkflowError::Validation(format!(
                    "transition '{}' references unknown node '{}'",
                    t.id, endpoint
                )));
            }
        }
    }

    for sp in &def.start_points {
        if !ids.contains(sp.node_id.as_str()) {
            return Err(WorkflowError::Validation(format!(
                "start point references unknown node '{}'",
                sp.node_id
            )));
        }
    }

    Ok(())
}
