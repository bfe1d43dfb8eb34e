//! Graph accumulation with label-keyed node identity.

use std::collections::HashMap;

use plantflow_types::workflow::{NodeKind, StartPoint, Transition, WorkflowDefinition, WorkflowNode};

use super::syntax::{display_label, normalize_label};

/// Collects nodes, transitions and start points during a parse.
///
/// Labelled nodes are reused on exact normalized-label match; synthetic nodes
/// always get a fresh id.
#[derive(Debug, Default)]
pub(crate) struct GraphBuilder {
    nodes: Vec<WorkflowNode>,
    /// Node id -> index in `nodes`.
    positions: HashMap<String, usize>,
    /// Normalized label -> node id, for labelled nodes only.
    by_label: HashMap<String, String>,
    transitions: Vec<Transition>,
    start_points: Vec<StartPoint>,
    synthetic_counters: HashMap<NodeKind, usize>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the node for a label. Returns `None` for blank labels.
    pub fn labelled(&mut self, raw_label: &str, kind: NodeKind) -> Option<String> {
        let key = normalize_label(raw_label);
        if key.is_empty() {
            return None;
        }
        if let Some(id) = self.by_label.get(&key) {
            return Some(id.clone());
        }

        let id = self.unique_id(&key);
        self.insert(WorkflowNode::new(id.clone(), display_label(raw_label), kind));
        self.by_label.insert(key, id.clone());
        Some(id)
    }

    /// Create a fresh synthetic node (`decision-1`, `join-2`, ...).
    pub fn synthetic(&mut self, kind: NodeKind, label: &str) -> String {
        let prefix = match kind {
            NodeKind::Decision => "decision",
            NodeKind::Join => "join",
            NodeKind::LoopEntry => "loop",
            NodeKind::AfterLoop => "after-loop",
            NodeKind::Start => "start",
            NodeKind::Stop => "stop",
            NodeKind::Action => "node",
        };
        let counter = self.synthetic_counters.entry(kind).or_insert(0);
        let id = loop {
            *counter += 1;
            let candidate = format!("{prefix}-{counter}");
            if !self.positions.contains_key(&candidate) {
                break candidate;
            }
        };
        self.insert(WorkflowNode::new(id.clone(), label, kind));
        id
    }

    /// Resolve a node reference by label first, then by id.
    pub fn find(&self, reference: &str) -> Option<String> {
        let key = normalize_label(reference);
        self.by_label
            .get(&key)
            .cloned()
            .or_else(|| self.positions.contains_key(&key).then_some(key))
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut WorkflowNode> {
        let idx = *self.positions.get(id)?;
        self.nodes.get_mut(idx)
    }

    /// Add an edge. Unguarded self-loops and exact duplicates are dropped.
    pub fn connect(&mut self, from: &str, to: &str, condition: Option<String>) {
        let condition = condition.filter(|c| !c.trim().is_empty());
        if from == to && condition.is_none() {
            tracing::debug!(node = from, "suppressing unconditional self-transition");
            return;
        }
        let duplicate = self.transitions.iter().any(|t| {
            t.from_node_id == from && t.to_node_id == to && t.condition == condition
        });
        if duplicate {
            return;
        }
        let id = format!("t{}", self.transitions.len() + 1);
        self.transitions.push(Transition {
            id,
            from_node_id: from.to_string(),
            to_node_id: to.to_string(),
            condition,
        });
    }

    pub fn add_start_point(&mut self, node_id: &str) {
        if self.start_points.iter().all(|sp| sp.node_id != node_id) {
            self.start_points.push(StartPoint {
                node_id: node_id.to_string(),
            });
        }
    }

    pub fn finish(mut self, id: String, name: String) -> WorkflowDefinition {
        if self.start_points.is_empty() {
            if let Some(first) = self.nodes.first() {
                self.start_points.push(StartPoint {
                    node_id: first.id.clone(),
                });
            }
        }
        WorkflowDefinition {
            id,
            name,
            nodes: self.nodes,
            transitions: self.transitions,
            start_points: self.start_points,
        }
    }

    fn unique_id(&self, base: &str) -> String {
        if !self.positions.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{base}-{n}"))
            .find(|candidate| !self.positions.contains_key(candidate))
            .unwrap_or_else(|| base.to_string())
    }

    fn insert(&mut self, node: WorkflowNode) {
        self.positions.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_nodes_are_reused() {
        let mut g = GraphBuilder::new();
        let a = g.labelled("Fill  form", NodeKind::Action).unwrap();
        let b = g.labelled("Fill form", NodeKind::Action).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "Fill form");
        assert!(g.labelled("   ", NodeKind::Action).is_none());
    }

    #[test]
    fn test_synthetic_nodes_are_fresh() {
        let mut g = GraphBuilder::new();
        let d1 = g.synthetic(NodeKind::Decision, "ok?");
        let d2 = g.synthetic(NodeKind::Decision, "ok?");
        assert_eq!(d1, "decision-1");
        assert_eq!(d2, "decision-2");
    }

    #[test]
    fn test_label_colliding_with_synthetic_id_gets_suffix() {
        let mut g = GraphBuilder::new();
        let d = g.synthetic(NodeKind::Join, "end if");
        let a = g.labelled("join-1", NodeKind::Action).unwrap();
        assert_eq!(d, "join-1");
        assert_eq!(a, "join-1-2");
    }

    #[test]
    fn test_connect_filters_self_loops_and_duplicates() {
        let mut g = GraphBuilder::new();
        let a = g.labelled("A", NodeKind::Action).unwrap();
        let b = g.labelled("B", NodeKind::Action).unwrap();
        g.connect(&a, &a, None);
        g.connect(&a, &a, Some("retry".to_string()));
        g.connect(&a, &b, None);
        g.connect(&a, &b, None);
        let def = g.finish("wf".to_string(), "wf".to_string());
        assert_eq!(def.transitions.len(), 2);
        assert_eq!(def.transitions[0].condition.as_deref(), Some("retry"));
        assert_eq!(def.start_points[0].node_id, "A");
    }
}
