//! Single forward pass from logical lines to a `WorkflowDefinition`.
//!
//! The pass keeps a cursor (the node the next statement chains from) and an
//! explicit stack of open control-flow frames. The innermost frame decides
//! where a new node is wired: the open branch of a decision, or the body of
//! a loop. Frames still open at end of input are force-closed innermost
//! first, with the same logic as their explicit closing statement.

use plantflow_types::workflow::{NodeKind, WorkflowDefinition};
use serde::Serialize;

use super::builder::GraphBuilder;
use super::preprocess::{LogicalLine, preprocess};
use super::syntax;

/// Name used when neither the caller nor a `title` supplies one.
pub const DEFAULT_WORKFLOW_NAME: &str = "Untitled workflow";

const START_LABEL: &str = "Start";
const STOP_LABEL: &str = "Stop";

/// Directives that style the diagram without affecting the graph.
const COSMETIC_KEYWORDS: &[&str] = &[
    "skinparam",
    "hide",
    "show",
    "scale",
    "left to right direction",
    "top to bottom direction",
    "header",
    "footer",
    "legend",
    "endlegend",
    "caption",
    "title",
];

/// Punctuation-led directives (preprocessor lines, inline style blocks).
const COSMETIC_PREFIXES: &[&str] = &["!", "<style"];

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// A line the parser did not recognize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// 1-based number of the first physical line of the statement.
    pub line: usize,
    pub text: String,
}

/// What the parser saw besides the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Cosmetic directives, in order.
    pub directives: Vec<String>,
    pub skipped: Vec<SkippedLine>,
}

/// A definition together with its parse report.
#[derive(Debug, Clone)]
pub struct ParsedDiagram {
    pub definition: WorkflowDefinition,
    pub report: ParseReport,
}

/// Parse diagram text into a workflow definition.
///
/// Never fails: unrecognized lines are skipped. `id` defaults to a fresh
/// UUIDv7, `name` to the diagram `title` or [`DEFAULT_WORKFLOW_NAME`].
pub fn parse_diagram(text: &str, id: Option<&str>, name: Option<&str>) -> WorkflowDefinition {
    parse_with_report(text, id, name).definition
}

/// Like [`parse_diagram`], also returning cosmetic directives and skipped lines.
pub fn parse_with_report(text: &str, id: Option<&str>, name: Option<&str>) -> ParsedDiagram {
    let mut parser = Parser::new();
    for line in preprocess(text) {
        parser.statement(&line);
    }
    parser.finish(id, name)
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// One arm of an open decision.
#[derive(Debug)]
struct Branch {
    condition: Option<String>,
    last: Option<String>,
    /// A `stop` ended this arm; it is not wired to the join.
    terminated: bool,
}

impl Branch {
    fn new(condition: Option<String>) -> Self {
        Self {
            condition,
            last: None,
            terminated: false,
        }
    }
}

#[derive(Debug)]
enum LoopStyle {
    /// `repeat` ... `repeat while (COND)`: body runs at least once.
    Repeat,
    /// `while (COND)` ... `endwhile`: the entry node tests first.
    While { condition: String },
}

#[derive(Debug)]
enum Frame {
    Decision {
        decision_id: String,
        branches: Vec<Branch>,
    },
    Loop {
        style: LoopStyle,
        entry_id: String,
        /// Tag of the entry -> first body node edge.
        body_condition: Option<String>,
        last: Option<String>,
        terminated: bool,
    },
}

/// What a closing statement carries into [`Parser::close_frame`].
enum Closing {
    EndIf,
    RepeatWhile(Option<String>),
    EndWhile(Option<String>),
    /// End of input.
    Forced,
}

/// A block note waiting for `end note`.
struct PendingNote {
    target: Option<String>,
    lines: Vec<String>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    graph: GraphBuilder,
    frames: Vec<Frame>,
    /// Chain position when no frame is open.
    cursor: Option<String>,
    /// Target of shorthand notes.
    last_touched: Option<String>,
    title: Option<String>,
    note: Option<PendingNote>,
    report: ParseReport,
    /// Number of the statement being processed.
    line: usize,
}

impl Parser {
    fn new() -> Self {
        Self {
            graph: GraphBuilder::new(),
            frames: Vec::new(),
            cursor: None,
            last_touched: None,
            title: None,
            note: None,
            report: ParseReport::default(),
            line: 0,
        }
    }

    fn statement(&mut self, line: &LogicalLine) {
        self.line = line.number;
        if let Some(mut pending) = self.note.take() {
            if syntax::is_end_note(line.text.trim()) {
                let text = pending.lines.join("\n");
                self.attach_note(pending.target.as_deref(), text.trim());
            } else {
                pending.lines.push(line.text.clone());
                self.note = Some(pending);
            }
            return;
        }

        let text = line.text.as_str();
        if self.cosmetic(text)
            || self.note_header(text)
            || self.terminal(text)
            || self.decision(text)
            || self.looping(text)
            || self.action(text)
            || self.arrow(text)
        {
            return;
        }

        tracing::debug!(line = line.number, text, "skipping unrecognized diagram line");
        self.skip(text);
    }

    fn finish(mut self, id: Option<&str>, name: Option<&str>) -> ParsedDiagram {
        if let Some(pending) = self.note.take() {
            let text = pending.lines.join("\n");
            self.attach_note(pending.target.as_deref(), text.trim());
        }
        while let Some(frame) = self.frames.pop() {
            tracing::debug!("force-closing control-flow frame left open at end of input");
            self.close_frame(frame, Closing::Forced);
        }

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
        let name = name
            .map(str::to_string)
            .or(self.title)
            .unwrap_or_else(|| DEFAULT_WORKFLOW_NAME.to_string());

        ParsedDiagram {
            definition: self.graph.finish(id, name),
            report: self.report,
        }
    }

    // -- chain position --------------------------------------------------

    /// Node (and edge tag) the next appended node should be wired from.
    fn predecessor(&self) -> Option<(String, Option<String>)> {
        match self.frames.last() {
            Some(Frame::Decision {
                decision_id,
                branches,
            }) => {
                let branch = branches.last()?;
                if branch.terminated {
                    None
                } else if let Some(last) = &branch.last {
                    Some((last.clone(), None))
                } else {
                    Some((decision_id.clone(), branch.condition.clone()))
                }
            }
            Some(Frame::Loop {
                entry_id,
                body_condition,
                last,
                terminated,
                ..
            }) => {
                if *terminated {
                    None
                } else if let Some(last) = last {
                    Some((last.clone(), None))
                } else {
                    Some((entry_id.clone(), body_condition.clone()))
                }
            }
            None => self.cursor.clone().map(|c| (c, None)),
        }
    }

    /// Move the chain position to `id` without wiring anything.
    fn advance_to(&mut self, id: &str) {
        match self.frames.last_mut() {
            Some(Frame::Decision { branches, .. }) => {
                if let Some(branch) = branches.last_mut() {
                    branch.last = Some(id.to_string());
                    branch.terminated = false;
                }
            }
            Some(Frame::Loop {
                last, terminated, ..
            }) => {
                *last = Some(id.to_string());
                *terminated = false;
            }
            None => self.cursor = Some(id.to_string()),
        }
        self.last_touched = Some(id.to_string());
    }

    /// Nothing chains from the current position any more (after `stop`).
    fn terminate(&mut self) {
        match self.frames.last_mut() {
            Some(Frame::Decision { branches, .. }) => {
                if let Some(branch) = branches.last_mut() {
                    branch.terminated = true;
                }
            }
            Some(Frame::Loop { terminated, .. }) => *terminated = true,
            None => self.cursor = None,
        }
    }

    /// Wire `id` from the current position and move there.
    fn append(&mut self, id: &str) {
        if let Some((from, condition)) = self.predecessor() {
            self.graph.connect(&from, id, condition);
        }
        self.advance_to(id);
    }

    // -- statements ------------------------------------------------------

    fn cosmetic(&mut self, text: &str) -> bool {
        let lower = text.to_ascii_lowercase();
        let prefixed = COSMETIC_PREFIXES.iter().any(|p| lower.starts_with(p));
        // `Show results --> Done` is an edge, not a `show` directive.
        let keyworded = syntax::parse_arrow(text).is_none()
            && COSMETIC_KEYWORDS
                .iter()
                .any(|kw| syntax::keyword(text, kw).is_some());
        if !prefixed && !keyworded {
            return false;
        }
        if let Some(title) = syntax::keyword(text, "title") {
            if !title.is_empty() {
                self.title = Some(title.to_string());
            }
        }
        self.report.directives.push(text.to_string());
        true
    }

    fn note_header(&mut self, text: &str) -> bool {
        let Some(header) = syntax::parse_note_header(text) else {
            return false;
        };
        let target = header.target.map(str::to_string);
        match header.inline {
            Some(inline) => self.attach_note(target.as_deref(), inline),
            None => {
                self.note = Some(PendingNote {
                    target,
                    lines: Vec::new(),
                })
            }
        }
        true
    }

    fn terminal(&mut self, text: &str) -> bool {
        if syntax::is_exactly(text, &["start"]) {
            if let Some(id) = self.graph.labelled(START_LABEL, NodeKind::Start) {
                self.graph.add_start_point(&id);
                self.advance_to(&id);
            }
            return true;
        }
        if syntax::is_exactly(text, &["stop", "end"]) {
            if let Some(id) = self.graph.labelled(STOP_LABEL, NodeKind::Stop) {
                self.append(&id);
                self.terminate();
            }
            return true;
        }
        false
    }

    fn decision(&mut self, text: &str) -> bool {
        if let Some(line) = syntax::parse_if(text) {
            let decision_id = self.graph.synthetic(NodeKind::Decision, &line.condition);
            self.append(&decision_id);
            let condition = line.label.or(Some(line.condition));
            self.frames.push(Frame::Decision {
                decision_id,
                branches: vec![Branch::new(condition)],
            });
            return true;
        }

        let sibling = if let Some(line) = syntax::parse_else_if(text) {
            Some(line.label.or(Some(line.condition)))
        } else {
            syntax::parse_else(text)
        };
        if let Some(condition) = sibling {
            if !self.frames.iter().any(|f| matches!(f, Frame::Decision { .. })) {
                tracing::debug!(text, "else without an open if");
                self.skip(text);
                return true;
            }
            // Loops left open inside the current arm end with it.
            while matches!(self.frames.last(), Some(Frame::Loop { .. })) {
                if let Some(frame) = self.frames.pop() {
                    self.close_frame(frame, Closing::Forced);
                }
            }
            if let Some(Frame::Decision { branches, .. }) = self.frames.last_mut() {
                branches.push(Branch::new(condition));
            }
            return true;
        }

        if syntax::is_endif(text) {
            self.close_until(|f| matches!(f, Frame::Decision { .. }), Closing::EndIf, text);
            return true;
        }
        false
    }

    fn looping(&mut self, text: &str) -> bool {
        if let Some(condition) = syntax::parse_repeat_while(text) {
            self.close_until(
                |f| {
                    matches!(
                        f,
                        Frame::Loop {
                            style: LoopStyle::Repeat,
                            ..
                        }
                    )
                },
                Closing::RepeatWhile(condition),
                text,
            );
            return true;
        }

        if let Some(inline) = syntax::parse_repeat(text) {
            let entry_id = self.graph.synthetic(NodeKind::LoopEntry, "repeat");
            self.append(&entry_id);
            self.frames.push(Frame::Loop {
                style: LoopStyle::Repeat,
                entry_id,
                body_condition: None,
                last: None,
                terminated: false,
            });
            if !inline.is_empty() && !self.action(inline) {
                self.skip(inline);
            }
            return true;
        }

        if let Some(exit) = syntax::parse_endwhile(text) {
            self.close_until(
                |f| {
                    matches!(
                        f,
                        Frame::Loop {
                            style: LoopStyle::While { .. },
                            ..
                        }
                    )
                },
                Closing::EndWhile(exit),
                text,
            );
            return true;
        }

        if let Some(line) = syntax::parse_while(text) {
            let entry_id = self.graph.synthetic(NodeKind::LoopEntry, &line.condition);
            self.append(&entry_id);
            let body_condition = line.label.or_else(|| Some(line.condition.clone()));
            self.frames.push(Frame::Loop {
                style: LoopStyle::While {
                    condition: line.condition,
                },
                entry_id,
                body_condition,
                last: None,
                terminated: false,
            });
            return true;
        }
        false
    }

    fn action(&mut self, text: &str) -> bool {
        let Some(action) = syntax::parse_action(text) else {
            return false;
        };
        let Some(id) = self.graph.labelled(action.text, NodeKind::Action) else {
            tracing::debug!(text, "ignoring action with empty label");
            return true;
        };
        self.append(&id);
        if let Some(stereotype) = action.stereotype {
            if let Some(node) = self.graph.node_mut(&id) {
                let marker = format!("<<{stereotype}>>");
                node.note_markdown = Some(match node.note_markdown.take() {
                    Some(existing) if !existing.is_empty() => format!("{existing}\n{marker}"),
                    _ => marker,
                });
            }
        }
        true
    }

    fn arrow(&mut self, text: &str) -> bool {
        let Some(arrow) = syntax::parse_arrow(text) else {
            return false;
        };
        // Source first, so nodes appear in reading order.
        let from = if arrow.from == "[*]" {
            None
        } else {
            self.graph.labelled(arrow.from, NodeKind::Action)
        };
        let to = if arrow.to == "[*]" {
            self.graph.labelled(STOP_LABEL, NodeKind::Stop)
        } else {
            self.graph.labelled(arrow.to, NodeKind::Action)
        };
        let Some(to) = to else {
            return false;
        };

        match from {
            Some(from) => self
                .graph
                .connect(&from, &to, arrow.condition.map(str::to_string)),
            None if arrow.from == "[*]" => self.graph.add_start_point(&to),
            None => {}
        }

        if self.frames.is_empty() {
            self.cursor = Some(to.clone());
        }
        self.last_touched = Some(to);
        true
    }

    // -- notes -----------------------------------------------------------

    fn attach_note(&mut self, target: Option<&str>, text: &str) {
        let node_id = match target {
            Some(reference) => self.graph.find(reference),
            None => self.last_touched.clone(),
        };
        let Some(node) = node_id.as_deref().and_then(|id| self.graph.node_mut(id)) else {
            tracing::debug!(note_target = ?target, "note does not refer to a known node");
            return;
        };

        match syntax::split_note_metadata(text) {
            Some((metadata, markdown)) => {
                node.json_metadata = Some(metadata.to_string());
                node.note_markdown = (!markdown.is_empty()).then(|| markdown.to_string());
            }
            None => node.note_markdown = Some(text.to_string()),
        }
    }

    // -- frame closing ---------------------------------------------------

    /// Close frames innermost-first until one matching `is_target` is closed.
    ///
    /// Inner frames of other kinds are force-closed on the way. If no frame
    /// matches, the statement is skipped.
    fn close_until(&mut self, is_target: impl Fn(&Frame) -> bool, closing: Closing, text: &str) {
        if !self.frames.iter().any(&is_target) {
            tracing::debug!(text, "closing statement without a matching open frame");
            self.skip(text);
            return;
        }
        while let Some(frame) = self.frames.pop() {
            if is_target(&frame) {
                self.close_frame(frame, closing);
                return;
            }
            self.close_frame(frame, Closing::Forced);
        }
    }

    fn close_frame(&mut self, frame: Frame, closing: Closing) {
        match frame {
            Frame::Decision {
                decision_id,
                branches,
            } => self.close_decision(&decision_id, branches),
            Frame::Loop {
                style: LoopStyle::Repeat,
                entry_id,
                last,
                terminated,
                ..
            } => {
                let condition = match closing {
                    Closing::RepeatWhile(condition) => condition,
                    _ => None,
                };
                let tail = (!terminated).then(|| last.unwrap_or_else(|| entry_id.clone()));
                self.close_repeat(&entry_id, tail, condition);
            }
            Frame::Loop {
                style: LoopStyle::While { condition },
                entry_id,
                last,
                terminated,
                ..
            } => {
                let exit = match closing {
                    Closing::EndWhile(exit) => exit,
                    _ => None,
                };
                let tail = if terminated { None } else { last };
                self.close_while(&entry_id, tail, exit.unwrap_or_else(|| format!("not {condition}")));
            }
        }
    }

    fn close_decision(&mut self, decision_id: &str, branches: Vec<Branch>) {
        let exits: Vec<(String, Option<String>)> = branches
            .into_iter()
            .filter(|b| !b.terminated)
            .map(|b| match b.last {
                Some(last) => (last, None),
                None => (decision_id.to_string(), b.condition),
            })
            .collect();

        if exits.is_empty() {
            // Every arm stopped; nothing continues after the decision.
            self.terminate();
            return;
        }

        let join_id = self.graph.synthetic(NodeKind::Join, "end if");
        for (from, condition) in exits {
            self.graph.connect(&from, &join_id, condition);
        }
        self.advance_to(&join_id);
    }

    fn close_repeat(&mut self, entry_id: &str, tail: Option<String>, condition: Option<String>) {
        let Some(tail) = tail else {
            self.terminate();
            return;
        };
        self.graph.connect(&tail, entry_id, condition);
        let after_id = self.graph.synthetic(NodeKind::AfterLoop, "end repeat");
        self.graph.connect(&tail, &after_id, None);
        self.advance_to(&after_id);
    }

    fn close_while(&mut self, entry_id: &str, tail: Option<String>, exit: String) {
        if let Some(tail) = tail {
            self.graph.connect(&tail, entry_id, None);
        }
        let after_id = self.graph.synthetic(NodeKind::AfterLoop, "end while");
        self.graph.connect(entry_id, &after_id, Some(exit));
        self.advance_to(&after_id);
    }

    fn skip(&mut self, text: &str) {
        self.report.skipped.push(SkippedLine {
            line: self.line,
            text: text.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> WorkflowDefinition {
        parse_diagram(text, Some("wf"), None)
    }

    fn edges(def: &WorkflowDefinition) -> Vec<(String, String, Option<String>)> {
        def.transitions
            .iter()
            .map(|t| {
                (
                    t.from_node_id.clone(),
                    t.to_node_id.clone(),
                    t.condition.clone(),
                )
            })
            .collect()
    }

    fn edge(from: &str, to: &str, condition: Option<&str>) -> (String, String, Option<String>) {
        (
            from.to_string(),
            to.to_string(),
            condition.map(str::to_string),
        )
    }

    #[test]
    fn test_linear_chain() {
        let def = parse("@startuml\n:A;\n:B;\n:C;\n:D;\n@enduml");
        assert_eq!(def.nodes.len(), 4);
        assert_eq!(def.transitions.len(), 3);
        assert_eq!(def.start_points.len(), 1);
        assert_eq!(def.start_points[0].node_id, "A");
        assert_eq!(
            edges(&def),
            vec![
                edge("A", "B", None),
                edge("B", "C", None),
                edge("C", "D", None)
            ]
        );
    }

    #[test]
    fn test_start_and_stop_nodes() {
        let def = parse("start\n:Work;\nstop");
        assert_eq!(def.start_points[0].node_id, "Start");
        assert_eq!(def.node("Start").unwrap().kind, NodeKind::Start);
        assert_eq!(def.node("Stop").unwrap().kind, NodeKind::Stop);
        assert_eq!(
            edges(&def),
            vec![edge("Start", "Work", None), edge("Work", "Stop", None)]
        );
        assert!(def.is_terminal("Stop"));
    }

    #[test]
    fn test_if_else_with_join() {
        let text = "start\n:Check;\nif (Valid?) then (yes)\n  :Approve;\nelse (no)\n  :Reject;\nendif\n:Done;\nstop";
        let def = parse(text);

        let decision = def.node("decision-1").unwrap();
        assert_eq!(decision.label, "Valid?");
        assert_eq!(decision.kind, NodeKind::Decision);
        assert_eq!(def.node("join-1").unwrap().kind, NodeKind::Join);

        assert_eq!(
            edges(&def),
            vec![
                edge("Start", "Check", None),
                edge("Check", "decision-1", None),
                edge("decision-1", "Approve", Some("yes")),
                edge("decision-1", "Reject", Some("no")),
                edge("Approve", "join-1", None),
                edge("Reject", "join-1", None),
                edge("join-1", "Done", None),
                edge("Done", "Stop", None),
            ]
        );
    }

    #[test]
    fn test_if_without_label_uses_condition() {
        let def = parse(":A;\nif (ready) then\n:B;\nendif");
        assert!(edges(&def).contains(&edge("decision-1", "B", Some("ready"))));
    }

    #[test]
    fn test_elseif_and_empty_branch() {
        let text = "if (size?) then (small)\n:S;\nelseif (medium?) then (medium)\n:M;\nelse (large)\nendif";
        let def = parse(text);
        let e = edges(&def);
        assert!(e.contains(&edge("decision-1", "S", Some("small"))));
        assert!(e.contains(&edge("decision-1", "M", Some("medium"))));
        // Empty arm goes straight to the join, carrying its label.
        assert!(e.contains(&edge("decision-1", "join-1", Some("large"))));
    }

    #[test]
    fn test_stop_inside_branch() {
        let text = "start\nif (ok?) then (yes)\n:Go;\nelse (no)\nstop\nendif\n:After;";
        let def = parse(text);
        let e = edges(&def);
        assert!(e.contains(&edge("decision-1", "Stop", Some("no"))));
        assert!(e.contains(&edge("Go", "join-1", None)));
        assert!(e.contains(&edge("join-1", "After", None)));
        assert!(!e.iter().any(|(from, _, _)| from == "Stop"));
    }

    #[test]
    fn test_all_branches_stop_skips_join() {
        let text = "if (ok?) then (yes)\nstop\nelse (no)\nstop\nendif\n:Orphan;";
        let def = parse(text);
        assert!(def.node("join-1").is_none());
        assert!(!def.transitions.iter().any(|t| t.to_node_id == "Orphan"));
    }

    #[test]
    fn test_repeat_loop_back_edge() {
        let def = parse("start\nrepeat\n:Ask;\nrepeat while (again?)\n:Done;");
        let e = edges(&def);
        assert_eq!(def.node("loop-1").unwrap().kind, NodeKind::LoopEntry);
        assert!(e.contains(&edge("Start", "loop-1", None)));
        assert!(e.contains(&edge("loop-1", "Ask", None)));
        assert!(e.contains(&edge("Ask", "loop-1", Some("again?"))));
        assert!(e.contains(&edge("Ask", "after-loop-1", None)));
        assert!(e.contains(&edge("after-loop-1", "Done", None)));
    }

    #[test]
    fn test_repeat_with_inline_action() {
        let def = parse("repeat :Ask;\nrepeat while (again?)");
        assert!(edges(&def).contains(&edge("loop-1", "Ask", None)));
    }

    #[test]
    fn test_while_loop() {
        let text = "start\nwhile (More items?) is (yes)\n:Process;\nendwhile (no)\nstop";
        let def = parse(text);
        assert_eq!(def.node("loop-1").unwrap().label, "More items?");
        assert_eq!(
            edges(&def),
            vec![
                edge("Start", "loop-1", None),
                edge("loop-1", "Process", Some("yes")),
                edge("Process", "loop-1", None),
                edge("loop-1", "after-loop-1", Some("no")),
                edge("after-loop-1", "Stop", None),
            ]
        );
    }

    #[test]
    fn test_while_exit_defaults_to_negated_condition() {
        let def = parse("while (busy)\n:Wait;\nendwhile");
        assert!(edges(&def).contains(&edge("loop-1", "after-loop-1", Some("not busy"))));
    }

    #[test]
    fn test_unguarded_self_loop_is_dropped() {
        let def = parse("A --> A");
        assert_eq!(def.nodes.len(), 1);
        assert!(def.transitions.is_empty());
    }

    #[test]
    fn test_raw_arrows_with_initial_and_final_markers() {
        let def = parse("@startuml\n[*] --> A\nA --> B : go\nB --> [*]\n@enduml");
        assert_eq!(def.start_points.len(), 1);
        assert_eq!(def.start_points[0].node_id, "A");
        assert_eq!(
            edges(&def),
            vec![edge("A", "B", Some("go")), edge("B", "Stop", None)]
        );
        assert_eq!(def.nodes[0].id, "A");
    }

    #[test]
    fn test_arrows_mixed_with_actions() {
        let def = parse("@startuml\n[*] --> A\n:A;\nA --> B\nA --> C\n@enduml");
        assert_eq!(def.start_points[0].node_id, "A");
        assert_eq!(
            edges(&def),
            vec![edge("A", "B", None), edge("A", "C", None)]
        );
    }

    #[test]
    fn test_labels_merge_into_one_node() {
        let def = parse(":Review;\n:Fix;\n:Review;");
        assert_eq!(def.nodes.len(), 2);
        assert!(edges(&def).contains(&edge("Fix", "Review", None)));
    }

    #[test]
    fn test_duplicate_transitions_are_collapsed() {
        let def = parse("A --> B\nA --> B\nA --> B : retry");
        assert_eq!(def.transitions.len(), 2);
    }

    #[test]
    fn test_note_with_json_metadata() {
        let text = ":Pick;\nnote right\n{\"icon\":\"pin\"} | Choose a **place**\nend note";
        let def = parse(text);
        let node = def.node("Pick").unwrap();
        assert_eq!(node.json_metadata.as_deref(), Some("{\"icon\":\"pin\"}"));
        assert_eq!(node.note_markdown.as_deref(), Some("Choose a **place**"));
    }

    #[test]
    fn test_note_without_metadata_and_note_of() {
        let text = ":A;\n:B;\nnote left of A: about A\nnote right\nline one\nline two\nend note";
        let def = parse(text);
        assert_eq!(def.node("A").unwrap().note_markdown.as_deref(), Some("about A"));
        assert_eq!(
            def.node("B").unwrap().note_markdown.as_deref(),
            Some("line one\nline two")
        );
        assert!(def.node("B").unwrap().json_metadata.is_none());
    }

    #[test]
    fn test_action_note_is_kept_as_markdown() {
        let text = ":Remember;\nnote right\n{\"action\":\"set_variable\",\"params\":{\"x\":\"1\"}}\nend note";
        let def = parse(text);
        let node = def.node("Remember").unwrap();
        assert!(node.json_metadata.is_none());
        assert!(node.note_markdown.as_deref().unwrap().contains("set_variable"));
    }

    #[test]
    fn test_stereotype_recorded_on_node() {
        let def = parse(":Ask name; <<input>>");
        assert_eq!(
            def.node("Ask name").unwrap().note_markdown.as_deref(),
            Some("<<input>>")
        );
    }

    #[test]
    fn test_unclosed_frames_are_force_closed() {
        let def = parse("if (x) then\n:A;\nrepeat\n:B;");
        let e = edges(&def);
        assert!(e.contains(&edge("decision-1", "A", Some("x"))));
        assert!(e.contains(&edge("B", "after-loop-1", None)));
        assert!(e.contains(&edge("after-loop-1", "join-1", None)));
    }

    #[test]
    fn test_endif_closes_inner_loop() {
        let def = parse("if (x) then\nrepeat\n:B;\nendif\n:C;");
        let e = edges(&def);
        assert!(e.contains(&edge("after-loop-1", "join-1", None)));
        assert!(e.contains(&edge("join-1", "C", None)));
    }

    #[test]
    fn test_unmatched_closers_are_skipped() {
        let parsed = parse_with_report(":A;\nendif\nelse\n:B;", Some("wf"), None);
        assert_eq!(parsed.report.skipped.len(), 2);
        assert_eq!(parsed.report.skipped[0].line, 2);
        assert_eq!(edges(&parsed.definition), vec![edge("A", "B", None)]);
    }

    #[test]
    fn test_cosmetic_lines_and_title() {
        let text = "@startuml\ntitle Onboarding\nskinparam backgroundColor #EEE\n!theme plain\nShow results --> Done\n@enduml";
        let parsed = parse_with_report(text, Some("wf"), None);
        assert_eq!(parsed.definition.name, "Onboarding");
        assert_eq!(parsed.report.directives.len(), 3);
        assert_eq!(parsed.definition.transitions.len(), 1);
    }

    #[test]
    fn test_explicit_name_beats_title() {
        let def = parse_diagram("title Ignored\n:A;", Some("wf"), Some("Chosen"));
        assert_eq!(def.name, "Chosen");
        let def = parse_diagram(":A;", None, None);
        assert_eq!(def.name, DEFAULT_WORKFLOW_NAME);
        assert!(!def.id.is_empty());
    }

    #[test]
    fn test_reparse_is_identical() {
        let text = "start\n:A;\nif (c) then (yes)\n:B;\nelse (no)\n:C;\nendif\nwhile (w)\n:D;\nendwhile\nstop";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn test_empty_input() {
        let def = parse("");
        assert!(def.nodes.is_empty());
        assert!(def.start_points.is_empty());
    }
}
