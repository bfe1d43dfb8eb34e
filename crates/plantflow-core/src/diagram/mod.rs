//! Activity-diagram parsing.
//!
//! [`parse_diagram`] turns diagram text into a [`WorkflowDefinition`]. Parsing
//! is lenient: unknown lines are skipped and unclosed blocks are closed at end
//! of input, so any text yields a (possibly empty) graph.
//!
//! [`WorkflowDefinition`]: plantflow_types::workflow::WorkflowDefinition

mod builder;
mod parser;
mod preprocess;
mod syntax;

pub use parser::{
    DEFAULT_WORKFLOW_NAME, ParseReport, ParsedDiagram, SkippedLine, parse_diagram,
    parse_with_report,
};
