//! Diagram commands: parse (dry run) and import.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use tokio::io::AsyncReadExt;

use plantflow_core::action::ActionSpec;
use plantflow_core::diagram::{ParseReport, parse_with_report};
use plantflow_infra::engine::Engine;
use plantflow_types::workflow::{NodeKind, WorkflowDefinition};

/// Read diagram text from a file, or from stdin when `path` is `-`.
pub async fn read_diagram(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("failed to read diagram from stdin")?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

/// Default workflow id for a diagram file: its stem. `None` for stdin.
pub fn default_id(path: &Path) -> Option<String> {
    if path.as_os_str() == "-" {
        return None;
    }
    path.file_stem()
        .map(|stem| stem.to_string_lossy().trim().to_string())
        .filter(|stem| !stem.is_empty())
}

/// Parse a diagram and print the graph without storing it.
pub async fn parse(path: &Path, id: Option<&str>, name: Option<&str>, json: bool) -> Result<()> {
    let text = read_diagram(path).await?;
    let parsed = parse_with_report(&text, id, name);

    if json {
        let out = serde_json::json!({
            "definition": parsed.definition,
            "report": parsed.report,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print_definition(&parsed.definition);
    print_report(&parsed.report);
    Ok(())
}

/// Parse a diagram and store it in the workflow store.
pub async fn import(
    engine: &Engine,
    path: &Path,
    id: Option<&str>,
    name: Option<&str>,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let text = read_diagram(path).await?;
    let id = id.map(str::to_string).or_else(|| default_id(path));
    let (definition, report) = store_diagram(engine, &text, id.as_deref(), name)
        .await
        .with_context(|| format!("failed to import {}", path.display()))?;

    if json {
        let out = serde_json::json!({
            "id": definition.id,
            "name": definition.name,
            "nodes": definition.nodes.len(),
            "transitions": definition.transitions.len(),
            "skipped": report.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }
    if quiet {
        return Ok(());
    }

    println!();
    println!(
        "  {} Imported '{}' as {}",
        style("✓").green().bold(),
        style(&definition.name).cyan(),
        style(&definition.id).bold()
    );
    println!(
        "    {} nodes, {} transitions",
        definition.nodes.len(),
        definition.transitions.len()
    );
    print_report(&report);
    println!();
    Ok(())
}

/// Parse `text` once and store the result. The returned report belongs to
/// the stored definition, generated id included.
pub async fn store_diagram(
    engine: &Engine,
    text: &str,
    id: Option<&str>,
    name: Option<&str>,
) -> Result<(WorkflowDefinition, ParseReport)> {
    let parsed = parse_with_report(text, id, name);
    let definition = engine.controller.store_definition(parsed.definition).await?;
    Ok((definition, parsed.report))
}

/// Styled tables for nodes and transitions.
pub fn print_definition(definition: &WorkflowDefinition) {
    println!();
    println!(
        "  {} {}  {}",
        style("Workflow").bold(),
        style(&definition.name).cyan(),
        style(&definition.id).dim()
    );
    println!();

    let mut nodes = Table::new();
    nodes.load_preset(presets::UTF8_FULL_CONDENSED);
    nodes.set_content_arrangement(ContentArrangement::Dynamic);
    nodes.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Kind").fg(Color::White),
        Cell::new("Label").fg(Color::White),
        Cell::new("Action").fg(Color::White),
    ]);
    for node in &definition.nodes {
        let start = definition.start_points.iter().any(|sp| sp.node_id == node.id);
        let id_cell = if start {
            Cell::new(format!("▶ {}", node.id)).fg(Color::Green)
        } else {
            Cell::new(&node.id)
        };
        let action = node
            .note_markdown
            .as_deref()
            .and_then(ActionSpec::from_note)
            .map(|spec| spec.name)
            .unwrap_or_default();
        nodes.add_row(vec![
            id_cell,
            kind_cell(node.kind),
            Cell::new(&node.label),
            Cell::new(action).fg(Color::Magenta),
        ]);
    }
    println!("{nodes}");
    println!();

    let mut transitions = Table::new();
    transitions.load_preset(presets::UTF8_FULL_CONDENSED);
    transitions.set_content_arrangement(ContentArrangement::Dynamic);
    transitions.set_header(vec![
        Cell::new("From").fg(Color::White),
        Cell::new("To").fg(Color::White),
        Cell::new("Condition").fg(Color::White),
    ]);
    for t in &definition.transitions {
        transitions.add_row(vec![
            Cell::new(&t.from_node_id),
            Cell::new(&t.to_node_id),
            Cell::new(t.condition.as_deref().unwrap_or("")).fg(Color::Yellow),
        ]);
    }
    println!("{transitions}");
}

/// Skipped lines, if any.
pub fn print_report(report: &ParseReport) {
    if report.skipped.is_empty() {
        return;
    }
    println!();
    println!(
        "  {} {} line(s) not understood:",
        style("!").yellow().bold(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!(
            "    {} {}",
            style(format!("{:>4}", skipped.line)).dim(),
            skipped.text
        );
    }
}

fn kind_cell(kind: NodeKind) -> Cell {
    let (text, color) = match kind {
        NodeKind::Action => ("action", Color::White),
        NodeKind::Start => ("start", Color::Green),
        NodeKind::Stop => ("stop", Color::Red),
        NodeKind::Decision => ("decision", Color::Yellow),
        NodeKind::Join => ("join", Color::DarkGrey),
        NodeKind::LoopEntry => ("loop", Color::Blue),
        NodeKind::AfterLoop => ("after loop", Color::DarkGrey),
    };
    Cell::new(text).fg(color)
}
