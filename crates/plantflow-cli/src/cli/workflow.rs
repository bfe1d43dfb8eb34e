//! Stored workflow commands: list, show, delete.

use anyhow::{Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use plantflow_infra::engine::Engine;

/// List stored workflows in a table.
pub async fn list(engine: &Engine, json: bool) -> Result<()> {
    let workflows = engine.controller.list_workflows().await?;

    if json {
        let rows: Vec<_> = workflows
            .iter()
            .map(|w| {
                serde_json::json!({
                    "id": w.id,
                    "name": w.name,
                    "nodes": w.nodes.len(),
                    "transitions": w.transitions.len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!();
        println!(
            "  {} No workflows stored. Import one with: {}",
            style("i").blue().bold(),
            style("pflow import <FILE>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Nodes").fg(Color::White),
        Cell::new("Transitions").fg(Color::White),
    ]);
    for w in &workflows {
        table.add_row(vec![
            Cell::new(&w.id).fg(Color::Cyan),
            Cell::new(&w.name),
            Cell::new(w.nodes.len()),
            Cell::new(w.transitions.len()),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} workflow(s)",
        style(workflows.len()).bold()
    );
    println!();
    Ok(())
}

/// Print one stored workflow.
pub async fn show(engine: &Engine, id: &str, json: bool) -> Result<()> {
    let Some(definition) = engine.controller.get_workflow(id).await? else {
        bail!("workflow '{id}' not found");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&definition)?);
        return Ok(());
    }
    super::diagram::print_definition(&definition);
    println!();
    Ok(())
}

/// Delete a stored workflow, asking first unless `force` or `json`.
pub async fn delete(engine: &Engine, id: &str, force: bool, json: bool) -> Result<()> {
    let Some(definition) = engine.controller.get_workflow(id).await? else {
        bail!("workflow '{id}' not found");
    };

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete workflow '{}'?",
                style(&definition.name).red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let deleted = engine.controller.delete_workflow(id).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": deleted, "id": id}));
    } else {
        println!(
            "  {} Workflow '{}' deleted.",
            style("✓").red().bold(),
            definition.name
        );
    }
    Ok(())
}
