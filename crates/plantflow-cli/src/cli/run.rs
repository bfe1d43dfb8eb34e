//! Interactive workflow runner.
//!
//! Starts (or resumes) the instance, renders the current node and asks for
//! a choice at every branch. Choices can be scripted with `--choose`, which
//! are consumed in order before any prompt is shown.

use std::collections::VecDeque;
use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::{Confirm, Select};
use tokio_util::sync::CancellationToken;

use plantflow_infra::engine::Engine;
use plantflow_types::workflow::WorkflowStatePayload;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Diagram file to import and run, or the id of a stored workflow.
    pub target: String,

    /// Id to import the diagram file under (defaults to the file stem).
    #[arg(long)]
    pub id: Option<String>,

    /// Choice value to use at the next branch. Repeatable. A number picks
    /// the option with that order.
    #[arg(long = "choose", value_name = "VALUE")]
    pub choose: Vec<String>,

    /// Set a variable before starting. Repeatable.
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Follow single transitions without asking.
    #[arg(long)]
    pub no_pause: bool,

    /// Stop after this many steps.
    #[arg(long, default_value = "1000")]
    pub max_steps: usize,
}

/// Parse `key=value`.
fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Map a scripted value onto the payload: a number selects the choice with
/// that order, anything else passes through to choice matching.
fn scripted_value(payload: &WorkflowStatePayload, value: &str) -> String {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|order| payload.choices.iter().find(|c| c.order == order))
        .map(|choice| choice.target_node_id.clone())
        .unwrap_or_else(|| value.to_string())
}

pub async fn run(engine: &Engine, args: RunArgs, json: bool) -> Result<()> {
    let controller = &engine.controller;
    let id = resolve_target(engine, &args).await?;

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            watcher.cancel();
        }
    });

    for (key, value) in &args.set {
        controller.set_variable(&id, key, value).await?;
    }
    if controller.start_instance(&id, &cancel).await?.is_none() {
        bail!("workflow '{id}' has no start point");
    }

    let mut script: VecDeque<String> = args.choose.into_iter().collect();
    let interactive = !args.no_pause && !json;
    let mut steps = 0;

    loop {
        if cancel.is_cancelled() {
            tracing::warn!(workflow_id = %id, "run interrupted");
            break;
        }
        let payload = controller.get_current_state_payload(&id).await?;
        if json {
            println!("{}", serde_json::to_string(&payload)?);
        } else {
            render(&payload);
        }
        if payload.is_terminal {
            break;
        }
        if steps >= args.max_steps {
            tracing::warn!(workflow_id = %id, steps, "step limit reached");
            break;
        }
        steps += 1;

        let (value, scripted) = if let Some(next) = script.pop_front() {
            (Some(scripted_value(&payload, &next)), true)
        } else if payload.is_choice {
            (Some(prompt_choice(&payload)?), false)
        } else {
            if interactive && !confirm_continue()? {
                break;
            }
            (None, false)
        };

        let advanced = controller
            .advance_by_choice_value(&id, value.as_deref(), &cancel)
            .await?;
        if !advanced {
            let shown = value.unwrap_or_default();
            if scripted || json {
                bail!("'{shown}' does not match any option");
            }
            println!(
                "  {} '{}' does not match any option",
                style("!").yellow().bold(),
                shown
            );
        }
    }

    let snapshot = controller.snapshot(&id).await?;
    if json {
        println!("{}", serde_json::to_string(&snapshot)?);
    } else {
        render_variables(&snapshot.variables);
    }
    Ok(())
}

/// Import the target when it is a file, otherwise look it up in the store.
async fn resolve_target(engine: &Engine, args: &RunArgs) -> Result<String> {
    let path = Path::new(&args.target);
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        let text = super::diagram::read_diagram(path).await?;
        let id = args.id.clone().or_else(|| super::diagram::default_id(path));
        let definition = engine
            .controller
            .import_workflow(&text, id.as_deref(), None)
            .await
            .with_context(|| format!("failed to import {}", path.display()))?;
        return Ok(definition.id);
    }

    if !engine.controller.workflow_exists(&args.target).await? {
        bail!(
            "'{}' is neither a diagram file nor a stored workflow",
            args.target
        );
    }
    Ok(args.target.clone())
}

fn prompt_choice(payload: &WorkflowStatePayload) -> Result<String> {
    let items: Vec<&str> = payload
        .choices
        .iter()
        .map(|c| c.display_text.as_str())
        .collect();
    let picked = Select::new()
        .with_prompt(payload.node_label.as_deref().unwrap_or("Choose"))
        .items(&items)
        .default(0)
        .interact()?;
    Ok(payload.choices[picked].target_node_id.clone())
}

fn confirm_continue() -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?)
}

fn render(payload: &WorkflowStatePayload) {
    println!();
    if let Some(label) = &payload.node_label {
        println!("  {} {}", style("●").cyan(), style(label).bold());
    }
    if let Some(text) = payload.text.as_deref().filter(|t| Some(*t) != payload.node_label.as_deref()) {
        for line in text.lines() {
            println!("    {line}");
        }
    }
    if payload.is_terminal {
        println!("  {} Workflow finished.", style("✓").green().bold());
    }
}

fn render_variables(variables: &plantflow_types::variables::Variables) {
    if variables.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Variable").fg(Color::White),
        Cell::new("Value").fg(Color::White),
    ]);
    for (key, value) in variables.iter() {
        table.add_row(vec![Cell::new(key).fg(Color::Cyan), Cell::new(value)]);
    }
    println!();
    println!("{table}");
    println!();
}
