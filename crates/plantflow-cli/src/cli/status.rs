//! Status command.

use anyhow::Result;
use console::style;

use plantflow_infra::engine::Engine;
use plantflow_infra::filesystem::workflows_dir;

/// Show data directory, effective config and registered actions.
pub async fn status(engine: &Engine, json: bool) -> Result<()> {
    let workflows = engine.controller.list_workflows().await?;
    let actions = engine.registry.names();

    if json {
        let status = serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": engine.data_dir.display().to_string(),
            "workflows": workflows.len(),
            "actions": actions,
            "config": engine.config,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} PlantFlow v{}",
        style("⚙").bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!();
    println!("  {}", style("── Storage ──").dim());
    println!("  Data dir:  {}", style(engine.data_dir.display()).cyan());
    println!(
        "  Workflows: {} in {}",
        style(workflows.len()).bold(),
        style(workflows_dir(&engine.data_dir).display()).dim()
    );
    println!();
    println!("  {}", style("── Actions ──").dim());
    println!(
        "  Scoped:    {}",
        if engine.config.action_scopes { "yes" } else { "no" }
    );
    println!(
        "  Timeout:   {}",
        engine
            .config
            .action_timeout_secs
            .map(|s| format!("{s}s"))
            .unwrap_or_else(|| "none".to_string())
    );
    println!("  Handlers:  {}", actions.join(", "));
    println!();
    Ok(())
}
